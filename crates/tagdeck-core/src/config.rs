//! Tuning values for a session.
//!
//! Every field has a default, so an empty JSON object is a complete
//! configuration:
//!
//! ```text
//! {
//!   "results": {"press_delay_ms": 250, "move_threshold": 6.0},
//!   "history": {"press_delay_ms": 300},
//!   "flash_duration_ms": 450,
//!   "rating_policy": {"type": "queue", "capacity": 4}
//! }
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::flash::DEFAULT_FLASH_MS;
use crate::history::{DEFAULT_HISTORY_STEP, HISTORY_FEATURE};
use crate::hotspot::PrimaryPolicy;
use crate::rating::PendingPolicy;
use crate::selection::{DEFAULT_MOVE_THRESHOLD, DEFAULT_PRESS_DELAY_MS, SelectionConfig};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Gesture tuning for one pane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaneConfig {
    /// Hold time before a press turns into range selection.
    pub press_delay_ms: u64,
    /// Manhattan distance a press may travel and still count as a press.
    pub move_threshold: f64,
}

impl Default for PaneConfig {
    fn default() -> Self {
        Self {
            press_delay_ms: DEFAULT_PRESS_DELAY_MS,
            move_threshold: DEFAULT_MOVE_THRESHOLD,
        }
    }
}

impl PaneConfig {
    pub fn selection_config(&self) -> SelectionConfig {
        SelectionConfig {
            press_delay: Duration::from_millis(self.press_delay_ms),
            move_threshold: self.move_threshold,
        }
    }
}

/// Session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagDeckConfig {
    pub results: PaneConfig,
    pub history: PaneConfig,
    pub flash_duration_ms: u64,
    /// Batches revealed per "load previous".
    pub history_step: usize,
    /// Feature part of the history persistence key.
    pub history_feature: String,
    pub tenant: String,
    pub primary_policy: PrimaryPolicy,
    pub rating_policy: PendingPolicy,
}

impl Default for TagDeckConfig {
    fn default() -> Self {
        Self {
            results: PaneConfig::default(),
            history: PaneConfig::default(),
            flash_duration_ms: DEFAULT_FLASH_MS,
            history_step: DEFAULT_HISTORY_STEP,
            history_feature: HISTORY_FEATURE.to_string(),
            tenant: "default".to_string(),
            primary_policy: PrimaryPolicy::default(),
            rating_policy: PendingPolicy::default(),
        }
    }
}

impl TagDeckConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_json_str(&json)?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (pane, cfg) in [("results", &self.results), ("history", &self.history)] {
            if !cfg.move_threshold.is_finite() || cfg.move_threshold < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{}.move_threshold must be a non-negative number",
                    pane
                )));
            }
        }
        if self.flash_duration_ms == 0 {
            return Err(ConfigError::Invalid("flash_duration_ms must be positive".to_string()));
        }
        if self.history_step == 0 {
            return Err(ConfigError::Invalid("history_step must be positive".to_string()));
        }
        if self.history_feature.trim().is_empty() {
            return Err(ConfigError::Invalid("history_feature must not be empty".to_string()));
        }
        if let PendingPolicy::Queue { capacity: 0 } = self.rating_policy {
            return Err(ConfigError::Invalid("rating queue capacity must be positive".to_string()));
        }
        Ok(())
    }

    pub fn flash_duration(&self) -> Duration {
        Duration::from_millis(self.flash_duration_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_object_is_default() {
        let config = TagDeckConfig::from_json_str("{}").unwrap();
        assert_eq!(config, TagDeckConfig::default());
        assert_eq!(config.results.selection_config(), SelectionConfig::default());
        assert_eq!(config.flash_duration(), Duration::from_millis(450));
        assert_eq!(config.history_step, 5);
        assert_eq!(config.rating_policy, PendingPolicy::ReplaceLatest);
    }

    #[test]
    fn test_partial_pane_override() {
        let config = TagDeckConfig::from_json_str(
            r#"{"history": {"press_delay_ms": 400}, "rating_policy": {"type": "queue", "capacity": 2}}"#,
        )
        .unwrap();
        assert_eq!(config.history.press_delay_ms, 400);
        assert_eq!(config.history.move_threshold, DEFAULT_MOVE_THRESHOLD);
        assert_eq!(config.results, PaneConfig::default());
        assert_eq!(config.rating_policy, PendingPolicy::Queue { capacity: 2 });
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            TagDeckConfig::from_json_str(r#"{"history_step": 0}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            TagDeckConfig::from_json_str(r#"{"results": {"move_threshold": -1.0}}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            TagDeckConfig::from_json_str(r#"{"rating_policy": {"type": "queue", "capacity": 0}}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(TagDeckConfig::from_json_str("{"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"primary_policy": "locked", "tenant": "acme"}}"#).unwrap();

        let config = TagDeckConfig::load(file.path()).unwrap();
        assert_eq!(config.primary_policy, PrimaryPolicy::Locked);
        assert_eq!(config.tenant, "acme");
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = TagDeckConfig::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
