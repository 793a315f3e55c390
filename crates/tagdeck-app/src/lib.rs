//! TagDeck Replay
//!
//! Command-line driver that replays recorded interaction scripts through a
//! TagDeck session and reports the commands, ratings and history it produced.

mod replay;
mod script;

pub use replay::{ReplayReport, Replayer};
pub use script::{Action, Script, Step};

use std::path::PathBuf;

use tagdeck_core::{ConfigError, HotspotError, StorageError};
use thiserror::Error;

/// Replay errors.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid script: {0}")]
    Script(#[from] serde_json::Error),
    #[error("Step {step} is earlier than the step before it")]
    OutOfOrder { step: usize },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("Step {step}: {source}")]
    Hotspot {
        step: usize,
        #[source]
        source: HotspotError,
    },
    #[error("Step {step} drops without a preceding drag or transfer")]
    NoPayload { step: usize },
    #[error("Failed to write report: {0}")]
    Output(#[source] serde_json::Error),
}
