//! Transient highlight feedback keyed by item id.
//!
//! A flash is a deadline, not a running timer: the owner calls [`FlashController::tick`]
//! from its frame loop and re-renders the ids that expired.

use std::collections::HashMap;

#[cfg(not(target_arch = "wasm32"))]
use std::time::{Duration, Instant};
#[cfg(target_arch = "wasm32")]
use web_time::{Duration, Instant};

use crate::items::ItemId;

/// Default highlight duration in milliseconds.
pub const DEFAULT_FLASH_MS: u64 = 450;

/// Tracks which items are currently highlighted and until when.
#[derive(Debug, Clone)]
pub struct FlashController {
    duration: Duration,
    deadlines: HashMap<ItemId, Instant>,
}

impl Default for FlashController {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_FLASH_MS))
    }
}

impl FlashController {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            deadlines: HashMap::new(),
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Highlight `id` until `now + duration`.
    ///
    /// Flashing an id that is already lit restarts its deadline. Returns true
    /// if the id was not lit before, i.e. the item needs a re-render.
    pub fn flash(&mut self, id: ItemId, now: Instant) -> bool {
        self.deadlines.insert(id, now + self.duration).is_none()
    }

    pub fn is_flashing(&self, id: ItemId) -> bool {
        self.deadlines.contains_key(&id)
    }

    /// Number of outstanding highlight deadlines.
    pub fn pending(&self) -> usize {
        self.deadlines.len()
    }

    /// Remove and return the ids whose highlight has elapsed, sorted.
    pub fn tick(&mut self, now: Instant) -> Vec<ItemId> {
        let mut expired: Vec<ItemId> = self
            .deadlines
            .iter()
            .filter(|&(_, &deadline)| now >= deadline)
            .map(|(&id, _)| id)
            .collect();
        for id in &expired {
            self.deadlines.remove(id);
        }
        expired.sort_unstable();
        expired
    }

    /// Stop highlighting `id`. Safe to call for ids that are not lit.
    pub fn cancel(&mut self, id: ItemId) {
        self.deadlines.remove(&id);
    }

    pub fn cancel_all(&mut self) {
        self.deadlines.clear();
    }
}
