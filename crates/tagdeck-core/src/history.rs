//! Browsable history of classified drops.
//!
//! Every successful drop on a hotspot records one immutable [`HistoryBatch`].
//! Batches are kept newest first and never trimmed; the pane renders only the
//! first `visible_count` of them and reveals more on request. The batch list,
//! the visible count and the active view are persisted per tenant whenever
//! they change.

use std::sync::Arc;

#[cfg(not(target_arch = "wasm32"))]
use std::time::{SystemTime, UNIX_EPOCH};
#[cfg(target_arch = "wasm32")]
use web_time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::hotspot::HotspotTarget;
use crate::items::{ItemId, WorkingSet};
use crate::payload::DragPayload;
use crate::storage::{SessionKey, SessionStorage, load_snapshot, save_snapshot};

/// Number of batches "load previous" reveals at a time.
pub const DEFAULT_HISTORY_STEP: usize = 5;

/// Feature name used in session keys.
pub const HISTORY_FEATURE: &str = "hotspot-history";

/// Which pane the user is looking at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActiveView {
    #[default]
    Results,
    History,
}

/// One image inside a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryImage {
    pub id: ItemId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

/// The recorded outcome of one drop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryBatch {
    pub batch_id: Uuid,
    /// Milliseconds since the Unix epoch.
    pub created_at: u64,
    pub target_label: String,
    pub source_label: String,
    pub images: Vec<HistoryImage>,
}

/// Persisted state of the history pane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    #[serde(default)]
    pub active_view: ActiveView,
    #[serde(default)]
    pub batches: Vec<HistoryBatch>,
    #[serde(default = "default_visible_count")]
    pub visible_count: usize,
}

fn default_visible_count() -> usize {
    1
}

impl Default for HistorySnapshot {
    fn default() -> Self {
        Self {
            active_view: ActiveView::Results,
            batches: Vec::new(),
            visible_count: default_visible_count(),
        }
    }
}

/// The first `visible_count` batches.
pub fn visible_batches(batches: &[HistoryBatch], visible_count: usize) -> &[HistoryBatch] {
    &batches[..visible_count.min(batches.len())]
}

/// Visible count after revealing `step` more batches, capped at `total`.
pub fn load_previous(visible_count: usize, total: usize, step: usize) -> usize {
    total.min(visible_count.saturating_add(step))
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Look an id up in the collections, first match wins, then in the payload previews.
fn resolve_image(id: ItemId, collections: &[&WorkingSet], payload: &DragPayload) -> HistoryImage {
    if let Some(item) = collections.iter().find_map(|c| c.get(id)) {
        return HistoryImage {
            id,
            title: Some(item.title.clone()).filter(|t| !t.is_empty()),
            thumbnail: item.thumbnail.clone(),
        };
    }
    match payload.preview(id) {
        Some(preview) => HistoryImage {
            id,
            title: preview.title.clone(),
            thumbnail: preview.thumbnail.clone(),
        },
        None => HistoryImage {
            id,
            title: None,
            thumbnail: None,
        },
    }
}

/// Records drop batches and persists the history pane's state.
pub struct HistoryRecorder<S: SessionStorage + ?Sized> {
    storage: Arc<S>,
    key: SessionKey,
    state: HistorySnapshot,
    step: usize,
}

impl<S: SessionStorage + ?Sized> HistoryRecorder<S> {
    /// Create a recorder and restore whatever `key` holds.
    pub fn new(storage: Arc<S>, key: SessionKey) -> Self {
        let mut recorder = Self {
            storage,
            key,
            state: HistorySnapshot::default(),
            step: DEFAULT_HISTORY_STEP,
        };
        recorder.restore();
        recorder
    }

    pub fn with_step(mut self, step: usize) -> Self {
        self.step = step.max(1);
        self
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    pub fn batches(&self) -> &[HistoryBatch] {
        &self.state.batches
    }

    pub fn visible_count(&self) -> usize {
        self.state.visible_count
    }

    /// The batches the pane renders.
    pub fn visible(&self) -> &[HistoryBatch] {
        visible_batches(&self.state.batches, self.state.visible_count)
    }

    pub fn active_view(&self) -> ActiveView {
        self.state.active_view
    }

    pub fn snapshot(&self) -> &HistorySnapshot {
        &self.state
    }

    /// Reload state from storage; absent or corrupt state yields the default.
    pub fn restore(&mut self) {
        let mut state: HistorySnapshot = load_snapshot(&*self.storage, &self.key);
        state.visible_count = state.visible_count.max(1);
        self.state = state;
    }

    /// Re-key to `tenant` and load that tenant's stored state. Nothing is written.
    pub fn switch_tenant(&mut self, tenant: &str) {
        if self.key.tenant == tenant {
            return;
        }
        self.key = SessionKey::new(self.key.feature.clone(), tenant);
        self.restore();
        log::info!("History switched to {}", self.key);
    }

    /// Record a drop of `payload` on `target`.
    ///
    /// Returns `None` without recording when the target is unconfigured or
    /// the payload is empty.
    pub fn record_batch(
        &mut self,
        target: &HotspotTarget,
        payload: &DragPayload,
        collections: &[&WorkingSet],
    ) -> Option<&HistoryBatch> {
        self.record_batch_at(target, payload, collections, now_millis())
    }

    /// [`record_batch`](Self::record_batch) with an explicit timestamp.
    pub fn record_batch_at(
        &mut self,
        target: &HotspotTarget,
        payload: &DragPayload,
        collections: &[&WorkingSet],
        created_at: u64,
    ) -> Option<&HistoryBatch> {
        if payload.is_empty() || !target.is_configured() {
            return None;
        }

        let batch = HistoryBatch {
            batch_id: Uuid::new_v4(),
            created_at,
            target_label: target.label(),
            source_label: payload.source().map(|s| s.label()).unwrap_or("Unknown").to_string(),
            images: payload
                .ids()
                .iter()
                .map(|&id| resolve_image(id, collections, payload))
                .collect(),
        };
        log::debug!("Recording history batch {} ({})", batch.batch_id, batch.target_label);
        self.state.batches.insert(0, batch);
        self.persist();
        self.state.batches.first()
    }

    /// Reveal up to one more step of older batches. Returns the new visible count.
    pub fn reveal_previous(&mut self) -> usize {
        let next = load_previous(self.state.visible_count, self.state.batches.len(), self.step);
        if next > self.state.visible_count {
            self.state.visible_count = next;
            self.persist();
        }
        self.state.visible_count
    }

    pub fn set_active_view(&mut self, view: ActiveView) {
        if self.state.active_view != view {
            self.state.active_view = view;
            self.persist();
        }
    }

    /// Forget every batch and reset the window.
    pub fn clear(&mut self) {
        self.state.batches.clear();
        self.state.visible_count = default_visible_count();
        self.persist();
    }

    fn persist(&self) {
        if let Err(e) = save_snapshot(&*self.storage, &self.key, &self.state) {
            log::warn!("Failed to persist history for {}: {}", self.key, e);
        }
    }
}
