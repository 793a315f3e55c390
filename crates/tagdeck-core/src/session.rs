//! The interaction session: every engine, timer and collaborator of one view.
//!
//! A [`Session`] owns one [`SelectionEngine`] per pane, the flash controller,
//! the hotspot registry, the rating drop zone, the history recorder and the
//! locally held working set. Front ends feed it pointer, drag and key events
//! together with the current [`Instant`], and call [`Session::tick`] from their
//! frame loop so press and flash deadlines can fire.
//!
//! Context changes (tab switch, tenant switch, the end of a global selection)
//! clear both selections. [`Session::shutdown`] cancels every outstanding
//! deadline and discards unconfirmed ratings; it also runs on drop.

use std::sync::Arc;

#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;
#[cfg(target_arch = "wasm32")]
use web_time::Instant;

use kurbo::Point;
use serde::{Deserialize, Serialize};

use crate::config::TagDeckConfig;
use crate::dispatch::{CommandDispatcher, RatingApplier};
use crate::flash::FlashController;
use crate::history::{ActiveView, HistoryBatch, HistoryRecorder};
use crate::hotspot::{DropContext, DropOutcome, HotspotRegistry, TargetId};
use crate::input::{GridHit, KeyEvent, Modifiers, PointerEvent};
use crate::items::{ItemId, MediaItem, WorkingSet};
use crate::payload::{DragPayload, DragSource, PreviewMeta};
use crate::rating::{CancelReason, ConfirmDecision, Rating, RatedOutcome, RatingDropZone};
use crate::selection::{ClickOutcome, OrderProvider, SelectionEngine, SelectionEvent};
use crate::storage::{SessionKey, SessionStorage};

/// A selectable grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pane {
    Results,
    History,
}

impl Pane {
    /// Source marker carried by drags that start in this pane.
    pub fn drag_source(self) -> DragSource {
        match self {
            Pane::Results => DragSource::Results,
            Pane::History => DragSource::History,
        }
    }
}

/// Something the front end must react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A selection engine reported a change.
    Selection { pane: Pane, event: SelectionEvent },
    /// The highlight on an item elapsed.
    FlashEnded(ItemId),
}

/// Visual order of the history pane: the images of the visible batches.
struct HistoryOrder<'a>(&'a [HistoryBatch]);

impl OrderProvider for HistoryOrder<'_> {
    fn current_order(&self) -> Vec<ItemId> {
        // One entry per rendered cell; an id recorded in several batches repeats.
        self.0
            .iter()
            .flat_map(|batch| batch.images.iter().map(|image| image.id))
            .collect()
    }
}

fn tag_events(pane: Pane, events: impl IntoIterator<Item = SelectionEvent>) -> Vec<SessionEvent> {
    events
        .into_iter()
        .map(|event| SessionEvent::Selection { pane, event })
        .collect()
}

/// One user's interaction state for one tenant.
pub struct Session<D, R, S: SessionStorage + ?Sized> {
    config: TagDeckConfig,
    results: SelectionEngine,
    history_pane: SelectionEngine,
    flash: FlashController,
    hotspots: HotspotRegistry,
    rating: RatingDropZone,
    history: HistoryRecorder<S>,
    working_set: WorkingSet,
    dispatcher: D,
    ratings: R,
    shut_down: bool,
}

impl<D, R, S> Session<D, R, S>
where
    D: CommandDispatcher,
    R: RatingApplier,
    S: SessionStorage + ?Sized,
{
    /// Create a session and restore the configured tenant's history.
    pub fn new(config: TagDeckConfig, storage: Arc<S>, dispatcher: D, ratings: R) -> Self {
        let key = SessionKey::new(config.history_feature.clone(), config.tenant.clone());
        let history = HistoryRecorder::new(storage, key).with_step(config.history_step);
        log::info!("Session started for tenant {}", config.tenant);
        Self {
            results: SelectionEngine::new(config.results.selection_config()),
            history_pane: SelectionEngine::new(config.history.selection_config()),
            flash: FlashController::new(config.flash_duration()),
            hotspots: HotspotRegistry::new(config.primary_policy),
            rating: RatingDropZone::new(config.rating_policy),
            history,
            working_set: WorkingSet::default(),
            dispatcher,
            ratings,
            config,
            shut_down: false,
        }
    }

    pub fn with_working_set(mut self, working_set: WorkingSet) -> Self {
        self.working_set = working_set;
        self
    }

    pub fn config(&self) -> &TagDeckConfig {
        &self.config
    }

    pub fn engine(&self, pane: Pane) -> &SelectionEngine {
        match pane {
            Pane::Results => &self.results,
            Pane::History => &self.history_pane,
        }
    }

    pub fn selection(&self, pane: Pane) -> &[ItemId] {
        self.engine(pane).selection()
    }

    /// Ids of `pane` in rendered cell order, as hit indices address them.
    pub fn order(&self, pane: Pane) -> Vec<ItemId> {
        match pane {
            Pane::Results => self.working_set.current_order(),
            Pane::History => HistoryOrder(self.history.visible()).current_order(),
        }
    }

    pub fn working_set(&self) -> &WorkingSet {
        &self.working_set
    }

    pub fn flash(&self) -> &FlashController {
        &self.flash
    }

    pub fn hotspots(&self) -> &HotspotRegistry {
        &self.hotspots
    }

    /// Registry access for configuring targets.
    pub fn hotspots_mut(&mut self) -> &mut HotspotRegistry {
        &mut self.hotspots
    }

    pub fn rating_zone(&self) -> &RatingDropZone {
        &self.rating
    }

    pub fn history(&self) -> &HistoryRecorder<S> {
        &self.history
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    pub fn ratings(&self) -> &R {
        &self.ratings
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    fn engine_mut(&mut self, pane: Pane) -> &mut SelectionEngine {
        match pane {
            Pane::Results => &mut self.results,
            Pane::History => &mut self.history_pane,
        }
    }

    /// Replace the held page of results.
    ///
    /// Selected ids that are no longer held leave the selection.
    pub fn set_items(&mut self, items: Vec<MediaItem>) -> Vec<SessionEvent> {
        self.working_set.replace(items);
        let gone: Vec<ItemId> = self
            .results
            .selection()
            .iter()
            .copied()
            .filter(|&id| self.working_set.get(id).is_none())
            .collect();
        tag_events(Pane::Results, self.results.remove_items(&gone))
    }

    /// Route a raw pointer event to `pane`. `hit` is the cell under the pointer.
    pub fn handle_pointer(
        &mut self,
        pane: Pane,
        event: &PointerEvent,
        hit: Option<GridHit>,
        now: Instant,
    ) -> Vec<SessionEvent> {
        match event {
            PointerEvent::Down { position, button, .. } => {
                if let Some(hit) = hit {
                    self.engine_mut(pane)
                        .pointer_down(*position, *button, hit.index, hit.item_id, now);
                }
                Vec::new()
            }
            PointerEvent::Move { position } => {
                self.engine_mut(pane).pointer_move(*position);
                match hit {
                    Some(hit) => self.select_hover(pane, hit.index),
                    None => Vec::new(),
                }
            }
            PointerEvent::Up { button, .. } => {
                if button.is_primary() {
                    self.pointer_up(pane)
                } else {
                    Vec::new()
                }
            }
        }
    }

    /// Pointer moved without entering a new cell. Returns true if a pending press was abandoned.
    pub fn pointer_move(&mut self, pane: Pane, position: Point) -> bool {
        self.engine_mut(pane).pointer_move(position)
    }

    pub fn pointer_up(&mut self, pane: Pane) -> Vec<SessionEvent> {
        tag_events(pane, self.engine_mut(pane).pointer_up())
    }

    /// Extend the range selection of `pane` to the cell at `index`.
    pub fn select_hover(&mut self, pane: Pane, index: usize) -> Vec<SessionEvent> {
        let event = match pane {
            Pane::Results => self.results.select_hover(index, &self.working_set),
            Pane::History => self
                .history_pane
                .select_hover(index, &HistoryOrder(self.history.visible())),
        };
        tag_events(pane, event)
    }

    /// Fire elapsed press deadlines and expire flashes.
    pub fn tick(&mut self, now: Instant) -> Vec<SessionEvent> {
        let mut events = tag_events(Pane::Results, self.results.tick(now, &self.working_set));
        events.extend(tag_events(
            Pane::History,
            self.history_pane.tick(now, &HistoryOrder(self.history.visible())),
        ));

        for event in &events {
            if let SessionEvent::Selection {
                event: SelectionEvent::Flash(id),
                ..
            } = event
            {
                self.flash.flash(*id, now);
            }
        }
        events.extend(self.flash.tick(now).into_iter().map(SessionEvent::FlashEnded));
        events
    }

    /// Resolve a click on a cell. An unhandled outcome means "open the item".
    pub fn click(&mut self, pane: Pane, hit: GridHit, modifiers: Modifiers) -> ClickOutcome {
        let toggle = modifiers.is_toggle();
        match pane {
            Pane::Results => self
                .results
                .click_selection(hit.item_id, hit.index, &self.working_set, toggle),
            Pane::History => self.history_pane.click_selection(
                hit.item_id,
                hit.index,
                &HistoryOrder(self.history.visible()),
                toggle,
            ),
        }
    }

    /// A drag started on `item_id` in `pane`.
    pub fn begin_drag(&mut self, pane: Pane, item_id: ItemId) -> DragPayload {
        let payload = self.engine_mut(pane).begin_drag(item_id, pane.drag_source());
        let previews = payload
            .ids()
            .iter()
            .filter_map(|&id| self.preview_for(pane, id))
            .collect();
        payload.with_previews(previews)
    }

    fn preview_for(&self, pane: Pane, id: ItemId) -> Option<PreviewMeta> {
        match pane {
            Pane::Results => self.working_set.get(id).map(|item| PreviewMeta {
                id,
                title: Some(item.title.clone()).filter(|t| !t.is_empty()),
                thumbnail: item.thumbnail.clone(),
            }),
            Pane::History => self
                .history
                .batches()
                .iter()
                .flat_map(|batch| batch.images.iter())
                .find(|image| image.id == id)
                .map(|image| PreviewMeta {
                    id,
                    title: image.title.clone(),
                    thumbnail: image.thumbnail.clone(),
                }),
        }
    }

    /// Drop `payload` on hotspot `target_id`.
    ///
    /// On success the command is dispatched, evicted items leave the results
    /// selection and a history batch is recorded. The returned events carry
    /// the selection change caused by the eviction.
    pub fn drop_on_hotspot(
        &mut self,
        target_id: TargetId,
        payload: &DragPayload,
    ) -> Option<(DropOutcome, Vec<SessionEvent>)> {
        // Evicted items are gone after the drop; keep them around for the batch images.
        let held = WorkingSet::new(
            payload
                .ids()
                .iter()
                .filter_map(|&id| self.working_set.get(id).cloned())
                .collect(),
        );

        let outcome = self.hotspots.on_drop(
            target_id,
            payload,
            DropContext {
                working_set: &mut self.working_set,
                dispatcher: &mut self.dispatcher,
                ratings: &mut self.ratings,
            },
        )?;

        let events = tag_events(Pane::Results, self.results.remove_items(&outcome.evicted));
        if let Some(target) = self.hotspots.target(target_id) {
            self.history.record_batch(target, payload, &[&held]);
        }
        Some((outcome, events))
    }

    pub fn drag_over_rating(&mut self) {
        self.rating.drag_over();
    }

    pub fn drag_leave_rating(&mut self) {
        self.rating.drag_leave();
    }

    /// Drop `payload` on the rating zone, opening a confirmation.
    pub fn drop_on_rating(&mut self, payload: &DragPayload, preselected: Option<Rating>) -> bool {
        self.rating.on_drop(payload, preselected)
    }

    /// Answer the open rating confirmation.
    ///
    /// Rated ids leave both selections; the events report those changes.
    pub fn resolve_rating(&mut self, decision: ConfirmDecision) -> Option<(RatedOutcome, Vec<SessionEvent>)> {
        let outcome = self
            .rating
            .resolve(decision, &mut self.ratings, &mut self.working_set)?;
        let mut events = tag_events(Pane::Results, self.results.remove_items(&outcome.ids));
        events.extend(tag_events(Pane::History, self.history_pane.remove_items(&outcome.ids)));
        Some((outcome, events))
    }

    pub fn confirm_rating(&mut self, rating: Rating) -> Option<(RatedOutcome, Vec<SessionEvent>)> {
        self.resolve_rating(ConfirmDecision::Selected(rating))
    }

    pub fn cancel_rating(&mut self, reason: CancelReason) {
        self.rating.cancel(reason);
    }

    /// Returns true if the key was consumed.
    pub fn handle_key(&mut self, key: &KeyEvent) -> bool {
        self.rating.handle_key(key)
    }

    /// A selection gesture ended somewhere else in the UI.
    pub fn end_selection(&mut self) -> Vec<SessionEvent> {
        let mut events = tag_events(Pane::Results, self.results.reset());
        events.extend(tag_events(Pane::History, self.history_pane.reset()));
        events
    }

    /// Switch between the results and history panes.
    pub fn switch_tab(&mut self, view: ActiveView) -> Vec<SessionEvent> {
        let events = self.end_selection();
        self.history.set_active_view(view);
        events
    }

    /// Reveal older history batches. Returns the new visible count.
    pub fn load_previous_history(&mut self) -> usize {
        self.history.reveal_previous()
    }

    pub fn clear_history(&mut self) -> Vec<SessionEvent> {
        let events = tag_events(Pane::History, self.history_pane.reset());
        self.history.clear();
        events
    }

    /// Move the session to another tenant.
    ///
    /// Selections, timers, pending ratings and held items are dropped and the
    /// tenant's own history is loaded.
    pub fn switch_tenant(&mut self, tenant: &str) -> Vec<SessionEvent> {
        let events = self.end_selection();
        self.flash.cancel_all();
        self.rating.clear();
        self.working_set.replace(Vec::new());
        self.history.switch_tenant(tenant);
        self.config.tenant = tenant.to_string();
        events
    }

    /// Cancel every deadline and discard pending ratings. Safe to repeat.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        teardown(self);
    }
}

fn teardown<D, R, S: SessionStorage + ?Sized>(session: &mut Session<D, R, S>) {
    session.results.cancel_press_state();
    session.history_pane.cancel_press_state();
    session.flash.cancel_all();
    session.rating.clear();
    session.shut_down = true;
    log::debug!("Session for tenant {} shut down", session.config.tenant);
}

impl<D, R, S: SessionStorage + ?Sized> Drop for Session<D, R, S> {
    fn drop(&mut self) {
        if !self.shut_down {
            teardown(self);
        }
    }
}
