//! Runs a [`Script`] through a [`Session`] and collects what it emitted.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tagdeck_core::{
    Command, DragPayload, HistoryBatch, HotspotTarget, ItemId, Pane, RatingRequest, Session, SessionEvent,
    SessionStorage, TagDeckConfig, WorkingSet,
};

use crate::ReplayError;
use crate::script::{Action, Script, Step};

/// Everything a replay produced, printed as JSON by the binary.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub tenant: String,
    pub commands: Vec<Command>,
    pub ratings: Vec<RatingRequest>,
    pub results_selection: Vec<ItemId>,
    pub history_selection: Vec<ItemId>,
    pub remaining_items: Vec<ItemId>,
    pub targets: Vec<HotspotTarget>,
    pub rated_count: u64,
    pub visible_history: Vec<HistoryBatch>,
    pub total_history: usize,
}

type ReplaySession<S> = Session<Vec<Command>, Vec<RatingRequest>, S>;

/// Drives one session through a script on a virtual clock.
pub struct Replayer<S: SessionStorage + ?Sized> {
    session: ReplaySession<S>,
    start: Instant,
    payload: Option<DragPayload>,
}

impl<S: SessionStorage + ?Sized> Replayer<S> {
    pub fn new(mut config: TagDeckConfig, script: &Script, storage: Arc<S>) -> Self {
        if let Some(tenant) = &script.tenant {
            config.tenant = tenant.clone();
        }
        let working_set = WorkingSet::new(script.items.clone()).with_membership(script.membership.clone());
        Self {
            session: Session::new(config, storage, Vec::new(), Vec::new()).with_working_set(working_set),
            start: Instant::now(),
            payload: None,
        }
    }

    pub fn session(&self) -> &ReplaySession<S> {
        &self.session
    }

    /// Apply every step, then shut the session down.
    pub fn run(mut self, steps: &[Step]) -> Result<ReplayReport, ReplayError> {
        for (index, step) in steps.iter().enumerate() {
            self.apply(index, step)?;
        }
        self.session.shutdown();
        Ok(self.report())
    }

    fn apply(&mut self, index: usize, step: &Step) -> Result<(), ReplayError> {
        let now = self.start + Duration::from_millis(step.at_ms);
        let mut events = self.session.tick(now);
        let session = &mut self.session;

        match &step.action {
            Action::Pointer { pane, event, hit } => events.extend(session.handle_pointer(*pane, event, *hit, now)),
            Action::Hover { pane, index: cell } => events.extend(session.select_hover(*pane, *cell)),
            Action::Click { pane, hit, modifiers } => {
                let outcome = session.click(*pane, *hit, *modifiers);
                if !outcome.handled {
                    log::info!("Step {}: click opens item {}", index, hit.item_id);
                }
            }
            Action::Tick => {}
            Action::Drag { pane, item_id } => {
                let payload = session.begin_drag(*pane, *item_id);
                log::debug!("Step {}: dragging {}", index, payload.to_plain());
                self.payload = Some(payload);
            }
            Action::Transfer { plain, sidecar } => {
                match DragPayload::from_transfer(plain.as_deref(), sidecar.as_deref()) {
                    Ok(payload) => self.payload = Some(payload),
                    Err(e) => {
                        log::debug!("Step {}: unusable transfer ({}), dropping empty payload", index, e);
                        self.payload = Some(DragPayload::default());
                    }
                }
            }
            Action::DropHotspot { target } => {
                let payload = self.payload.take().ok_or(ReplayError::NoPayload { step: index })?;
                match session.drop_on_hotspot(*target, &payload) {
                    Some((_, changed)) => events.extend(changed),
                    None => log::info!("Step {}: drop on hotspot {} ignored", index, target),
                }
            }
            Action::DropRating { preselected } => {
                let payload = self.payload.take().ok_or(ReplayError::NoPayload { step: index })?;
                session.drop_on_rating(&payload, *preselected);
            }
            Action::Confirm { decision } => {
                if let Some((_, changed)) = session.resolve_rating(*decision) {
                    events.extend(changed);
                }
            }
            Action::Key { event } => {
                session.handle_key(event);
            }
            Action::AddTarget => {
                let id = session.hotspots_mut().add_target();
                log::debug!("Step {}: added hotspot {}", index, id);
            }
            Action::RemoveTarget { target } => {
                session
                    .hotspots_mut()
                    .remove_target(*target)
                    .map_err(|source| ReplayError::Hotspot { step: index, source })?;
            }
            Action::ConfigureTarget {
                target,
                kind,
                keyword,
                action,
                rating,
            } => {
                let hotspots = session.hotspots_mut();
                let wrap = |source| ReplayError::Hotspot { step: index, source };
                if let Some(kind) = kind {
                    hotspots.set_type(*target, *kind).map_err(wrap)?;
                }
                if let Some(keyword) = keyword {
                    hotspots.set_keyword(*target, keyword).map_err(wrap)?;
                }
                if let Some(action) = action {
                    hotspots.set_action(*target, *action).map_err(wrap)?;
                }
                if let Some(rating) = rating {
                    hotspots.set_rating(*target, rating).map_err(wrap)?;
                }
            }
            Action::SwitchTab { view } => events.extend(session.switch_tab(*view)),
            Action::SwitchTenant { tenant } => {
                self.payload = None;
                events.extend(session.switch_tenant(tenant));
            }
            Action::LoadPrevious => {
                session.load_previous_history();
            }
            Action::EndSelection => events.extend(session.end_selection()),
            Action::ReplaceItems { items } => events.extend(session.set_items(items.clone())),
        }

        for event in &events {
            log_event(index, event);
        }
        Ok(())
    }

    fn report(&self) -> ReplayReport {
        let session = &self.session;
        ReplayReport {
            tenant: session.config().tenant.clone(),
            commands: session.dispatcher().clone(),
            ratings: session.ratings().clone(),
            results_selection: session.selection(Pane::Results).to_vec(),
            history_selection: session.selection(Pane::History).to_vec(),
            remaining_items: session.working_set().ids(),
            targets: session.hotspots().targets().to_vec(),
            rated_count: session.rating_zone().rated_count(),
            visible_history: session.history().visible().to_vec(),
            total_history: session.history().batches().len(),
        }
    }
}

fn log_event(step: usize, event: &SessionEvent) {
    match event {
        SessionEvent::Selection { pane, event } => log::debug!("Step {}: {:?} {:?}", step, pane, event),
        SessionEvent::FlashEnded(id) => log::trace!("Step {}: flash on {} ended", step, id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagdeck_core::storage::MemoryStorage;

    fn replay(json: &str) -> ReplayReport {
        let script = Script::from_json_str(json).unwrap();
        let storage = Arc::new(MemoryStorage::new());
        Replayer::new(TagDeckConfig::default(), &script, storage)
            .run(&script.steps)
            .unwrap()
    }

    const LONG_PRESS_TO_HOTSPOT: &str = r#"{
        "tenant": "acme",
        "items": [{"id": 5, "title": "Lion"}, {"id": 6}, {"id": 7}, {"id": 8}],
        "steps": [
            {"action": {"type": "configure_target", "target": 1, "keyword": "Animals::Lion"}},
            {"action": {"type": "pointer", "pane": "results",
                "event": {"type": "down", "position": {"x": 0.0, "y": 0.0}, "button": "left"},
                "hit": {"index": 0, "item_id": 5}}},
            {"at_ms": 260, "action": {"type": "hover", "pane": "results", "index": 2}},
            {"at_ms": 280, "action": {"type": "pointer", "pane": "results",
                "event": {"type": "up", "position": {"x": 0.0, "y": 0.0}, "button": "left"}}},
            {"at_ms": 300, "action": {"type": "drag", "pane": "results", "item_id": 6}},
            {"at_ms": 400, "action": {"type": "drop_hotspot", "target": 1}}
        ]
    }"#;

    #[test]
    fn test_long_press_range_drop() {
        let report = replay(LONG_PRESS_TO_HOTSPOT);

        assert_eq!(report.tenant, "acme");
        assert_eq!(report.commands.len(), 1);
        assert_eq!(report.commands[0].targets, vec![5, 6, 7]);
        assert_eq!(report.targets[0].drop_count, 3);
        assert_eq!(report.total_history, 1);
        assert_eq!(report.visible_history[0].images[0].title.as_deref(), Some("Lion"));
        assert_eq!(report.results_selection, vec![5, 6, 7]);
    }

    #[test]
    fn test_rating_confirmation_flow() {
        let report = replay(
            r#"{
                "items": [{"id": 1}, {"id": 2}],
                "steps": [
                    {"action": {"type": "transfer", "plain": "1,2"}},
                    {"action": {"type": "drop_rating"}},
                    {"action": {"type": "key", "event": {"type": "pressed", "key": "Escape"}}},
                    {"action": {"type": "transfer", "plain": "2"}},
                    {"action": {"type": "drop_rating"}},
                    {"action": {"type": "confirm", "decision": {"type": "selected", "value": 3}}}
                ]
            }"#,
        );

        assert_eq!(report.ratings.len(), 1);
        assert_eq!(report.ratings[0].ids, vec![2]);
        assert_eq!(report.rated_count, 1);
        assert_eq!(report.remaining_items, vec![1]);
    }

    #[test]
    fn test_malformed_transfer_is_ignored() {
        let report = replay(
            r#"{
                "items": [{"id": 1}],
                "steps": [
                    {"action": {"type": "configure_target", "target": 1, "keyword": "Lion"}},
                    {"action": {"type": "transfer", "plain": "abc"}},
                    {"action": {"type": "drop_hotspot", "target": 1}}
                ]
            }"#,
        );
        assert!(report.commands.is_empty());
        assert_eq!(report.total_history, 0);
    }

    #[test]
    fn test_drop_without_drag_is_error() {
        let script = Script::from_json_str(r#"{"steps": [{"action": {"type": "drop_hotspot", "target": 1}}]}"#).unwrap();
        let err = Replayer::new(TagDeckConfig::default(), &script, Arc::new(MemoryStorage::new()))
            .run(&script.steps)
            .unwrap_err();
        assert!(matches!(err, ReplayError::NoPayload { step: 0 }));
    }

    #[test]
    fn test_removing_primary_target_fails() {
        let script = Script::from_json_str(
            r#"{"steps": [{"action": {"type": "add_target"}}, {"action": {"type": "remove_target", "target": 1}}]}"#,
        )
        .unwrap();
        let err = Replayer::new(TagDeckConfig::default(), &script, Arc::new(MemoryStorage::new()))
            .run(&script.steps)
            .unwrap_err();
        assert!(matches!(err, ReplayError::Hotspot { step: 1, .. }));
    }

    #[test]
    fn test_history_survives_between_replays() {
        let storage = Arc::new(MemoryStorage::new());
        let script = Script::from_json_str(LONG_PRESS_TO_HOTSPOT).unwrap();
        Replayer::new(TagDeckConfig::default(), &script, storage.clone())
            .run(&script.steps)
            .unwrap();

        let empty = Script::from_json_str(r#"{"tenant": "acme"}"#).unwrap();
        let report = Replayer::new(TagDeckConfig::default(), &empty, storage)
            .run(&empty.steps)
            .unwrap();
        assert_eq!(report.total_history, 1);
    }
}
