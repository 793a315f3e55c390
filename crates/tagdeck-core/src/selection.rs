//! Pointer-driven multi-select over an ordered grid.
//!
//! # State machine
//!
//! ```text
//! Idle -> Pressing     (primary down on an unselected item, deadline armed)
//! Pressing -> Idle     (pointer up, or movement beyond the threshold: plain click)
//! Pressing -> Selecting (deadline reached while still pressed)
//! Selecting -> Idle    (pointer up; the selection is kept)
//! ```
//!
//! While selecting, hovering another cell selects the inclusive range between
//! the pressed cell and the hovered one. The range is always cut from the order
//! as it is *at hover time*, so items reordered mid-gesture are honoured.
//!
//! Timers are deadlines checked by [`SelectionEngine::tick`]; cancelling one is
//! clearing an `Option` and can be repeated freely.

use std::cell::RefCell;
use std::rc::Rc;

#[cfg(not(target_arch = "wasm32"))]
use std::time::{Duration, Instant};
#[cfg(target_arch = "wasm32")]
use web_time::{Duration, Instant};

use kurbo::Point;

use crate::input::{MouseButton, manhattan};
use crate::items::{ItemId, WorkingSet};
use crate::payload::{DragPayload, DragSource};

/// Default hold time before a press turns into range selection.
pub const DEFAULT_PRESS_DELAY_MS: u64 = 250;
/// Default manhattan distance a press may drift before it counts as a click.
pub const DEFAULT_MOVE_THRESHOLD: f64 = 6.0;

/// Tuning for one engine.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionConfig {
    pub press_delay: Duration,
    pub move_threshold: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            press_delay: Duration::from_millis(DEFAULT_PRESS_DELAY_MS),
            move_threshold: DEFAULT_MOVE_THRESHOLD,
        }
    }
}

/// Supplies the current visual order of a grid.
///
/// Called on every timer fire and every hover; implementations must not cache.
pub trait OrderProvider {
    fn current_order(&self) -> Vec<ItemId>;
}

impl OrderProvider for Vec<ItemId> {
    fn current_order(&self) -> Vec<ItemId> {
        self.clone()
    }
}

impl OrderProvider for WorkingSet {
    fn current_order(&self) -> Vec<ItemId> {
        self.ids()
    }
}

impl<T: OrderProvider + ?Sized> OrderProvider for RefCell<T> {
    fn current_order(&self) -> Vec<ItemId> {
        self.borrow().current_order()
    }
}

impl<T: OrderProvider + ?Sized> OrderProvider for Rc<T> {
    fn current_order(&self) -> Vec<ItemId> {
        (**self).current_order()
    }
}

/// Adapts a closure into an [`OrderProvider`].
pub struct OrderFn<F>(pub F);

impl<F: Fn() -> Vec<ItemId>> OrderProvider for OrderFn<F> {
    fn current_order(&self) -> Vec<ItemId> {
        (self.0)()
    }
}

/// Coarse state of the gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPhase {
    Idle,
    Pressing,
    Selecting,
}

/// Observable changes produced by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionEvent {
    /// The selection now holds exactly these ids, in order.
    Changed(Vec<ItemId>),
    /// Highlight this item briefly.
    Flash(ItemId),
    /// A long press turned into range selection.
    SelectingStarted { item_id: ItemId },
    /// The pointer was released after range selection.
    SelectingEnded,
}

/// What a click did to the selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClickOutcome {
    /// The click was consumed; the caller must not run its default action.
    pub handled: bool,
    /// The selection changed.
    pub changed: bool,
}

#[derive(Debug, Clone)]
struct PressState {
    origin: Point,
    index: usize,
    item_id: ItemId,
    deadline: Instant,
}

/// Gesture state machine and owner of the ordered selection of one pane.
#[derive(Debug, Clone)]
pub struct SelectionEngine {
    config: SelectionConfig,
    press: Option<PressState>,
    selecting: bool,
    long_press_triggered: bool,
    suppress_next_click: bool,
    start_index: Option<usize>,
    end_index: Option<usize>,
    selection: Vec<ItemId>,
}

impl Default for SelectionEngine {
    fn default() -> Self {
        Self::new(SelectionConfig::default())
    }
}

impl SelectionEngine {
    pub fn new(config: SelectionConfig) -> Self {
        Self {
            config,
            press: None,
            selecting: false,
            long_press_triggered: false,
            suppress_next_click: false,
            start_index: None,
            end_index: None,
            selection: Vec::new(),
        }
    }

    pub fn config(&self) -> &SelectionConfig {
        &self.config
    }

    pub fn selection(&self) -> &[ItemId] {
        &self.selection
    }

    pub fn is_selected(&self, id: ItemId) -> bool {
        self.selection.contains(&id)
    }

    pub fn is_selecting(&self) -> bool {
        self.selecting
    }

    pub fn start_index(&self) -> Option<usize> {
        self.start_index
    }

    pub fn end_index(&self) -> Option<usize> {
        self.end_index
    }

    pub fn long_press_triggered(&self) -> bool {
        self.long_press_triggered
    }

    pub fn suppresses_next_click(&self) -> bool {
        self.suppress_next_click
    }

    pub fn phase(&self) -> SelectionPhase {
        if self.selecting {
            SelectionPhase::Selecting
        } else if self.press.is_some() {
            SelectionPhase::Pressing
        } else {
            SelectionPhase::Idle
        }
    }

    /// When the pending press will turn into selection, if one is pending.
    pub fn press_deadline(&self) -> Option<Instant> {
        self.press.as_ref().map(|p| p.deadline)
    }

    /// Primary button went down on the cell at `index`.
    pub fn pointer_down(
        &mut self,
        position: Point,
        button: MouseButton,
        index: usize,
        item_id: ItemId,
        now: Instant,
    ) {
        if !button.is_primary() || self.selecting {
            return;
        }

        self.cancel_press_state();
        if self.selection.contains(&item_id) {
            // Pressing a selected item starts a drag of the selection, not a new range.
            self.suppress_next_click = true;
            return;
        }

        self.suppress_next_click = false;
        self.press = Some(PressState {
            origin: position,
            index,
            item_id,
            deadline: now + self.config.press_delay,
        });
    }

    /// Pointer moved. Returns true if the pending press was abandoned.
    pub fn pointer_move(&mut self, position: Point) -> bool {
        let Some(press) = &self.press else {
            return false;
        };
        if manhattan(position - press.origin) > self.config.move_threshold {
            log::trace!("Press on {} moved past threshold, treating as click", press.item_id);
            self.cancel_press_state();
            return true;
        }
        false
    }

    /// Fire the press deadline if it has elapsed.
    pub fn tick(&mut self, now: Instant, order: &dyn OrderProvider) -> Vec<SelectionEvent> {
        let press = match self.press.take() {
            Some(press) if now >= press.deadline => press,
            pending => {
                self.press = pending;
                return Vec::new();
            }
        };

        self.selecting = true;
        self.long_press_triggered = true;
        self.suppress_next_click = true;
        self.start_index = Some(press.index);
        self.end_index = Some(press.index);

        let mut events = vec![
            SelectionEvent::SelectingStarted { item_id: press.item_id },
            SelectionEvent::Flash(press.item_id),
        ];
        events.extend(self.update_selection(order));
        events
    }

    /// The pointer entered the cell at `index` while the button is held.
    pub fn select_hover(&mut self, index: usize, order: &dyn OrderProvider) -> Option<SelectionEvent> {
        if !self.selecting || self.end_index == Some(index) {
            return None;
        }
        self.end_index = Some(index);
        self.update_selection(order)
    }

    /// Primary button released.
    pub fn pointer_up(&mut self) -> Vec<SelectionEvent> {
        let mut events = Vec::new();
        if self.selecting {
            self.selecting = false;
            events.push(SelectionEvent::SelectingEnded);
        }
        self.cancel_press_state();
        events
    }

    /// Resolve a plain click on `item_id` at `index`.
    ///
    /// With `toggle`, membership of the item flips. Otherwise a click that
    /// follows a long press or a press on a selected item is swallowed, and a
    /// click while something is selected dismisses the selection instead of
    /// opening the item.
    pub fn click_selection(
        &mut self,
        item_id: ItemId,
        index: usize,
        order: &dyn OrderProvider,
        toggle: bool,
    ) -> ClickOutcome {
        if self.selecting {
            return ClickOutcome { handled: true, changed: false };
        }

        if toggle {
            self.suppress_next_click = false;
            let mut wanted = self.selection.clone();
            match wanted.iter().position(|&id| id == item_id) {
                Some(pos) => {
                    wanted.remove(pos);
                }
                None => wanted.push(item_id),
            }
            let next = first_occurrences(order.current_order().into_iter().filter(|id| wanted.contains(id)));
            self.start_index = Some(index);
            self.end_index = Some(index);
            let changed = self.set_selection(next).is_some();
            return ClickOutcome { handled: true, changed };
        }

        if self.suppress_next_click {
            self.suppress_next_click = false;
            return ClickOutcome { handled: true, changed: false };
        }

        if !self.selection.is_empty() {
            self.clear_selection();
            return ClickOutcome { handled: true, changed: true };
        }

        ClickOutcome::default()
    }

    /// Drop any pending press. Safe to call at any time, any number of times.
    pub fn cancel_press_state(&mut self) {
        self.press = None;
        self.long_press_triggered = false;
    }

    /// Recompute the range selection from the current order.
    pub fn update_selection(&mut self, order: &dyn OrderProvider) -> Option<SelectionEvent> {
        let (Some(start), Some(end)) = (self.start_index, self.end_index) else {
            return None;
        };
        let next = range_slice(&order.current_order(), start, end);
        self.set_selection(next)
    }

    /// Empty the selection.
    pub fn clear_selection(&mut self) -> Option<SelectionEvent> {
        self.start_index = None;
        self.end_index = None;
        self.set_selection(Vec::new())
    }

    /// Forget `ids`, e.g. after a drop moved them out of the pane.
    pub fn remove_items(&mut self, ids: &[ItemId]) -> Option<SelectionEvent> {
        let next: Vec<ItemId> = self
            .selection
            .iter()
            .copied()
            .filter(|id| !ids.contains(id))
            .collect();
        self.set_selection(next)
    }

    /// Context changed (tab, tenant, global selection end): drop everything.
    pub fn reset(&mut self) -> Option<SelectionEvent> {
        self.cancel_press_state();
        self.selecting = false;
        self.suppress_next_click = false;
        self.clear_selection()
    }

    /// A native drag started on `item_id`.
    ///
    /// Dragging a selected item carries the whole selection; any other item
    /// travels alone.
    pub fn begin_drag(&mut self, item_id: ItemId, source: DragSource) -> DragPayload {
        self.cancel_press_state();
        self.suppress_next_click = false;
        if self.selection.contains(&item_id) {
            DragPayload::new(self.selection.clone(), source)
        } else {
            DragPayload::new(vec![item_id], source)
        }
    }

    fn set_selection(&mut self, next: Vec<ItemId>) -> Option<SelectionEvent> {
        if next == self.selection {
            return None;
        }
        self.selection = next;
        Some(SelectionEvent::Changed(self.selection.clone()))
    }
}

/// Inclusive slice between two indices, clamped to the order's length.
fn range_slice(order: &[ItemId], start: usize, end: usize) -> Vec<ItemId> {
    let Some(last) = order.len().checked_sub(1) else {
        return Vec::new();
    };
    let lo = start.min(end).min(last);
    let hi = start.max(end).min(last);
    first_occurrences(order[lo..=hi].iter().copied())
}

/// An order may list an item in several cells; the selection holds it once.
fn first_occurrences(ids: impl Iterator<Item = ItemId>) -> Vec<ItemId> {
    let mut unique = Vec::new();
    for id in ids {
        if !unique.contains(&id) {
            unique.push(id);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const DELAY: Duration = Duration::from_millis(DEFAULT_PRESS_DELAY_MS);

    fn at(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    /// Long-press the item at `index` and let the deadline pass.
    fn long_press(
        engine: &mut SelectionEngine,
        order: &dyn OrderProvider,
        index: usize,
        t0: Instant,
    ) -> Vec<SelectionEvent> {
        let item = order.current_order()[index];
        engine.pointer_down(at(10.0, 10.0), MouseButton::Left, index, item, t0);
        engine.tick(t0 + DELAY, order)
    }

    #[test]
    fn test_short_press_creates_no_selection() {
        let order = vec![10, 11, 12];
        let t0 = Instant::now();
        let mut engine = SelectionEngine::default();

        engine.pointer_down(at(0.0, 0.0), MouseButton::Left, 1, 11, t0);
        assert_eq!(engine.phase(), SelectionPhase::Pressing);
        assert!(engine.tick(t0 + DELAY / 2, &order).is_empty());
        engine.pointer_up();

        assert!(engine.tick(t0 + DELAY * 4, &order).is_empty());
        assert!(engine.selection().is_empty());
        assert_eq!(engine.phase(), SelectionPhase::Idle);
    }

    #[test]
    fn test_movement_past_threshold_cancels_press() {
        let order = vec![10, 11, 12];
        let t0 = Instant::now();
        let mut engine = SelectionEngine::default();

        engine.pointer_down(at(0.0, 0.0), MouseButton::Left, 0, 10, t0);
        assert!(!engine.pointer_move(at(3.0, 3.0)));
        assert_eq!(engine.phase(), SelectionPhase::Pressing);
        assert!(engine.pointer_move(at(4.0, 3.0)));
        assert_eq!(engine.phase(), SelectionPhase::Idle);

        assert!(engine.tick(t0 + DELAY, &order).is_empty());
        assert!(engine.selection().is_empty());
    }

    #[test]
    fn test_hold_enters_selecting_with_single_item() {
        let order = vec![10, 11, 12];
        let t0 = Instant::now();
        let mut engine = SelectionEngine::default();

        let events = long_press(&mut engine, &order, 2, t0);

        assert_eq!(
            events,
            vec![
                SelectionEvent::SelectingStarted { item_id: 12 },
                SelectionEvent::Flash(12),
                SelectionEvent::Changed(vec![12]),
            ]
        );
        assert!(engine.is_selecting());
        assert!(engine.long_press_triggered());
        assert_eq!(engine.start_index(), Some(2));
        assert_eq!(engine.end_index(), Some(2));
    }

    #[test]
    fn test_flash_requested_once_per_transition() {
        let order = vec![10, 11, 12];
        let t0 = Instant::now();
        let mut engine = SelectionEngine::default();

        let events = long_press(&mut engine, &order, 0, t0);
        let later = engine.tick(t0 + DELAY * 3, &order);
        let flashes = events
            .iter()
            .chain(later.iter())
            .filter(|e| matches!(e, SelectionEvent::Flash(_)))
            .count();
        assert_eq!(flashes, 1);
    }

    #[test]
    fn test_range_scenario() {
        let order = vec![10, 11, 12, 13];
        let t0 = Instant::now();
        let mut engine = SelectionEngine::default();

        long_press(&mut engine, &order, 1, t0);
        assert_eq!(engine.selection(), &[11]);

        engine.select_hover(3, &order);
        assert_eq!(engine.selection(), &[11, 12, 13]);

        engine.select_hover(0, &order);
        assert_eq!(engine.selection(), &[10, 11]);
    }

    #[test]
    fn test_hover_reads_order_at_hover_time() {
        let order = Rc::new(RefCell::new(vec![10, 11, 12, 13]));
        let t0 = Instant::now();
        let mut engine = SelectionEngine::default();

        long_press(&mut engine, &order, 0, t0);
        *order.borrow_mut() = vec![13, 12, 11, 10];

        engine.select_hover(1, &order);
        assert_eq!(engine.selection(), &[13, 12]);
    }

    #[test]
    fn test_hover_same_index_is_noop() {
        let order = vec![1, 2, 3];
        let t0 = Instant::now();
        let mut engine = SelectionEngine::default();
        long_press(&mut engine, &order, 1, t0);

        assert!(engine.select_hover(1, &order).is_none());
        assert!(engine.select_hover(2, &order).is_some());
        assert!(engine.select_hover(2, &order).is_none());
    }

    #[test]
    fn test_hover_ignored_unless_selecting() {
        let order = vec![1, 2, 3];
        let mut engine = SelectionEngine::default();
        assert!(engine.select_hover(2, &order).is_none());
        assert!(engine.selection().is_empty());
    }

    #[test]
    fn test_hover_beyond_shrunken_order_is_clamped() {
        let order = Rc::new(RefCell::new(vec![1, 2, 3, 4, 5]));
        let t0 = Instant::now();
        let mut engine = SelectionEngine::default();
        long_press(&mut engine, &order, 1, t0);

        *order.borrow_mut() = vec![1, 2, 3];
        engine.select_hover(4, &order);
        assert_eq!(engine.selection(), &[2, 3]);

        order.borrow_mut().clear();
        engine.select_hover(0, &order);
        assert!(engine.selection().is_empty());
    }

    #[test]
    fn test_non_primary_button_ignored() {
        let t0 = Instant::now();
        let mut engine = SelectionEngine::default();
        engine.pointer_down(at(0.0, 0.0), MouseButton::Right, 0, 1, t0);
        assert_eq!(engine.phase(), SelectionPhase::Idle);
    }

    #[test]
    fn test_press_on_selected_item_suppresses_click() {
        let order = vec![1, 2, 3];
        let t0 = Instant::now();
        let mut engine = SelectionEngine::default();
        long_press(&mut engine, &order, 0, t0);
        engine.select_hover(1, &order);
        engine.pointer_up();
        // The click that follows the long press is swallowed.
        assert_eq!(
            engine.click_selection(2, 1, &order, false),
            ClickOutcome { handled: true, changed: false }
        );

        engine.pointer_down(at(0.0, 0.0), MouseButton::Left, 1, 2, t0 + DELAY * 2);
        assert_eq!(engine.phase(), SelectionPhase::Idle);
        assert!(engine.suppresses_next_click());

        let outcome = engine.click_selection(2, 1, &order, false);
        assert_eq!(outcome, ClickOutcome { handled: true, changed: false });
        assert_eq!(engine.selection(), &[1, 2]);
    }

    #[test]
    fn test_click_dismisses_existing_selection() {
        let order = vec![1, 2, 3];
        let t0 = Instant::now();
        let mut engine = SelectionEngine::default();
        long_press(&mut engine, &order, 0, t0);
        engine.pointer_up();
        engine.click_selection(1, 0, &order, false);

        engine.pointer_down(at(0.0, 0.0), MouseButton::Left, 2, 3, t0 + DELAY * 2);
        engine.pointer_up();
        let outcome = engine.click_selection(3, 2, &order, false);
        assert_eq!(outcome, ClickOutcome { handled: true, changed: true });
        assert!(engine.selection().is_empty());
    }

    #[test]
    fn test_click_without_selection_is_not_handled() {
        let order = vec![1, 2, 3];
        let mut engine = SelectionEngine::default();
        assert_eq!(engine.click_selection(2, 1, &order, false), ClickOutcome::default());
    }

    #[test]
    fn test_toggle_click_keeps_order() {
        let order = vec![1, 2, 3, 4];
        let mut engine = SelectionEngine::default();

        assert!(engine.click_selection(3, 2, &order, true).changed);
        assert!(engine.click_selection(1, 0, &order, true).changed);
        assert_eq!(engine.selection(), &[1, 3]);

        let outcome = engine.click_selection(3, 2, &order, true);
        assert_eq!(outcome, ClickOutcome { handled: true, changed: true });
        assert_eq!(engine.selection(), &[1]);
    }

    #[test]
    fn test_cancel_press_state_idempotent() {
        let t0 = Instant::now();
        let mut once = SelectionEngine::default();
        let mut twice = SelectionEngine::default();
        for engine in [&mut once, &mut twice] {
            engine.pointer_down(at(0.0, 0.0), MouseButton::Left, 0, 1, t0);
        }

        once.cancel_press_state();
        twice.cancel_press_state();
        twice.cancel_press_state();

        assert_eq!(once.phase(), twice.phase());
        assert_eq!(once.press_deadline(), twice.press_deadline());
        assert_eq!(once.long_press_triggered(), twice.long_press_triggered());
        assert_eq!(once.selection(), twice.selection());
    }

    #[test]
    fn test_changed_only_when_different() {
        let order = vec![1, 2, 3];
        let t0 = Instant::now();
        let mut engine = SelectionEngine::default();
        long_press(&mut engine, &order, 0, t0);

        assert!(engine.update_selection(&order).is_none());
        assert_eq!(engine.clear_selection(), Some(SelectionEvent::Changed(vec![])));
        assert!(engine.clear_selection().is_none());
    }

    #[test]
    fn test_begin_drag_payload() {
        let order = vec![1, 2, 3];
        let t0 = Instant::now();
        let mut engine = SelectionEngine::default();
        long_press(&mut engine, &order, 0, t0);
        engine.select_hover(1, &order);
        engine.pointer_up();

        let payload = engine.begin_drag(2, DragSource::Results);
        assert_eq!(payload.ids(), &[1, 2]);
        assert!(!engine.suppresses_next_click());

        let single = engine.begin_drag(3, DragSource::Results);
        assert_eq!(single.ids(), &[3]);
    }

    #[test]
    fn test_remove_items_and_reset() {
        let order = vec![1, 2, 3];
        let t0 = Instant::now();
        let mut engine = SelectionEngine::default();
        long_press(&mut engine, &order, 0, t0);
        engine.select_hover(2, &order);

        assert_eq!(engine.remove_items(&[2]), Some(SelectionEvent::Changed(vec![1, 3])));
        assert!(engine.reset().is_some());
        assert_eq!(engine.phase(), SelectionPhase::Idle);
        assert!(engine.selection().is_empty());
        assert_eq!(engine.start_index(), None);
    }

    #[test]
    fn test_repeated_cells_select_item_once() {
        // The same item rendered in two cells, as in the history pane.
        let order = vec![1, 3, 1, 2];
        let t0 = Instant::now();
        let mut engine = SelectionEngine::default();

        long_press(&mut engine, &order, 2, t0);
        assert_eq!(engine.selection(), &[1]);

        engine.select_hover(3, &order);
        assert_eq!(engine.selection(), &[1, 2]);

        engine.select_hover(0, &order);
        assert_eq!(engine.selection(), &[1, 3]);
    }

    #[test]
    fn test_order_fn_provider() {
        let order = OrderFn(|| vec![5, 6, 7]);
        let t0 = Instant::now();
        let mut engine = SelectionEngine::default();
        long_press(&mut engine, &order, 1, t0);
        engine.select_hover(2, &order);
        assert_eq!(engine.selection(), &[6, 7]);
    }

    proptest! {
        #[test]
        fn test_hover_slices_current_permutation(
            (start, hover, before, after) in (2usize..24).prop_flat_map(|n| {
                let ids: Vec<ItemId> = (1..=n as ItemId).collect();
                (
                    0..n,
                    0..n,
                    Just(ids.clone()).prop_shuffle(),
                    Just(ids).prop_shuffle(),
                )
            })
        ) {
            let order = Rc::new(RefCell::new(before));
            let t0 = Instant::now();
            let mut engine = SelectionEngine::default();
            long_press(&mut engine, &order, start, t0);

            *order.borrow_mut() = after.clone();
            engine.select_hover(hover, &order);

            let expected = after[start.min(hover)..=start.max(hover)].to_vec();
            prop_assert_eq!(engine.selection(), expected.as_slice());
        }
    }
}
