//! Rating values and the confirm-before-apply rating drop zone.
//!
//! A drop on the zone never rates anything by itself. It opens a confirmation
//! that must be answered with one of the four ratings or cancelled; only a
//! confirmed answer reaches the [`RatingApplier`].

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dispatch::{RatingApplier, RatingRequest};
use crate::input::KeyEvent;
use crate::items::{ItemId, WorkingSet};
use crate::payload::{DragPayload, DragSource};

/// Rating errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RatingError {
    #[error("Rating {0} is outside 0..=3")]
    OutOfRange(i64),
}

/// A rating in `0..=3`, where 0 means "discard".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const DISCARD: Rating = Rating(0);
    pub const MAX: u8 = 3;
    /// Every value a confirmation may offer, in display order.
    pub const ALL: [Rating; 4] = [Rating(0), Rating(1), Rating(2), Rating(3)];

    pub fn new(value: i64) -> Result<Self, RatingError> {
        if (0..=Self::MAX as i64).contains(&value) {
            Ok(Rating(value as u8))
        } else {
            Err(RatingError::OutOfRange(value))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_discard(self) -> bool {
        self.0 == 0
    }
}

impl TryFrom<i64> for Rating {
    type Error = RatingError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Rating::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> u8 {
        rating.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What happens when a drop arrives while a confirmation is still open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PendingPolicy {
    /// Keep one request; the newer drop replaces the open one.
    #[default]
    ReplaceLatest,
    /// Keep up to `capacity` requests and confirm them in drop order.
    Queue { capacity: usize },
}

/// Ids waiting for a rating decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingPending {
    pub ids: Vec<ItemId>,
    pub source: Option<DragSource>,
    /// Rating to highlight when the confirmation opens.
    pub preselected: Option<Rating>,
}

/// How a confirmation was dismissed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    Button,
    Outside,
    Escape,
}

/// Answer from the confirmation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ConfirmDecision {
    Selected(Rating),
    Cancelled(CancelReason),
}

/// Effect of a confirmed rating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatedOutcome {
    pub ids: Vec<ItemId>,
    pub rating: Rating,
    /// Ids removed from the working set; the caller drops them from its selection.
    pub evicted: Vec<ItemId>,
}

/// Drop zone that asks for a rating before applying it.
#[derive(Debug, Clone, Default)]
pub struct RatingDropZone {
    policy: PendingPolicy,
    pending: VecDeque<RatingPending>,
    rated_count: u64,
    hovered: bool,
}

impl RatingDropZone {
    pub fn new(policy: PendingPolicy) -> Self {
        Self {
            policy,
            ..Default::default()
        }
    }

    pub fn policy(&self) -> PendingPolicy {
        self.policy
    }

    /// The request the confirmation is currently showing.
    pub fn current(&self) -> Option<&RatingPending> {
        self.pending.front()
    }

    pub fn is_open(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Requests waiting, including the one on screen.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Items rated through this zone so far.
    pub fn rated_count(&self) -> u64 {
        self.rated_count
    }

    pub fn is_hovered(&self) -> bool {
        self.hovered
    }

    pub fn drag_over(&mut self) {
        self.hovered = true;
    }

    pub fn drag_leave(&mut self) {
        self.hovered = false;
    }

    /// Open a confirmation for the dropped ids. Returns false if nothing opened.
    pub fn on_drop(&mut self, payload: &DragPayload, preselected: Option<Rating>) -> bool {
        self.hovered = false;
        if payload.is_empty() {
            log::debug!("Ignoring empty drop on rating zone");
            return false;
        }

        let request = RatingPending {
            ids: payload.ids().to_vec(),
            source: payload.source(),
            preselected,
        };

        match self.policy {
            PendingPolicy::ReplaceLatest => {
                if let Some(replaced) = self.pending.pop_front() {
                    log::warn!(
                        "Rating drop of {} items replaces unconfirmed drop of {} items",
                        request.ids.len(),
                        replaced.ids.len()
                    );
                }
                self.pending.push_back(request);
            }
            PendingPolicy::Queue { capacity } => {
                if self.pending.len() >= capacity.max(1) {
                    log::warn!(
                        "Rating queue full ({} pending), refusing drop of {} items",
                        self.pending.len(),
                        request.ids.len()
                    );
                    return false;
                }
                self.pending.push_back(request);
            }
        }
        true
    }

    /// Dismiss the open confirmation without side effects.
    pub fn cancel(&mut self, reason: CancelReason) -> Option<RatingPending> {
        let discarded = self.pending.pop_front();
        if let Some(request) = &discarded {
            log::debug!("Rating of {} items cancelled ({:?})", request.ids.len(), reason);
        }
        discarded
    }

    /// Escape cancels. Returns true if the key was consumed.
    pub fn handle_key(&mut self, key: &KeyEvent) -> bool {
        if self.is_open() && key.is_escape_press() {
            self.cancel(CancelReason::Escape);
            return true;
        }
        false
    }

    /// Apply `rating` to the open request.
    ///
    /// Rated items leave the working set, as they leave an audit queue.
    pub fn confirm(
        &mut self,
        rating: Rating,
        applier: &mut dyn RatingApplier,
        working_set: &mut WorkingSet,
    ) -> Option<RatedOutcome> {
        let request = self.pending.pop_front()?;
        applier.apply_rating(RatingRequest {
            ids: request.ids.clone(),
            rating,
        });
        self.rated_count += request.ids.len() as u64;
        let evicted = working_set.remove(&request.ids);
        log::info!("Rated {} items as {}", request.ids.len(), rating);
        Some(RatedOutcome {
            ids: request.ids,
            rating,
            evicted,
        })
    }

    /// Route a confirmation answer.
    pub fn resolve(
        &mut self,
        decision: ConfirmDecision,
        applier: &mut dyn RatingApplier,
        working_set: &mut WorkingSet,
    ) -> Option<RatedOutcome> {
        match decision {
            ConfirmDecision::Selected(rating) => self.confirm(rating, applier, working_set),
            ConfirmDecision::Cancelled(reason) => {
                self.cancel(reason);
                None
            }
        }
    }

    /// Discard every open request.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.hovered = false;
    }
}
