//! Configurable drop targets ("hotspots") and the drop classifier.
//!
//! A hotspot either tags or rates what is dropped on it. Dropping validates
//! the payload against the target's configuration and, if both are usable,
//! emits one batched command and mutates the local working set optimistically.
//! Anything unusable is a silent no-op: accidental drags are common.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dispatch::{Command, CommandDispatcher, CommandKind, RatingApplier, RatingRequest, TagOperation};
use crate::items::{DEFAULT_CATEGORY, ItemId, WorkingSet};
use crate::payload::DragPayload;
use crate::rating::Rating;

/// Identifier of a hotspot within its registry.
pub type TargetId = u32;

/// Separator between category and keyword in an encoded keyword token.
pub const KEYWORD_SEPARATOR: &str = "::";

/// Registry configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HotspotError {
    #[error("Unknown hotspot target: {0}")]
    UnknownTarget(TargetId),
    #[error("At least one hotspot target must remain")]
    LastTarget,
    #[error("Primary hotspot target {0} cannot be removed")]
    PrimaryProtected(TargetId),
    #[error("Primary hotspot target {0} cannot change type")]
    PrimaryLocked(TargetId),
}

/// Result type for registry configuration.
pub type HotspotResult<T> = Result<T, HotspotError>;

/// What a target does with dropped items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    #[default]
    Keyword,
    Rating,
}

/// Whether a keyword target adds or removes its tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagAction {
    #[default]
    Add,
    Remove,
}

impl TagAction {
    pub fn signum(self) -> i8 {
        match self {
            TagAction::Add => 1,
            TagAction::Remove => -1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TagAction::Add => "add",
            TagAction::Remove => "remove",
        }
    }
}

/// How much the first target is protected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryPolicy {
    /// The first target is an ordinary target.
    Open,
    /// The first target cannot be removed.
    #[default]
    Protected,
    /// The first target cannot be removed or change type.
    Locked,
}

/// A validated operation a target will perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetOperation {
    Rate(Rating),
    Tag {
        category: String,
        keyword: String,
        signum: i8,
    },
}

/// One drop zone and its configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotspotTarget {
    pub id: TargetId,
    pub kind: TargetKind,
    pub category: String,
    pub keyword: String,
    /// Rating as entered; `None` when blank or not a number.
    pub rating: Option<i64>,
    pub action: TagAction,
    /// Items affected since the configuration last changed.
    pub drop_count: u64,
}

impl HotspotTarget {
    pub fn new(id: TargetId) -> Self {
        Self {
            id,
            kind: TargetKind::Keyword,
            category: String::new(),
            keyword: String::new(),
            rating: None,
            action: TagAction::Add,
            drop_count: 0,
        }
    }

    /// The operation a drop would perform, or `None` while unconfigured.
    pub fn operation(&self) -> Option<TargetOperation> {
        match self.kind {
            TargetKind::Rating => self.rating.and_then(|r| Rating::new(r).ok()).map(TargetOperation::Rate),
            TargetKind::Keyword => {
                let keyword = self.keyword.trim();
                if keyword.is_empty() {
                    return None;
                }
                let category = match self.category.trim() {
                    "" => DEFAULT_CATEGORY,
                    category => category,
                };
                Some(TargetOperation::Tag {
                    category: category.to_string(),
                    keyword: keyword.to_string(),
                    signum: self.action.signum(),
                })
            }
        }
    }

    /// Whether a drop can succeed. Unconfigured targets should render disabled.
    pub fn is_configured(&self) -> bool {
        self.operation().is_some()
    }

    /// Human label, e.g. `Animals: Lion (add)` or `Rating: 2`.
    pub fn label(&self) -> String {
        match self.operation() {
            Some(TargetOperation::Rate(rating)) => format!("Rating: {}", rating),
            Some(TargetOperation::Tag { category, keyword, .. }) => {
                format!("{}: {} ({})", category, keyword, self.action.as_str())
            }
            None => "Unconfigured".to_string(),
        }
    }

    fn identity(&self) -> (TargetKind, &str, &str, Option<i64>, TagAction) {
        (self.kind, &self.category, &self.keyword, self.rating, self.action)
    }
}

/// Split an encoded `category::keyword` token.
///
/// A token without the separator is a bare keyword with no category.
pub fn parse_keyword_token(token: &str) -> (String, String) {
    match token.split_once(KEYWORD_SEPARATOR) {
        Some((category, keyword)) => (category.trim().to_string(), keyword.trim().to_string()),
        None => (String::new(), token.trim().to_string()),
    }
}

/// Collaborators and local state a drop may touch.
pub struct DropContext<'a> {
    pub working_set: &'a mut WorkingSet,
    pub dispatcher: &'a mut dyn CommandDispatcher,
    pub ratings: &'a mut dyn RatingApplier,
}

/// Effect of a classified drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropOutcome {
    pub target_id: TargetId,
    pub operation: TargetOperation,
    /// All ids carried by the payload.
    pub ids: Vec<ItemId>,
    /// Amount added to the target's drop count.
    pub counted: u64,
    /// Ids that left the working set; the caller drops them from its selection.
    pub evicted: Vec<ItemId>,
}

/// Ordered, non-empty collection of hotspot targets.
#[derive(Debug, Clone)]
pub struct HotspotRegistry {
    targets: Vec<HotspotTarget>,
    next_id: TargetId,
    primary_policy: PrimaryPolicy,
    hovered: Option<TargetId>,
}

impl Default for HotspotRegistry {
    fn default() -> Self {
        Self::new(PrimaryPolicy::default())
    }
}

impl HotspotRegistry {
    /// Create a registry holding one blank target.
    pub fn new(primary_policy: PrimaryPolicy) -> Self {
        Self {
            targets: vec![HotspotTarget::new(1)],
            next_id: 2,
            primary_policy,
            hovered: None,
        }
    }

    pub fn targets(&self) -> &[HotspotTarget] {
        &self.targets
    }

    pub fn target(&self, id: TargetId) -> Option<&HotspotTarget> {
        self.targets.iter().find(|t| t.id == id)
    }

    pub fn primary_policy(&self) -> PrimaryPolicy {
        self.primary_policy
    }

    fn target_mut(&mut self, id: TargetId) -> HotspotResult<&mut HotspotTarget> {
        self.targets
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(HotspotError::UnknownTarget(id))
    }

    fn is_primary(&self, id: TargetId) -> bool {
        self.targets.first().is_some_and(|t| t.id == id)
    }

    /// Append a blank keyword target.
    pub fn add_target(&mut self) -> TargetId {
        let id = self.next_id;
        self.next_id += 1;
        self.targets.push(HotspotTarget::new(id));
        id
    }

    pub fn remove_target(&mut self, id: TargetId) -> HotspotResult<HotspotTarget> {
        let pos = self
            .targets
            .iter()
            .position(|t| t.id == id)
            .ok_or(HotspotError::UnknownTarget(id))?;
        if self.targets.len() == 1 {
            return Err(HotspotError::LastTarget);
        }
        if pos == 0 && self.primary_policy != PrimaryPolicy::Open {
            return Err(HotspotError::PrimaryProtected(id));
        }
        if self.hovered == Some(id) {
            self.hovered = None;
        }
        Ok(self.targets.remove(pos))
    }

    /// Apply `edit` and reset the drop count if the target's identity changed.
    fn reconfigure(&mut self, id: TargetId, edit: impl FnOnce(&mut HotspotTarget)) -> HotspotResult<bool> {
        let target = self.target_mut(id)?;
        let before = target.clone();
        edit(&mut *target);
        let changed = before.identity() != target.identity();
        if changed {
            target.drop_count = 0;
        }
        Ok(changed)
    }

    /// Set keyword and category from a `category::keyword` token.
    pub fn set_keyword(&mut self, id: TargetId, token: &str) -> HotspotResult<bool> {
        let (category, keyword) = parse_keyword_token(token);
        self.reconfigure(id, |t| {
            t.category = category;
            t.keyword = keyword;
        })
    }

    pub fn set_action(&mut self, id: TargetId, action: TagAction) -> HotspotResult<bool> {
        self.reconfigure(id, |t| t.action = action)
    }

    pub fn set_type(&mut self, id: TargetId, kind: TargetKind) -> HotspotResult<bool> {
        if self.is_primary(id) && self.primary_policy == PrimaryPolicy::Locked {
            let current = self.target(id).map(|t| t.kind);
            if current != Some(kind) {
                return Err(HotspotError::PrimaryLocked(id));
            }
        }
        self.reconfigure(id, |t| t.kind = kind)
    }

    /// Set the rating from user input.
    ///
    /// Numeric input with no fractional part ("2", "2.0") sets it. Blank,
    /// non-numeric or fractional input unsets it.
    pub fn set_rating(&mut self, id: TargetId, raw: &str) -> HotspotResult<bool> {
        let rating = raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite() && value.fract() == 0.0)
            .map(|value| value as i64);
        self.reconfigure(id, |t| t.rating = rating)
    }

    pub fn hovered(&self) -> Option<TargetId> {
        self.hovered
    }

    pub fn drag_over(&mut self, id: TargetId) {
        self.hovered = Some(id);
    }

    pub fn drag_leave(&mut self, id: TargetId) {
        if self.hovered == Some(id) {
            self.hovered = None;
        }
    }

    /// Classify and apply a drop on target `id`.
    ///
    /// Returns `None` for unknown or unconfigured targets and empty payloads;
    /// nothing is dispatched or counted in that case.
    pub fn on_drop(&mut self, id: TargetId, payload: &DragPayload, ctx: DropContext<'_>) -> Option<DropOutcome> {
        self.drag_leave(id);
        if payload.is_empty() {
            log::debug!("Ignoring empty drop on hotspot {}", id);
            return None;
        }

        let target = self.targets.iter_mut().find(|t| t.id == id)?;
        let Some(operation) = target.operation() else {
            log::debug!("Ignoring drop on unconfigured hotspot {}", id);
            return None;
        };
        let ids = payload.ids().to_vec();

        let (counted, evicted) = match &operation {
            TargetOperation::Rate(rating) => {
                ctx.ratings.apply_rating(RatingRequest {
                    ids: ids.clone(),
                    rating: *rating,
                });
                (ids.len() as u64, Vec::new())
            }
            TargetOperation::Tag {
                category,
                keyword,
                signum,
            } => {
                let operations = ids
                    .iter()
                    .map(|&item_id| TagOperation {
                        item_id,
                        keyword: keyword.clone(),
                        category: category.clone(),
                        signum: *signum,
                    })
                    .collect();
                ctx.dispatcher.dispatch(Command {
                    kind: CommandKind::from_signum(*signum),
                    targets: ids.clone(),
                    label: target.label(),
                    operations,
                });
                let mutation = ctx.working_set.apply_tag(&ids, category, keyword, *signum);
                (mutation.found.len() as u64, mutation.evicted)
            }
        };

        target.drop_count += counted;
        log::info!("Hotspot {} ({}) took {} items", id, target.label(), ids.len());
        Some(DropOutcome {
            target_id: id,
            operation,
            ids,
            counted,
            evicted,
        })
    }
}
