//! Interaction script format.
//!
//! A script is the recorded input of one session: the items on screen and a
//! list of timestamped steps. Timestamps are milliseconds from the start of
//! the replay; press and flash deadlines fire whenever a step's timestamp
//! passes them.
//!
//! ```text
//! {
//!   "items": [{"id": 5, "title": "Lion"}, {"id": 6}],
//!   "steps": [
//!     {"at_ms": 0, "action": {"type": "configure_target", "target": 1, "keyword": "Animals::Lion"}},
//!     {"at_ms": 0, "action": {"type": "pointer", "pane": "results",
//!         "event": {"type": "down", "position": {"x": 0.0, "y": 0.0}, "button": "left"},
//!         "hit": {"index": 0, "item_id": 5}}},
//!     {"at_ms": 300, "action": {"type": "hover", "pane": "results", "index": 1}},
//!     {"at_ms": 320, "action": {"type": "drag", "pane": "results", "item_id": 5}},
//!     {"at_ms": 400, "action": {"type": "drop_hotspot", "target": 1}}
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use tagdeck_core::{
    ActiveView, ConfirmDecision, GridHit, KeyEvent, MediaItem, Membership, Modifiers, Pane, PointerEvent, Rating,
    TagAction, TargetId, TargetKind,
};

use crate::ReplayError;

/// A recorded session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    /// Overrides the configured tenant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,
    #[serde(default)]
    pub items: Vec<MediaItem>,
    #[serde(default)]
    pub membership: Membership,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Script {
    pub fn from_json_str(json: &str) -> Result<Self, ReplayError> {
        let script: Self = serde_json::from_str(json)?;
        if let Some(pos) = script.steps.windows(2).position(|w| w[1].at_ms < w[0].at_ms) {
            return Err(ReplayError::OutOfOrder { step: pos + 1 });
        }
        Ok(script)
    }
}

/// One timestamped input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    #[serde(default)]
    pub at_ms: u64,
    pub action: Action,
}

/// Inputs a front end would feed into a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Raw pointer event over a pane, with the cell under the pointer.
    Pointer {
        pane: Pane,
        event: PointerEvent,
        #[serde(default)]
        hit: Option<GridHit>,
    },
    /// The held pointer entered the cell at `index`.
    Hover { pane: Pane, index: usize },
    Click {
        pane: Pane,
        hit: GridHit,
        #[serde(default)]
        modifiers: Modifiers,
    },
    /// Only advance the clock.
    Tick,
    /// Start a drag on `item_id`; the payload is held until the next drop.
    Drag { pane: Pane, item_id: u64 },
    /// Use a raw drag payload, as a drop from outside the session delivers it.
    Transfer {
        #[serde(default)]
        plain: Option<String>,
        #[serde(default)]
        sidecar: Option<String>,
    },
    DropHotspot { target: TargetId },
    DropRating {
        #[serde(default)]
        preselected: Option<Rating>,
    },
    Confirm { decision: ConfirmDecision },
    Key { event: KeyEvent },
    AddTarget,
    RemoveTarget { target: TargetId },
    ConfigureTarget {
        target: TargetId,
        #[serde(default)]
        kind: Option<TargetKind>,
        /// `category::keyword` token.
        #[serde(default)]
        keyword: Option<String>,
        #[serde(default)]
        action: Option<TagAction>,
        /// Rating as typed by the user.
        #[serde(default)]
        rating: Option<String>,
    },
    SwitchTab { view: ActiveView },
    SwitchTenant { tenant: String },
    LoadPrevious,
    EndSelection,
    ReplaceItems { items: Vec<MediaItem> },
}
