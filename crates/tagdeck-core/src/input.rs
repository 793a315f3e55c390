//! Pointer and keyboard events as seen by the curation grid.

use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

use crate::items::ItemId;

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    /// Only the primary button starts presses and clicks.
    pub fn is_primary(self) -> bool {
        self == MouseButton::Left
    }
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub meta: bool,
}

impl Modifiers {
    /// Ctrl/Cmd-click toggles membership instead of dismissing the selection.
    pub fn is_toggle(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// The grid cell under the pointer, resolved by the layout layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridHit {
    /// Position of the cell in the current visual order.
    pub index: usize,
    /// Item rendered in the cell.
    pub item_id: ItemId,
}

/// Pointer event type for a single pointer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PointerEvent {
    Down {
        position: Point,
        button: MouseButton,
        #[serde(default)]
        modifiers: Modifiers,
    },
    Up {
        position: Point,
        button: MouseButton,
    },
    Move {
        position: Point,
    },
}

impl PointerEvent {
    pub fn position(&self) -> Point {
        match self {
            PointerEvent::Down { position, .. }
            | PointerEvent::Up { position, .. }
            | PointerEvent::Move { position } => *position,
        }
    }
}

/// Keyboard event type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "key", rename_all = "snake_case")]
pub enum KeyEvent {
    Pressed(String),
    Released(String),
}

impl KeyEvent {
    /// Whether this is a press of the Escape key.
    pub fn is_escape_press(&self) -> bool {
        matches!(self, KeyEvent::Pressed(key) if key.eq_ignore_ascii_case("escape") || key == "Esc")
    }
}

/// Manhattan length of a pointer displacement.
pub fn manhattan(delta: Vec2) -> f64 {
    delta.x.abs() + delta.y.abs()
}
