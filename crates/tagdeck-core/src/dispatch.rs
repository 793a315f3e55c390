//! Outgoing commands and the collaborators that deliver them.
//!
//! Delivery is fire-and-forget from the engine's point of view. Whatever sits
//! behind [`CommandDispatcher`] and [`RatingApplier`] owns retries and failure
//! reporting; local state is never rolled back.

use std::sync::mpsc::Sender;

use serde::{Deserialize, Serialize};

use crate::items::ItemId;
use crate::rating::Rating;

/// One signed tag change for one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagOperation {
    pub item_id: ItemId,
    pub keyword: String,
    pub category: String,
    /// +1 adds the tag, -1 removes it.
    pub signum: i8,
}

/// Operation type of a batched command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    AddTags,
    RemoveTags,
}

impl CommandKind {
    pub fn from_signum(signum: i8) -> Self {
        if signum < 0 {
            CommandKind::RemoveTags
        } else {
            CommandKind::AddTags
        }
    }
}

/// A batched tagging command: one per drop, never one per item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    #[serde(rename = "type")]
    pub kind: CommandKind,
    /// Items the command touches, in drop order.
    pub targets: Vec<ItemId>,
    /// Human-readable description for the dispatcher's activity list.
    pub label: String,
    pub operations: Vec<TagOperation>,
}

/// Request to rate a set of items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingRequest {
    pub ids: Vec<ItemId>,
    pub rating: Rating,
}

/// Accepts batched commands for asynchronous delivery.
pub trait CommandDispatcher {
    fn dispatch(&mut self, command: Command);
}

/// Applies ratings to items.
pub trait RatingApplier {
    fn apply_rating(&mut self, request: RatingRequest);
}

/// Queue commands in memory; the owner drains them.
impl CommandDispatcher for Vec<Command> {
    fn dispatch(&mut self, command: Command) {
        self.push(command);
    }
}

impl RatingApplier for Vec<RatingRequest> {
    fn apply_rating(&mut self, request: RatingRequest) {
        self.push(request);
    }
}

/// Hand commands to a worker on the other end of a channel.
impl CommandDispatcher for Sender<Command> {
    fn dispatch(&mut self, command: Command) {
        if let Err(e) = self.send(command) {
            log::warn!("Command receiver is gone, dropping command: {}", e.0.label);
        }
    }
}

impl RatingApplier for Sender<RatingRequest> {
    fn apply_rating(&mut self, request: RatingRequest) {
        if let Err(e) = self.send(request) {
            log::warn!("Rating receiver is gone, dropping rating for {} items", e.0.ids.len());
        }
    }
}
