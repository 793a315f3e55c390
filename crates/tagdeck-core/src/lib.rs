//! TagDeck Core Library
//!
//! Platform-agnostic interaction core for media curation: pointer-driven
//! multi-select, drop classification into batched tag and rating commands,
//! and a session-persisted history of drops.

pub mod config;
pub mod dispatch;
pub mod flash;
pub mod history;
pub mod hotspot;
pub mod input;
pub mod items;
pub mod payload;
pub mod rating;
pub mod selection;
pub mod session;
pub mod storage;

pub use config::{ConfigError, PaneConfig, TagDeckConfig};
pub use dispatch::{Command, CommandDispatcher, CommandKind, RatingApplier, RatingRequest, TagOperation};
pub use flash::FlashController;
pub use history::{ActiveView, HistoryBatch, HistoryImage, HistoryRecorder, HistorySnapshot, load_previous, visible_batches};
pub use hotspot::{DropOutcome, HotspotError, HotspotRegistry, HotspotTarget, PrimaryPolicy, TagAction, TargetId, TargetKind};
pub use input::{GridHit, KeyEvent, Modifiers, MouseButton, PointerEvent};
pub use items::{ItemId, MediaItem, Membership, Tag, WorkingSet};
pub use payload::{DragPayload, DragSource, PayloadError};
pub use rating::{CancelReason, ConfirmDecision, PendingPolicy, Rating, RatingDropZone};
pub use selection::{ClickOutcome, OrderProvider, SelectionConfig, SelectionEngine, SelectionEvent, SelectionPhase};
pub use session::{Pane, Session, SessionEvent};
pub use storage::{SessionKey, SessionStorage, StorageError};
