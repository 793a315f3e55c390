//! Drag payload wire format.
//!
//! The plain form is a comma-separated list of positive decimal ids, e.g.
//! `"5,6,7"`. A drag source may attach a JSON sidecar carrying per-id preview
//! metadata and the pane the drag started in:
//!
//! ```text
//! {"ids":[5,6],"source":"history","previews":[{"id":5,"title":"Lion","thumbnail":"/t/5.jpg"}]}
//! ```
//!
//! Drop targets accept the plain list even when the sidecar is missing.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::items::ItemId;

/// Payload errors. Callers treat every variant as "ignore this drop".
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("Drag payload carries no positive item ids")]
    Empty,
    #[error("Malformed payload sidecar: {0}")]
    Sidecar(#[from] serde_json::Error),
}

/// Pane a drag started in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DragSource {
    /// The main results grid.
    Results,
    /// The drop history pane.
    History,
    /// The rating audit queue.
    Queue,
    #[serde(other)]
    Unknown,
}

impl DragSource {
    /// Human label shown next to history batches.
    pub fn label(self) -> &'static str {
        match self {
            DragSource::Results => "Results",
            DragSource::History => "History",
            DragSource::Queue => "Queue",
            DragSource::Unknown => "Unknown",
        }
    }
}

/// Preview metadata for one dragged item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewMeta {
    pub id: ItemId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Sidecar {
    #[serde(default)]
    ids: Vec<ItemId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source: Option<DragSource>,
    #[serde(default)]
    previews: Vec<PreviewMeta>,
}

/// Ids carried from a drag source to a drop target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DragPayload {
    ids: Vec<ItemId>,
    previews: Vec<PreviewMeta>,
    source: Option<DragSource>,
}

/// Parse the plain comma-separated form.
///
/// Entries that are not positive integers are skipped and repeated ids keep
/// their first position. A list with nothing left is [`PayloadError::Empty`].
pub fn parse_id_list(raw: &str) -> Result<Vec<ItemId>, PayloadError> {
    let mut ids = Vec::new();
    for part in raw.split(',') {
        match part.trim().parse::<ItemId>() {
            Ok(id) if id > 0 && !ids.contains(&id) => ids.push(id),
            _ => {}
        }
    }
    if ids.is_empty() {
        return Err(PayloadError::Empty);
    }
    Ok(ids)
}

impl DragPayload {
    /// Build a payload for a drag starting in `source`.
    pub fn new(ids: Vec<ItemId>, source: DragSource) -> Self {
        let mut unique = Vec::with_capacity(ids.len());
        for id in ids.into_iter().filter(|&id| id > 0) {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        Self {
            ids: unique,
            previews: Vec::new(),
            source: Some(source),
        }
    }

    pub fn with_previews(mut self, previews: Vec<PreviewMeta>) -> Self {
        self.previews = previews;
        self
    }

    /// Decode what a drop event carried.
    ///
    /// `plain` wins over the sidecar's own id list. A sidecar that does not
    /// parse is dropped; the plain list alone is still a valid payload.
    pub fn from_transfer(plain: Option<&str>, sidecar: Option<&str>) -> Result<Self, PayloadError> {
        let sidecar = match sidecar.map(serde_json::from_str::<Sidecar>) {
            Some(Ok(sidecar)) => Some(sidecar),
            Some(Err(e)) if plain.is_some() => {
                log::debug!("Ignoring payload sidecar: {}", e);
                None
            }
            Some(Err(e)) => return Err(e.into()),
            None => None,
        };

        let ids = match plain {
            Some(raw) => parse_id_list(raw)?,
            None => {
                let listed = sidecar.as_ref().map(|s| s.ids.as_slice()).unwrap_or_default();
                let joined = listed.iter().map(ItemId::to_string).collect::<Vec<_>>().join(",");
                parse_id_list(&joined)?
            }
        };

        let (source, previews) = match sidecar {
            Some(sidecar) => (sidecar.source, sidecar.previews),
            None => (None, Vec::new()),
        };

        Ok(Self { ids, previews, source })
    }

    pub fn ids(&self) -> &[ItemId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn source(&self) -> Option<DragSource> {
        self.source
    }

    pub fn preview(&self, id: ItemId) -> Option<&PreviewMeta> {
        self.previews.iter().find(|p| p.id == id)
    }

    /// Encode the plain comma-separated form.
    pub fn to_plain(&self) -> String {
        self.ids.iter().map(ItemId::to_string).collect::<Vec<_>>().join(",")
    }

    /// Encode the JSON sidecar.
    pub fn to_sidecar(&self) -> Result<String, PayloadError> {
        let sidecar = Sidecar {
            ids: self.ids.clone(),
            source: self.source,
            previews: self.previews.clone(),
        };
        Ok(serde_json::to_string(&sidecar)?)
    }
}
