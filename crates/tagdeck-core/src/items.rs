//! Locally held media items and their tags.
//!
//! The working set is the page of items a pane currently shows. Drops mutate it
//! optimistically; the server copy is updated later by the command dispatcher.

use serde::{Deserialize, Serialize};

/// Identifier of a media item. Always a positive integer.
pub type ItemId = u64;

/// Category used when a tagging target has none.
pub const DEFAULT_CATEGORY: &str = "Uncategorized";

/// A keyword inside a category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub category: String,
    pub keyword: String,
}

impl Tag {
    pub fn new(category: impl Into<String>, keyword: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            keyword: keyword.into(),
        }
    }

    /// Tags are equal when keyword and category match.
    pub fn matches(&self, category: &str, keyword: &str) -> bool {
        self.category == category && self.keyword == keyword
    }
}

/// A media item as held by a pane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: ItemId,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
}

impl MediaItem {
    pub fn new(id: ItemId) -> Self {
        Self {
            id,
            title: String::new(),
            thumbnail: None,
            tags: Vec::new(),
            rating: None,
        }
    }

    pub fn with_tags(mut self, tags: Vec<Tag>) -> Self {
        self.tags = tags;
        self
    }

    pub fn has_tag(&self, category: &str, keyword: &str) -> bool {
        self.tags.iter().any(|t| t.matches(category, keyword))
    }

    /// Merge (`signum > 0`) or strip (`signum < 0`) a tag.
    /// Returns true if the tag list changed.
    fn apply_tag(&mut self, category: &str, keyword: &str, signum: i8) -> bool {
        if signum > 0 {
            if self.has_tag(category, keyword) {
                return false;
            }
            self.tags.push(Tag::new(category, keyword));
            true
        } else {
            let before = self.tags.len();
            self.tags.retain(|t| !t.matches(category, keyword));
            self.tags.len() != before
        }
    }
}

/// Criterion a view was built from, e.g. "items missing this tag".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Membership {
    /// Plain listing; items never leave because of their tags.
    #[default]
    Any,
    /// Items carrying the tag.
    HasTag(Tag),
    /// Items lacking the tag.
    MissingTag(Tag),
}

impl Membership {
    pub fn admits(&self, item: &MediaItem) -> bool {
        match self {
            Membership::Any => true,
            Membership::HasTag(tag) => item.has_tag(&tag.category, &tag.keyword),
            Membership::MissingTag(tag) => !item.has_tag(&tag.category, &tag.keyword),
        }
    }
}

/// Result of an optimistic tag mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagMutation {
    /// Requested ids that were held locally.
    pub found: Vec<ItemId>,
    /// Ids removed from the set because they no longer match the membership.
    pub evicted: Vec<ItemId>,
}

/// Ordered collection of locally held items.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkingSet {
    items: Vec<MediaItem>,
    #[serde(default)]
    membership: Membership,
}

impl WorkingSet {
    pub fn new(items: Vec<MediaItem>) -> Self {
        Self {
            items,
            membership: Membership::Any,
        }
    }

    pub fn with_membership(mut self, membership: Membership) -> Self {
        self.membership = membership;
        self
    }

    pub fn membership(&self) -> &Membership {
        &self.membership
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: ItemId) -> Option<&MediaItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }

    /// Ids in display order.
    pub fn ids(&self) -> Vec<ItemId> {
        self.items.iter().map(|item| item.id).collect()
    }

    /// Replace the held page, e.g. after pagination.
    pub fn replace(&mut self, items: Vec<MediaItem>) {
        self.items = items;
    }

    /// Apply a signed tag to every held item among `ids`.
    ///
    /// Items that stop matching the membership criterion are removed.
    pub fn apply_tag(&mut self, ids: &[ItemId], category: &str, keyword: &str, signum: i8) -> TagMutation {
        let mut mutation = TagMutation::default();
        for item in self.items.iter_mut().filter(|item| ids.contains(&item.id)) {
            item.apply_tag(category, keyword, signum);
            mutation.found.push(item.id);
        }

        let membership = &self.membership;
        let evicted = &mut mutation.evicted;
        self.items.retain(|item| {
            if ids.contains(&item.id) && !membership.admits(item) {
                evicted.push(item.id);
                false
            } else {
                true
            }
        });
        mutation
    }

    /// Remove the given ids. Returns the ids that were actually held.
    pub fn remove(&mut self, ids: &[ItemId]) -> Vec<ItemId> {
        let mut removed = Vec::new();
        self.items.retain(|item| {
            if ids.contains(&item.id) {
                removed.push(item.id);
                false
            } else {
                true
            }
        });
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[ItemId]) -> WorkingSet {
        WorkingSet::new(ids.iter().map(|&id| MediaItem::new(id)).collect())
    }

    #[test]
    fn test_add_tag_dedupes() {
        let mut ws = set(&[5, 6]);
        ws.apply_tag(&[5], "Animals", "Lion", 1);
        ws.apply_tag(&[5], "Animals", "Lion", 1);
        assert_eq!(ws.get(5).unwrap().tags, vec![Tag::new("Animals", "Lion")]);
        assert!(ws.get(6).unwrap().tags.is_empty());
    }

    #[test]
    fn test_same_keyword_other_category_is_distinct() {
        let mut ws = set(&[1]);
        ws.apply_tag(&[1], "Animals", "Lion", 1);
        ws.apply_tag(&[1], "Heraldry", "Lion", 1);
        assert_eq!(ws.get(1).unwrap().tags.len(), 2);

        ws.apply_tag(&[1], "Animals", "Lion", -1);
        assert_eq!(ws.get(1).unwrap().tags, vec![Tag::new("Heraldry", "Lion")]);
    }

    #[test]
    fn test_found_counts_only_local_items() {
        let mut ws = set(&[1, 2]);
        let mutation = ws.apply_tag(&[2, 3, 4], "C", "k", 1);
        assert_eq!(mutation.found, vec![2]);
        assert!(mutation.evicted.is_empty());
    }

    #[test]
    fn test_missing_tag_view_evicts_tagged_items() {
        let mut ws = set(&[1, 2, 3]).with_membership(Membership::MissingTag(Tag::new("C", "k")));
        let mutation = ws.apply_tag(&[1, 3], "C", "k", 1);
        assert_eq!(mutation.evicted, vec![1, 3]);
        assert_eq!(ws.ids(), vec![2]);
    }

    #[test]
    fn test_has_tag_view_evicts_untagged_items() {
        let tagged = MediaItem::new(7).with_tags(vec![Tag::new("C", "k")]);
        let mut ws = WorkingSet::new(vec![tagged, MediaItem::new(8)])
            .with_membership(Membership::HasTag(Tag::new("C", "k")));
        let mutation = ws.apply_tag(&[7], "C", "k", -1);
        assert_eq!(mutation.found, vec![7]);
        assert_eq!(mutation.evicted, vec![7]);
        // 8 was not part of the drop, so it stays even though it does not match.
        assert_eq!(ws.ids(), vec![8]);
    }

    #[test]
    fn test_remove_reports_held_ids() {
        let mut ws = set(&[1, 2, 3]);
        assert_eq!(ws.remove(&[3, 9, 1]), vec![1, 3]);
        assert_eq!(ws.ids(), vec![2]);
    }
}
