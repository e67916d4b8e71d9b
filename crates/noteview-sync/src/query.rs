//! Query engine: evaluates a [`ViewFilter`] against the view store.
//!
//! A note is visible iff the search text is empty or a case-insensitive
//! substring of its title or raw tag string, and the category is `All` or
//! equal to the note's category. Evaluation is a single linear scan in
//! display order with no side effects.

use serde::Serialize;

use noteview_core::{Note, ViewFilter};

use crate::aggregate::in_scope;
use crate::store::ViewStore;

/// Result of evaluating a filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    /// Visible notes in display order.
    pub notes: Vec<Note>,
    pub shown_count: usize,
    pub total_count: usize,
    /// Set when the controller failed to load; the result is then empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueryResult {
    /// Empty result (before the view is live).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Fixed empty result carrying a load error.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Ids of the visible notes, in order.
    pub fn ids(&self) -> Vec<&str> {
        self.notes.iter().map(|n| n.id.as_str()).collect()
    }
}

/// Whether `note` passes `filter`.
pub fn matches(note: &Note, filter: &ViewFilter) -> bool {
    matches_normalized(note, &filter.normalized_search(), &filter.category)
}

/// Predicate with the search text already trimmed and lowercased.
fn matches_normalized(note: &Note, needle: &str, category: &str) -> bool {
    let text_match = needle.is_empty()
        || note.title.to_lowercase().contains(needle)
        || note.raw_tags.to_lowercase().contains(needle);
    text_match && in_scope(category, &note.category)
}

/// Count of notes passing `filter`, without cloning them.
pub fn shown_count(store: &ViewStore, filter: &ViewFilter) -> usize {
    let needle = filter.normalized_search();
    store
        .iter()
        .filter(|note| matches_normalized(note, &needle, &filter.category))
        .count()
}

/// Visible subset of the store plus shown/total counts.
pub fn visible(store: &ViewStore, filter: &ViewFilter) -> QueryResult {
    let needle = filter.normalized_search();
    let notes: Vec<Note> = store
        .iter()
        .filter(|note| matches_normalized(note, &needle, &filter.category))
        .cloned()
        .collect();
    QueryResult {
        shown_count: notes.len(),
        total_count: store.size(),
        notes,
        error: None,
    }
}
