//! Aggregation engine: category set and tag-frequency ranking.
//!
//! Both aggregates are pure functions of the store contents (and, for the
//! ranking, the category scope). They are recomputed after every change and
//! never mutated independently.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use tracing::trace;

use noteview_core::defaults::{ALL_CATEGORY, NO_TAGS_MESSAGE};

use crate::store::ViewStore;

/// Distinct categories, sorted, prefixed with the `All` sentinel.
pub fn category_set(store: &ViewStore) -> Vec<String> {
    let distinct: BTreeSet<&str> = store.iter().map(|note| note.category.as_str()).collect();
    std::iter::once(ALL_CATEGORY.to_string())
        .chain(
            distinct
                .into_iter()
                .filter(|category| *category != ALL_CATEGORY)
                .map(String::from),
        )
        .collect()
}

/// Whether `scope` selects a note of `category`.
pub fn in_scope(scope: &str, category: &str) -> bool {
    scope == ALL_CATEGORY || scope == category
}

/// Occurrence count of a tag within a scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

/// Tag counts for notes in `scope`, by count descending then first-seen order.
///
/// First-seen order walks the store in display order and each note's tags in
/// their own order, so ties never depend on map iteration order.
pub fn tag_counts(store: &ViewStore, scope: &str) -> Vec<TagCount> {
    // tag -> (count, first-seen index)
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for note in store.iter().filter(|note| in_scope(scope, &note.category)) {
        for tag in &note.tags {
            let next_index = counts.len();
            let entry = counts.entry(tag.as_str()).or_insert((0, next_index));
            entry.0 += 1;
        }
    }

    let mut ranked: Vec<(&str, usize, usize)> = counts
        .into_iter()
        .map(|(tag, (count, first_seen))| (tag, count, first_seen))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

    trace!(scope, distinct_tags = ranked.len(), "Counted tags");
    ranked
        .into_iter()
        .map(|(tag, count, _)| TagCount {
            tag: tag.to_string(),
            count,
        })
        .collect()
}

/// Up to `limit` most frequent tags in `scope`.
pub fn tag_ranking(store: &ViewStore, scope: &str, limit: usize) -> Vec<String> {
    tag_counts(store, scope)
        .into_iter()
        .take(limit)
        .map(|tc| tc.tag)
        .collect()
}

/// A computed tag ranking together with its scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagRanking {
    pub scope: String,
    pub tags: Vec<String>,
}

impl TagRanking {
    pub fn compute(store: &ViewStore, scope: &str, limit: usize) -> Self {
        Self {
            scope: scope.to_string(),
            tags: tag_ranking(store, scope, limit),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Placeholder text for an empty ranking.
    pub fn empty_message(&self) -> String {
        if self.scope == ALL_CATEGORY {
            NO_TAGS_MESSAGE.to_string()
        } else {
            format!("{} for {}", NO_TAGS_MESSAGE, self.scope)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use noteview_core::{Note, NoteId};

    fn note(id: &str, category: &str, tags: &str) -> Note {
        Note::new(NoteId::parse(id).unwrap())
            .with_category(category)
            .with_tags(tags)
    }

    fn store_of(notes: Vec<Note>) -> ViewStore {
        let mut store = ViewStore::new();
        for n in notes {
            store.append(n);
        }
        store
    }

    #[test]
    fn test_category_set_sorted_with_all() {
        let store = store_of(vec![
            note("1", "Math", ""),
            note("2", "Bio", ""),
            note("3", "Math", ""),
        ]);
        assert_eq!(category_set(&store), vec!["All", "Bio", "Math"]);
    }

    #[test]
    fn test_category_set_empty_store() {
        assert_eq!(category_set(&ViewStore::new()), vec!["All"]);
    }

    #[test]
    fn test_category_set_does_not_duplicate_all() {
        let store = store_of(vec![note("1", "All", ""), note("2", "Art", "")]);
        assert_eq!(category_set(&store), vec!["All", "Art"]);
    }

    #[test]
    fn test_tag_ranking_by_count() {
        let store = store_of(vec![
            note("1", "Math", "a,b"),
            note("2", "Math", "a,b"),
            note("3", "Math", "a,b"),
            note("4", "Math", "a,c"),
        ]);
        assert_eq!(tag_ranking(&store, "All", 8), vec!["a", "b", "c"]);

        let counts = tag_counts(&store, "All");
        assert_eq!(counts[0], TagCount { tag: "a".into(), count: 4 });
        assert_eq!(counts[1], TagCount { tag: "b".into(), count: 3 });
        assert_eq!(counts[2], TagCount { tag: "c".into(), count: 1 });
    }

    #[test]
    fn test_tag_ranking_ties_by_first_seen() {
        let store = store_of(vec![
            note("1", "Math", "zeta, alpha"),
            note("2", "Math", "mid"),
            note("3", "Math", "alpha, zeta, mid"),
        ]);
        // all three tags have count 2; first seen: zeta, alpha, mid
        assert_eq!(tag_ranking(&store, "All", 8), vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_tag_ranking_limit() {
        let tags: Vec<String> = (0..12).map(|i| format!("t{}", i)).collect();
        let store = store_of(vec![note("1", "Math", &tags.join(","))]);
        let ranking = tag_ranking(&store, "All", 8);
        assert_eq!(ranking.len(), 8);
        assert_eq!(ranking[0], "t0");
        assert_eq!(ranking[7], "t7");
    }

    #[test]
    fn test_tag_ranking_scoped() {
        let store = store_of(vec![
            note("1", "Math", "algebra,exam"),
            note("2", "Bio", "cells,exam"),
            note("3", "Bio", "cells"),
        ]);
        assert_eq!(tag_ranking(&store, "Bio", 8), vec!["cells", "exam"]);
        assert_eq!(tag_ranking(&store, "Math", 8), vec!["algebra", "exam"]);
        assert!(tag_ranking(&store, "Physics", 8).is_empty());
    }

    #[test]
    fn test_aggregates_are_pure() {
        let store = store_of(vec![
            note("1", "Math", "x,y"),
            note("2", "Bio", "y,z"),
        ]);
        assert_eq!(category_set(&store), category_set(&store));
        for _ in 0..5 {
            assert_eq!(tag_ranking(&store, "All", 8), vec!["y", "x", "z"]);
        }
    }

    #[test]
    fn test_tag_ranking_empty_message() {
        let store = ViewStore::new();
        let all = TagRanking::compute(&store, "All", 8);
        assert!(all.is_empty());
        assert_eq!(all.empty_message(), "No tags available");

        let bio = TagRanking::compute(&store, "Bio", 8);
        assert_eq!(bio.empty_message(), "No tags available for Bio");
    }
}
