//! Store, applier, aggregation and query properties checked end to end.

use chrono::{TimeZone, Utc};
use serde_json::json;

use noteview_sync::{
    category_set, query, tag_ranking, ApplyOutcome, ChangeApplier, ChangeEvent, ConflictPolicy,
    FeedMessage, Note, NoteId, NoteRecord, ViewFilter, ViewStore,
};

fn record(value: serde_json::Value) -> NoteRecord {
    NoteRecord::from_json(value).unwrap()
}

fn note(value: serde_json::Value) -> Note {
    Note::try_from(record(value)).unwrap()
}

fn id(raw: &str) -> NoteId {
    NoteId::parse(raw).unwrap()
}

fn algebra() -> serde_json::Value {
    json!({"id": 1, "title": "Algebra Notes", "class": "Math", "tags": "algebra,exam"})
}

fn permutations<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }
    let mut out = Vec::new();
    for i in 0..items.len() {
        let mut rest = items.to_vec();
        let head = rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, head.clone());
            out.push(tail);
        }
    }
    out
}

fn apply_all(applier: &ChangeApplier, events: &[ChangeEvent]) -> ViewStore {
    let mut store = ViewStore::new();
    for event in events {
        applier.apply(&mut store, event.clone());
    }
    store
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_scenario_a_duplicate_insert_keeps_size() {
    let mut store = ViewStore::new();
    store.append(note(algebra()));

    let outcome = ChangeApplier::default()
        .apply_feed(&mut store, FeedMessage::insert(record(algebra())))
        .unwrap();
    assert_eq!(outcome, ApplyOutcome::Unchanged);
    assert_eq!(store.size(), 1);
    assert_eq!(store.get(&id("1")).unwrap().title, "Algebra Notes");
}

#[test]
fn test_scenario_b_delete_twice() {
    let mut store = ViewStore::new();
    store.append(note(algebra()));
    let applier = ChangeApplier::default();

    let first = applier.apply_feed(&mut store, FeedMessage::delete(record(json!({"id": 1}))));
    assert!(matches!(first, Some(ApplyOutcome::Removed(_))));
    assert!(store.is_empty());

    let second = applier.apply_feed(&mut store, FeedMessage::delete(record(json!({"id": 1}))));
    assert_eq!(second, Some(ApplyOutcome::Absent));
    assert!(store.is_empty());
}

#[test]
fn test_scenario_c_category_set() {
    let mut store = ViewStore::new();
    store.append(note(json!({"id": 1, "class": "Math"})));
    store.append(note(json!({"id": 2, "class": "Bio"})));
    store.append(note(json!({"id": 3, "class": "Math"})));
    assert_eq!(category_set(&store), vec!["All", "Bio", "Math"]);
}

#[test]
fn test_scenario_d_tag_ranking() {
    let mut store = ViewStore::new();
    for i in 0..3 {
        store.append(note(json!({"id": i, "tags": "a,b"})));
    }
    store.append(note(json!({"id": 3, "tags": "a,c"})));
    assert_eq!(tag_ranking(&store, "All", 8), vec!["a", "b", "c"]);
}

#[test]
fn test_scenario_e_filter_counts() {
    let mut store = ViewStore::new();
    store.append(note(algebra()));

    let all = query::visible(&store, &ViewFilter::new("exam", "All"));
    assert_eq!((all.shown_count, all.total_count), (1, 1));

    let bio = query::visible(&store, &ViewFilter::new("exam", "Bio"));
    assert_eq!((bio.shown_count, bio.total_count), (0, 1));
}

// =============================================================================
// Convergence
// =============================================================================

#[test]
fn test_insert_update_permutations_converge() {
    let payload = note(algebra());
    let events = vec![
        ChangeEvent::Insert(payload.clone()),
        ChangeEvent::Update(payload.clone()),
        ChangeEvent::Insert(payload.clone()),
        ChangeEvent::Update(payload.clone()),
    ];
    for policy in [ConflictPolicy::AcceptAll, ConflictPolicy::LastWriterWins] {
        let applier = ChangeApplier::new(policy);
        for order in permutations(&events) {
            let store = apply_all(&applier, &order);
            assert_eq!(store.size(), 1);
            assert_eq!(store.get(&payload.id), Some(&payload));
        }
    }
}

#[test]
fn test_last_writer_wins_versions_converge_to_newest() {
    let version = |minute: u32, title: &str| {
        Note::new(id("n1"))
            .with_title(title)
            .with_updated_at(Utc.with_ymd_and_hms(2024, 5, 1, 9, minute, 0).unwrap())
    };
    let events = vec![
        ChangeEvent::Insert(version(0, "first")),
        ChangeEvent::Update(version(5, "second")),
        ChangeEvent::Update(version(9, "third")),
        ChangeEvent::Update(version(9, "third")),
    ];
    let applier = ChangeApplier::new(ConflictPolicy::LastWriterWins);
    for order in permutations(&events) {
        let store = apply_all(&applier, &order);
        assert_eq!(store.get(&id("n1")).unwrap().title, "third");
    }
}

#[test]
fn test_duplicate_deliveries_are_idempotent() {
    let applier = ChangeApplier::default();
    let a = note(algebra());
    let b = note(json!({"id": 2, "title": "Cells", "class": "Bio"}));

    let once = apply_all(
        &applier,
        &[
            ChangeEvent::Insert(a.clone()),
            ChangeEvent::Insert(b.clone()),
            ChangeEvent::Delete(a.id.clone()),
        ],
    );
    let many = apply_all(
        &applier,
        &[
            ChangeEvent::Insert(a.clone()),
            ChangeEvent::Insert(a.clone()),
            ChangeEvent::Insert(b.clone()),
            ChangeEvent::Update(b.clone()),
            ChangeEvent::Delete(a.id.clone()),
            ChangeEvent::Delete(a.id.clone()),
        ],
    );
    assert_eq!(once.ids(), many.ids());
    assert_eq!(once.get(&b.id), many.get(&b.id));
}

// =============================================================================
// Display order
// =============================================================================

#[test]
fn test_order_index_stays_consistent() {
    let applier = ChangeApplier::default();
    let mut store = ViewStore::new();
    for i in 0..20 {
        store.append(note(json!({"id": i, "title": format!("snap {}", i)})));
    }
    for step in 0..60u32 {
        let target = (step * 7 % 30).to_string();
        let event = match step % 3 {
            0 => ChangeEvent::Insert(Note::new(id(&target)).with_title(format!("v{}", step))),
            1 => ChangeEvent::Update(Note::new(id(&target)).with_title(format!("v{}", step))),
            _ => ChangeEvent::Delete(id(&target)),
        };
        applier.apply(&mut store, event);
        assert!(store.is_consistent());

        let ids = store.ids();
        let mut unique = ids.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), ids.len());
        assert_eq!(ids.len(), store.size());
        assert!(ids.iter().all(|i| store.contains(i)));
    }
}

#[test]
fn test_insert_goes_first_and_update_keeps_position() {
    let applier = ChangeApplier::default();
    let mut store = ViewStore::new();
    store.append(note(json!({"id": "a"})));
    store.append(note(json!({"id": "b"})));
    store.append(note(json!({"id": "c"})));

    applier.apply(&mut store, ChangeEvent::Insert(note(json!({"id": "d"}))));
    assert_eq!(store.position(&id("d")), Some(0));

    applier.apply(
        &mut store,
        ChangeEvent::Update(note(json!({"id": "b", "title": "edited"}))),
    );
    let order: Vec<&str> = store.ids().into_iter().map(|i| i.as_str()).collect();
    assert_eq!(order, vec!["d", "a", "b", "c"]);
}

#[test]
fn test_query_preserves_display_order() {
    let applier = ChangeApplier::default();
    let mut store = ViewStore::new();
    store.append(note(json!({"id": 1, "title": "exam one"})));
    store.append(note(json!({"id": 2, "title": "other"})));
    applier.apply(
        &mut store,
        ChangeEvent::Insert(note(json!({"id": 3, "title": "exam three"}))),
    );
    let result = query::visible(&store, &ViewFilter::new("exam", "All"));
    assert_eq!(result.ids(), vec!["3", "1"]);
}
