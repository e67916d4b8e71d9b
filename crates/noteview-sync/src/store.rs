//! Materialized view store: the authoritative in-process copy of all notes.
//!
//! Storage is an id-keyed map plus an explicit display-order index. The order
//! index maps a rank to an id; front inserts take a rank below every existing
//! one and snapshot loads take ranks above, so both are O(log n) and never
//! shift existing entries. The store is a pure storage primitive: mutations
//! bump a revision and raise a dirty flag, and recomputation of anything
//! derived is left to the caller.

use std::collections::{BTreeMap, HashMap};

use noteview_core::{Note, NoteId};

/// Result of an upsert or append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The id was unseen; the note took a new display slot.
    Inserted,
    /// The id was known; the note was replaced in its existing slot.
    Replaced,
}

#[derive(Debug, Clone)]
struct Slot {
    rank: i64,
    note: Note,
}

/// Id-keyed note storage with an independent display order.
#[derive(Debug, Clone, Default)]
pub struct ViewStore {
    entries: HashMap<NoteId, Slot>,
    order: BTreeMap<i64, NoteId>,
    /// Lowest rank handed out so far (front of the display order).
    front: i64,
    /// Next rank for an append (back of the display order).
    back: i64,
    revision: u64,
    dirty: bool,
}

impl ViewStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &NoteId) -> Option<&Note> {
        self.entries.get(id).map(|slot| &slot.note)
    }

    pub fn contains(&self, id: &NoteId) -> bool {
        self.entries.contains_key(id)
    }

    /// Insert at the front when `note.id` is unseen, otherwise replace in place.
    pub fn upsert(&mut self, note: Note) -> UpsertOutcome {
        let outcome = match self.entries.get_mut(&note.id) {
            Some(slot) => {
                slot.note = note;
                UpsertOutcome::Replaced
            }
            None => {
                self.front -= 1;
                let rank = self.front;
                self.order.insert(rank, note.id.clone());
                self.entries.insert(note.id.clone(), Slot { rank, note });
                UpsertOutcome::Inserted
            }
        };
        self.touch();
        outcome
    }

    /// Insert at the back when `note.id` is unseen, otherwise replace in place.
    ///
    /// Used for bulk snapshot loads so the snapshot's order is kept as-is.
    pub fn append(&mut self, note: Note) -> UpsertOutcome {
        let outcome = match self.entries.get_mut(&note.id) {
            Some(slot) => {
                slot.note = note;
                UpsertOutcome::Replaced
            }
            None => {
                let rank = self.back;
                self.back += 1;
                self.order.insert(rank, note.id.clone());
                self.entries.insert(note.id.clone(), Slot { rank, note });
                UpsertOutcome::Inserted
            }
        };
        self.touch();
        outcome
    }

    /// Remove a note and its display slot. No-op (and not dirty) when absent.
    pub fn remove(&mut self, id: &NoteId) -> Option<Note> {
        let slot = self.entries.remove(id)?;
        self.order.remove(&slot.rank);
        self.touch();
        Some(slot.note)
    }

    /// Notes in display order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Note> + '_ {
        self.order
            .values()
            .filter_map(move |id| self.entries.get(id).map(|slot| &slot.note))
    }

    /// Notes in display order, collected.
    pub fn all(&self) -> Vec<&Note> {
        self.iter().collect()
    }

    /// Ids in display order.
    pub fn ids(&self) -> Vec<&NoteId> {
        self.order.values().collect()
    }

    /// Zero-based display position of `id`. Linear in the position.
    pub fn position(&self, id: &NoteId) -> Option<usize> {
        let rank = self.entries.get(id)?.rank;
        Some(self.order.range(..rank).count())
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        if self.entries.is_empty() {
            return;
        }
        self.entries.clear();
        self.order.clear();
        self.front = 0;
        self.back = 0;
        self.touch();
    }

    /// Monotonic mutation counter.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clear the dirty flag, returning whether it was set.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    /// Whether the order index holds exactly the mapping's ids, once each.
    pub fn is_consistent(&self) -> bool {
        self.order.len() == self.entries.len()
            && self.order.iter().all(|(rank, id)| {
                self.entries
                    .get(id)
                    .map(|slot| slot.rank == *rank)
                    .unwrap_or(false)
            })
    }

    fn touch(&mut self) {
        self.revision += 1;
        self.dirty = true;
    }
}
