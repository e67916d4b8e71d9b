//! Change applier: merges one change event into the view store.
//!
//! The feed gives no ordering or at-most-once guarantee, so the merge is
//! idempotent and order-tolerant:
//!
//! - `Insert` for a known id is treated as an update.
//! - `Update` for an unknown id is treated as an insert.
//! - `Delete` for an unknown id is a no-op.
//!
//! Under [`ConflictPolicy::LastWriterWins`] an insert/update carrying an
//! `updated_at` strictly older than the stored note's is ignored.

use tracing::{debug, warn};

use noteview_core::{ChangeKind, Error, FeedMessage, Note, NoteId, Result};

use crate::store::{UpsertOutcome, ViewStore};

// =============================================================================
// CHANGE EVENT
// =============================================================================

/// A validated change event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    Insert(Note),
    Update(Note),
    Delete(NoteId),
}

impl ChangeEvent {
    /// Build an event from a feed delivery through the entity mapping rule.
    ///
    /// Fails with [`Error::Validation`] when the payload has no usable id.
    pub fn from_feed(message: FeedMessage) -> Result<Self> {
        match message.kind {
            ChangeKind::Insert => Ok(Self::Insert(Note::try_from(message.record)?)),
            ChangeKind::Update => Ok(Self::Update(Note::try_from(message.record)?)),
            ChangeKind::Delete => Ok(Self::Delete(message.record.note_id()?)),
        }
    }

    pub fn kind(&self) -> ChangeKind {
        match self {
            Self::Insert(_) => ChangeKind::Insert,
            Self::Update(_) => ChangeKind::Update,
            Self::Delete(_) => ChangeKind::Delete,
        }
    }

    pub fn note_id(&self) -> &NoteId {
        match self {
            Self::Insert(note) | Self::Update(note) => &note.id,
            Self::Delete(id) => id,
        }
    }
}

impl TryFrom<FeedMessage> for ChangeEvent {
    type Error = Error;

    fn try_from(message: FeedMessage) -> Result<Self> {
        Self::from_feed(message)
    }
}

// =============================================================================
// CONFLICT POLICY
// =============================================================================

/// How an insert/update is reconciled with an already-stored note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// Every insert/update replaces the stored note, whatever its age.
    AcceptAll,
    /// Inserts/updates older than the stored note (by `updated_at`) are
    /// ignored. Missing timestamps on either side always accept.
    #[default]
    LastWriterWins,
}

impl std::fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AcceptAll => write!(f, "accept_all"),
            Self::LastWriterWins => write!(f, "last_writer_wins"),
        }
    }
}

impl std::str::FromStr for ConflictPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "accept_all" | "acceptall" => Ok(Self::AcceptAll),
            "last_writer_wins" | "lww" => Ok(Self::LastWriterWins),
            _ => Err(format!("Invalid conflict policy: {}", s)),
        }
    }
}

// =============================================================================
// APPLIER
// =============================================================================

/// What applying an event did to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// A new note was placed at the front.
    Inserted,
    /// A stored note was replaced in place.
    Updated,
    /// A stored note was removed.
    Removed(Note),
    /// The payload equals the stored note; nothing changed.
    Unchanged,
    /// The payload is older than the stored note and was ignored.
    Stale,
    /// Delete for an id not in the store.
    Absent,
}

impl ApplyOutcome {
    /// Whether the store was mutated.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            ApplyOutcome::Inserted | ApplyOutcome::Updated | ApplyOutcome::Removed(_)
        )
    }
}

/// Applies change events to a [`ViewStore`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeApplier {
    policy: ConflictPolicy,
}

impl ChangeApplier {
    pub fn new(policy: ConflictPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    /// Apply one event. Never fails: every event applies or is a no-op.
    pub fn apply(&self, store: &mut ViewStore, event: ChangeEvent) -> ApplyOutcome {
        let kind = event.kind();
        let outcome = match event {
            ChangeEvent::Insert(note) | ChangeEvent::Update(note) => self.merge(store, note),
            ChangeEvent::Delete(id) => match store.remove(&id) {
                Some(note) => ApplyOutcome::Removed(note),
                None => {
                    debug!(note_id = %id, "Delete for unknown note, ignoring");
                    ApplyOutcome::Absent
                }
            },
        };
        debug!(change_kind = %kind, ?outcome, revision = store.revision(), "Applied change");
        outcome
    }

    /// Validate a feed delivery and apply it.
    ///
    /// Payloads without a usable id are dropped with a diagnostic and
    /// reported as `None`.
    pub fn apply_feed(&self, store: &mut ViewStore, message: FeedMessage) -> Option<ApplyOutcome> {
        let kind = message.kind;
        match ChangeEvent::from_feed(message) {
            Ok(event) => Some(self.apply(store, event)),
            Err(e) => {
                warn!(change_kind = %kind, error = %e, "Dropping change-feed payload");
                None
            }
        }
    }

    fn merge(&self, store: &mut ViewStore, note: Note) -> ApplyOutcome {
        if let Some(existing) = store.get(&note.id) {
            if *existing == note {
                return ApplyOutcome::Unchanged;
            }
            if self.is_stale(existing, &note) {
                warn!(
                    note_id = %note.id,
                    stored = ?existing.updated_at,
                    incoming = ?note.updated_at,
                    "Ignoring stale change"
                );
                return ApplyOutcome::Stale;
            }
        }
        match store.upsert(note) {
            UpsertOutcome::Inserted => ApplyOutcome::Inserted,
            UpsertOutcome::Replaced => ApplyOutcome::Updated,
        }
    }

    fn is_stale(&self, existing: &Note, incoming: &Note) -> bool {
        match self.policy {
            ConflictPolicy::AcceptAll => false,
            ConflictPolicy::LastWriterWins => match (existing.updated_at, incoming.updated_at) {
                (Some(stored), Some(new)) => new < stored,
                _ => false,
            },
        }
    }
}
