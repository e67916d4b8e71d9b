//! View-update notifications, envelope schema, and event bus.
//!
//! Every recomputation of the materialized view produces one [`ViewUpdate`]:
//! the latest counts and aggregates plus a [`ViewChange`] describing what
//! happened. Updates are delivered two ways: synchronously to registered
//! observers, and through the broadcast-based [`EventBus`] wrapped in an
//! [`EventEnvelope`] for async consumers.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::filter::ViewFilter;
use crate::models::{Note, NoteId};

// ============================================================================
// View change (incremental description)
// ============================================================================

/// What changed in the view, enough for a renderer to patch its output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ViewChange {
    /// The snapshot was bulk-loaded.
    Loaded { count: usize },
    /// An entity was inserted (at the front) or replaced in place.
    Upserted {
        note: Note,
        inserted: bool,
        position: usize,
    },
    /// An entity was removed.
    Removed { id: NoteId },
    /// The consumer filter changed; the store is untouched.
    FilterChanged { filter: ViewFilter },
    /// The snapshot load or subscription setup failed.
    Failed { error: String },
}

impl ViewChange {
    /// Namespaced event type for the envelope (e.g., `"view.upserted"`).
    pub fn namespaced_event_type(&self) -> &'static str {
        match self {
            ViewChange::Loaded { .. } => "view.loaded",
            ViewChange::Upserted { .. } => "view.upserted",
            ViewChange::Removed { .. } => "view.removed",
            ViewChange::FilterChanged { .. } => "view.filter_changed",
            ViewChange::Failed { .. } => "view.failed",
        }
    }

    /// The entity this change relates to, if any.
    pub fn note_id(&self) -> Option<&NoteId> {
        match self {
            ViewChange::Upserted { note, .. } => Some(&note.id),
            ViewChange::Removed { id } => Some(id),
            _ => None,
        }
    }
}

/// Notification emitted after every recomputation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewUpdate {
    pub change: ViewChange,
    /// Entities passing the active filter.
    pub shown_count: usize,
    /// Entities in the store, regardless of filter.
    pub total_count: usize,
    /// Store revision the update was computed from.
    pub revision: u64,
    /// Active filter after the change (category may have fallen back to `All`).
    pub filter: ViewFilter,
    /// Category set, starting with `All`.
    pub categories: Vec<String>,
    /// Tag ranking for the active category.
    pub top_tags: Vec<String>,
}

impl ViewUpdate {
    /// Text for the polite live-region announcement.
    pub fn announcement(&self) -> String {
        match &self.change {
            ViewChange::Failed { .. } => crate::defaults::LOAD_FAILED_MESSAGE.to_string(),
            _ => announcement(self.shown_count, self.total_count),
        }
    }
}

/// `"Showing {shown} of {total} notes"`.
pub fn announcement(shown_count: usize, total_count: usize) -> String {
    format!("Showing {} of {} notes", shown_count, total_count)
}

// ============================================================================
// Envelope
// ============================================================================

/// Versioned envelope around a [`ViewUpdate`] for bus consumers.
#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope {
    /// Unique event identifier (UUIDv7 for temporal ordering).
    pub event_id: Uuid,
    /// Namespaced event type (e.g., `"view.removed"`).
    pub event_type: String,
    /// When the update was emitted (UTC).
    pub occurred_at: DateTime<Utc>,
    /// Id of the entity this update relates to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    /// Payload schema version.
    pub payload_version: u32,
    pub payload: ViewUpdate,
}

impl EventEnvelope {
    pub fn new(update: ViewUpdate) -> Self {
        Self {
            event_id: crate::uuid_utils::new_v7(),
            event_type: update.change.namespaced_event_type().to_string(),
            occurred_at: Utc::now(),
            entity_id: update.change.note_id().map(|id| id.to_string()),
            payload_version: 1,
            payload: update,
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Broadcast-based bus distributing view updates to async consumers.
///
/// Uses `tokio::sync::broadcast`. Slow receivers that fall behind receive a
/// `Lagged` error and miss updates; each update carries the full counts and
/// aggregates, so a lagging consumer recovers on the next one.
pub struct EventBus {
    tx: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Emit an update to all subscribers. Dropped silently with no subscribers.
    pub fn emit(&self, update: ViewUpdate) {
        let envelope = EventEnvelope::new(update);
        let subscriber_count = self.tx.receiver_count();
        tracing::trace!(
            event_type = %envelope.event_type,
            event_id = %envelope.event_id,
            subscriber_count,
            "EventBus emit"
        );
        let _ = self.tx.send(envelope);
    }

    /// Subscribe to receive enveloped updates.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.tx.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

// ============================================================================
// Observers
// ============================================================================

/// Synchronous view-update callback.
pub type ViewObserver = Box<dyn Fn(&ViewUpdate) + Send + Sync>;

/// Explicit observer registry; observers are called in registration order.
#[derive(Default)]
pub struct ObserverRegistry {
    observers: Vec<ViewObserver>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer; returns its index in call order.
    pub fn register<F>(&mut self, observer: F) -> usize
    where
        F: Fn(&ViewUpdate) + Send + Sync + 'static,
    {
        self.observers.push(Box::new(observer));
        self.observers.len() - 1
    }

    pub fn notify(&self, update: &ViewUpdate) {
        for observer in &self.observers {
            observer(update);
        }
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl std::fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("observers", &self.observers.len())
            .finish()
    }
}
