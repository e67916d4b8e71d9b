//! Sync engine: the state machine behind the sync controller.
//!
//! The engine owns the view store, the active filter and the observers, and
//! exposes one transition function per input (snapshot loaded, feed delivery,
//! filter command). Each transition runs to completion: apply, recompute the
//! aggregates and the active query, then notify. The async
//! [`crate::controller::SyncController`] drives it from a single ordered loop.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, trace, warn};

use noteview_core::defaults::ALL_CATEGORY;
use noteview_core::{
    EventBus, EventEnvelope, FeedMessage, Note, NoteRecord, ObserverRegistry, ViewChange,
    ViewFilter, ViewUpdate,
};

use crate::aggregate::{category_set, tag_ranking, TagRanking};
use crate::applier::{ApplyOutcome, ChangeApplier, ChangeEvent};
use crate::config::SyncConfig;
use crate::query::{self, QueryResult};
use crate::store::ViewStore;

/// Lifecycle state of the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    /// Constructed, snapshot not requested yet.
    Uninitialized,
    /// Snapshot fetch in progress.
    Loading,
    /// Snapshot loaded and feed subscribed; applying changes.
    Live,
    /// Snapshot fetch or subscription setup failed. Terminal.
    Failed,
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Loading => write!(f, "loading"),
            Self::Live => write!(f, "live"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Consumer-issued filter change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterCommand {
    /// Replace both search text and category.
    Set(ViewFilter),
    /// Replace the search text (e.g. a tag chip was chosen).
    Search(String),
    /// Replace the category.
    Category(String),
    /// Clear the search text, keep the category.
    ClearSearch,
    /// Clear the search text and select `All`.
    Reset,
}

/// State machine applying snapshot, feed deliveries and filter changes.
pub struct SyncEngine {
    config: SyncConfig,
    state: SyncState,
    store: ViewStore,
    applier: ChangeApplier,
    filter: ViewFilter,
    error: Option<String>,
    observers: ObserverRegistry,
    bus: Arc<EventBus>,
}

impl SyncEngine {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            applier: ChangeApplier::new(config.conflict_policy),
            bus: Arc::new(EventBus::new(config.event_bus_capacity)),
            config,
            state: SyncState::Uninitialized,
            store: ViewStore::new(),
            filter: ViewFilter::default(),
            error: None,
            observers: ObserverRegistry::new(),
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Read access to the view store.
    pub fn store(&self) -> &ViewStore {
        &self.store
    }

    pub fn filter(&self) -> &ViewFilter {
        &self.filter
    }

    /// Load error, when the engine is [`SyncState::Failed`].
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.bus)
    }

    /// Register an observer called after every recomputation.
    pub fn on_view_update<F>(&mut self, observer: F)
    where
        F: Fn(&ViewUpdate) + Send + Sync + 'static,
    {
        self.observers.register(observer);
    }

    /// Subscribe to enveloped view updates.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<EventEnvelope> {
        self.bus.subscribe()
    }

    // ------------------------------------------------------------------------
    // Lifecycle transitions
    // ------------------------------------------------------------------------

    /// `Uninitialized -> Loading`. Returns false from any other state.
    pub fn begin_loading(&mut self) -> bool {
        if self.state != SyncState::Uninitialized {
            warn!(state = %self.state, "Snapshot load requested outside Uninitialized");
            return false;
        }
        self.transition(SyncState::Loading);
        true
    }

    /// Bulk-load snapshot records in their returned order.
    ///
    /// Records without a usable id are dropped with a diagnostic. Returns the
    /// number of notes admitted. The engine stays `Loading` until
    /// [`SyncEngine::go_live`].
    pub fn load_snapshot(&mut self, records: Vec<NoteRecord>) -> usize {
        if self.state != SyncState::Loading {
            warn!(state = %self.state, "Ignoring snapshot outside Loading");
            return 0;
        }
        let received = records.len();
        let mut admitted = 0;
        for record in records {
            match Note::try_from(record) {
                Ok(note) => {
                    trace!(note_id = %note.id, "Loading snapshot note");
                    self.store.append(note);
                    admitted += 1;
                }
                Err(e) => warn!(error = %e, "Dropping snapshot record"),
            }
        }
        info!(
            received,
            admitted,
            total_count = self.store.size(),
            "Snapshot loaded"
        );
        admitted
    }

    /// `Loading -> Live`, publishing the initial view.
    pub fn go_live(&mut self) -> Option<ViewUpdate> {
        if self.state != SyncState::Loading {
            warn!(state = %self.state, "Go-live requested outside Loading");
            return None;
        }
        self.transition(SyncState::Live);
        self.store.take_dirty();
        let count = self.store.size();
        Some(self.publish(ViewChange::Loaded { count }))
    }

    /// Any non-terminal state `-> Failed`, publishing the error state.
    pub fn fail(&mut self, error: impl Into<String>) -> Option<ViewUpdate> {
        if self.state == SyncState::Failed {
            return None;
        }
        let error = error.into();
        error!(error = %error, state = %self.state, "Sync failed");
        self.error = Some(error.clone());
        self.transition(SyncState::Failed);
        Some(self.publish(ViewChange::Failed { error }))
    }

    // ------------------------------------------------------------------------
    // Inputs
    // ------------------------------------------------------------------------

    /// Handle one change-feed delivery.
    ///
    /// Every insert or update republishes the view, including a repeated or
    /// stale one that left the store as it was. Invalid payloads, deletes of
    /// unknown ids and deliveries outside `Live` publish nothing.
    pub fn handle_feed(&mut self, message: FeedMessage) -> Option<ViewUpdate> {
        if self.state != SyncState::Live {
            debug!(state = %self.state, change_kind = %message.kind, "Ignoring feed delivery");
            return None;
        }
        let kind = message.kind;
        match ChangeEvent::from_feed(message) {
            Ok(event) => self.apply(event),
            Err(e) => {
                warn!(change_kind = %kind, error = %e, "Dropping change-feed payload");
                None
            }
        }
    }

    /// Apply a validated change event (only while `Live`).
    pub fn apply(&mut self, event: ChangeEvent) -> Option<ViewUpdate> {
        if self.state != SyncState::Live {
            debug!(state = %self.state, "Ignoring change outside Live");
            return None;
        }
        let id = event.note_id().clone();
        let outcome = self.applier.apply(&mut self.store, event);
        self.store.take_dirty();

        let change = match outcome {
            // Unchanged and stale upserts still republish, carrying the stored note.
            ApplyOutcome::Inserted
            | ApplyOutcome::Updated
            | ApplyOutcome::Unchanged
            | ApplyOutcome::Stale => {
                let note = self.store.get(&id).cloned()?;
                let position = self.store.position(&id).unwrap_or(0);
                ViewChange::Upserted {
                    note,
                    inserted: outcome == ApplyOutcome::Inserted,
                    position,
                }
            }
            ApplyOutcome::Removed(note) => ViewChange::Removed { id: note.id },
            ApplyOutcome::Absent => return None,
        };
        self.reconcile_category();
        Some(self.publish(change))
    }

    /// Apply a filter command. The store is not touched.
    pub fn apply_filter(&mut self, command: FilterCommand) -> ViewUpdate {
        match command {
            FilterCommand::Set(filter) => self.filter = filter,
            FilterCommand::Search(text) => self.filter.search_text = text,
            FilterCommand::Category(category) => self.filter.category = category,
            FilterCommand::ClearSearch => self.filter.search_text.clear(),
            FilterCommand::Reset => self.filter = ViewFilter::default(),
        }
        debug!(
            query = %self.filter.search_text,
            category = %self.filter.category,
            "Filter changed"
        );
        let filter = self.filter.clone();
        self.publish(ViewChange::FilterChanged { filter })
    }

    pub fn set_filter(
        &mut self,
        search_text: impl Into<String>,
        category: impl Into<String>,
    ) -> ViewUpdate {
        self.apply_filter(FilterCommand::Set(ViewFilter::new(search_text, category)))
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Visible notes and counts for the active filter.
    ///
    /// Empty before `Live`; a fixed error result once `Failed`.
    pub fn current_view(&self) -> QueryResult {
        match self.state {
            SyncState::Live => query::visible(&self.store, &self.filter),
            SyncState::Failed => QueryResult::failed(self.error.clone().unwrap_or_default()),
            SyncState::Uninitialized | SyncState::Loading => QueryResult::empty(),
        }
    }

    /// Category set; just `All` outside `Live`.
    pub fn categories(&self) -> Vec<String> {
        match self.state {
            SyncState::Live => category_set(&self.store),
            _ => vec![ALL_CATEGORY.to_string()],
        }
    }

    /// Tag ranking for `scope`; empty outside `Live`.
    pub fn top_tags(&self, scope: &str) -> Vec<String> {
        match self.state {
            SyncState::Live => tag_ranking(&self.store, scope, self.config.top_tags_limit),
            _ => Vec::new(),
        }
    }

    /// Tag ranking for the active category, with its empty-state message.
    pub fn tag_ranking(&self) -> TagRanking {
        TagRanking {
            scope: self.filter.category.clone(),
            tags: self.top_tags(&self.filter.category),
        }
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn transition(&mut self, next: SyncState) {
        info!(from = %self.state, state = %next, "Sync state transition");
        self.state = next;
    }

    /// Fall back to `All` when the selected category left the category set.
    fn reconcile_category(&mut self) {
        if self.filter.is_all_categories() {
            return;
        }
        let category = &self.filter.category;
        if !self.store.iter().any(|note| &note.category == category) {
            debug!(category = %category, "Selected category vanished, selecting All");
            self.filter.category = ALL_CATEGORY.to_string();
        }
    }

    /// Recompute counts and aggregates, notify observers and the bus.
    fn publish(&mut self, change: ViewChange) -> ViewUpdate {
        let view = self.current_view();
        let update = ViewUpdate {
            change,
            shown_count: view.shown_count,
            total_count: view.total_count,
            revision: self.store.revision(),
            filter: self.filter.clone(),
            categories: self.categories(),
            top_tags: self.top_tags(&self.filter.category),
        };
        debug!(
            event_type = update.change.namespaced_event_type(),
            shown_count = update.shown_count,
            total_count = update.total_count,
            revision = update.revision,
            "View recomputed"
        );
        self.observers.notify(&update);
        self.bus.emit(update.clone());
        update
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("state", &self.state)
            .field("size", &self.store.size())
            .field("filter", &self.filter)
            .field("observers", &self.observers)
            .finish()
    }
}
