//! Sync controller: drives the [`SyncEngine`] from a snapshot source and a
//! change feed.
//!
//! `start` spawns one task that loads the snapshot, opens the feed and then
//! serves feed deliveries and consumer filter commands from a single
//! `select!` loop, so every change is applied and recomputed before the next
//! one is looked at. Consumers talk to the task through a [`SyncHandle`].

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::sync::{broadcast, mpsc, oneshot, watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use noteview_core::{
    ChangeFeed, Error, EventBus, EventEnvelope, FeedStream, Result, SnapshotSource, ViewFilter,
    ViewUpdate,
};

use crate::aggregate::TagRanking;
use crate::config::SyncConfig;
use crate::engine::{FilterCommand, SyncEngine, SyncState};
use crate::query::QueryResult;

enum Command {
    Filter(FilterCommand, oneshot::Sender<ViewUpdate>),
    Shutdown,
}

/// Sync controller, configured but not yet running.
pub struct SyncController {
    engine: SyncEngine,
    source: Arc<dyn SnapshotSource>,
    feed: Arc<dyn ChangeFeed>,
}

impl SyncController {
    pub fn new(
        config: SyncConfig,
        source: Arc<dyn SnapshotSource>,
        feed: Arc<dyn ChangeFeed>,
    ) -> Self {
        Self {
            engine: SyncEngine::new(config),
            source,
            feed,
        }
    }

    /// Register an observer before start, so it sees the initial load.
    pub fn on_view_update<F>(&mut self, observer: F)
    where
        F: Fn(&ViewUpdate) + Send + Sync + 'static,
    {
        self.engine.on_view_update(observer);
    }

    /// Subscribe to enveloped updates before start.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.engine.subscribe()
    }

    /// Spawn the sync task and return a handle to it.
    pub fn start(self) -> SyncHandle {
        let capacity = self.engine.config().command_queue_capacity.max(1);
        let (command_tx, command_rx) = mpsc::channel(capacity);
        let (state_tx, state_rx) = watch::channel(self.engine.state());
        let bus = self.engine.bus();
        let engine = Arc::new(RwLock::new(self.engine));

        let task = tokio::spawn(run(
            Arc::clone(&engine),
            self.source,
            self.feed,
            command_rx,
            state_tx,
        ));
        info!("Sync controller started");

        SyncHandle {
            engine,
            commands: command_tx,
            state_rx,
            bus,
            task,
        }
    }
}

/// Load the snapshot and open the feed, then serve until shutdown.
#[instrument(skip_all, fields(subsystem = "sync"))]
async fn run(
    engine: Arc<RwLock<SyncEngine>>,
    source: Arc<dyn SnapshotSource>,
    feed: Arc<dyn ChangeFeed>,
    mut commands: mpsc::Receiver<Command>,
    state_tx: watch::Sender<SyncState>,
) {
    let start = std::time::Instant::now();
    engine.write().await.begin_loading();
    let _ = state_tx.send(SyncState::Loading);

    let mut deliveries: FeedStream = match bootstrap(&engine, source.as_ref(), feed.as_ref()).await
    {
        Ok(stream) => {
            engine.write().await.go_live();
            let _ = state_tx.send(SyncState::Live);
            info!(
                duration_ms = start.elapsed().as_millis() as u64,
                "Sync controller live"
            );
            stream
        }
        Err(e) => {
            engine.write().await.fail(e.to_string());
            let _ = state_tx.send(SyncState::Failed);
            stream::empty().boxed()
        }
    };
    let mut feed_open = *state_tx.borrow() == SyncState::Live;

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Filter(command, reply)) => {
                    let update = engine.write().await.apply_filter(command);
                    let _ = reply.send(update);
                }
                Some(Command::Shutdown) | None => {
                    info!("Sync controller received shutdown signal");
                    break;
                }
            },
            message = deliveries.next(), if feed_open => match message {
                Some(message) => {
                    engine.write().await.handle_feed(message);
                }
                None => {
                    // No reconnection: the view stays live but stops changing.
                    warn!("Change feed ended, no further changes will be applied");
                    feed_open = false;
                }
            },
        }
    }
    debug!("Sync controller stopped");
}

async fn bootstrap(
    engine: &RwLock<SyncEngine>,
    source: &dyn SnapshotSource,
    feed: &dyn ChangeFeed,
) -> Result<FeedStream> {
    let records = source.list_all().await?;
    engine.write().await.load_snapshot(records);
    feed.subscribe().await
}

/// Handle to a running sync controller.
pub struct SyncHandle {
    engine: Arc<RwLock<SyncEngine>>,
    commands: mpsc::Sender<Command>,
    state_rx: watch::Receiver<SyncState>,
    bus: Arc<EventBus>,
    task: JoinHandle<()>,
}

impl SyncHandle {
    pub async fn state(&self) -> SyncState {
        self.engine.read().await.state()
    }

    /// Wait until the controller is `Live` or `Failed`.
    pub async fn ready(&self) -> SyncState {
        let mut rx = self.state_rx.clone();
        loop {
            let state = *rx.borrow_and_update();
            if matches!(state, SyncState::Live | SyncState::Failed) {
                return state;
            }
            if rx.changed().await.is_err() {
                return self.state().await;
            }
        }
    }

    pub async fn current_view(&self) -> QueryResult {
        self.engine.read().await.current_view()
    }

    pub async fn categories(&self) -> Vec<String> {
        self.engine.read().await.categories()
    }

    pub async fn top_tags(&self, scope: &str) -> Vec<String> {
        self.engine.read().await.top_tags(scope)
    }

    /// Ranking for the active category.
    pub async fn tag_ranking(&self) -> TagRanking {
        self.engine.read().await.tag_ranking()
    }

    pub async fn filter(&self) -> ViewFilter {
        self.engine.read().await.filter().clone()
    }

    /// Replace the filter and wait for the recomputed view.
    pub async fn set_filter(
        &self,
        search_text: impl Into<String>,
        category: impl Into<String>,
    ) -> Result<ViewUpdate> {
        self.send(FilterCommand::Set(ViewFilter::new(search_text, category)))
            .await
    }

    pub async fn set_search(&self, search_text: impl Into<String>) -> Result<ViewUpdate> {
        self.send(FilterCommand::Search(search_text.into())).await
    }

    pub async fn set_category(&self, category: impl Into<String>) -> Result<ViewUpdate> {
        self.send(FilterCommand::Category(category.into())).await
    }

    pub async fn clear_search(&self) -> Result<ViewUpdate> {
        self.send(FilterCommand::ClearSearch).await
    }

    pub async fn reset_filters(&self) -> Result<ViewUpdate> {
        self.send(FilterCommand::Reset).await
    }

    async fn send(&self, command: FilterCommand) -> Result<ViewUpdate> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(Command::Filter(command, reply_tx))
            .await
            .map_err(|_| Error::Internal("Sync controller is not running".into()))?;
        reply_rx
            .await
            .map_err(|_| Error::Internal("Sync controller dropped the filter command".into()))
    }

    /// Register an observer on the running controller.
    pub async fn on_view_update<F>(&self, observer: F)
    where
        F: Fn(&ViewUpdate) + Send + Sync + 'static,
    {
        self.engine.write().await.on_view_update(observer);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.bus.subscribe()
    }

    /// Stop the sync task and wait for it to finish.
    pub async fn shutdown(self) -> Result<()> {
        // A closed queue means the task already stopped.
        let _ = self.commands.send(Command::Shutdown).await;
        self.task
            .await
            .map_err(|e| Error::Internal(format!("Sync task failed: {}", e)))
    }
}
