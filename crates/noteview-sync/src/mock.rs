//! In-memory snapshot source and change feed for deterministic testing.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use noteview_sync::mock::{ChannelFeed, StaticSnapshotSource};
//! use noteview_sync::{SyncConfig, SyncController};
//!
//! #[tokio::test]
//! async fn test_with_mock_remote() {
//!     let source = StaticSnapshotSource::from_json(vec![
//!         serde_json::json!({"id": 1, "title": "Algebra Notes", "class": "Math"}),
//!     ]);
//!     let (feed, sender) = ChannelFeed::new();
//!     let handle =
//!         SyncController::new(SyncConfig::default(), Arc::new(source), Arc::new(feed)).start();
//!     handle.ready().await;
//!     sender.insert(serde_json::json!({"id": 2, "title": "Cells"}));
//! }
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde_json::Value as JsonValue;
use tokio::sync::{mpsc, Mutex};

use noteview_core::{
    ChangeFeed, ChangeKind, Error, FeedMessage, FeedStream, NoteRecord, Result, SnapshotSource,
};

// =============================================================================
// SNAPSHOT SOURCE
// =============================================================================

/// Snapshot source returning a fixed record list (or a fixed error).
#[derive(Debug, Default)]
pub struct StaticSnapshotSource {
    records: Vec<NoteRecord>,
    error: Option<String>,
    calls: AtomicUsize,
}

impl StaticSnapshotSource {
    pub fn new(records: Vec<NoteRecord>) -> Self {
        Self {
            records,
            ..Self::default()
        }
    }

    /// Build from raw remote rows. Rows that are not JSON objects are skipped.
    pub fn from_json(rows: Vec<JsonValue>) -> Self {
        Self::new(
            rows.into_iter()
                .filter_map(|row| NoteRecord::from_json(row).ok())
                .collect(),
        )
    }

    /// A source whose fetch always fails with a transport error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    /// Number of `list_all` calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotSource for StaticSnapshotSource {
    async fn list_all(&self) -> Result<Vec<NoteRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.error {
            Some(message) => Err(Error::Transport(message.clone())),
            None => Ok(self.records.clone()),
        }
    }
}

// =============================================================================
// CHANGE FEED
// =============================================================================

/// Change feed backed by an unbounded channel.
///
/// Supports a single subscription; deliveries pushed through the paired
/// [`FeedSender`] before subscribing are buffered. Dropping every sender ends
/// the stream.
#[derive(Debug)]
pub struct ChannelFeed {
    rx: Mutex<Option<mpsc::UnboundedReceiver<FeedMessage>>>,
    error: Option<String>,
}

impl ChannelFeed {
    pub fn new() -> (Self, FeedSender) {
        let (tx, rx) = mpsc::unbounded_channel();
        let feed = Self {
            rx: Mutex::new(Some(rx)),
            error: None,
        };
        (feed, FeedSender { tx })
    }

    /// A feed whose subscription setup always fails.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            rx: Mutex::new(None),
            error: Some(message.into()),
        }
    }
}

#[async_trait]
impl ChangeFeed for ChannelFeed {
    async fn subscribe(&self) -> Result<FeedStream> {
        if let Some(message) = &self.error {
            return Err(Error::Transport(message.clone()));
        }
        let rx = self
            .rx
            .lock()
            .await
            .take()
            .ok_or_else(|| Error::Transport("Change feed already subscribed".into()))?;
        Ok(stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|message| (message, rx))
        })
        .boxed())
    }
}

/// Producer side of a [`ChannelFeed`].
#[derive(Debug, Clone)]
pub struct FeedSender {
    tx: mpsc::UnboundedSender<FeedMessage>,
}

impl FeedSender {
    /// Push a delivery. Returns false once the subscriber is gone.
    pub fn send(&self, message: FeedMessage) -> bool {
        self.tx.send(message).is_ok()
    }

    /// Push a raw delivery; non-object payloads become an empty record.
    pub fn send_json(&self, kind: ChangeKind, payload: JsonValue) -> bool {
        let record = NoteRecord::from_json(payload).unwrap_or_default();
        self.send(FeedMessage { kind, record })
    }

    pub fn insert(&self, payload: JsonValue) -> bool {
        self.send_json(ChangeKind::Insert, payload)
    }

    pub fn update(&self, payload: JsonValue) -> bool {
        self.send_json(ChangeKind::Update, payload)
    }

    /// Push a delete; `payload` is the old record (only `id` is needed).
    pub fn delete(&self, payload: JsonValue) -> bool {
        self.send_json(ChangeKind::Delete, payload)
    }
}
