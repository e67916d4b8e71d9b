//! Collaborator seams for the sync engine.
//!
//! The remote store and its realtime channel are external; these traits are
//! what the sync controller needs from them. Injecting them keeps the
//! controller constructible in tests without a network.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;
use crate::models::{FeedMessage, NoteRecord};

/// Stream of change-feed deliveries. Ends when the subscription is torn down.
pub type FeedStream = BoxStream<'static, FeedMessage>;

// =============================================================================
// SNAPSHOT SOURCE
// =============================================================================

/// Source of the initial snapshot.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetch every record, in display order (typically newest first).
    ///
    /// Fails with [`crate::Error::Transport`] when the remote is unreachable.
    /// Records are mapped by the caller; invalid ones are dropped there.
    async fn list_all(&self) -> Result<Vec<NoteRecord>>;
}

// =============================================================================
// CHANGE FEED
// =============================================================================

/// Realtime change feed for the notes collection.
///
/// No ordering or delivery-count guarantee is assumed: deliveries may arrive
/// out of order or more than once.
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    /// Open a subscription. Fails with [`crate::Error::Transport`] when the
    /// channel cannot be set up.
    async fn subscribe(&self) -> Result<FeedStream>;
}
