//! # noteview-sync
//!
//! Incremental view sync for noteview.
//!
//! This crate provides:
//! - An ordered, id-keyed view store of notes
//! - An idempotent, order-tolerant change applier
//! - Category and tag-frequency aggregation
//! - Filter evaluation over the store
//! - A sync controller that bulk-loads a snapshot, applies a live change feed
//!   and notifies observers after every recomputation
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use noteview_sync::{SyncConfig, SyncController};
//!
//! let mut controller = SyncController::new(SyncConfig::from_env(), source, feed);
//! controller.on_view_update(|update| println!("{}", update.announcement()));
//!
//! let handle = controller.start();
//! handle.ready().await;
//!
//! // Consumer filter changes are serialized with feed deliveries
//! let update = handle.set_filter("exam", "Math").await?;
//! println!("{} of {}", update.shown_count, update.total_count);
//!
//! handle.shutdown().await?;
//! ```

pub mod aggregate;
pub mod applier;
pub mod config;
pub mod controller;
pub mod engine;
pub mod mock;
pub mod query;
pub mod store;

// Re-export core types
pub use noteview_core::*;

pub use aggregate::{category_set, tag_counts, tag_ranking, TagCount, TagRanking};
pub use applier::{ApplyOutcome, ChangeApplier, ChangeEvent, ConflictPolicy};
pub use config::SyncConfig;
pub use controller::{SyncController, SyncHandle};
pub use engine::{FilterCommand, SyncEngine, SyncState};
pub use query::QueryResult;
pub use store::{UpsertOutcome, ViewStore};
