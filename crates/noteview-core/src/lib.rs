//! # noteview-core
//!
//! Core types, traits, and abstractions for the noteview sync engine.
//!
//! This crate provides the entity model (notes and their remote record
//! mapping), filter state, view-update notifications, and the collaborator
//! traits that `noteview-sync` depends on.

pub mod defaults;
pub mod error;
pub mod events;
pub mod filter;
pub mod logging;
pub mod models;
pub mod traits;
pub mod uuid_utils;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use events::{
    announcement, EventBus, EventEnvelope, ObserverRegistry, ViewChange, ViewObserver, ViewUpdate,
};
pub use filter::ViewFilter;
pub use models::*;
pub use traits::*;
pub use uuid_utils::{extract_timestamp, is_v7, new_v7};
