//! Centralized default constants for noteview.
//!
//! **This module is the single source of truth** for shared default values.
//! Both crates reference these constants instead of defining their own
//! magic strings or numbers.

// =============================================================================
// ENTITY PLACEHOLDERS
// =============================================================================

/// Title used when a remote record has no (or a blank) title.
pub const UNTITLED: &str = "Untitled";

/// Category used when a remote record has no (or a blank) category.
pub const DEFAULT_CATEGORY: &str = "General";

/// Delimiter separating tags in the raw tag string.
pub const TAG_DELIMITER: char = ',';

// =============================================================================
// FILTERING & AGGREGATION
// =============================================================================

/// Sentinel category label matching every entity.
pub const ALL_CATEGORY: &str = "All";

/// Maximum number of tags returned by a tag ranking.
pub const TOP_TAGS_LIMIT: usize = 8;

// =============================================================================
// SYNC CONTROLLER
// =============================================================================

/// Default view-update broadcast channel capacity.
pub const EVENT_BUS_CAPACITY: usize = 256;

/// Default capacity of the consumer command queue.
pub const COMMAND_QUEUE_CAPACITY: usize = 64;

// =============================================================================
// ANNOUNCEMENTS
// =============================================================================

/// Message reported while the controller is in the failed state.
pub const LOAD_FAILED_MESSAGE: &str = "Failed to load notes. Please try again later.";

/// Message shown when the tag ranking for the `All` scope is empty.
pub const NO_TAGS_MESSAGE: &str = "No tags available";
