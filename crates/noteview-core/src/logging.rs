//! Structured logging schema and field name constants for noteview.
//!
//! Both crates use these constants for consistent structured logging fields,
//! so log tooling can query by the same names across the view store, the
//! change applier and the sync controller.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Snapshot load or subscription setup failed (controller is `Failed`) |
//! | WARN  | Payload dropped, stale update ignored, feed ended |
//! | INFO  | Lifecycle transitions (loading, live, failed, shutdown) |
//! | DEBUG | Per-event application, filter changes, recomputation results |
//! | TRACE | Per-entity iteration (bulk load, aggregation) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "store", "applier", "sync"
pub const SUBSYSTEM: &str = "subsystem";

/// Logical operation name.
/// Examples: "load", "apply", "set_filter", "recompute"
pub const OPERATION: &str = "op";

/// Controller state after a transition.
pub const STATE: &str = "state";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Note id being operated on.
pub const NOTE_ID: &str = "note_id";

/// Change kind ("insert", "update", "delete").
pub const CHANGE_KIND: &str = "change_kind";

/// Search text of the active filter.
pub const QUERY: &str = "query";

/// Category of the active filter.
pub const CATEGORY: &str = "category";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Number of entities passing the active filter.
pub const SHOWN_COUNT: &str = "shown_count";

/// Number of entities in the view store.
pub const TOTAL_COUNT: &str = "total_count";

/// Store revision after a mutation.
pub const REVISION: &str = "revision";

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
