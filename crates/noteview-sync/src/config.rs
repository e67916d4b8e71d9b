//! Sync controller configuration.

use noteview_core::defaults;

use crate::applier::ConflictPolicy;

/// Configuration for the sync controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Maximum number of tags in a tag ranking.
    pub top_tags_limit: usize,
    /// Capacity of the view-update broadcast channel.
    pub event_bus_capacity: usize,
    /// Capacity of the consumer command queue.
    pub command_queue_capacity: usize,
    /// How inserts/updates are reconciled with stored notes.
    pub conflict_policy: ConflictPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            top_tags_limit: defaults::TOP_TAGS_LIMIT,
            event_bus_capacity: defaults::EVENT_BUS_CAPACITY,
            command_queue_capacity: defaults::COMMAND_QUEUE_CAPACITY,
            conflict_policy: ConflictPolicy::default(),
        }
    }
}

impl SyncConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `NOTEVIEW_TOP_TAGS_LIMIT` | `8` | Tags per ranking |
    /// | `NOTEVIEW_EVENT_BUS_CAPACITY` | `256` | View-update broadcast buffer |
    /// | `NOTEVIEW_COMMAND_QUEUE_CAPACITY` | `64` | Consumer command queue |
    /// | `NOTEVIEW_CONFLICT_POLICY` | `last_writer_wins` | `accept_all` or `last_writer_wins` |
    ///
    /// Unparseable values fall back to the default with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup (environment, test maps).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let base = Self::default();

        let top_tags_limit = parse_or(&lookup, "NOTEVIEW_TOP_TAGS_LIMIT", base.top_tags_limit);
        let event_bus_capacity =
            parse_or(&lookup, "NOTEVIEW_EVENT_BUS_CAPACITY", base.event_bus_capacity).max(1);
        let command_queue_capacity = parse_or(
            &lookup,
            "NOTEVIEW_COMMAND_QUEUE_CAPACITY",
            base.command_queue_capacity,
        )
        .max(1);
        let conflict_policy = parse_or(&lookup, "NOTEVIEW_CONFLICT_POLICY", base.conflict_policy);

        Self {
            top_tags_limit,
            event_bus_capacity,
            command_queue_capacity,
            conflict_policy,
        }
    }

    /// Set the tag ranking size.
    pub fn with_top_tags_limit(mut self, limit: usize) -> Self {
        self.top_tags_limit = limit;
        self
    }

    /// Set the broadcast channel capacity.
    pub fn with_event_bus_capacity(mut self, capacity: usize) -> Self {
        self.event_bus_capacity = capacity;
        self
    }

    /// Set the command queue capacity.
    pub fn with_command_queue_capacity(mut self, capacity: usize) -> Self {
        self.command_queue_capacity = capacity;
        self
    }

    /// Set the conflict policy.
    pub fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.conflict_policy = policy;
        self
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, value = %raw, "Invalid config value, using default");
                default
            }
        },
        None => default,
    }
}
