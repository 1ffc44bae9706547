//! BroadcastConfig - Config Loader output
//!
//! Describes which targets to broadcast to and how to schedule them.

use serde::{Deserialize, Serialize};

/// Fan-out scheduling policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// All targets in parallel, optionally capped by `max_concurrency`
    #[default]
    Concurrent,
    /// One target at a time
    Sequential,
}

/// Complete broadcast configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BroadcastConfig {
    /// Target URIs, e.g. `log://` or `file:///var/spool/broadcast`
    #[serde(default)]
    pub broadcasters: Vec<String>,

    /// Scheduling policy
    #[serde(default)]
    pub mode: DispatchMode,

    /// Upper bound on targets dispatched at once (None = one per target)
    #[serde(default)]
    pub max_concurrency: Option<usize>,

    /// Cancel the broadcast after this many seconds (None = no timeout)
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}
