//! Process-wide constants that are not worth plumbing through config files:
//! protocol-level timeouts and the fixed benchmark prompt. The fake-marker
//! list is deliberately NOT here — spec requires it to be a configuration
//! value, not a recompile, so it lives on [`crate::Settings`] instead.

/// Deterministic prompt sent to every model on every probe, so throughput
/// numbers are comparable across backends and over time.
pub const BENCHMARK_PROMPT: &str =
    "Translate the following classical Chinese text into modern English: \
     \u{5b66}\u{800c}\u{65f6}\u{4e60}\u{4e4b}，\u{4e0d}\u{4ea6}\u{8bf4}\u{4e4e}？\
     \u{6709}\u{670b}\u{81ea}\u{8fdc}\u{65b9}\u{6765}，\u{4e0d}\u{4ea6}\u{4e50}\u{4e4e}？";

pub mod timeouts {
    /// Version probe deadline.
    pub const VERSION_PROBE_SECS: u64 = 10;
    /// Per-model generate benchmark deadline.
    pub const MODEL_BENCHMARK_SECS: u64 = 60;
    /// Forwarder first-byte deadline: past this, failover to the next
    /// backend is still allowed.
    pub const FORWARDER_FIRST_BYTE_SECS: u64 = 10;
    /// On-demand scheduling skip window: don't re-schedule a probe if one
    /// is already running within this many minutes.
    pub const ON_DEMAND_SKIP_MINUTES: i64 = 10;
    /// Delay before the scheduler's first periodic tick after startup.
    pub const SCHEDULER_WARMUP_SECS: u64 = 10;
    /// Lead time given to a freshly inserted periodic-tick task.
    pub const PERIODIC_TASK_LEAD_SECS: i64 = 30;
}

pub mod limits {
    /// Endpoints processed per batch during the periodic tick, with a yield
    /// between batches so the tick never starves the request path.
    pub const SCHEDULER_BATCH_SIZE: usize = 500;
    /// Default process-wide concurrent probe cap.
    pub const DEFAULT_MAX_CONCURRENT_PROBES: usize = 50;
}

/// Substrings that identify a backend that serves canned text while
/// claiming to host a real model. Kept as plain strings (not compiled
/// patterns) since new markers are appended in config, never code.
pub fn default_fake_markers() -> Vec<String> {
    vec!["fake-ollama".to_string(), "\u{670d}\u{52a1}\u{5668}\u{7e41}\u{5fd9}".to_string()]
}
