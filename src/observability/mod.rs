//! Observability.
//!
//! ```text
//! file watcher / remote poller
//!     → logging.rs (tracing events: reloads, skipped configs, poll failures)
//!     → metrics.rs (counters through the metrics facade)
//! ```
//!
//! Refresh failures are recovered locally and never reach readers, so logs and
//! metrics are the only place they show up.

pub mod logging;
pub mod metrics;
