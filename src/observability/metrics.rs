//! Refresh metrics.
//!
//! # Metrics
//! - `dynconf_reloads_total` (counter): refresh attempts by config, source, outcome
//! - `dynconf_startup_failures_total` (counter): remote configs skipped at startup
//! - `dynconf_poll_errors_total` (counter): failed remote polls by config
//!
//! Recorded through the `metrics` facade; installing an exporter is up to the
//! application.

use metrics::counter;

/// Refresh outcome label values.
pub const OUTCOME_APPLIED: &str = "applied";
pub const OUTCOME_REJECTED: &str = "rejected";

pub fn record_reload(config: &str, source: &'static str, outcome: &'static str) {
    counter!(
        "dynconf_reloads_total",
        "config" => config.to_string(),
        "source" => source,
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_startup_failure(config: &str) {
    counter!("dynconf_startup_failures_total", "config" => config.to_string()).increment(1);
}

pub fn record_poll_error(config: &str) {
    counter!("dynconf_poll_errors_total", "config" => config.to_string()).increment(1);
}
