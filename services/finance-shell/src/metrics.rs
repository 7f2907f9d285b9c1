//! Prometheus metrics exposition
//!
//! The library crates emit through the `metrics` facade:
//!
//! - `api_requests_total` (counter): labels `method`, `status`
//! - `session_refresh_total` (counter): label `outcome`
//! - `router_activations_total` (counter): label `route`
//! - `router_redirects_total` (counter): label `reason`
//!
//! The shell adds `shell_commands_total` and
//! `shell_command_duration_seconds` (histogram), both labelled `command`.

use anyhow::{Context, Result};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

const COMMAND_DURATION: &str = "shell_command_duration_seconds";

/// Bucket boundaries from 1ms to 30s; a command spans a full navigation
/// including token renewal.
const DURATION_BUCKETS: &[f64] = &[0.001, 0.005, 0.025, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

fn builder() -> Result<PrometheusBuilder> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Full(COMMAND_DURATION.to_string()), DURATION_BUCKETS)
        .context("failed to set histogram buckets")
}

/// Install the global recorder and return a handle for rendering metrics.
pub fn install_recorder() -> Result<PrometheusHandle> {
    builder()?
        .install_recorder()
        .context("failed to install Prometheus recorder")
}

/// Record one executed shell command.
pub fn record_command(command: &'static str, duration_secs: f64) {
    metrics::counter!("shell_commands_total", "command" => command).increment(1);
    metrics::histogram!(COMMAND_DURATION, "command" => command).record(duration_secs);
}
