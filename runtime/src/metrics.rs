//! Prometheus metrics for the ticket lifecycle.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `turnstile_tickets_issued_total{ticket_type}` - Tickets issued per type
//! - `turnstile_checks_total{outcome}` - Checks by outcome (invalid, valid, used)
//! - `turnstile_redemptions_total{outcome}` - Redemptions by outcome (invalid, valid, used, busy)
//! - `turnstile_ticket_id_collisions_total` - Generated identifiers that were already taken
//!
//! ## Histograms
//! - `turnstile_redeem_duration_seconds` - Time spent in `redeem`, lock wait included
//!
//! # Example
//!
//! ```rust,no_run
//! use turnstile_runtime::metrics::MetricsExporter;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut exporter = MetricsExporter::new();
//! exporter.install()?;
//!
//! // ... issue and redeem tickets ...
//!
//! if let Some(text) = exporter.render() {
//!     println!("{text}");
//! }
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;
use thiserror::Error;
use turnstile_core::{CheckStatus, RedeemStatus};

/// Errors from metrics setup.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Process-wide Prometheus recorder.
///
/// Installing registers every ticket metric description and routes the
/// `metrics` macros to an in-process Prometheus registry. Rendering returns
/// the text exposition format, ready to be served by whatever HTTP layer the
/// application has.
#[derive(Default)]
pub struct MetricsExporter {
    handle: Option<PrometheusHandle>,
}

impl MetricsExporter {
    /// Create an exporter that has not been installed yet.
    #[must_use]
    pub const fn new() -> Self {
        Self { handle: None }
    }

    /// Install the global recorder.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Build`] if the histogram buckets are rejected
    /// and [`MetricsError::Install`] if the recorder cannot be installed.
    ///
    /// # Note
    ///
    /// A recorder that is already installed (e.g., by an earlier test) is not
    /// an error; this exporter then stays without a handle and
    /// [`render`](Self::render) returns `None`.
    pub fn install(&mut self) -> Result<(), MetricsError> {
        register_ticket_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.000_1, 0.000_5, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!("Prometheus metrics recorder installed");
                Ok(())
            }
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            }
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if this exporter did not install the recorder.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register descriptions for every ticket metric.
///
/// Called by [`MetricsExporter::install`]; call it directly when the
/// application installs its own recorder.
pub fn register_ticket_metrics() {
    describe_counter!(
        "turnstile_tickets_issued_total",
        "Total number of tickets issued, by ticket type"
    );
    describe_counter!(
        "turnstile_checks_total",
        "Total number of ticket checks by outcome (invalid, valid, used)"
    );
    describe_counter!(
        "turnstile_redemptions_total",
        "Total number of redemption attempts by outcome (invalid, valid, used, busy)"
    );
    describe_counter!(
        "turnstile_ticket_id_collisions_total",
        "Total number of generated ticket IDs that were already taken"
    );
    describe_histogram!(
        "turnstile_redeem_duration_seconds",
        "Time taken to redeem a ticket, including waiting for its token"
    );

    tracing::debug!("Ticket metrics registered");
}

/// Record an issued ticket.
pub fn record_ticket_issued(ticket_type: &str) {
    metrics::counter!("turnstile_tickets_issued_total", "ticket_type" => ticket_type.to_owned())
        .increment(1);
    tracing::debug!(ticket_type, "Recorded ticket_issued metric");
}

/// Record a check outcome.
pub fn record_check(status: CheckStatus) {
    metrics::counter!("turnstile_checks_total", "outcome" => status.as_str()).increment(1);
}

/// Record a redemption outcome and how long it took.
pub fn record_redemption(status: RedeemStatus, duration: Duration) {
    metrics::counter!("turnstile_redemptions_total", "outcome" => status.as_str()).increment(1);
    metrics::histogram!("turnstile_redeem_duration_seconds").record(duration.as_secs_f64());
}

/// Record a generated identifier that was already taken.
pub fn record_id_collision() {
    metrics::counter!("turnstile_ticket_id_collisions_total").increment(1);
    tracing::debug!("Recorded ticket_id_collision metric");
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)] // Test code

    use super::*;

    #[test]
    fn test_exporter_starts_uninstalled() {
        let exporter = MetricsExporter::new();
        assert!(exporter.handle().is_none());
        assert!(exporter.render().is_none());
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_ticket_issued("VIP $200");
        record_check(CheckStatus::Valid);
        record_redemption(RedeemStatus::Busy, Duration::from_millis(3));
        record_id_collision();
    }

    #[test]
    fn test_install_and_render() {
        let mut exporter = MetricsExporter::new();
        exporter.install().unwrap();

        record_redemption(RedeemStatus::Valid, Duration::from_millis(1));

        // Another test binary may own the global recorder; only assert when this one does.
        if let Some(text) = exporter.render() {
            assert!(text.contains("turnstile_redemptions_total"));
        }
    }
}
