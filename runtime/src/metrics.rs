//! Prometheus metrics for observability and monitoring.
//!
//! Recorders for the two runtime components:
//! - Booking creates (attempts, rejections by reason, latency)
//! - Live view lifecycle (binds, snapshots, failures, partition sizes)
//!
//! Recording is always cheap: without an installed recorder the `metrics`
//! macros are no-ops.
//!
//! # Example
//!
//! ```rust,no_run
//! use parkslot_runtime::metrics::MetricsServer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Serves http://0.0.0.0:9090/metrics until the server is dropped
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//!
//! if let Some(text) = server.render() {
//!     println!("{text}");
//! }
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;

pub use metrics::{counter, gauge, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus metrics endpoint.
///
/// Installs the global Prometheus recorder, serves it over HTTP on `addr`
/// and keeps the handle for in-process rendering.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
    exporter: Option<JoinHandle<()>>,
}

impl MetricsServer {
    /// Create a new metrics server for `addr`.
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            handle: None,
            exporter: None,
        }
    }

    /// Address the scrape endpoint listens on
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Register metric descriptions, install the Prometheus recorder and
    /// start serving it on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`MetricsError::Install`] when called outside a tokio runtime, or
    ///   when the recorder cannot be installed for a reason other than one
    ///   already being present
    /// - [`MetricsError::Build`] if bucket configuration is rejected or the
    ///   listener cannot bind
    ///
    /// When a recorder is already installed (several servers in one test
    /// binary), this logs a warning and succeeds without a handle.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| MetricsError::Install(format!("no tokio runtime to serve on: {e}")))?;

        register_metrics();

        let (recorder, exporter) = PrometheusBuilder::new()
            .with_http_listener(self.addr)
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?
            .build()
            .map_err(|e| MetricsError::Build(e.to_string()))?;
        let handle = recorder.handle();

        match metrics::set_global_recorder(recorder) {
            Ok(()) => {
                let addr = self.addr;
                self.exporter = Some(runtime.spawn(async move {
                    if exporter.await.is_err() {
                        tracing::error!(%addr, "Metrics endpoint stopped");
                    }
                }));
                self.handle = Some(handle);
                tracing::info!(addr = %self.addr, "Metrics endpoint serving");
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

    /// Render current metrics in Prometheus text format.
    ///
    /// Returns `None` if this server did not install the recorder.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

impl Drop for MetricsServer {
    fn drop(&mut self) {
        if let Some(exporter) = self.exporter.take() {
            exporter.abort();
        }
    }
}

/// Register all metric descriptions.
pub fn register_metrics() {
    // Booking
    describe_counter!(
        "booking_create_attempts_total",
        "Total number of booking creates attempted"
    );
    describe_counter!(
        "booking_created_total",
        "Total number of bookings the store accepted"
    );
    describe_counter!(
        "booking_rejected_total",
        "Total number of booking creates rejected, labelled by reason"
    );
    describe_histogram!(
        "booking_create_duration_seconds",
        "Time taken by the store to accept a booking"
    );

    // Live view
    describe_counter!("live_view_binds_total", "Total number of live view binds");
    describe_counter!(
        "live_view_teardowns_total",
        "Total number of live view teardowns"
    );
    describe_counter!(
        "live_view_snapshots_total",
        "Total number of snapshots classified by live views"
    );
    describe_counter!(
        "live_view_failures_total",
        "Total number of live views that ended in a store error"
    );
    describe_gauge!(
        "live_view_active_reservations",
        "Active partition size after the latest snapshot"
    );
    describe_gauge!(
        "live_view_history_reservations",
        "History partition size after the latest snapshot"
    );
    describe_histogram!(
        "live_view_classify_duration_seconds",
        "Time taken to classify one snapshot"
    );
}

/// Booking metrics recorder.
pub struct BookingMetrics;

impl BookingMetrics {
    /// Record a create attempt.
    pub fn record_attempt() {
        counter!("booking_create_attempts_total").increment(1);
    }

    /// Record a create the store accepted.
    pub fn record_created(duration: Duration) {
        counter!("booking_created_total").increment(1);
        histogram!("booking_create_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record a rejected create.
    ///
    /// `reason` is a short static label such as `validation` or `unauthenticated`.
    pub fn record_rejected(reason: &'static str) {
        counter!("booking_rejected_total", "reason" => reason).increment(1);
    }
}

/// Live view metrics recorder.
pub struct LiveViewMetrics;

impl LiveViewMetrics {
    /// Record a bind.
    pub fn record_bind() {
        counter!("live_view_binds_total").increment(1);
    }

    /// Record a teardown.
    pub fn record_teardown() {
        counter!("live_view_teardowns_total").increment(1);
    }

    /// Record one classified snapshot and the resulting partition sizes.
    #[allow(clippy::cast_precision_loss)] // Partition sizes are far below 2^52
    pub fn record_snapshot(active: usize, history: usize, duration: Duration) {
        counter!("live_view_snapshots_total").increment(1);
        gauge!("live_view_active_reservations").set(active as f64);
        gauge!("live_view_history_reservations").set(history as f64);
        histogram!("live_view_classify_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record a terminal store error.
    pub fn record_failure() {
        counter!("live_view_failures_total").increment(1);
    }
}
