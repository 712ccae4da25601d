//! Tracing and metrics setup for the binary.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::{Config, LogFormat};

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` directives that fail to parse fall back to `info`.
pub fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

/// Installs the Prometheus recorder and describes the dispatcher metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    describe_metrics();
    Ok(handle)
}

fn describe_metrics() {
    metrics::describe_counter!(
        "cqrs_messages_dispatched_total",
        "Messages queued on a dispatcher"
    );
    metrics::describe_counter!(
        "cqrs_messages_handled_total",
        "Messages whose handler completed successfully"
    );
    metrics::describe_counter!(
        "cqrs_messages_unhandled_total",
        "Messages dropped because no handler was registered for their tag"
    );
    metrics::describe_counter!(
        "cqrs_handler_failures_total",
        "Handler invocations that returned an error or panicked"
    );
    metrics::describe_histogram!(
        "cqrs_handler_duration_seconds",
        metrics::Unit::Seconds,
        "Time spent inside handlers"
    );
}
