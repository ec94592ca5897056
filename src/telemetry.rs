//! Logging setup
//!
//! Events go to stderr so that reports printed on stdout stay machine-readable.

use crate::config::ObservabilityConfig;
use std::sync::Once;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Filter directive applied when `RUST_LOG` is unset
pub fn default_directive(observability: &ObservabilityConfig) -> String {
    format!("metricwatch={}", observability.log_level.trim().to_lowercase())
}

/// Install the global tracing subscriber
///
/// Only the first call per process takes effect. `RUST_LOG` wins over the
/// configured level.
///
/// ```no_run
/// use metricwatch::config::ObservabilityConfig;
///
/// metricwatch::telemetry::init(&ObservabilityConfig::default());
/// tracing::info!("Harness started");
/// ```
pub fn init(observability: &ObservabilityConfig) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directive(observability)));

        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_thread_names(true),
            )
            .init();
    });
}
