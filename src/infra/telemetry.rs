use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
///
/// Log lines go to stderr so that command output on stdout stays machine-readable.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "netfeed_cache_hit_total",
            Unit::Count,
            "Total number of fetches served from a fresh cached page."
        );
        describe_counter!(
            "netfeed_cache_miss_total",
            Unit::Count,
            "Total number of fetches that had to wait for the network."
        );
        describe_counter!(
            "netfeed_cache_stale_discard_total",
            Unit::Count,
            "Total number of fetch results dropped because a newer one was already applied."
        );
        describe_counter!(
            "netfeed_mutation_total",
            Unit::Count,
            "Total number of mutations confirmed by the server."
        );
        describe_counter!(
            "netfeed_mutation_failed_total",
            Unit::Count,
            "Total number of mutations rejected locally or by the server."
        );
    });
}
