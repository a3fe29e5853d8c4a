use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::application::compile::{
    METRIC_COMPILE_FAILURES, METRIC_COMPILE_INFLIGHT, METRIC_COMPILE_MS, METRIC_COMPILE_TOTAL,
    METRIC_WORKSPACE_CLEANUP_FAILURES,
};
use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
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
            METRIC_COMPILE_TOTAL,
            Unit::Count,
            "Total number of compile calls, labelled by flavor."
        );
        describe_counter!(
            METRIC_COMPILE_FAILURES,
            Unit::Count,
            "Total number of failed compile calls, labelled by flavor and reason."
        );
        describe_histogram!(
            METRIC_COMPILE_MS,
            Unit::Milliseconds,
            "Compile call latency in milliseconds, including workspace setup."
        );
        describe_gauge!(
            METRIC_COMPILE_INFLIGHT,
            Unit::Count,
            "Compiler processes currently running."
        );
        describe_counter!(
            METRIC_WORKSPACE_CLEANUP_FAILURES,
            Unit::Count,
            "Total number of compile workspaces that could not be removed."
        );
    });
}
