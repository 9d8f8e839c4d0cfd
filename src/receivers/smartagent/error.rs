// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;
use tower::BoxError;

/// User configuration problems, surfaced before a receiver ever starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("monitor type cannot be empty")]
    MissingMonitorType,

    #[error("intervalSeconds must be greater than 0, got {0}")]
    InvalidInterval(u64),

    #[error("datapointsToExclude filters cannot be negated")]
    NegatedExcludeFilter,

    #[error("unable to construct filter with item {item:?}: {source}")]
    InvalidFilterItem {
        item: String,
        source: regex::Error,
    },

    #[error("an exclude filter entry must specify at least one metric name or dimension")]
    EmptyFilterEntry,

    #[error("metric name cannot be empty")]
    EmptyMetricName,

    #[error("group cannot be empty")]
    EmptyGroupName,
}

/// Failures during `start`. Configuration errors are user-facing; a missing
/// metadata registration is an agent bug and is worded as such.
#[derive(Debug, Error)]
pub enum StartError {
    #[error("config validation failed for {id:?}: {source}")]
    ConfigValidation {
        id: String,
        #[source]
        source: ConfigError,
    },

    #[error("unable to find monitor factory for {0:?}")]
    UnknownMonitorType(String),

    #[error("could not find monitor metadata of type {0}; this is an agent registration bug, not a configuration problem")]
    MissingMonitorMetadata(String),

    #[error("unable to construct datapoint filters: {0}")]
    FilterConstruction(#[from] ConfigError),

    #[error("failed configuring monitor {monitor_type:?}: {source}")]
    MonitorConfigure {
        monitor_type: String,
        #[source]
        source: BoxError,
    },

    #[error("failed configuring collectd: {0}")]
    Collectd(String),
}

#[derive(Debug, Error)]
pub enum ShutdownError {
    #[error("shutdown called before start or with invalid monitor state")]
    NotStarted,

    #[error("monitor does not support shutdown: {0}")]
    NotShutdownable(String),
}

/// Structural problems converting legacy spans; anything here aborts the
/// whole send rather than silently dropping.
#[derive(Debug, Error)]
pub enum TraceConversionError {
    #[error("invalid trace id {0:?}: must be 16 or 32 hex characters")]
    InvalidTraceId(String),

    #[error("invalid span id {0:?}: must be 16 hex characters")]
    InvalidSpanId(String),
}
