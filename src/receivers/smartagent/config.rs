// SPDX-License-Identifier: Apache-2.0

//! Receiver configuration.
//!
//! Field names mirror the legacy agent's YAML keys (camelCase). The structs
//! arrive pre-deserialized from the surrounding service's config loader; the
//! `validate` methods here are the receiver's own gate and run before a
//! config is admitted to the receiver store.

use std::collections::HashMap;

use serde::Deserialize;

use super::error::ConfigError;

/// The monitor-facing portion of a receiver config, handed to the monitor's
/// `configure` unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MonitorConfig {
    /// Monitor type, e.g. `collectd/nginx`.
    #[serde(rename = "type")]
    pub monitor_type: String,
    /// Reporting interval in seconds; must be nonzero.
    pub interval_seconds: u64,
    /// Dimensions stamped onto every emitted datapoint.
    pub extra_dimensions: HashMap<String, String>,
    /// Non-default metrics to allow through, literal or glob.
    pub extra_metrics: Vec<String>,
    /// Metric groups to allow through wholesale.
    pub extra_groups: Vec<String>,
    /// Subtractive filters applied right before datapoints are sent.
    pub datapoints_to_exclude: Vec<MetricFilterConfig>,
    /// Monitor-specific settings, passed through opaquely.
    #[serde(flatten)]
    pub settings: HashMap<String, serde_json::Value>,
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.monitor_type.trim().is_empty() {
            return Err(ConfigError::MissingMonitorType);
        }
        if self.interval_seconds == 0 {
            return Err(ConfigError::InvalidInterval(self.interval_seconds));
        }
        for filter in &self.datapoints_to_exclude {
            filter.validate()?;
        }
        Ok(())
    }
}

/// Full receiver config: the monitor config plus receiver-level routing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReceiverConfig {
    #[serde(flatten)]
    pub monitor: MonitorConfig,
    /// Names of metrics exporters to route dimension updates to. `None`
    /// (absent) selects the default resolution; an empty list disables
    /// dimension updates outright.
    pub dimension_clients: Option<Vec<String>>,
}

impl ReceiverConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.monitor.validate()
    }
}

/// One `datapointsToExclude` entry: a metric-name/dimension predicate.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MetricFilterConfig {
    /// A single metric name pattern; merged into `metric_names`.
    pub metric_name: Option<String>,
    pub metric_names: Vec<String>,
    /// Dimension key to value pattern(s); all keys must match a datapoint
    /// for the filter to match.
    pub dimensions: HashMap<String, DimensionValues>,
    /// Legacy include-style negation; rejected on these filters.
    pub negated: bool,
}

impl MetricFilterConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.negated {
            return Err(ConfigError::NegatedExcludeFilter);
        }
        Ok(())
    }

    /// Singular `metricName` folded into the `metricNames` list.
    pub fn normalized_metric_names(&self) -> Vec<String> {
        let mut names = self.metric_names.clone();
        if let Some(name) = &self.metric_name {
            if !name.is_empty() {
                names.push(name.clone());
            }
        }
        names
    }
}

/// A dimension pattern may be written as a single string or a list.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum DimensionValues {
    Single(String),
    Multiple(Vec<String>),
}

impl DimensionValues {
    pub fn as_slice(&self) -> Vec<String> {
        match self {
            DimensionValues::Single(v) => vec![v.clone()],
            DimensionValues::Multiple(vs) => vs.clone(),
        }
    }
}
