// SPDX-License-Identifier: Apache-2.0

//! Per-monitor metric filtering.
//!
//! Builds the exclusion chain for a monitor instance out of its static
//! metadata catalog and user overrides (`extraMetrics`, `extraGroups`,
//! `datapointsToExclude`), then answers the hot-path question "should this
//! datapoint be dropped".

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use tracing::warn;

use super::config::MonitorConfig;
use super::datapoint::Datapoint;
use super::dpfilters::{DatapointFilter, ExcludeFilter, FilterSet, StringFilter};
use super::error::ConfigError;
use super::metadata::MonitorMetadata;

/// The "included metrics" half of the chain: default metrics plus whatever
/// the user opted into. Folded into the exclusion chain negated.
#[derive(Debug)]
pub struct ExtraMetricsFilter {
    metadata: Arc<MonitorMetadata>,
    /// Known metrics resolved from `extraMetrics`/`extraGroups`.
    extra_metrics: HashSet<String>,
    /// Pattern matcher over the same items, for metrics absent from the
    /// catalog.
    string_filter: StringFilter,
}

impl ExtraMetricsFilter {
    pub fn new(
        metadata: Arc<MonitorMetadata>,
        extra_metrics: &[String],
        extra_groups: &[String],
    ) -> Result<Self, ConfigError> {
        let mut filter_items: Vec<String> = Vec::new();

        for metric in extra_metrics {
            validate_metric_name(&metadata, metric)?;

            // Already a default metric, nothing to add.
            if !metadata.has_default_metric(metric) {
                filter_items.push(metric.clone());
            }
        }

        for group in extra_groups {
            filter_items.extend(validate_group(&metadata, group)?);
        }

        let string_filter = StringFilter::new(&filter_items)?;

        // Precompute the known metrics that match. Metrics outside the
        // catalog still hit the pattern matcher at send time.
        let extra_metrics = metadata
            .metrics
            .keys()
            .filter(|metric| string_filter.matches(metric))
            .cloned()
            .collect();

        Ok(Self {
            metadata,
            extra_metrics,
            string_filter,
        })
    }

    /// True when the datapoint is in the allowed/included set.
    pub fn matches(&self, dp: &Datapoint) -> bool {
        if self.metadata.metrics.is_empty() {
            // No defined metrics, send everything by default.
            return true;
        }

        if !self.metadata.has_metric(&dp.metric) && self.metadata.send_unknown {
            return true;
        }

        if self.metadata.has_default_metric(&dp.metric) {
            return true;
        }

        if self.extra_metrics.contains(&dp.metric) {
            return true;
        }

        // Known metrics were matched above; this catches unknown metrics
        // the user requested by pattern.
        self.string_filter.matches(&dp.metric)
    }
}

fn validate_metric_name(metadata: &MonitorMetadata, metric: &str) -> Result<(), ConfigError> {
    if metric.trim().is_empty() {
        return Err(ConfigError::EmptyMetricName);
    }

    if metadata.send_unknown {
        // The metrics list isn't exhaustive so no further validation applies.
        return Ok(());
    }

    if metric.contains('*') {
        let pattern = StringFilter::new(&[metric])?;
        if !metadata.metrics.keys().any(|known| pattern.matches(known)) {
            warn!(
                monitor_type = metadata.monitor_type,
                metric,
                "extraMetrics: metric pattern did not match any available metrics"
            );
        }
        return Ok(());
    }

    if !metadata.has_metric(metric) {
        warn!(
            monitor_type = metadata.monitor_type,
            metric, "extraMetrics: metric does not exist for monitor"
        );
    }

    Ok(())
}

fn validate_group(metadata: &MonitorMetadata, group: &str) -> Result<Vec<String>, ConfigError> {
    if group.trim().is_empty() {
        return Err(ConfigError::EmptyGroupName);
    }

    match metadata.group_metrics.get(group) {
        Some(metrics) => Ok(metrics.clone()),
        None => {
            warn!(
                monitor_type = metadata.monitor_type,
                group, "extraGroups: group does not exist for monitor"
            );
            Ok(Vec::new())
        }
    }
}

fn build_filter_set(
    metadata: Option<&Arc<MonitorMetadata>>,
    config: &MonitorConfig,
    monitor_extra_metrics: &[String],
) -> Result<FilterSet, ConfigError> {
    let mut exclude_filters: Vec<DatapointFilter> = Vec::new();

    // If sendAll is set or the catalog is empty there is no inclusion
    // restriction to build.
    if let Some(metadata) = metadata {
        if !metadata.metrics.is_empty() && !metadata.send_all {
            let mut extra_metrics = config.extra_metrics.clone();
            extra_metrics.extend_from_slice(monitor_extra_metrics);

            let included =
                ExtraMetricsFilter::new(metadata.clone(), &extra_metrics, &config.extra_groups)?;
            exclude_filters.push(DatapointFilter::NegatedInclude(included));
        }
    }

    for entry in &config.datapoints_to_exclude {
        exclude_filters.push(DatapointFilter::ExplicitExclude(ExcludeFilter::from_config(
            entry,
        )?));
    }

    Ok(FilterSet::new(exclude_filters))
}

/// Filtering state for one monitor instance, shared between the receiver
/// and every copy of its Output.
#[derive(Debug)]
pub struct MonitorFiltering {
    filter_set: RwLock<FilterSet>,
    metadata: Option<Arc<MonitorMetadata>>,
    has_extra_metrics: bool,
}

impl MonitorFiltering {
    pub fn new(
        config: &MonitorConfig,
        metadata: Option<Arc<MonitorMetadata>>,
        monitor_extra_metrics: &[String],
    ) -> Result<Self, ConfigError> {
        let filter_set = build_filter_set(metadata.as_ref(), config, monitor_extra_metrics)?;

        Ok(Self {
            filter_set: RwLock::new(filter_set),
            metadata,
            has_extra_metrics: !config.extra_metrics.is_empty() || !config.extra_groups.is_empty(),
        })
    }

    /// True means the datapoint is excluded.
    pub fn matches(&self, dp: &Datapoint) -> bool {
        self.filter_set
            .read()
            .map(|set| set.matches(dp))
            .unwrap_or(false)
    }

    /// Append an exclusion filter. Add all filters before the monitor starts
    /// emitting; filters added mid-stream apply only to later sends.
    pub fn add_datapoint_exclusion_filter(&self, filter: DatapointFilter) {
        if let Ok(mut set) = self.filter_set.write() {
            set.push(filter);
        }
    }

    /// Metric names from the catalog that would currently pass the chain.
    /// Diagnostic use only; not the send path.
    pub fn enabled_metrics(&self) -> Vec<String> {
        let Some(metadata) = &self.metadata else {
            return Vec::new();
        };

        let mut probe = Datapoint::default();
        let mut enabled: Vec<String> = metadata
            .metrics
            .keys()
            .filter(|metric| {
                probe.metric.clone_from(metric);
                !self.matches(&probe)
            })
            .cloned()
            .collect();
        enabled.sort();
        enabled
    }

    pub fn has_enabled_metric_in_group(&self, group: &str) -> bool {
        let Some(metadata) = &self.metadata else {
            return false;
        };

        self.enabled_metrics()
            .iter()
            .any(|metric| {
                metadata
                    .metrics
                    .get(metric)
                    .is_some_and(|info| info.group == group)
            })
    }

    pub fn has_any_extra_metrics(&self) -> bool {
        self.has_extra_metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::receivers::smartagent::datapoint::DatapointValue;
    use crate::receivers::smartagent::metadata::{MetricInfo, MetricKind};
    use std::collections::HashMap;

    fn metadata() -> Arc<MonitorMetadata> {
        let mut metrics = HashMap::new();
        for (name, group) in [
            ("cpu.utilization", "utilization"),
            ("cpu.idle", "utilization"),
            ("cpu.min", "extremes"),
            ("cpu.max", "extremes"),
        ] {
            metrics.insert(
                name.to_string(),
                MetricInfo {
                    kind: MetricKind::Gauge,
                    group: group.to_string(),
                },
            );
        }

        let mut group_metrics = HashMap::new();
        group_metrics.insert(
            "utilization".to_string(),
            vec!["cpu.utilization".to_string(), "cpu.idle".to_string()],
        );
        group_metrics.insert(
            "extremes".to_string(),
            vec!["cpu.min".to_string(), "cpu.max".to_string()],
        );

        Arc::new(MonitorMetadata {
            monitor_type: "cpu".to_string(),
            metrics,
            default_metrics: ["cpu.utilization".to_string()].into_iter().collect(),
            groups: ["utilization".to_string(), "extremes".to_string()]
                .into_iter()
                .collect(),
            group_metrics,
            send_all: false,
            send_unknown: false,
        })
    }

    fn config(json: &str) -> MonitorConfig {
        serde_json::from_str(json).unwrap()
    }

    fn dp(metric: &str) -> Datapoint {
        Datapoint::gauge(metric, DatapointValue::Float(0.5))
    }

    #[test]
    fn default_metrics_pass_others_drop() {
        let filtering =
            MonitorFiltering::new(&config(r#"{"type":"cpu","intervalSeconds":10}"#), Some(metadata()), &[])
                .unwrap();

        assert!(!filtering.matches(&dp("cpu.utilization")));
        assert!(filtering.matches(&dp("cpu.idle")));
        assert!(filtering.matches(&dp("cpu.min")));
    }

    #[test]
    fn extra_metrics_enable_non_defaults() {
        let filtering = MonitorFiltering::new(
            &config(r#"{"type":"cpu","intervalSeconds":10,"extraMetrics":["cpu.idle"]}"#),
            Some(metadata()),
            &[],
        )
        .unwrap();

        assert!(!filtering.matches(&dp("cpu.idle")));
        assert!(filtering.matches(&dp("cpu.min")));
        assert!(filtering.has_any_extra_metrics());
    }

    #[test]
    fn extra_groups_enable_members() {
        let filtering = MonitorFiltering::new(
            &config(r#"{"type":"cpu","intervalSeconds":10,"extraGroups":["extremes"]}"#),
            Some(metadata()),
            &[],
        )
        .unwrap();

        assert!(!filtering.matches(&dp("cpu.min")));
        assert!(!filtering.matches(&dp("cpu.max")));
        assert!(filtering.matches(&dp("cpu.idle")));
    }

    #[test]
    fn monitor_contributed_extras_enable_metrics() {
        let filtering = MonitorFiltering::new(
            &config(r#"{"type":"cpu","intervalSeconds":10}"#),
            Some(metadata()),
            &["cpu.max".to_string()],
        )
        .unwrap();

        assert!(!filtering.matches(&dp("cpu.max")));
        // config carried no extras, only the monitor did
        assert!(!filtering.has_any_extra_metrics());
    }

    #[test]
    fn send_all_disables_inclusion_filtering() {
        let mut md = metadata().as_ref().clone();
        md.send_all = true;
        let filtering = MonitorFiltering::new(
            &config(r#"{"type":"cpu","intervalSeconds":10}"#),
            Some(Arc::new(md)),
            &[],
        )
        .unwrap();

        assert!(!filtering.matches(&dp("cpu.idle")));
        assert!(!filtering.matches(&dp("anything.else")));
    }

    #[test]
    fn send_all_does_not_override_explicit_excludes() {
        let mut md = metadata().as_ref().clone();
        md.send_all = true;
        let filtering = MonitorFiltering::new(
            &config(
                r#"{"type":"cpu","intervalSeconds":10,
                    "datapointsToExclude":[{"metricName":"cpu.idle"}]}"#,
            ),
            Some(Arc::new(md)),
            &[],
        )
        .unwrap();

        assert!(filtering.matches(&dp("cpu.idle")));
        assert!(!filtering.matches(&dp("cpu.utilization")));
    }

    #[test]
    fn empty_catalog_passes_everything() {
        let md = Arc::new(MonitorMetadata {
            monitor_type: "custom".to_string(),
            ..Default::default()
        });
        let filtering =
            MonitorFiltering::new(&config(r#"{"type":"custom","intervalSeconds":10}"#), Some(md), &[])
                .unwrap();

        assert!(!filtering.matches(&dp("whatever")));
    }

    #[test]
    fn send_unknown_passes_uncataloged_metrics() {
        let mut md = metadata().as_ref().clone();
        md.send_unknown = true;
        let filtering = MonitorFiltering::new(
            &config(r#"{"type":"cpu","intervalSeconds":10}"#),
            Some(Arc::new(md)),
            &[],
        )
        .unwrap();

        assert!(!filtering.matches(&dp("not.in.catalog")));
        // known non-default metrics still drop
        assert!(filtering.matches(&dp("cpu.idle")));
    }

    #[test]
    fn extra_metric_glob() {
        let filtering = MonitorFiltering::new(
            &config(r#"{"type":"cpu","intervalSeconds":10,"extraMetrics":["cpu.m*"]}"#),
            Some(metadata()),
            &[],
        )
        .unwrap();

        assert!(!filtering.matches(&dp("cpu.min")));
        assert!(!filtering.matches(&dp("cpu.max")));
        assert!(filtering.matches(&dp("cpu.idle")));
    }

    #[test]
    fn whitespace_extra_metric_is_error() {
        let err = MonitorFiltering::new(
            &config(r#"{"type":"cpu","intervalSeconds":10,"extraMetrics":["  "]}"#),
            Some(metadata()),
            &[],
        );
        assert!(matches!(err, Err(ConfigError::EmptyMetricName)));
    }

    #[test]
    fn whitespace_extra_group_is_error() {
        let err = MonitorFiltering::new(
            &config(r#"{"type":"cpu","intervalSeconds":10,"extraGroups":[" "]}"#),
            Some(metadata()),
            &[],
        );
        assert!(matches!(err, Err(ConfigError::EmptyGroupName)));
    }

    #[test]
    fn unknown_extra_metric_is_warning_not_error() {
        let filtering = MonitorFiltering::new(
            &config(r#"{"type":"cpu","intervalSeconds":10,"extraMetrics":["no.such.metric"]}"#),
            Some(metadata()),
            &[],
        );
        assert!(filtering.is_ok());
    }

    #[test]
    fn unknown_extra_group_is_warning_not_error() {
        let filtering = MonitorFiltering::new(
            &config(r#"{"type":"cpu","intervalSeconds":10,"extraGroups":["no_such_group"]}"#),
            Some(metadata()),
            &[],
        );
        assert!(filtering.is_ok());
    }

    #[test]
    fn enabled_metrics_reports_current_state() {
        let filtering = MonitorFiltering::new(
            &config(r#"{"type":"cpu","intervalSeconds":10,"extraMetrics":["cpu.idle"]}"#),
            Some(metadata()),
            &[],
        )
        .unwrap();

        assert_eq!(
            vec!["cpu.idle".to_string(), "cpu.utilization".to_string()],
            filtering.enabled_metrics()
        );
        assert!(filtering.has_enabled_metric_in_group("utilization"));
        assert!(!filtering.has_enabled_metric_in_group("extremes"));
    }

    #[test]
    fn added_exclusion_filters_apply() {
        let filtering =
            MonitorFiltering::new(&config(r#"{"type":"cpu","intervalSeconds":10}"#), Some(metadata()), &[])
                .unwrap();
        assert!(!filtering.matches(&dp("cpu.utilization")));

        filtering.add_datapoint_exclusion_filter(DatapointFilter::ExplicitExclude(
            ExcludeFilter::from_config(
                &serde_json::from_str(r#"{"metricName":"cpu.utilization"}"#).unwrap(),
            )
            .unwrap(),
        ));
        assert!(filtering.matches(&dp("cpu.utilization")));
    }

    #[test]
    fn no_metadata_means_no_inclusion_restriction() {
        let filtering = MonitorFiltering::new(
            &config(
                r#"{"type":"x","intervalSeconds":10,
                    "datapointsToExclude":[{"metricName":"drop.me"}]}"#,
            ),
            None,
            &[],
        )
        .unwrap();

        assert!(!filtering.matches(&dp("anything")));
        assert!(filtering.matches(&dp("drop.me")));
        assert!(filtering.enabled_metrics().is_empty());
        assert!(!filtering.has_enabled_metric_in_group("g"));
    }
}
