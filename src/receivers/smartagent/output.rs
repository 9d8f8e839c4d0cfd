// SPDX-License-Identifier: Apache-2.0

//! The façade handed to monitors. A monitor reports everything it collects
//! through its Output; the Output filters, converts, and forwards into the
//! pipeline channels. Sends are fire and forget, the monitor has no way to
//! observe downstream failures beyond the collector log.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use opentelemetry_proto::tonic::logs::v1::ResourceLogs;
use opentelemetry_proto::tonic::metrics::v1::ResourceMetrics;
use opentelemetry_proto::tonic::trace::v1::ResourceSpans;
use tracing::{debug, error, warn};

use crate::host::{ComponentId, Exporter, Host, SignalType};
use crate::receivers::otlp_output::OTLPOutput;
use crate::receivers::smartagent::config::ReceiverConfig;
use crate::receivers::smartagent::converter::{
    datapoints_to_resource_metrics, dimension_to_metadata_update, event_to_resource_logs,
    spans_to_resource_spans,
};
use crate::receivers::smartagent::datapoint::{Datapoint, Dimension, Event, Span};
use crate::receivers::smartagent::dpfilters::DatapointFilter;
use crate::receivers::smartagent::filtering::MonitorFiltering;

const SIGNALFX_EXPORTER_TYPE: &str = "signalfx";

/// Per-monitor-instance output. Cloning yields an independent copy: the
/// dimension/tag maps are deep-copied so a spawned sub-monitor can mutate
/// its own, while the filtering engine stays shared.
#[derive(Clone)]
pub struct Output {
    monitor_type: String,
    monitor_id: String,
    next_metrics: Option<OTLPOutput<ResourceMetrics>>,
    next_logs: Option<OTLPOutput<ResourceLogs>>,
    next_traces: Option<OTLPOutput<ResourceSpans>>,
    dimension_clients: Vec<(ComponentId, Arc<dyn Exporter>)>,
    filtering: Arc<MonitorFiltering>,
    extra_dimensions: HashMap<String, String>,
    extra_span_tags: HashMap<String, String>,
    default_span_tags: HashMap<String, String>,
}

impl Output {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: &ReceiverConfig,
        monitor_type: &str,
        monitor_id: &str,
        filtering: Arc<MonitorFiltering>,
        next_metrics: Option<OTLPOutput<ResourceMetrics>>,
        next_logs: Option<OTLPOutput<ResourceLogs>>,
        next_traces: Option<OTLPOutput<ResourceSpans>>,
        host: &Host,
    ) -> Self {
        Self {
            monitor_type: monitor_type.to_string(),
            monitor_id: monitor_id.to_string(),
            next_metrics,
            next_logs,
            next_traces,
            dimension_clients: resolve_dimension_clients(config, host),
            filtering,
            extra_dimensions: HashMap::new(),
            extra_span_tags: HashMap::new(),
            default_span_tags: HashMap::new(),
        }
    }

    /// Filter, convert and forward a batch of datapoints. No-op without a
    /// metrics pipeline.
    pub async fn send_datapoints(&self, datapoints: Vec<Datapoint>) {
        let Some(next) = &self.next_metrics else {
            return;
        };
        if let Some(rm) = self.prepare_metrics(datapoints) {
            if let Err(err) = next.send(vec![rm]).await {
                error!(
                    monitor_id = self.monitor_id,
                    %err,
                    "failed to forward metrics"
                );
            }
        }
    }

    /// Blocking variant for monitors running on their own threads.
    pub fn send_datapoints_blocking(&self, datapoints: Vec<Datapoint>) {
        let Some(next) = &self.next_metrics else {
            return;
        };
        if let Some(rm) = self.prepare_metrics(datapoints) {
            if let Err(err) = next.send_blocking(vec![rm]) {
                error!(
                    monitor_id = self.monitor_id,
                    %err,
                    "failed to forward metrics"
                );
            }
        }
    }

    /// Convert and forward an event. No-op without a logs pipeline.
    pub async fn send_event(&self, event: Event) {
        let Some(next) = &self.next_logs else {
            return;
        };
        if let Err(err) = next.send(vec![event_to_resource_logs(&event)]).await {
            debug!(monitor_id = self.monitor_id, %err, "failed to forward event");
        }
    }

    pub fn send_event_blocking(&self, event: Event) {
        let Some(next) = &self.next_logs else {
            return;
        };
        if let Err(err) = next.send_blocking(vec![event_to_resource_logs(&event)]) {
            debug!(monitor_id = self.monitor_id, %err, "failed to forward event");
        }
    }

    /// Apply span tag defaults/overrides, convert and forward. No-op without
    /// a traces pipeline.
    pub async fn send_spans(&self, spans: Vec<Span>) {
        let Some(next) = &self.next_traces else {
            return;
        };
        if let Some(rs) = self.prepare_spans(spans) {
            if let Err(err) = next.send(rs).await {
                debug!(monitor_id = self.monitor_id, %err, "failed to forward spans");
            }
        }
    }

    pub fn send_spans_blocking(&self, spans: Vec<Span>) {
        let Some(next) = &self.next_traces else {
            return;
        };
        if let Some(rs) = self.prepare_spans(spans) {
            if let Err(err) = next.send_blocking(rs) {
                debug!(monitor_id = self.monitor_id, %err, "failed to forward spans");
            }
        }
    }

    /// Fan a dimension update out to each resolved metadata-capable
    /// exporter. No-op when none resolved.
    pub fn send_dimension_update(&self, dimension: Dimension) {
        if self.dimension_clients.is_empty() {
            return;
        }

        let update = dimension_to_metadata_update(&dimension);
        for (id, exporter) in &self.dimension_clients {
            let Some(metadata_exporter) = exporter.as_metadata_exporter() else {
                continue;
            };
            if let Err(err) = metadata_exporter.consume_metadata(std::slice::from_ref(&update)) {
                debug!(
                    monitor_id = self.monitor_id,
                    exporter = %id,
                    %err,
                    "failed to forward dimension update"
                );
            }
        }
    }

    fn prepare_metrics(&self, mut datapoints: Vec<Datapoint>) -> Option<ResourceMetrics> {
        datapoints.retain(|dp| !self.filtering.matches(dp));

        // Output-level dimensions override what the monitor set.
        for dp in &mut datapoints {
            for (key, value) in &self.extra_dimensions {
                dp.dimensions.insert(key.clone(), value.clone());
            }
        }

        let (rm, dropped) = datapoints_to_resource_metrics(&datapoints, Utc::now());
        if dropped > 0 {
            warn!(
                monitor_id = self.monitor_id,
                dropped, "dropped datapoints during conversion"
            );
        }

        if rm.scope_metrics.iter().all(|sm| sm.metrics.is_empty()) {
            return None;
        }
        Some(rm)
    }

    fn prepare_spans(&self, mut spans: Vec<Span>) -> Option<Vec<ResourceSpans>> {
        for span in &mut spans {
            // Defaults fill gaps, extras always win.
            for (key, value) in &self.default_span_tags {
                span.tags
                    .entry(key.clone())
                    .or_insert_with(|| value.clone());
            }
            for (key, value) in &self.extra_span_tags {
                span.tags.insert(key.clone(), value.clone());
            }
        }

        match spans_to_resource_spans(&spans) {
            Ok(rs) if rs.is_empty() => None,
            Ok(rs) => Some(rs),
            Err(err) => {
                debug!(monitor_id = self.monitor_id, %err, "failed to convert spans");
                None
            }
        }
    }

    pub fn add_extra_dimension(&mut self, key: &str, value: &str) {
        self.extra_dimensions
            .insert(key.to_string(), value.to_string());
    }

    pub fn remove_extra_dimension(&mut self, key: &str) {
        self.extra_dimensions.remove(key);
    }

    pub fn add_extra_span_tag(&mut self, key: &str, value: &str) {
        self.extra_span_tags
            .insert(key.to_string(), value.to_string());
    }

    pub fn remove_extra_span_tag(&mut self, key: &str) {
        self.extra_span_tags.remove(key);
    }

    pub fn add_default_span_tag(&mut self, key: &str, value: &str) {
        self.default_span_tags
            .insert(key.to_string(), value.to_string());
    }

    pub fn remove_default_span_tag(&mut self, key: &str) {
        self.default_span_tags.remove(key);
    }

    pub fn add_datapoint_exclusion_filter(&self, filter: DatapointFilter) {
        self.filtering.add_datapoint_exclusion_filter(filter);
    }

    pub fn enabled_metrics(&self) -> Vec<String> {
        self.filtering.enabled_metrics()
    }

    pub fn has_enabled_metric_in_group(&self, group: &str) -> bool {
        self.filtering.has_enabled_metric_in_group(group)
    }

    pub fn has_any_extra_metrics(&self) -> bool {
        self.filtering.has_any_extra_metrics()
    }

    pub fn monitor_type(&self) -> &str {
        &self.monitor_type
    }

    pub fn monitor_id(&self) -> &str {
        &self.monitor_id
    }

    #[cfg(test)]
    pub(crate) fn extra_dimensions(&self) -> &HashMap<String, String> {
        &self.extra_dimensions
    }
}

/// Pick the exporters that receive dimension updates. Explicit names are
/// matched against the host's metrics exporters; without any, a lone
/// signalfx exporter is used, and two or more mean none (guessing between
/// them would route metadata to the wrong backend).
fn resolve_dimension_clients(
    config: &ReceiverConfig,
    host: &Host,
) -> Vec<(ComponentId, Arc<dyn Exporter>)> {
    match &config.dimension_clients {
        Some(names) => {
            let mut clients = Vec::new();
            for name in names {
                let found = host.exporters(SignalType::Metrics).find(|(id, exporter)| {
                    id.to_string() == *name && exporter.as_metadata_exporter().is_some()
                });
                match found {
                    Some((id, exporter)) => clients.push((id.clone(), exporter.clone())),
                    None => warn!(
                        client = name,
                        "dimensionClients entry matched no metadata-capable metrics exporter"
                    ),
                }
            }
            clients
        }
        None => {
            let mut candidates: Vec<_> = host
                .exporters(SignalType::Metrics)
                .filter(|(_, exporter)| {
                    exporter.exporter_type() == SIGNALFX_EXPORTER_TYPE
                        && exporter.as_metadata_exporter().is_some()
                })
                .map(|(id, exporter)| (id.clone(), exporter.clone()))
                .collect();
            if candidates.len() == 1 {
                candidates
            } else {
                if candidates.len() > 1 {
                    debug!("multiple signalfx exporters found, not sending dimension updates");
                }
                Vec::new()
            }
        }
    }
}
