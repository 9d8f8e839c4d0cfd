// SPDX-License-Identifier: Apache-2.0

//! Receiver lifecycle.
//!
//! One receiver wraps one monitor instance. The receiver store hands the
//! same receiver to every pipeline leg configured against a component ID,
//! so `start` is idempotent: the first call builds and configures the
//! monitor, later calls are no-ops.

use std::sync::Arc;

use opentelemetry_proto::tonic::logs::v1::ResourceLogs;
use opentelemetry_proto::tonic::metrics::v1::ResourceMetrics;
use opentelemetry_proto::tonic::trace::v1::ResourceSpans;
use tracing::info_span;

use crate::host::{ComponentId, Host};
use crate::receivers::otlp_output::OTLPOutput;
use crate::receivers::smartagent::config::ReceiverConfig;
use crate::receivers::smartagent::error::{ShutdownError, StartError};
use crate::receivers::smartagent::filtering::MonitorFiltering;
use crate::receivers::smartagent::monitor::{Monitor, MonitorRegistry};
use crate::receivers::smartagent::output::Output;
use crate::receivers::smartagent::runtime::AgentRuntime;

const COLLECTD_PREFIX: &str = "collectd/";
const SYSTEM_TYPE_DIMENSION: &str = "system.type";

pub struct Receiver {
    id: ComponentId,
    config: Arc<ReceiverConfig>,
    registry: Arc<MonitorRegistry>,
    runtime: Arc<AgentRuntime>,
    monitor: Option<Box<dyn Monitor>>,
    next_metrics: Option<OTLPOutput<ResourceMetrics>>,
    next_logs: Option<OTLPOutput<ResourceLogs>>,
    next_traces: Option<OTLPOutput<ResourceSpans>>,
}

impl Receiver {
    pub fn new(
        id: ComponentId,
        config: Arc<ReceiverConfig>,
        registry: Arc<MonitorRegistry>,
        runtime: Arc<AgentRuntime>,
    ) -> Self {
        Self {
            id,
            config,
            registry,
            runtime,
            monitor: None,
            next_metrics: None,
            next_logs: None,
            next_traces: None,
        }
    }

    pub fn id(&self) -> &ComponentId {
        &self.id
    }

    pub fn register_metrics_consumer(&mut self, next: OTLPOutput<ResourceMetrics>) {
        self.next_metrics = Some(next);
    }

    pub fn register_logs_consumer(&mut self, next: OTLPOutput<ResourceLogs>) {
        self.next_logs = Some(next);
    }

    pub fn register_traces_consumer(&mut self, next: OTLPOutput<ResourceSpans>) {
        self.next_traces = Some(next);
    }

    /// Build, wire and configure the monitor. A second call on an already
    /// started receiver returns Ok without touching the monitor.
    pub fn start(&mut self, host: &Host) -> Result<(), StartError> {
        if self.monitor.is_some() {
            return Ok(());
        }

        self.config
            .validate()
            .map_err(|source| StartError::ConfigValidation {
                id: self.id.to_string(),
                source,
            })?;

        let monitor_type = self.config.monitor.monitor_type.clone();
        let monitor_id = sanitize_monitor_id(&self.id.to_string());
        let _span = info_span!("smartagent", monitor_type, monitor_id).entered();

        self.runtime.redirect_legacy_logs();

        let mut monitor = self.registry.create_monitor(&monitor_type)?;
        let metadata = self.registry.metadata(&monitor_type)?;

        let monitor_extra_metrics = self.registry.config_extra_metrics(&self.config.monitor);
        let filtering = Arc::new(MonitorFiltering::new(
            &self.config.monitor,
            Some(metadata),
            &monitor_extra_metrics,
        )?);

        let mut output = Output::new(
            &self.config,
            &monitor_type,
            &monitor_id,
            filtering,
            self.next_metrics.clone(),
            self.next_logs.clone(),
            self.next_traces.clone(),
            host,
        );

        // Dimensions applied here land on everything the monitor sends.
        for (key, value) in &self.config.monitor.extra_dimensions {
            output.add_extra_dimension(key, value);
        }
        output.add_extra_dimension(SYSTEM_TYPE_DIMENSION, strip_monitor_type_prefix(&monitor_type));

        let agent_config = self.runtime.agent_config(host);
        self.runtime.setup_environment(agent_config);
        if monitor_type.starts_with(COLLECTD_PREFIX) {
            self.runtime.configure_collectd(agent_config)?;
        }

        monitor.set_output(output);
        monitor
            .configure(&self.config.monitor)
            .map_err(|source| StartError::MonitorConfigure {
                monitor_type: monitor_type.clone(),
                source,
            })?;

        self.monitor = Some(monitor);
        Ok(())
    }

    /// Tear the monitor down. Errors if never started or if the monitor has
    /// no shutdown support; repeated shutdowns are the monitor's business.
    pub fn shutdown(&mut self) -> Result<(), ShutdownError> {
        let Some(monitor) = self.monitor.as_mut() else {
            return Err(ShutdownError::NotStarted);
        };

        match monitor.as_shutdownable() {
            Some(shutdownable) => {
                shutdownable.shutdown();
                Ok(())
            }
            None => Err(ShutdownError::NotShutdownable(
                self.config.monitor.monitor_type.clone(),
            )),
        }
    }
}

/// Monitor IDs keep only word characters so they are safe in log fields and
/// collectd instance names: `smartagent/my-monitor` becomes
/// `smartagentmy_monitor`-style identifiers without separators.
fn sanitize_monitor_id(id: &str) -> String {
    id.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

/// `collectd/nginx` reports as system type `nginx`.
fn strip_monitor_type_prefix(monitor_type: &str) -> &str {
    monitor_type
        .split_once('/')
        .map(|(_, rest)| rest)
        .unwrap_or(monitor_type)
}
