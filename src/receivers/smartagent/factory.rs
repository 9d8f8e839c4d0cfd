// SPDX-License-Identifier: Apache-2.0

//! Receiver store.
//!
//! A config struct instance corresponds to one receiver, shared across the
//! metrics/logs/traces pipeline legs configured against it. The store is
//! keyed by the config's allocation, not its contents: two identical
//! configs loaded separately get separate receivers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use opentelemetry_proto::tonic::logs::v1::ResourceLogs;
use opentelemetry_proto::tonic::metrics::v1::ResourceMetrics;
use opentelemetry_proto::tonic::trace::v1::ResourceSpans;

use crate::host::ComponentId;
use crate::receivers::otlp_output::OTLPOutput;
use crate::receivers::smartagent::config::ReceiverConfig;
use crate::receivers::smartagent::error::StartError;
use crate::receivers::smartagent::monitor::MonitorRegistry;
use crate::receivers::smartagent::receiver::Receiver;
use crate::receivers::smartagent::runtime::AgentRuntime;

pub type SharedReceiver = Arc<Mutex<Receiver>>;

pub struct ReceiverFactory {
    registry: Arc<MonitorRegistry>,
    runtime: Arc<AgentRuntime>,
    receivers: Mutex<HashMap<usize, SharedReceiver>>,
}

impl ReceiverFactory {
    pub fn new(registry: Arc<MonitorRegistry>) -> Self {
        Self {
            registry,
            runtime: Arc::new(AgentRuntime::new()),
            receivers: Mutex::new(HashMap::new()),
        }
    }

    pub fn create_metrics_receiver(
        &self,
        id: ComponentId,
        config: &Arc<ReceiverConfig>,
        next: OTLPOutput<ResourceMetrics>,
    ) -> Result<SharedReceiver, StartError> {
        let receiver = self.get_or_create(id, config)?;
        receiver.lock().unwrap().register_metrics_consumer(next);
        Ok(receiver)
    }

    pub fn create_logs_receiver(
        &self,
        id: ComponentId,
        config: &Arc<ReceiverConfig>,
        next: OTLPOutput<ResourceLogs>,
    ) -> Result<SharedReceiver, StartError> {
        let receiver = self.get_or_create(id, config)?;
        receiver.lock().unwrap().register_logs_consumer(next);
        Ok(receiver)
    }

    pub fn create_traces_receiver(
        &self,
        id: ComponentId,
        config: &Arc<ReceiverConfig>,
        next: OTLPOutput<ResourceSpans>,
    ) -> Result<SharedReceiver, StartError> {
        let receiver = self.get_or_create(id, config)?;
        receiver.lock().unwrap().register_traces_consumer(next);
        Ok(receiver)
    }

    /// Look up or build the receiver for this config instance. Validation
    /// runs before the lookup and a failed config never occupies a slot.
    fn get_or_create(
        &self,
        id: ComponentId,
        config: &Arc<ReceiverConfig>,
    ) -> Result<SharedReceiver, StartError> {
        config
            .validate()
            .map_err(|source| StartError::ConfigValidation {
                id: id.to_string(),
                source,
            })?;

        let key = Arc::as_ptr(config) as usize;
        let mut store = self.receivers.lock().unwrap();
        let receiver = store.entry(key).or_insert_with(|| {
            Arc::new(Mutex::new(Receiver::new(
                id,
                config.clone(),
                self.registry.clone(),
                self.runtime.clone(),
            )))
        });
        Ok(receiver.clone())
    }
}
