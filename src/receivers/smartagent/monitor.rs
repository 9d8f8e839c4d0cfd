// SPDX-License-Identifier: Apache-2.0

//! Monitor abstraction and the registry the receiver resolves types from.

use std::collections::HashMap;
use std::sync::Arc;

use tower::BoxError;

use super::config::MonitorConfig;
use super::error::StartError;
use super::metadata::MonitorMetadata;
use super::output::Output;

/// A single data-collecting plugin. The receiver hands it an [`Output`]
/// first, then configures it, which starts collection.
pub trait Monitor: Send {
    /// Called exactly once, before [`Monitor::configure`].
    fn set_output(&mut self, output: Output);

    /// Apply config and begin collecting. Errors abort receiver start.
    fn configure(&mut self, config: &MonitorConfig) -> Result<(), BoxError>;

    /// Monitors that hold resources to release return themselves here.
    fn as_shutdownable(&mut self) -> Option<&mut dyn Shutdownable> {
        None
    }
}

pub trait Shutdownable {
    fn shutdown(&mut self);
}

pub type MonitorFactory = Box<dyn Fn() -> Box<dyn Monitor> + Send + Sync>;

/// Hook for monitor types whose settings imply additional enabled metrics
/// beyond the config's explicit `extraMetrics` list.
pub type ConfigExtraMetrics = fn(&MonitorConfig) -> Vec<String>;

/// Monitor types known to this process. Passed to each receiver instead of
/// being process-global so tests and embedders can scope registrations.
#[derive(Default)]
pub struct MonitorRegistry {
    factories: HashMap<String, MonitorFactory>,
    metadata: HashMap<String, Arc<MonitorMetadata>>,
    config_extra_metrics: HashMap<String, ConfigExtraMetrics>,
}

impl MonitorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, metadata: MonitorMetadata, factory: F)
    where
        F: Fn() -> Box<dyn Monitor> + Send + Sync + 'static,
    {
        let monitor_type = metadata.monitor_type.clone();
        self.metadata.insert(monitor_type.clone(), Arc::new(metadata));
        self.factories.insert(monitor_type, Box::new(factory));
    }

    pub fn register_config_extra_metrics(&mut self, monitor_type: &str, hook: ConfigExtraMetrics) {
        self.config_extra_metrics
            .insert(monitor_type.to_string(), hook);
    }

    pub fn is_registered(&self, monitor_type: &str) -> bool {
        self.factories.contains_key(monitor_type)
    }

    pub fn create_monitor(&self, monitor_type: &str) -> Result<Box<dyn Monitor>, StartError> {
        match self.factories.get(monitor_type) {
            Some(factory) => Ok(factory()),
            None => Err(StartError::UnknownMonitorType(monitor_type.to_string())),
        }
    }

    pub fn metadata(&self, monitor_type: &str) -> Result<Arc<MonitorMetadata>, StartError> {
        self.metadata
            .get(monitor_type)
            .cloned()
            .ok_or_else(|| StartError::MissingMonitorMetadata(monitor_type.to_string()))
    }

    pub fn config_extra_metrics(&self, config: &MonitorConfig) -> Vec<String> {
        self.config_extra_metrics
            .get(&config.monitor_type)
            .map(|hook| hook(config))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopMonitor;

    impl Monitor for NoopMonitor {
        fn set_output(&mut self, _output: Output) {}

        fn configure(&mut self, _config: &MonitorConfig) -> Result<(), BoxError> {
            Ok(())
        }
    }

    #[test]
    fn create_unknown_type_errors() {
        let registry = MonitorRegistry::new();
        let err = registry.create_monitor("nope").err().unwrap();
        assert!(matches!(err, StartError::UnknownMonitorType(t) if t == "nope"));
    }

    #[test]
    fn registered_type_resolves_factory_and_metadata() {
        let mut registry = MonitorRegistry::new();
        registry.register(
            MonitorMetadata {
                monitor_type: "cpu".to_string(),
                ..Default::default()
            },
            || Box::new(NoopMonitor),
        );

        assert!(registry.is_registered("cpu"));
        assert!(registry.create_monitor("cpu").is_ok());
        assert_eq!("cpu", registry.metadata("cpu").unwrap().monitor_type);
    }

    #[test]
    fn config_extra_metrics_hook() {
        let mut registry = MonitorRegistry::new();
        registry.register_config_extra_metrics("cpu", |_| vec!["cpu.idle".to_string()]);

        let config: MonitorConfig =
            serde_json::from_str(r#"{"type":"cpu","intervalSeconds":10}"#).unwrap();
        assert_eq!(vec!["cpu.idle".to_string()], registry.config_extra_metrics(&config));

        let other: MonitorConfig =
            serde_json::from_str(r#"{"type":"mem","intervalSeconds":10}"#).unwrap();
        assert!(registry.config_extra_metrics(&other).is_empty());
    }
}
