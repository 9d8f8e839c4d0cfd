// SPDX-License-Identifier: Apache-2.0

//! Host capability surface.
//!
//! A [`Host`] is the view a receiver gets of the other components built for
//! the running pipeline: extensions (for shared Smart Agent configuration)
//! and exporters (for routing dimension/property updates). Registries are
//! ordered by component ID so that every lookup and tie-break is
//! deterministic across runs.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tower::BoxError;

use crate::extensions::smartagent::SmartAgentConfigProvider;

/// Identifies a component instance as `type` or `type/name`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentId {
    kind: String,
    name: Option<String>,
}

impl ComponentId {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: None,
        }
    }

    pub fn with_name(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: Some(name.into()),
        }
    }

    /// The component type portion, e.g. `smartagent` for `smartagent/nginx`.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}/{}", self.kind, name),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl FromStr for ComponentId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.split_once('/') {
            Some((kind, name)) => ComponentId::with_name(kind, name),
            None => ComponentId::new(s),
        })
    }
}

/// Telemetry signal a pipeline carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalType {
    Metrics,
    Logs,
    Traces,
}

/// A dimension/property update destined for a metadata-capable exporter.
///
/// Properties and tags occupy independent namespaces in the source dimension
/// model but share the add/remove/update maps here; the empty-string values
/// for tags and the removal sentinel for properties keep the two
/// distinguishable downstream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataUpdate {
    pub resource_id_key: String,
    pub resource_id: String,
    pub metadata_to_add: BTreeMap<String, String>,
    pub metadata_to_remove: BTreeMap<String, String>,
    pub metadata_to_update: BTreeMap<String, String>,
}

/// Capability implemented by exporters that can apply dimension/property
/// updates out of band from the metric pipeline.
pub trait MetadataExporter: Send + Sync {
    fn consume_metadata(&self, updates: &[MetadataUpdate]) -> Result<(), BoxError>;
}

/// A built exporter registered with the host.
pub trait Exporter: Send + Sync {
    /// The exporter's component type, e.g. `signalfx`.
    fn exporter_type(&self) -> &str;

    /// Downcast hook for the metadata-update capability.
    fn as_metadata_exporter(&self) -> Option<&dyn MetadataExporter> {
        None
    }
}

/// A built extension registered with the host.
pub trait Extension: Send + Sync {
    /// Downcast hook for the Smart Agent shared-config capability.
    fn as_smart_agent_config_provider(&self) -> Option<&dyn SmartAgentConfigProvider> {
        None
    }
}

/// The set of components visible to a receiver at start time.
#[derive(Default)]
pub struct Host {
    extensions: BTreeMap<ComponentId, Arc<dyn Extension>>,
    exporters: BTreeMap<ComponentId, (SignalType, Arc<dyn Exporter>)>,
}

impl Host {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_extension(&mut self, id: ComponentId, extension: Arc<dyn Extension>) {
        self.extensions.insert(id, extension);
    }

    pub fn register_exporter(
        &mut self,
        signal: SignalType,
        id: ComponentId,
        exporter: Arc<dyn Exporter>,
    ) {
        self.exporters.insert(id, (signal, exporter));
    }

    pub fn extensions(&self) -> &BTreeMap<ComponentId, Arc<dyn Extension>> {
        &self.extensions
    }

    /// All exporters built for the given signal, in component-ID order.
    pub fn exporters(
        &self,
        signal: SignalType,
    ) -> impl Iterator<Item = (&ComponentId, &Arc<dyn Exporter>)> {
        self.exporters
            .iter()
            .filter_map(move |(id, (s, exp))| (*s == signal).then_some((id, exp)))
    }
}
