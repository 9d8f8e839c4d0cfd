// SPDX-License-Identifier: Apache-2.0

//! Static metric catalogs.
//!
//! Each monitor type registers one [`MonitorMetadata`] describing every
//! metric it can emit, group membership, and which metrics are sent by
//! default. The filtering engine is built entirely from this catalog plus
//! user overrides.

use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Gauge,
    Counter,
    Cumulative,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricInfo {
    pub kind: MetricKind,
    /// Group this metric belongs to; empty means ungrouped.
    pub group: String,
}

/// Immutable description of the metrics a monitor type can emit.
#[derive(Debug, Clone, Default)]
pub struct MonitorMetadata {
    pub monitor_type: String,
    pub metrics: HashMap<String, MetricInfo>,
    /// Metrics sent unless explicitly excluded.
    pub default_metrics: HashSet<String>,
    pub groups: HashSet<String>,
    pub group_metrics: HashMap<String, Vec<String>>,
    /// When true, no inclusion filtering is constructed at all.
    pub send_all: bool,
    /// When true, metrics absent from `metrics` pass through by default.
    pub send_unknown: bool,
}

impl MonitorMetadata {
    pub fn has_metric(&self, name: &str) -> bool {
        self.metrics.contains_key(name)
    }

    pub fn has_default_metric(&self, name: &str) -> bool {
        self.default_metrics.contains(name)
    }
}
