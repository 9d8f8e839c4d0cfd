// SPDX-License-Identifier: Apache-2.0

//! The legacy agent wire model.
//!
//! Monitors hand these to the receiver's [`Output`](super::output::Output)
//! once per reporting interval or event; they are transient and consumed by
//! a single send call.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

/// A single measurement emitted by a monitor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Datapoint {
    pub metric: String,
    pub metric_type: DatapointType,
    /// None models a datapoint whose value was never set; it is dropped at
    /// conversion time.
    pub value: Option<DatapointValue>,
    /// None models an unset timestamp; the receive time is substituted at
    /// conversion.
    pub timestamp: Option<DateTime<Utc>>,
    pub dimensions: HashMap<String, String>,
    /// Out-of-band metadata attached by the monitor machinery, never sent
    /// downstream directly.
    pub meta: HashMap<String, String>,
}

impl Datapoint {
    pub fn gauge(metric: impl Into<String>, value: DatapointValue) -> Self {
        Self {
            metric: metric.into(),
            metric_type: DatapointType::Gauge,
            value: Some(value),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DatapointValue {
    Int(i64),
    Float(f64),
    Str(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DatapointType {
    #[default]
    Gauge,
    /// A count of occurrences over the reporting interval.
    Count,
    Enum,
    /// A monotonic counter since monitor start.
    Counter,
    Rate,
    Timestamp,
}

/// A structured occurrence reported outside the metric stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Event {
    pub event_type: String,
    pub category: i64,
    pub dimensions: HashMap<String, String>,
    pub properties: HashMap<String, PropertyValue>,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Present-but-unset property; skipped during conversion.
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    Str(String),
}

/// A zipkin-flavored span as produced by tracing-capable monitors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Span {
    /// Hex-encoded, 16 or 32 characters. Empty means the monitor never set it.
    pub trace_id: String,
    /// Hex-encoded, 16 characters.
    pub id: String,
    pub parent_id: Option<String>,
    pub name: Option<String>,
    pub kind: Option<SpanKind>,
    pub local_endpoint: Option<Endpoint>,
    pub remote_endpoint: Option<Endpoint>,
    /// Microseconds since the Unix epoch.
    pub timestamp: Option<i64>,
    /// Microseconds.
    pub duration: Option<i64>,
    pub tags: HashMap<String, String>,
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    Client,
    Server,
    Producer,
    Consumer,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Endpoint {
    pub service_name: Option<String>,
    pub ipv4: Option<String>,
    pub ipv6: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotation {
    /// Microseconds since the Unix epoch.
    pub timestamp: Option<i64>,
    pub value: Option<String>,
}

/// A dimension value's property/tag state, reported by monitors that sync
/// metadata (not metric values) about the things they watch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dimension {
    pub name: String,
    pub value: String,
    /// Properties to set on the dimension; an empty value means "remove".
    pub properties: HashMap<String, String>,
    /// Tags to add (true) or remove (false) from the dimension.
    pub tags: HashMap<String, bool>,
}
