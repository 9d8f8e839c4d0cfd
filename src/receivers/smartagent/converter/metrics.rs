// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Utc};
use opentelemetry_proto::tonic::common::v1::{AnyValue, KeyValue, any_value};
use opentelemetry_proto::tonic::metrics::v1::number_data_point::Value;
use opentelemetry_proto::tonic::metrics::v1::{
    AggregationTemporality, Gauge, Metric, NumberDataPoint, ResourceMetrics, ScopeMetrics, Sum,
    metric,
};
use tracing::debug;

use crate::receivers::smartagent::datapoint::{Datapoint, DatapointType, DatapointValue};

/// Convert a batch of datapoints to OTLP ResourceMetrics. Returns the
/// conversion result alongside the number of datapoints dropped; the caller
/// owns logging the aggregate so a bad batch doesn't flood the logs.
pub fn datapoints_to_resource_metrics(
    datapoints: &[Datapoint],
    time_received: DateTime<Utc>,
) -> (ResourceMetrics, usize) {
    let mut metrics = Vec::with_capacity(datapoints.len());
    let mut dropped = 0;

    for dp in datapoints {
        match datapoint_to_metric(dp, time_received) {
            Some(metric) => metrics.push(metric),
            None => dropped += 1,
        }
    }

    let rm = ResourceMetrics {
        resource: Some(Default::default()),
        scope_metrics: vec![ScopeMetrics {
            scope: None,
            metrics,
            schema_url: String::new(),
        }],
        schema_url: String::new(),
    };

    (rm, dropped)
}

fn datapoint_to_metric(dp: &Datapoint, time_received: DateTime<Utc>) -> Option<Metric> {
    let value = match &dp.value {
        Some(DatapointValue::Int(i)) => Value::AsInt(*i),
        Some(DatapointValue::Float(f)) => Value::AsDouble(*f),
        other => {
            debug!(metric = dp.metric, "dropping datapoint with unsupported value {:?}", other);
            return None;
        }
    };

    let point = NumberDataPoint {
        attributes: dimensions_to_attributes(dp),
        start_time_unix_nano: 0,
        time_unix_nano: dp
            .timestamp
            .unwrap_or(time_received)
            .timestamp_nanos_opt()
            .unwrap_or(0) as u64,
        value: Some(value),
        exemplars: vec![],
        flags: 0,
    };

    let data = match dp.metric_type {
        DatapointType::Gauge | DatapointType::Enum | DatapointType::Rate => {
            metric::Data::Gauge(Gauge {
                data_points: vec![point],
            })
        }
        DatapointType::Count => metric::Data::Sum(Sum {
            data_points: vec![point],
            aggregation_temporality: AggregationTemporality::Delta as i32,
            is_monotonic: true,
        }),
        DatapointType::Counter => metric::Data::Sum(Sum {
            data_points: vec![point],
            aggregation_temporality: AggregationTemporality::Cumulative as i32,
            is_monotonic: true,
        }),
        DatapointType::Timestamp => {
            debug!(
                metric = dp.metric,
                "dropping datapoint with unsupported metric type {:?}", dp.metric_type
            );
            return None;
        }
    };

    Some(Metric {
        name: dp.metric.clone(),
        description: String::new(),
        unit: String::new(),
        metadata: vec![],
        data: Some(data),
    })
}

const MONITOR_ID_KEY: &str = "monitorID";

// Empty dimension values are kept, only the key matters for identity. The
// monitorID dimension is redundant when it repeats the meta entry of the
// same name and is dropped to cap cardinality.
fn dimensions_to_attributes(dp: &Datapoint) -> Vec<KeyValue> {
    let duplicate_monitor_id = match (dp.meta.get(MONITOR_ID_KEY), dp.dimensions.get(MONITOR_ID_KEY))
    {
        (Some(meta), Some(dim)) => meta == dim,
        _ => false,
    };

    dp.dimensions
        .iter()
        .filter(|(k, _)| !(duplicate_monitor_id && k.as_str() == MONITOR_ID_KEY))
        .map(|(k, v)| KeyValue {
            key: k.clone(),
            value: Some(AnyValue {
                value: Some(any_value::Value::StringValue(v.clone())),
            }),
        })
        .collect()
}
