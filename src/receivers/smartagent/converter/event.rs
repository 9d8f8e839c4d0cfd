// SPDX-License-Identifier: Apache-2.0

use opentelemetry_proto::tonic::common::v1::{AnyValue, KeyValue, KeyValueList, any_value};
use opentelemetry_proto::tonic::logs::v1::{LogRecord, ResourceLogs, ScopeLogs};
use tracing::debug;

use crate::receivers::smartagent::datapoint::{Event, PropertyValue};

/// Marks a log record as carrying a SignalFx event. Always present, with a
/// null value when the category is unset, so downstream exporters can tell
/// events apart from plain logs.
pub const EVENT_CATEGORY_KEY: &str = "com.splunk.signalfx.event_category";
pub const EVENT_PROPERTIES_KEY: &str = "com.splunk.signalfx.event_properties";

/// Convert an event to OTLP ResourceLogs holding a single log record.
pub fn event_to_resource_logs(event: &Event) -> ResourceLogs {
    let category = if event.category != 0 {
        AnyValue {
            value: Some(any_value::Value::IntValue(event.category)),
        }
    } else {
        AnyValue { value: None }
    };

    let mut attributes = vec![KeyValue {
        key: EVENT_CATEGORY_KEY.to_string(),
        value: Some(category),
    }];

    for (key, value) in &event.dimensions {
        attributes.push(KeyValue {
            key: key.clone(),
            value: Some(AnyValue {
                value: Some(any_value::Value::StringValue(value.clone())),
            }),
        });
    }

    if let Some(properties) = properties_attribute(event) {
        attributes.push(KeyValue {
            key: EVENT_PROPERTIES_KEY.to_string(),
            value: Some(properties),
        });
    }

    let log_record = LogRecord {
        time_unix_nano: event
            .timestamp
            .and_then(|ts| ts.timestamp_nanos_opt())
            .unwrap_or(0) as u64,
        event_name: event.event_type.clone(),
        attributes,
        ..Default::default()
    };

    ResourceLogs {
        resource: Some(Default::default()),
        scope_logs: vec![ScopeLogs {
            scope: None,
            log_records: vec![log_record],
            schema_url: String::new(),
        }],
        schema_url: String::new(),
    }
}

// Only attached when at least one property survives; null properties are
// skipped.
fn properties_attribute(event: &Event) -> Option<AnyValue> {
    let values: Vec<KeyValue> = event
        .properties
        .iter()
        .filter_map(|(key, value)| {
            let value = match value {
                PropertyValue::Null => {
                    debug!(property = key, "skipping unset event property");
                    return None;
                }
                PropertyValue::Bool(b) => any_value::Value::BoolValue(*b),
                PropertyValue::Int(i) => any_value::Value::IntValue(*i),
                PropertyValue::Double(d) => any_value::Value::DoubleValue(*d),
                PropertyValue::Str(s) => any_value::Value::StringValue(s.clone()),
            };
            Some(KeyValue {
                key: key.clone(),
                value: Some(AnyValue { value: Some(value) }),
            })
        })
        .collect();

    if values.is_empty() {
        return None;
    }

    Some(AnyValue {
        value: Some(any_value::Value::KvlistValue(KeyValueList { values })),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use std::collections::HashMap;

    fn only_record(rl: &ResourceLogs) -> &LogRecord {
        assert_eq!(1, rl.scope_logs.len());
        assert_eq!(1, rl.scope_logs[0].log_records.len());
        &rl.scope_logs[0].log_records[0]
    }

    fn attr<'a>(record: &'a LogRecord, key: &str) -> Option<&'a KeyValue> {
        record.attributes.iter().find(|kv| kv.key == key)
    }

    #[test]
    fn event_type_and_timestamp() {
        let event = Event {
            event_type: "shutdown".to_string(),
            timestamp: Some(DateTime::from_timestamp(1_700_000_000, 0).unwrap()),
            ..Default::default()
        };

        let record = &event_to_resource_logs(&event).scope_logs[0].log_records[0];
        assert_eq!("shutdown", record.event_name);
        assert_eq!(1_700_000_000_000_000_000, record.time_unix_nano);
    }

    #[test]
    fn zero_timestamp_stays_zero() {
        let rl = event_to_resource_logs(&Event::default());
        assert_eq!(0, only_record(&rl).time_unix_nano);
    }

    #[test]
    fn nonzero_category_is_int_attribute() {
        let event = Event {
            category: 1_000_000,
            ..Default::default()
        };

        let rl = event_to_resource_logs(&event);
        let kv = attr(only_record(&rl), EVENT_CATEGORY_KEY).unwrap();
        assert_eq!(
            Some(any_value::Value::IntValue(1_000_000)),
            kv.value.as_ref().unwrap().value
        );
    }

    #[test]
    fn zero_category_is_null_sentinel() {
        let rl = event_to_resource_logs(&Event::default());
        let kv = attr(only_record(&rl), EVENT_CATEGORY_KEY).unwrap();
        assert_eq!(None, kv.value.as_ref().unwrap().value);
    }

    #[test]
    fn dimensions_become_string_attributes() {
        let event = Event {
            dimensions: HashMap::from([("env".to_string(), "lab".to_string())]),
            ..Default::default()
        };

        let rl = event_to_resource_logs(&event);
        let kv = attr(only_record(&rl), "env").unwrap();
        assert_eq!(
            Some(any_value::Value::StringValue("lab".to_string())),
            kv.value.as_ref().unwrap().value
        );
    }

    #[test]
    fn properties_map_attribute() {
        let event = Event {
            properties: HashMap::from([
                ("bool".to_string(), PropertyValue::Bool(true)),
                ("int".to_string(), PropertyValue::Int(4)),
                ("double".to_string(), PropertyValue::Double(1.5)),
                ("string".to_string(), PropertyValue::Str("ok".to_string())),
                ("null".to_string(), PropertyValue::Null),
            ]),
            ..Default::default()
        };

        let rl = event_to_resource_logs(&event);
        let kv = attr(only_record(&rl), EVENT_PROPERTIES_KEY).unwrap();
        let Some(any_value::Value::KvlistValue(list)) = &kv.value.as_ref().unwrap().value else {
            panic!("expected kvlist property attribute");
        };

        assert_eq!(4, list.values.len());
        assert!(!list.values.iter().any(|kv| kv.key == "null"));
    }

    #[test]
    fn all_null_properties_omit_the_attribute() {
        let event = Event {
            properties: HashMap::from([("only".to_string(), PropertyValue::Null)]),
            ..Default::default()
        };

        let rl = event_to_resource_logs(&event);
        assert!(attr(only_record(&rl), EVENT_PROPERTIES_KEY).is_none());
    }
}
