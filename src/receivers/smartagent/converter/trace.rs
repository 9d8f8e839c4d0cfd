// SPDX-License-Identifier: Apache-2.0

//! Direct span mapping. The zipkin-flavored spans monitors emit are mapped
//! field by field onto OTLP spans; there is no intermediate serialization,
//! so nothing can be lost in transit. Spans missing their IDs are dropped
//! quietly, malformed IDs fail the whole batch.

use std::collections::BTreeMap;

use opentelemetry_proto::tonic::common::v1::{AnyValue, KeyValue, any_value};
use opentelemetry_proto::tonic::resource::v1::Resource;
use opentelemetry_proto::tonic::trace::v1::span::SpanKind as OtlpSpanKind;
use opentelemetry_proto::tonic::trace::v1::{ResourceSpans, ScopeSpans, Span as OtlpSpan, span};
use tracing::debug;

use crate::receivers::smartagent::datapoint::{Endpoint, Span, SpanKind};
use crate::receivers::smartagent::error::TraceConversionError;

const SERVICE_NAME_KEY: &str = "service.name";
const PEER_SERVICE_KEY: &str = "peer.service";

/// Convert a batch of spans to OTLP ResourceSpans, one per distinct local
/// service name (sorted, so output order is stable).
pub fn spans_to_resource_spans(spans: &[Span]) -> Result<Vec<ResourceSpans>, TraceConversionError> {
    let mut by_service: BTreeMap<String, Vec<OtlpSpan>> = BTreeMap::new();

    for span in spans {
        if span.trace_id.is_empty() || span.id.is_empty() {
            debug!(name = span.name.as_deref().unwrap_or(""), "dropping span without ids");
            continue;
        }

        let service = span
            .local_endpoint
            .as_ref()
            .and_then(|ep| ep.service_name.clone())
            .unwrap_or_default();

        by_service.entry(service).or_default().push(convert_span(span)?);
    }

    Ok(by_service
        .into_iter()
        .map(|(service, spans)| ResourceSpans {
            resource: Some(resource_for(&service)),
            scope_spans: vec![ScopeSpans {
                scope: None,
                spans,
                schema_url: String::new(),
            }],
            schema_url: String::new(),
        })
        .collect())
}

fn resource_for(service: &str) -> Resource {
    let attributes = if service.is_empty() {
        vec![]
    } else {
        vec![string_attribute(SERVICE_NAME_KEY, service)]
    };
    Resource {
        attributes,
        ..Default::default()
    }
}

fn convert_span(span: &Span) -> Result<OtlpSpan, TraceConversionError> {
    let trace_id = decode_trace_id(&span.trace_id)?;
    let span_id = decode_span_id(&span.id)?;
    let parent_span_id = match span.parent_id.as_deref() {
        Some(parent) if !parent.is_empty() => decode_span_id(parent)?,
        _ => vec![],
    };

    let start_time_unix_nano = micros_to_nanos(span.timestamp);
    let end_time_unix_nano = match (span.timestamp, span.duration) {
        (Some(ts), Some(dur)) => micros_to_nanos(Some(ts + dur)),
        _ => start_time_unix_nano,
    };

    let mut attributes: Vec<KeyValue> = span
        .tags
        .iter()
        .map(|(k, v)| string_attribute(k, v))
        .collect();
    if let Some(remote) = &span.remote_endpoint {
        attributes.extend(remote_endpoint_attributes(remote));
    }

    let events = span
        .annotations
        .iter()
        .map(|annotation| span::Event {
            time_unix_nano: micros_to_nanos(annotation.timestamp),
            name: annotation.value.clone().unwrap_or_default(),
            attributes: vec![],
            dropped_attributes_count: 0,
        })
        .collect();

    Ok(OtlpSpan {
        trace_id,
        span_id,
        trace_state: String::new(),
        parent_span_id,
        flags: 0,
        name: span.name.clone().unwrap_or_default(),
        kind: kind_to_otlp(span.kind) as i32,
        start_time_unix_nano,
        end_time_unix_nano,
        attributes,
        dropped_attributes_count: 0,
        events,
        dropped_events_count: 0,
        links: vec![],
        dropped_links_count: 0,
        status: None,
    })
}

// 64-bit trace ids are zero-extended on the left, matching how zipkin
// promotes them to 128 bits.
fn decode_trace_id(id: &str) -> Result<Vec<u8>, TraceConversionError> {
    let invalid = || TraceConversionError::InvalidTraceId(id.to_string());
    let bytes = hex::decode(id).map_err(|_| invalid())?;
    match bytes.len() {
        16 => Ok(bytes),
        8 => {
            let mut padded = vec![0u8; 8];
            padded.extend(bytes);
            Ok(padded)
        }
        _ => Err(invalid()),
    }
}

fn decode_span_id(id: &str) -> Result<Vec<u8>, TraceConversionError> {
    let invalid = || TraceConversionError::InvalidSpanId(id.to_string());
    let bytes = hex::decode(id).map_err(|_| invalid())?;
    if bytes.len() != 8 {
        return Err(invalid());
    }
    Ok(bytes)
}

fn micros_to_nanos(micros: Option<i64>) -> u64 {
    micros.map(|us| us.saturating_mul(1000)).unwrap_or(0) as u64
}

fn kind_to_otlp(kind: Option<SpanKind>) -> OtlpSpanKind {
    match kind {
        Some(SpanKind::Client) => OtlpSpanKind::Client,
        Some(SpanKind::Server) => OtlpSpanKind::Server,
        Some(SpanKind::Producer) => OtlpSpanKind::Producer,
        Some(SpanKind::Consumer) => OtlpSpanKind::Consumer,
        None => OtlpSpanKind::Unspecified,
    }
}

fn remote_endpoint_attributes(remote: &Endpoint) -> Vec<KeyValue> {
    let mut attributes = Vec::new();
    if let Some(service) = &remote.service_name {
        attributes.push(string_attribute(PEER_SERVICE_KEY, service));
    }
    if let Some(ip) = remote.ipv4.as_ref().or(remote.ipv6.as_ref()) {
        attributes.push(string_attribute("net.peer.ip", ip));
    }
    if let Some(port) = remote.port {
        attributes.push(string_attribute("net.peer.port", &port.to_string()));
    }
    attributes
}

fn string_attribute(key: &str, value: &str) -> KeyValue {
    KeyValue {
        key: key.to_string(),
        value: Some(AnyValue {
            value: Some(any_value::Value::StringValue(value.to_string())),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::receivers::smartagent::datapoint::Annotation;
    use std::collections::HashMap;

    fn span() -> Span {
        Span {
            trace_id: "12345678901234567890123456789012".to_string(),
            id: "1234567890123456".to_string(),
            parent_id: Some("0000000000000001".to_string()),
            name: Some("get /".to_string()),
            kind: Some(SpanKind::Server),
            local_endpoint: Some(Endpoint {
                service_name: Some("checkout".to_string()),
                ..Default::default()
            }),
            remote_endpoint: Some(Endpoint {
                service_name: Some("payments".to_string()),
                ipv4: Some("10.0.0.4".to_string()),
                port: Some(443),
                ..Default::default()
            }),
            timestamp: Some(1_700_000_000_000_000),
            duration: Some(500_000),
            tags: HashMap::from([("http.method".to_string(), "GET".to_string())]),
            annotations: vec![Annotation {
                timestamp: Some(1_700_000_000_100_000),
                value: Some("retry".to_string()),
            }],
        }
    }

    fn only_span(rs: &[ResourceSpans]) -> &OtlpSpan {
        assert_eq!(1, rs.len());
        assert_eq!(1, rs[0].scope_spans.len());
        assert_eq!(1, rs[0].scope_spans[0].spans.len());
        &rs[0].scope_spans[0].spans[0]
    }

    #[test]
    fn full_span_mapping() {
        let rs = spans_to_resource_spans(&[span()]).unwrap();
        let converted = only_span(&rs);

        assert_eq!(hex::decode("12345678901234567890123456789012").unwrap(), converted.trace_id);
        assert_eq!(hex::decode("1234567890123456").unwrap(), converted.span_id);
        assert_eq!(hex::decode("0000000000000001").unwrap(), converted.parent_span_id);
        assert_eq!("get /", converted.name);
        assert_eq!(OtlpSpanKind::Server as i32, converted.kind);
        assert_eq!(1_700_000_000_000_000_000, converted.start_time_unix_nano);
        assert_eq!(1_700_000_000_500_000_000, converted.end_time_unix_nano);

        let attr = |key: &str| {
            converted
                .attributes
                .iter()
                .find(|kv| kv.key == key)
                .and_then(|kv| kv.value.as_ref())
                .and_then(|v| v.value.as_ref())
        };
        assert_eq!(Some(&any_value::Value::StringValue("GET".to_string())), attr("http.method"));
        assert_eq!(
            Some(&any_value::Value::StringValue("payments".to_string())),
            attr(PEER_SERVICE_KEY)
        );
        assert_eq!(
            Some(&any_value::Value::StringValue("10.0.0.4".to_string())),
            attr("net.peer.ip")
        );

        assert_eq!(1, converted.events.len());
        assert_eq!("retry", converted.events[0].name);
        assert_eq!(1_700_000_000_100_000_000, converted.events[0].time_unix_nano);

        let service = rs[0].resource.as_ref().unwrap().attributes.first().unwrap();
        assert_eq!(SERVICE_NAME_KEY, service.key);
    }

    #[test]
    fn spans_grouped_by_local_service() {
        let mut other = span();
        other.local_endpoint = Some(Endpoint {
            service_name: Some("auth".to_string()),
            ..Default::default()
        });

        let rs = spans_to_resource_spans(&[span(), other]).unwrap();
        assert_eq!(2, rs.len());
        // sorted by service name
        let service_of = |rs: &ResourceSpans| {
            rs.resource.as_ref().unwrap().attributes[0]
                .value
                .clone()
                .unwrap()
                .value
        };
        assert_eq!(
            Some(any_value::Value::StringValue("auth".to_string())),
            service_of(&rs[0])
        );
        assert_eq!(
            Some(any_value::Value::StringValue("checkout".to_string())),
            service_of(&rs[1])
        );
    }

    #[test]
    fn sixty_four_bit_trace_id_is_zero_extended() {
        let mut short = span();
        short.trace_id = "1234567890123456".to_string();

        let rs = spans_to_resource_spans(&[short]).unwrap();
        let mut expected = vec![0u8; 8];
        expected.extend(hex::decode("1234567890123456").unwrap());
        assert_eq!(expected, only_span(&rs).trace_id);
    }

    #[test]
    fn missing_ids_drop_silently() {
        let mut no_trace = span();
        no_trace.trace_id = String::new();
        let mut no_span = span();
        no_span.id = String::new();

        let rs = spans_to_resource_spans(&[no_trace, no_span]).unwrap();
        assert!(rs.is_empty());
    }

    #[test]
    fn malformed_ids_fail_the_batch() {
        let mut bad_trace = span();
        bad_trace.trace_id = "zzzz".to_string();
        assert!(matches!(
            spans_to_resource_spans(&[bad_trace]),
            Err(TraceConversionError::InvalidTraceId(_))
        ));

        let mut bad_span = span();
        bad_span.id = "abcd".to_string();
        assert!(matches!(
            spans_to_resource_spans(&[bad_span]),
            Err(TraceConversionError::InvalidSpanId(_))
        ));
    }

    #[test]
    fn bare_span_defaults() {
        let bare = Span {
            trace_id: "12345678901234567890123456789012".to_string(),
            id: "1234567890123456".to_string(),
            ..Default::default()
        };

        let rs = spans_to_resource_spans(&[bare]).unwrap();
        let converted = only_span(&rs);
        assert_eq!(OtlpSpanKind::Unspecified as i32, converted.kind);
        assert_eq!(0, converted.start_time_unix_nano);
        assert!(converted.parent_span_id.is_empty());
        assert!(rs[0].resource.as_ref().unwrap().attributes.is_empty());
    }
}
