// SPDX-License-Identifier: Apache-2.0

//! Conversions from the legacy SignalFx wire model to OTLP.

pub mod dimension;
pub mod event;
pub mod metrics;
pub mod trace;

pub use dimension::dimension_to_metadata_update;
pub use event::event_to_resource_logs;
pub use metrics::datapoints_to_resource_metrics;
pub use trace::spans_to_resource_spans;
