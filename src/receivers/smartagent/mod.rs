// SPDX-License-Identifier: Apache-2.0

//! Smart Agent receiver: runs legacy SignalFx agent monitors inside the
//! collector and bridges their datapoints, events, spans and dimension
//! updates onto the OTLP pipelines.

pub mod config;
pub mod converter;
pub mod datapoint;
pub mod dpfilters;
pub mod error;
pub mod factory;
pub mod filtering;
pub mod metadata;
pub mod monitor;
pub mod output;
pub mod receiver;
pub mod runtime;
