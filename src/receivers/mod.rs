// SPDX-License-Identifier: Apache-2.0

pub mod otlp_output;
pub mod smartagent;
