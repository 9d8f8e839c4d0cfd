// SPDX-License-Identifier: Apache-2.0

pub mod bounded_channel;
pub mod extensions;
pub mod host;
pub mod receivers;
