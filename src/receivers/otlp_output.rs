// SPDX-License-Identifier: Apache-2.0

use crate::bounded_channel::{BoundedSender, SendError};

/// Sending side of a telemetry pipeline. Receivers hold one per signal type
/// and push converted OTLP resource batches into it.
#[derive(Clone)]
pub struct OTLPOutput<T> {
    tx: BoundedSender<Vec<T>>,
}

impl<T> OTLPOutput<T> {
    pub fn new(tx: BoundedSender<Vec<T>>) -> Self {
        Self { tx }
    }

    pub async fn send(&self, batch: Vec<T>) -> Result<(), SendError> {
        self.tx.send(batch).await
    }

    /// Blocking variant for monitors running on dedicated OS threads.
    pub fn send_blocking(&self, batch: Vec<T>) -> Result<(), SendError> {
        self.tx.send_blocking(batch)
    }
}
