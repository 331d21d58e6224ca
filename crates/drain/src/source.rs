//! Batch sources
//!
//! The drain loop only needs one capability from the broker: "give me up to N
//! messages, waiting at most T". [`BatchSource`] is that seam; the NATS pull
//! consumer implements it and tests substitute a scripted source. [`Broker`]
//! hands out sources and is closed once the run is over.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{BoxError, Result};

/// A message delivered by the broker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Subject the message was published on
    pub subject: String,
    /// Stream sequence, when the broker reported one
    pub sequence: Option<u64>,
    /// Raw payload
    pub payload: Bytes,
}

impl Message {
    pub fn new(subject: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            subject: subject.into(),
            sequence: None,
            payload: payload.into(),
        }
    }

    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = Some(sequence);
        self
    }
}

/// Something the drain loop can pull bounded batches from
#[async_trait]
pub trait BatchSource: Send {
    /// Fetch up to `max_messages`, returning early once `max_wait` elapses
    ///
    /// An empty vector means nothing was deliverable within the wait; it is
    /// not an error. `Err` is reserved for transport or protocol failures.
    async fn fetch(
        &mut self,
        max_messages: usize,
        max_wait: Duration,
    ) -> std::result::Result<Vec<Message>, BoxError>;

    /// Give back broker-side state; called once, after the last fetch
    async fn release(&mut self) {}
}

/// Connection that can create consumers for a drain run
#[async_trait]
pub trait Broker: Send + Sync {
    type Consumer: BatchSource;

    /// Create a consumer on `stream` that sees only `subjects`
    async fn create_consumer(&self, stream: &str, subjects: &[String]) -> Result<Self::Consumer>;

    /// Flush and let go of the connection
    async fn close(&self);
}
