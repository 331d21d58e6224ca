//! The drain loop
//!
//! ```text
//!   ┌──────────────► fetch(batch_size, max_wait)
//!   │                   │
//!   │         ┌─────────┴──────────┐
//!   │       n > 0                n == 0
//!   │         │                    │
//!   │   filter + emit         drained notice
//!   │         │                    │
//!   └─────────┘                  done
//! ```
//!
//! `n` counts messages received, not messages emitted: a batch where nothing
//! matched the query still means the stream had data, so the loop continues.
//!
//! An empty batch after the full wait is taken to mean the backlog is
//! drained. Messages published during that final wait window are not picked
//! up.

use std::io::Write;
use std::time::Duration;

use jstail_config::{DEFAULT_BATCH_SIZE, DEFAULT_MAX_WAIT, DrainConfig};

use crate::error::{DrainError, Result};
use crate::filter::QueryFilter;
use crate::output::Output;
use crate::source::{BatchSource, Broker, Message};

/// First retry delay; doubles per attempt
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(250);

/// Upper bound for a single retry delay
const MAX_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Bounded retry for failed fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first failure (0 = fail immediately)
    pub max_retries: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (1-based)
    pub fn delay(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(MAX_RETRY_DELAY)
    }
}

/// Counters for one drain run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainSummary {
    /// Fetch calls issued, including failed attempts
    pub fetches: u64,
    /// Messages received across all batches
    pub received: u64,
    /// Messages that matched the query and were written
    pub emitted: u64,
}

/// Fetch/filter/emit cycle that runs until a batch comes back empty
#[derive(Debug, Clone)]
pub struct DrainLoop {
    batch_size: usize,
    max_wait: Duration,
    filter: QueryFilter,
    retry: RetryPolicy,
}

impl Default for DrainLoop {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_wait: DEFAULT_MAX_WAIT,
            filter: QueryFilter::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl DrainLoop {
    pub fn new(filter: QueryFilter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    pub fn from_config(config: &DrainConfig) -> Self {
        Self::new(QueryFilter::new(&config.query))
            .with_batch_size(config.batch_size)
            .with_max_wait(config.max_wait)
            .with_retry(RetryPolicy::new(config.fetch_retries))
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Drain `source` into `output`
    ///
    /// Returns once a fetch yields no messages. Fetch failures are retried per
    /// the retry policy and then returned as [`DrainError::Fetch`]; write
    /// failures are returned immediately as [`DrainError::Output`].
    pub async fn run<S, W>(
        &self,
        source: &mut S,
        output: &mut Output<W>,
    ) -> Result<DrainSummary>
    where
        S: BatchSource + ?Sized,
        W: Write,
    {
        let mut summary = DrainSummary::default();

        loop {
            let batch = self.fetch(source, &mut summary).await?;
            let received = batch.len();

            let emitted = self.emit_matches(&batch, output)?;
            output.flush()?;

            summary.received += received as u64;
            summary.emitted += emitted;
            tracing::debug!(
                fetch = summary.fetches,
                received,
                emitted,
                "batch processed"
            );

            if received == 0 {
                output.drained()?;
                output.flush()?;
                tracing::info!(
                    fetches = summary.fetches,
                    received = summary.received,
                    emitted = summary.emitted,
                    "stream drained"
                );
                return Ok(summary);
            }
        }
    }

    async fn fetch<S>(&self, source: &mut S, summary: &mut DrainSummary) -> Result<Vec<Message>>
    where
        S: BatchSource + ?Sized,
    {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            summary.fetches += 1;

            match source.fetch(self.batch_size, self.max_wait).await {
                Ok(batch) => return Ok(batch),
                Err(e) if attempts <= self.retry.max_retries => {
                    let delay = self.retry.delay(attempts);
                    tracing::warn!(
                        error = %e,
                        attempt = attempts,
                        delay_ms = delay.as_millis() as u64,
                        "fetch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(DrainError::Fetch { attempts, source: e }),
            }
        }
    }

    fn emit_matches<W: Write>(&self, batch: &[Message], output: &mut Output<W>) -> Result<u64> {
        let mut emitted = 0;
        for message in batch {
            if self.filter.matches(&message.payload) {
                output.emit(message)?;
                emitted += 1;
            }
        }
        Ok(emitted)
    }
}

/// Create a consumer on `broker`, drain it into `output`, then clean up
///
/// Once the consumer exists it is released exactly once, whatever the drain
/// returned. The broker is closed on every path, including a failed consumer
/// creation.
pub async fn drain_from<B, W>(
    broker: &B,
    config: &DrainConfig,
    output: &mut Output<W>,
) -> Result<DrainSummary>
where
    B: Broker,
    W: Write,
{
    let result = match broker
        .create_consumer(&config.stream, &config.subjects)
        .await
    {
        Ok(mut consumer) => {
            let result = DrainLoop::from_config(config)
                .run(&mut consumer, output)
                .await;
            consumer.release().await;
            result
        }
        Err(e) => Err(e),
    };

    broker.close().await;
    result
}

#[cfg(test)]
#[path = "drain_test.rs"]
mod drain_test;
