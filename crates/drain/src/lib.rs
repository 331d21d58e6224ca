//! jstail drain - read a JetStream backlog until it runs dry
//!
//! This crate holds the fetch/filter/emit cycle behind the `jstail` CLI:
//!
//! - Creates an ephemeral pull consumer scoped to a stream and subject list
//! - Pulls bounded batches (size and wait limited)
//! - Filters payloads client-side by substring and writes matches in order
//! - Stops at the first empty batch and deletes the consumer
//!
//! # Architecture
//!
//! ```text
//! Session::connect(context)
//!     │
//!     ▼
//! NatsConsumer (ephemeral, filter_subjects)
//!     │  impl BatchSource
//!     ▼
//! DrainLoop ── fetch ──► QueryFilter ──► Output ──► stdout
//!     │
//!     └── empty batch ──► drained notice, release consumer, close session
//! ```
//!
//! [`DrainLoop`] only sees the [`BatchSource`] trait and [`drain_from`] only
//! sees [`Broker`], so both can be driven without a live server.

mod drain;
mod error;
pub mod filter;
pub mod nats;
pub mod output;
mod source;

pub use drain::{DEFAULT_RETRY_DELAY, DrainLoop, DrainSummary, RetryPolicy, drain_from};
pub use error::{
    BoxError, DrainError, EXIT_CONNECTION, EXIT_CONSUMER, EXIT_FETCH, EXIT_OUTPUT, Result,
};
pub use filter::QueryFilter;
pub use nats::{NatsConsumer, Session, drain_stream};
pub use output::{DRAINED_NOTICE, Output};
pub use source::{BatchSource, Broker, Message};
