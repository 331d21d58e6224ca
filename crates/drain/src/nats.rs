//! NATS JetStream session and pull consumer
//!
//! [`Session`] owns the connection. [`NatsConsumer`] is an ephemeral pull
//! consumer created on a stream and filtered to the requested subjects; it is
//! deleted again when the run ends.

use std::io::Write;
use std::time::Duration;

use async_nats::connection::State;
use async_nats::jetstream::{
    self,
    consumer::{AckPolicy, PullConsumer, pull},
    stream::Stream,
};
use async_nats::{Client, ConnectOptions};
use async_trait::async_trait;
use futures::StreamExt;
use jstail_config::{DrainConfig, NatsContext};
use tokio::time::Instant;

use crate::drain::{DrainSummary, drain_from};
use crate::error::{BoxError, DrainError, Result};
use crate::output::Output;
use crate::source::{BatchSource, Broker, Message};

/// Connection name reported to the server
const CLIENT_NAME: &str = "jstail";

/// How long the initial connect may take
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Broker deletes the consumer after this long without a pull request
const CONSUMER_INACTIVE_THRESHOLD: Duration = Duration::from_secs(30);

/// Slack on top of the fetch wait before the client gives up on the server
const FETCH_GRACE: Duration = Duration::from_secs(2);

/// A live connection to the broker
pub struct Session {
    client: Client,
    jetstream: jetstream::Context,
    url: String,
}

impl Session {
    /// Connect using the address and credentials from a context
    pub async fn connect(context: &NatsContext) -> Result<Self> {
        let url = context.server_url().to_string();

        let mut options = ConnectOptions::new()
            .name(CLIENT_NAME)
            .connection_timeout(CONNECT_TIMEOUT);
        if let Some((user, password)) = context.user_password() {
            options = options.user_and_password(user.to_string(), password.to_string());
        }
        if let Some(token) = context.token() {
            options = options.token(token.to_string());
        }
        if let Some(creds) = context.creds_path() {
            options = options
                .credentials_file(creds)
                .await
                .map_err(|e| DrainError::connection(&url, e))?;
        }

        tracing::info!(server = %url, context = %context.name, "connecting");
        let client = options
            .connect(url.as_str())
            .await
            .map_err(|e| DrainError::connection(&url, e))?;
        let jetstream = jetstream::new(client.clone());

        Ok(Self {
            client,
            jetstream,
            url,
        })
    }
}

#[async_trait]
impl Broker for Session {
    type Consumer = NatsConsumer;

    /// Create an ephemeral pull consumer on `stream` filtered to `subjects`
    ///
    /// The broker names the consumer. Delivery alone advances it (no acks).
    async fn create_consumer(&self, stream: &str, subjects: &[String]) -> Result<NatsConsumer> {
        let handle = self
            .jetstream
            .get_stream(stream)
            .await
            .map_err(|e| DrainError::consumer_creation(stream, e))?;

        let consumer: PullConsumer = handle
            .create_consumer(consumer_config(subjects))
            .await
            .map_err(|e| DrainError::consumer_creation(stream, e))?;
        let name = consumer.cached_info().name.clone();

        tracing::info!(stream, consumer = %name, subjects = ?subjects, "consumer created");

        Ok(NatsConsumer {
            consumer,
            stream: handle,
            client: self.client.clone(),
            name,
            subjects: subjects.to_vec(),
        })
    }

    /// Flush pending traffic; the connection closes when the session drops
    async fn close(&self) {
        if let Err(e) = self.client.flush().await {
            tracing::warn!(server = %self.url, error = %e, "failed to flush connection");
        }
        tracing::debug!(server = %self.url, "connection closed");
    }
}

/// Build the consumer config for a subject list
///
/// A single subject goes in `filter_subject`, which servers older than 2.10
/// also understand.
fn consumer_config(subjects: &[String]) -> pull::Config {
    let mut config = pull::Config {
        ack_policy: AckPolicy::None,
        inactive_threshold: CONSUMER_INACTIVE_THRESHOLD,
        description: Some(format!("{CLIENT_NAME} drain")),
        ..Default::default()
    };
    match subjects {
        [single] => config.filter_subject = single.clone(),
        many => config.filter_subjects = many.to_vec(),
    }
    config
}

/// Ephemeral pull consumer owned by one drain run
pub struct NatsConsumer {
    consumer: PullConsumer,
    stream: Stream,
    client: Client,
    name: String,
    subjects: Vec<String>,
}

#[async_trait]
impl BatchSource for NatsConsumer {
    async fn fetch(
        &mut self,
        max_messages: usize,
        max_wait: Duration,
    ) -> std::result::Result<Vec<Message>, BoxError> {
        let batch = self
            .consumer
            .batch()
            .max_messages(max_messages)
            .expires(max_wait)
            .messages()
            .await?
            .map(|next| next.map(|msg| to_message(&msg)));

        let deadline = Instant::now() + max_wait + FETCH_GRACE;
        let messages = collect_batch(batch, max_messages, deadline).await?;
        settle(messages, self.client.connection_state())
    }

    /// Delete the consumer on the broker
    ///
    /// Failures are logged, not returned: the inactivity threshold removes the
    /// consumer eventually anyway.
    async fn release(&mut self) {
        match self.stream.delete_consumer(&self.name).await {
            Ok(_) => tracing::debug!(
                consumer = %self.name,
                subjects = ?self.subjects,
                "consumer deleted"
            ),
            Err(e) => {
                tracing::warn!(consumer = %self.name, error = %e, "failed to delete consumer")
            }
        }
    }
}

/// Read one pull batch until it ends or `deadline` passes
///
/// An error after at least one message ends the batch with what arrived so
/// far; an error before any message is returned.
async fn collect_batch<S, E>(
    batch: S,
    max_messages: usize,
    deadline: Instant,
) -> std::result::Result<Vec<Message>, BoxError>
where
    S: futures::Stream<Item = std::result::Result<Message, E>>,
    E: Into<BoxError>,
{
    let mut batch = std::pin::pin!(batch);
    let mut messages = Vec::with_capacity(max_messages.min(1024));

    loop {
        let next = match tokio::time::timeout_at(deadline, batch.next()).await {
            Ok(next) => next,
            Err(_) => {
                tracing::debug!(received = messages.len(), "fetch deadline passed");
                break;
            }
        };
        match next {
            Some(Ok(message)) => messages.push(message),
            Some(Err(e)) => {
                let e: BoxError = e.into();
                if messages.is_empty() {
                    return Err(e);
                }
                tracing::warn!(
                    error = %e,
                    received = messages.len(),
                    "fetch interrupted, keeping partial batch"
                );
                break;
            }
            None => break,
        }
    }

    Ok(messages)
}

/// An empty batch only means "drained" while the connection is still up
///
/// A batch also ends early when the connection drops, which must not be
/// mistaken for an exhausted stream.
fn settle(
    messages: Vec<Message>,
    state: State,
) -> std::result::Result<Vec<Message>, BoxError> {
    if messages.is_empty() && !matches!(state, State::Connected) {
        return Err(format!("connection not available ({state:?})").into());
    }
    Ok(messages)
}

fn to_message(msg: &jetstream::Message) -> Message {
    let sequence = msg.info().ok().map(|info| info.stream_sequence);
    Message {
        subject: msg.subject.to_string(),
        sequence,
        payload: msg.payload.clone(),
    }
}

/// Connect, create the consumer, drain into `output`, then clean up
///
/// The consumer is deleted and the connection flushed whether the drain
/// succeeds or fails.
pub async fn drain_stream<W: Write>(
    config: &DrainConfig,
    output: &mut Output<W>,
) -> Result<DrainSummary> {
    let session = Session::connect(&config.context).await?;
    drain_from(&session, config, output).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_consumer_config_single_subject() {
        let config = consumer_config(&["orders.created".to_string()]);
        assert_eq!(config.filter_subject, "orders.created");
        assert!(config.filter_subjects.is_empty());
        assert_eq!(config.ack_policy, AckPolicy::None);
        assert!(config.durable_name.is_none());
        assert!(config.name.is_none());
    }

    #[test]
    fn test_consumer_config_many_subjects() {
        let subjects = vec!["orders.*".to_string(), "payments.>".to_string()];
        let config = consumer_config(&subjects);
        assert!(config.filter_subject.is_empty());
        assert_eq!(config.filter_subjects, subjects);
        assert_eq!(config.inactive_threshold, CONSUMER_INACTIVE_THRESHOLD);
    }

    #[tokio::test]
    async fn test_connect_failure_is_connection_error() {
        // Port 1 is reserved; nothing listens there
        let context = NatsContext::from_url("nats://127.0.0.1:1");
        let err = match Session::connect(&context).await {
            Ok(_) => panic!("connect should fail"),
            Err(e) => e,
        };
        assert!(matches!(err, DrainError::Connection { .. }));
        assert_eq!(err.exit_code(), crate::error::EXIT_CONNECTION);
    }

    fn soon() -> Instant {
        Instant::now() + Duration::from_secs(5)
    }

    fn reset() -> io::Error {
        io::Error::new(io::ErrorKind::ConnectionReset, "connection reset")
    }

    #[tokio::test]
    async fn test_collect_batch_reads_until_end() {
        let batch = futures::stream::iter(vec![
            Ok::<_, io::Error>(Message::new("a", "1")),
            Ok(Message::new("a", "2")),
        ]);
        let messages = collect_batch(batch, 10, soon()).await.unwrap();
        assert_eq!(messages, vec![Message::new("a", "1"), Message::new("a", "2")]);
    }

    #[tokio::test]
    async fn test_collect_batch_keeps_messages_before_error() {
        let batch = futures::stream::iter(vec![Ok(Message::new("a", "kept")), Err(reset())]);
        let messages = collect_batch(batch, 10, soon()).await.unwrap();
        assert_eq!(messages, vec![Message::new("a", "kept")]);
    }

    #[tokio::test]
    async fn test_collect_batch_error_before_any_message() {
        let batch = futures::stream::iter(vec![Err::<Message, _>(reset())]);
        let err = collect_batch(batch, 10, soon()).await.unwrap_err();
        assert!(err.to_string().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_collect_batch_stops_at_deadline() {
        let batch = futures::stream::pending::<std::result::Result<Message, io::Error>>();
        let deadline = Instant::now() + Duration::from_millis(1);
        let messages = collect_batch(batch, 10, deadline).await.unwrap();
        assert!(messages.is_empty());
    }

    #[test]
    fn test_empty_batch_while_connected_is_drained() {
        assert!(settle(Vec::new(), State::Connected).unwrap().is_empty());
    }

    #[test]
    fn test_empty_batch_while_disconnected_is_an_error() {
        assert!(settle(Vec::new(), State::Disconnected).is_err());
        assert!(settle(Vec::new(), State::Pending).is_err());
    }

    #[test]
    fn test_partial_batch_kept_while_disconnected() {
        let messages = settle(vec![Message::new("a", "1")], State::Disconnected).unwrap();
        assert_eq!(messages.len(), 1);
    }
}
