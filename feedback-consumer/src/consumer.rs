use std::sync::Arc;

use common_kafka::kafka_consumer::{AckErr, RecvErr, SingleTopicConsumer};
use health::HealthHandle;
use rdkafka::error::KafkaError;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::metrics_consts::{
    DECODE_FAILURES, EMPTY_PAYLOADS, MESSAGES_PROCESSED, MESSAGES_RECEIVED, OVERSIZED_COMMENTS,
};
use crate::sink::ObservationSink;
use crate::types::{decode, FeedbackSubmittedEvent};

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("transport failure: {0}")]
    Transport(#[from] KafkaError),
    #[error("failed to ack message: {0}")]
    Ack(#[from] AckErr),
}

/// One member of the fixed-size worker pool. Each worker owns its own
/// group-member consumer, so the broker assigns it a disjoint subset of
/// partitions; within that subset, messages are processed strictly one at
/// a time, preserving per-partition delivery order.
pub struct Worker {
    pub consumer: SingleTopicConsumer,
    pub sink: Arc<dyn ObservationSink>,
    pub liveness: HealthHandle,
    pub comment_length_limit: usize,
    pub shutdown: CancellationToken,
}

impl Worker {
    /// Drive the receive/decode/observe/ack cycle until shutdown or a
    /// transport failure. Returns `Ok(())` on graceful shutdown.
    pub async fn run(self) -> Result<(), WorkerError> {
        loop {
            self.liveness.report_healthy();

            let received = tokio::select! {
                // Shutdown is only observed between messages, so an
                // in-flight decode-and-observe cycle always runs to
                // completion before the worker exits.
                _ = self.shutdown.cancelled() => return Ok(()),
                received = self.consumer.recv_raw() => received,
            };

            let (payload, ack) = match received {
                Ok(r) => r,
                Err(RecvErr::Empty) => {
                    metrics::counter!(EMPTY_PAYLOADS).increment(1);
                    warn!("received message with empty payload");
                    continue;
                }
                Err(RecvErr::Kafka(e)) => return Err(WorkerError::Transport(e)),
            };

            metrics::counter!(MESSAGES_RECEIVED).increment(1);

            let event = match decode(&payload) {
                Ok(event) => event,
                Err(e) => {
                    // Re-decoding the same bytes always reproduces the same
                    // failure. Surface it, leave the message unacknowledged
                    // for the transport's redelivery policy, and move on to
                    // the next message rather than retrying this one.
                    metrics::counter!(DECODE_FAILURES).increment(1);
                    warn!("failed to decode feedback event: {}", e);
                    continue;
                }
            };

            observe(&event, self.sink.as_ref(), self.comment_length_limit);

            // Acknowledge strictly after the sink call has returned
            ack.ack()?;
            metrics::counter!(MESSAGES_PROCESSED).increment(1);
        }
    }
}

/// Forward a decoded event to the observation sink, flagging over-long
/// comments. An absent comment or one of exactly `comment_length_limit`
/// characters never triggers the warning.
pub fn observe(
    event: &FeedbackSubmittedEvent,
    sink: &dyn ObservationSink,
    comment_length_limit: usize,
) {
    sink.event_received(event);

    let oversized = event
        .comment
        .as_ref()
        .is_some_and(|comment| comment.chars().count() > comment_length_limit);

    if oversized {
        metrics::counter!(OVERSIZED_COMMENTS).increment(1);
        sink.comment_length_exceeded(&event.id);
    }
}
