use std::sync::{Arc, Weak};

use rdkafka::{
    consumer::{Consumer, StreamConsumer},
    error::KafkaError,
    ClientConfig, Message,
};

use crate::config::{ConsumerConfig, KafkaConfig};

/// A consumer subscribed to a single topic, with manual offset storing.
///
/// Auto offset storing is disabled: every received message carries an [`Ack`]
/// token, and only acking it marks the message as processed. Stored offsets
/// are committed in the background by librdkafka on the configured interval.
/// A message whose token is dropped without acking stays eligible for
/// redelivery once the group rebalances or the process restarts.
#[derive(Clone)]
pub struct SingleTopicConsumer {
    inner: Arc<Inner>,
}

struct Inner {
    consumer: StreamConsumer,
    topic: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RecvErr {
    #[error("Kafka error: {0}")]
    Kafka(#[from] KafkaError),
    #[error("Received empty payload")]
    Empty,
}

#[derive(Debug, thiserror::Error)]
pub enum AckErr {
    #[error("Kafka error: {0}")]
    Kafka(#[from] KafkaError),
    #[error("Consumer gone")]
    Gone,
}

impl SingleTopicConsumer {
    pub fn new(
        common_config: KafkaConfig,
        consumer_config: ConsumerConfig,
    ) -> Result<Self, KafkaError> {
        let mut client_config = ClientConfig::new();
        client_config
            .set("bootstrap.servers", &common_config.kafka_hosts)
            .set("statistics.interval.ms", "10000")
            .set("group.id", consumer_config.kafka_consumer_group)
            .set(
                "auto.offset.reset",
                &consumer_config.kafka_consumer_offset_reset,
            )
            .set(
                "auto.commit.interval.ms",
                consumer_config
                    .kafka_consumer_auto_commit_interval_ms
                    .to_string(),
            );

        client_config.set("enable.auto.offset.store", "false");

        if common_config.kafka_tls {
            client_config
                .set("security.protocol", "ssl")
                .set("enable.ssl.certificate.verification", "false");
        };

        let consumer: StreamConsumer = client_config.create()?;
        consumer.subscribe(&[consumer_config.kafka_consumer_topic.as_str()])?;

        let inner = Inner {
            consumer,
            topic: consumer_config.kafka_consumer_topic,
        };
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Receive one message, returning the raw payload bytes and the ack
    /// token for it. Decoding is the caller's concern, so the caller gets to
    /// decide what does and does not constitute successful processing.
    ///
    /// A null payload is surfaced as [`RecvErr::Empty`], without a token:
    /// there is nothing to process, so there is nothing to ack.
    pub async fn recv_raw(&self) -> Result<(Vec<u8>, Ack), RecvErr> {
        let message = self.inner.consumer.recv().await?;

        let Some(payload) = message.payload() else {
            return Err(RecvErr::Empty);
        };

        let ack = Ack {
            handle: Arc::downgrade(&self.inner),
            partition: message.partition(),
            offset: message.offset(),
        };

        Ok((payload.to_vec(), ack))
    }
}

/// Acknowledgment token for a single received message. Consumed on use, so
/// a message can be acked at most once.
#[derive(Debug)]
pub struct Ack {
    handle: Weak<Inner>,
    partition: i32,
    offset: i64,
}

impl Ack {
    pub fn ack(self) -> Result<(), AckErr> {
        let inner = self.handle.upgrade().ok_or(AckErr::Gone)?;
        inner
            .consumer
            .store_offset(&inner.topic, self.partition, self.offset)?;
        Ok(())
    }
}
