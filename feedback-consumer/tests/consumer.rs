use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use common_kafka::config::{ConsumerConfig, KafkaConfig};
use common_kafka::kafka_consumer::{RecvErr, SingleTopicConsumer};
use common_kafka::kafka_producer::send_json_to_kafka;
use common_kafka::test::create_mock_kafka;
use feedback_consumer::consumer::{observe, Worker};
use feedback_consumer::sink::ObservationSink;
use feedback_consumer::types::{decode, FeedbackSubmittedEvent};
use health::HealthRegistry;
use rdkafka::producer::FutureRecord;
use serde_json::json;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

const TOPIC: &str = "feedback-submitted";
const RECV_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Default)]
struct RecordingSink {
    received: Mutex<Vec<FeedbackSubmittedEvent>>,
    warnings: Mutex<Vec<String>>,
}

impl RecordingSink {
    fn received(&self) -> Vec<FeedbackSubmittedEvent> {
        self.received.lock().unwrap().clone()
    }

    fn warnings(&self) -> Vec<String> {
        self.warnings.lock().unwrap().clone()
    }
}

impl ObservationSink for RecordingSink {
    fn event_received(&self, event: &FeedbackSubmittedEvent) {
        self.received.lock().unwrap().push(event.clone());
    }

    fn comment_length_exceeded(&self, event_id: &str) {
        self.warnings.lock().unwrap().push(event_id.to_string());
    }
}

fn event(id: &str, comment: Option<String>) -> FeedbackSubmittedEvent {
    FeedbackSubmittedEvent {
        id: id.to_string(),
        member_id: "member-42".to_string(),
        provider_name: "York Clinic".to_string(),
        rating: 5,
        comment,
        submitted_at: Utc.with_ymd_and_hms(2025, 11, 11, 12, 0, 0).unwrap(),
        schema_version: 1,
    }
}

#[test]
fn absent_comment_triggers_no_warning() {
    let sink = RecordingSink::default();
    observe(&event("fb-123", None), &sink, 200);

    assert_eq!(sink.received().len(), 1);
    assert!(sink.warnings().is_empty());
}

#[test]
fn comment_at_the_limit_triggers_no_warning() {
    let sink = RecordingSink::default();
    observe(&event("fb-123", Some("a".repeat(200))), &sink, 200);

    assert_eq!(sink.received().len(), 1);
    assert!(sink.warnings().is_empty());
}

#[test]
fn comment_just_over_the_limit_triggers_exactly_one_warning() {
    let sink = RecordingSink::default();
    observe(&event("fb-456", Some("a".repeat(201))), &sink, 200);

    assert_eq!(sink.received().len(), 1);
    assert_eq!(sink.warnings(), vec!["fb-456".to_string()]);
}

#[test]
fn comment_length_is_measured_in_characters_not_bytes() {
    let sink = RecordingSink::default();
    // 200 two-byte characters: 400 bytes, but not over the limit
    observe(&event("fb-789", Some("é".repeat(200))), &sink, 200);
    assert!(sink.warnings().is_empty());

    observe(&event("fb-789", Some("é".repeat(201))), &sink, 200);
    assert_eq!(sink.warnings(), vec!["fb-789".to_string()]);
}

#[test]
fn received_event_is_forwarded_untouched() {
    let sink = RecordingSink::default();
    let submitted = event("fb-123", Some("Great visit!".to_string()));
    observe(&submitted, &sink, 200);

    assert_eq!(sink.received(), vec![submitted]);
    assert!(sink.warnings().is_empty());
}

fn mock_kafka_config(hosts: String) -> KafkaConfig {
    KafkaConfig {
        kafka_hosts: hosts,
        kafka_tls: false,
        kafka_producer_linger_ms: 0,
        kafka_producer_queue_mib: 50,
        kafka_message_timeout_ms: 5000,
        kafka_compression_codec: "none".to_string(),
    }
}

fn mock_consumer_config(group: &str) -> ConsumerConfig {
    ConsumerConfig {
        kafka_consumer_group: group.to_string(),
        kafka_consumer_topic: TOPIC.to_string(),
        kafka_consumer_offset_reset: "earliest".to_string(),
        kafka_consumer_auto_commit_interval_ms: 1000,
    }
}

#[tokio::test]
async fn acknowledges_only_successfully_processed_messages() {
    let (cluster, producer) = create_mock_kafka().await;
    cluster.create_topic(TOPIC, 1, 1).expect("create topic");

    send_json_to_kafka(&producer, TOPIC, Some("k"), &json!({
        "id": "fb-123",
        "memberId": "member-42",
        "providerName": "York Clinic",
        "rating": 5,
        "comment": "Great visit!",
        "submittedAt": "2025-11-11T12:00:00Z",
        "schemaVersion": 1
    }))
    .await
    .expect("produce valid event");

    // Same payload minus the required rating field
    send_json_to_kafka(&producer, TOPIC, Some("k"), &json!({
        "id": "fb-124",
        "memberId": "member-42",
        "providerName": "York Clinic",
        "comment": "Great visit!",
        "submittedAt": "2025-11-11T12:00:00Z",
        "schemaVersion": 1
    }))
    .await
    .expect("produce invalid event");

    // Null payload
    let record: FutureRecord<str, [u8]> = FutureRecord::to(TOPIC).key("k");
    producer
        .send(record, Duration::from_secs(5))
        .await
        .map_err(|(e, _)| e)
        .expect("produce empty payload");

    send_json_to_kafka(&producer, TOPIC, Some("k"), &json!({
        "id": "fb-125",
        "memberId": "member-43",
        "providerName": "York Clinic",
        "rating": 4,
        "comment": null,
        "submittedAt": "2025-11-11T13:00:00Z",
        "schemaVersion": 1
    }))
    .await
    .expect("produce second valid event");

    let consumer = SingleTopicConsumer::new(
        mock_kafka_config(cluster.bootstrap_servers()),
        mock_consumer_config("feedback-consumer-acks"),
    )
    .expect("create consumer");

    let sink = RecordingSink::default();

    // First message decodes, is observed, and only then acked
    let (payload, ack) = timeout(RECV_TIMEOUT, consumer.recv_raw())
        .await
        .expect("timed out")
        .expect("recv");
    let decoded = decode(&payload).expect("first message decodes");
    observe(&decoded, &sink, 200);
    ack.ack().expect("ack");

    // Second message fails decode; its token is dropped without acking and
    // the worker is free to move on
    let (payload, unacked) = timeout(RECV_TIMEOUT, consumer.recv_raw())
        .await
        .expect("timed out")
        .expect("recv");
    assert!(decode(&payload).is_err());
    drop(unacked);

    // Third message has no payload at all
    let err = timeout(RECV_TIMEOUT, consumer.recv_raw())
        .await
        .expect("timed out")
        .expect_err("empty payload should not decode");
    assert!(matches!(err, RecvErr::Empty));

    // Delivery continues in order: the failed messages are not retried in a
    // tight loop and the following message still processes
    let (payload, ack) = timeout(RECV_TIMEOUT, consumer.recv_raw())
        .await
        .expect("timed out")
        .expect("recv");
    let decoded = decode(&payload).expect("last message decodes");
    observe(&decoded, &sink, 200);
    ack.ack().expect("ack");

    let received = sink.received();
    assert_eq!(received.len(), 2);
    assert_eq!(received[0].id, "fb-123");
    assert_eq!(received[1].id, "fb-125");
    assert!(sink.warnings().is_empty());
}

#[tokio::test]
async fn worker_loop_observes_flags_and_shuts_down_gracefully() {
    let (cluster, producer) = create_mock_kafka().await;
    cluster.create_topic(TOPIC, 1, 1).expect("create topic");

    send_json_to_kafka(&producer, TOPIC, Some("k"), &json!({
        "id": "fb-123",
        "memberId": "member-42",
        "providerName": "York Clinic",
        "rating": 5,
        "comment": "Great visit!",
        "submittedAt": "2025-11-11T12:00:00Z",
        "schemaVersion": 1
    }))
    .await
    .expect("produce scenario A");

    send_json_to_kafka(&producer, TOPIC, Some("k"), &json!({
        "id": "fb-456",
        "memberId": "member-42",
        "providerName": "York Clinic",
        "rating": 2,
        "comment": "a".repeat(201),
        "submittedAt": "2025-11-11T12:05:00Z",
        "schemaVersion": 1
    }))
    .await
    .expect("produce scenario B");

    // Schema mismatch in the middle of the stream must not stop the worker
    send_json_to_kafka(&producer, TOPIC, Some("k"), &json!({
        "id": "fb-999",
        "unexpected": true
    }))
    .await
    .expect("produce invalid event");

    send_json_to_kafka(&producer, TOPIC, Some("k"), &json!({
        "id": "fb-125",
        "memberId": "member-43",
        "providerName": "York Clinic",
        "rating": 4,
        "comment": null,
        "submittedAt": "2025-11-11T13:00:00Z",
        "schemaVersion": 1
    }))
    .await
    .expect("produce trailing valid event");

    let consumer = SingleTopicConsumer::new(
        mock_kafka_config(cluster.bootstrap_servers()),
        mock_consumer_config("feedback-consumer-loop"),
    )
    .expect("create consumer");

    let sink = Arc::new(RecordingSink::default());
    let liveness = HealthRegistry::new("liveness");
    let shutdown = CancellationToken::new();

    let worker = Worker {
        consumer,
        sink: sink.clone(),
        liveness: liveness.register("worker-0".to_string(), Duration::from_secs(30)),
        comment_length_limit: 200,
        shutdown: shutdown.clone(),
    };
    let handle = tokio::spawn(worker.run());

    let deadline = tokio::time::Instant::now() + RECV_TIMEOUT;
    while sink.received().len() < 3 {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for events, got {:?}",
            sink.received()
        );
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    let received = sink.received();
    let ids: Vec<&str> = received.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["fb-123", "fb-456", "fb-125"]);
    // Only scenario B's oversized comment warned, exactly once
    assert_eq!(sink.warnings(), vec!["fb-456".to_string()]);

    // The worker kept reporting liveness while consuming
    assert!(liveness.get_status().healthy);

    // Cancellation is honored between messages and the worker exits cleanly
    shutdown.cancel();
    timeout(Duration::from_secs(10), handle)
        .await
        .expect("worker did not shut down")
        .expect("worker task panicked")
        .expect("worker returned an error");
}
