pub const MESSAGES_RECEIVED: &str = "feedback_consumer_messages_received";
pub const MESSAGES_PROCESSED: &str = "feedback_consumer_messages_processed";
pub const DECODE_FAILURES: &str = "feedback_consumer_decode_failures";
pub const EMPTY_PAYLOADS: &str = "feedback_consumer_empty_payloads";
pub const OVERSIZED_COMMENTS: &str = "feedback_consumer_oversized_comments";
