use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A validated feedback-submitted event, as produced on the
/// `feedback-submitted` topic.
///
/// The wire shape is a camelCase JSON document. Decoding is strict: every
/// non-optional field below must be present and type-correct, and top-level
/// fields not declared here are rejected rather than silently dropped, so
/// schema drift between producer and consumer shows up as a decode failure
/// instead of silent data loss.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FeedbackSubmittedEvent {
    pub id: String,
    pub member_id: String,
    pub provider_name: String,
    // Structural type check only, semantic bounds are downstream's concern
    pub rating: i64,
    pub comment: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub schema_version: i64,
}

#[derive(Debug, Error)]
pub enum DecodeError {
    /// Missing required field, wrong primitive type, unparseable timestamp
    /// or an undeclared top-level field. Deterministic for a given payload,
    /// so never worth retrying.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),
}

/// Decode a raw payload into a [`FeedbackSubmittedEvent`].
///
/// Pure function of the payload bytes; the schema itself is fixed at
/// compile time and shared read-only by all workers.
pub fn decode(payload: &[u8]) -> Result<FeedbackSubmittedEvent, DecodeError> {
    let event: FeedbackSubmittedEvent =
        serde_json::from_slice(payload).map_err(|e| DecodeError::SchemaMismatch(e.to_string()))?;

    if event.id.is_empty() {
        return Err(DecodeError::SchemaMismatch("empty event id".to_string()));
    }

    Ok(event)
}
