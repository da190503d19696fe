use tracing::{info, warn};

use crate::types::FeedbackSubmittedEvent;

/// Boundary to whatever records our observations. Production wires this to
/// structured logging; tests substitute a recording implementation.
pub trait ObservationSink: Send + Sync {
    /// Info-level record of receipt, emitted once for every decoded event.
    fn event_received(&self, event: &FeedbackSubmittedEvent);

    /// Warning-level record emitted when an event's comment exceeds the
    /// configured length limit, referencing the offending event.
    fn comment_length_exceeded(&self, event_id: &str);
}

#[derive(Default)]
pub struct TracingSink;

impl ObservationSink for TracingSink {
    fn event_received(&self, event: &FeedbackSubmittedEvent) {
        info!(
            id = %event.id,
            member_id = %event.member_id,
            provider = %event.provider_name,
            rating = event.rating,
            schema_version = event.schema_version,
            "received feedback event"
        );
    }

    fn comment_length_exceeded(&self, event_id: &str) {
        warn!(id = %event_id, "received comment exceeding length limit");
    }
}
