use std::sync::Arc;

use health::HealthRegistry;

use crate::sink::{ObservationSink, TracingSink};

pub struct AppContext {
    pub liveness: HealthRegistry,
    pub sink: Arc<dyn ObservationSink>,
}

impl AppContext {
    pub fn new() -> Self {
        Self {
            liveness: HealthRegistry::new("liveness"),
            sink: Arc::new(TracingSink),
        }
    }
}

impl Default for AppContext {
    fn default() -> Self {
        Self::new()
    }
}
