//! Shared application state for the API server.

use std::sync::Arc;

use botforge::io::job_store::JobStore;
use botforge::stages::Stages;

/// Shared state accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn JobStore>,
    /// Stage implementations each forge request runs through.
    pub stages: Arc<dyn Stages>,
}

impl AppState {
    pub fn new(store: impl JobStore + 'static, stages: impl Stages + 'static) -> Self {
        Self {
            store: Arc::new(store),
            stages: Arc::new(stages),
        }
    }
}
