use std::sync::Arc;

use bucketgate_storage::provider::ObjectStore;

/// Shared, read-only handler context built once at startup.
pub struct AppState {
    pub store: Arc<dyn ObjectStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }
}
