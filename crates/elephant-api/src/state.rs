//! Shared application state.

use std::sync::Arc;
use std::time::Instant;

use elephant_store::Store;

use crate::config::ApiConfig;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub config: Arc<ApiConfig>,
    /// Process start, for `/health` uptime
    pub started_at: Instant,
}

impl AppState {
    pub fn new(store: Store, config: ApiConfig) -> Self {
        Self {
            store: Arc::new(store),
            config: Arc::new(config),
            started_at: Instant::now(),
        }
    }
}
