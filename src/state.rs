//! Shared application state.
//!
//! Constructed once at startup and threaded through every handler; there
//! are no process-wide globals, which keeps unit tests isolated.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::chat::ChatTransport;
use crate::config::Config;
use crate::llm::{CompletionClient, Orchestrator};
use crate::sensor::SensorReading;
use crate::store::Store;

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub chat: Arc<dyn ChatTransport>,
    pub orchestrator: Orchestrator,
    reading: RwLock<Option<SensorReading>>,
}

impl AppState {
    /// Wire up the state. Must be called within a tokio runtime (the
    /// orchestrator starts its call-queue worker here).
    pub fn new(
        config: Config,
        store: Arc<dyn Store>,
        chat: Arc<dyn ChatTransport>,
        completion: Arc<dyn CompletionClient>,
    ) -> Arc<Self> {
        let orchestrator = Orchestrator::new(
            completion,
            config.requests_per_minute,
            config.max_retries,
            config.cache_ttl(),
        );
        Arc::new(Self { config, store, chat, orchestrator, reading: RwLock::new(None) })
    }

    pub async fn latest_reading(&self) -> Option<SensorReading> {
        *self.reading.read().await
    }

    /// Replace the singleton reading wholesale.
    pub async fn set_reading(&self, reading: SensorReading) {
        *self.reading.write().await = Some(reading);
    }
}
