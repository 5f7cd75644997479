//! Application state
//!
//! Shared across all handlers. Every delivery is a short-lived unit of work;
//! nothing here is mutable in-process — all conversation state lives in the
//! store.

use std::sync::Arc;

use leadbot_catalog::QuizCatalog;
use leadbot_config::Settings;
use leadbot_engine::QuizEngine;
use leadbot_persistence::ConversationStore;
use leadbot_transport::MessageSender;
use metrics_exporter_prometheus::PrometheusHandle;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub store: Arc<dyn ConversationStore>,
    pub catalog: Arc<QuizCatalog>,
    pub engine: Arc<QuizEngine>,
    /// Prometheus render handle; absent when metrics failed to install.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(
        settings: Settings,
        store: Arc<dyn ConversationStore>,
        sender: Arc<dyn MessageSender>,
        catalog: QuizCatalog,
    ) -> Self {
        let settings = Arc::new(settings);
        let catalog = Arc::new(catalog);
        let engine = Arc::new(QuizEngine::new(
            store.clone(),
            sender,
            catalog.clone(),
            settings.clone(),
        ));

        Self {
            settings,
            store,
            catalog,
            engine,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
