//! Lead bot server
//!
//! Webhook endpoint, message router and application state.

pub mod http;
pub mod metrics;
pub mod router;
pub mod state;

pub use http::create_router;
pub use self::metrics::init_metrics;
pub use state::AppState;

use leadbot_engine::EngineError;
use leadbot_persistence::StoreError;
use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ServerError> for axum::http::StatusCode {
    fn from(err: ServerError) -> Self {
        // Any internal failure asks the platform to redeliver; the
        // idempotency gate makes the retry safe.
        match err {
            ServerError::Store(_) | ServerError::Engine(_) | ServerError::Internal(_) => {
                axum::http::StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
