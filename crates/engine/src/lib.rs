//! Quiz engine for the lead bot
//!
//! Drives the scripted question-and-answer flow: picks the next question,
//! captures answers, tracks progress, scores the lead at completion and
//! hands the conversation to a human agent.

pub mod engine;
pub mod replies;
pub mod scoring;

pub use engine::QuizEngine;

use leadbot_persistence::StoreError;
use leadbot_transport::SendError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Send error: {0}")]
    Send(#[from] SendError),
}
