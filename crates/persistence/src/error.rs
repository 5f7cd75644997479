//! Store error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    #[error("Contact not found: {0}")]
    ContactNotFound(String),
}
