//! WhatsApp Cloud API transport
//!
//! Wire types for the inbound webhook, the closed set of outbound payloads,
//! and the [`MessageSender`] seam with its HTTP implementation.

pub mod outbound;
pub mod sender;
pub mod webhook;

pub use outbound::{ButtonOption, ListRow, OutboundMessage};
pub use sender::{CloudApiSender, MessageSender};
pub use webhook::{
    DeliveryStatus, InteractiveReply, MessageBody, RoutingData, WebhookBody, WebhookContact,
    WebhookMessage, WebhookValue,
};

use thiserror::Error;

/// Outbound send errors
#[derive(Error, Debug)]
pub enum SendError {
    #[error("Invalid sender configuration: {0}")]
    Config(String),

    #[error("HTTP transport error: {0}")]
    Transport(String),

    #[error("Message API rejected the send ({status}): {detail}")]
    Api { status: u16, detail: String },
}
