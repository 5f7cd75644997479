//! Outbound message sender

use async_trait::async_trait;
use leadbot_config::WhatsAppConfig;
use std::time::Duration;

use crate::outbound::OutboundMessage;
use crate::SendError;

/// The outbound transport seam. The engine talks to this trait; tests plug
/// in a recording double.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, to: &str, message: &OutboundMessage) -> Result<(), SendError>;
}

/// Sender backed by the WhatsApp Cloud API.
pub struct CloudApiSender {
    http: reqwest::Client,
    api_base: String,
    phone_number_id: String,
    access_token: String,
}

impl CloudApiSender {
    /// Build the sender with the bounded request timeout from config.
    pub fn new(config: &WhatsAppConfig) -> Result<Self, SendError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| SendError::Config(e.to_string()))?;

        Ok(Self {
            http,
            api_base: config.api_base.clone(),
            phone_number_id: config.phone_number_id.clone(),
            access_token: config.access_token.clone(),
        })
    }
}

#[async_trait]
impl MessageSender for CloudApiSender {
    async fn send(&self, to: &str, message: &OutboundMessage) -> Result<(), SendError> {
        let url = format!("{}/{}/messages", self.api_base, self.phone_number_id);
        let body = message.api_body(to);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| SendError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            tracing::error!(
                to = %to,
                status = status.as_u16(),
                detail = %detail,
                "Message API rejected outbound send"
            );
            return Err(SendError::Api {
                status: status.as_u16(),
                detail,
            });
        }

        tracing::debug!(to = %to, kind = message.kind().as_str(), "Outbound message sent");
        Ok(())
    }
}
