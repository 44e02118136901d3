//! Telegram alert service for SSH event notifications
//!
//! Sends one message per call to a chat through the Bot API `sendMessage`
//! method. There is no retry here: a failed call is reported to the caller and
//! the notification is dropped.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use crate::config::TelegramConfig;
use crate::utils::AppError;

/// Delivery seam used by the pipeline driver
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AlertSender: Send + Sync {
    /// Deliver one notification, a single attempt
    async fn send(&self, text: &str) -> Result<(), AppError>;
}

/// `sendMessage` form payload
#[derive(Debug, Serialize)]
struct SendMessageForm<'a> {
    chat_id: &'a str,
    text: &'a str,
    disable_web_page_preview: bool,
}

/// Error body returned by the Bot API
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    description: Option<String>,
}

/// Telegram Bot API client
#[derive(Debug, Clone)]
pub struct TelegramAlert {
    /// HTTP client with the request timeout applied
    client: Client,
    /// Full `sendMessage` URL; contains the bot token
    endpoint: String,
    /// Destination chat or channel
    chat_id: String,
}

impl TelegramAlert {
    /// Create a client for the configured bot and chat
    pub fn new(config: &TelegramConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::ClientBuild(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/bot{}/sendMessage",
                config.api_base.trim_end_matches('/'),
                config.bot_token
            ),
            chat_id: config.chat_id.clone(),
        })
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }
}

#[async_trait]
impl AlertSender for TelegramAlert {
    #[instrument(skip(self, text), fields(chat_id = %self.chat_id, chars = text.chars().count()))]
    async fn send(&self, text: &str) -> Result<(), AppError> {
        let form = SendMessageForm {
            chat_id: &self.chat_id,
            text,
            disable_web_page_preview: true,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                // The URL embeds the bot token
                let e = e.without_url();
                error!(error = %e, "Failed to reach Telegram API");
                AppError::delivery_transport(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ApiErrorBody>(&body)
                .ok()
                .and_then(|b| b.description)
                .unwrap_or(body);
            error!(status = %status, body = %detail, "Telegram API returned error");
            return Err(AppError::DeliveryRejected {
                status: status.as_u16(),
                body: detail,
            });
        }

        debug!("Telegram message accepted");
        Ok(())
    }
}
