use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;

use super::{NotificationError, PhotoMessage, PhotoSender};

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Client for the Telegram Bot API
/// https://core.telegram.org/bots/api#sendphoto
pub struct TelegramClient {
    client: Client,
    api_url: String,
    bot_token: String,
    chat_id: String,
}

#[derive(Debug, Deserialize)]
struct BotApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramClient {
    pub fn new(client: Client, api_url: &str, bot_token: &str, chat_id: &str) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            bot_token: bot_token.to_string(),
            chat_id: chat_id.to_string(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.bot_token, method)
    }
}

#[async_trait]
impl PhotoSender for TelegramClient {
    async fn send_photo(&self, message: &PhotoMessage) -> Result<(), NotificationError> {
        let bytes = tokio::fs::read(&message.photo)
            .await
            .map_err(|source| NotificationError::Attachment {
                path: message.photo.display().to_string(),
                source,
            })?;

        let file_name = message
            .photo
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("forecast.png")
            .to_string();

        let photo = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("image/png")?;

        let form = Form::new()
            .text("chat_id", self.chat_id.clone())
            .text("caption", message.caption.clone())
            .text("parse_mode", "HTML")
            .part("photo", photo);

        // Never log the URL, it carries the bot token
        tracing::debug!(chat_id = %self.chat_id, "Sending Telegram photo");

        let response = self
            .client
            .post(self.method_url("sendPhoto"))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let parsed: Option<BotApiResponse> = serde_json::from_str(&body).ok();

        if !status.is_success() {
            let reason = parsed
                .and_then(|r| r.description)
                .unwrap_or(body);
            return Err(NotificationError::ServiceError(format!(
                "Telegram returned {}: {}",
                status, reason
            )));
        }

        match parsed {
            Some(BotApiResponse { ok: true, .. }) => {
                tracing::info!(chat_id = %self.chat_id, "Sent photo via Telegram");
                Ok(())
            }
            Some(BotApiResponse { description, .. }) => Err(NotificationError::ServiceError(
                description.unwrap_or_else(|| "Telegram rejected the request".to_string()),
            )),
            None => Err(NotificationError::ServiceError(format!(
                "Unexpected Telegram response: {}",
                body
            ))),
        }
    }
}
