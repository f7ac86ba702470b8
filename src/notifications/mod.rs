mod telegram;

pub use telegram::{TelegramClient, DEFAULT_API_URL as DEFAULT_TELEGRAM_API_URL};

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Failed to send notification: {0}")]
    SendError(#[from] reqwest::Error),

    #[error("Notification service returned error: {0}")]
    ServiceError(String),

    #[error("Failed to read attachment {path}: {source}")]
    Attachment {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// An image with an HTML caption, ready for delivery
#[derive(Debug, Clone)]
pub struct PhotoMessage {
    pub photo: PathBuf,
    pub caption: String,
}

/// Delivers a rendered card to its audience
#[async_trait]
pub trait PhotoSender: Send + Sync {
    async fn send_photo(&self, message: &PhotoMessage) -> Result<(), NotificationError>;
}
