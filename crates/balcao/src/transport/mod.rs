//! Outbound messaging capability.
//!
//! The bot core only needs three primitives from the messaging platform; the
//! gateway module provides the production implementation.

mod paced;

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

pub use paced::PacedSender;

/// Error delivering through the messaging platform.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The link to the platform (gateway channel) is gone.
    #[error("transport channel closed")]
    ChannelClosed,

    /// The platform rejected the request.
    #[error("send failed ({code}): {message}")]
    Rejected { code: String, message: String },
}

/// Messaging primitives the bot relies on.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Show the "typing..." presence in a chat.
    async fn set_typing(&self, chat_id: &str) -> Result<(), TransportError>;

    async fn send_text(&self, chat_id: &str, text: &str) -> Result<(), TransportError>;

    /// Send a local file as a document, optionally with a caption.
    async fn send_media(
        &self,
        chat_id: &str,
        path: &Path,
        caption: Option<&str>,
    ) -> Result<(), TransportError>;
}
