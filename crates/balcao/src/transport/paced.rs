use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use super::{Transport, TransportError};

/// Sends replies the way a person would: typing indicator, a pause, then the
/// message.
///
/// The pause also throttles bursts, which keeps the platform from flagging
/// the account.
#[derive(Clone)]
pub struct PacedSender {
    transport: Arc<dyn Transport>,
    typing_delay: Duration,
}

impl PacedSender {
    pub fn new(transport: Arc<dyn Transport>, typing_delay: Duration) -> Self {
        Self {
            transport,
            typing_delay,
        }
    }

    /// Typing indicator, default pause, text.
    pub async fn say(&self, chat_id: &str, text: &str) -> Result<(), TransportError> {
        self.say_after(chat_id, text, self.typing_delay).await
    }

    /// Typing indicator, custom pause, text.
    pub async fn say_after(
        &self,
        chat_id: &str,
        text: &str,
        delay: Duration,
    ) -> Result<(), TransportError> {
        self.transport.set_typing(chat_id).await?;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.transport.send_text(chat_id, text).await
    }

    /// Send a document right away, without typing presence.
    pub async fn send_document(
        &self,
        chat_id: &str,
        path: &Path,
        caption: &str,
    ) -> Result<(), TransportError> {
        self.transport.send_media(chat_id, path, Some(caption)).await
    }

    /// Send text right away, without typing presence.
    pub async fn notify(&self, chat_id: &str, text: &str) -> Result<(), TransportError> {
        self.transport.send_text(chat_id, text).await
    }
}
