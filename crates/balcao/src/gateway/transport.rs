use std::path::Path;

use async_trait::async_trait;
use tokio::sync::mpsc;

use balcao_gateway_protocol::{GatewayCommand, MediaPayload};

use crate::transport::{Transport, TransportError};

/// How long the typing indicator is requested for, in seconds.
const TYPING_SECONDS: u32 = 5;

/// [`Transport`] that forwards commands to the gateway.
///
/// Sends complete once the command is queued; platform-side failures come
/// back later as `command_error` events and are only logged.
#[derive(Clone)]
pub struct GatewayTransport {
    commands: mpsc::Sender<GatewayCommand>,
}

impl GatewayTransport {
    pub fn new(commands: mpsc::Sender<GatewayCommand>) -> Self {
        Self { commands }
    }

    async fn submit(&self, command: GatewayCommand) -> Result<(), TransportError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| TransportError::ChannelClosed)
    }
}

#[async_trait]
impl Transport for GatewayTransport {
    async fn set_typing(&self, chat_id: &str) -> Result<(), TransportError> {
        self.submit(GatewayCommand::SendTyping {
            chat_id: chat_id.to_string(),
            duration: TYPING_SECONDS,
        })
        .await
    }

    async fn send_text(&self, chat_id: &str, text: &str) -> Result<(), TransportError> {
        self.submit(GatewayCommand::SendMessage {
            request_id: ulid::Ulid::new().to_string(),
            chat_id: chat_id.to_string(),
            content: text.to_string(),
        })
        .await
    }

    async fn send_media(
        &self,
        chat_id: &str,
        path: &Path,
        caption: Option<&str>,
    ) -> Result<(), TransportError> {
        self.submit(GatewayCommand::SendMedia {
            request_id: ulid::Ulid::new().to_string(),
            chat_id: chat_id.to_string(),
            media: MediaPayload::Path {
                path: path.to_path_buf(),
                mime_type: mime_type_for(path).map(str::to_string),
            },
            caption: caption.map(str::to_string),
        })
        .await
    }
}

/// MIME type for the document kinds stores usually publish.
fn mime_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    Some(match ext.as_str() {
        "pdf" => "application/pdf",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn text_becomes_send_message() {
        let (tx, mut rx) = mpsc::channel(4);
        let transport = GatewayTransport::new(tx);

        transport.send_text("5511@c.us", "olá").await.unwrap();

        match rx.recv().await {
            Some(GatewayCommand::SendMessage {
                request_id,
                chat_id,
                content,
            }) => {
                assert!(!request_id.is_empty());
                assert_eq!(chat_id, "5511@c.us");
                assert_eq!(content, "olá");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[tokio::test]
    async fn media_is_sent_by_path_with_mime() {
        let (tx, mut rx) = mpsc::channel(4);
        let transport = GatewayTransport::new(tx);

        transport
            .send_media("c1", Path::new("/srv/PDFs/Tintas.PDF"), Some("📎 *Tintas.PDF*"))
            .await
            .unwrap();

        match rx.recv().await {
            Some(GatewayCommand::SendMedia { media, caption, .. }) => {
                assert_eq!(caption.as_deref(), Some("📎 *Tintas.PDF*"));
                let MediaPayload::Path { path, mime_type } = media;
                assert_eq!(path, PathBuf::from("/srv/PDFs/Tintas.PDF"));
                assert_eq!(mime_type.as_deref(), Some("application/pdf"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[tokio::test]
    async fn typing_uses_fixed_duration() {
        let (tx, mut rx) = mpsc::channel(4);
        GatewayTransport::new(tx).set_typing("c1").await.unwrap();

        assert!(matches!(
            rx.recv().await,
            Some(GatewayCommand::SendTyping { duration: TYPING_SECONDS, .. })
        ));
    }

    #[tokio::test]
    async fn closed_channel_is_reported() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let err = GatewayTransport::new(tx).send_text("c1", "x").await.unwrap_err();
        assert!(matches!(err, TransportError::ChannelClosed));
    }

    #[test]
    fn unknown_extensions_have_no_mime() {
        assert_eq!(mime_type_for(Path::new("a.bin")), None);
        assert_eq!(mime_type_for(Path::new("noext")), None);
        assert_eq!(mime_type_for(Path::new("a.JPG")), Some("image/jpeg"));
    }
}
