//! Gateway Protocol types for communication between balcao and messaging gateways.
//!
//! A gateway is the process that actually talks to a messaging platform
//! (for balcao, a WhatsApp Web bridge). balcao never links a platform client
//! itself; it drives the gateway through this protocol.
//!
//! # Protocol Overview
//!
//! The protocol is bidirectional with JSON Lines (newline-delimited JSON) over stdio:
//!
//! - **Commands** (balcao → Gateway): deliver text, deliver a document, show typing
//! - **Events** (Gateway → balcao): inbound messages, pairing state, command results
//!
//! # Example
//!
//! ```ignore
//! use balcao_gateway_protocol::{GatewayCommand, GatewayEvent};
//!
//! let command: GatewayCommand = serde_json::from_str(&line)?;
//!
//! let event = GatewayEvent::Ready {
//!     gateway: "whatsapp".to_string(),
//!     version: "1.0.0".to_string(),
//!     capabilities: vec![],
//! };
//! println!("{}", serde_json::to_string(&event)?);
//! ```

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Commands (balcao → Gateway)
// ============================================================================

/// Commands sent from balcao to a gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayCommand {
    /// Send a text message to a chat.
    SendMessage {
        request_id: String,
        chat_id: String,
        content: String,
    },

    /// Send a document or other media to a chat.
    SendMedia {
        request_id: String,
        chat_id: String,
        media: MediaPayload,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },

    /// Show typing indicator in a chat.
    SendTyping {
        chat_id: String,
        /// Duration in seconds (0 = stop typing indicator).
        #[serde(default)]
        duration: u32,
    },

    /// Request graceful shutdown.
    Shutdown,
}

/// Media payload for the SendMedia command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum MediaPayload {
    /// Read media from a local file visible to the gateway process.
    Path {
        path: PathBuf,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
    },
}

// ============================================================================
// Events (Gateway → balcao)
// ============================================================================

/// Events sent from a gateway to balcao.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayEvent {
    /// Gateway is connected and ready to receive commands.
    Ready {
        gateway: String,
        version: String,
        #[serde(default)]
        capabilities: Vec<String>,
    },

    /// Incoming message observed in a chat.
    MessageReceived(Box<MessageReceivedData>),

    /// Command completed successfully.
    CommandOk {
        request_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message_id: Option<String>,
    },

    /// Command failed.
    CommandError {
        request_id: String,
        code: String,
        message: String,
    },

    /// Gateway-level error (not tied to a specific command).
    Error {
        code: String,
        message: String,
        /// Whether this error is fatal (gateway will shut down).
        #[serde(default)]
        fatal: bool,
    },

    /// Gateway is shutting down.
    Shutdown { reason: String },

    /// The platform session must be paired (e.g. WhatsApp QR code).
    AuthRequired { method: AuthMethod },

    /// Pairing completed.
    AuthSuccess,
}

/// Data for an incoming message event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageReceivedData {
    pub message_id: String,
    pub chat_id: String,
    pub sender: Sender,
    pub content: MessageContent,
    /// True when the message was sent from the paired account itself.
    #[serde(default)]
    pub from_me: bool,
    /// Timestamp when the message was sent (from the platform).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Sender information for incoming messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sender {
    pub id: String,
    /// Profile name as published by the contact ("push name" on WhatsApp).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Content of an incoming message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    /// Plain text message.
    Text { text: String },

    /// Media message (image, video, audio, document, sticker).
    Media {
        media_type: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },

    /// Location message.
    Location { latitude: f64, longitude: f64 },

    /// Contact card.
    Contact { name: String, phone: String },

    /// Unknown/unsupported content type.
    Unknown {
        #[serde(default)]
        raw: serde_json::Value,
    },
}

impl MessageContent {
    /// Text body, only for plain text messages.
    ///
    /// Media captions are deliberately not returned: a captioned photo is not
    /// a command.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageContent::Text { text } => Some(text),
            _ => None,
        }
    }

    /// Short kind label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            MessageContent::Text { .. } => "text",
            MessageContent::Media { .. } => "media",
            MessageContent::Location { .. } => "location",
            MessageContent::Contact { .. } => "contact",
            MessageContent::Unknown { .. } => "unknown",
        }
    }
}

/// Authentication method for gateways requiring pairing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum AuthMethod {
    /// QR code pairing (WhatsApp Web).
    QrCode {
        /// Raw QR code data (for rendering).
        qr_data: String,
        /// Seconds until QR code expires.
        expires_in: u32,
    },

    /// Pairing code entered on the phone.
    PairCode {
        code: String,
        /// Seconds until code expires.
        expires_in: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_media_wire_format() {
        let cmd = GatewayCommand::SendMedia {
            request_id: "req_001".to_string(),
            chat_id: "5511999999999@c.us".to_string(),
            media: MediaPayload::Path {
                path: PathBuf::from("/srv/catalogos/tintas.pdf"),
                mime_type: Some("application/pdf".to_string()),
            },
            caption: None,
        };

        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["type"], "send_media");
        assert_eq!(json["media"]["source"], "path");
        assert_eq!(json["media"]["path"], "/srv/catalogos/tintas.pdf");
        assert!(json.get("caption").is_none());
    }

    #[test]
    fn test_unsupported_commands_are_rejected() {
        let ping = r#"{"type":"ping","request_id":"r1"}"#;
        assert!(serde_json::from_str::<GatewayCommand>(ping).is_err());

        let url_media = r#"{"type":"send_media","request_id":"r1","chat_id":"c1","media":{"source":"url","url":"https://example.com/a.pdf"}}"#;
        assert!(serde_json::from_str::<GatewayCommand>(url_media).is_err());
    }

    #[test]
    fn test_shutdown_is_bare_tag() {
        let json = serde_json::to_string(&GatewayCommand::Shutdown).unwrap();
        assert_eq!(json, r#"{"type":"shutdown"}"#);
    }

    #[test]
    fn test_message_received_defaults() {
        let line = r#"{"type":"message_received","message_id":"m1","chat_id":"c1","sender":{"id":"c1"},"content":{"type":"text","text":"oi"}}"#;

        let event: GatewayEvent = serde_json::from_str(line).unwrap();
        match event {
            GatewayEvent::MessageReceived(data) => {
                assert!(!data.from_me);
                assert!(data.sender.display_name.is_none());
                assert_eq!(data.content.as_text(), Some("oi"));
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn test_auth_required_qr() {
        let line = r#"{"type":"auth_required","method":{"method":"qr_code","qr_data":"2@abc","expires_in":20}}"#;

        let event: GatewayEvent = serde_json::from_str(line).unwrap();
        match event {
            GatewayEvent::AuthRequired {
                method: AuthMethod::QrCode { qr_data, .. },
            } => assert_eq!(qr_data, "2@abc"),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn test_caption_is_not_text() {
        let media = MessageContent::Media {
            media_type: "image".to_string(),
            caption: Some("oi".to_string()),
        };
        assert_eq!(media.as_text(), None);
        assert_eq!(media.kind(), "media");
    }
}
