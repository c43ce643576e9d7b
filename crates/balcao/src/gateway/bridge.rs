//! Gateway event loop.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use balcao_gateway_protocol::{AuthMethod, GatewayEvent, MessageContent, MessageReceivedData};

use crate::bot::{Dispatcher, InboundBody, InboundMessage};
use crate::clock::Clock;

// ============================================================================
// Pairing State
// ============================================================================

/// Pairing challenge waiting to be completed on the phone.
#[derive(Debug, Clone, Serialize)]
pub struct PairingPrompt {
    #[serde(flatten)]
    pub method: AuthMethod,
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct PairingInner {
    connected: bool,
    prompt: Option<PairingPrompt>,
}

/// Connection and pairing status of the gateway, shared with HTTP handlers.
#[derive(Debug, Clone, Default)]
pub struct PairingState {
    inner: Arc<Mutex<PairingInner>>,
}

impl PairingState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.lock().expect("mutex poisoned").connected
    }

    /// Current pairing challenge, if the gateway is waiting for one.
    pub fn prompt(&self) -> Option<PairingPrompt> {
        self.inner.lock().expect("mutex poisoned").prompt.clone()
    }

    pub fn require_auth(&self, method: AuthMethod, issued_at: DateTime<Utc>) {
        let mut inner = self.inner.lock().expect("mutex poisoned");
        inner.connected = false;
        inner.prompt = Some(PairingPrompt { method, issued_at });
    }

    pub fn paired(&self) {
        self.inner.lock().expect("mutex poisoned").prompt = None;
    }

    pub fn set_connected(&self, connected: bool) {
        let mut inner = self.inner.lock().expect("mutex poisoned");
        inner.connected = connected;
        if connected {
            inner.prompt = None;
        }
    }
}

// ============================================================================
// Inbound Conversion
// ============================================================================

impl From<&MessageReceivedData> for InboundMessage {
    fn from(data: &MessageReceivedData) -> Self {
        let body = match &data.content {
            MessageContent::Text { text } => InboundBody::Text(text.clone()),
            other => InboundBody::Other(other.kind().to_string()),
        };

        Self {
            contact_id: data.chat_id.clone(),
            display_name: data
                .sender
                .display_name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string),
            from_me: data.from_me,
            body,
        }
    }
}

// ============================================================================
// Bridge
// ============================================================================

/// Feeds gateway events into the bot, one message at a time.
pub struct GatewayBridge {
    gateway: String,
    dispatcher: Arc<Dispatcher>,
    pairing: PairingState,
    clock: Arc<dyn Clock>,
}

impl GatewayBridge {
    pub fn new(
        gateway: impl Into<String>,
        dispatcher: Arc<Dispatcher>,
        pairing: PairingState,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            gateway: gateway.into(),
            dispatcher,
            pairing,
            clock,
        }
    }

    /// Consume events until the supervisor drops its sender.
    ///
    /// Inbound messages are queued to a single dispatch task, so each one is
    /// fully handled before the next and replies never interleave. The event
    /// loop itself never waits on the dispatcher: replies need their
    /// `command_ok` acks drained to make progress.
    pub async fn run(self, mut events: mpsc::Receiver<GatewayEvent>) {
        let (inbound, queue) = mpsc::unbounded_channel();
        let dispatch = tokio::spawn(dispatch_queue(self.dispatcher.clone(), queue));

        while let Some(event) = events.recv().await {
            self.on_event(event, &inbound);
        }

        // Let queued messages finish before reporting the stream as ended
        drop(inbound);
        if let Err(e) = dispatch.await {
            error!(gateway = %self.gateway, error = %e, "Dispatch task failed");
        }

        self.pairing.set_connected(false);
        debug!(gateway = %self.gateway, "Gateway event stream ended");
    }

    fn on_event(&self, event: GatewayEvent, inbound: &mpsc::UnboundedSender<InboundMessage>) {
        match event {
            GatewayEvent::Ready {
                gateway,
                version,
                capabilities,
            } => {
                info!(
                    gateway = %self.gateway,
                    reported_name = %gateway,
                    version = %version,
                    capabilities = ?capabilities,
                    "Gateway ready"
                );
                self.pairing.set_connected(true);
            }

            GatewayEvent::MessageReceived(data) => {
                debug!(
                    gateway = %self.gateway,
                    message_id = %data.message_id,
                    chat_id = %data.chat_id,
                    kind = data.content.kind(),
                    "Message received"
                );
                if inbound.send(InboundMessage::from(data.as_ref())).is_err() {
                    warn!(gateway = %self.gateway, "Dispatch task gone; dropping message");
                }
            }

            GatewayEvent::CommandOk {
                request_id,
                message_id,
            } => {
                debug!(
                    gateway = %self.gateway,
                    request_id = %request_id,
                    message_id = ?message_id,
                    "Command completed"
                );
            }

            GatewayEvent::CommandError {
                request_id,
                code,
                message,
            } => {
                warn!(
                    gateway = %self.gateway,
                    request_id = %request_id,
                    code = %code,
                    message = %message,
                    "Command failed"
                );
            }

            GatewayEvent::Error {
                code,
                message,
                fatal,
            } => {
                if fatal {
                    error!(gateway = %self.gateway, code = %code, message = %message, "Fatal gateway error");
                    self.pairing.set_connected(false);
                } else {
                    warn!(gateway = %self.gateway, code = %code, message = %message, "Gateway error");
                }
            }

            GatewayEvent::Shutdown { reason } => {
                info!(gateway = %self.gateway, reason = %reason, "Gateway shutdown");
                self.pairing.set_connected(false);
            }

            GatewayEvent::AuthRequired { method } => {
                match &method {
                    AuthMethod::QrCode { expires_in, .. } => {
                        info!(gateway = %self.gateway, expires_in, "Scan the QR code at GET /qr.svg to pair");
                    }
                    AuthMethod::PairCode { code, expires_in } => {
                        info!(gateway = %self.gateway, code = %code, expires_in, "Enter the pairing code on the phone");
                    }
                }
                self.pairing.require_auth(method, self.clock.now());
            }

            GatewayEvent::AuthSuccess => {
                info!(gateway = %self.gateway, "Gateway paired");
                self.pairing.paired();
            }
        }
    }
}

/// Handle queued messages one at a time until the queue closes.
async fn dispatch_queue(
    dispatcher: Arc<Dispatcher>,
    mut queue: mpsc::UnboundedReceiver<InboundMessage>,
) {
    while let Some(message) = queue.recv().await {
        dispatcher.handle(&message).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use balcao_gateway_protocol::Sender;

    fn received(content: MessageContent, display_name: Option<&str>) -> MessageReceivedData {
        MessageReceivedData {
            message_id: "m1".to_string(),
            chat_id: "5511999@c.us".to_string(),
            sender: Sender {
                id: "5511999@c.us".to_string(),
                display_name: display_name.map(str::to_string),
            },
            content,
            from_me: false,
            timestamp: None,
        }
    }

    #[test]
    fn text_message_converts() {
        let data = received(
            MessageContent::Text {
                text: "oi".to_string(),
            },
            Some(" Maria Souza "),
        );
        let message = InboundMessage::from(&data);

        assert_eq!(message.contact_id, "5511999@c.us");
        assert_eq!(message.display_name.as_deref(), Some("Maria Souza"));
        assert_eq!(message.body, InboundBody::Text("oi".to_string()));
        assert!(!message.from_me);
    }

    #[test]
    fn captioned_media_is_not_text() {
        let data = received(
            MessageContent::Media {
                media_type: "image".to_string(),
                caption: Some("1".to_string()),
            },
            Some(""),
        );
        let message = InboundMessage::from(&data);

        assert_eq!(message.body, InboundBody::Other("media".to_string()));
        assert_eq!(message.display_name, None);
    }

    #[test]
    fn pairing_prompt_lifecycle() {
        let pairing = PairingState::new();
        assert!(!pairing.is_connected());
        assert!(pairing.prompt().is_none());

        pairing.require_auth(
            AuthMethod::QrCode {
                qr_data: "2@abc".to_string(),
                expires_in: 20,
            },
            Utc::now(),
        );
        assert!(pairing.prompt().is_some());

        pairing.paired();
        assert!(pairing.prompt().is_none());

        pairing.set_connected(true);
        assert!(pairing.is_connected());
    }

    #[test]
    fn prompt_serializes_flat() {
        let prompt = PairingPrompt {
            method: AuthMethod::QrCode {
                qr_data: "2@abc".to_string(),
                expires_in: 20,
            },
            issued_at: Utc::now(),
        };
        let json = serde_json::to_value(&prompt).unwrap();
        assert_eq!(json["method"], "qr_code");
        assert_eq!(json["qr_data"], "2@abc");
        assert!(json.get("issued_at").is_some());
    }
}
