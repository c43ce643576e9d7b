//! WhatsApp connectivity through an external gateway process.
//!
//! The gateway owns the platform session (pairing, reconnects, media upload)
//! and speaks the JSON Lines protocol from `balcao-gateway-protocol` over its
//! stdio.
//!
//! ```text
//!  ┌──────────────┐  GatewayCommand   ┌───────────────────┐  stdin   ┌─────────┐
//!  │ GatewayTrans.│ ────────────────▶ │                   │ ───────▶ │         │
//!  └──────────────┘                   │ SubprocessGateway │          │ gateway │
//!  ┌──────────────┐  GatewayEvent     │   (supervisor)    │  stdout  │ process │
//!  │ GatewayBridge│ ◀──────────────── │                   │ ◀─────── │         │
//!  └──────┬───────┘                   └───────────────────┘          └─────────┘
//!         │ InboundMessage
//!         ▼
//!     Dispatcher
//! ```

mod bridge;
mod subprocess;
mod transport;

pub use balcao_gateway_protocol::{
    AuthMethod, GatewayCommand, GatewayEvent, MediaPayload, MessageContent, MessageReceivedData,
};

pub use bridge::{GatewayBridge, PairingPrompt, PairingState};
pub use subprocess::SubprocessGateway;
pub use transport::GatewayTransport;

/// Capacity of the command and event channels.
pub const CHANNEL_CAPACITY: usize = 100;
