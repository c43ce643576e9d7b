//! Customer service bot: menu dispatch and idle handling.
//!
//! # Conversation lifecycle
//!
//! ```text
//!   (absent) ──any text──▶ not started ──greeting──▶ started ──3 min idle──▶ warned
//!       ▲                                              │  ▲                    │
//!       │                                              │  └────any text────────┘
//!       └──────────── "sim" or 10 min idle ────────────┴───────────────────────┘
//! ```
//!
//! While started, choosing option 6 opens the catalog selection; a valid
//! pick, `0` (all), or a new greeting leaves it.

pub mod command;
mod dispatcher;
pub mod replies;
mod sweeper;

pub use command::{ClassifyContext, Command, MenuOption, classify};
pub use dispatcher::{Dispatcher, DispatcherConfig, InboundBody, InboundMessage};
pub use sweeper::{IdleAction, IdlePolicy, IdleSweeper, SweepReport};
