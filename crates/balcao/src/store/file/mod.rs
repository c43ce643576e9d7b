//! File-based storage implementations.
//!
//! Append-only logs are JSON Lines files.

mod delivery_log;

pub use delivery_log::FileDeliveryLog;
