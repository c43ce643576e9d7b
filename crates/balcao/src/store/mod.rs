//! Storage interfaces and their file-based implementations.

pub mod delivery_log;
pub mod error;
pub mod file;

pub use delivery_log::{DeliveryLog, DeliveryRecord};
pub use error::{StorageError, StorageResult};
