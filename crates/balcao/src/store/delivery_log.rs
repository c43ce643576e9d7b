//! Record of catalogs delivered to contacts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::StorageResult;

/// One catalog handed to one contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub contact_id: String,
    pub display_name: String,
    /// Catalog filename.
    pub item: String,
    /// True when the item went out as part of a "send all" request.
    #[serde(default)]
    pub bulk: bool,
    pub delivered_at: DateTime<Utc>,
}

/// Append-only log of catalog deliveries.
///
/// Writes are best effort: callers log failures and move on.
#[async_trait]
pub trait DeliveryLog: Send + Sync {
    async fn append(&self, record: &DeliveryRecord) -> StorageResult<()>;

    /// Most recent `limit` records in chronological order.
    async fn load_recent(&self, limit: usize) -> StorageResult<Vec<DeliveryRecord>>;
}
