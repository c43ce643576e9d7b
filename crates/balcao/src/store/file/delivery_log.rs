//! JSONL delivery log at a single configured path.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::store::delivery_log::{DeliveryLog, DeliveryRecord};
use crate::store::error::{StorageError, StorageResult};

/// Delivery log stored as one JSON object per line.
///
/// Appends are serialized through a mutex so concurrent background tasks
/// never interleave partial lines.
#[derive(Clone)]
pub struct FileDeliveryLog {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl FileDeliveryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn ensure_parent(&self) -> StorageResult<()> {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir)
                .await
                .map_err(|e| StorageError::file_io(dir, e)),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl DeliveryLog for FileDeliveryLog {
    async fn append(&self, record: &DeliveryRecord) -> StorageResult<()> {
        let mut line =
            serde_json::to_string(record).map_err(|e| StorageError::serialization(e.to_string()))?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        self.ensure_parent().await?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| StorageError::file_io(&self.path, e))?;

        file.write_all(line.as_bytes())
            .await
            .map_err(|e| StorageError::file_io(&self.path, e))?;
        file.flush()
            .await
            .map_err(|e| StorageError::file_io(&self.path, e))?;

        Ok(())
    }

    async fn load_recent(&self, limit: usize) -> StorageResult<Vec<DeliveryRecord>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::file_io(&self.path, e)),
        };

        let records: Vec<DeliveryRecord> = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str(line) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), error = %e, "Skipping malformed delivery record");
                    None
                }
            })
            .collect();

        let start = records.len().saturating_sub(limit);
        Ok(records[start..].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn record(item: &str, minute: u32) -> DeliveryRecord {
        DeliveryRecord {
            contact_id: "5511988887777@c.us".to_string(),
            display_name: "Maria".to_string(),
            item: item.to_string(),
            bulk: false,
            delivered_at: Utc.with_ymd_and_hms(2024, 5, 10, 15, minute, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn append_creates_parent_and_loads_in_order() {
        let tmp = TempDir::new().unwrap();
        let log = FileDeliveryLog::new(tmp.path().join("logs/catalog_requests.jsonl"));

        log.append(&record("a.pdf", 1)).await.unwrap();
        log.append(&record("b.pdf", 2)).await.unwrap();

        let records = log.load_recent(10).await.unwrap();
        assert_eq!(records, vec![record("a.pdf", 1), record("b.pdf", 2)]);
    }

    #[tokio::test]
    async fn load_recent_limits_to_tail() {
        let tmp = TempDir::new().unwrap();
        let log = FileDeliveryLog::new(tmp.path().join("deliveries.jsonl"));

        for minute in 0..5 {
            log.append(&record("c.pdf", minute)).await.unwrap();
        }

        let records = log.load_recent(2).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], record("c.pdf", 3));
        assert_eq!(records[1], record("c.pdf", 4));
    }

    #[tokio::test]
    async fn load_missing_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let log = FileDeliveryLog::new(tmp.path().join("none.jsonl"));
        assert!(log.load_recent(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_lines_are_skipped() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("deliveries.jsonl");
        let log = FileDeliveryLog::new(&path);
        log.append(&record("a.pdf", 1)).await.unwrap();

        let mut content = std::fs::read_to_string(&path).unwrap();
        content.push_str("not json\n");
        std::fs::write(&path, content).unwrap();

        assert_eq!(log.load_recent(10).await.unwrap().len(), 1);
    }
}
