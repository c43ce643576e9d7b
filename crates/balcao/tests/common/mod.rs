//! Common test utilities.
#![allow(dead_code)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;

use balcao::background::BackgroundTasks;
use balcao::bot::{Dispatcher, DispatcherConfig, IdlePolicy, IdleSweeper, InboundMessage};
use balcao::catalog::DirCatalogRepository;
use balcao::clock::ManualClock;
use balcao::session::{self, SessionStore, SharedSessions};
use balcao::store::file::FileDeliveryLog;
use balcao::store::{DeliveryLog, DeliveryRecord, StorageError, StorageResult};
use balcao::transport::{PacedSender, Transport, TransportError};

pub const STORE_URL: &str = "https://maps.example.com/loja";

/// Friday 10:00 UTC; `ManualClock` reports this as a morning hour.
pub fn morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 10, 10, 0, 0).unwrap()
}

// ============================================================================
// Recording Transport
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Typing(String),
    Text(String, String),
    Media {
        chat_id: String,
        path: PathBuf,
        caption: Option<String>,
    },
}

/// Transport that records every call and can be told to fail.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Sent>>,
    failing_media: Mutex<HashSet<String>>,
    fail_text: Mutex<bool>,
}

impl RecordingTransport {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }

    /// Texts sent to a chat, in order.
    pub fn texts(&self, chat_id: &str) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Text(chat, text) if chat == chat_id => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Filenames of documents sent to a chat, in order.
    pub fn documents(&self, chat_id: &str) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Media { chat_id: chat, path, .. } if chat == chat_id => path
                    .file_name()
                    .map(|name| name.to_string_lossy().to_string()),
                _ => None,
            })
            .collect()
    }

    pub fn last_text(&self, chat_id: &str) -> Option<String> {
        self.texts(chat_id).pop()
    }

    /// Reject documents with this filename.
    pub fn fail_media(&self, filename: &str) {
        self.failing_media.lock().unwrap().insert(filename.to_string());
    }

    pub fn fail_text(&self, fail: bool) {
        *self.fail_text.lock().unwrap() = fail;
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn set_typing(&self, chat_id: &str) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push(Sent::Typing(chat_id.to_string()));
        Ok(())
    }

    async fn send_text(&self, chat_id: &str, text: &str) -> Result<(), TransportError> {
        if *self.fail_text.lock().unwrap() {
            return Err(TransportError::ChannelClosed);
        }
        self.sent
            .lock()
            .unwrap()
            .push(Sent::Text(chat_id.to_string(), text.to_string()));
        Ok(())
    }

    async fn send_media(
        &self,
        chat_id: &str,
        path: &Path,
        caption: Option<&str>,
    ) -> Result<(), TransportError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if self.failing_media.lock().unwrap().contains(&name) {
            return Err(TransportError::Rejected {
                code: "media_not_found".to_string(),
                message: format!("{name} not found"),
            });
        }
        self.sent.lock().unwrap().push(Sent::Media {
            chat_id: chat_id.to_string(),
            path: path.to_path_buf(),
            caption: caption.map(str::to_string),
        });
        Ok(())
    }
}

// ============================================================================
// Failing Delivery Log
// ============================================================================

/// Delivery log whose disk is always full.
pub struct FailingDeliveryLog;

#[async_trait]
impl DeliveryLog for FailingDeliveryLog {
    async fn append(&self, _record: &DeliveryRecord) -> StorageResult<()> {
        Err(StorageError::file_io(
            "/var/log/balcao/catalog_requests.jsonl",
            std::io::Error::other("no space left on device"),
        ))
    }

    async fn load_recent(&self, _limit: usize) -> StorageResult<Vec<DeliveryRecord>> {
        Ok(Vec::new())
    }
}

// ============================================================================
// Harness
// ============================================================================

/// Bot wired to a recording transport, a manual clock and temp storage.
pub struct Harness {
    pub dispatcher: Dispatcher,
    pub sessions: SharedSessions,
    pub transport: Arc<RecordingTransport>,
    pub clock: Arc<ManualClock>,
    pub delivery_log: Arc<dyn DeliveryLog>,
    pub background: BackgroundTasks,
    pub catalog_dir: PathBuf,
    _tmp: TempDir,
}

impl Harness {
    /// Catalog directory containing the given files.
    pub fn with_catalogs(files: &[&str]) -> Self {
        Self::build(Some(files), Duration::ZERO, Duration::ZERO, None)
    }

    /// Catalog directory that does not exist.
    pub fn without_catalog_dir() -> Self {
        Self::build(None, Duration::ZERO, Duration::ZERO, None)
    }

    /// Real pacing delays; pair with a paused tokio clock.
    pub fn paced(files: &[&str], typing_delay: Duration, bulk_delay: Duration) -> Self {
        Self::build(Some(files), typing_delay, bulk_delay, None)
    }

    /// Deliveries go to `delivery_log` instead of a temp file.
    pub fn with_delivery_log(files: &[&str], delivery_log: Arc<dyn DeliveryLog>) -> Self {
        Self::build(Some(files), Duration::ZERO, Duration::ZERO, Some(delivery_log))
    }

    fn build(
        files: Option<&[&str]>,
        typing_delay: Duration,
        bulk_delay: Duration,
        delivery_log: Option<Arc<dyn DeliveryLog>>,
    ) -> Self {
        let tmp = TempDir::new().unwrap();
        let catalog_dir = tmp.path().join("arquivos/PDFs");
        if let Some(files) = files {
            std::fs::create_dir_all(&catalog_dir).unwrap();
            for file in files {
                std::fs::write(catalog_dir.join(file), b"%PDF-1.4").unwrap();
            }
        }
        let delivery_log: Arc<dyn DeliveryLog> = match delivery_log {
            Some(log) => log,
            None => Arc::new(FileDeliveryLog::new(
                tmp.path().join("logs/catalog_requests.jsonl"),
            )),
        };

        let sessions = session::shared(SessionStore::new());
        let transport = Arc::new(RecordingTransport::default());
        let clock = Arc::new(ManualClock::new(morning()));
        let background = BackgroundTasks::new();

        let dispatcher = Dispatcher::new(DispatcherConfig {
            sessions: sessions.clone(),
            sender: PacedSender::new(transport.clone(), typing_delay),
            catalogs: Arc::new(DirCatalogRepository::new(&catalog_dir, "pdf")),
            delivery_log: delivery_log.clone(),
            background: background.clone(),
            clock: clock.clone(),
            bulk_delay,
            store_location_url: STORE_URL.to_string(),
        });

        Self {
            dispatcher,
            sessions,
            transport,
            clock,
            delivery_log,
            background,
            catalog_dir,
            _tmp: tmp,
        }
    }

    /// Idle sweeper sharing this harness' store, transport and clock.
    pub fn sweeper(&self) -> IdleSweeper {
        IdleSweeper::new(
            self.sessions.clone(),
            PacedSender::new(self.transport.clone(), Duration::ZERO),
            self.clock.clone(),
            IdlePolicy::default(),
        )
    }

    pub async fn say(&self, contact_id: &str, body: &str) {
        self.dispatcher
            .handle(&InboundMessage::text(contact_id, body).with_display_name("Maria Souza"))
            .await;
    }

    /// Delivery records, after waiting for pending appends.
    pub async fn deliveries(&self) -> Vec<DeliveryRecord> {
        self.background.shutdown().await;
        self.delivery_log.load_recent(100).await.unwrap()
    }
}
