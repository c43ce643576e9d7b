//! Turns one inbound message into session updates and replies.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::command::{ClassifyContext, Command, MenuOption, classify};
use super::replies;
use crate::background::BackgroundTasks;
use crate::catalog::{CatalogError, CatalogRepository};
use crate::clock::Clock;
use crate::session::{CatalogSelection, SessionStore, SharedSessions};
use crate::store::{DeliveryLog, DeliveryRecord};
use crate::transport::{PacedSender, TransportError};

// ============================================================================
// Inbound Message
// ============================================================================

/// Message as seen by the bot, independent of the platform.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Chat the message came from; replies go back here.
    pub contact_id: String,
    pub display_name: Option<String>,
    /// Sent by the paired account itself.
    pub from_me: bool,
    pub body: InboundBody,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundBody {
    Text(String),
    /// Anything else (media, location, contact card...), by kind label.
    Other(String),
}

impl InboundMessage {
    /// Text message from a contact.
    pub fn text(contact_id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            contact_id: contact_id.into(),
            display_name: None,
            from_me: false,
            body: InboundBody::Text(body.into()),
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Everything the dispatcher needs.
pub struct DispatcherConfig {
    pub sessions: SharedSessions,
    pub sender: PacedSender,
    pub catalogs: Arc<dyn CatalogRepository>,
    pub delivery_log: Arc<dyn DeliveryLog>,
    pub background: BackgroundTasks,
    pub clock: Arc<dyn Clock>,
    /// Pause between documents in a "send all" delivery.
    pub bulk_delay: Duration,
    pub store_location_url: String,
}

/// Menu state machine for inbound messages.
///
/// Callers must not run two `handle` calls for the same store concurrently
/// if they care about reply ordering; the store lock keeps state consistent
/// either way.
pub struct Dispatcher {
    sessions: SharedSessions,
    sender: PacedSender,
    catalogs: Arc<dyn CatalogRepository>,
    delivery_log: Arc<dyn DeliveryLog>,
    background: BackgroundTasks,
    clock: Arc<dyn Clock>,
    bulk_delay: Duration,
    store_location_url: String,
}

impl Dispatcher {
    pub fn new(config: DispatcherConfig) -> Self {
        Self {
            sessions: config.sessions,
            sender: config.sender,
            catalogs: config.catalogs,
            delivery_log: config.delivery_log,
            background: config.background,
            clock: config.clock,
            bulk_delay: config.bulk_delay,
            store_location_url: config.store_location_url,
        }
    }

    /// Handle one inbound message. Never fails; delivery errors are logged.
    pub async fn handle(&self, message: &InboundMessage) {
        let InboundBody::Text(body) = &message.body else {
            debug!(contact_id = %message.contact_id, "Ignoring non-text message");
            return;
        };
        if message.from_me {
            debug!(contact_id = %message.contact_id, "Ignoring message sent by this account");
            return;
        }

        // Held for the whole message, replies included, so the sweeper never
        // sees a half-applied transition.
        let mut sessions = self.sessions.lock().await;
        let session = sessions.touch(&message.contact_id, self.clock.now());
        let command = classify(body, ClassifyContext::of(session));

        debug!(contact_id = %message.contact_id, command = ?command, "Classified message");

        if let Err(e) = self.execute(&mut sessions, message, command).await {
            warn!(
                contact_id = %message.contact_id,
                command = ?command,
                error = %e,
                "Failed to deliver reply"
            );
        }
    }

    async fn execute(
        &self,
        sessions: &mut SessionStore,
        message: &InboundMessage,
        command: Command,
    ) -> Result<(), TransportError> {
        let contact_id = message.contact_id.as_str();

        match command {
            Command::Greeting => {
                if let Some(session) = sessions.get_mut(contact_id) {
                    session.start();
                    if session.take_pending_catalogs().is_some() {
                        debug!(contact_id = %contact_id, "Discarded pending catalog selection");
                    }
                }
                self.send_menu(message).await
            }
            Command::Terminate => self.sender.say(contact_id, replies::CONFIRM_EXIT).await,
            Command::ConfirmTerminate => {
                if sessions.remove(contact_id).is_some() {
                    info!(contact_id = %contact_id, "Session closed by contact");
                }
                self.sender.say(contact_id, replies::SESSION_CLOSED).await
            }
            Command::NeedsGreeting => self.sender.say(contact_id, replies::GREET_FIRST).await,
            Command::CatalogAll => self.deliver_all(sessions, message).await,
            Command::CatalogSelect(position) => {
                self.deliver_one(sessions, message, position).await
            }
            Command::InvalidSelection => {
                self.sender.say(contact_id, replies::INVALID_CATALOG).await
            }
            Command::Menu(option) => self.menu_option(sessions, contact_id, option).await,
            Command::InvalidOption => self.sender.say(contact_id, replies::INVALID_OPTION).await,
            Command::Unrecognized => Ok(()),
        }
    }

    async fn menu_option(
        &self,
        sessions: &mut SessionStore,
        contact_id: &str,
        option: MenuOption,
    ) -> Result<(), TransportError> {
        let reply = match option {
            MenuOption::Seller => replies::SELLER.to_string(),
            MenuOption::Billing => replies::BILLING.to_string(),
            MenuOption::Careers => replies::CAREERS.to_string(),
            MenuOption::Offers => replies::OFFERS.to_string(),
            MenuOption::StoreLocation => replies::store_location(&self.store_location_url),
            MenuOption::Catalogs => return self.offer_catalogs(sessions, contact_id).await,
        };
        self.sender.say(contact_id, &reply).await
    }

    async fn offer_catalogs(
        &self,
        sessions: &mut SessionStore,
        contact_id: &str,
    ) -> Result<(), TransportError> {
        let items = match self.catalogs.list().await {
            Ok(items) => items,
            Err(e) => {
                warn!(
                    contact_id = %contact_id,
                    location = %self.catalogs.location().display(),
                    error = %e,
                    "Catalog listing unavailable"
                );
                let reply = match e {
                    CatalogError::DirectoryMissing { .. } | CatalogError::Io { .. } => {
                        replies::CATALOG_DIR_MISSING
                    }
                };
                return self.sender.say(contact_id, reply).await;
            }
        };

        let Some(selection) = CatalogSelection::new(items) else {
            return self.sender.say(contact_id, replies::NO_CATALOGS).await;
        };

        let listing = replies::catalog_listing(selection.items());
        debug!(contact_id = %contact_id, count = selection.len(), "Offering catalogs");
        if let Some(session) = sessions.get_mut(contact_id) {
            session.offer_catalogs(selection);
        }
        self.sender.say(contact_id, &listing).await
    }

    async fn deliver_all(
        &self,
        sessions: &mut SessionStore,
        message: &InboundMessage,
    ) -> Result<(), TransportError> {
        let contact_id = message.contact_id.as_str();
        let Some(items) = pending_items(sessions, contact_id) else {
            return Ok(());
        };

        self.sender.say(contact_id, replies::SENDING_ALL).await?;

        for item in &items {
            let path = self.catalogs.path_of(item);
            match self
                .sender
                .send_document(contact_id, &path, &replies::bulk_caption(item))
                .await
            {
                Ok(()) => self.record_delivery(message, item, true),
                Err(e) => warn!(
                    contact_id = %contact_id,
                    item = %item,
                    error = %e,
                    "Failed to send catalog"
                ),
            }
            tokio::time::sleep(self.bulk_delay).await;
        }

        clear_pending(sessions, contact_id);

        self.sender.say(contact_id, replies::ALL_SENT).await?;
        self.send_menu(message).await
    }

    async fn deliver_one(
        &self,
        sessions: &mut SessionStore,
        message: &InboundMessage,
        position: usize,
    ) -> Result<(), TransportError> {
        let contact_id = message.contact_id.as_str();
        let Some(item) = sessions
            .get(contact_id)
            .and_then(|s| s.pending_catalogs())
            .and_then(|s| s.pick(position))
            .map(str::to_string)
        else {
            return self.sender.say(contact_id, replies::INVALID_CATALOG).await;
        };

        self.sender.say(contact_id, replies::PROCESSING).await?;
        let path = self.catalogs.path_of(&item);
        self.sender
            .send_document(contact_id, &path, &replies::single_caption(&item))
            .await?;
        self.record_delivery(message, &item, false);

        clear_pending(sessions, contact_id);

        self.sender.say(contact_id, replies::RETURNING).await?;
        self.send_menu(message).await
    }

    async fn send_menu(&self, message: &InboundMessage) -> Result<(), TransportError> {
        let menu = replies::main_menu(
            replies::salutation(self.clock.local_hour()),
            replies::first_name(message.display_name.as_deref()),
        );
        self.sender.say(&message.contact_id, &menu).await
    }

    /// Log a delivered catalog without waiting on the disk.
    fn record_delivery(&self, message: &InboundMessage, item: &str, bulk: bool) {
        let record = DeliveryRecord {
            contact_id: message.contact_id.clone(),
            display_name: message.display_name.clone().unwrap_or_default(),
            item: item.to_string(),
            bulk,
            delivered_at: self.clock.now(),
        };

        info!(
            contact_id = %record.contact_id,
            display_name = %record.display_name,
            item = %record.item,
            bulk = record.bulk,
            delivered_at = %record.delivered_at,
            "Catalog delivered"
        );

        let log = self.delivery_log.clone();
        self.background.spawn(async move {
            if let Err(e) = log.append(&record).await {
                warn!(contact_id = %record.contact_id, error = %e, "Failed to append delivery log");
            }
        });
    }
}

fn pending_items(sessions: &SessionStore, contact_id: &str) -> Option<Vec<String>> {
    sessions
        .get(contact_id)
        .and_then(|s| s.pending_catalogs())
        .map(|s| s.items().to_vec())
}

fn clear_pending(sessions: &mut SessionStore, contact_id: &str) {
    if let Some(session) = sessions.get_mut(contact_id) {
        session.take_pending_catalogs();
    }
}
