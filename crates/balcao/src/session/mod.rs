//! Per-contact conversation state.
//!
//! A [`Session`] exists from the first inbound message of a contact until the
//! contact confirms leaving or the idle sweeper closes it. Nothing here is
//! persisted; a restart starts every contact from scratch.

mod store;

use chrono::{DateTime, TimeDelta, Utc};

pub use store::{SessionCount, SessionStore, SharedSessions, shared};

/// Where a contact stands in the greeting/idle lifecycle.
///
/// The idle warning only exists for started sessions, so a warning on a
/// contact that never greeted cannot be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Engagement {
    /// Contact has written but has not greeted yet.
    #[default]
    NotStarted,
    /// Contact greeted; `warned` once the idle check-in was sent.
    Started { warned: bool },
}

/// Catalog filenames offered to a contact, in the order they were listed.
///
/// Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSelection(Vec<String>);

impl CatalogSelection {
    /// Wrap a listing, or `None` when there is nothing to offer.
    pub fn new(items: Vec<String>) -> Option<Self> {
        if items.is_empty() {
            None
        } else {
            Some(Self(items))
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Item by one-based position, as typed by the contact.
    pub fn pick(&self, position: usize) -> Option<&str> {
        position
            .checked_sub(1)
            .and_then(|index| self.0.get(index))
            .map(String::as_str)
    }

    pub fn items(&self) -> &[String] {
        &self.0
    }
}

/// Conversation state of one contact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    last_interaction_at: DateTime<Utc>,
    engagement: Engagement,
    pending_catalogs: Option<CatalogSelection>,
}

impl Session {
    /// Fresh session for a contact whose first message arrived at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            last_interaction_at: now,
            engagement: Engagement::NotStarted,
            pending_catalogs: None,
        }
    }

    pub fn last_interaction_at(&self) -> DateTime<Utc> {
        self.last_interaction_at
    }

    pub fn started_by_client(&self) -> bool {
        matches!(self.engagement, Engagement::Started { .. })
    }

    pub fn idle_warning_sent(&self) -> bool {
        matches!(self.engagement, Engagement::Started { warned: true })
    }

    pub fn pending_catalogs(&self) -> Option<&CatalogSelection> {
        self.pending_catalogs.as_ref()
    }

    /// Time since the last inbound message, clamped at zero.
    pub fn idle_for(&self, now: DateTime<Utc>) -> TimeDelta {
        (now - self.last_interaction_at).max(TimeDelta::zero())
    }

    /// Record inbound activity: refresh the timestamp and re-arm the warning.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_interaction_at = now;
        if let Engagement::Started { warned } = &mut self.engagement {
            *warned = false;
        }
    }

    /// Contact greeted. Keeps an already started session as is.
    pub fn start(&mut self) {
        if self.engagement == Engagement::NotStarted {
            self.engagement = Engagement::Started { warned: false };
        }
    }

    /// Mark the idle check-in as sent. Returns false on unstarted sessions.
    pub fn mark_warned(&mut self) -> bool {
        match &mut self.engagement {
            Engagement::Started { warned } => {
                *warned = true;
                true
            }
            Engagement::NotStarted => false,
        }
    }

    pub fn offer_catalogs(&mut self, selection: CatalogSelection) {
        self.pending_catalogs = Some(selection);
    }

    /// Drop the pending catalog selection, returning it if there was one.
    pub fn take_pending_catalogs(&mut self) -> Option<CatalogSelection> {
        self.pending_catalogs.take()
    }
}
