use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::Session;

/// Sessions shared between the dispatcher and the idle sweeper.
///
/// Both take this one lock for a whole unit of work (one inbound message, one
/// sweep), which keeps every read-then-write on a session atomic.
pub type SharedSessions = Arc<Mutex<SessionStore>>;

/// Wrap a store for sharing.
pub fn shared(store: SessionStore) -> SharedSessions {
    Arc::new(Mutex::new(store))
}

/// Number of sessions in a store, readable without taking the store lock.
///
/// Updated by every insert and removal.
#[derive(Debug, Clone, Default)]
pub struct SessionCount(Arc<AtomicUsize>);

impl SessionCount {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }

    fn set(&self, count: usize) {
        self.0.store(count, Ordering::Relaxed);
    }
}

/// In-memory map from contact id to [`Session`].
///
/// Holds no invariants of its own; callers decide what to store.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<String, Session>,
    count: SessionCount,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, contact_id: &str) -> Option<&Session> {
        self.sessions.get(contact_id)
    }

    pub fn get_mut(&mut self, contact_id: &str) -> Option<&mut Session> {
        self.sessions.get_mut(contact_id)
    }

    /// Handle that follows this store's size.
    pub fn counter(&self) -> SessionCount {
        self.count.clone()
    }

    /// Insert or replace the session of a contact.
    pub fn upsert(&mut self, contact_id: impl Into<String>, session: Session) {
        self.sessions.insert(contact_id.into(), session);
        self.count.set(self.sessions.len());
    }

    /// Remove a contact's session, returning it if it existed.
    pub fn remove(&mut self, contact_id: &str) -> Option<Session> {
        let removed = self.sessions.remove(contact_id);
        self.count.set(self.sessions.len());
        removed
    }

    /// Record inbound activity, creating the session on first contact.
    pub fn touch(&mut self, contact_id: &str, now: DateTime<Utc>) -> &mut Session {
        let is_new = !self.sessions.contains_key(contact_id);
        self.count.set(self.sessions.len() + usize::from(is_new));
        self.sessions
            .entry(contact_id.to_string())
            .and_modify(|session| session.touch(now))
            .or_insert_with(|| Session::new(now))
    }

    pub fn contact_ids(&self) -> Vec<String> {
        self.sessions.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Session)> {
        self.sessions.iter().map(|(id, s)| (id.as_str(), s))
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 9, 30, 0).unwrap()
    }

    #[test]
    fn touch_creates_then_refreshes() {
        let mut store = SessionStore::new();
        assert!(store.is_empty());

        store.touch("5511@c.us", t0()).start();
        assert_eq!(store.len(), 1);

        let later = t0() + TimeDelta::minutes(1);
        let session = store.touch("5511@c.us", later);
        assert!(session.started_by_client());
        assert_eq!(session.last_interaction_at(), later);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn remove_deletes_everything() {
        let mut store = SessionStore::new();
        store.upsert("a", Session::new(t0()));
        store.upsert("b", Session::new(t0()));

        assert!(store.remove("a").is_some());
        assert!(store.remove("a").is_none());
        assert!(store.get("a").is_none());
        assert_eq!(store.contact_ids(), vec!["b".to_string()]);
    }

    #[test]
    fn counter_follows_inserts_and_removals() {
        let mut store = SessionStore::new();
        let count = store.counter();
        assert_eq!(count.get(), 0);

        store.touch("a", t0());
        store.touch("a", t0());
        store.upsert("b", Session::new(t0()));
        assert_eq!(count.get(), 2);

        store.remove("a");
        store.remove("a");
        assert_eq!(count.get(), 1);
    }
}
