//! In-memory session store.
//!
//! Keyed by opaque session id; each record sits behind its own
//! `tokio::sync::Mutex`, so handlers lock one session for a whole
//! check-then-mutate sequence without serializing unrelated sessions.
//! The nonce-check-then-clear during verification relies on exactly this:
//! two concurrent verifications of the same session cannot both observe an
//! unconsumed nonce.

use crate::auth::session::generate_session_id;
use crate::models::SessionRecord;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<Mutex<SessionRecord>>>>,
    session_ttl: Duration,
}

impl SessionStore {
    pub fn new(session_ttl_secs: u64) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            session_ttl: Duration::seconds(session_ttl_secs as i64),
        }
    }

    /// Resolve a request's session id into a live record.
    ///
    /// A known id returns its existing record, reset in place if the session
    /// has expired. Absent or unknown ids get a freshly generated id: a
    /// client-supplied value is never adopted as a store key, so a client
    /// cannot fixate a session id of its choosing.
    pub async fn resolve(&self, id: Option<&str>) -> (String, Arc<Mutex<SessionRecord>>) {
        let now = Utc::now();

        if let Some(id) = id {
            let existing = self.sessions.read().await.get(id).cloned();
            if let Some(record) = existing {
                let mut guard = record.lock().await;
                if guard.is_expired(now) {
                    *guard = SessionRecord::new(now, self.session_ttl);
                }
                drop(guard);
                return (id.to_string(), record);
            }
        }

        let id = generate_session_id();
        let record = Arc::new(Mutex::new(SessionRecord::new(now, self.session_ttl)));
        self.sessions
            .write()
            .await
            .insert(id.clone(), record.clone());
        (id, record)
    }
}
