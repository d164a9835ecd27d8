#![cfg(feature = "web")]

use crate::table::AssetTable;
use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, SystemTime};
use uuid::Uuid;

/// Name of the cookie carrying the session id
pub const SESSION_COOKIE: &str = "session";

/// One browser's uploaded workbook
#[derive(Debug, Clone)]
pub struct Session {
    pub file_name: String,
    pub table: Arc<AssetTable>,
    pub expires_at: SystemTime,
}

/// Uploaded tables keyed by session id
///
/// Each session holds its own immutable table; handlers take an `Arc` snapshot
/// and never write through it.
#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        SessionStore {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Stores a table under a fresh session id and returns the id
    pub fn create(&self, file_name: &str, table: AssetTable) -> String {
        let session_id = Uuid::new_v4().to_string();
        self.replace(&session_id, file_name, table);
        session_id
    }

    /// Stores a table under an existing id, dropping the previous upload
    pub fn replace(&self, session_id: &str, file_name: &str, table: AssetTable) {
        let now = SystemTime::now();
        let session = Session {
            file_name: file_name.to_string(),
            table: Arc::new(table),
            expires_at: now + self.ttl,
        };

        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions.retain(|_, s| s.expires_at > now);
        sessions.insert(session_id.to_string(), session);
        debug!("{} active sessions", sessions.len());
    }

    /// Returns the session if it exists and has not expired
    pub fn get(&self, session_id: &str) -> Option<Session> {
        let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
        sessions
            .get(session_id)
            .filter(|session| session.expires_at > SystemTime::now())
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
