use std::collections::HashMap;

use chrono::Utc;
use parking_lot::RwLock;

use crate::tprintln;

use super::credential::SessionCredential;

/// Where established sessions live. Stands in for the browser cookie jar.
pub trait SessionStore: Send + Sync {
    /// Replace any credential held for the same email.
    fn put(&self, credential: SessionCredential);
    /// Live credential for `email`; expired entries are treated as absent.
    fn get(&self, email: &str) -> Option<SessionCredential>;
    fn remove(&self, email: &str) -> bool;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool { self.len() == 0 }
}

fn key(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, SessionCredential>>,
}

impl MemorySessionStore {
    pub fn new() -> Self { Self::default() }
}

impl SessionStore for MemorySessionStore {
    fn put(&self, credential: SessionCredential) {
        tprintln!("session.put email={} expires_at={:?}", credential.email, credential.expires_at);
        self.sessions.write().insert(key(&credential.email), credential);
    }

    fn get(&self, email: &str) -> Option<SessionCredential> {
        let k = key(email);
        let now = Utc::now();
        let mut expired = false;
        let out = {
            let map = self.sessions.read();
            match map.get(&k) {
                Some(cred) if cred.is_expired(now) => { expired = true; None }
                Some(cred) => Some(cred.clone()),
                None => None,
            }
        };
        if expired {
            self.sessions.write().remove(&k);
        }
        out
    }

    fn remove(&self, email: &str) -> bool {
        let removed = self.sessions.write().remove(&key(email)).is_some();
        tprintln!("session.remove email={} removed={}", email, removed);
        removed
    }

    fn len(&self) -> usize {
        self.sessions.read().len()
    }
}
