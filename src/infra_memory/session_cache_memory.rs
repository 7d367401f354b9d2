use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use dashmap::DashMap;
use std::time::{Duration, Instant};

struct CachedSession {
    record: SessionRecord,
    deadline: Instant,
}

/// Process-local [`SessionCache`]. Expired entries read as a miss and are dropped lazily.
pub struct InMemorySessionCache {
    sessions: DashMap<String, CachedSession>,
    ttl: Duration,
}

impl InMemorySessionCache {
    pub fn new(ttl: Duration) -> Self {
        InMemorySessionCache {
            sessions: DashMap::new(),
            ttl,
        }
    }

    /// Number of unexpired sessions.
    pub fn live_sessions(&self) -> usize {
        let now = Instant::now();
        self.sessions
            .iter()
            .filter(|entry| entry.deadline > now)
            .count()
    }
}

#[async_trait::async_trait]
impl SessionCache for InMemorySessionCache {
    async fn get(&self, email: &str) -> Result<Option<SessionRecord>, AuthError> {
        let now = Instant::now();
        if let Some(entry) = self.sessions.get(email) {
            if entry.deadline > now {
                return Ok(Some(entry.record.clone()));
            }
        }
        // The shard guard from `get` is released by now.
        self.sessions.remove_if(email, |_, entry| entry.deadline <= now);
        Ok(None)
    }

    async fn set(
        &self,
        email: &str,
        refresh_token: &RefreshToken,
        password_hash: &str,
    ) -> Result<(), AuthError> {
        self.sessions.insert(
            email.to_string(),
            CachedSession {
                record: SessionRecord {
                    refresh_token: refresh_token.clone(),
                    password_hash: password_hash.to_string(),
                },
                deadline: Instant::now() + self.ttl,
            },
        );
        Ok(())
    }

    async fn invalidate(&self, email: &str) -> Result<(), AuthError> {
        self.sessions.remove(email);
        Ok(())
    }

    async fn ping(&self) -> Result<(), AuthError> {
        Ok(())
    }
}
