//! Bounded, TTL-evicting cache mapping user ids to display emails.
//!
//! The admin log viewers enrich every row with the actor's email; this
//! cache keeps that to at most one lookup per user per TTL window. It
//! is owned by the application state, not a process-wide global.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use sqlx::PgPool;

use crate::repositories::user as user_repo;
use crate::types::UserId;

#[derive(Debug, Clone)]
struct CachedEmail {
    email: String,
    cached_at: Instant,
}

#[derive(Debug)]
pub struct EmailCache {
    entries: Mutex<HashMap<UserId, CachedEmail>>,
    capacity: usize,
    ttl: Duration,
}

impl EmailCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity,
            ttl,
        }
    }

    /// Resolves a user id to a display email: cache, then the users
    /// table, then a truncated id string. Lookup failures degrade to
    /// the truncated form and are only logged.
    pub async fn resolve(&self, pool: &PgPool, user_id: UserId) -> String {
        if let Some(email) = self.get(user_id) {
            return email;
        }

        match user_repo::fetch_email(pool, user_id).await {
            Ok(Some(email)) => {
                self.insert(user_id, email.clone());
                email
            }
            Ok(None) => truncated_id(user_id),
            Err(err) => {
                tracing::warn!(error = ?err, user_id = %user_id, "email lookup failed");
                truncated_id(user_id)
            }
        }
    }

    fn get(&self, user_id: UserId) -> Option<String> {
        let entries = self.entries.lock().expect("email cache lock");
        entries
            .get(&user_id)
            .filter(|entry| entry.cached_at.elapsed() < self.ttl)
            .map(|entry| entry.email.clone())
    }

    fn insert(&self, user_id: UserId, email: String) {
        let mut entries = self.entries.lock().expect("email cache lock");
        if entries.len() >= self.capacity {
            let ttl = self.ttl;
            entries.retain(|_, entry| entry.cached_at.elapsed() < ttl);
        }
        if entries.len() >= self.capacity {
            // Still full after dropping expired entries: evict the oldest.
            if let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, entry)| entry.cached_at)
                .map(|(id, _)| *id)
            {
                entries.remove(&oldest);
            }
        }
        entries.insert(
            user_id,
            CachedEmail {
                email,
                cached_at: Instant::now(),
            },
        );
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.lock().expect("email cache lock").len()
    }
}

fn truncated_id(user_id: UserId) -> String {
    let s = user_id.to_string();
    format!("{}...", &s[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_returns_fresh_entries_only() {
        let cache = EmailCache::new(4, Duration::from_millis(20));
        let id = UserId::new();
        cache.insert(id, "a@example.com".into());
        assert_eq!(cache.get(id).as_deref(), Some("a@example.com"));

        std::thread::sleep(Duration::from_millis(30));
        assert!(cache.get(id).is_none());
    }

    #[test]
    fn insert_evicts_oldest_when_full() {
        let cache = EmailCache::new(2, Duration::from_secs(60));
        let first = UserId::new();
        let second = UserId::new();
        let third = UserId::new();

        cache.insert(first, "first@example.com".into());
        std::thread::sleep(Duration::from_millis(2));
        cache.insert(second, "second@example.com".into());
        std::thread::sleep(Duration::from_millis(2));
        cache.insert(third, "third@example.com".into());

        assert_eq!(cache.len(), 2);
        assert!(cache.get(first).is_none());
        assert!(cache.get(second).is_some());
        assert!(cache.get(third).is_some());
    }

    #[test]
    fn truncated_id_keeps_first_eight_chars() {
        let id = UserId::new();
        let display = truncated_id(id);
        assert!(display.ends_with("..."));
        assert_eq!(display.len(), 11);
        assert!(id.to_string().starts_with(&display[..8]));
    }
}
