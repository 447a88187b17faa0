use std::sync::RwLock;
use std::time::Duration;

use anyhow::{Result, anyhow};
use autoscale_cuckoo_filter::CuckooFilter;
use chrono::Utc;
use moka::future::Cache;
use tracing::info;

use crate::store::UserStore;

/// Expected capacity and false-positive rate.
/// Tune these based on real user counts.
const FILTER_CAPACITY: usize = 10_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

const CACHE_CAPACITY: u64 = 50_000;
const CACHE_TTL: Duration = Duration::from_secs(86_400);

/// Username availability in three tiers: cuckoo filter (fast negative),
/// moka cache (fast positive), then the store.
pub struct UsernameIndex {
    filter: RwLock<CuckooFilter<String>>,
    taken: Cache<String, ()>,
}

#[inline]
fn normalize(username: &str) -> String {
    username.trim().to_lowercase()
}

impl UsernameIndex {
    pub fn new() -> Self {
        Self {
            filter: RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)),
            taken: Cache::builder()
                .max_capacity(CACHE_CAPACITY)
                .time_to_live(CACHE_TTL)
                .build(),
        }
    }

    /// Check if a username might exist (false positives possible)
    pub fn might_exist(&self, username: &str) -> bool {
        let username = normalize(username);
        self.filter
            .read()
            .expect("username filter poisoned")
            .contains(&username)
    }

    /// Records a username as taken in both tiers.
    pub async fn mark_taken(&self, username: &str) {
        let username = normalize(username);
        self.filter
            .write()
            .expect("username filter poisoned")
            .add(&username);
        self.taken.insert(username, ()).await;
    }

    /// Drops a freed username from the positive cache. The filter keeps it,
    /// so the next availability check falls through to the store.
    pub async fn forget(&self, username: &str) {
        self.taken.invalidate(&normalize(username)).await;
    }

    pub async fn is_available(&self, username: &str, users: &dyn UserStore) -> Result<bool> {
        // 1. filter says never seen: definitely free
        if !self.might_exist(username) {
            return Ok(true);
        }

        // 2. cached as taken
        if self.taken.contains_key(&normalize(username)) {
            return Ok(false);
        }

        // 3. store decides
        let exists = users
            .username_exists(username.trim())
            .await
            .map_err(|e| anyhow!("username lookup failed: {e}"))?;
        if exists {
            self.taken.insert(normalize(username), ()).await;
        }
        Ok(!exists)
    }

    /// Loads every username into the filter and recent logins into the cache.
    pub async fn warmup(&self, users: &dyn UserStore, recent_days: i64) -> Result<()> {
        let all = users
            .usernames()
            .await
            .map_err(|e| anyhow!("username filter warmup failed: {e}"))?;
        {
            let mut filter = self.filter.write().expect("username filter poisoned");
            for username in &all {
                filter.add(&normalize(username));
            }
        }

        let since = Utc::now() - chrono::Duration::days(recent_days);
        let recent = users
            .recent_usernames(since)
            .await
            .map_err(|e| anyhow!("username cache warmup failed: {e}"))?;
        futures::future::join_all(recent.iter().map(|u| self.taken.insert(normalize(u), ()))).await;

        info!(
            total = all.len(),
            recent = recent.len(),
            recent_days,
            "Username index warmup complete"
        );
        Ok(())
    }
}

impl Default for UsernameIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{model::role::Role, store::memory::MemoryStore};

    #[actix_web::test]
    async fn unknown_names_are_available_without_a_lookup() {
        let index = UsernameIndex::new();
        let store = MemoryStore::new();
        store.seed_user("arjuna", "x", Role::User, false);

        // never warmed: the filter vouches for absence
        assert!(index.is_available("arjuna", &store).await.unwrap());

        index.warmup(&store, 30).await.unwrap();
        assert!(!index.is_available("Arjuna", &store).await.unwrap());
        assert!(index.is_available("bima", &store).await.unwrap());
    }

    #[actix_web::test]
    async fn marked_names_are_taken() {
        let index = UsernameIndex::new();
        let store = MemoryStore::new();
        index.mark_taken("Nakula").await;
        assert!(index.might_exist("nakula"));
        assert!(!index.is_available("nakula", &store).await.unwrap());
    }

    #[actix_web::test]
    async fn forgotten_names_fall_back_to_the_store() {
        let index = UsernameIndex::new();
        let store = MemoryStore::new();
        index.mark_taken("sadewa").await;
        assert!(!index.is_available("sadewa", &store).await.unwrap());

        index.forget("Sadewa").await;
        assert!(index.might_exist("sadewa"));
        assert!(index.is_available("sadewa", &store).await.unwrap());
    }
}
