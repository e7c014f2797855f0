//! Bounded TTL cache for embedding and chat responses
//!
//! Entries live for a fixed TTL. Once the cache is full, an insert first drops
//! every expired entry and, if that frees nothing, the entry closest to expiry.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

const DEFAULT_TTL: Duration = Duration::from_secs(3600);
const DEFAULT_CAPACITY: usize = 1024;

struct Slot {
    value: String,
    expires_at: Instant,
}

/// Response cache shared by one provider client
pub struct ResponseCache {
    entries: RwLock<HashMap<String, Slot>>,
    ttl: Duration,
    capacity: usize,
}

impl ResponseCache {
    /// One hour TTL, 1024 entries
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_TTL, DEFAULT_CAPACITY)
    }

    pub fn with_limits(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            capacity: capacity.max(1),
        }
    }

    /// Live value for `key`, if any
    pub fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().ok()?;
        entries
            .get(key)
            .filter(|slot| Instant::now() < slot.expires_at)
            .map(|slot| slot.value.clone())
    }

    pub fn insert(&self, key: String, value: String) {
        let Ok(mut entries) = self.entries.write() else {
            return;
        };
        let now = Instant::now();

        if entries.len() >= self.capacity && !entries.contains_key(&key) {
            let before = entries.len();
            entries.retain(|_, slot| now < slot.expires_at);
            if entries.len() >= self.capacity {
                let soonest = entries
                    .iter()
                    .min_by_key(|(_, slot)| slot.expires_at)
                    .map(|(k, _)| k.clone());
                if let Some(evicted) = soonest {
                    entries.remove(&evicted);
                }
            }
            tracing::debug!("Response cache evicted {} entries", before - entries.len());
        }

        entries.insert(
            key,
            Slot {
                value,
                expires_at: now + self.ttl,
            },
        );
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

fn digest(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

/// Key for one embedded text under `model`
pub fn embedding_cache_key(model: &str, text: &str) -> String {
    format!("embed:{}", digest(&[model, text]))
}

/// Key for one structured completion
pub fn chat_cache_key(model: &str, schema_name: &str, messages: &str) -> String {
    format!("chat:{}:{}", schema_name, digest(&[model, schema_name, messages]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn len(cache: &ResponseCache) -> usize {
        cache.entries.read().unwrap().len()
    }

    #[test]
    fn test_get_returns_live_values() {
        let cache = ResponseCache::new();
        cache.insert("naruto".to_string(), "[0.1,0.2]".to_string());

        assert_eq!(cache.get("naruto").as_deref(), Some("[0.1,0.2]"));
        assert_eq!(cache.get("bleach"), None);
    }

    #[test]
    fn test_expired_value_is_not_served() {
        let cache = ResponseCache::with_limits(Duration::from_millis(50), 8);
        cache.insert("naruto".to_string(), "v".to_string());

        std::thread::sleep(Duration::from_millis(80));
        assert_eq!(cache.get("naruto"), None);
    }

    #[test]
    fn test_full_cache_drops_expired_entries_on_insert() {
        let cache = ResponseCache::with_limits(Duration::from_millis(50), 2);
        cache.insert("a".to_string(), "1".to_string());
        cache.insert("b".to_string(), "2".to_string());
        assert_eq!(len(&cache), 2);

        std::thread::sleep(Duration::from_millis(80));
        cache.insert("c".to_string(), "3".to_string());

        assert_eq!(len(&cache), 1);
        assert_eq!(cache.get("c").as_deref(), Some("3"));
    }

    #[test]
    fn test_full_cache_evicts_soonest_expiry() {
        let cache = ResponseCache::with_limits(Duration::from_secs(60), 2);
        cache.insert("a".to_string(), "1".to_string());
        std::thread::sleep(Duration::from_millis(5));
        cache.insert("b".to_string(), "2".to_string());
        std::thread::sleep(Duration::from_millis(5));
        cache.insert("c".to_string(), "3".to_string());

        assert_eq!(len(&cache), 2);
        assert_eq!(cache.get("a"), None);
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn test_overwrite_at_capacity_keeps_others() {
        let cache = ResponseCache::with_limits(Duration::from_secs(60), 2);
        cache.insert("a".to_string(), "1".to_string());
        cache.insert("b".to_string(), "2".to_string());
        cache.insert("a".to_string(), "3".to_string());

        assert_eq!(len(&cache), 2);
        assert_eq!(cache.get("a").as_deref(), Some("3"));
    }

    #[test]
    fn test_keys_separate_models_and_schemas() {
        let key = embedding_cache_key("all-MiniLM-L6-v2", "shonen fights");
        assert_eq!(key, embedding_cache_key("all-MiniLM-L6-v2", "shonen fights"));
        assert_ne!(key, embedding_cache_key("all-MiniLM-L6-v2", "slice of life"));
        assert_ne!(key, embedding_cache_key("text-embedding-3-small", "shonen fights"));
        assert_ne!(
            chat_cache_key("gpt-4o-mini", "refined_query", "[]"),
            chat_cache_key("gpt-4o-mini", "recommended_anime", "[]")
        );
    }
}
