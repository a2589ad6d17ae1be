use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::error::StoreError;

/// TTL cache port. Expiry is evaluated lazily on access; there is no
/// background sweeper.
pub trait TtlCache: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), StoreError>;

    fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// In-process TTL cache over a HashMap.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (Vec<u8>, Instant)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TtlCache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some((value, expires_at)) if Instant::now() < *expires_at => Ok(Some(value.clone())),
            Some(_) => {
                // Expired: drop it now rather than waiting for overwrite.
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), StoreError> {
        self.entries
            .lock()
            .insert(key.to_string(), (value.to_vec(), Instant::now() + ttl));
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_delete() {
        let cache = MemoryCache::new();
        cache.set("k", b"v", Duration::from_secs(60)).unwrap();
        assert_eq!(cache.get("k").unwrap(), Some(b"v".to_vec()));

        cache.delete("k").unwrap();
        assert_eq!(cache.get("k").unwrap(), None);
    }

    #[test]
    fn entries_expire_lazily() {
        let cache = MemoryCache::new();
        cache.set("k", b"v", Duration::from_millis(10)).unwrap();
        std::thread::sleep(Duration::from_millis(25));
        assert_eq!(cache.get("k").unwrap(), None);
    }

    #[test]
    fn overwrite_refreshes_ttl() {
        let cache = MemoryCache::new();
        cache.set("k", b"old", Duration::from_millis(10)).unwrap();
        cache.set("k", b"new", Duration::from_secs(60)).unwrap();
        std::thread::sleep(Duration::from_millis(25));
        assert_eq!(cache.get("k").unwrap(), Some(b"new".to_vec()));
    }
}
