//! In-memory, TTL-bounded, FIFO-evicting response cache
//! (`Mutex<VecDeque<...>> + HashMap`), not a filesystem cache.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use smallweb_core::{CacheEntry, FetchResult};

pub struct ResponseCache {
    max_entries: usize,
    ttl_seconds: u64,
    enabled: bool,
    entries: Mutex<(HashMap<String, CacheEntry>, VecDeque<String>)>,
}

fn now_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

impl ResponseCache {
    pub fn new(enabled: bool, ttl_seconds: u64, max_entries: usize) -> Self {
        ResponseCache { max_entries, ttl_seconds, enabled, entries: Mutex::new((HashMap::new(), VecDeque::new())) }
    }

    /// Returns a hit only if `now - timestamp <= ttl`; an expired entry is
    /// treated as a miss but is not evicted here (it is overwritten or
    /// FIFO-evicted naturally on the next insert).
    pub fn get(&self, key: &str) -> Option<FetchResult> {
        if !self.enabled {
            return None;
        }
        let guard = self.entries.lock().unwrap();
        let entry = guard.0.get(key)?;
        if entry.is_expired(now_secs()) {
            return None;
        }
        Some(entry.value.clone())
    }

    /// Insert on successful completion only — the fetch façade is
    /// responsible for only calling this with cacheable results
    /// (`FetchResult::is_cacheable`).
    pub fn put(&self, key: String, value: FetchResult) {
        if !self.enabled {
            return;
        }
        let mut guard = self.entries.lock().unwrap();
        let (map, order) = &mut *guard;
        if !map.contains_key(&key) {
            order.push_back(key.clone());
        }
        map.insert(
            key,
            CacheEntry { key: String::new(), value, timestamp: now_secs(), ttl_seconds: self.ttl_seconds },
        );
        while map.len() > self.max_entries {
            if let Some(oldest) = order.pop_front() {
                map.remove(&oldest);
            } else {
                break;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
