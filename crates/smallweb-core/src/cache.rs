//! Response cache entry data model. The FIFO/TTL store itself lives in
//! `smallweb-local::cache`, in-memory and behind a mutex.

use serde::{Deserialize, Serialize};

use crate::result::FetchResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub key: String,
    pub value: FetchResult,
    pub timestamp: u64,
    pub ttl_seconds: u64,
}

impl CacheEntry {
    pub fn is_expired(&self, now: u64) -> bool {
        now.saturating_sub(self.timestamp) > self.ttl_seconds
    }
}
