//! Cache Entry Module
//!
//! Defines cached responses and the in-memory entries that wrap them.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::lru::Slot;

// == Cached Response ==
/// An HTTP response captured for later reuse.
///
/// Immutable once created. `expires_at` is informational; staleness is judged
/// against the manager's TTL and `cached_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub status_code: u16,
    #[serde(with = "body_base64")]
    pub body: Vec<u8>,
    #[serde(default, deserialize_with = "nullable_headers")]
    pub headers: HashMap<String, Vec<String>>,
    pub cached_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CachedResponse {
    // == Constructor ==
    /// Creates a response cached now and expiring after `ttl`.
    pub fn new(
        status_code: u16,
        body: Vec<u8>,
        headers: HashMap<String, Vec<String>>,
        ttl: Duration,
    ) -> Self {
        let cached_at = Utc::now();
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| cached_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            status_code,
            body,
            headers,
            cached_at,
            expires_at,
        }
    }

    // == Is Expired ==
    /// Checks whether the response is older than `ttl` at `now`.
    ///
    /// Boundary condition: an entry exactly `ttl` old is still served; only
    /// strictly older entries are stale.
    pub fn is_expired_at(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.cached_at);
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => age > ttl,
            Err(_) => false,
        }
    }

    /// Checks whether the response is older than `ttl` right now.
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.is_expired_at(ttl, Utc::now())
    }

    /// Returns true for 2xx status codes.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

// == Cache Entry ==
/// In-memory bookkeeping for one cached response.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    /// Body length in bytes, counted against the size budget
    pub size_bytes: u64,
    pub last_used_at: DateTime<Utc>,
    pub response: CachedResponse,
    /// Back-reference into the eviction policy's recency list
    pub(crate) slot: Slot,
}

impl CacheEntry {
    pub(crate) fn new(key: String, response: CachedResponse, slot: Slot) -> Self {
        Self {
            key,
            size_bytes: response.body.len() as u64,
            last_used_at: Utc::now(),
            response,
            slot,
        }
    }
}

/// Accepts `null` headers as an empty map.
fn nullable_headers<'de, D>(deserializer: D) -> Result<HashMap<String, Vec<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::deserialize(deserializer)?.unwrap_or_default())
}

/// Serializes body bytes as a base64 string.
mod body_base64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(body: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(body))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
