//! Suppression of the same message arriving through two delivery paths of one
//! execution context.
//!
//! A page can be reached by the foreground transport handler and by the
//! worker's `PUSH` relay for the same push. Neither path carries a message
//! identifier, so one is derived from the visible text and a coarse time
//! bucket. A message is reported as a duplicate when the same identifier was
//! recorded in the current or the previous bucket.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use sha2::{Digest, Sha256};

use crate::messaging::constants::DEFAULT_DEDUP_WINDOW_MS;
use crate::platform::time::system_time_now;

/// Stable identifier for a message within one time bucket.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(String);

impl MessageId {
    pub fn derive(title: &str, body: &str, bucket: u64) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(title.as_bytes());
        hasher.update([0u8]);
        hasher.update(body.as_bytes());
        hasher.update([0u8]);
        hasher.update(bucket.to_be_bytes());
        let digest = hasher.finalize();
        let hex = digest.iter().map(|byte| format!("{byte:02x}")).collect();
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DedupPolicy {
    /// Every delivery is shown.
    Disabled,
    /// Identical messages within the window are shown once.
    Window(Duration),
}

impl Default for DedupPolicy {
    fn default() -> Self {
        DedupPolicy::Window(Duration::from_millis(DEFAULT_DEDUP_WINDOW_MS))
    }
}

#[derive(Debug)]
pub struct DeliveryDedup {
    policy: DedupPolicy,
    seen: Mutex<HashMap<MessageId, SystemTime>>,
}

impl Default for DeliveryDedup {
    fn default() -> Self {
        Self::new(DedupPolicy::default())
    }
}

impl DeliveryDedup {
    pub fn new(policy: DedupPolicy) -> Self {
        Self {
            policy,
            seen: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> DedupPolicy {
        self.policy
    }

    /// Records the message and returns `true` if it has not been seen within
    /// the window.
    pub fn first_delivery(&self, title: &str, body: &str) -> bool {
        self.first_delivery_at(title, body, system_time_now())
    }

    pub fn first_delivery_at(&self, title: &str, body: &str, now: SystemTime) -> bool {
        let window = match self.policy {
            DedupPolicy::Disabled => return true,
            DedupPolicy::Window(window) if window.is_zero() => return true,
            DedupPolicy::Window(window) => window,
        };

        let bucket = bucket_of(now, window);
        let current = MessageId::derive(title, body, bucket);
        let previous = bucket
            .checked_sub(1)
            .map(|bucket| MessageId::derive(title, body, bucket));

        let mut seen = self.seen.lock().unwrap();
        seen.retain(|_, recorded| {
            now.duration_since(*recorded)
                .map(|age| age < window)
                .unwrap_or(true)
        });

        let recently_seen = |id: &MessageId| {
            seen.get(id)
                .and_then(|recorded| now.duration_since(*recorded).ok())
                .map(|age| age < window)
                .unwrap_or(false)
        };
        if recently_seen(&current) || previous.as_ref().is_some_and(recently_seen) {
            return false;
        }

        seen.insert(current, now);
        true
    }

    pub fn len(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn bucket_of(now: SystemTime, window: Duration) -> u64 {
    let elapsed = now.duration_since(UNIX_EPOCH).unwrap_or_default();
    let window_ms = window.as_millis().max(1);
    (elapsed.as_millis() / window_ms) as u64
}
