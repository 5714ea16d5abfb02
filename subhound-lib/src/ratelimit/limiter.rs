use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use log::trace;
use std::hash::Hash;
use std::time::Duration;
use tokio::time::{Instant, sleep_until};

use super::SourceKey;

/// Default interval between two calls with the same key
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Enforces a minimum interval between operations that share a key.
///
/// Calls with different keys never wait on each other. Calls with the same
/// key are spaced at least [`RateLimiter::interval`] apart, no matter how
/// many callers race for that key: every caller reserves the next free slot
/// while holding the map entry, then sleeps until its slot without holding
/// any lock.
#[derive(Debug)]
pub struct RateLimiter<K = SourceKey>
where
    K: Eq + Hash,
{
    interval: Duration,
    /// Earliest instant at which the next call for a key may proceed
    next_allowed: DashMap<K, Instant>,
}

impl<K> RateLimiter<K>
where
    K: Eq + Hash + Clone,
{
    /// Create a limiter which spaces calls per key by `interval`
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_allowed: DashMap::new(),
        }
    }

    /// The configured interval between calls with the same key
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until an operation with `key` may proceed.
    ///
    /// The first call for a key returns immediately. Later calls suspend the
    /// caller until the interval since the previous slot has elapsed.
    /// This never fails; it can only delay.
    pub async fn block(&self, key: &K) {
        let now = Instant::now();
        let slot = match self.next_allowed.entry(key.clone()) {
            Entry::Vacant(entry) => {
                entry.insert(now + self.interval);
                return;
            }
            Entry::Occupied(mut entry) => {
                let slot = (*entry.get()).max(now);
                entry.insert(slot + self.interval);
                slot
            }
        };

        if slot > now {
            trace!("Rate limited, waiting {:?}", slot - now);
            sleep_until(slot).await;
        }
    }
}

impl Default for RateLimiter<SourceKey> {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL)
    }
}
