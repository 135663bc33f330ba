//! # Fibonacci Backoff
//!
//! Requeue delays for failed reconciliations. The sequence grows more slowly
//! than exponential backoff, so a WebApp stuck on a transient error is
//! retried often at first without hammering the API server later.
//!
//! With the defaults (1 minute minimum, 10 minutes maximum) the sequence is
//! 1m, 1m, 2m, 3m, 5m, 8m, 10m, 10m, ...

use resource_store::ObjectKey;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Fibonacci backoff calculator
///
/// Each backoff is the sum of the previous two, capped at the maximum.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    prev: Duration,
    current: Duration,
    max: Duration,
}

impl FibonacciBackoff {
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            prev: Duration::ZERO,
            current: min,
            max,
        }
    }

    /// Get the next backoff duration and advance the sequence
    pub fn next_backoff(&mut self) -> Duration {
        let result = self.current;

        let next = self.prev.saturating_add(self.current);
        self.prev = self.current;
        self.current = next.min(self.max);

        result
    }
}

/// Backoff state per WebApp
///
/// Entries are created on the first failure and dropped on the next success.
/// A failing WebApp is retried at least every `max`, so an entry untouched for
/// twice that long belongs to an object that is gone; such entries are pruned
/// whenever another failure is recorded. The map therefore never holds more
/// than the WebApps that failed within the last `2 * max`.
#[derive(Debug)]
pub struct BackoffRegistry {
    min: Duration,
    max: Duration,
    states: Mutex<HashMap<ObjectKey, Entry>>,
}

#[derive(Debug)]
struct Entry {
    backoff: FibonacciBackoff,
    last_failure: Instant,
}

impl BackoffRegistry {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Delay before retrying `key` after another failure
    pub fn next_backoff(&self, key: &ObjectKey) -> Duration {
        self.next_backoff_at(key, Instant::now())
    }

    fn next_backoff_at(&self, key: &ObjectKey, now: Instant) -> Duration {
        let idle = self.max.saturating_mul(2);
        let mut states = self.states.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        states.retain(|k, entry| k == key || now.saturating_duration_since(entry.last_failure) <= idle);

        let entry = states.entry(key.clone()).or_insert_with(|| Entry {
            backoff: FibonacciBackoff::new(self.min, self.max),
            last_failure: now,
        });
        entry.last_failure = now;
        entry.backoff.next_backoff()
    }

    /// Forget the failure history of `key`
    pub fn reset(&self, key: &ObjectKey) {
        let mut states = self.states.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        states.remove(key);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.states.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minutes(m: u64) -> Duration {
        Duration::from_secs(m * 60)
    }

    #[test]
    fn test_fibonacci_backoff_sequence() {
        let mut backoff = FibonacciBackoff::new(minutes(1), minutes(10));

        assert_eq!(backoff.next_backoff(), minutes(1));
        assert_eq!(backoff.next_backoff(), minutes(1));
        assert_eq!(backoff.next_backoff(), minutes(2));
        assert_eq!(backoff.next_backoff(), minutes(3));
        assert_eq!(backoff.next_backoff(), minutes(5));
        assert_eq!(backoff.next_backoff(), minutes(8));
        assert_eq!(backoff.next_backoff(), minutes(10)); // max
        // Next would be 13m (8+5), capped
        assert_eq!(backoff.next_backoff(), minutes(10));
        assert_eq!(backoff.next_backoff(), minutes(10));
    }

    #[test]
    fn test_registry_tracks_objects_independently() {
        let registry = BackoffRegistry::new(minutes(1), minutes(10));
        let blog = ObjectKey::new("prod", "blog");
        let shop = ObjectKey::new("prod", "shop");

        assert_eq!(registry.next_backoff(&blog), minutes(1));
        assert_eq!(registry.next_backoff(&blog), minutes(1));
        assert_eq!(registry.next_backoff(&blog), minutes(2));
        assert_eq!(registry.next_backoff(&shop), minutes(1));

        registry.reset(&blog);
        assert_eq!(registry.next_backoff(&blog), minutes(1));
        assert_eq!(registry.next_backoff(&shop), minutes(1));
    }

    #[test]
    fn test_registry_prunes_entries_idle_past_twice_max() {
        let registry = BackoffRegistry::new(minutes(1), minutes(10));
        let gone = ObjectKey::new("prod", "gone");
        let live = ObjectKey::new("prod", "live");
        let start = Instant::now();

        registry.next_backoff_at(&gone, start);
        registry.next_backoff_at(&gone, start);
        registry.next_backoff_at(&live, start + minutes(15));
        assert_eq!(registry.len(), 2);

        // `gone` last failed 21 minutes ago, `live` 6 minutes ago
        registry.next_backoff_at(&live, start + minutes(21));
        assert_eq!(registry.len(), 1);

        // A pruned object starts over
        assert_eq!(registry.next_backoff_at(&gone, start + minutes(22)), minutes(1));
    }
}
