//! Quiet-period event coalescer.
//!
//! Generic leading-edge coalescing keyed by an arbitrary value: the first
//! observation in a burst is emitted, subsequent observations inside the
//! quiet window are dropped. The watch subscription keys this by path; any
//! bursty event source can reuse it.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub struct Coalescer<K> {
    quiet: Duration,
    seen: Mutex<HashMap<K, Instant>>,
}

impl<K: Eq + Hash + Clone> Coalescer<K> {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Record an observation. Returns true when the event should be emitted,
    /// false when it falls inside the quiet window of a previous emission.
    pub fn observe(&self, key: K) -> bool {
        let now = Instant::now();
        let mut seen = self.seen.lock().unwrap();
        if let Some(last) = seen.get(&key) {
            if now.duration_since(*last) < self.quiet {
                return false;
            }
        }
        seen.insert(key, now);
        true
    }

    /// The configured quiet window.
    pub fn quiet(&self) -> Duration {
        self.quiet
    }

    /// Drop tracking state for a key (e.g. after an unlink).
    pub fn forget(&self, key: &K) {
        self.seen.lock().unwrap().remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_observation_emits() {
        let coalescer = Coalescer::new(Duration::from_millis(100));
        assert!(coalescer.observe("a.ts"));
    }

    #[test]
    fn test_burst_is_coalesced() {
        let coalescer = Coalescer::new(Duration::from_millis(200));
        assert!(coalescer.observe("a.ts"));
        assert!(!coalescer.observe("a.ts"));
        assert!(!coalescer.observe("a.ts"));
        // Different key is an independent burst
        assert!(coalescer.observe("b.ts"));
    }

    #[test]
    fn test_emits_again_after_quiet_window() {
        let coalescer = Coalescer::new(Duration::from_millis(20));
        assert!(coalescer.observe("a.ts"));
        std::thread::sleep(Duration::from_millis(40));
        assert!(coalescer.observe("a.ts"));
    }

    #[test]
    fn test_forget_resets_the_window() {
        let coalescer = Coalescer::new(Duration::from_secs(60));
        assert!(coalescer.observe("a.ts"));
        coalescer.forget(&"a.ts");
        assert!(coalescer.observe("a.ts"));
    }
}
