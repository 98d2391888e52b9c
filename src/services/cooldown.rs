//! Per-key re-emission cooldown.

use crate::types::SignalKey;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::Duration;

/// Default cooldown window (15 minutes).
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(15 * 60);

/// Last-fired time per signal key.
///
/// A key may fire again once strictly more than `window_ms` has passed since
/// it was last recorded. Recorded times never move backwards.
pub struct CooldownTable {
    entries: DashMap<SignalKey, i64>,
    window_ms: i64,
}

impl Default for CooldownTable {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}

impl CooldownTable {
    pub fn new(window: Duration) -> Self {
        Self::with_window_ms(window.as_millis() as i64)
    }

    pub fn with_window_ms(window_ms: i64) -> Self {
        Self {
            entries: DashMap::new(),
            window_ms,
        }
    }

    pub fn window_ms(&self) -> i64 {
        self.window_ms
    }

    /// Check and record in one step.
    ///
    /// Returns true and stores `now_ms` when the key is absent or its window
    /// has elapsed; otherwise returns false and leaves the table untouched.
    pub fn should_emit(&self, key: &SignalKey, now_ms: i64) -> bool {
        match self.entries.entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                if now_ms - *entry.get() > self.window_ms {
                    entry.insert(now_ms);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(now_ms);
                true
            }
        }
    }

    /// Whether `key` may fire at `now_ms`, without recording anything.
    pub fn is_ready(&self, key: &SignalKey, now_ms: i64) -> bool {
        match self.entries.get(key) {
            Some(last) => now_ms - *last > self.window_ms,
            None => true,
        }
    }

    /// Record a firing. An older timestamp never replaces a newer one.
    pub fn record(&self, key: &SignalKey, now_ms: i64) {
        self.entries
            .entry(key.clone())
            .and_modify(|last| *last = (*last).max(now_ms))
            .or_insert(now_ms);
    }

    /// Last recorded time for `key`.
    pub fn last_fired(&self, key: &SignalKey) -> Option<i64> {
        self.entries.get(key).map(|v| *v)
    }

    /// Drop entries whose window has elapsed. Returns how many were removed.
    pub fn prune(&self, now_ms: i64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, last| now_ms - *last <= self.window_ms);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}
