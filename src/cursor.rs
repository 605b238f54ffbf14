//! Per-subscriber playback cursors.
//!
//! A cursor is the next record index for a composite scope key whose
//! trailing `/`-separated component is the subscriber key. The take
//! operation is a get-and-advance under the store mutex, so concurrent
//! readers on the same key observe a strictly advancing sequence.

use std::collections::HashMap;

use parking_lot::Mutex;

/// End-of-stream policy, fixed for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackMode {
    /// Stop at the end; callers see `exhausted = true` and the cursor no
    /// longer advances.
    Exhaust,
    /// Wrap to index 0 for continuous playback.
    Rotation,
}

impl PlaybackMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackMode::Exhaust => "exhaust",
            PlaybackMode::Rotation => "rotation",
        }
    }
}

pub struct CursorStore {
    mode: PlaybackMode,
    cursors: Mutex<HashMap<String, usize>>,
}

impl CursorStore {
    pub fn new(mode: PlaybackMode) -> Self {
        Self {
            mode,
            cursors: Mutex::new(HashMap::new()),
        }
    }

    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    /// Returns the current index for `key` and advances the stored cursor.
    ///
    /// Exhaust: once the stored index reaches `len` the call returns
    /// `(stored, true)` and stops advancing. Rotation: indices wrap modulo
    /// `len` and the exhausted flag is never set. A zero `len` reports
    /// exhaustion in both modes; rotation callers filter empty streams
    /// before taking.
    pub fn take(&self, key: &str, len: usize) -> (usize, bool) {
        let mut cursors = self.cursors.lock();
        let stored = cursors.get(key).copied().unwrap_or(0);

        if len == 0 {
            return (stored, true);
        }

        match self.mode {
            PlaybackMode::Exhaust => {
                if stored >= len {
                    return (stored, true);
                }
                cursors.insert(key.to_string(), stored + 1);
                (stored, false)
            }
            PlaybackMode::Rotation => {
                let current = stored % len;
                cursors.insert(key.to_string(), (stored + 1) % len);
                (current, false)
            }
        }
    }

    /// Current index without advancing.
    pub fn peek(&self, key: &str) -> usize {
        self.cursors.lock().get(key).copied().unwrap_or(0)
    }

    /// Clears cursors. With a subscriber key, only entries whose trailing
    /// component matches are removed. Returns the number cleared.
    pub fn reset(&self, subscriber: Option<&str>) -> usize {
        let mut cursors = self.cursors.lock();
        match subscriber {
            None => {
                let count = cursors.len();
                cursors.clear();
                count
            }
            Some(key) => {
                let suffix = format!("/{key}");
                let before = cursors.len();
                cursors.retain(|k, _| !k.ends_with(&suffix));
                before - cursors.len()
            }
        }
    }
}

/// Cursor key for request-API reads in shared scope: every category of a
/// ticker+family advances the same cursor.
pub fn shared_key(ticker: &str, family: &str, api_key: &str) -> String {
    format!("{ticker}/{family}/{api_key}")
}

/// Cursor key for request-API reads in independent scope. `variant`
/// distinguishes projections of the same file (majors, maxchange) so each
/// endpoint replays from its own position.
pub fn independent_key(
    ticker: &str,
    family: &str,
    category: &str,
    variant: Option<&str>,
    api_key: &str,
) -> String {
    match variant {
        Some(v) => format!("{ticker}/{family}/{category}_{v}/{api_key}"),
        None => format!("{ticker}/{family}/{category}/{api_key}"),
    }
}

/// Cursor key for push-feed delivery, namespaced per hub so push playback
/// never collides with request-API cursors.
pub fn push_key(hub: &str, ticker: &str, category: &str, api_key: &str) -> String {
    format!("push:{hub}/{ticker}/{category}/{api_key}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhaust_runs_to_the_end_then_sticks() {
        let store = CursorStore::new(PlaybackMode::Exhaust);
        let key = shared_key("SPX", "orderflow", "K");

        for expected in 0..3 {
            assert_eq!(store.take(&key, 3), (expected, false));
        }
        // Repeated takes keep reporting exhaustion without advancing.
        assert_eq!(store.take(&key, 3), (3, true));
        assert_eq!(store.take(&key, 3), (3, true));
        assert_eq!(store.peek(&key), 3);
    }

    #[test]
    fn rotation_wraps_forever() {
        let store = CursorStore::new(PlaybackMode::Rotation);
        let key = shared_key("SPX", "orderflow", "K");

        let seen: Vec<usize> = (0..7).map(|_| store.take(&key, 3).0).collect();
        assert_eq!(seen, vec![0, 1, 2, 0, 1, 2, 0]);
        assert!((0..7).all(|_| !store.take(&key, 3).1));
    }

    #[test]
    fn zero_length_reports_exhausted_in_both_modes() {
        for mode in [PlaybackMode::Exhaust, PlaybackMode::Rotation] {
            let store = CursorStore::new(mode);
            assert_eq!(store.take("SPX/orderflow/K", 0), (0, true));
        }
    }

    #[test]
    fn reset_all_counts_distinct_cursors() {
        let store = CursorStore::new(PlaybackMode::Exhaust);
        store.take(&shared_key("SPX", "orderflow", "A"), 5);
        store.take(&shared_key("SPX", "classic", "A"), 5);
        store.take(&shared_key("NDX", "orderflow", "B"), 5);

        assert_eq!(store.reset(None), 3);
        assert_eq!(store.peek(&shared_key("SPX", "orderflow", "A")), 0);
        assert_eq!(store.reset(None), 0);
    }

    #[test]
    fn reset_by_subscriber_matches_trailing_component_only() {
        let store = CursorStore::new(PlaybackMode::Exhaust);
        store.take(&shared_key("SPX", "orderflow", "A"), 5);
        store.take(&shared_key("SPX", "orderflow", "B"), 5);
        store.take(&push_key("orderflow", "SPX", "orderflow", "B"), 5);
        // A subscriber key that happens to appear mid-key must not match.
        store.take("B/orderflow/A", 5);

        assert_eq!(store.reset(Some("B")), 2);
        assert_eq!(store.peek(&shared_key("SPX", "orderflow", "A")), 1);
        assert_eq!(store.peek(&shared_key("SPX", "orderflow", "B")), 0);
        assert_eq!(store.peek("B/orderflow/A"), 1);
    }

    #[test]
    fn keys_are_scope_disjoint() {
        let a = independent_key("SPX", "classic", "gex_full", None, "K");
        let b = independent_key("SPX", "classic", "gex_full", Some("majors"), "K");
        let c = push_key("classic", "SPX", "gex_full", "K");
        let d = shared_key("SPX", "classic", "K");
        let all = [&a, &b, &c, &d];
        for (i, x) in all.iter().enumerate() {
            for (j, y) in all.iter().enumerate() {
                if i != j {
                    assert_ne!(x, y);
                }
            }
        }
    }

    #[test]
    fn interleaved_subscribers_advance_independently() {
        let store = CursorStore::new(PlaybackMode::Exhaust);
        let a = shared_key("SPX", "orderflow", "A");
        let b = shared_key("SPX", "orderflow", "B");

        assert_eq!(store.take(&a, 5), (0, false));
        assert_eq!(store.take(&a, 5), (1, false));
        assert_eq!(store.take(&b, 5), (0, false));
        assert_eq!(store.take(&a, 5), (2, false));

        assert_eq!(store.reset(Some("B")), 1);
        assert_eq!(store.take(&b, 5), (0, false));
    }
}
