use std::collections::HashSet;
use std::time::{Duration, Instant};

use crate::models::RestaurantCandidate;

/// Minimum spacing between upstream refetches triggered by rerolls
const REFRESH_THROTTLE: Duration = Duration::from_secs(5);

/// What a reroll request resolved to
#[derive(Debug, Clone, PartialEq)]
pub enum RerollOutcome {
    /// A not-yet-presented candidate from the current list
    Next(RestaurantCandidate),
    /// The list is exhausted and enough time has passed to fetch fresh
    /// results; the caller should refetch and then call `replace_list`
    RefreshNeeded,
    /// The list is exhausted and refetching is throttled; the rotation
    /// wrapped around and this already-seen candidate is shown again
    Wrapped(RestaurantCandidate),
    /// The per-session reroll cap was hit; nothing changes
    CapReached,
}

/// Presentation rotation over a fetched candidate list.
///
/// Guarantees each candidate is presented once before any repeats, across
/// list refreshes, by keying a seen-set on candidate identity rather than
/// position. A changed list fingerprint resets the session outright.
#[derive(Debug)]
pub struct RotationEngine {
    list: Vec<RestaurantCandidate>,
    seen: HashSet<String>,
    cursor: usize,
    rerolls: u32,
    reroll_cap: u32,
    fingerprint: String,
    last_fetch: Instant,
}

impl RotationEngine {
    pub fn new(list: Vec<RestaurantCandidate>, reroll_cap: u32) -> Self {
        Self::new_at(list, reroll_cap, Instant::now())
    }

    fn new_at(list: Vec<RestaurantCandidate>, reroll_cap: u32, now: Instant) -> Self {
        let fingerprint = fingerprint_of(&list);
        let mut engine = Self {
            list,
            seen: HashSet::new(),
            cursor: 0,
            rerolls: 0,
            reroll_cap,
            fingerprint,
            last_fetch: now,
        };
        engine.mark_current_seen();
        engine
    }

    /// The candidate currently presented, if the list is non-empty
    pub fn current(&self) -> Option<&RestaurantCandidate> {
        self.list.get(self.cursor)
    }

    pub fn rerolls_used(&self) -> u32 {
        self.rerolls
    }

    pub fn reroll_cap(&self) -> u32 {
        self.reroll_cap
    }

    pub fn reroll(&mut self) -> RerollOutcome {
        self.reroll_at(Instant::now())
    }

    /// Advances the rotation.
    ///
    /// Scans forward from the cursor for the first unseen candidate. When
    /// every candidate has been seen, asks for a refetch unless one
    /// happened within the throttle window, in which case the seen-set is
    /// cleared and the rotation wraps by a single step.
    pub fn reroll_at(&mut self, now: Instant) -> RerollOutcome {
        if self.rerolls >= self.reroll_cap {
            tracing::debug!(cap = self.reroll_cap, "Reroll cap reached; ignoring");
            return RerollOutcome::CapReached;
        }
        if self.list.is_empty() {
            return RerollOutcome::RefreshNeeded;
        }

        self.rerolls += 1;

        let len = self.list.len();
        for step in 1..=len {
            let idx = (self.cursor + step) % len;
            let key = self.list[idx].identity_key();
            if !self.seen.contains(&key) {
                self.cursor = idx;
                self.seen.insert(key);
                return RerollOutcome::Next(self.list[idx].clone());
            }
        }

        // Exhausted. Prefer fresh data when the throttle allows it.
        if now.duration_since(self.last_fetch) >= REFRESH_THROTTLE {
            return RerollOutcome::RefreshNeeded;
        }

        self.seen.clear();
        self.cursor = (self.cursor + 1) % len;
        self.mark_current_seen();
        RerollOutcome::Wrapped(self.list[self.cursor].clone())
    }

    /// Installs a freshly fetched list.
    ///
    /// An unchanged fingerprint keeps the seen-set so candidates already
    /// presented are not repeated; a changed one is a hard reset.
    pub fn replace_list(&mut self, list: Vec<RestaurantCandidate>) {
        self.replace_list_at(list, Instant::now());
    }

    fn replace_list_at(&mut self, list: Vec<RestaurantCandidate>, now: Instant) {
        let fingerprint = fingerprint_of(&list);
        if fingerprint != self.fingerprint {
            self.seen.clear();
            self.fingerprint = fingerprint;
        }
        self.list = list;
        self.cursor = 0;
        self.last_fetch = now;

        // Land on the first unseen candidate if the set carried over
        let len = self.list.len();
        for idx in 0..len {
            if !self.seen.contains(&self.list[idx].identity_key()) {
                self.cursor = idx;
                break;
            }
        }
        self.mark_current_seen();
    }

    fn mark_current_seen(&mut self) {
        if let Some(current) = self.list.get(self.cursor) {
            self.seen.insert(current.identity_key());
        }
    }
}

fn fingerprint_of(list: &[RestaurantCandidate]) -> String {
    let mut keys: Vec<String> = list.iter().map(|c| c.identity_key()).collect();
    keys.sort();
    keys.join("\u{1f}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str) -> RestaurantCandidate {
        RestaurantCandidate {
            place_id: Some(id.to_string()),
            name: format!("Restaurant {}", id),
            is_fallback: false,
            trigger_reroll: false,
            ..RestaurantCandidate::fallback_sentinel()
        }
    }

    fn list(ids: &[&str]) -> Vec<RestaurantCandidate> {
        ids.iter().map(|id| candidate(id)).collect()
    }

    #[test]
    fn test_presents_every_candidate_before_repeating() {
        let mut engine = RotationEngine::new_at(list(&["a", "b", "c", "d"]), 99, Instant::now());
        let mut shown = vec![engine.current().unwrap().identity_key()];
        for _ in 0..3 {
            match engine.reroll_at(Instant::now()) {
                RerollOutcome::Next(c) => shown.push(c.identity_key()),
                other => panic!("unexpected outcome {:?}", other),
            }
        }
        shown.sort();
        shown.dedup();
        assert_eq!(shown.len(), 4);
    }

    #[test]
    fn test_exhaustion_requests_refresh_when_throttle_elapsed() {
        let start = Instant::now();
        let mut engine = RotationEngine::new_at(list(&["a", "b"]), 99, start);
        assert!(matches!(engine.reroll_at(start), RerollOutcome::Next(_)));
        let later = start + Duration::from_secs(6);
        assert_eq!(engine.reroll_at(later), RerollOutcome::RefreshNeeded);
    }

    #[test]
    fn test_exhaustion_wraps_when_throttled() {
        let start = Instant::now();
        let mut engine = RotationEngine::new_at(list(&["a", "b", "c"]), 99, start);
        // Consume b and c
        assert!(matches!(engine.reroll_at(start), RerollOutcome::Next(_)));
        assert!(matches!(engine.reroll_at(start), RerollOutcome::Next(_)));
        // Fourth presentation within the throttle wraps one step forward
        match engine.reroll_at(start) {
            RerollOutcome::Wrapped(c) => {
                assert_eq!(c.identity_key(), "a");
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_reroll_cap_is_silent_noop() {
        let start = Instant::now();
        let mut engine = RotationEngine::new_at(list(&["a", "b", "c"]), 1, start);
        assert!(matches!(engine.reroll_at(start), RerollOutcome::Next(_)));
        assert_eq!(engine.reroll_at(start), RerollOutcome::CapReached);
        assert_eq!(engine.rerolls_used(), 1);
    }

    #[test]
    fn test_same_fingerprint_refresh_keeps_seen_set() {
        let start = Instant::now();
        let mut engine = RotationEngine::new_at(list(&["a", "b"]), 99, start);
        assert!(matches!(engine.reroll_at(start), RerollOutcome::Next(_)));
        // Refetch returned the same venues; rotation must not restart at "a"
        engine.replace_list_at(list(&["a", "b"]), start + Duration::from_secs(6));
        let later = start + Duration::from_secs(12);
        assert_eq!(engine.reroll_at(later), RerollOutcome::RefreshNeeded);
    }

    #[test]
    fn test_changed_fingerprint_resets_session() {
        let start = Instant::now();
        let mut engine = RotationEngine::new_at(list(&["a", "b"]), 99, start);
        assert!(matches!(engine.reroll_at(start), RerollOutcome::Next(_)));
        engine.replace_list_at(list(&["x", "y"]), start);
        assert_eq!(engine.current().unwrap().identity_key(), "x");
        match engine.reroll_at(start) {
            RerollOutcome::Next(c) => assert_eq!(c.identity_key(), "y"),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_refresh_appends_unseen_candidates_in_order() {
        let start = Instant::now();
        let mut engine = RotationEngine::new_at(list(&["a", "b"]), 99, start);
        assert!(matches!(engine.reroll_at(start), RerollOutcome::Next(_)));
        // Superset refetch: "c" is new, a hard reset since the set differs
        engine.replace_list_at(list(&["a", "b", "c"]), start);
        assert_eq!(engine.current().unwrap().identity_key(), "a");
    }

    #[test]
    fn test_empty_list_always_requests_refresh() {
        let mut engine = RotationEngine::new_at(Vec::new(), 99, Instant::now());
        assert!(engine.current().is_none());
        assert_eq!(engine.reroll_at(Instant::now()), RerollOutcome::RefreshNeeded);
    }
}
