//! Peripheral hot-unplug quarantine: a `remove` doesn't immediately drop the
//! device, since bluetooth peripherals are frequently re-created by the
//! kernel across a resume cycle. A matching `add` within the window
//! resurrects the prior device; otherwise it's removed for good once the
//! window elapses.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// How long a removed peripheral stays quarantined before being dropped.
pub const QUARANTINE_WINDOW: Duration = Duration::from_secs(2);

/// Tracks peripherals that were removed but may yet be resurrected, keyed
/// by their stable vendor+product+address identity.
#[derive(Default)]
pub struct Debouncer {
    quarantined: HashMap<String, Instant>,
}

impl Debouncer {
    /// An empty debouncer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `identity` as quarantined starting at `now`.
    pub fn quarantine(&mut self, identity: String, now: Instant) {
        self.quarantined.insert(identity, now);
    }

    /// Call when an `add` event arrives. Returns `true` if `identity` was
    /// quarantined within the window, meaning the caller should resurrect
    /// the prior device rather than creating a new one.
    pub fn resurrect(&mut self, identity: &str, now: Instant) -> bool {
        match self.quarantined.remove(identity) {
            Some(removed_at) => now.saturating_duration_since(removed_at) <= QUARANTINE_WINDOW,
            None => false,
        }
    }

    /// Sweeps entries whose quarantine window has elapsed without a
    /// resurrection, returning their identities for final removal from the
    /// registry.
    pub fn sweep_expired(&mut self, now: Instant) -> Vec<String> {
        let expired: Vec<String> = self
            .quarantined
            .iter()
            .filter(|(_, removed_at)| now.saturating_duration_since(**removed_at) > QUARANTINE_WINDOW)
            .map(|(identity, _)| identity.clone())
            .collect();

        for identity in &expired {
            self.quarantined.remove(identity);
        }
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resurrects_within_window() {
        let mut debouncer = Debouncer::new();
        let removed_at = Instant::now();
        debouncer.quarantine("bt:aa:bb".into(), removed_at);

        let readd_time = removed_at + Duration::from_millis(500);
        assert!(debouncer.resurrect("bt:aa:bb", readd_time));
    }

    #[test]
    fn does_not_resurrect_after_window() {
        let mut debouncer = Debouncer::new();
        let removed_at = Instant::now();
        debouncer.quarantine("bt:aa:bb".into(), removed_at);

        let readd_time = removed_at + QUARANTINE_WINDOW + Duration::from_millis(1);
        assert!(!debouncer.resurrect("bt:aa:bb", readd_time));
    }

    #[test]
    fn unknown_identity_never_resurrects() {
        let mut debouncer = Debouncer::new();
        assert!(!debouncer.resurrect("never-quarantined", Instant::now()));
    }

    #[test]
    fn sweep_expired_returns_only_elapsed_entries() {
        let mut debouncer = Debouncer::new();
        let removed_at = Instant::now();
        debouncer.quarantine("stale".into(), removed_at);
        debouncer.quarantine("fresh".into(), removed_at + Duration::from_secs(1));

        let expired = debouncer.sweep_expired(removed_at + QUARANTINE_WINDOW + Duration::from_millis(1));
        assert_eq!(expired, vec!["stale".to_string()]);
    }
}
