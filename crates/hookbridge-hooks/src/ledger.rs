//! Session-scoped record of `once` hooks that have already fired.

use std::collections::HashMap;

use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OnceState {
    Running,
    Fired,
}

/// A held claim on one `(owner, hook identity)` pair.
///
/// Tagged with the ledger generation it was taken in, so a claim that
/// outlives [`RunOnceLedger::clear`] cannot mark the pair fired in the next
/// session.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a claim must be completed"]
pub struct OnceClaim {
    owner: String,
    identity: String,
    generation: u64,
}

#[derive(Debug, Default)]
struct LedgerState {
    generation: u64,
    entries: HashMap<(String, String), OnceState>,
}

/// Tracks `(owner, hook identity)` pairs of run-once hooks.
///
/// A claim is an atomic check-and-set: only one caller can hold a pair at a
/// time. A claim that ends in a failed execution is released so the hook
/// may be retried; a successful one is kept until [`RunOnceLedger::clear`].
#[derive(Debug, Default)]
pub struct RunOnceLedger {
    state: Mutex<LedgerState>,
}

impl RunOnceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a pair. Returns `None` if it is running or has already fired.
    pub fn try_claim(&self, owner: &str, identity: &str) -> Option<OnceClaim> {
        let mut state = self.state.lock();
        let key = (owner.to_string(), identity.to_string());
        if state.entries.contains_key(&key) {
            return None;
        }
        state.entries.insert(key, OnceState::Running);
        Some(OnceClaim {
            owner: owner.to_string(),
            identity: identity.to_string(),
            generation: state.generation,
        })
    }

    /// Finish a claim. Claims taken before the last clear are dropped.
    pub fn complete(&self, claim: OnceClaim, succeeded: bool) {
        let mut state = self.state.lock();
        if claim.generation != state.generation {
            tracing::debug!(
                owner = %claim.owner,
                hook = %claim.identity,
                "run-once claim outlived its session, ignoring"
            );
            return;
        }
        let key = (claim.owner, claim.identity);
        if succeeded {
            state.entries.insert(key, OnceState::Fired);
        } else {
            state.entries.remove(&key);
        }
    }

    /// Whether the pair has fired successfully.
    pub fn has_fired(&self, owner: &str, identity: &str) -> bool {
        self.state
            .lock()
            .entries
            .get(&(owner.to_string(), identity.to_string()))
            .is_some_and(|s| *s == OnceState::Fired)
    }

    /// Forget everything and start a new generation. Called at session end.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.generation += 1;
    }

    /// Number of claimed or fired pairs.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_claim_once() {
        let ledger = RunOnceLedger::new();
        let claim = ledger.try_claim("dir", "command:echo").unwrap();
        assert!(ledger.try_claim("dir", "command:echo").is_none());
        assert!(!ledger.has_fired("dir", "command:echo"));
        ledger.complete(claim, true);
        assert!(ledger.has_fired("dir", "command:echo"));
        assert!(ledger.try_claim("dir", "command:echo").is_none());
    }

    #[test]
    fn test_failed_run_releases_claim() {
        let ledger = RunOnceLedger::new();
        let claim = ledger.try_claim("skill", "command:x").unwrap();
        ledger.complete(claim, false);
        assert!(!ledger.has_fired("skill", "command:x"));
        assert!(ledger.try_claim("skill", "command:x").is_some());
    }

    #[test]
    fn test_owners_are_independent() {
        let ledger = RunOnceLedger::new();
        assert!(ledger.try_claim("a", "command:x").is_some());
        assert!(ledger.try_claim("b", "command:x").is_some());
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_clear() {
        let ledger = RunOnceLedger::new();
        let claim = ledger.try_claim("a", "h").unwrap();
        ledger.complete(claim, true);
        ledger.clear();
        assert!(ledger.is_empty());
        assert!(ledger.try_claim("a", "h").is_some());
    }

    #[test]
    fn test_claim_from_previous_session_is_dropped() {
        let ledger = RunOnceLedger::new();
        let stale = ledger.try_claim("a", "h").unwrap();
        ledger.clear();

        ledger.complete(stale, true);
        assert!(!ledger.has_fired("a", "h"));
        assert!(ledger.is_empty());

        // A claim in the new session is unaffected by the stale one.
        let fresh = ledger.try_claim("a", "h").unwrap();
        ledger.complete(fresh, true);
        assert!(ledger.has_fired("a", "h"));
    }

    #[test]
    fn test_concurrent_claims_single_winner() {
        let ledger = Arc::new(RunOnceLedger::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                std::thread::spawn(move || ledger.try_claim("owner", "command:once").is_some())
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
