//! Pending-write bookkeeping between the reconciler and the read cache.
//!
//! The cache lags behind writes. After a pass creates objects, the next
//! pass must not run until those objects are visible, or it would create
//! them (or their backups) again. The reconciler raises an expectation
//! before every create and the cache observer lowers it when the object
//! shows up. A pass is safe to start once its owner is satisfied.
//!
//! Counters expire after a TTL so a lost cache event cannot hold an owner
//! back forever.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, error, warn};
use warden_cluster::ResourceKind;

/// Default lifetime of an unsatisfied expectation.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Copy)]
struct Counter {
    adds: i64,
    deletes: i64,
    raised_at: Instant,
}

impl Counter {
    fn fulfilled(&self) -> bool {
        self.adds <= 0 && self.deletes <= 0
    }
}

/// Thread-safe expectation counters keyed by `(owner, kind)`.
pub struct Expectations {
    ttl: Duration,
    counters: Mutex<HashMap<(String, ResourceKind), Counter>>,
}

impl Default for Expectations {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl Expectations {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            counters: Mutex::new(HashMap::new()),
        }
    }

    /// Expect `adds` creations and `deletes` deletions to become visible.
    pub fn raise(&self, owner: &str, kind: ResourceKind, adds: i64, deletes: i64) {
        let mut counters = self.lock();
        let now = Instant::now();
        let counter = counters
            .entry((owner.to_string(), kind))
            .or_insert(Counter {
                adds: 0,
                deletes: 0,
                raised_at: now,
            });
        counter.adds += adds;
        counter.deletes += deletes;
        counter.raised_at = now;
        debug!(%owner, %kind, adds = counter.adds, deletes = counter.deletes, "expectations raised");
    }

    /// Withdraw expectations, e.g. after the write that raised them failed.
    ///
    /// Lowering below zero is a bookkeeping bug; the counter is clamped.
    pub fn lower(&self, owner: &str, kind: ResourceKind, adds: i64, deletes: i64) {
        let mut counters = self.lock();
        let Some(counter) = counters.get_mut(&(owner.to_string(), kind)) else {
            debug_assert!(adds == 0 && deletes == 0, "lowering unknown expectation");
            error!(%owner, %kind, "lowering expectations that were never raised");
            return;
        };
        counter.adds -= adds;
        counter.deletes -= deletes;
        debug_assert!(
            counter.adds >= 0 && counter.deletes >= 0,
            "expectations for {owner}/{kind} went negative"
        );
        if counter.adds < 0 || counter.deletes < 0 {
            error!(
                %owner,
                %kind,
                adds = counter.adds,
                deletes = counter.deletes,
                "expectations went negative, clamping"
            );
            counter.adds = counter.adds.max(0);
            counter.deletes = counter.deletes.max(0);
        }
        debug!(%owner, %kind, adds = counter.adds, deletes = counter.deletes, "expectations lowered");
    }

    /// A creation became visible in the cache.
    ///
    /// Creations nobody was waiting for are ignored.
    pub fn creation_observed(&self, owner: &str, kind: ResourceKind) {
        self.observe(owner, kind, |c| &mut c.adds);
    }

    /// A deletion became visible in the cache.
    pub fn deletion_observed(&self, owner: &str, kind: ResourceKind) {
        self.observe(owner, kind, |c| &mut c.deletes);
    }

    fn observe(&self, owner: &str, kind: ResourceKind, field: impl Fn(&mut Counter) -> &mut i64) {
        let mut counters = self.lock();
        if let Some(counter) = counters.get_mut(&(owner.to_string(), kind)) {
            let n = field(counter);
            if *n > 0 {
                *n -= 1;
            }
        }
    }

    /// True if nothing is pending for `(owner, kind)`, or the pending
    /// expectation has outlived the TTL.
    pub fn satisfied(&self, owner: &str, kind: ResourceKind) -> bool {
        let counters = self.lock();
        match counters.get(&(owner.to_string(), kind)) {
            None => true,
            Some(counter) => self.counter_satisfied(owner, kind, counter),
        }
    }

    /// True if every kind of `owner` is satisfied.
    pub fn all_satisfied(&self, owner: &str) -> bool {
        let counters = self.lock();
        counters
            .iter()
            .filter(|((o, _), _)| o == owner)
            .all(|((_, kind), counter)| self.counter_satisfied(owner, *kind, counter))
    }

    /// Outstanding `(adds, deletes)` for `(owner, kind)`.
    pub fn pending(&self, owner: &str, kind: ResourceKind) -> (i64, i64) {
        self.lock()
            .get(&(owner.to_string(), kind))
            .map(|c| (c.adds, c.deletes))
            .unwrap_or((0, 0))
    }

    /// Drop every counter of `owner`.
    pub fn forget(&self, owner: &str) {
        self.lock().retain(|(o, _), _| o != owner);
    }

    fn counter_satisfied(&self, owner: &str, kind: ResourceKind, counter: &Counter) -> bool {
        if counter.fulfilled() {
            return true;
        }
        if counter.raised_at.elapsed() >= self.ttl {
            warn!(
                %owner,
                %kind,
                adds = counter.adds,
                deletes = counter.deletes,
                "expectations expired unobserved"
            );
            return true;
        }
        false
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<(String, ResourceKind), Counter>> {
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: &str = "warden/warden";

    #[test]
    fn raise_then_observe() {
        let exp = Expectations::default();
        assert!(exp.satisfied(OWNER, ResourceKind::Role));

        exp.raise(OWNER, ResourceKind::Role, 2, 0);
        assert!(!exp.satisfied(OWNER, ResourceKind::Role));
        assert!(!exp.all_satisfied(OWNER));
        assert_eq!(exp.pending(OWNER, ResourceKind::Role), (2, 0));

        exp.creation_observed(OWNER, ResourceKind::Role);
        assert!(!exp.satisfied(OWNER, ResourceKind::Role));
        exp.creation_observed(OWNER, ResourceKind::Role);
        assert!(exp.satisfied(OWNER, ResourceKind::Role));
        assert!(exp.all_satisfied(OWNER));
    }

    #[test]
    fn lower_rolls_back_raise() {
        let exp = Expectations::default();
        exp.raise(OWNER, ResourceKind::ClusterRole, 1, 0);
        exp.lower(OWNER, ResourceKind::ClusterRole, 1, 0);
        assert!(exp.satisfied(OWNER, ResourceKind::ClusterRole));
        assert_eq!(exp.pending(OWNER, ResourceKind::ClusterRole), (0, 0));
    }

    #[test]
    fn unexpected_observations_are_ignored() {
        let exp = Expectations::default();
        exp.creation_observed(OWNER, ResourceKind::Role);
        exp.raise(OWNER, ResourceKind::Role, 0, 1);
        exp.creation_observed(OWNER, ResourceKind::Role);
        assert_eq!(exp.pending(OWNER, ResourceKind::Role), (0, 1));

        exp.deletion_observed(OWNER, ResourceKind::Role);
        assert!(exp.satisfied(OWNER, ResourceKind::Role));
    }

    #[test]
    fn owners_and_kinds_are_independent() {
        let exp = Expectations::default();
        exp.raise(OWNER, ResourceKind::Role, 1, 0);

        assert!(exp.satisfied(OWNER, ResourceKind::RoleBinding));
        assert!(exp.all_satisfied("other/owner"));
        assert!(!exp.all_satisfied(OWNER));
    }

    #[test]
    fn expired_expectations_count_as_satisfied() {
        let exp = Expectations::new(Duration::ZERO);
        exp.raise(OWNER, ResourceKind::Role, 1, 0);
        assert!(exp.satisfied(OWNER, ResourceKind::Role));
        assert!(exp.all_satisfied(OWNER));
    }

    #[test]
    fn forget_drops_owner() {
        let exp = Expectations::default();
        exp.raise(OWNER, ResourceKind::Role, 1, 0);
        exp.raise("other/owner", ResourceKind::Role, 1, 0);

        exp.forget(OWNER);
        assert!(exp.all_satisfied(OWNER));
        assert!(!exp.all_satisfied("other/owner"));
    }
}
