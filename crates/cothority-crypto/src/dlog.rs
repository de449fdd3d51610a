//! Shared brute-force discrete-log lookup service.
//!
//! `spec.md` §9 calls for encapsulating "the memoization table behind a
//! small service with `add(point→int)` and `lookup(point)`, share the
//! service across threshold-decrypt runs." Entries are never removed
//! (`spec.md` §5: "reads are lock-free (acceptable because entries are
//! never removed)"), so a simple mutex-guarded map is sufficient — no
//! need for anything fancier than `parking_lot::Mutex`.

use crate::group::{base_point, Point};
use cothority_core::{CothorityError, Result};
use parking_lot::Mutex;
use std::collections::HashMap;

/// `C_MAX = N`: documents will not accumulate more occurrences of a single
/// leaf than there are nodes in the roster (`spec.md` §4.4).
pub struct DiscreteLogTable {
    max: u64,
    table: Mutex<HashMap<[u8; 32], u64>>,
}

impl DiscreteLogTable {
    /// Build a table pre-populated for `0..=max` (the common case — callers
    /// know the roster size up front).
    pub fn new(max: u64) -> Self {
        let table = Self {
            max,
            table: Mutex::new(HashMap::new()),
        };
        table.populate();
        table
    }

    fn populate(&self) {
        let mut guard = self.table.lock();
        let mut acc = Point::default();
        for x in 0..=self.max {
            guard.entry(acc.compress().to_bytes()).or_insert(x);
            acc += base_point();
        }
    }

    /// Idempotent insert, in case a caller widens the table at runtime.
    pub fn add(&self, point: Point, value: u64) {
        self.table.lock().insert(point.compress().to_bytes(), value);
    }

    /// Recover the small integer `x` such that `point == x*G`, `x <= max`.
    pub fn lookup(&self, point: Point) -> Result<u64> {
        self.table
            .lock()
            .get(&point.compress().to_bytes())
            .copied()
            .ok_or_else(|| {
                CothorityError::crypto(format!(
                    "discrete log not found within bound {}",
                    self.max
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn populated_table_recovers_small_counts() {
        let table = DiscreteLogTable::new(8);
        for x in 0..=8u64 {
            let point = base_point() * crate::group::Scalar::from(x);
            assert_eq!(table.lookup(point).unwrap(), x);
        }
    }

    #[test]
    fn lookup_beyond_bound_fails() {
        let table = DiscreteLogTable::new(2);
        let point = base_point() * crate::group::Scalar::from(100u64);
        assert!(table.lookup(point).is_err());
    }
}
