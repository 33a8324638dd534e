//! Rolling snapshot pair used to compute per-nominee vote deltas.
//!
//! Each successful poll yields a payload whose *signature* is the `|`-joined
//! list of `keyNominee:count:percent:rank` in payload order. The pair only
//! rotates when that signature changes, so a poll that returns the same data
//! as the last one leaves the previous snapshot (and therefore every delta)
//! untouched.

use std::collections::HashMap;

use crate::nominee::Nominee;

/// Vote state of one nominee at one successful fetch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoteState {
    pub count: u64,
    pub percent: f64,
    pub rank: u32,
}

/// `keyNominee` → vote state captured at one successful fetch.
///
/// Snapshots are replaced wholesale, never merged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    entries: HashMap<i64, VoteState>,
}

impl Snapshot {
    pub fn from_nominees(nominees: &[Nominee]) -> Self {
        let entries = nominees
            .iter()
            .map(|n| {
                (
                    n.key_nominee,
                    VoteState {
                        count: n.count,
                        percent: n.percent,
                        rank: n.rank,
                    },
                )
            })
            .collect();
        Self { entries }
    }

    pub fn get(&self, key_nominee: i64) -> Option<&VoteState> {
        self.entries.get(&key_nominee)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Derive the change-detection signature of a payload.
///
/// Numbers use their shortest display form, so `50.0` renders as `50`.
pub fn signature(nominees: &[Nominee]) -> String {
    nominees
        .iter()
        .map(|n| format!("{}:{}:{}:{}", n.key_nominee, n.count, n.percent, n.rank))
        .collect::<Vec<_>>()
        .join("|")
}

/// The "previous" and "current" snapshots plus the last accepted signature.
#[derive(Debug, Clone, Default)]
pub struct SnapshotPair {
    previous: Snapshot,
    current: Snapshot,
    signature: String,
}

impl SnapshotPair {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a freshly fetched payload. Returns `true` when the pair rotated.
    ///
    /// An empty payload has an empty signature and never rotates.
    pub fn observe(&mut self, nominees: &[Nominee]) -> bool {
        let sig = signature(nominees);
        if sig.is_empty() || sig == self.signature {
            return false;
        }
        let next = Snapshot::from_nominees(nominees);
        self.previous = std::mem::replace(&mut self.current, next);
        self.signature = sig;
        true
    }

    pub fn previous(&self) -> &Snapshot {
        &self.previous
    }

    pub fn current(&self) -> &Snapshot {
        &self.current
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Count from the previous snapshot, or the nominee's own count when it
    /// was not in the previous snapshot (first observation).
    pub fn before_count(&self, nominee: &Nominee) -> u64 {
        self.previous
            .get(nominee.key_nominee)
            .map(|s| s.count)
            .unwrap_or(nominee.count)
    }

    pub fn delta(&self, nominee: &Nominee) -> i64 {
        let before = self.before_count(nominee);
        (nominee.count as i64).saturating_sub(before as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nominee(key: i64, count: u64, percent: f64, rank: u32) -> Nominee {
        Nominee {
            key_nominee: key,
            key_brand: 0,
            subject: format!("N{key}"),
            etc: None,
            percent,
            count,
            rank,
            file: None,
            other_file: None,
        }
    }

    #[test]
    fn signature_uses_shortest_number_form() {
        let rows = vec![nominee(1, 100, 50.0, 1), nominee(2, 80, 40.5, 2)];
        assert_eq!(signature(&rows), "1:100:50:1|2:80:40.5:2");
    }

    #[test]
    fn signature_depends_on_order() {
        let a = vec![nominee(1, 100, 50.0, 1), nominee(2, 80, 40.0, 2)];
        let b = vec![nominee(2, 80, 40.0, 2), nominee(1, 100, 50.0, 1)];
        assert_ne!(signature(&a), signature(&b));
    }

    #[test]
    fn first_observation_has_zero_delta() {
        let mut pair = SnapshotPair::new();
        let rows = vec![nominee(1, 100, 50.0, 1), nominee(2, 80, 40.0, 2)];
        assert!(pair.observe(&rows));
        assert!(pair.previous().is_empty());
        for n in &rows {
            assert_eq!(pair.delta(n), 0);
            assert_eq!(pair.before_count(n), n.count);
        }
    }

    #[test]
    fn identical_signature_does_not_rotate() {
        let mut pair = SnapshotPair::new();
        let first = vec![nominee(1, 100, 50.0, 1)];
        let second = vec![nominee(1, 120, 55.0, 1)];
        pair.observe(&first);
        pair.observe(&second);
        let previous = pair.previous().clone();

        assert!(!pair.observe(&second));
        assert!(!pair.observe(&second));
        assert_eq!(pair.previous(), &previous);
        assert_eq!(pair.delta(&second[0]), 20);
    }

    #[test]
    fn changed_signature_rotates_exactly_once() {
        let mut pair = SnapshotPair::new();
        let first = vec![nominee(1, 100, 50.0, 1)];
        let second = vec![nominee(1, 130, 52.0, 1)];
        pair.observe(&first);
        let old_current = pair.current().clone();

        assert!(pair.observe(&second));
        assert_eq!(pair.previous(), &old_current);
        assert_eq!(pair.current(), &Snapshot::from_nominees(&second));
        assert_eq!(pair.signature(), "1:130:52:1");
    }

    #[test]
    fn empty_payload_never_rotates() {
        let mut pair = SnapshotPair::new();
        pair.observe(&[nominee(1, 10, 100.0, 1)]);
        assert!(!pair.observe(&[]));
        assert_eq!(pair.current().len(), 1);
    }

    #[test]
    fn decreasing_count_gives_negative_delta() {
        let mut pair = SnapshotPair::new();
        pair.observe(&[nominee(7, 500, 10.0, 3)]);
        let now = nominee(7, 450, 9.0, 4);
        pair.observe(std::slice::from_ref(&now));
        assert_eq!(pair.delta(&now), -50);
    }
}
