//! Chained hash table of bipartition records.
//!
//! # Layout
//! Records live in one arena (`Vec<BipartitionRecord>`) and are addressed by
//! [`RecordId`]. Each slot of the table holds the head of a chain; chain
//! links, parents and children are all arena indices, so clearing the
//! registry between trials drops every record without touching the
//! allocator.
//!
//! ```text
//! heads:   [ None, Some(0), None, Some(2), ... ]      (indexed by H1)
//!                    │                │
//! records: 0 ──next──► 1              2
//!          (H2=17)     (H2=40)        (H2=3)
//! ```
//!
//! Within a chain no two records share `H2`. Meeting an existing `H2` with
//! a different leaf count is a *double collision*: two different leaf sets
//! got the same fingerprint pair, which poisons the whole trial.

use thiserror::Error;

use crate::fingerprint::Fingerprint;

/// Index of a record in the registry's arena.
pub type RecordId = usize;

/// Two bipartitions with different leaf counts share one fingerprint.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("double collision at slot {h1} (h2 = {h2}): {stored} vs {found} leaves")]
pub struct DoubleCollision {
    pub h1: usize,
    pub h2: usize,
    pub stored: usize,
    pub found: usize,
}

/// One distinct bipartition seen during the current trial.
#[derive(Debug, Clone, PartialEq)]
pub struct BipartitionRecord {
    /// Number of input trees containing this bipartition.
    pub count: usize,
    /// Leaves below the node that defines it.
    pub leaves: usize,
    /// Verification hash.
    pub h2: usize,
    /// Set once the record has been materialised as a majority node.
    pub seen: bool,
    /// Nearest majority ancestor known so far; `None` for the root cluster.
    pub parent: Option<RecordId>,
    /// Taxa whose nearest majority ancestor is this record.
    pub taxon_children: Vec<usize>,
    /// Majority records whose nearest majority ancestor is this record.
    pub internal_children: Vec<RecordId>,
    next: Option<RecordId>,
}

impl BipartitionRecord {
    fn new(leaves: usize, h2: usize) -> Self {
        BipartitionRecord {
            count: 1,
            leaves,
            h2,
            seen: false,
            parent: None,
            taxon_children: Vec::new(),
            internal_children: Vec::new(),
            next: None,
        }
    }
}

/// Hash table keyed by `H1`, chaining on `H2`.
#[derive(Debug, Clone)]
pub struct BipartitionRegistry {
    heads: Vec<Option<RecordId>>,
    records: Vec<BipartitionRecord>,
}

impl BipartitionRegistry {
    pub fn new(table_size: usize) -> Self {
        BipartitionRegistry { heads: vec![None; table_size], records: Vec::new() }
    }

    pub fn table_size(&self) -> usize {
        self.heads.len()
    }

    /// Number of distinct bipartitions recorded.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop every record. Capacity is kept for the next trial.
    pub fn clear(&mut self) {
        self.heads.fill(None);
        self.records.clear();
    }

    pub fn record(&self, id: RecordId) -> &BipartitionRecord {
        &self.records[id]
    }

    fn chain(&self, h1: usize) -> impl Iterator<Item = RecordId> + '_ {
        std::iter::successors(self.heads.get(h1).copied().flatten(), |&id| self.records[id].next)
    }

    /// Count one occurrence of the bipartition `fp` with `leaves` leaves.
    ///
    /// # Errors
    /// [`DoubleCollision`] if a record with the same `H2` but a different
    /// leaf count is already chained at `H1`.
    pub fn insert_or_count(&mut self, fp: Fingerprint, leaves: usize) -> Result<RecordId, DoubleCollision> {
        let mut last = None;
        let mut cur = self.heads[fp.h1];
        while let Some(id) = cur {
            let rec = &mut self.records[id];
            if rec.h2 == fp.h2 {
                if rec.leaves != leaves {
                    return Err(DoubleCollision { h1: fp.h1, h2: fp.h2, stored: rec.leaves, found: leaves });
                }
                rec.count += 1;
                return Ok(id);
            }
            last = Some(id);
            cur = rec.next;
        }

        let id = self.records.len();
        self.records.push(BipartitionRecord::new(leaves, fp.h2));
        match last {
            Some(tail) => self.records[tail].next = Some(id),
            None => self.heads[fp.h1] = Some(id),
        }
        Ok(id)
    }

    /// Record with fingerprint `fp`, if any.
    pub fn find(&self, fp: Fingerprint) -> Option<RecordId> {
        self.chain(fp.h1).find(|&id| self.records[id].h2 == fp.h2)
    }

    /// Whether `fp` occurs in more than `num_trees * threshold` trees.
    pub fn is_majority(&self, fp: Fingerprint, num_trees: usize, threshold: f64) -> bool {
        self.find(fp)
            .is_some_and(|id| self.records[id].count as f64 > num_trees as f64 * threshold)
    }

    /// Flag `fp` as materialised; returns its record.
    pub fn mark_seen(&mut self, fp: Fingerprint) -> Option<RecordId> {
        let id = self.find(fp)?;
        self.records[id].seen = true;
        Some(id)
    }

    pub fn has_been_seen(&self, fp: Fingerprint) -> bool {
        self.find(fp).is_some_and(|id| self.records[id].seen)
    }

    /// Whether a record with fingerprint `fp` and exactly `leaves` leaves exists.
    pub fn verify_contains(&self, fp: Fingerprint, leaves: usize) -> bool {
        self.find(fp).is_some_and(|id| self.records[id].leaves == leaves)
    }

    /// Make `parent` the recorded parent of `child`, detaching it from its
    /// previous parent's children.
    pub fn adopt_record(&mut self, parent: RecordId, child: RecordId) {
        if let Some(old) = self.records[child].parent {
            self.records[old].internal_children.retain(|&c| c != child);
        }
        self.records[child].parent = Some(parent);
        self.records[parent].internal_children.push(child);
    }

    /// Make `parent` the recorded parent of `taxon`, detaching it from `old`.
    pub fn adopt_taxon(&mut self, parent: RecordId, taxon: usize, old: Option<RecordId>) {
        if let Some(old) = old {
            self.release_taxon(old, taxon);
        }
        self.records[parent].taxon_children.push(taxon);
    }

    pub fn release_taxon(&mut self, parent: RecordId, taxon: usize) {
        self.records[parent].taxon_children.retain(|&t| t != taxon);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(h1: usize, h2: usize) -> Fingerprint {
        Fingerprint { h1, h2 }
    }

    #[test]
    fn test_insert_and_count() {
        let mut reg = BipartitionRegistry::new(11);
        let a = reg.insert_or_count(fp(3, 40), 2).unwrap();
        let b = reg.insert_or_count(fp(3, 40), 2).unwrap();
        assert_eq!(a, b);
        assert_eq!(reg.record(a).count, 2);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_chain_on_h1_collision() {
        let mut reg = BipartitionRegistry::new(11);
        let a = reg.insert_or_count(fp(3, 40), 2).unwrap();
        let b = reg.insert_or_count(fp(3, 7), 5).unwrap();
        let c = reg.insert_or_count(fp(3, 9), 2).unwrap();
        assert_eq!(reg.len(), 3);
        assert_eq!(reg.chain(3).collect::<Vec<_>>(), vec![a, b, c]);
        assert_eq!(reg.find(fp(3, 7)), Some(b));
        assert_eq!(reg.find(fp(3, 8)), None);
        assert_eq!(reg.find(fp(4, 7)), None);
    }

    #[test]
    fn test_count_deep_in_chain() {
        let mut reg = BipartitionRegistry::new(5);
        let ids: Vec<_> = (0..4).map(|h2| reg.insert_or_count(fp(2, h2), 3).unwrap()).collect();
        assert_eq!(reg.insert_or_count(fp(2, 2), 3).unwrap(), ids[2]);
        assert_eq!(reg.insert_or_count(fp(2, 3), 3).unwrap(), ids[3]);
        assert_eq!(reg.insert_or_count(fp(2, 3), 3).unwrap(), ids[3]);
        let counts: Vec<_> = ids.iter().map(|&id| reg.record(id).count).collect();
        assert_eq!(counts, vec![1, 1, 2, 3]);

        let tail = reg.insert_or_count(fp(2, 9), 1).unwrap();
        assert_eq!(reg.chain(2).last(), Some(tail));
        assert!(reg.insert_or_count(fp(2, 3), 4).is_err());
    }

    #[test]
    fn test_double_collision() {
        let mut reg = BipartitionRegistry::new(11);
        reg.insert_or_count(fp(3, 40), 2).unwrap();
        let err = reg.insert_or_count(fp(3, 40), 4).unwrap_err();
        assert_eq!(err, DoubleCollision { h1: 3, h2: 40, stored: 2, found: 4 });
    }

    #[test]
    fn test_majority_is_strict() {
        let mut reg = BipartitionRegistry::new(11);
        for _ in 0..2 {
            reg.insert_or_count(fp(1, 1), 2).unwrap();
        }
        for _ in 0..3 {
            reg.insert_or_count(fp(2, 1), 2).unwrap();
        }
        // 4 trees at 0.5: 2 is not > 2, 3 is
        assert!(!reg.is_majority(fp(1, 1), 4, 0.5));
        assert!(reg.is_majority(fp(2, 1), 4, 0.5));
        assert!(!reg.is_majority(fp(5, 5), 4, 0.5));
    }

    #[test]
    fn test_seen_flag_and_verify() {
        let mut reg = BipartitionRegistry::new(11);
        let id = reg.insert_or_count(fp(6, 2), 3).unwrap();
        assert!(!reg.has_been_seen(fp(6, 2)));
        assert_eq!(reg.mark_seen(fp(6, 2)), Some(id));
        assert!(reg.has_been_seen(fp(6, 2)));
        assert_eq!(reg.mark_seen(fp(6, 9)), None);

        assert!(reg.verify_contains(fp(6, 2), 3));
        assert!(!reg.verify_contains(fp(6, 2), 4));
        assert!(!reg.verify_contains(fp(7, 2), 3));
    }

    #[test]
    fn test_clear_drops_everything() {
        let mut reg = BipartitionRegistry::new(11);
        reg.insert_or_count(fp(6, 2), 3).unwrap();
        reg.insert_or_count(fp(6, 4), 3).unwrap();
        reg.clear();
        assert!(reg.is_empty());
        assert_eq!(reg.find(fp(6, 2)), None);
        let id = reg.insert_or_count(fp(6, 4), 3).unwrap();
        assert_eq!(id, 0);
        assert_eq!(reg.record(id).count, 1);
    }

    #[test]
    fn test_reparenting_bookkeeping() {
        let mut reg = BipartitionRegistry::new(11);
        let root = reg.insert_or_count(fp(0, 0), 4).unwrap();
        let big = reg.insert_or_count(fp(1, 1), 3).unwrap();
        let small = reg.insert_or_count(fp(2, 2), 2).unwrap();

        reg.adopt_record(root, small);
        reg.adopt_taxon(root, 7, None);
        assert_eq!(reg.record(root).internal_children, vec![small]);

        reg.adopt_record(big, small);
        reg.adopt_taxon(small, 7, Some(root));
        assert!(reg.record(root).internal_children.is_empty());
        assert!(reg.record(root).taxon_children.is_empty());
        assert_eq!(reg.record(small).parent, Some(big));
        assert_eq!(reg.record(big).internal_children, vec![small]);
        assert_eq!(reg.record(small).taxon_children, vec![7]);
    }
}
