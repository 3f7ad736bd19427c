//! Randomized double-hash fingerprints of bipartitions.
//!
//! # Overview
//! Every taxon gets two random codes per trial: `h1` drawn without
//! replacement from `[0, S)` and `h2` drawn without replacement from
//! `[0, 10·S)`, where `S` is the registry's table size. An internal node's
//! fingerprint is the sum of its children's codes modulo `S`:
//!
//! ```text
//! H1(v) = Σ H1(child) mod S        H2(v) = Σ H2(child) mod S
//! ```
//!
//! A leaf child contributes its taxon's codes, an internal child its own
//! `(H1, H2)`. Two nodes with the same leaf set therefore get the same pair
//! under the same draw, in any tree. Different leaf sets usually get
//! different pairs; the registry's double-collision check and the final
//! round-trip validation catch the cases where they do not.

use std::collections::HashMap;

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::bitset::Bitset;
use crate::encoding::PostOrder;
use crate::error::{Error, Result};
use crate::view::{NodeId, TreeView};

/// `h2` codes are drawn from a range this many times larger than `h1`.
pub const SECOND_RANGE_FACTOR: usize = 10;

/// Probabilistic identifier of the leaf set below an internal node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    /// Slot in the registry, in `[0, S)`.
    pub h1: usize,
    /// Verification hash, compared within a slot's chain.
    pub h2: usize,
}

/// Smallest prime `>= n`.
pub fn next_prime(n: usize) -> usize {
    (n.max(2)..).find(|&k| is_prime(k)).unwrap_or(n)
}

/// Trial division primality test.
pub fn is_prime(n: usize) -> bool {
    if n <= 2 {
        return n == 2;
    }
    if n % 2 == 0 {
        return false;
    }
    let mut i = 3;
    while i * i <= n {
        if n % i == 0 {
            return false;
        }
        i += 2;
    }
    true
}

/// Registry table size for `num_leaves` taxa: smallest prime `>= 7·num_leaves`.
///
/// Linear in the number of leaves and independent of the number of trees,
/// since the number of distinct bipartitions in a tree set is usually
/// a small multiple of the leaf count.
pub fn table_size_for(num_leaves: usize) -> usize {
    next_prime(num_leaves + 6 * num_leaves)
}

/// Draws fresh per-taxon codes for each trial.
#[derive(Debug, Clone)]
pub struct FingerprintAssignor {
    table_size: usize,
    rng: Xoshiro256PlusPlus,
    seen: Bitset,
}

impl FingerprintAssignor {
    /// Create an assignor for a table of `table_size` slots.
    ///
    /// With `seed = None` the generator is seeded from the thread RNG.
    pub fn new(table_size: usize, seed: Option<u64>) -> Self {
        let seed = seed.unwrap_or_else(rand::random);
        FingerprintAssignor {
            table_size,
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
            seen: Bitset::with_bits(SECOND_RANGE_FACTOR * table_size),
        }
    }

    pub fn table_size(&self) -> usize {
        self.table_size
    }

    /// Draw `h1`/`h2` for `num_taxa` taxa, each array free of duplicates.
    ///
    /// # Errors
    /// [`Error::TaxonSetMismatch`] if `num_taxa` exceeds the table size, in
    /// which case distinct `h1` codes cannot exist.
    pub fn draw(&mut self, num_taxa: usize) -> Result<TaxonCodes> {
        if num_taxa > self.table_size {
            return Err(Error::TaxonSetMismatch(format!(
                "{num_taxa} taxa do not fit a fingerprint table of size {}",
                self.table_size
            )));
        }
        let h1 = self.draw_distinct(num_taxa, self.table_size);
        let h2 = self.draw_distinct(num_taxa, SECOND_RANGE_FACTOR * self.table_size);
        Ok(TaxonCodes { h1, h2, table_size: self.table_size })
    }

    fn draw_distinct(&mut self, count: usize, range: usize) -> Vec<usize> {
        self.seen.clear();
        (0..count)
            .map(|_| loop {
                let code = self.rng.random_range(0..range);
                if self.seen.insert(code) {
                    break code;
                }
            })
            .collect()
    }
}

/// Per-taxon codes of one trial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonCodes {
    h1: Vec<usize>,
    h2: Vec<usize>,
    table_size: usize,
}

impl TaxonCodes {
    /// Build codes directly, mostly useful in tests.
    pub fn from_parts(h1: Vec<usize>, h2: Vec<usize>, table_size: usize) -> Self {
        TaxonCodes { h1, h2, table_size }
    }

    pub fn h1(&self) -> &[usize] {
        &self.h1
    }

    pub fn h2(&self) -> &[usize] {
        &self.h2
    }

    pub fn table_size(&self) -> usize {
        self.table_size
    }

    /// Fingerprint every internal node of `view`.
    ///
    /// `order` must be the [`PostOrder`] of the same view: children are
    /// finished before their parent, so each parent only sums values that
    /// are already known.
    pub fn fingerprint<V: TreeView + ?Sized>(&self, view: &V, order: &PostOrder) -> Result<NodeFingerprints> {
        let s = self.table_size;
        let mut by_node = HashMap::with_capacity(order.len());

        for visit in order.internal() {
            let (mut sum1, mut sum2) = (0usize, 0usize);
            for child in view.children(visit.vertex) {
                let (c1, c2) = if view.is_terminal(child) {
                    let taxon = view.taxon_of(child).ok_or(Error::UnlabeledLeaf(child))?;
                    match (self.h1.get(taxon), self.h2.get(taxon)) {
                        (Some(&a), Some(&b)) => (a, b),
                        _ => return Err(Error::TaxonOutOfRange { taxon, num_taxa: self.h1.len() }),
                    }
                } else {
                    let fp: &Fingerprint = by_node.get(&child).ok_or(Error::EncodingMismatch(child))?;
                    (fp.h1, fp.h2)
                };
                sum1 = (sum1 + c1) % s;
                sum2 = (sum2 + c2) % s;
            }
            by_node.insert(visit.vertex, Fingerprint { h1: sum1, h2: sum2 });
        }

        Ok(NodeFingerprints { by_node })
    }
}

/// Fingerprints of the internal nodes of one tree under one draw.
#[derive(Debug, Clone, Default)]
pub struct NodeFingerprints {
    by_node: HashMap<NodeId, Fingerprint>,
}

impl NodeFingerprints {
    pub fn get(&self, node: NodeId) -> Option<Fingerprint> {
        self.by_node.get(&node).copied()
    }

    pub fn len(&self) -> usize {
        self.by_node.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_node.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::TreeSnapshot;
    use crate::taxa::TaxonSet;

    #[test]
    fn test_primes() {
        assert!(is_prime(2));
        assert!(is_prime(29));
        assert!(!is_prime(1));
        assert!(!is_prime(49));
        assert_eq!(next_prime(28), 29);
        assert_eq!(next_prime(29), 29);
        assert_eq!(next_prime(0), 2);
        // 4 taxa → 28 → 29; 10 taxa → 70 → 71
        assert_eq!(table_size_for(4), 29);
        assert_eq!(table_size_for(10), 71);
    }

    #[test]
    fn test_draws_are_distinct_and_in_range() {
        let mut assignor = FingerprintAssignor::new(29, Some(7));
        for _ in 0..20 {
            let codes = assignor.draw(29).unwrap();
            let mut h1 = codes.h1().to_vec();
            h1.sort_unstable();
            // all 29 slots drawn exactly once
            assert_eq!(h1, (0..29).collect::<Vec<_>>());

            let mut h2 = codes.h2().to_vec();
            h2.sort_unstable();
            h2.dedup();
            assert_eq!(h2.len(), 29);
            assert!(h2.iter().all(|&c| c < 290));
        }
    }

    #[test]
    fn test_seeded_draws_repeat() {
        let a = FingerprintAssignor::new(71, Some(42)).draw(10).unwrap();
        let b = FingerprintAssignor::new(71, Some(42)).draw(10).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_too_many_taxa() {
        let mut assignor = FingerprintAssignor::new(5, Some(1));
        assert!(assignor.draw(6).is_err());
    }

    /// Fingerprints depend on the leaf set only, not on child order or
    /// tree shape above the node.
    #[test]
    fn test_same_leaf_set_same_fingerprint() {
        let taxa = TaxonSet::from_names(["A", "B", "C", "D", "E"]).unwrap();
        let t1 = TreeSnapshot::from_newick("(((A,B),C),(D,E));", &taxa).unwrap();
        let t2 = TreeSnapshot::from_newick("((E,D),(C,(B,A)));", &taxa).unwrap();

        let codes = FingerprintAssignor::new(table_size_for(5), Some(3)).draw(5).unwrap();
        let o1 = PostOrder::encode(&t1).unwrap();
        let o2 = PostOrder::encode(&t2).unwrap();
        let f1 = codes.fingerprint(&t1, &o1).unwrap();
        let f2 = codes.fingerprint(&t2, &o2).unwrap();
        assert_eq!(f1.len(), 4);

        let by_leaves = |order: &PostOrder, fps: &NodeFingerprints| {
            let mut v: Vec<_> = order
                .internal()
                .map(|visit| (visit.weight, fps.get(visit.vertex).unwrap()))
                .collect();
            v.sort_by_key(|(w, fp)| (*w, fp.h1, fp.h2));
            v
        };
        assert_eq!(by_leaves(&o1, &f1), by_leaves(&o2, &f2));
    }

    #[test]
    fn test_fingerprint_is_sum_mod_table() {
        let taxa = TaxonSet::from_names(["A", "B", "C"]).unwrap();
        let tree = TreeSnapshot::from_newick("((A,B),C);", &taxa).unwrap();
        let order = PostOrder::encode(&tree).unwrap();
        let codes = TaxonCodes::from_parts(vec![5, 9, 12], vec![40, 3, 100], 13);

        let fps = codes.fingerprint(&tree, &order).unwrap();
        let root = tree.root().unwrap();
        let cherry = tree.first_child(root).unwrap();

        assert_eq!(fps.get(cherry), Some(Fingerprint { h1: (5 + 9) % 13, h2: (40 + 3) % 13 }));
        assert_eq!(
            fps.get(root),
            Some(Fingerprint { h1: (14 % 13 + 12) % 13, h2: (43 % 13 + 100) % 13 })
        );
    }
}
