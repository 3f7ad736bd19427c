//! Day's cluster table.
//!
//! Relabel the leaves of a tree `0..n` in the order a post-order walk meets
//! them. Every cluster of that tree is then an interval `[L, R]` of leaf
//! codes, and can be stored in one of two cells of an `n`-cell array:
//!
//! ```text
//!        root               codes:  A=0 B=1 C=2 D=3 E=4
//!       /    \
//!    (A,B)  (C,(D,E))       (A,B)     = [0,1]  successor C is a leaf   -> cells[1]
//!                           (D,E)     = [3,4]  successor is internal   -> cells[3]
//!                           (C,(D,E)) = [2,4]  successor is the root   -> cells[2]
//! ```
//!
//! A cluster whose post-order successor is a leaf (or that is last) is
//! stored at `cells[R]`, any other at `cells[L]`. The two rules never clash,
//! so membership is a constant-time check of both cells.

use crate::encoding::CollapsedPostOrder;

/// Clusters of one tree as leaf-code intervals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayTable {
    /// Taxon index to leaf code.
    encoding: Vec<usize>,
    cells: Vec<Option<(usize, usize)>>,
    count: usize,
}

impl DayTable {
    /// Build the table from a collapsed post-order encoding.
    ///
    /// Only the cluster spanning every leaf is left out.
    pub fn from_order(order: &CollapsedPostOrder) -> Self {
        let n = order.num_taxa();
        let visits = order.visits();
        let mut table = DayTable { encoding: vec![0; n], cells: vec![None; n], count: 0 };
        let mut next_code = 0;

        for (pos, visit) in visits.iter().enumerate() {
            if visit.is_leaf() {
                table.encoding[visit.vertex] = next_code;
                next_code += 1;
                continue;
            }
            let left = table.encoding[order.leftmost_leaf(pos)];
            let right = next_code - 1;
            if left == 0 && right + 1 == n {
                continue;
            }
            let at = match visits.get(pos + 1) {
                None => right,
                Some(next) if next.is_leaf() => right,
                Some(_) => left,
            };
            table.cells[at] = Some((left, right));
            table.count += 1;
        }
        table
    }

    /// Whether `[left, right]` is a cluster of the tree.
    pub fn contains(&self, left: usize, right: usize) -> bool {
        let hit = |i: usize| self.cells.get(i).copied().flatten() == Some((left, right));
        hit(left) || hit(right)
    }

    /// Clusters stored, whole-tree cluster excluded.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Leaf code of `taxon`.
    pub fn leaf_code(&self, taxon: usize) -> Option<usize> {
        self.encoding.get(taxon).copied()
    }

    pub fn num_taxa(&self) -> usize {
        self.encoding.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::TreeSnapshot;
    use crate::taxa::TaxonSet;

    fn table(newick: &str, names: &[&str]) -> DayTable {
        let taxa = TaxonSet::from_names(names.iter().copied()).unwrap();
        let snap = TreeSnapshot::from_newick(newick, &taxa).unwrap();
        DayTable::from_order(&CollapsedPostOrder::encode(&snap).unwrap())
    }

    #[test]
    fn test_cells() {
        let t = table("((A,B),(C,(D,E)));", &["A", "B", "C", "D", "E"]);
        assert_eq!(t.len(), 3);
        assert!(t.contains(0, 1));
        assert!(t.contains(3, 4));
        assert!(t.contains(2, 4));
        assert!(!t.contains(0, 4));
        assert!(!t.contains(1, 2));
        assert!(!t.contains(2, 3));
    }

    #[test]
    fn test_codes_follow_traversal() {
        // D is met first, A last
        let t = table("((D,C),(B,A));", &["A", "B", "C", "D"]);
        assert_eq!(t.leaf_code(3), Some(0));
        assert_eq!(t.leaf_code(2), Some(1));
        assert_eq!(t.leaf_code(1), Some(2));
        assert_eq!(t.leaf_code(0), Some(3));
        assert!(t.contains(0, 1));
        assert!(t.contains(2, 3));
    }

    #[test]
    fn test_nested_clusters_share_an_end() {
        // (((A,B),C),D): clusters [0,1] and [0,2] share L = 0
        let t = table("(((A,B),C),D);", &["A", "B", "C", "D"]);
        assert_eq!(t.len(), 2);
        assert!(t.contains(0, 1));
        assert!(t.contains(0, 2));

        // (A,(B,(C,D))): clusters [2,3] and [1,3] share R = 3
        let t = table("(A,(B,(C,D)));", &["A", "B", "C", "D"]);
        assert_eq!(t.len(), 2);
        assert!(t.contains(2, 3));
        assert!(t.contains(1, 3));
    }

    #[test]
    fn test_star_is_empty() {
        let t = table("(A,B,C,D);", &["A", "B", "C", "D"]);
        assert!(t.is_empty());
        assert!(!t.contains(0, 3));
    }
}
