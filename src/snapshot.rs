//! Immutable topology snapshots of `phylotree` trees.
//!
//! # Overview
//! A [`TreeSnapshot`] flattens a parsed tree into first-child / next-sibling
//! arrays with every leaf resolved to its taxon index. Once built it never
//! changes, so it can be encoded repeatedly across consensus trials and
//! shared between threads when computing distance matrices.
//!
//! # What gets checked
//! Building a snapshot validates the tree against its [`TaxonSet`]:
//! every leaf must be named, every name must belong to the set, and every
//! taxon of the set must appear exactly once.
//!
//! ```text
//!        root                first_child[root]  = node1
//!       /    \               next_sibling[node1] = C
//!    node1    C              taxon[A] = 0, taxon[B] = 1, taxon[C] = 2
//!    /   \
//!   A     B
//! ```

use phylotree::tree::Tree as PhyloTree;

use crate::bitset::Bitset;
use crate::error::{Error, Result};
use crate::taxa::TaxonSet;
use crate::view::{NodeId, TreeView};

/// An immutable, taxon-indexed snapshot of a tree's topology.
///
/// Node ids are the ids of the source `phylotree` tree.
#[derive(Debug, Clone)]
pub struct TreeSnapshot {
    root: NodeId,
    first_child: Vec<Option<NodeId>>,
    next_sibling: Vec<Option<NodeId>>,
    taxon: Vec<Option<usize>>,
    num_taxa: usize,
}

impl TreeSnapshot {
    /// Take a snapshot of `tree`, indexing its leaves through `taxa`.
    ///
    /// # Algorithm
    /// 1. Walk the tree from the root with an explicit stack
    /// 2. Record each node's first child and each child's next sibling
    /// 3. Resolve every leaf name to its taxon index
    /// 4. Check that all taxa were seen exactly once
    ///
    /// # Errors
    /// - [`Error::Tree`] if the tree is empty or has no root
    /// - [`Error::UnlabeledLeaf`] if a leaf has no name
    /// - [`Error::TaxonSetMismatch`] if the leaves and `taxa` disagree
    pub fn from_tree(tree: &PhyloTree, taxa: &TaxonSet) -> Result<Self> {
        let root = tree.get_root()?;

        let mut snap = TreeSnapshot {
            root,
            first_child: Vec::new(),
            next_sibling: Vec::new(),
            taxon: Vec::new(),
            num_taxa: taxa.len(),
        };
        let mut seen = Bitset::with_bits(taxa.len());

        let mut stack = vec![root];
        while let Some(node_id) = stack.pop() {
            snap.ensure_slot(node_id);
            let node = tree.get(&node_id)?;

            if node.children.is_empty() {
                let name = node.name.as_deref().ok_or(Error::UnlabeledLeaf(node_id))?;
                let idx = taxa.index_of(name).ok_or_else(|| {
                    Error::TaxonSetMismatch(format!("leaf '{name}' is not in the taxon set"))
                })?;
                if !seen.insert(idx) {
                    return Err(Error::TaxonSetMismatch(format!(
                        "leaf '{name}' appears more than once"
                    )));
                }
                snap.taxon[node_id] = Some(idx);
                continue;
            }

            snap.first_child[node_id] = node.children.first().copied();
            for pair in node.children.windows(2) {
                snap.ensure_slot(pair[0]);
                snap.next_sibling[pair[0]] = Some(pair[1]);
            }
            stack.extend(node.children.iter().copied());
        }

        if seen.count_ones() != taxa.len() {
            return Err(Error::TaxonSetMismatch(format!(
                "tree has {} of {} taxa",
                seen.count_ones(),
                taxa.len()
            )));
        }

        Ok(snap)
    }

    /// Parse a Newick string and snapshot it against `taxa`.
    pub fn from_newick(newick: &str, taxa: &TaxonSet) -> Result<Self> {
        let tree = PhyloTree::from_newick(newick).map_err(|e| Error::Parse(e.to_string()))?;
        Self::from_tree(&tree, taxa)
    }

    fn ensure_slot(&mut self, node_id: NodeId) {
        if node_id >= self.taxon.len() {
            let len = node_id + 1;
            self.first_child.resize(len, None);
            self.next_sibling.resize(len, None);
            self.taxon.resize(len, None);
        }
    }
}

impl TreeView for TreeSnapshot {
    fn root(&self) -> Option<NodeId> {
        Some(self.root)
    }

    fn first_child(&self, node: NodeId) -> Option<NodeId> {
        self.first_child.get(node).copied().flatten()
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.next_sibling.get(node).copied().flatten()
    }

    fn is_terminal(&self, node: NodeId) -> bool {
        self.first_child(node).is_none()
    }

    fn taxon_of(&self, node: NodeId) -> Option<usize> {
        self.taxon.get(node).copied().flatten()
    }

    fn num_taxa(&self) -> usize {
        self.num_taxa
    }
}

/// Parse Newick strings into snapshots over one shared taxon set.
///
/// The taxon set is taken from the first tree; every other tree must have
/// exactly the same leaf names.
pub fn snapshots_from_newick<S: AsRef<str>>(newicks: &[S]) -> Result<(TaxonSet, Vec<TreeSnapshot>)> {
    let trees = newicks
        .iter()
        .map(|s| PhyloTree::from_newick(s.as_ref()).map_err(|e| Error::Parse(e.to_string())))
        .collect::<Result<Vec<_>>>()?;
    snapshots_from_trees(&trees)
}

/// Snapshot parsed trees over the taxon set of the first tree.
pub fn snapshots_from_trees(trees: &[PhyloTree]) -> Result<(TaxonSet, Vec<TreeSnapshot>)> {
    let first = trees.first().ok_or(Error::EmptySelection)?;
    let taxa = TaxonSet::from_tree(first)?;
    let snaps = trees
        .iter()
        .map(|tree| TreeSnapshot::from_tree(tree, &taxa))
        .collect::<Result<Vec<_>>>()?;
    Ok((taxa, snaps))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf_taxa_in_order(snap: &TreeSnapshot) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack = vec![snap.root().unwrap()];
        while let Some(node) = stack.pop() {
            if snap.is_terminal(node) {
                out.push(snap.taxon_of(node).unwrap());
            } else {
                let children: Vec<_> = snap.children(node).collect();
                stack.extend(children.into_iter().rev());
            }
        }
        out
    }

    /// ```text
    ///           root
    ///          /    \
    ///      node1     C
    ///      /   \
    ///     B     A
    /// ```
    /// Sorted taxa: A=0, B=1, C=2, leaves read left to right: B, A, C
    #[test]
    fn test_snapshot_structure() {
        let taxa = TaxonSet::from_names(["A", "B", "C"]).unwrap();
        let snap = TreeSnapshot::from_newick("((B,A),C);", &taxa).unwrap();

        assert_eq!(snap.num_taxa(), 3);
        assert_eq!(leaf_taxa_in_order(&snap), vec![1, 0, 2]);

        let root = snap.root().unwrap();
        assert!(!snap.is_terminal(root));
        assert_eq!(snap.children(root).count(), 2);
    }

    #[test]
    fn test_missing_taxon_rejected() {
        let taxa = TaxonSet::from_names(["A", "B", "C", "D"]).unwrap();
        let err = TreeSnapshot::from_newick("((A,B),C);", &taxa).unwrap_err();
        assert!(matches!(err, Error::TaxonSetMismatch(_)));
    }

    #[test]
    fn test_foreign_taxon_rejected() {
        let taxa = TaxonSet::from_names(["A", "B", "C"]).unwrap();
        let err = TreeSnapshot::from_newick("((A,B),X);", &taxa).unwrap_err();
        assert!(matches!(err, Error::TaxonSetMismatch(_)));
    }

    #[test]
    fn test_shared_taxon_set() {
        let (taxa, snaps) =
            snapshots_from_newick(&["((A,B),(C,D));", "((D,C),(B,A));"]).unwrap();
        assert_eq!(taxa.names(), ["A", "B", "C", "D"]);
        assert_eq!(snaps.len(), 2);
        assert_eq!(leaf_taxa_in_order(&snaps[1]), vec![3, 2, 1, 0]);
    }

    #[test]
    fn test_snapshots_from_parsed_trees() {
        let trees: Vec<PhyloTree> = ["((C,A),B);", "(A,(B,C));"]
            .iter()
            .map(|s| PhyloTree::from_newick(s).unwrap())
            .collect();
        let (taxa, snaps) = snapshots_from_trees(&trees).unwrap();
        assert_eq!(taxa.len(), 3);
        assert_eq!(leaf_taxa_in_order(&snaps[0]), vec![2, 0, 1]);
        assert_eq!(leaf_taxa_in_order(&snaps[1]), vec![0, 1, 2]);

        assert!(matches!(snapshots_from_trees(&[]), Err(Error::EmptySelection)));
    }

    #[test]
    fn test_mismatched_tree_in_set() {
        let err = snapshots_from_newick(&["((A,B),C);", "((A,B),D);"]).unwrap_err();
        assert!(matches!(err, Error::TaxonSetMismatch(_)));
    }
}
