//! Robinson-Foulds distance between rooted trees.
//!
//! # Algorithm
//! The RF distance is the number of clusters present in exactly one of the
//! two trees. Rather than comparing cluster sets, tree A is turned into a
//! [`DayTable`] and tree B is streamed against it once:
//!
//! 1. Encode A with the collapsed post-order encoder and build its table.
//!    A's leaves now carry codes `0..n` in traversal order.
//! 2. Walk B's collapsed encoding with a stack of
//!    `(left, right, leaves, weight)` entries in A's leaf codes. A leaf pushes
//!    `(code, code, 1, 1)`; an internal node pops entries until their weights
//!    add up to its own, and pushes the merged entry.
//! 3. A merged cluster of B (other than the whole tree) is a *hit* when its
//!    codes are contiguous (`leaves == right - left + 1`) and A's table holds
//!    that interval. Anything else is a *miss*: a cluster whose codes are not
//!    contiguous cannot be a cluster of A.
//! 4. `RF = misses + |A| - hits`.
//!
//! # Example
//! ```text
//! Tree A:  ((A,B),(C,(D,E)))     clusters {A,B} {C,D,E} {D,E}
//! Tree B:  ((A,B),(D,(C,E)))     clusters {A,B} {C,D,E} {C,E}
//!
//! hits = 2, misses = 1, |A| = 3  ->  RF = 1 + 3 - 2 = 2
//! ```
//!
//! Many pairs over one tree set are best served by [`RfCache`], which
//! prepares every tree once, and [`pairwise_rf`], which fills the upper
//! triangle of the distance matrix in parallel.

use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use tracing::debug;

use crate::day_table::DayTable;
use crate::encoding::CollapsedPostOrder;
use crate::error::{Error, Result};
use crate::view::TreeView;

/// Compute the rooted Robinson-Foulds distance between two trees.
///
/// # Errors
/// [`Error::TaxonSetMismatch`] if the trees are not over the same taxon set,
/// or any encoding error of either tree.
pub fn robinson_foulds<A, B>(a: &A, b: &B) -> Result<usize>
where
    A: TreeView + ?Sized,
    B: TreeView + ?Sized,
{
    if a.num_taxa() != b.num_taxa() {
        return Err(Error::TaxonSetMismatch(format!(
            "{} taxa vs {} taxa",
            a.num_taxa(),
            b.num_taxa()
        )));
    }
    let a = PreparedTree::new(a)?;
    let b = CollapsedPostOrder::encode(b)?;
    rf_from_table(&a.table, &b)
}

/// Stream tree B's encoding against tree A's table.
///
/// # Errors
/// [`Error::TaxonSetMismatch`] if the table and the encoding disagree on the
/// taxon count.
pub fn rf_from_table(table: &DayTable, order: &CollapsedPostOrder) -> Result<usize> {
    struct Entry {
        left: usize,
        right: usize,
        leaves: usize,
        weight: usize,
    }

    let n = table.num_taxa();
    if order.num_taxa() != n {
        return Err(Error::TaxonSetMismatch(format!("table over {n} taxa, tree over {}", order.num_taxa())));
    }
    let mut stack: Vec<Entry> = Vec::with_capacity(order.len());
    let (mut hits, mut misses) = (0, 0);

    for visit in order.visits() {
        if visit.is_leaf() {
            let code = table
                .leaf_code(visit.vertex)
                .ok_or(Error::TaxonOutOfRange { taxon: visit.vertex, num_taxa: n })?;
            stack.push(Entry { left: code, right: code, leaves: 1, weight: 1 });
            continue;
        }

        let mut merged = Entry { left: usize::MAX, right: 0, leaves: 0, weight: visit.weight + 1 };
        let mut remaining = visit.weight;
        while remaining > 0 {
            let Some(e) = stack.pop() else { break };
            merged.left = merged.left.min(e.left);
            merged.right = merged.right.max(e.right);
            merged.leaves += e.leaves;
            remaining = remaining.saturating_sub(e.weight);
        }

        if merged.leaves < n {
            let contiguous = merged.leaves == merged.right - merged.left + 1;
            if contiguous && table.contains(merged.left, merged.right) {
                hits += 1;
            } else {
                misses += 1;
            }
        }
        stack.push(merged);
    }

    Ok(misses + table.len() - hits)
}

/// Encoding and table of one tree, built once and reused for every pair.
#[derive(Debug, Clone)]
pub struct PreparedTree {
    pub order: CollapsedPostOrder,
    pub table: DayTable,
}

impl PreparedTree {
    pub fn new<V: TreeView + ?Sized>(view: &V) -> Result<Self> {
        let order = CollapsedPostOrder::encode(view)?;
        let table = DayTable::from_order(&order);
        Ok(PreparedTree { order, table })
    }

    /// Distance to another prepared tree.
    ///
    /// # Errors
    /// [`Error::TaxonSetMismatch`] if the two trees have different taxon counts.
    pub fn distance(&self, other: &PreparedTree) -> Result<usize> {
        rf_from_table(&self.table, &other.order)
    }
}

/// Prepared encodings and tables for a borrowed set of trees.
///
/// The cache borrows the trees, so they cannot be changed while it is alive
/// and its tables can never go stale.
#[derive(Debug)]
pub struct RfCache<'a, V> {
    trees: &'a [V],
    prepared: Vec<PreparedTree>,
}

impl<'a, V: TreeView + Sync> RfCache<'a, V> {
    /// Prepare every tree of `trees` in parallel.
    ///
    /// # Errors
    /// [`Error::TaxonSetMismatch`] if the trees disagree on the taxon count,
    /// or the first encoding error met.
    pub fn new(trees: &'a [V]) -> Result<Self> {
        if let Some(first) = trees.first() {
            let n = first.num_taxa();
            if let Some(i) = trees.iter().position(|t| t.num_taxa() != n) {
                return Err(Error::TaxonSetMismatch(format!(
                    "tree {i} has {} taxa, tree 0 has {n}",
                    trees[i].num_taxa()
                )));
            }
        }
        let prepared = trees.par_iter().map(PreparedTree::new).collect::<Result<Vec<_>>>()?;
        debug!(trees = prepared.len(), "prepared cluster tables");
        Ok(RfCache { trees, prepared })
    }

    pub fn len(&self) -> usize {
        self.prepared.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prepared.is_empty()
    }

    pub fn trees(&self) -> &'a [V] {
        self.trees
    }

    pub fn prepared(&self, i: usize) -> Option<&PreparedTree> {
        self.prepared.get(i)
    }

    /// RF distance between trees `i` and `j`, `None` if either is out of range.
    pub fn distance(&self, i: usize, j: usize) -> Option<usize> {
        // taxon counts were checked in `new`
        self.prepared.get(i)?.distance(self.prepared.get(j)?).ok()
    }
}

/// All pairwise distances `(i, j, rf)` with `i < j`, computed in parallel.
///
/// `cancel` is checked before every pair; once it is set the computation
/// stops with [`Error::Cancelled`].
pub fn pairwise_rf<V: TreeView + Sync>(
    cache: &RfCache<'_, V>,
    cancel: Option<&AtomicBool>,
) -> Result<Vec<(usize, usize, usize)>> {
    let n = cache.len();
    (0..n)
        .into_par_iter()
        .flat_map_iter(|i| (i + 1..n).map(move |j| (i, j)))
        .map(|(i, j)| {
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                return Err(Error::Cancelled);
            }
            let d = cache.prepared[i].distance(&cache.prepared[j])?;
            Ok((i, j, d))
        })
        .collect()
}

/// Full symmetric distance matrix of the cached trees.
pub fn rf_matrix<V: TreeView + Sync>(cache: &RfCache<'_, V>, cancel: Option<&AtomicBool>) -> Result<Vec<Vec<usize>>> {
    let n = cache.len();
    let mut matrix = vec![vec![0usize; n]; n];
    for (i, j, d) in pairwise_rf(cache, cancel)? {
        matrix[i][j] = d;
        matrix[j][i] = d;
    }
    Ok(matrix)
}
