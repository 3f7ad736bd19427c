//! Post-order sequence encodings of trees.
//!
//! # Overview
//! Both the consensus builder and the RF calculator consume a tree as a flat
//! post-order sequence of `(vertex, weight)` pairs built in one traversal.
//! Replaying the sequence is a linear scan, and the vertex visited after any
//! given vertex is found in O(1).
//!
//! Two flavours exist:
//!
//! | Encoding | vertex of a leaf | weight of a leaf | weight of an internal node | unary nodes |
//! |----------|------------------|------------------|----------------------------|-------------|
//! | [`PostOrder`] | node id | 0 | leaves in its subtree | recorded |
//! | [`CollapsedPostOrder`] | taxon index | 0 | recorded vertices below it | skipped |
//!
//! ```text
//!        r              PostOrder:           CollapsedPostOrder:
//!       / \             A,0  B,0  x,2        A,0  B,0  x,2
//!      x   C            C,0  r,3             C,0  r,4
//!     / \
//!    A   B
//! ```
//!
//! Both walks use an explicit stack, so tree depth is not bounded by the
//! call stack.

use crate::bitset::Bitset;
use crate::error::{Error, Result};
use crate::view::{NodeId, TreeView};

/// One `(vertex, weight)` pair of a post-order sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Visit {
    pub vertex: usize,
    pub weight: usize,
}

impl Visit {
    /// Leaves are the only visits with weight 0.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.weight == 0
    }
}

/// Totals reported for a node once all of its children are finished.
struct Finished {
    node: NodeId,
    taxon: Option<usize>,
    leaves: usize,
    children: usize,
    /// Recorded vertices strictly below the node in the collapsed encoding.
    below: usize,
}

struct Frame {
    node: NodeId,
    next: Option<NodeId>,
    leaves: usize,
    children: usize,
    below: usize,
}

impl Frame {
    fn enter<V: TreeView + ?Sized>(view: &V, node: NodeId) -> Self {
        Frame { node, next: view.first_child(node), leaves: 0, children: 0, below: 0 }
    }
}

/// Walk `view` in post-order, calling `on_finish` for every node.
///
/// Also checks that the leaves cover each taxon `0..num_taxa` exactly once.
fn walk_post_order<V, F>(view: &V, mut on_finish: F) -> Result<()>
where
    V: TreeView + ?Sized,
    F: FnMut(&Finished),
{
    let root = view.root().ok_or(Error::MissingRoot)?;
    let num_taxa = view.num_taxa();
    let mut seen = Bitset::with_bits(num_taxa);
    let mut stack = vec![Frame::enter(view, root)];

    while let Some(top) = stack.last_mut() {
        if let Some(child) = top.next {
            top.next = view.next_sibling(child);
            stack.push(Frame::enter(view, child));
            continue;
        }

        let Some(frame) = stack.pop() else { break };
        let finished = if view.is_terminal(frame.node) {
            let taxon = view.taxon_of(frame.node).ok_or(Error::UnlabeledLeaf(frame.node))?;
            if taxon >= num_taxa {
                return Err(Error::TaxonOutOfRange { taxon, num_taxa });
            }
            if !seen.insert(taxon) {
                return Err(Error::TaxonSetMismatch(format!("taxon {taxon} appears more than once")));
            }
            Finished { node: frame.node, taxon: Some(taxon), leaves: 1, children: 0, below: 0 }
        } else {
            Finished {
                node: frame.node,
                taxon: None,
                leaves: frame.leaves,
                children: frame.children,
                below: frame.below,
            }
        };

        if let Some(parent) = stack.last_mut() {
            parent.leaves += finished.leaves;
            parent.children += 1;
            parent.below += finished.below + usize::from(finished.children != 1);
        }
        on_finish(&finished);
    }

    if seen.count_ones() != num_taxa {
        return Err(Error::TaxonSetMismatch(format!(
            "tree covers {} of {num_taxa} taxa",
            seen.count_ones()
        )));
    }
    Ok(())
}

/// Post-order sequence of `(node id, subtree leaf count)` pairs.
///
/// Leaves carry 0, internal nodes (including unary ones) carry the number
/// of leaves below them. Used by the consensus builder, where a unary node
/// simply shares its child's fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostOrder {
    visits: Vec<Visit>,
    num_taxa: usize,
}

impl PostOrder {
    /// Encode `view` in one traversal.
    ///
    /// # Errors
    /// Fails on a missing root, an unlabelled leaf, or leaves that do not
    /// cover the taxon set exactly once.
    pub fn encode<V: TreeView + ?Sized>(view: &V) -> Result<Self> {
        let mut visits = Vec::with_capacity(2 * view.num_taxa());
        walk_post_order(view, |f| {
            let weight = if f.taxon.is_some() { 0 } else { f.leaves };
            visits.push(Visit { vertex: f.node, weight });
        })?;
        Ok(PostOrder { visits, num_taxa: view.num_taxa() })
    }

    pub fn visits(&self) -> &[Visit] {
        &self.visits
    }

    pub fn len(&self) -> usize {
        self.visits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visits.is_empty()
    }

    pub fn num_taxa(&self) -> usize {
        self.num_taxa
    }

    /// Restartable cursor over the visits.
    pub fn cursor(&self) -> Cursor<'_> {
        Cursor { visits: &self.visits, pos: 0 }
    }

    /// Internal visits only, with their leaf counts.
    pub fn internal(&self) -> impl Iterator<Item = &Visit> + '_ {
        self.visits.iter().filter(|v| !v.is_leaf())
    }
}

/// Post-order sequence for Day's cluster tables.
///
/// Leaves are recorded as their taxon index with weight 0. Internal nodes
/// with two or more children are recorded with the number of recorded
/// vertices below them; unary nodes do not define a cluster of their own
/// and are left out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollapsedPostOrder {
    visits: Vec<Visit>,
    num_taxa: usize,
}

impl CollapsedPostOrder {
    pub fn encode<V: TreeView + ?Sized>(view: &V) -> Result<Self> {
        let mut visits = Vec::with_capacity(2 * view.num_taxa());
        walk_post_order(view, |f| match f.taxon {
            Some(taxon) => visits.push(Visit { vertex: taxon, weight: 0 }),
            None if f.children > 1 => visits.push(Visit { vertex: f.node, weight: f.below }),
            None => {}
        })?;
        Ok(CollapsedPostOrder { visits, num_taxa: view.num_taxa() })
    }

    pub fn visits(&self) -> &[Visit] {
        &self.visits
    }

    pub fn len(&self) -> usize {
        self.visits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visits.is_empty()
    }

    pub fn num_taxa(&self) -> usize {
        self.num_taxa
    }

    pub fn cursor(&self) -> Cursor<'_> {
        Cursor { visits: &self.visits, pos: 0 }
    }

    /// Taxon of the leftmost leaf below the internal visit at `pos`.
    ///
    /// The subtree of that visit occupies the `weight` positions right
    /// before it, and its first position is its leftmost leaf.
    pub fn leftmost_leaf(&self, pos: usize) -> usize {
        self.visits[pos - self.visits[pos].weight].vertex
    }
}

/// Cursor replaying a post-order sequence; [`Cursor::restart`] rewinds it.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    visits: &'a [Visit],
    pos: usize,
}

impl Cursor<'_> {
    pub fn restart(&mut self) {
        self.pos = 0;
    }

    /// Position of the visit the next call to `next` will return.
    pub fn position(&self) -> usize {
        self.pos
    }
}

impl Iterator for Cursor<'_> {
    type Item = Visit;

    fn next(&mut self) -> Option<Visit> {
        let visit = self.visits.get(self.pos).copied()?;
        self.pos += 1;
        Some(visit)
    }
}
