//! Read-only traversal interface over a rooted, leaf-labelled tree.
//!
//! The algorithms in this crate never own the input trees. They only need
//! to walk them in first-child / next-sibling order and to ask which taxon
//! sits at a leaf, so every tree representation they consume implements
//! [`TreeView`]. Two implementations ship with the crate:
//! [`crate::snapshot::TreeSnapshot`] for trees parsed with `phylotree`, and
//! [`crate::output_tree::OutputTree`] for the consensus trees this crate
//! builds.

/// Identifier of a node inside one tree.
pub type NodeId = usize;

/// Structural queries the consensus and distance code relies on.
///
/// Taxa are identified by index `0..num_taxa()`; two trees are over the same
/// taxon set when they report the same `num_taxa()` and every index appears
/// at exactly one leaf of each.
pub trait TreeView {
    /// Root of the tree, `None` for an empty tree.
    fn root(&self) -> Option<NodeId>;

    /// First child of `node`, `None` for a terminal node.
    fn first_child(&self, node: NodeId) -> Option<NodeId>;

    /// Next sibling of `node` under their common parent.
    fn next_sibling(&self, node: NodeId) -> Option<NodeId>;

    /// Whether `node` is a leaf.
    fn is_terminal(&self, node: NodeId) -> bool;

    /// Taxon index carried by a terminal node.
    fn taxon_of(&self, node: NodeId) -> Option<usize>;

    /// Size of the taxon set this tree is defined over.
    fn num_taxa(&self) -> usize;

    /// Iterates over the children of `node` in sibling order.
    fn children(&self, node: NodeId) -> Children<'_, Self> {
        Children { view: self, next: self.first_child(node) }
    }
}

/// Iterator over the children of one node, see [`TreeView::children`].
pub struct Children<'a, V: ?Sized> {
    view: &'a V,
    next: Option<NodeId>,
}

impl<V: TreeView + ?Sized> Iterator for Children<'_, V> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.view.next_sibling(current);
        Some(current)
    }
}

impl<V: TreeView + ?Sized> TreeView for &V {
    fn root(&self) -> Option<NodeId> {
        (**self).root()
    }

    fn first_child(&self, node: NodeId) -> Option<NodeId> {
        (**self).first_child(node)
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        (**self).next_sibling(node)
    }

    fn is_terminal(&self, node: NodeId) -> bool {
        (**self).is_terminal(node)
    }

    fn taxon_of(&self, node: NodeId) -> Option<usize> {
        (**self).taxon_of(node)
    }

    fn num_taxa(&self) -> usize {
        (**self).num_taxa()
    }
}
