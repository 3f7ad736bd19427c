//! Mutable rooted tree that consensus results are assembled into.
//!
//! # Overview
//! [`OutputTree`] stores its nodes in an arena and links children as a
//! doubly linked sibling list, so detaching and re-attaching a subtree is
//! O(1) apart from the descendant check. Nodes are never freed: edits that
//! remove a node only flag it as removed, which keeps every [`NodeId`]
//! handed out earlier valid as an index.
//!
//! Every structural edit returns an [`Edit`] describing which nodes moved
//! or disappeared. Callers that keep their own node bookkeeping (see
//! [`NodeMap`]) update it from those relocations and nothing else.
//!
//! The consensus builder never calls [`OutputTree::insert_node`]. It sprouts
//! every majority node under the root first, so a node's parent always
//! exists before the node is moved, and no placeholder on an edge is needed.
//! Nodes left unary or empty by the moves are removed afterwards with
//! [`OutputTree::collapse_branch`] and [`OutputTree::snip_clade`].

use std::collections::HashMap;
use std::fmt::Write as _;

use phylotree::tree::Tree as PhyloTree;
use thiserror::Error;

use crate::error::{Error, Result};
use crate::registry::RecordId;
use crate::taxa::TaxonSet;
use crate::view::{NodeId, TreeView};

/// A structural edit that could not be applied. The tree is unchanged.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditError {
    #[error("node {0} does not exist")]
    UnknownNode(NodeId),
    #[error("node {0} was removed by an earlier edit")]
    Removed(NodeId),
    #[error("the root cannot be moved or removed")]
    Root,
    #[error("cannot move node {node} below its own descendant {target}")]
    OntoDescendant { node: NodeId, target: NodeId },
}

/// `from` stopped existing; whatever referred to it now refers to `to`,
/// or to nothing when `to` is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relocation {
    pub from: NodeId,
    pub to: Option<NodeId>,
}

/// Outcome of a successful structural edit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Edit {
    /// Node created by the edit, if any.
    pub created: Option<NodeId>,
    pub relocations: Vec<Relocation>,
}

#[derive(Debug, Clone, Default)]
struct OutputNode {
    parent: Option<NodeId>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
    prev_sibling: Option<NodeId>,
    next_sibling: Option<NodeId>,
    taxon: Option<usize>,
    support: Option<f64>,
    removed: bool,
}

/// Arena-backed mutable rooted tree over `num_taxa` taxa.
#[derive(Debug, Clone)]
pub struct OutputTree {
    nodes: Vec<OutputNode>,
    root: NodeId,
    num_taxa: usize,
}

impl OutputTree {
    /// A tree holding only its root.
    pub fn new(num_taxa: usize) -> Self {
        let mut nodes = Vec::with_capacity(2 * num_taxa.max(1));
        nodes.push(OutputNode::default());
        OutputTree { nodes, root: 0, num_taxa }
    }

    /// Copy the structure and taxa of any [`TreeView`].
    pub fn from_view<V: TreeView + ?Sized>(view: &V) -> Result<Self> {
        let src_root = view.root().ok_or(Error::MissingRoot)?;
        let mut out = OutputTree::new(view.num_taxa());
        let mut stack = vec![(src_root, out.root)];

        while let Some((src, dst)) = stack.pop() {
            if view.is_terminal(src) {
                let taxon = view.taxon_of(src).ok_or(Error::UnlabeledLeaf(src))?;
                out.nodes[dst].taxon = Some(taxon);
                continue;
            }
            for child in view.children(src) {
                let node = out.push_child(dst);
                stack.push((child, node));
            }
        }
        Ok(out)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Nodes still present in the tree.
    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|n| !n.removed).count()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.get(node).is_some_and(|n| !n.removed)
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node)?.parent
    }

    pub fn taxon(&self, node: NodeId) -> Option<usize> {
        self.nodes.get(node)?.taxon
    }

    pub fn support(&self, node: NodeId) -> Option<f64> {
        self.nodes.get(node)?.support
    }

    pub fn set_support(&mut self, node: NodeId, support: f64) -> std::result::Result<(), EditError> {
        self.check_live(node)?;
        self.nodes[node].support = Some(support);
        Ok(())
    }

    /// Number of children of `node`.
    pub fn degree(&self, node: NodeId) -> usize {
        TreeView::children(self, node).count()
    }

    /// Live nodes in pre-order, root first.
    pub fn pre_order(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(node) = stack.pop() {
            out.push(node);
            let mut child = self.nodes[node].last_child;
            while let Some(c) = child {
                stack.push(c);
                child = self.nodes[c].prev_sibling;
            }
        }
        out
    }

    fn check_live(&self, node: NodeId) -> std::result::Result<(), EditError> {
        match self.nodes.get(node) {
            None => Err(EditError::UnknownNode(node)),
            Some(n) if n.removed => Err(EditError::Removed(node)),
            Some(_) => Ok(()),
        }
    }

    fn push_child(&mut self, parent: NodeId) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(OutputNode::default());
        self.link_last(parent, id);
        id
    }

    fn link_last(&mut self, parent: NodeId, child: NodeId) {
        let tail = self.nodes[parent].last_child;
        {
            let c = &mut self.nodes[child];
            c.parent = Some(parent);
            c.prev_sibling = tail;
            c.next_sibling = None;
        }
        match tail {
            Some(t) => self.nodes[t].next_sibling = Some(child),
            None => self.nodes[parent].first_child = Some(child),
        }
        self.nodes[parent].last_child = Some(child);
    }

    fn unlink(&mut self, node: NodeId) {
        let OutputNode { parent, prev_sibling, next_sibling, .. } = self.nodes[node];
        let Some(parent) = parent else { return };
        match prev_sibling {
            Some(p) => self.nodes[p].next_sibling = next_sibling,
            None => self.nodes[parent].first_child = next_sibling,
        }
        match next_sibling {
            Some(n) => self.nodes[n].prev_sibling = prev_sibling,
            None => self.nodes[parent].last_child = prev_sibling,
        }
        let n = &mut self.nodes[node];
        n.parent = None;
        n.prev_sibling = None;
        n.next_sibling = None;
    }

    /// Put `node` where `anchor` sits among its siblings; `anchor` is unlinked.
    fn replace_link(&mut self, anchor: NodeId, node: NodeId) {
        let OutputNode { parent, prev_sibling, next_sibling, .. } = self.nodes[anchor];
        {
            let n = &mut self.nodes[node];
            n.parent = parent;
            n.prev_sibling = prev_sibling;
            n.next_sibling = next_sibling;
        }
        if let Some(parent) = parent {
            match prev_sibling {
                Some(p) => self.nodes[p].next_sibling = Some(node),
                None => self.nodes[parent].first_child = Some(node),
            }
            match next_sibling {
                Some(n) => self.nodes[n].prev_sibling = Some(node),
                None => self.nodes[parent].last_child = Some(node),
            }
        }
        let a = &mut self.nodes[anchor];
        a.parent = None;
        a.prev_sibling = None;
        a.next_sibling = None;
    }

    fn is_ancestor(&self, ancestor: NodeId, mut node: NodeId) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            match self.nodes[node].parent {
                Some(p) => node = p,
                None => return false,
            }
        }
    }

    /// Append a new empty child to `parent`.
    pub fn sprout_child(&mut self, parent: NodeId) -> std::result::Result<NodeId, EditError> {
        self.check_live(parent)?;
        Ok(self.push_child(parent))
    }

    pub fn set_taxon(&mut self, node: NodeId, taxon: usize) -> std::result::Result<(), EditError> {
        self.check_live(node)?;
        self.nodes[node].taxon = Some(taxon);
        Ok(())
    }

    /// Detach the subtree at `node` and append it to `new_parent`'s children.
    ///
    /// Moving onto itself or a descendant is refused; moving onto the
    /// current parent is a no-op.
    pub fn move_branch(&mut self, node: NodeId, new_parent: NodeId) -> std::result::Result<Edit, EditError> {
        self.check_live(node)?;
        self.check_live(new_parent)?;
        if node == self.root {
            return Err(EditError::Root);
        }
        if self.nodes[node].parent == Some(new_parent) {
            return Ok(Edit::default());
        }
        if self.is_ancestor(node, new_parent) {
            return Err(EditError::OntoDescendant { node, target: new_parent });
        }
        self.unlink(node);
        self.link_last(new_parent, node);
        Ok(Edit::default())
    }

    /// Insert a new node on the edge above `node`; `node` becomes its only child.
    ///
    /// On the root, the new node becomes the root.
    pub fn insert_node(&mut self, node: NodeId) -> std::result::Result<Edit, EditError> {
        self.check_live(node)?;
        let id = self.nodes.len();
        self.nodes.push(OutputNode::default());
        self.replace_link(node, id);
        self.link_last(id, node);
        if node == self.root {
            self.root = id;
        }
        Ok(Edit { created: Some(id), relocations: Vec::new() })
    }

    /// Remove `node`, lifting its children into its parent at its position.
    pub fn collapse_branch(&mut self, node: NodeId) -> std::result::Result<Edit, EditError> {
        self.check_live(node)?;
        let parent = self.nodes[node].parent.ok_or(EditError::Root)?;

        let mut child = self.nodes[node].first_child;
        let mut anchor = node;
        while let Some(c) = child {
            child = self.nodes[c].next_sibling;
            // splice c in right after anchor
            let after = self.nodes[anchor].next_sibling;
            {
                let n = &mut self.nodes[c];
                n.parent = Some(parent);
                n.prev_sibling = Some(anchor);
                n.next_sibling = after;
            }
            self.nodes[anchor].next_sibling = Some(c);
            match after {
                Some(a) => self.nodes[a].prev_sibling = Some(c),
                None => self.nodes[parent].last_child = Some(c),
            }
            anchor = c;
        }
        self.nodes[node].first_child = None;
        self.nodes[node].last_child = None;
        self.unlink(node);
        self.nodes[node].removed = true;

        Ok(Edit { created: None, relocations: vec![Relocation { from: node, to: Some(parent) }] })
    }

    /// Remove the whole subtree rooted at `node`.
    pub fn snip_clade(&mut self, node: NodeId) -> std::result::Result<Edit, EditError> {
        self.check_live(node)?;
        if node == self.root {
            return Err(EditError::Root);
        }
        self.unlink(node);

        let mut relocations = Vec::new();
        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            self.nodes[n].removed = true;
            relocations.push(Relocation { from: n, to: None });
            stack.extend(TreeView::children(&*self, n));
        }
        Ok(Edit { created: None, relocations })
    }

    /// Per node: (leaves below, smallest taxon below). Removed nodes get (0, MAX).
    fn clade_keys(&self) -> Vec<(usize, usize)> {
        let mut keys = vec![(0, usize::MAX); self.nodes.len()];
        for &node in self.pre_order().iter().rev() {
            let key = match self.nodes[node].taxon {
                Some(t) if self.nodes[node].first_child.is_none() => (1, t),
                _ => TreeView::children(self, node)
                    .map(|c| keys[c])
                    .fold((0, usize::MAX), |(l, m), (cl, cm)| (l + cl, m.min(cm))),
            };
            keys[node] = key;
        }
        keys
    }

    /// Order every node's children by subtree size, then by smallest taxon.
    ///
    /// Two trees with the same clusters standardize to the same layout.
    pub fn standardize(&mut self) {
        let keys = self.clade_keys();
        for node in self.pre_order() {
            let mut children: Vec<NodeId> = TreeView::children(&*self, node).collect();
            if children.len() < 2 {
                continue;
            }
            children.sort_by_key(|&c| keys[c]);
            for &c in &children {
                self.unlink(c);
            }
            for c in children {
                self.link_last(node, c);
            }
        }
    }

    /// Leaf sets of every internal node except the root, as sorted taxon lists.
    pub fn clusters(&self) -> Vec<Vec<usize>> {
        let mut below: Vec<Vec<usize>> = vec![Vec::new(); self.nodes.len()];
        let mut out = Vec::new();
        for &node in self.pre_order().iter().rev() {
            let mut set = match self.nodes[node].taxon {
                Some(t) if self.nodes[node].first_child.is_none() => vec![t],
                _ => TreeView::children(self, node)
                    .flat_map(|c| std::mem::take(&mut below[c]))
                    .collect(),
            };
            set.sort_unstable();
            if node != self.root && self.nodes[node].first_child.is_some() {
                out.push(set.clone());
            }
            below[node] = set;
        }
        out.sort();
        out
    }

    /// Render as Newick with taxon names from `taxa`.
    ///
    /// With `with_support`, internal nodes carrying a support value are
    /// labelled with it to two decimals.
    pub fn to_newick(&self, taxa: &TaxonSet, with_support: bool) -> Result<String> {
        enum Token {
            Enter(NodeId),
            Close(NodeId),
            Comma,
        }

        let mut out = String::new();
        let mut stack = vec![Token::Enter(self.root)];
        while let Some(token) = stack.pop() {
            match token {
                Token::Comma => out.push(','),
                Token::Close(node) => {
                    out.push(')');
                    if let (true, Some(s)) = (with_support, self.nodes[node].support) {
                        let _ = write!(out, "{s:.2}");
                    }
                }
                Token::Enter(node) => {
                    let n = &self.nodes[node];
                    if n.first_child.is_none() {
                        if let Some(taxon) = n.taxon {
                            let name = taxa
                                .name(taxon)
                                .ok_or(Error::TaxonOutOfRange { taxon, num_taxa: taxa.len() })?;
                            out.push_str(name);
                        }
                        continue;
                    }
                    out.push('(');
                    stack.push(Token::Close(node));
                    let mut child = n.last_child;
                    while let Some(c) = child {
                        stack.push(Token::Enter(c));
                        child = self.nodes[c].prev_sibling;
                        if child.is_some() {
                            stack.push(Token::Comma);
                        }
                    }
                }
            }
        }
        out.push(';');
        Ok(out)
    }

    /// Convert to a `phylotree` tree with taxon names and support labels.
    pub fn to_phylotree(&self, taxa: &TaxonSet) -> Result<PhyloTree> {
        let newick = self.to_newick(taxa, true)?;
        PhyloTree::from_newick(&newick).map_err(|e| Error::Parse(e.to_string()))
    }
}

impl TreeView for OutputTree {
    fn root(&self) -> Option<NodeId> {
        Some(self.root)
    }

    fn first_child(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node)?.first_child
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node)?.next_sibling
    }

    fn is_terminal(&self, node: NodeId) -> bool {
        self.first_child(node).is_none()
    }

    fn taxon_of(&self, node: NodeId) -> Option<usize> {
        self.taxon(node)
    }

    fn num_taxa(&self) -> usize {
        self.num_taxa
    }
}

/// Two-way correspondence between registry records and output nodes.
#[derive(Debug, Clone, Default)]
pub struct NodeMap {
    node_of: Vec<Option<NodeId>>,
    record_of: HashMap<NodeId, RecordId>,
}

impl NodeMap {
    pub fn new(num_records: usize) -> Self {
        NodeMap { node_of: vec![None; num_records], record_of: HashMap::new() }
    }

    pub fn bind(&mut self, record: RecordId, node: NodeId) {
        if record >= self.node_of.len() {
            self.node_of.resize(record + 1, None);
        }
        if let Some(old) = self.node_of[record].replace(node) {
            self.record_of.remove(&old);
        }
        if let Some(prev) = self.record_of.insert(node, record) {
            if prev != record {
                self.node_of[prev] = None;
            }
        }
    }

    pub fn node_of(&self, record: RecordId) -> Option<NodeId> {
        self.node_of.get(record).copied().flatten()
    }

    pub fn record_of(&self, node: NodeId) -> Option<RecordId> {
        self.record_of.get(&node).copied()
    }

    /// Follow the relocations reported by an edit.
    ///
    /// A record whose node disappears moves to the relocation target when
    /// that target has no record of its own; otherwise it is unbound.
    pub fn apply(&mut self, relocations: &[Relocation]) {
        for reloc in relocations {
            let Some(record) = self.record_of.remove(&reloc.from) else { continue };
            match reloc.to {
                Some(to) if !self.record_of.contains_key(&to) => {
                    self.record_of.insert(to, record);
                    self.node_of[record] = Some(to);
                }
                _ => self.node_of[record] = None,
            }
        }
    }

    /// Both directions agree and every bound node is still in `tree`.
    pub fn is_consistent(&self, tree: &OutputTree) -> bool {
        self.record_of.iter().all(|(&node, &rec)| self.node_of(rec) == Some(node) && tree.contains(node))
            && self
                .node_of
                .iter()
                .enumerate()
                .all(|(rec, node)| node.is_none_or(|n| self.record_of(n) == Some(rec)))
    }
}
