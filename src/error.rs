//! Crate-wide error type.
//!
//! Precondition violations and exhausted retry budgets are fatal to the call
//! that hit them and surface here. Trial-local fingerprint collisions and
//! failed structural edits have their own types (see
//! [`crate::registry::DoubleCollision`] and [`crate::output_tree::EditError`])
//! because they are recovered from inside a consensus computation.

use phylotree::tree::TreeError;
use thiserror::Error;

use crate::view::NodeId;

/// Errors returned by consensus and distance computations.
#[derive(Error, Debug)]
pub enum Error {
    /// No trees were passed to a computation that needs at least one.
    #[error("no trees were selected")]
    EmptySelection,

    /// The tree view did not report a root node.
    #[error("tree has no root node")]
    MissingRoot,

    /// A terminal node carries no taxon (or no name in the source tree).
    #[error("leaf node {0} carries no taxon")]
    UnlabeledLeaf(NodeId),

    /// A leaf refers to a taxon index outside `0..num_taxa`.
    #[error("taxon index {taxon} is out of range for {num_taxa} taxa")]
    TaxonOutOfRange { taxon: usize, num_taxa: usize },

    /// Two trees (or a tree and its taxon set) disagree on the taxa.
    #[error("trees are not over the same taxon set: {0}")]
    TaxonSetMismatch(String),

    /// The same taxon name was given twice when building a taxon set.
    #[error("taxon '{0}' appears more than once")]
    DuplicateTaxon(String),

    /// A post-order encoding was replayed against a different tree.
    #[error("post-order encoding does not match the tree at node {0}")]
    EncodingMismatch(NodeId),

    /// Majority thresholds must lie in `(0, 1]`.
    #[error("majority threshold {0} must lie in (0, 1]")]
    InvalidThreshold(f64),

    /// Every fingerprint trial ended in a double collision.
    #[error("no collision-free fingerprint trial within {0} attempts")]
    TrialBudgetExhausted(usize),

    /// Every assembled consensus tree failed the final round-trip check.
    #[error("consensus tree failed validation {0} times in a row")]
    ValidationBudgetExhausted(usize),

    /// A structural edit on a consensus tree failed where it cannot be skipped.
    #[error(transparent)]
    Edit(#[from] crate::output_tree::EditError),

    /// The caller raised the cancellation flag.
    #[error("computation was cancelled")]
    Cancelled,

    /// A tree file or Newick string could not be parsed.
    #[error("could not parse tree: {0}")]
    Parse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Tree(#[from] TreeError),
}

pub type Result<T> = std::result::Result<T, Error>;
