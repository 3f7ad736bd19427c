//! Crate root: module orchestration and public re-exports.
//!
//! Modules:
//! - `view`: read-only `TreeView` trait every algorithm walks trees through.
//! - `taxa` / `snapshot`: taxon sets and immutable snapshots of `phylotree` trees.
//! - `encoding`: post-order encodings (leaf counts, collapsed Day weights).
//! - `fingerprint` / `registry`: randomized bipartition fingerprints and their chained table.
//! - `output_tree`: mutable arena tree the consensus is assembled into.
//! - `consensus`: majority-rule consensus builder.
//! - `day_table` / `distances`: Day's cluster table and Robinson-Foulds distances.
//! - `bitset`: compact bitset for draws and taxon coverage checks.
//! - `io`: reading NEXUS/Newick tree files, writing matrices and trees.
//! - `api`: Python bindings via `pyo3` (gated behind "python" feature).

pub mod bitset;
pub mod consensus;
pub mod day_table;
pub mod distances;
pub mod encoding;
pub mod error;
pub mod fingerprint;
pub mod io;
pub mod output_tree;
pub mod registry;
pub mod snapshot;
pub mod taxa;
pub mod view;

#[cfg(feature = "python")]
pub mod api;

// Re-export frequently used types & functions
pub use bitset::Bitset;
pub use consensus::{majority_consensus, ConsensusConfig, ConsensusReport, MajorityConsensus};
pub use distances::{pairwise_rf, robinson_foulds, RfCache};
pub use error::{Error, Result};
pub use io::{read_trees, write_matrix_tsv};
pub use output_tree::OutputTree;
pub use snapshot::TreeSnapshot;
pub use taxa::TaxonSet;
pub use view::{NodeId, TreeView};
