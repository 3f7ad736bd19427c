//! Python binding layer for consensus trees and RF distances.
//!
//! Trees cross the boundary as Newick strings or file paths; every crate
//! error is raised as `ValueError`.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::consensus::{ConsensusConfig, MajorityConsensus};
use crate::distances::{rf_matrix, robinson_foulds, RfCache};
use crate::error::Error;
use crate::io::{read_trees, ReadOptions};
use crate::snapshot::{snapshots_from_newick, snapshots_from_trees};

fn to_py_err(e: Error) -> PyErr {
    PyValueError::new_err(e.to_string())
}

/// Majority-rule consensus of a list of Newick trees.
///
/// Args:
///     newicks: Newick strings over the same taxa
///     threshold: Keep bipartitions found in more than this fraction of trees (default: 0.5)
///     seed: Seed for the fingerprint draws (default: random)
///
/// Returns:
///     The consensus tree as Newick, internal nodes labelled with their support in percent
///
/// Raises:
///     ValueError: If the list is empty, the taxa differ, or the threshold is outside (0, 1]
#[pyfunction]
#[pyo3(signature = (newicks, threshold=0.5, seed=None))]
fn majority_consensus(newicks: Vec<String>, threshold: f64, seed: Option<u64>) -> PyResult<String> {
    let (taxa, snaps) = snapshots_from_newick(&newicks).map_err(to_py_err)?;
    let config = ConsensusConfig { threshold, seed, ..ConsensusConfig::default() };
    let report = MajorityConsensus::new(config)
        .and_then(|mut c| c.build(&snaps))
        .map_err(to_py_err)?;
    report.tree.to_newick(&taxa, true).map_err(to_py_err)
}

/// Rooted Robinson-Foulds distance between two Newick trees.
///
/// Raises:
///     ValueError: If either tree fails to parse or the taxa differ
#[pyfunction]
fn rf_distance(a: String, b: String) -> PyResult<usize> {
    let (_, snaps) = snapshots_from_newick(&[a, b]).map_err(to_py_err)?;
    robinson_foulds(&snaps[0], &snaps[1]).map_err(to_py_err)
}

/// Pairwise rooted RF distances between Newick trees.
///
/// Returns:
///     A 2D list of RF distances
#[pyfunction]
fn pairwise_rf(newicks: Vec<String>) -> PyResult<Vec<Vec<usize>>> {
    let (_, snaps) = snapshots_from_newick(&newicks).map_err(to_py_err)?;
    let cache = RfCache::new(&snaps).map_err(to_py_err)?;
    rf_matrix(&cache, None).map_err(to_py_err)
}

/// Compute pairwise RF distances from multiple tree files.
///
/// Args:
///     paths: List of file paths to NEXUS or Newick tree files
///     burnin_trees: Number of trees to skip at the beginning of each file (default: 0)
///     burnin_states: Minimum STATE value to keep trees (default: 0)
///     use_real_taxa: Use TRANSLATE block for taxon names when available (default: True)
///
/// Returns:
///     A tuple of (tree_names, distance_matrix)
///
/// Raises:
///     ValueError: If no trees are found or trees have different leaf sets
#[pyfunction]
#[pyo3(signature = (paths, burnin_trees=0, burnin_states=0, use_real_taxa=true))]
fn pairwise_rf_files(
    paths: Vec<String>,
    burnin_trees: usize,
    burnin_states: usize,
    use_real_taxa: bool,
) -> PyResult<(Vec<String>, Vec<Vec<usize>>)> {
    let options = ReadOptions { burnin_trees, burnin_states, use_real_taxa };
    let mut names = Vec::new();
    let mut trees = Vec::new();

    for (file_idx, path) in paths.iter().enumerate() {
        let named_trees = read_trees(path, options).map_err(to_py_err)?;
        if named_trees.is_empty() {
            return Err(PyValueError::new_err(format!(
                "No trees found in file '{path}' after burnin removal"
            )));
        }
        for (name, tree) in named_trees {
            names.push(format!("file{file_idx}_{name}"));
            trees.push(tree);
        }
    }

    let (_, snaps) = snapshots_from_trees(&trees).map_err(to_py_err)?;
    let cache = RfCache::new(&snaps).map_err(to_py_err)?;
    let matrix = rf_matrix(&cache, None).map_err(to_py_err)?;
    Ok((names, matrix))
}

/// Python module definition
#[pymodule]
fn tree_set_consensus(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(majority_consensus, m)?)?;
    m.add_function(wrap_pyfunction!(rf_distance, m)?)?;
    m.add_function(wrap_pyfunction!(pairwise_rf, m)?)?;
    m.add_function(wrap_pyfunction!(pairwise_rf_files, m)?)?;
    Ok(())
}
