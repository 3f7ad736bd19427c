//! Majority-rule consensus over a selection of trees.
//!
//! # Overview
//! A consensus run has three phases, repeated until the result validates:
//!
//! 1. **Count**: draw fresh taxon codes, fingerprint every internal node of
//!    every tree and count each fingerprint in the [`BipartitionRegistry`].
//!    A double collision discards the trial and redraws.
//! 2. **Extract**: walk every tree in pre-order remembering the nearest
//!    majority ancestor. Each majority bipartition, and each taxon, keeps
//!    the smallest majority bipartition that was ever seen above it; with a
//!    threshold of at least one half those are pairwise compatible, so the
//!    smallest one is the parent in the consensus tree.
//! 3. **Assemble**: sprout one node per majority bipartition under the root,
//!    move every node below its recorded parent, attach the taxa, and check
//!    the result by fingerprinting it again with the same codes.
//!
//! ```text
//!   ((A,B),(C,D))  x3        count {A,B}=3 {C,D}=3        ((A,B)75.00,(C,D)75.00);
//!   ((A,C),(B,D))  x1  ───►        {A,C}=1 {B,D}=1  ───►
//!                                 majority: > 4 * 0.5
//! ```
//!
//! Unary nodes share the fingerprint of their only child. They are skipped
//! when counting, extracting and validating, so every bipartition is counted
//! once per tree and only looked up on the node that defines it.

use tracing::{debug, info, warn};

use crate::encoding::PostOrder;
use crate::error::{Error, Result};
use crate::fingerprint::{next_prime, table_size_for, Fingerprint, FingerprintAssignor, NodeFingerprints, TaxonCodes};
use crate::output_tree::{EditError, NodeMap, OutputTree};
use crate::registry::{BipartitionRegistry, RecordId};
use crate::view::{NodeId, TreeView};

/// Tuning knobs of a consensus run.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsensusConfig {
    /// A bipartition is kept when it occurs in more than `threshold` of the trees.
    pub threshold: f64,
    /// Fingerprint draws tried per construction before giving up.
    pub max_trials: usize,
    /// Constructions tried before giving up on validation.
    pub max_constructions: usize,
    /// Fixed seed for reproducible draws; random when `None`.
    pub seed: Option<u64>,
    /// Lower bound on the fingerprint table size.
    pub min_table_size: usize,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        ConsensusConfig {
            threshold: 0.5,
            max_trials: 64,
            max_constructions: 16,
            seed: None,
            min_table_size: 0,
        }
    }
}

/// Result of [`MajorityConsensus::build`].
#[derive(Debug, Clone)]
pub struct ConsensusReport {
    pub tree: OutputTree,
    /// Fingerprint draws used, including ones lost to collisions.
    pub trials: usize,
    /// Assembled trees, including ones that failed validation.
    pub constructions: usize,
    /// Re-parenting edits that were refused and skipped.
    pub failed_edits: Vec<EditError>,
}

/// Majority-rule consensus builder.
#[derive(Debug, Clone)]
pub struct MajorityConsensus {
    config: ConsensusConfig,
}

/// Majority bipartitions of one trial and where every taxon hangs.
struct Extraction {
    majority: Vec<RecordId>,
    taxon_parent: Vec<Option<RecordId>>,
}

impl MajorityConsensus {
    /// # Errors
    /// [`Error::InvalidThreshold`] unless `0 < threshold <= 1`.
    pub fn new(config: ConsensusConfig) -> Result<Self> {
        if !(config.threshold > 0.0 && config.threshold <= 1.0) {
            return Err(Error::InvalidThreshold(config.threshold));
        }
        Ok(MajorityConsensus { config })
    }

    pub fn config(&self) -> &ConsensusConfig {
        &self.config
    }

    /// Build the majority-rule consensus of `trees`.
    ///
    /// A single tree comes back as a copy of itself.
    ///
    /// # Errors
    /// - [`Error::EmptySelection`] if `trees` is empty
    /// - [`Error::TaxonSetMismatch`] (or another encoding error) if the trees
    ///   are not over one taxon set
    /// - [`Error::TrialBudgetExhausted`] / [`Error::ValidationBudgetExhausted`]
    ///   if the retry budgets run out
    pub fn build<V: TreeView>(&mut self, trees: &[V]) -> Result<ConsensusReport> {
        let first = trees.first().ok_or(Error::EmptySelection)?;
        let num_taxa = first.num_taxa();
        if let Some((i, t)) = trees.iter().enumerate().find(|(_, t)| t.num_taxa() != num_taxa) {
            return Err(Error::TaxonSetMismatch(format!(
                "tree {i} has {} taxa, tree 0 has {num_taxa}",
                t.num_taxa()
            )));
        }

        let orders = trees.iter().map(PostOrder::encode).collect::<Result<Vec<_>>>()?;
        if trees.len() == 1 {
            return Ok(ConsensusReport {
                tree: OutputTree::from_view(first)?,
                trials: 0,
                constructions: 0,
                failed_edits: Vec::new(),
            });
        }

        let table_size = table_size_for(num_taxa).max(next_prime(self.config.min_table_size));
        debug!(num_trees = trees.len(), num_taxa, table_size, "starting majority consensus");

        let mut assignor = FingerprintAssignor::new(table_size, self.config.seed);
        let mut registry = BipartitionRegistry::new(table_size);
        let mut trials = 0;

        for construction in 1..=self.config.max_constructions {
            let (codes, fingerprints) = self.count(trees, &orders, &mut assignor, &mut registry, &mut trials)?;
            let extraction = self.extract(trees, &fingerprints, &mut registry);
            let (mut tree, failed_edits) = assemble(num_taxa, trees.len(), &registry, &extraction)?;

            if validate(&tree, &codes, &registry)? {
                tree.standardize();
                info!(
                    trials,
                    constructions = construction,
                    bipartitions = registry.len(),
                    majority = extraction.majority.len(),
                    failed_edits = failed_edits.len(),
                    "majority consensus built"
                );
                return Ok(ConsensusReport { tree, trials, constructions: construction, failed_edits });
            }
            info!(construction, "consensus tree failed validation, rebuilding");
        }

        Err(Error::ValidationBudgetExhausted(self.config.max_constructions))
    }

    /// Run fingerprint trials until one is free of double collisions.
    fn count<V: TreeView>(
        &self,
        trees: &[V],
        orders: &[PostOrder],
        assignor: &mut FingerprintAssignor,
        registry: &mut BipartitionRegistry,
        trials: &mut usize,
    ) -> Result<(TaxonCodes, Vec<NodeFingerprints>)> {
        let num_taxa = orders[0].num_taxa();

        'trial: for _ in 0..self.config.max_trials {
            *trials += 1;
            let codes = assignor.draw(num_taxa)?;
            registry.clear();

            let mut fingerprints = Vec::with_capacity(trees.len());
            for (tree, order) in trees.iter().zip(orders) {
                let fps = codes.fingerprint(tree, order)?;
                for visit in order.internal() {
                    if is_unary(tree, visit.vertex) {
                        continue;
                    }
                    let fp = fps.get(visit.vertex).ok_or(Error::EncodingMismatch(visit.vertex))?;
                    if let Err(collision) = registry.insert_or_count(fp, visit.weight) {
                        debug!(trial = *trials, %collision, "fingerprint trial discarded");
                        continue 'trial;
                    }
                }
                fingerprints.push(fps);
            }
            return Ok((codes, fingerprints));
        }

        Err(Error::TrialBudgetExhausted(self.config.max_trials))
    }

    /// Collect majority bipartitions and their nearest majority ancestors.
    fn extract<V: TreeView>(
        &self,
        trees: &[V],
        fingerprints: &[NodeFingerprints],
        registry: &mut BipartitionRegistry,
    ) -> Extraction {
        let num_trees = trees.len();
        let mut ex = Extraction { majority: Vec::new(), taxon_parent: vec![None; trees[0].num_taxa()] };

        for (tree, fps) in trees.iter().zip(fingerprints) {
            let Some(root) = tree.root() else { continue };
            let mut stack: Vec<(NodeId, Option<RecordId>)> = vec![(root, None)];

            while let Some((node, last)) = stack.pop() {
                if tree.is_terminal(node) {
                    let (Some(taxon), Some(parent)) = (tree.taxon_of(node), last) else { continue };
                    let old = ex.taxon_parent[taxon];
                    if old.is_none_or(|o| registry.record(parent).leaves < registry.record(o).leaves) {
                        registry.adopt_taxon(parent, taxon, old);
                        ex.taxon_parent[taxon] = Some(parent);
                    }
                    continue;
                }

                let mut below = last;
                if let Some((fp, record)) = self.majority_record(registry, tree, fps, node, num_trees) {
                    if !registry.record(record).seen {
                        registry.mark_seen(fp);
                        ex.majority.push(record);
                    }
                    if let Some(parent) = last {
                        let current = registry.record(record).parent;
                        if current.is_none_or(|c| registry.record(parent).leaves < registry.record(c).leaves) {
                            registry.adopt_record(parent, record);
                        }
                    }
                    below = Some(record);
                }
                for child in tree.children(node) {
                    stack.push((child, below));
                }
            }
        }
        ex
    }

    /// Record of `node` if its bipartition is in the majority.
    ///
    /// The whole taxon set occurs in every tree and is always accepted.
    /// Unary nodes were never counted and have no record of their own.
    fn majority_record<V: TreeView>(
        &self,
        registry: &BipartitionRegistry,
        tree: &V,
        fps: &NodeFingerprints,
        node: NodeId,
        num_trees: usize,
    ) -> Option<(Fingerprint, RecordId)> {
        if is_unary(tree, node) {
            return None;
        }
        let fp = fps.get(node)?;
        let record = registry.find(fp)?;
        let accepted = registry.record(record).leaves == tree.num_taxa()
            || registry.is_majority(fp, num_trees, self.config.threshold);
        accepted.then_some((fp, record))
    }
}

/// A unary node repeats the bipartition of its only child.
fn is_unary<V: TreeView + ?Sized>(tree: &V, node: NodeId) -> bool {
    tree.children(node).nth(1).is_none()
}

/// Turn an extraction into a tree.
fn assemble(
    num_taxa: usize,
    num_trees: usize,
    registry: &BipartitionRegistry,
    ex: &Extraction,
) -> Result<(OutputTree, Vec<EditError>)> {
    let mut tree = OutputTree::new(num_taxa);
    let root = tree.root();
    let mut map = NodeMap::new(registry.len());
    let mut failed = Vec::new();

    for &record in &ex.majority {
        if registry.record(record).parent.is_none() {
            map.bind(record, root);
        } else {
            let node = tree.sprout_child(root)?;
            map.bind(record, node);
        }
    }

    for &record in &ex.majority {
        let Some(parent) = registry.record(record).parent else { continue };
        let (Some(node), Some(target)) = (map.node_of(record), map.node_of(parent)) else {
            warn!(record, parent, "majority bipartition has no node, skipping");
            continue;
        };
        if tree.parent(node) == Some(target) {
            continue;
        }
        match tree.move_branch(node, target) {
            Ok(edit) => map.apply(&edit.relocations),
            Err(e) => {
                warn!(record, parent, error = %e, "re-parenting refused");
                failed.push(e);
            }
        }
        debug_assert!(map.is_consistent(&tree));
    }

    for (taxon, parent) in ex.taxon_parent.iter().enumerate() {
        let at = parent.and_then(|p| map.node_of(p)).unwrap_or(root);
        let leaf = tree.sprout_child(at)?;
        tree.set_taxon(leaf, taxon)?;
    }

    // bottom-up, so emptied parents are seen after their children
    for node in tree.pre_order().into_iter().rev() {
        if node == root || tree.taxon(node).is_some() {
            continue;
        }
        let edit = match tree.degree(node) {
            0 => tree.snip_clade(node)?,
            1 => tree.collapse_branch(node)?,
            _ => continue,
        };
        map.apply(&edit.relocations);
    }
    debug_assert!(map.is_consistent(&tree));

    for &record in &ex.majority {
        match map.node_of(record) {
            Some(node) if node != root => {
                let support = registry.record(record).count as f64 * 100.0 / num_trees as f64;
                tree.set_support(node, support)?;
            }
            _ => {}
        }
    }

    Ok((tree, failed))
}

/// Every internal node of `tree` must be a recorded bipartition with the
/// same leaf count under the codes it was built from. A unary root (one
/// taxon) has nothing to check.
fn validate(tree: &OutputTree, codes: &TaxonCodes, registry: &BipartitionRegistry) -> Result<bool> {
    let order = PostOrder::encode(tree)?;
    let fps = codes.fingerprint(tree, &order)?;
    for visit in order.internal().filter(|v| !is_unary(tree, v.vertex)) {
        let ok = fps.get(visit.vertex).is_some_and(|fp| registry.verify_contains(fp, visit.weight));
        if !ok {
            warn!(node = visit.vertex, leaves = visit.weight, "consensus node is not a recorded bipartition");
            return Ok(false);
        }
    }
    Ok(true)
}

/// Majority-rule consensus of `trees` with default budgets.
pub fn majority_consensus<V: TreeView>(trees: &[V], threshold: f64) -> Result<OutputTree> {
    let config = ConsensusConfig { threshold, ..ConsensusConfig::default() };
    Ok(MajorityConsensus::new(config)?.build(trees)?.tree)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rand::{Rng, SeedableRng};
    use rand_xoshiro::Xoshiro256PlusPlus;

    use super::*;
    use crate::snapshot::{snapshots_from_newick, TreeSnapshot};
    use crate::taxa::TaxonSet;

    fn consensus(newicks: &[&str], threshold: f64, seed: u64) -> (TaxonSet, ConsensusReport) {
        let (taxa, trees) = snapshots_from_newick(newicks).unwrap();
        let config = ConsensusConfig { threshold, seed: Some(seed), ..ConsensusConfig::default() };
        let report = MajorityConsensus::new(config).unwrap().build(&trees).unwrap();
        (taxa, report)
    }

    /// Non-trivial clusters occurring in more than `threshold` of `trees`.
    fn brute_force(trees: &[TreeSnapshot], threshold: f64) -> Vec<Vec<usize>> {
        let mut counts: HashMap<Vec<usize>, usize> = HashMap::new();
        for tree in trees {
            for cluster in OutputTree::from_view(tree).unwrap().clusters() {
                *counts.entry(cluster).or_default() += 1;
            }
        }
        let mut out: Vec<_> = counts
            .into_iter()
            .filter(|(_, c)| *c as f64 > trees.len() as f64 * threshold)
            .map(|(k, _)| k)
            .collect();
        out.sort();
        out
    }

    fn random_newick(names: &[String], rng: &mut Xoshiro256PlusPlus) -> String {
        let mut parts = names.to_vec();
        while parts.len() > 1 {
            let a = parts.swap_remove(rng.random_range(0..parts.len()));
            let b = parts.swap_remove(rng.random_range(0..parts.len()));
            parts.push(format!("({a},{b})"));
        }
        format!("{};", parts[0])
    }

    #[test]
    fn test_three_of_four() {
        let trees = ["((A,B),(C,D));", "((A,B),(C,D));", "((B,A),(D,C));", "((A,C),(B,D));"];
        let (taxa, report) = consensus(&trees, 0.5, 1);
        assert_eq!(report.tree.clusters(), vec![vec![0, 1], vec![2, 3]]);
        assert_eq!(report.tree.to_newick(&taxa, true).unwrap(), "((A,B)75.00,(C,D)75.00);");
        assert!(report.failed_edits.is_empty());
    }

    #[test]
    fn test_nested_clusters() {
        let trees = ["(((A,B),C),(D,E));", "(((A,B),C),D,E);", "((A,B),C,(D,E));"];
        let (taxa, report) = consensus(&trees, 0.5, 9);
        // children are ordered by size, then by smallest taxon
        assert_eq!(report.tree.to_newick(&taxa, false).unwrap(), "((D,E),(C,(A,B)));");
    }

    #[test]
    fn test_strict_threshold() {
        // {A,B} in exactly half of the trees is not kept
        let trees = ["((A,B),(C,D));", "((A,C),(B,D));"];
        let (taxa, report) = consensus(&trees, 0.5, 2);
        assert_eq!(report.tree.to_newick(&taxa, false).unwrap(), "(A,B,C,D);");
    }

    #[test]
    fn test_threshold_one_gives_star() {
        // no bipartition occurs in more than all of the trees
        let trees = ["(((A,B),C),D);", "(((A,B),D),C);"];
        let (taxa, report) = consensus(&trees, 1.0, 4);
        assert_eq!(report.tree.to_newick(&taxa, false).unwrap(), "(A,B,C,D);");
    }

    #[test]
    fn test_matches_brute_force() {
        let names: Vec<String> = (0..12).map(|i| format!("t{i:02}")).collect();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(11);
        let base = random_newick(&names, &mut rng);

        // half copies of one tree so that some clusters are in the majority
        let newicks: Vec<String> = (0..9)
            .map(|i| if i % 2 == 0 { base.clone() } else { random_newick(&names, &mut rng) })
            .collect();
        let (_, trees) = snapshots_from_newick(&newicks).unwrap();

        for threshold in [0.5, 0.7, 1.0] {
            let config = ConsensusConfig { threshold, seed: Some(5), ..ConsensusConfig::default() };
            let report = MajorityConsensus::new(config).unwrap().build(&trees).unwrap();
            assert_eq!(report.tree.clusters(), brute_force(&trees, threshold), "threshold {threshold}");
        }
    }

    #[test]
    fn test_same_result_across_seeds() {
        let trees = ["((A,(B,E)),(C,D));", "((A,B),(C,(D,E)));", "(((A,B),E),(C,D));"];
        let (taxa, first) = consensus(&trees, 0.5, 0);
        let expected = first.tree.to_newick(&taxa, true).unwrap();
        for seed in 1..8 {
            let (_, report) = consensus(&trees, 0.5, seed);
            assert_eq!(report.tree.to_newick(&taxa, true).unwrap(), expected);
        }
    }

    #[test]
    fn test_unary_nodes_counted_once() {
        let trees = ["((((A,B)),C),D);", "(((A,B),C),D);", "((A,(B,C)),D);"];
        let (taxa, report) = consensus(&trees, 0.5, 3);
        assert_eq!(report.tree.to_newick(&taxa, true).unwrap(), "(D,(C,(A,B)66.67)100.00);");
    }

    #[test]
    fn test_single_tree_is_copied() {
        let (taxa, report) = consensus(&["((C,(A,B)),D);"], 0.5, 1);
        assert_eq!(report.trials, 0);
        assert_eq!(report.tree.to_newick(&taxa, false).unwrap(), "((C,(A,B)),D);");
    }

    #[test]
    fn test_preconditions() {
        let empty: Vec<TreeSnapshot> = Vec::new();
        assert!(matches!(majority_consensus(&empty, 0.5), Err(Error::EmptySelection)));

        for bad in [0.0, -0.1, 1.5, f64::NAN] {
            let config = ConsensusConfig { threshold: bad, ..ConsensusConfig::default() };
            assert!(matches!(MajorityConsensus::new(config), Err(Error::InvalidThreshold(_))));
        }

        let small = TaxonSet::from_names(["A", "B", "C"]).unwrap();
        let large = TaxonSet::from_names(["A", "B", "C", "D"]).unwrap();
        let trees = [
            TreeSnapshot::from_newick("((A,B),C);", &small).unwrap(),
            TreeSnapshot::from_newick("((A,B),(C,D));", &large).unwrap(),
        ];
        assert!(matches!(majority_consensus(&trees, 0.5), Err(Error::TaxonSetMismatch(_))));
    }

    /// Five taxa in a five-slot table: `h1` is a permutation of `0..5`, so
    /// clusters of different sizes often share a fingerprint.
    const CROWDED: [&str; 3] = ["((A,B),(C,(D,E)));", "(((A,C),B),(D,E));", "((A,(B,C)),(D,E));"];

    fn encode_all(trees: &[TreeSnapshot]) -> Vec<PostOrder> {
        trees.iter().map(PostOrder::encode).collect::<Result<Vec<_>>>().unwrap()
    }

    #[test]
    fn test_collisions_are_retried() {
        let (_, trees) = snapshots_from_newick(&CROWDED).unwrap();
        let orders = encode_all(&trees);
        let builder = MajorityConsensus::new(ConsensusConfig::default()).unwrap();

        let mut retried = 0;
        for seed in 0..100 {
            let mut assignor = FingerprintAssignor::new(5, Some(seed));
            let mut registry = BipartitionRegistry::new(5);
            let mut trials = 0;
            let (codes, fingerprints) =
                builder.count(&trees, &orders, &mut assignor, &mut registry, &mut trials).unwrap();
            if trials > 1 {
                retried += 1;
            }
            assert_eq!(fingerprints.len(), trees.len());

            // 4 internal nodes per tree, counted in the last trial only
            let total: usize = (0..registry.len()).map(|id| registry.record(id).count).sum();
            assert_eq!(total, 12, "seed {seed}");
            for (tree, order) in trees.iter().zip(&orders) {
                let fps = codes.fingerprint(tree, order).unwrap();
                for visit in order.internal() {
                    assert!(registry.verify_contains(fps.get(visit.vertex).unwrap(), visit.weight));
                }
            }
        }
        assert!(retried > 0);
    }

    #[test]
    fn test_trial_budget_exhausted() {
        let (_, trees) = snapshots_from_newick(&CROWDED).unwrap();
        let orders = encode_all(&trees);
        let config = ConsensusConfig { max_trials: 1, ..ConsensusConfig::default() };
        let builder = MajorityConsensus::new(config).unwrap();

        let mut exhausted = 0;
        for seed in 0..100 {
            let mut assignor = FingerprintAssignor::new(5, Some(seed));
            let mut registry = BipartitionRegistry::new(5);
            let mut trials = 0;
            let result = builder.count(&trees, &orders, &mut assignor, &mut registry, &mut trials);
            assert_eq!(trials, 1);
            match result {
                Err(Error::TrialBudgetExhausted(1)) => exhausted += 1,
                other => assert!(other.is_ok()),
            }
        }
        assert!(exhausted > 0);
    }

    #[test]
    fn test_validation_rejects_unrecorded_cluster() {
        let (taxa, trees) = snapshots_from_newick(&["((A,B),(C,D));", "((B,A),(C,D));"]).unwrap();
        let orders = encode_all(&trees);
        let builder = MajorityConsensus::new(ConsensusConfig::default()).unwrap();
        let table_size = next_prime(1000);
        let mut assignor = FingerprintAssignor::new(table_size, Some(21));
        let mut registry = BipartitionRegistry::new(table_size);
        let mut trials = 0;
        let (codes, _) = builder.count(&trees, &orders, &mut assignor, &mut registry, &mut trials).unwrap();

        let good = OutputTree::from_view(&trees[0]).unwrap();
        assert!(validate(&good, &codes, &registry).unwrap());

        // {A,C} and {B,D} were never counted
        let other = TreeSnapshot::from_newick("((A,C),(B,D));", &taxa).unwrap();
        let bad = OutputTree::from_view(&other).unwrap();
        assert!(!validate(&bad, &codes, &registry).unwrap());
    }

    #[test]
    fn test_unary_node_has_no_record() {
        let taxa = TaxonSet::from_names(["A", "B", "C"]).unwrap();
        let tree = TreeSnapshot::from_newick("((A),(B,C));", &taxa).unwrap();
        let order = PostOrder::encode(&tree).unwrap();
        let codes = TaxonCodes::from_parts(vec![0, 1, 2], vec![5, 6, 7], 11);
        let fps = codes.fingerprint(&tree, &order).unwrap();

        let root = tree.root().unwrap();
        let mut children = tree.children(root);
        let (unary, pair) = (children.next().unwrap(), children.next().unwrap());
        assert_eq!(fps.get(unary), Some(Fingerprint { h1: 0, h2: 5 }));

        // a two-leaf cluster that happens to share taxon A's codes
        let mut registry = BipartitionRegistry::new(11);
        for _ in 0..3 {
            registry.insert_or_count(Fingerprint { h1: 0, h2: 5 }, 2).unwrap();
            registry.insert_or_count(fps.get(pair).unwrap(), 2).unwrap();
        }
        let builder = MajorityConsensus::new(ConsensusConfig::default()).unwrap();
        assert_eq!(builder.majority_record(&registry, &tree, &fps, unary, 3), None);
        assert!(builder.majority_record(&registry, &tree, &fps, pair, 3).is_some());
    }

    #[test]
    fn test_single_taxon() {
        let (taxa, report) = consensus(&["(A);", "(A);"], 0.5, 1);
        assert_eq!(report.constructions, 1);
        assert_eq!(report.tree.to_newick(&taxa, false).unwrap(), "(A);");
    }

    #[test]
    fn test_min_table_size() {
        let (_, trees) = snapshots_from_newick(&["((A,B),(C,D));", "((A,B),(C,D));"]).unwrap();
        let config = ConsensusConfig { seed: Some(8), min_table_size: 1000, ..ConsensusConfig::default() };
        let report = MajorityConsensus::new(config).unwrap().build(&trees).unwrap();
        assert!(report.trials >= 1);
        assert_eq!(report.tree.clusters(), vec![vec![0, 1], vec![2, 3]]);
    }
}
