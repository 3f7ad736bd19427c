//! The shared taxon set of a collection of trees.
//!
//! # CRITICAL: Why we index taxa by NAME
//! Node IDs are assigned during tree parsing and differ across files.
//! Taxon names are consistent. We sort the names alphabetically so that
//! identical taxa always map to the same index in every tree of the set,
//! whatever order the leaves were written in.

use std::collections::HashMap;

use phylotree::tree::Tree as PhyloTree;

use crate::error::{Error, Result};

/// Sorted taxon names and their indices `0..len()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonSet {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl TaxonSet {
    /// Build a taxon set from names, sorting them alphabetically.
    ///
    /// # Errors
    /// Returns [`Error::DuplicateTaxon`] if a name is given twice.
    pub fn from_names<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = names.into_iter().map(Into::into).collect();
        names.sort();

        if let Some(dup) = names.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(Error::DuplicateTaxon(dup[0].clone()));
        }

        let index = names
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.clone(), idx))
            .collect();

        Ok(TaxonSet { names, index })
    }

    /// Build the taxon set from the leaf names of one tree.
    ///
    /// # Errors
    /// - [`Error::UnlabeledLeaf`] if a leaf has no name
    /// - [`Error::DuplicateTaxon`] if two leaves share a name
    pub fn from_tree(tree: &PhyloTree) -> Result<Self> {
        let names = tree
            .get_leaves()
            .into_iter()
            .map(|leaf_id| {
                tree.get(&leaf_id)?
                    .name
                    .clone()
                    .ok_or(Error::UnlabeledLeaf(leaf_id))
            })
            .collect::<Result<Vec<_>>>()?;

        Self::from_names(names)
    }

    /// Number of taxa.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Index of a taxon name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Name of the taxon at `idx`.
    pub fn name(&self, idx: usize) -> Option<&str> {
        self.names.get(idx).map(String::as_str)
    }

    /// All names, sorted.
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_sorted() {
        let taxa = TaxonSet::from_names(["Human", "Chimp", "Gorilla"]).unwrap();

        assert_eq!(taxa.names(), ["Chimp", "Gorilla", "Human"]);
        assert_eq!(taxa.index_of("Chimp"), Some(0));
        assert_eq!(taxa.index_of("Human"), Some(2));
        assert_eq!(taxa.name(1), Some("Gorilla"));
        assert_eq!(taxa.index_of("Bonobo"), None);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let err = TaxonSet::from_names(["A", "B", "A"]).unwrap_err();
        assert!(matches!(err, Error::DuplicateTaxon(name) if name == "A"));
    }

    /// Same taxa written in a different order produce the same indices.
    #[test]
    fn test_same_indices_across_trees() {
        let t1 = PhyloTree::from_newick("((Human,Chimp),Gorilla);").unwrap();
        let t2 = PhyloTree::from_newick("(Gorilla,(Chimp,Human));").unwrap();

        let taxa1 = TaxonSet::from_tree(&t1).unwrap();
        let taxa2 = TaxonSet::from_tree(&t2).unwrap();

        assert_eq!(taxa1, taxa2);
        assert_eq!(taxa1.len(), 3);
    }
}
