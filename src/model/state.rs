use std::collections::BTreeSet;
use std::path::PathBuf;

use super::{Punctum, Tree};

/// Everything the engine sees for one timepoint.
#[derive(Debug, Clone, Default)]
pub struct Timepoint {
    pub tree: Tree,
    /// Only used as a cache key for the volume provider.
    pub image_path: Option<PathBuf>,
    pub puncta: Vec<Punctum>,
    pub trace_paths: Vec<PathBuf>,
}

impl Timepoint {
    pub fn new(tree: Tree) -> Self {
        Timepoint {
            tree,
            ..Default::default()
        }
    }

    pub fn with_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.image_path = Some(path.into());
        self
    }

    pub fn with_puncta(mut self, puncta: Vec<Punctum>) -> Self {
        self.puncta = puncta;
        self
    }

    pub fn punctum(&self, id: &str) -> Option<&Punctum> {
        self.puncta.iter().find(|p| p.id == id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct FullState {
    pub timepoints: Vec<Timepoint>,
}

impl FullState {
    pub fn new(timepoints: Vec<Timepoint>) -> Self {
        FullState { timepoints }
    }

    pub fn from_trees(trees: Vec<Tree>) -> Self {
        FullState {
            timepoints: trees.into_iter().map(Timepoint::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.timepoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timepoints.is_empty()
    }

    pub fn trees(&self) -> Vec<&Tree> {
        self.timepoints.iter().map(|t| &t.tree).collect()
    }

    pub fn sorted_branch_union(&self) -> Vec<String> {
        sorted_branch_union(&self.trees())
    }

    pub fn sorted_puncta_union(&self) -> Vec<String> {
        let ids: BTreeSet<&str> = self
            .timepoints
            .iter()
            .flat_map(|t| t.puncta.iter().map(|p| p.id.as_str()))
            .collect();
        ids.into_iter().map(String::from).collect()
    }
}

/// Sorted union of branch IDs across all trees; fixes branch column order.
pub fn sorted_branch_union(trees: &[&Tree]) -> Vec<String> {
    let ids: BTreeSet<String> = trees
        .iter()
        .flat_map(|t| t.branches().map(|(_, b)| b.id.clone()))
        .collect();
    ids.into_iter().collect()
}
