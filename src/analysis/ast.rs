use ndarray::Array2;
use rayon::prelude::*;

use super::tdbl::is_excluded;
use crate::config::AnalysisParams;
use crate::model::{sorted_branch_union, FiloType, Tree};

/// Added/subtracted/transitioned classification of every branch over time.
///
/// All arrays are indexed `[t, b]` with `b` an index into `branch_ids`, the
/// sorted union of branch IDs over the series. Row 0 of the change arrays is
/// always false.
#[derive(Debug, Clone, PartialEq)]
pub struct AstResult {
    pub branch_ids: Vec<String>,
    pub filo_types: Array2<FiloType>,
    pub added: Array2<bool>,
    pub subtracted: Array2<bool>,
    pub transitioned: Array2<bool>,
    pub master_changed: Array2<bool>,
    /// ID of the branch holding the parent point; `None` for root children
    /// and for branches missing at `t`.
    pub master_nodes: Array2<Option<String>>,
    /// Axon/basal branches dropped by the exclusion filters.
    pub excluded: Array2<bool>,
}

impl AstResult {
    pub fn timepoints(&self) -> usize {
        self.filo_types.nrows()
    }

    pub fn branch_index(&self, branch_id: &str) -> Option<usize> {
        self.branch_ids
            .binary_search_by(|id| id.as_str().cmp(branch_id))
            .ok()
    }

    pub fn filo_type(&self, t: usize, branch_id: &str) -> Option<FiloType> {
        self.branch_index(branch_id).map(|b| self.filo_types[[t, b]])
    }
}

#[derive(Debug, Clone)]
struct Classified {
    filo_type: FiloType,
    exists: bool,
    excluded: bool,
    master: Option<String>,
}

impl Classified {
    fn missing() -> Self {
        Classified {
            filo_type: FiloType::Absent,
            exists: false,
            excluded: false,
            master: None,
        }
    }
}

fn classify(tree: &Tree, branch_id: &str, params: &AnalysisParams) -> Classified {
    let Some(b) = tree.branch_by_id(branch_id) else {
        return Classified::missing();
    };
    if tree.branch(b).is_empty() {
        return Classified::missing();
    }
    let parent = tree.parent_branch_of(b);
    let master = parent.map(|p| tree.branch(p).id.clone());

    if is_excluded(tree, b, params) {
        return Classified {
            filo_type: FiloType::Absent,
            exists: true,
            excluded: true,
            master,
        };
    }

    let filo_type = if tree.is_filo(b, params.filo_dist).0 {
        let trailing = parent.map_or(0.0, |p| {
            let (total, to_last_branch) = tree.world_lengths(p, 0);
            total - to_last_branch
        });
        if trailing > params.terminal_dist {
            FiloType::Terminal
        } else {
            FiloType::Interstitial
        }
    } else {
        FiloType::BranchOnly
    };
    Classified {
        filo_type,
        exists: true,
        excluded: false,
        master,
    }
}

/// Type of a single branch in a single tree, without any history.
pub fn classify_branch(tree: &Tree, branch_id: &str, params: &AnalysisParams) -> FiloType {
    classify(tree, branch_id, params).filo_type
}

/// Classifies every branch of every tree and derives the change masks
/// between consecutive timepoints.
pub fn classify_series(trees: &[&Tree], params: &AnalysisParams) -> AstResult {
    let branch_ids = sorted_branch_union(trees);
    let (n, m) = (trees.len(), branch_ids.len());

    let rows: Vec<Vec<Classified>> = trees
        .par_iter()
        .map(|tree| {
            branch_ids
                .iter()
                .map(|id| classify(tree, id, params))
                .collect()
        })
        .collect();

    let mut result = AstResult {
        filo_types: Array2::from_elem((n, m), FiloType::Absent),
        added: Array2::from_elem((n, m), false),
        subtracted: Array2::from_elem((n, m), false),
        transitioned: Array2::from_elem((n, m), false),
        master_changed: Array2::from_elem((n, m), false),
        master_nodes: Array2::from_elem((n, m), None),
        excluded: Array2::from_elem((n, m), false),
        branch_ids,
    };

    for (t, row) in rows.iter().enumerate() {
        for (b, c) in row.iter().enumerate() {
            result.filo_types[[t, b]] = c.filo_type;
            result.excluded[[t, b]] = c.excluded;
            result.master_nodes[[t, b]] = c.master.clone();
            if t == 0 {
                continue;
            }
            let prev = &rows[t - 1][b];
            let (was, is) = (prev.filo_type, c.filo_type);
            result.added[[t, b]] = was == FiloType::Absent && is != FiloType::Absent;
            result.subtracted[[t, b]] = was != FiloType::Absent && is == FiloType::Absent;
            let changed = prev.exists && c.exists && prev.master != c.master;
            result.master_changed[[t, b]] = changed;
            result.transitioned[[t, b]] =
                changed && was != FiloType::Absent && is != FiloType::Absent;
        }
    }
    log::debug!("classified {} branches over {} timepoints", m, n);
    result
}
