use ndarray::Array2;

use super::ast::{classify_branch, AstResult};
use super::tdbl::{tdbl, walk_start};
use crate::config::AnalysisParams;
use crate::error::{DendriteError, DendriteResult};
use crate::model::Tree;

/// Per-branch filopodium lengths, shaped like the AST arrays.
///
/// Filopodium slots hold the branch's world length, excluded axon/basal
/// slots hold NaN and everything else 0. `trees` must be the series `ast`
/// was classified from.
pub fn filo_lengths(trees: &[&Tree], ast: &AstResult) -> DendriteResult<Array2<f64>> {
    if trees.len() != ast.timepoints() {
        return Err(DendriteError::InvalidInput(format!(
            "{} trees for a classification of {} timepoints",
            trees.len(),
            ast.timepoints()
        )));
    }
    let mut lengths = Array2::zeros(ast.filo_types.dim());
    for ((t, b), value) in lengths.indexed_iter_mut() {
        if ast.excluded[[t, b]] {
            *value = f64::NAN;
        } else if ast.filo_types[[t, b]].is_filopodium() {
            *value = trees[t]
                .branch_by_id(&ast.branch_ids[b])
                .map_or(0.0, |branch| {
                    trees[t].world_lengths(branch, walk_start(trees[t], branch)).0
                });
        }
    }
    Ok(lengths)
}

/// Number of filopodia in one tree.
pub fn filo_count(tree: &Tree, params: &AnalysisParams) -> usize {
    tree.branches()
        .filter(|(_, b)| classify_branch(tree, &b.id, params).is_filopodium())
        .count()
}

/// Summed length of every filopodium in one tree.
pub fn total_filo_length(tree: &Tree, params: &AnalysisParams) -> f64 {
    tree.branches()
        .filter(|(_, b)| classify_branch(tree, &b.id, params).is_filopodium())
        .map(|(idx, _)| tree.world_lengths(idx, walk_start(tree, idx)).0)
        .sum()
}

/// Filopodia per µm of TDBL; NaN for a tree without length.
pub fn filo_density(tree: &Tree, params: &AnalysisParams) -> f64 {
    let length = tdbl(tree, params);
    if length > 0.0 {
        filo_count(tree, params) as f64 / length
    } else {
        f64::NAN
    }
}
