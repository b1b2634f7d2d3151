use crate::config::AnalysisParams;
use crate::model::{BranchIdx, Tree};

/// Index into `[parent_point] + points` just past the last point annotated
/// "soma"; 0 when there is none.
pub fn walk_start(tree: &Tree, branch: BranchIdx) -> usize {
    tree.full_branch_points(branch)
        .iter()
        .rposition(|&p| tree.point(p).has_annotation("soma"))
        .map_or(0, |i| i + 1)
}

pub(crate) fn is_excluded(tree: &Tree, branch: BranchIdx, params: &AnalysisParams) -> bool {
    (params.exclude_axon && tree.is_axon(branch)) || (params.exclude_basal && tree.is_basal(branch))
}

/// Length one branch adds to the TDBL, ignoring its descendants.
pub fn branch_contribution(tree: &Tree, branch: BranchIdx, params: &AnalysisParams) -> f64 {
    let (total, to_last_branch) = tree.world_lengths(branch, walk_start(tree, branch));
    if params.include_filo || total - to_last_branch > params.filo_dist {
        total
    } else {
        to_last_branch
    }
}

/// Total dendritic branch length, walking from the root through every child
/// branch. Empty and excluded branches contribute nothing and are not entered.
pub fn tdbl(tree: &Tree, params: &AnalysisParams) -> f64 {
    let Some(root) = tree.root() else {
        return 0.0;
    };
    let mut total = 0.0;
    let mut stack: Vec<BranchIdx> = tree.point(root).children().to_vec();
    while let Some(b) = stack.pop() {
        let branch = tree.branch(b);
        if branch.is_empty() || is_excluded(tree, b, params) {
            continue;
        }
        total += branch_contribution(tree, b, params);
        for &p in branch.points() {
            stack.extend_from_slice(tree.point(p).children());
        }
    }
    total
}
