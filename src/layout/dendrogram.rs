use std::collections::HashMap;

use crate::analysis::ast::AstResult;
use crate::geometry::distance;
use crate::model::{BranchIdx, FiloType, PointIdx, Tree};

/// Maximum sideways offset of a filopodium tip from its shaft.
pub const FILO_WIDTH_SCALE: f64 = 0.8;
/// Horizontal distance between neighbouring shaft columns.
pub const COLUMN_SPACING: f64 = 2.0;

/// `branch id -> drawn on the left`, shared across a time series so a branch
/// keeps its side.
pub type SideMemo = HashMap<String, bool>;

/// 2D position of every point, keyed by point ID.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DendrogramLayout {
    pub x: HashMap<String, f64>,
    pub y: HashMap<String, f64>,
}

impl DendrogramLayout {
    pub fn position(&self, point_id: &str) -> Option<(f64, f64)> {
        Some((*self.x.get(point_id)?, *self.y.get(point_id)?))
    }

    fn set(&mut self, point_id: &str, x: f64, y: f64) {
        self.x.insert(point_id.to_string(), x);
        self.y.insert(point_id.to_string(), y);
    }
}

struct Planner<'a> {
    tree: &'a Tree,
    filo_types: Option<&'a HashMap<String, FiloType>>,
    filo_dist: f64,
    memo: &'a mut SideMemo,
    /// columns taken by the subtree on each side of its own column
    widths: HashMap<BranchIdx, (i64, i64)>,
    left: HashMap<BranchIdx, bool>,
    layout: DendrogramLayout,
}

impl Planner<'_> {
    fn drawn_as_filo(&self, branch: BranchIdx) -> bool {
        let tree = self.tree;
        if tree.parent_branch_of(branch).is_none() || tree.has_child_branches(branch) {
            return false;
        }
        match self.filo_types {
            Some(types) => types
                .get(&tree.branch(branch).id)
                .is_some_and(|t| t.is_drawn_as_filo()),
            None => tree.is_filo(branch, self.filo_dist).0,
        }
    }

    /// Non-empty child branches of the shaft, in point order.
    fn children_of(&self, shaft: BranchIdx) -> Vec<BranchIdx> {
        let tree = self.tree;
        tree.branch(shaft)
            .points()
            .iter()
            .flat_map(|&p| tree.point(p).children().iter().copied())
            .filter(|&c| !tree.branch(c).is_empty())
            .collect()
    }

    /// Post-order pass: sizes every shaft subtree and fixes the side of each child.
    fn plan(&mut self, shaft: BranchIdx) -> (i64, i64) {
        let (mut left_w, mut right_w) = (0i64, 0i64);
        let mut tie_left = true;
        let mut filo_left = true;

        for child in self.children_of(shaft) {
            let id = self.tree.branch(child).id.clone();
            if self.drawn_as_filo(child) {
                let side = match self.memo.get(&id) {
                    Some(&side) => side,
                    None => {
                        filo_left = !filo_left;
                        !filo_left
                    }
                };
                self.memo.insert(id, side);
                self.left.insert(child, side);
                continue;
            }

            let (lw, rw) = self.plan(child);
            let side = match self.memo.get(&id) {
                Some(&side) => side,
                None if left_w < right_w => true,
                None if right_w < left_w => false,
                None => {
                    tie_left = !tie_left;
                    !tie_left
                }
            };
            self.memo.insert(id, side);
            self.left.insert(child, side);
            if side {
                left_w += lw + rw + 1;
            } else {
                right_w += lw + rw + 1;
            }
        }
        self.widths.insert(shaft, (left_w, right_w));
        (left_w, right_w)
    }

    /// Top-down pass. `start_y` is the Y of the parent point; root children
    /// instead measure Y from the root.
    fn place_shaft(&mut self, shaft: BranchIdx, column: i64, start_y: f64, from_root: bool) {
        let tree = self.tree;
        let x = column as f64 * COLUMN_SPACING;
        let full = tree.full_branch_points(shaft);

        let mut y = start_y;
        for (k, pair) in full.windows(2).enumerate() {
            if k > 0 || from_root {
                y += distance(&tree.world_coord(pair[0]), &tree.world_coord(pair[1]));
            }
            self.layout.set(&tree.point(pair[1]).id, x, y);
        }

        // filopodia sharing a parent point and side split the spur width into bands
        let children = self.children_of(shaft);
        let mut band_counts: HashMap<(PointIdx, bool), usize> = HashMap::new();
        let mut bands: HashMap<BranchIdx, (PointIdx, bool, usize)> = HashMap::new();
        for &child in &children {
            let Some(parent) = tree.branch(child).parent_point() else {
                continue;
            };
            if self.drawn_as_filo(child) {
                let left = self.left.get(&child).copied().unwrap_or(true);
                let count = band_counts.entry((parent, left)).or_insert(0);
                bands.insert(child, (parent, left, *count));
                *count += 1;
            }
        }

        let (mut left_cursor, mut right_cursor) = (column, column);
        for child in children {
            let Some(parent) = tree.branch(child).parent_point() else {
                continue;
            };
            let parent_id = &tree.point(parent).id;
            let Some((px, py)) = self.layout.position(parent_id) else {
                continue;
            };
            let left = self.left.get(&child).copied().unwrap_or(true);

            if let Some(&(parent, side, band)) = bands.get(&child) {
                let n_bands = band_counts.get(&(parent, side)).copied().unwrap_or(1);
                self.place_filo(child, (px, py), left, band, n_bands);
                continue;
            }
            let (lw, rw) = self.widths.get(&child).copied().unwrap_or((0, 0));
            let child_column = if left {
                let c = left_cursor - 1 - rw;
                left_cursor = c - lw;
                c
            } else {
                let c = right_cursor + 1 + lw;
                right_cursor = c + rw;
                c
            };
            self.place_shaft(child, child_column, py, false);
        }
    }

    /// Band `band` of `n_bands` spans `(band, band + 1] / n_bands` of the spur
    /// width, so filopodia on one side of a point never overlap.
    fn place_filo(
        &mut self,
        filo: BranchIdx,
        (px, py): (f64, f64),
        left: bool,
        band: usize,
        n_bands: usize,
    ) {
        let tree = self.tree;
        let sign = if left { -1.0 } else { 1.0 };
        let n_bands = n_bands.max(1) as f64;
        let mut cumulative = 0.0;
        for pair in tree.full_branch_points(filo).windows(2) {
            cumulative += distance(&tree.world_coord(pair[0]), &tree.world_coord(pair[1]));
            let reach = if self.filo_dist > 0.0 {
                (cumulative / self.filo_dist).min(1.0)
            } else {
                1.0
            };
            let offset = (band as f64 + reach) / n_bands * FILO_WIDTH_SCALE;
            self.layout.set(&tree.point(pair[1]).id, px + sign * offset, py);
        }
    }
}

/// Places every point of `tree` on a 2D canvas.
///
/// Root children are shafts laid out left to right. Below them, shaft
/// children take their own column on the side recorded in `memo`, or the
/// lighter side (ties alternate, left first). Filopodia are horizontal spurs
/// at their parent point's Y. `filo_types` overrides the filo test with a
/// precomputed classification.
pub fn layout_dendrogram(
    tree: &Tree,
    filo_types: Option<&HashMap<String, FiloType>>,
    memo: &mut SideMemo,
    filo_dist: f64,
) -> DendrogramLayout {
    let Some(root) = tree.root() else {
        return DendrogramLayout::default();
    };
    let mut planner = Planner {
        tree,
        filo_types,
        filo_dist,
        memo,
        widths: HashMap::new(),
        left: HashMap::new(),
        layout: DendrogramLayout::default(),
    };

    let root_children: Vec<BranchIdx> = tree
        .point(root)
        .children()
        .iter()
        .copied()
        .filter(|&c| !tree.branch(c).is_empty())
        .collect();
    let mut cursor = 0i64;
    let mut columns = Vec::with_capacity(root_children.len());
    for &child in &root_children {
        let (lw, rw) = planner.plan(child);
        let column = cursor + lw;
        cursor = column + rw + 1;
        columns.push((child, column));
    }

    for &(child, column) in &columns {
        planner.place_shaft(child, column, 0.0, true);
    }
    let root_x = if columns.is_empty() {
        0.0
    } else {
        columns
            .iter()
            .map(|&(_, c)| c as f64 * COLUMN_SPACING)
            .sum::<f64>()
            / columns.len() as f64
    };
    planner.layout.set(&tree.point(root).id, root_x, 0.0);
    planner.layout
}

/// `branch id -> type` for timepoint `t` of an AST result.
pub fn filo_type_map(ast: &AstResult, t: usize) -> HashMap<String, FiloType> {
    ast.branch_ids
        .iter()
        .enumerate()
        .map(|(b, id)| (id.clone(), ast.filo_types[[t, b]]))
        .collect()
}

/// Lays out a whole series with one shared side memo.
pub fn layout_series(
    trees: &[&Tree],
    ast: Option<&AstResult>,
    filo_dist: f64,
) -> Vec<DendrogramLayout> {
    let mut memo = SideMemo::new();
    trees
        .iter()
        .enumerate()
        .map(|(t, tree)| {
            let types = ast.map(|a| filo_type_map(a, t));
            layout_dendrogram(tree, types.as_ref(), &mut memo, filo_dist)
        })
        .collect()
}
