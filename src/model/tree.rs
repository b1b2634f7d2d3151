use std::cmp::Ordering;
use std::collections::HashMap;

use super::{Branch, BranchIdx, Point, PointIdx};
use crate::error::{DendriteError, DendriteResult};
use crate::geometry::simplify::simplify_rdp;
use crate::geometry::{distance, is_finite, Vec3};

/// Voxel -> world mapping: per-axis pixel sizes followed by a rigid offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub pixel_sizes: Vec3,
    pub translation: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Transform {
            pixel_sizes: Vec3::new(1.0, 1.0, 1.0),
            translation: Vec3::zeros(),
        }
    }
}

impl Transform {
    pub fn new(sx: f64, sy: f64, sz: f64) -> Self {
        Transform {
            pixel_sizes: Vec3::new(sx, sy, sz),
            translation: Vec3::zeros(),
        }
    }

    pub fn with_translation(mut self, translation: Vec3) -> Self {
        self.translation = translation;
        self
    }

    pub fn apply(&self, location: &Vec3) -> Vec3 {
        location.component_mul(&self.pixel_sizes) + self.translation
    }

    pub fn validate(&self) -> DendriteResult<()> {
        if !is_finite(&self.pixel_sizes) || !is_finite(&self.translation) {
            return Err(DendriteError::InvalidInput(format!(
                "non-finite transform {:?}",
                self
            )));
        }
        Ok(())
    }
}

/// A traced arbor: points and branches live in arenas owned by the tree and
/// refer to each other by index. IDs resolve through the lookup maps.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    points: Vec<Point>,
    branches: Vec<Branch>,
    root: Option<PointIdx>,
    point_lookup: HashMap<String, PointIdx>,
    branch_lookup: HashMap<String, BranchIdx>,
    pub transform: Transform,
}

impl Tree {
    pub fn new(transform: Transform) -> DendriteResult<Self> {
        transform.validate()?;
        Ok(Tree {
            transform,
            ..Default::default()
        })
    }

    // ---------------------------------------------------------------------
    // construction
    // ---------------------------------------------------------------------

    pub fn set_root(&mut self, point: Point) -> DendriteResult<PointIdx> {
        if self.root.is_some() {
            return Err(DendriteError::StructureViolation(
                "tree already has a root point".into(),
            ));
        }
        let idx = self.insert_point(point, None)?;
        self.root = Some(idx);
        Ok(idx)
    }

    /// Adds an empty branch leaving the point `parent_point_id`.
    pub fn add_branch(
        &mut self,
        id: impl Into<String>,
        parent_point_id: &str,
    ) -> DendriteResult<BranchIdx> {
        let parent = self
            .point_by_id(parent_point_id)
            .ok_or_else(|| DendriteError::NotFound(format!("point {}", parent_point_id)))?;
        let idx = self.insert_branch(id.into(), Some(parent))?;
        self.points[parent.0].children.push(idx);
        Ok(idx)
    }

    /// Adds a degenerate branch with no parent point. It must stay empty.
    pub fn add_detached_branch(&mut self, id: impl Into<String>) -> DendriteResult<BranchIdx> {
        self.insert_branch(id.into(), None)
    }

    pub fn add_point(&mut self, branch: BranchIdx, point: Point) -> DendriteResult<PointIdx> {
        let b = self
            .branches
            .get(branch.0)
            .ok_or_else(|| DendriteError::NotFound(format!("branch index {}", branch.0)))?;
        if b.parent_point.is_none() {
            return Err(DendriteError::StructureViolation(format!(
                "branch {} has no parent point and cannot hold points",
                b.id
            )));
        }
        let idx = self.insert_point(point, Some(branch))?;
        self.branches[branch.0].points.push(idx);
        Ok(idx)
    }

    pub fn add_point_to(&mut self, branch_id: &str, point: Point) -> DendriteResult<PointIdx> {
        let branch = self
            .branch_by_id(branch_id)
            .ok_or_else(|| DendriteError::NotFound(format!("branch {}", branch_id)))?;
        self.add_point(branch, point)
    }

    fn insert_point(
        &mut self,
        mut point: Point,
        parent_branch: Option<BranchIdx>,
    ) -> DendriteResult<PointIdx> {
        point.validate()?;
        if self.point_lookup.contains_key(&point.id) {
            return Err(DendriteError::StructureViolation(format!(
                "duplicate point id {}",
                point.id
            )));
        }
        let idx = PointIdx(self.points.len());
        point.parent_branch = parent_branch;
        point.children.clear();
        self.point_lookup.insert(point.id.clone(), idx);
        self.points.push(point);
        Ok(idx)
    }

    fn insert_branch(
        &mut self,
        id: String,
        parent_point: Option<PointIdx>,
    ) -> DendriteResult<BranchIdx> {
        if id.is_empty() {
            return Err(DendriteError::InvalidInput("branch id must not be empty".into()));
        }
        if self.branch_lookup.contains_key(&id) {
            return Err(DendriteError::StructureViolation(format!(
                "duplicate branch id {}",
                id
            )));
        }
        let idx = BranchIdx(self.branches.len());
        self.branch_lookup.insert(id.clone(), idx);
        self.branches.push(Branch::new(id, parent_point));
        Ok(idx)
    }

    /// Renames a point. Fails if `new_id` is already taken by another point.
    pub fn rename_point(&mut self, old_id: &str, new_id: &str) -> DendriteResult<()> {
        if old_id == new_id {
            return Ok(());
        }
        if self.point_lookup.contains_key(new_id) {
            return Err(DendriteError::StructureViolation(format!(
                "cannot rename {} to {}: id already in use",
                old_id, new_id
            )));
        }
        let idx = self
            .point_lookup
            .remove(old_id)
            .ok_or_else(|| DendriteError::NotFound(format!("point {}", old_id)))?;
        self.points[idx.0].id = new_id.to_string();
        self.point_lookup.insert(new_id.to_string(), idx);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // accessors
    // ---------------------------------------------------------------------

    pub fn root(&self) -> Option<PointIdx> {
        self.root
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn point(&self, idx: PointIdx) -> &Point {
        &self.points[idx.0]
    }

    pub fn branch(&self, idx: BranchIdx) -> &Branch {
        &self.branches[idx.0]
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn branch_count(&self) -> usize {
        self.branches.len()
    }

    /// Branches in insertion order.
    pub fn branches(&self) -> impl Iterator<Item = (BranchIdx, &Branch)> {
        self.branches
            .iter()
            .enumerate()
            .map(|(i, b)| (BranchIdx(i), b))
    }

    pub fn points(&self) -> impl Iterator<Item = (PointIdx, &Point)> {
        self.points.iter().enumerate().map(|(i, p)| (PointIdx(i), p))
    }

    pub fn point_by_id(&self, id: &str) -> Option<PointIdx> {
        self.point_lookup.get(id).copied()
    }

    pub fn branch_by_id(&self, id: &str) -> Option<BranchIdx> {
        self.branch_lookup.get(id).copied()
    }

    pub fn branch_ids_sorted(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.branches.iter().map(|b| b.id.clone()).collect();
        ids.sort();
        ids
    }

    pub fn world_coord(&self, point: PointIdx) -> Vec3 {
        self.transform.apply(&self.points[point.0].location)
    }

    /// Branch owning the parent point of `branch`, i.e. the shaft it grows from.
    pub fn parent_branch_of(&self, branch: BranchIdx) -> Option<BranchIdx> {
        self.branches[branch.0]
            .parent_point
            .and_then(|p| self.points[p.0].parent_branch)
    }

    /// Rank of this branch among the children of its parent point.
    pub fn index_in_parent(&self, branch: BranchIdx) -> Option<usize> {
        let parent = self.branches[branch.0].parent_point?;
        self.points[parent.0].children.iter().position(|&c| c == branch)
    }

    /// `[parent_point] + points`, the sequence lengths are measured along.
    pub fn full_branch_points(&self, branch: BranchIdx) -> Vec<PointIdx> {
        let b = &self.branches[branch.0];
        let mut full = Vec::with_capacity(b.points.len() + 1);
        if let Some(parent) = b.parent_point {
            full.push(parent);
        }
        full.extend(b.points.iter().copied());
        full
    }

    // ---------------------------------------------------------------------
    // traversal
    // ---------------------------------------------------------------------

    /// Deterministic pre-order walk from the root: a point, then every branch
    /// leaving it (in insertion order), then the rest of its own branch.
    pub fn flatten_points(&self) -> Vec<PointIdx> {
        self.walk().0
    }

    /// Branches in the order the pre-order walk first enters them.
    pub fn flatten_branches(&self) -> Vec<BranchIdx> {
        self.walk().1
    }

    fn walk(&self) -> (Vec<PointIdx>, Vec<BranchIdx>) {
        let mut points = Vec::with_capacity(self.points.len());
        let mut branches = Vec::with_capacity(self.branches.len());
        let Some(root) = self.root else {
            return (points, branches);
        };
        points.push(root);

        let mut stack: Vec<(BranchIdx, usize)> = self.points[root.0]
            .children
            .iter()
            .rev()
            .map(|&b| (b, 0))
            .collect();
        while let Some((b, i)) = stack.pop() {
            if i == 0 {
                branches.push(b);
            }
            let branch_points = &self.branches[b.0].points;
            let Some(&p) = branch_points.get(i) else {
                continue;
            };
            points.push(p);
            stack.push((b, i + 1));
            for &child in self.points[p.0].children.iter().rev() {
                stack.push((child, 0));
            }
        }
        (points, branches)
    }

    /// Neighbour `delta` steps along the point's branch. Off either end this
    /// wraps around, or gives `None` when `no_wrap` is set. The root has no
    /// branch and always gives `None`.
    pub fn next_point_in_branch(
        &self,
        point: PointIdx,
        delta: isize,
        no_wrap: bool,
    ) -> Option<PointIdx> {
        let branch = self.points[point.0].parent_branch?;
        let points = &self.branches[branch.0].points;
        let idx = points.iter().position(|&p| p == point)? as isize;
        let target = idx + delta;
        let len = points.len() as isize;
        if (0..len).contains(&target) {
            Some(points[target as usize])
        } else if no_wrap {
            None
        } else {
            Some(points[target.rem_euclid(len) as usize])
        }
    }

    /// One step along the current branch plus the first point of every child branch.
    pub fn find_next_points(&self, point: PointIdx) -> Vec<PointIdx> {
        let mut next = Vec::new();
        if let Some(p) = self.next_point_in_branch(point, 1, true) {
            next.push(p);
        }
        for &child in &self.points[point.0].children {
            if let Some(first) = self.branches[child.0].first_point() {
                next.push(first);
            }
        }
        next
    }

    // ---------------------------------------------------------------------
    // per-branch measurements
    // ---------------------------------------------------------------------

    /// `(total, up_to_last_branch_point)` world lengths along
    /// `[parent_point] + points`, starting at `from_idx` of that sequence.
    ///
    /// The last branch point is the last point (after `from_idx`) that has at
    /// least one child branch; without one the second value is 0.
    pub fn world_lengths(&self, branch: BranchIdx, from_idx: usize) -> (f64, f64) {
        let full = self.full_branch_points(branch);
        if from_idx >= full.len() {
            return (0.0, 0.0);
        }
        let mut total = 0.0;
        let mut to_last_branch = 0.0;
        let mut prev = self.world_coord(full[from_idx]);
        for &p in &full[from_idx + 1..] {
            let loc = self.world_coord(p);
            total += distance(&prev, &loc);
            if !self.points[p.0].children.is_empty() {
                to_last_branch = total;
            }
            prev = loc;
        }
        (total, to_last_branch)
    }

    pub fn has_child_branches(&self, branch: BranchIdx) -> bool {
        self.branches[branch.0]
            .points
            .iter()
            .any(|p| !self.points[p.0].children.is_empty())
    }

    /// `(is_filo, total_length)`: no child branches and total world length
    /// at most `filo_dist`. Empty branches are never filopodia.
    pub fn is_filo(&self, branch: BranchIdx, filo_dist: f64) -> (bool, f64) {
        if self.branches[branch.0].is_empty() {
            return (false, 0.0);
        }
        let (total, _) = self.world_lengths(branch, 0);
        (!self.has_child_branches(branch) && total <= filo_dist, total)
    }

    pub fn has_point_with_annotation(&self, branch: BranchIdx, label: &str) -> bool {
        self.branches[branch.0]
            .points
            .iter()
            .any(|p| self.points[p.0].has_annotation(label))
    }

    /// True when this branch or any ancestor branch carries `label`.
    pub fn inherits_annotation(&self, branch: BranchIdx, label: &str) -> bool {
        let mut current = Some(branch);
        while let Some(b) = current {
            if self.has_point_with_annotation(b, label) {
                return true;
            }
            current = self.parent_branch_of(b);
        }
        false
    }

    pub fn is_axon(&self, branch: BranchIdx) -> bool {
        self.inherits_annotation(branch, "axon")
    }

    pub fn is_basal(&self, branch: BranchIdx) -> bool {
        self.inherits_annotation(branch, "basal")
    }

    /// Radius of the point, or of the nearest ancestor (back along the branch,
    /// then through parent points) that has one.
    pub fn effective_radius(&self, point: PointIdx) -> Option<f64> {
        let mut current = Some(point);
        while let Some(p) = current {
            let pt = &self.points[p.0];
            if let Some(r) = pt.radius {
                return Some(r);
            }
            current = pt.parent_branch.and_then(|b| {
                let branch = &self.branches[b.0];
                match branch.index_of(p) {
                    Some(i) if i > 0 => Some(branch.points[i - 1]),
                    _ => branch.parent_point,
                }
            });
        }
        None
    }

    /// Shaft order (`centrifugal == false`): 1 for root children, parent + 1 below.
    ///
    /// Centrifugal order: at the parent point the candidates are the child
    /// branches plus the continuation of the parent branch, ranked by length.
    /// The longest keeps the parent's order, the others get +1, +2, ... in
    /// rank order.
    pub fn branch_order(&self, branch: BranchIdx, centrifugal: bool) -> usize {
        let Some(parent_point) = self.branches[branch.0].parent_point else {
            return 1;
        };
        let Some(parent_branch) = self.points[parent_point.0].parent_branch else {
            return 1;
        };
        let base = self.branch_order(parent_branch, centrifugal);
        if !centrifugal {
            return base + 1;
        }
        base + self.centrifugal_offset(parent_point, parent_branch, branch)
    }

    fn centrifugal_offset(
        &self,
        parent_point: PointIdx,
        parent_branch: BranchIdx,
        branch: BranchIdx,
    ) -> usize {
        let shaft = &self.branches[parent_branch.0];
        let continuation = shaft
            .index_of(parent_point)
            .filter(|&pos| pos + 1 < shaft.points.len())
            .map(|pos| self.world_lengths(parent_branch, pos + 1).0);

        let mut children: Vec<(BranchIdx, f64)> = self.points[parent_point.0]
            .children
            .iter()
            .map(|&c| (c, self.world_lengths(c, 0).0))
            .collect();
        // stable: siblings of equal length keep insertion order
        children.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

        let rank = children
            .iter()
            .position(|(c, _)| *c == branch)
            .unwrap_or(0);
        let longest_child = children.first().map_or(0.0, |(_, len)| *len);
        match continuation {
            Some(len) if len >= longest_child => rank + 1,
            _ => rank,
        }
    }

    /// RDP simplification of the branch in world coordinates, parent point included.
    pub fn simplify_branch(&self, branch: BranchIdx, tolerance: f64) -> Vec<PointIdx> {
        let full = self.full_branch_points(branch);
        let coords: Vec<Vec3> = full.iter().map(|&p| self.world_coord(p)).collect();
        simplify_rdp(&coords, tolerance)
            .into_iter()
            .map(|i| full[i])
            .collect()
    }
}
