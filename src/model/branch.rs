use super::PointIdx;

/// An ordered chain of points leaving `parent_point`.
///
/// `points` never contains the parent point itself; length computations that
/// need the first segment prepend it (see [`crate::model::Tree::full_branch_points`]).
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub id: String,
    pub(crate) points: Vec<PointIdx>,
    pub(crate) parent_point: Option<PointIdx>,
}

impl Branch {
    pub(crate) fn new(id: String, parent_point: Option<PointIdx>) -> Self {
        Branch {
            id,
            points: Vec::new(),
            parent_point,
        }
    }

    pub fn points(&self) -> &[PointIdx] {
        &self.points
    }

    pub fn parent_point(&self) -> Option<PointIdx> {
        self.parent_point
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn first_point(&self) -> Option<PointIdx> {
        self.points.first().copied()
    }

    pub fn last_point(&self) -> Option<PointIdx> {
        self.points.last().copied()
    }

    pub fn index_of(&self, point: PointIdx) -> Option<usize> {
        self.points.iter().position(|&p| p == point)
    }
}
