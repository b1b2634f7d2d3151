use super::BranchIdx;
use crate::error::{DendriteError, DendriteResult};
use crate::geometry::{is_finite, Vec3};

#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub id: String,
    /// Image voxel coordinates.
    pub location: Vec3,
    pub radius: Option<f64>,
    pub annotation: String,
    pub manually_marked: bool,
    pub(crate) parent_branch: Option<BranchIdx>,
    pub(crate) children: Vec<BranchIdx>,
}

impl Point {
    pub fn new(id: impl Into<String>, x: f64, y: f64, z: f64) -> Self {
        Point {
            id: id.into(),
            location: Vec3::new(x, y, z),
            radius: None,
            annotation: String::new(),
            manually_marked: false,
            parent_branch: None,
            children: Vec::new(),
        }
    }

    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = Some(radius);
        self
    }

    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = annotation.into();
        self
    }

    pub fn marked(mut self) -> Self {
        self.manually_marked = true;
        self
    }

    /// Branch this point lies on; `None` for the root (soma).
    pub fn parent_branch(&self) -> Option<BranchIdx> {
        self.parent_branch
    }

    /// Branches emanating from this point, in insertion order.
    pub fn children(&self) -> &[BranchIdx] {
        &self.children
    }

    pub fn has_annotation(&self, label: &str) -> bool {
        self.annotation.contains(label)
    }

    pub(crate) fn validate(&self) -> DendriteResult<()> {
        if self.id.is_empty() {
            return Err(DendriteError::InvalidInput("point id must not be empty".into()));
        }
        if !is_finite(&self.location) {
            return Err(DendriteError::InvalidInput(format!(
                "point {} has non-finite coordinates {:?}",
                self.id, self.location
            )));
        }
        if let Some(r) = self.radius {
            if !r.is_finite() || r < 0.0 {
                return Err(DendriteError::InvalidInput(format!(
                    "point {} has invalid radius {}",
                    self.id, r
                )));
            }
        }
        Ok(())
    }
}
