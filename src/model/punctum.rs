use std::f64::consts::PI;

use crate::geometry::Vec3;

/// A circle-on-plane marker. The same `id` across timepoints is the same object.
#[derive(Debug, Clone, PartialEq)]
pub struct Punctum {
    pub id: String,
    /// Image voxel coordinates; `z` selects the plane.
    pub location: Vec3,
    pub radius: Option<f64>,
    pub annotation: String,
}

impl Punctum {
    pub fn new(id: impl Into<String>, x: f64, y: f64, z: f64) -> Self {
        Punctum {
            id: id.into(),
            location: Vec3::new(x, y, z),
            radius: None,
            annotation: String::new(),
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

    pub fn area_for_radius(radius: f64) -> f64 {
        PI * radius * radius
    }
}
