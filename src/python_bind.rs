use std::collections::HashMap;

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use crate::analysis::sholl::{default_max_radius, sholl_crossings, sholl_metrics};
use crate::analysis::tdbl::tdbl;
use crate::config::AnalysisParams;
use crate::error::DendriteError;
use crate::geometry::Vec3;
use crate::layout::dendrogram::{layout_dendrogram, SideMemo};
use crate::model::{Point, Transform, Tree};
use crate::registration::absolute_orientation;

impl From<DendriteError> for PyErr {
    fn from(err: DendriteError) -> PyErr {
        match err {
            DendriteError::Cancelled => PyRuntimeError::new_err(err.to_string()),
            _ => PyValueError::new_err(err.to_string()),
        }
    }
}

#[pyclass]
#[derive(Debug, Clone)]
pub struct PyTree {
    pub inner: Tree,
}

#[pymethods]
impl PyTree {
    #[new]
    #[pyo3(signature = (sx = 1.0, sy = 1.0, sz = 1.0))]
    fn new(sx: f64, sy: f64, sz: f64) -> PyResult<Self> {
        Ok(Self {
            inner: Tree::new(Transform::new(sx, sy, sz))?,
        })
    }

    fn set_root(&mut self, id: &str, x: f64, y: f64, z: f64) -> PyResult<()> {
        self.inner.set_root(Point::new(id, x, y, z))?;
        Ok(())
    }

    /// Starts an empty branch hanging off `parent_point_id`.
    fn add_branch(&mut self, id: &str, parent_point_id: &str) -> PyResult<()> {
        self.inner.add_branch(id, parent_point_id)?;
        Ok(())
    }

    #[pyo3(signature = (branch_id, id, x, y, z, radius = None))]
    fn add_point(
        &mut self,
        branch_id: &str,
        id: &str,
        x: f64,
        y: f64,
        z: f64,
        radius: Option<f64>,
    ) -> PyResult<()> {
        let mut point = Point::new(id, x, y, z);
        if let Some(r) = radius {
            point = point.with_radius(r);
        }
        self.inner.add_point_to(branch_id, point)?;
        Ok(())
    }

    fn branch_ids(&self) -> Vec<String> {
        self.inner.branch_ids_sorted()
    }

    fn point_count(&self) -> usize {
        self.inner.point_count()
    }

    fn __repr__(&self) -> String {
        format!(
            "Tree(points={}, branches={})",
            self.inner.point_count(),
            self.inner.branch_count()
        )
    }
}

#[pyfunction]
#[pyo3(signature = (tree, exclude_axon = true, exclude_basal = true, include_filo = true, filo_dist = 10.0))]
pub fn tdbl_py(
    tree: &PyTree,
    exclude_axon: bool,
    exclude_basal: bool,
    include_filo: bool,
    filo_dist: f64,
) -> PyResult<f64> {
    let params = AnalysisParams {
        exclude_axon,
        exclude_basal,
        include_filo,
        filo_dist,
        ..Default::default()
    };
    params.validate()?;
    Ok(tdbl(&tree.inner, &params))
}

/// Crossing counts per shell, plus the critical radius and peak of the
/// fitted polynomial.
#[pyfunction]
#[pyo3(signature = (tree, bin_size = 5.0, max_radius = None, degree = 7))]
pub fn sholl_py(
    tree: &PyTree,
    bin_size: f64,
    max_radius: Option<f64>,
    degree: usize,
) -> PyResult<(Vec<usize>, f64, f64)> {
    if !bin_size.is_finite() || bin_size <= 0.0 {
        return Err(PyValueError::new_err("bin_size must be positive"));
    }
    let max_radius = max_radius.unwrap_or_else(|| default_max_radius(&tree.inner, bin_size));
    let crossings = sholl_crossings(&tree.inner, bin_size, max_radius);
    let metrics = sholl_metrics(&crossings, bin_size, degree)?;
    Ok((crossings, metrics.critical_radius, metrics.max_crossings))
}

/// Returns `(fitted, rotation rows, translation)`.
#[pyfunction]
pub fn absolute_orientation_py(
    from: Vec<(f64, f64, f64)>,
    to: Vec<(f64, f64, f64)>,
) -> PyResult<(Vec<(f64, f64, f64)>, [[f64; 3]; 3], (f64, f64, f64))> {
    let to_vec = |pts: &[(f64, f64, f64)]| -> Vec<Vec3> {
        pts.iter().map(|&(x, y, z)| Vec3::new(x, y, z)).collect()
    };
    let fit = absolute_orientation(&to_vec(&from), &to_vec(&to))?;

    let fitted = fit.fitted.iter().map(|p| (p.x, p.y, p.z)).collect();
    let mut rotation = [[0.0; 3]; 3];
    for (r, row) in rotation.iter_mut().enumerate() {
        for (c, value) in row.iter_mut().enumerate() {
            *value = fit.rotation[(r, c)];
        }
    }
    let t = fit.translation;
    Ok((fitted, rotation, (t.x, t.y, t.z)))
}

/// Point ID -> `(x, y)` dendrogram coordinates of a single tree.
#[pyfunction]
#[pyo3(signature = (tree, filo_dist = 10.0))]
pub fn dendrogram_py(tree: &PyTree, filo_dist: f64) -> HashMap<String, (f64, f64)> {
    let mut memo = SideMemo::new();
    let layout = layout_dendrogram(&tree.inner, None, &mut memo, filo_dist);
    layout
        .x
        .iter()
        .filter_map(|(id, &x)| layout.y.get(id).map(|&y| (id.clone(), (x, y))))
        .collect()
}
