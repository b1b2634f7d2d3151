pub mod analysis;
pub mod config;
pub mod error;
pub mod geometry;
pub mod io;
pub mod layout;
pub mod model;
pub mod orchestration;
pub mod registration;
mod utils;

#[cfg(feature = "python")]
mod python_bind;

pub use config::{AlignerConfig, AnalysisParams, Config};
pub use error::{DendriteError, DendriteResult};
pub use model::{Branch, FiloType, FullState, Point, Punctum, Timepoint, Transform, Tree};
pub use orchestration::{all_branches, all_puncta, all_trees, AnalysisContext, Table};

#[cfg(feature = "python")]
use pyo3::prelude::*;

/// Module importable from Python:
///
/// ```python
/// import dendrotrack as dt
/// tree = dt.PyTree(0.1, 0.1, 0.5)
/// tree.set_root("soma", 0.0, 0.0, 0.0)
/// dt.tdbl_py(tree)
/// ```
#[cfg(feature = "python")]
#[pymodule]
fn dendrotrack(m: &Bound<'_, PyModule>) -> PyResult<()> {
    use python_bind::*;

    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    m.add_function(wrap_pyfunction!(tdbl_py, m)?)?;
    m.add_function(wrap_pyfunction!(sholl_py, m)?)?;
    m.add_function(wrap_pyfunction!(absolute_orientation_py, m)?)?;
    m.add_function(wrap_pyfunction!(dendrogram_py, m)?)?;
    m.add_class::<PyTree>()?;
    Ok(())
}
