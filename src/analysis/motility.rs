use ndarray::{Array2, Axis};

use super::ast::AstResult;
use super::filo::filo_lengths;
use super::tdbl::tdbl;
use crate::config::AnalysisParams;
use crate::error::DendriteResult;
use crate::model::Tree;

/// Filopodium length changes between consecutive timepoints.
///
/// `raw` has one row per step `t -> t+1`; the three summaries normalize the
/// row sum by the TDBL, the summed filo length and the filo count of the
/// earlier timepoint `t`.
#[derive(Debug, Clone)]
pub struct Motility {
    pub branch_ids: Vec<String>,
    pub filo_lengths: Array2<f64>,
    pub raw: Array2<f64>,
    pub raw_tdbl: Vec<f64>,
    pub raw_filo: Vec<f64>,
    pub raw_n_filo: Vec<f64>,
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 || !denominator.is_finite() {
        f64::NAN
    } else {
        numerator / denominator
    }
}

fn nan_sum<'a>(values: impl Iterator<Item = &'a f64>) -> f64 {
    values.filter(|v| !v.is_nan()).sum()
}

pub fn motility(
    trees: &[&Tree],
    ast: &AstResult,
    params: &AnalysisParams,
) -> DendriteResult<Motility> {
    let lengths = filo_lengths(trees, ast)?;
    let (n, m) = lengths.dim();
    let steps = n.saturating_sub(1);

    let mut raw = Array2::from_elem((steps, m), f64::NAN);
    for t in 0..steps {
        for b in 0..m {
            let (before, after) = (lengths[[t, b]], lengths[[t + 1, b]]);
            let mut value = if ast.master_changed[[t + 1, b]] {
                f64::NAN
            } else {
                after - before
            };
            if ast.added[[t + 1, b]] {
                value = if params.include_as { after } else { 0.0 };
            } else if ast.subtracted[[t + 1, b]] {
                value = if params.include_as { -before } else { 0.0 };
            }
            raw[[t, b]] = value;
        }
    }

    let mut raw_tdbl = Vec::with_capacity(steps);
    let mut raw_filo = Vec::with_capacity(steps);
    let mut raw_n_filo = Vec::with_capacity(steps);
    for (t, row) in raw.axis_iter(Axis(0)).enumerate() {
        let total = nan_sum(row.iter());
        let filo_count = ast
            .filo_types
            .row(t)
            .iter()
            .filter(|f| f.is_filopodium())
            .count();
        raw_tdbl.push(ratio(total, tdbl(trees[t], params)));
        raw_filo.push(ratio(total, nan_sum(lengths.row(t).iter())));
        raw_n_filo.push(ratio(total, filo_count as f64));
    }

    Ok(Motility {
        branch_ids: ast.branch_ids.clone(),
        filo_lengths: lengths,
        raw,
        raw_tdbl,
        raw_filo,
        raw_n_filo,
    })
}
