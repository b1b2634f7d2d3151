use std::fmt;

use anyhow::Context;
use ndarray::Array2;
use rayon::prelude::*;

use super::table::{timepoint_column, Table};
use crate::analysis::ast::{classify_series, AstResult};
use crate::analysis::filo::{filo_count, filo_density, filo_lengths, total_filo_length};
use crate::analysis::motility::motility;
use crate::analysis::puncta::{per_puncta_intensity, per_puncta_size};
use crate::analysis::sholl::{default_max_radius, sholl_crossings, sholl_metrics};
use crate::analysis::tdbl::tdbl;
use crate::config::AnalysisParams;
use crate::io::volume::VolumeProvider;
use crate::model::{BranchIdx, FullState, Tree};

/// What an analysis run sees: the series plus optional collaborators.
#[derive(Clone, Copy)]
pub struct AnalysisContext<'a> {
    pub state: &'a FullState,
    pub volumes: Option<&'a dyn VolumeProvider>,
}

impl<'a> AnalysisContext<'a> {
    pub fn new(state: &'a FullState) -> Self {
        AnalysisContext {
            state,
            volumes: None,
        }
    }

    pub fn with_volumes(mut self, volumes: &'a dyn VolumeProvider) -> Self {
        self.volumes = Some(volumes);
        self
    }
}

/// One analysis over a uniform index.
pub trait Analysis: Sync {
    fn name(&self) -> &'static str;

    fn defaults(&self) -> AnalysisParams {
        AnalysisParams::default()
    }

    fn should_run(&self, _ctx: &AnalysisContext) -> bool {
        true
    }

    fn run(
        &self,
        ctx: &AnalysisContext,
        index: &[String],
        params: &AnalysisParams,
    ) -> anyhow::Result<Table>;
}

/// Runs every analysis that wants to run over the same index and joins the
/// results into one table. Without caller `params`, each analysis runs with
/// its own `defaults()`.
fn fold<A: Analysis>(
    ctx: &AnalysisContext,
    index_name: &str,
    index: Vec<String>,
    funcs: &[A],
    params: Option<&AnalysisParams>,
) -> anyhow::Result<Table> {
    if let Some(params) = params {
        params.validate()?;
    }
    let mut table = Table::new(index_name, index);
    for func in funcs {
        if !func.should_run(ctx) {
            log::info!("skipping {}: inputs unavailable", func.name());
            continue;
        }
        let defaults;
        let params = match params {
            Some(params) => params,
            None => {
                defaults = func.defaults();
                defaults.validate()?;
                &defaults
            }
        };
        log::debug!("running {} over {} {}s", func.name(), table.n_rows(), index_name);
        let result = func
            .run(ctx, &table.index, params)
            .with_context(|| format!("analysis {} failed", func.name()))?;
        table.join(result)?;
    }
    Ok(table)
}

pub fn tree_index(state: &FullState) -> Vec<String> {
    (0..state.len()).map(|t| t.to_string()).collect()
}

/// Tree analyses, one row per timepoint.
pub fn all_trees(
    ctx: &AnalysisContext,
    funcs: &[TreeFunction],
    params: Option<&AnalysisParams>,
) -> anyhow::Result<Table> {
    fold(ctx, "tree", tree_index(ctx.state), funcs, params)
}

/// Branch analyses, one row per branch ID of the sorted union.
pub fn all_branches(
    ctx: &AnalysisContext,
    funcs: &[BranchFunction],
    params: Option<&AnalysisParams>,
) -> anyhow::Result<Table> {
    fold(ctx, "branch", ctx.state.sorted_branch_union(), funcs, params)
}

/// Punctum analyses, one row per punctum ID of the sorted union.
pub fn all_puncta(
    ctx: &AnalysisContext,
    funcs: &[PunctaFunction],
    params: Option<&AnalysisParams>,
) -> anyhow::Result<Table> {
    fold(ctx, "punctum", ctx.state.sorted_puncta_union(), funcs, params)
}

fn per_tree<F>(trees: &[&Tree], f: F) -> Vec<f64>
where
    F: Fn(&Tree) -> f64 + Sync + Send,
{
    trees.par_iter().map(|tree| f(tree)).collect()
}

/// Rows of `values` (`[t, b]`) become the columns `<metric>_<TT>`.
fn timepoint_columns(
    table: &mut Table,
    metric: &str,
    values: &Array2<f64>,
) -> anyhow::Result<()> {
    for (t, row) in values.rows().into_iter().enumerate() {
        table.insert_column(timepoint_column(metric, t), row.to_vec())?;
    }
    Ok(())
}

fn indicator(mask: &Array2<bool>) -> Array2<f64> {
    mask.mapv(|b| if b { 1.0 } else { 0.0 })
}

/// Reorders an AST-shaped `[t, b]` array onto the rows of `index`.
fn align_to_index<T: Clone>(
    ast: &AstResult,
    values: &Array2<T>,
    index: &[String],
    missing: T,
) -> Array2<T> {
    let mut out = Array2::from_elem((values.nrows(), index.len()), missing);
    for (j, id) in index.iter().enumerate() {
        if let Some(b) = ast.branch_index(id) {
            out.column_mut(j).assign(&values.column(b));
        }
    }
    out
}

fn sholl_radius(trees: &[&Tree], params: &AnalysisParams) -> f64 {
    params.sholl_max_radius.unwrap_or_else(|| {
        trees
            .iter()
            .map(|t| default_max_radius(t, params.sholl_bin_size))
            .fold(params.sholl_bin_size, f64::max)
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeFunction {
    Tdbl,
    FiloCount,
    FiloDensity,
    FiloLength,
    Motility,
    ShollCrossings,
    ShollMetrics,
}

impl TreeFunction {
    pub const ALL: [TreeFunction; 7] = [
        TreeFunction::Tdbl,
        TreeFunction::FiloCount,
        TreeFunction::FiloDensity,
        TreeFunction::FiloLength,
        TreeFunction::Motility,
        TreeFunction::ShollCrossings,
        TreeFunction::ShollMetrics,
    ];
}

impl fmt::Display for TreeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Analysis for TreeFunction {
    fn name(&self) -> &'static str {
        match self {
            TreeFunction::Tdbl => "tdbl",
            TreeFunction::FiloCount => "filoCount",
            TreeFunction::FiloDensity => "filoDensity",
            TreeFunction::FiloLength => "filoLength",
            TreeFunction::Motility => "motility",
            TreeFunction::ShollCrossings => "shollCrossings",
            TreeFunction::ShollMetrics => "shollMetrics",
        }
    }

    fn should_run(&self, ctx: &AnalysisContext) -> bool {
        match self {
            TreeFunction::Motility => ctx.state.len() > 1,
            _ => true,
        }
    }

    fn run(
        &self,
        ctx: &AnalysisContext,
        index: &[String],
        params: &AnalysisParams,
    ) -> anyhow::Result<Table> {
        let trees = ctx.state.trees();
        let mut table = Table::new("tree", index.to_vec());
        match self {
            TreeFunction::Tdbl => {
                table.insert_column(self.name(), per_tree(&trees, |t| tdbl(t, params)))?;
            }
            TreeFunction::FiloCount => {
                let counts = per_tree(&trees, |t| filo_count(t, params) as f64);
                table.insert_column(self.name(), counts)?;
            }
            TreeFunction::FiloDensity => {
                table.insert_column(self.name(), per_tree(&trees, |t| filo_density(t, params)))?;
            }
            TreeFunction::FiloLength => {
                let lengths = per_tree(&trees, |t| total_filo_length(t, params));
                table.insert_column(self.name(), lengths)?;
            }
            TreeFunction::Motility => {
                let ast = classify_series(&trees, params);
                let result = motility(&trees, &ast, params)?;
                // step t -> t+1 is reported on row t; the last tree has no step
                let pad = |v: &[f64]| {
                    let mut column = v.to_vec();
                    column.resize(index.len(), f64::NAN);
                    column
                };
                table.insert_column("motilityRawTDBL", pad(&result.raw_tdbl))?;
                table.insert_column("motilityRawFilo", pad(&result.raw_filo))?;
                table.insert_column("motilityRawNFilo", pad(&result.raw_n_filo))?;
            }
            TreeFunction::ShollCrossings => {
                let max_radius = sholl_radius(&trees, params);
                let profiles: Vec<Vec<usize>> = trees
                    .par_iter()
                    .map(|t| sholl_crossings(t, params.sholl_bin_size, max_radius))
                    .collect();
                let bins = profiles.first().map_or(0, Vec::len);
                for bin in 0..bins {
                    let column = profiles.iter().map(|p| p[bin] as f64).collect();
                    table.insert_column(format!("shollCrossings_{:03}", bin), column)?;
                }
            }
            TreeFunction::ShollMetrics => {
                let max_radius = sholl_radius(&trees, params);
                let metrics: Vec<(f64, f64)> = trees
                    .par_iter()
                    .map(|t| {
                        let crossings = sholl_crossings(t, params.sholl_bin_size, max_radius);
                        sholl_metrics(&crossings, params.sholl_bin_size, params.sholl_degree)
                            .map_or((f64::NAN, f64::NAN), |m| {
                                (m.critical_radius, m.max_crossings)
                            })
                    })
                    .collect();
                table.insert_column("shollCriticalRadius", metrics.iter().map(|m| m.0).collect())?;
                table.insert_column("shollMaxCrossings", metrics.iter().map(|m| m.1).collect())?;
            }
        }
        Ok(table)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchFunction {
    /// `FiloType::rank()` of the primary classification.
    BranchType,
    BranchLength,
    BranchOrder,
    CentrifugalOrder,
    FiloLength,
    Motility,
    Added,
    Subtracted,
    Transitioned,
}

impl BranchFunction {
    pub const ALL: [BranchFunction; 9] = [
        BranchFunction::BranchType,
        BranchFunction::BranchLength,
        BranchFunction::BranchOrder,
        BranchFunction::CentrifugalOrder,
        BranchFunction::FiloLength,
        BranchFunction::Motility,
        BranchFunction::Added,
        BranchFunction::Subtracted,
        BranchFunction::Transitioned,
    ];

    /// `[t, b]` values of a per-branch, per-tree measurement; NaN where the
    /// branch is missing or empty.
    fn per_branch<F>(trees: &[&Tree], index: &[String], f: F) -> Array2<f64>
    where
        F: Fn(&Tree, BranchIdx) -> f64 + Sync + Send,
    {
        let rows: Vec<Vec<f64>> = trees
            .par_iter()
            .map(|tree| {
                index
                    .iter()
                    .map(|id| match tree.branch_by_id(id) {
                        Some(b) if !tree.branch(b).is_empty() => f(tree, b),
                        _ => f64::NAN,
                    })
                    .collect()
            })
            .collect();
        Array2::from_shape_fn((trees.len(), index.len()), |(t, j)| rows[t][j])
    }
}

impl fmt::Display for BranchFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Analysis for BranchFunction {
    fn name(&self) -> &'static str {
        match self {
            BranchFunction::BranchType => "branchType",
            BranchFunction::BranchLength => "branchLength",
            BranchFunction::BranchOrder => "branchOrder",
            BranchFunction::CentrifugalOrder => "centrifugalOrder",
            BranchFunction::FiloLength => "filoLength",
            BranchFunction::Motility => "motility",
            BranchFunction::Added => "added",
            BranchFunction::Subtracted => "subtracted",
            BranchFunction::Transitioned => "transitioned",
        }
    }

    fn should_run(&self, ctx: &AnalysisContext) -> bool {
        match self {
            BranchFunction::Motility => ctx.state.len() > 1,
            _ => true,
        }
    }

    fn run(
        &self,
        ctx: &AnalysisContext,
        index: &[String],
        params: &AnalysisParams,
    ) -> anyhow::Result<Table> {
        let trees = ctx.state.trees();
        let mut table = Table::new("branch", index.to_vec());
        let values = match self {
            BranchFunction::BranchLength => {
                Self::per_branch(&trees, index, |t, b| t.world_lengths(b, 0).0)
            }
            BranchFunction::BranchOrder => {
                Self::per_branch(&trees, index, |t, b| t.branch_order(b, false) as f64)
            }
            BranchFunction::CentrifugalOrder => {
                Self::per_branch(&trees, index, |t, b| t.branch_order(b, true) as f64)
            }
            _ => {
                let ast = classify_series(&trees, params);
                let per_ast = match self {
                    BranchFunction::BranchType => ast.filo_types.mapv(|f| f64::from(f.rank())),
                    BranchFunction::FiloLength => filo_lengths(&trees, &ast)?,
                    BranchFunction::Added => indicator(&ast.added),
                    BranchFunction::Subtracted => indicator(&ast.subtracted),
                    BranchFunction::Transitioned => indicator(&ast.transitioned),
                    _ => motility(&trees, &ast, params)?.raw,
                };
                align_to_index(&ast, &per_ast, index, f64::NAN)
            }
        };
        timepoint_columns(&mut table, self.name(), &values)?;
        Ok(table)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PunctaFunction {
    Size,
    Intensity,
}

impl fmt::Display for PunctaFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Analysis for PunctaFunction {
    fn name(&self) -> &'static str {
        match self {
            PunctaFunction::Size => "size",
            PunctaFunction::Intensity => "intensity",
        }
    }

    fn should_run(&self, ctx: &AnalysisContext) -> bool {
        match self {
            PunctaFunction::Size => true,
            PunctaFunction::Intensity => ctx.volumes.is_some(),
        }
    }

    fn run(
        &self,
        ctx: &AnalysisContext,
        index: &[String],
        params: &AnalysisParams,
    ) -> anyhow::Result<Table> {
        let mut table = Table::new("punctum", index.to_vec());
        // [punctum, t]
        let values = match self {
            PunctaFunction::Size => per_puncta_size(ctx.state, index),
            PunctaFunction::Intensity => {
                let volumes = ctx
                    .volumes
                    .context("punctum intensity needs a volume provider")?;
                per_puncta_intensity(ctx.state, index, params.channel, volumes)?
            }
        };
        timepoint_columns(&mut table, self.name(), &values.t().to_owned())?;
        Ok(table)
    }
}
