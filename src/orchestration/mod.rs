pub mod functions;
pub mod table;

pub use functions::{
    all_branches, all_puncta, all_trees, Analysis, AnalysisContext, BranchFunction,
    PunctaFunction, TreeFunction,
};
pub use table::{timepoint_column, Table};
