pub mod branch;
pub mod filo_type;
pub mod point;
pub mod punctum;
pub mod state;
pub mod tree;

pub use branch::Branch;
pub use filo_type::FiloType;
pub use point::Point;
pub use punctum::Punctum;
pub use state::{sorted_branch_union, FullState, Timepoint};
pub use tree::{Transform, Tree};

/// Index of a point inside its tree's point arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointIdx(pub usize);

/// Index of a branch inside its tree's branch arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BranchIdx(pub usize);
