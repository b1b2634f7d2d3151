pub mod absolute_orientation;
pub mod identity_align;

pub use absolute_orientation::{absolute_orientation, RigidFit};
pub use identity_align::{apply_alignment, AlignmentResult, IdentityAligner};
