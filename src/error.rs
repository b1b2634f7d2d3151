use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DendriteError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("point lists differ in length: {from} source points vs {to} target points")]
    MismatchedInputs { from: usize, to: usize },
    #[error("absolute orientation produced a zero quaternion (degenerate point cloud)")]
    SingularQuaternion,
    #[error("tree structure violation: {0}")]
    StructureViolation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("the alignment was cancelled by the caller")]
    Cancelled,
}

pub type DendriteResult<T> = Result<T, DendriteError>;
