#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SGError
{
    #[error("a grid needs at least one dimension")]
    InvalidDimension,
    #[error("dimension {dim} is out of range for a grid with {num_inputs} dimensions")]
    DimensionOutOfRange { dim: usize, num_inputs: usize },
    #[error("invalid operator: {0}")]
    InvalidOperator(String),
    #[error("invalid options: {0}")]
    InvalidOptions(String),
    #[error("expected {expected} values but got {actual}")]
    NumberOfPointsAndValuesMismatch { expected: usize, actual: usize },
    #[error("grid point has {actual} dimensions, the grid has {expected}")]
    PointDimensionMismatch { expected: usize, actual: usize },
    #[error("grid point has an invalid level/index key in dimension {dim}")]
    InvalidGridPoint { dim: usize },
    #[error("grid point not found")]
    PointNotFound,
    #[error("grid point {0} still has children")]
    PointHasChildren(usize),
    #[error("grid point {seq} is missing its parent in dimension {dim}")]
    MissingAncestor { seq: usize, dim: usize },
    #[error("level {0} exceeds the maximum supported level")]
    LevelOutOfRange(u32),
    #[error("point is outside the grid domain")]
    OutOfDomain,
    #[error("LZ4 decompression failed")]
    LZ4DecompressionFailed,
    #[error("serialization failed")]
    SerializationFailed,
    #[error("deserialization failed")]
    DeserializationFailed,
    #[error("unsupported storage version {0}")]
    UnsupportedVersion(u32),
}
