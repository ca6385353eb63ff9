use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("segment {index} has zero length after point merging")]
    ZeroLengthSegment { index: usize },
    #[error("{count} segments exceed the limit of {limit}")]
    TooManySegments { count: usize, limit: usize },
    #[error("tolerance must be finite and positive, got {0}")]
    InvalidTolerance(f64),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NetError {
    #[error("prism height must be finite and positive, got {0}")]
    InvalidHeight(f64),
    #[error("polygon has {0} sides; nets are built for 3 to 6")]
    InvalidSideCount(usize),
    #[error("polygon has a zero-length edge or zero area")]
    DegeneratePolygon,
    #[error("flap angle must lie in [0, 90) degrees, got {0}")]
    InvalidFlapAngle(f64),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ColorError {
    #[error("invalid color mapping entry {0:?}; expected 'color:height'")]
    InvalidMapping(String),
    #[error("height for {color:?} must be finite and positive, got {height}")]
    NonPositiveHeight { color: String, height: f64 },
    #[error("color mapping is empty")]
    EmptyMapping,
}
