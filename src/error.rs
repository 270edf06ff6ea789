//! Defines [`GeoError`], representing all errors returned by this crate.

use datafusion_common::DataFusionError;
use thiserror::Error;

/// Enum with all errors in this crate.
///
/// None of these are transient: they signal a programming error on the caller's
/// side or corrupt data, and are never retried or downgraded.
#[derive(Error, Debug)]
pub enum GeoError {
    /// A required input was absent or out of range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Geometry kind or OpenGIS type code that has no entry in the type registry.
    #[error("Unsupported geometry kind: {0}")]
    UnsupportedGeometryKind(String),

    /// Figure attribute that cannot be expressed, e.g. a circular arc.
    #[error("Unsupported figure attribute: {0}")]
    UnsupportedFigureAttribute(String),

    /// Truncated or inconsistent native geometry buffer.
    #[error("Malformed geometry buffer: {0}")]
    MalformedBuffer(String),

    /// [geozero::error::GeozeroError]
    #[error(transparent)]
    Geozero(#[from] geozero::error::GeozeroError),
}

/// Crate-specific result type.
pub type GeoResult<T> = std::result::Result<T, GeoError>;

impl From<GeoError> for DataFusionError {
    fn from(err: GeoError) -> Self {
        DataFusionError::External(Box::new(err))
    }
}

impl From<std::io::Error> for GeoError {
    fn from(err: std::io::Error) -> Self {
        GeoError::MalformedBuffer(err.to_string())
    }
}
