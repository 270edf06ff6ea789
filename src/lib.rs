pub mod codec;
pub mod dialect;
pub mod error;
pub mod function;
pub mod geometry;
pub mod relation;
pub mod value;

pub use codec::{decode, encode};
pub use error::{GeoError, GeoResult};
pub use geometry::Geometry;

pub type DFResult<T> = datafusion_common::Result<T>;
