//! Boundary between the codec and a parameterized statement / result set.

mod array;

pub use array::*;

use crate::codec::{decode, encode};
use crate::error::{GeoError, GeoResult};
use crate::geometry::Geometry;
use bytes::Bytes;
use tracing::debug;

/// Driver-side SQL type used when binding a geometry parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    /// The vendor's structured (UDT) `geometry` type.
    Geometry,
}

/// Encoded geometry handed to the driver as an opaque native object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeGeometry(Bytes);

impl NativeGeometry {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }

    pub fn to_geometry(&self) -> GeoResult<Geometry> {
        decode(&self.0)
    }
}

/// Prepared statement parameters, as exposed by the database driver.
pub trait GeometryStatement {
    type Error: From<GeoError>;

    fn set_null(&mut self, index: usize, sql_type: SqlType) -> Result<(), Self::Error>;

    fn set_object(&mut self, index: usize, value: NativeGeometry) -> Result<(), Self::Error>;
}

/// A value read from a geometry result column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Null,
    Bytes(Vec<u8>),
    Native(NativeGeometry),
}

impl From<Option<&[u8]>> for ColumnValue {
    fn from(value: Option<&[u8]>) -> Self {
        match value {
            Some(bytes) => ColumnValue::Bytes(bytes.to_vec()),
            None => ColumnValue::Null,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct GeometryValueBinder;

impl GeometryValueBinder {
    /// Binds `value` at `index`, or SQL NULL of the geometry type when absent.
    pub fn bind<S: GeometryStatement>(
        &self,
        statement: &mut S,
        value: Option<&Geometry>,
        index: usize,
    ) -> Result<(), S::Error> {
        match value {
            None => {
                debug!(index, "binding null geometry");
                statement.set_null(index, SqlType::Geometry)
            }
            Some(geometry) => {
                let native = self.to_native(Some(geometry))?;
                statement.set_object(index, native)
            }
        }
    }

    pub fn to_native(&self, value: Option<&Geometry>) -> GeoResult<NativeGeometry> {
        let geometry = value
            .ok_or_else(|| GeoError::InvalidArgument("Null geometry passed.".to_string()))?;
        Ok(NativeGeometry::new(encode(geometry)?))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct GeometryValueExtractor;

impl GeometryValueExtractor {
    pub fn extract(&self, value: &ColumnValue) -> GeoResult<Option<Geometry>> {
        match value {
            ColumnValue::Null => Ok(None),
            ColumnValue::Bytes(bytes) => decode(bytes).map(Some),
            ColumnValue::Native(native) => native.to_geometry().map(Some),
        }
    }
}
