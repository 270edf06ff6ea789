use crate::codec::{decode, encode};
use crate::error::GeoResult;
use crate::geometry::Geometry;
use arrow_array::{Array, GenericBinaryArray, OffsetSizeTrait};
use arrow_buffer::{BufferBuilder, NullBufferBuilder, OffsetBuffer, ScalarBuffer};

/// Builds a binary column of native geometry buffers.
pub struct MsSqlGeometryArrayBuilder<O: OffsetSizeTrait> {
    value_builder: BufferBuilder<u8>,
    offsets: Vec<O>,
    null_buffer_builder: NullBufferBuilder,
}

impl<O: OffsetSizeTrait> MsSqlGeometryArrayBuilder<O> {
    pub fn new(capacity: usize) -> Self {
        let mut offsets = Vec::with_capacity(capacity + 1);
        offsets.push(O::usize_as(0));
        Self {
            value_builder: BufferBuilder::<u8>::new(capacity),
            offsets,
            null_buffer_builder: NullBufferBuilder::new(capacity),
        }
    }

    #[inline]
    pub fn append_native(&mut self, native: Option<&[u8]>) {
        if let Some(bytes) = native {
            self.value_builder.append_slice(bytes);
            self.null_buffer_builder.append(true);
            self.offsets.push(self.next_offset());
        } else {
            self.append_null();
        }
    }

    pub fn append_geometry(&mut self, geometry: Option<&Geometry>) -> GeoResult<()> {
        match geometry {
            Some(geometry) => {
                let native = encode(geometry)?;
                self.append_native(Some(&native));
            }
            None => self.append_null(),
        }
        Ok(())
    }

    #[inline]
    pub fn append_null(&mut self) {
        self.null_buffer_builder.append_null();
        self.offsets.push(self.next_offset());
    }

    #[inline]
    fn next_offset(&self) -> O {
        O::usize_as(self.value_builder.len())
    }

    pub fn build(mut self) -> GenericBinaryArray<O> {
        GenericBinaryArray::new(
            OffsetBuffer::new(ScalarBuffer::from(self.offsets)),
            self.value_builder.finish(),
            self.null_buffer_builder.finish(),
        )
    }
}

impl<O: OffsetSizeTrait> TryFrom<&[Option<Geometry>]> for MsSqlGeometryArrayBuilder<O> {
    type Error = crate::error::GeoError;

    fn try_from(value: &[Option<Geometry>]) -> Result<Self, Self::Error> {
        let mut builder = MsSqlGeometryArrayBuilder::<O>::new(value.len());
        for geometry in value {
            builder.append_geometry(geometry.as_ref())?;
        }
        Ok(builder)
    }
}

/// Row access to a binary column holding native geometry buffers.
pub trait MsSqlGeometryArray {
    fn native(&self, index: usize) -> Option<&[u8]>;

    fn geometry_value(&self, index: usize) -> GeoResult<Option<Geometry>> {
        self.native(index).map(decode).transpose()
    }
}

impl<O: OffsetSizeTrait> MsSqlGeometryArray for GenericBinaryArray<O> {
    fn native(&self, index: usize) -> Option<&[u8]> {
        if index >= self.len() || self.is_null(index) {
            return None;
        }
        Some(self.value(index))
    }
}
