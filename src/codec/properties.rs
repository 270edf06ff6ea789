use crate::geometry::Dimensions;
use bitflags::bitflags;

bitflags! {
    /// Serialization properties byte of the native geometry header.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SerializationProperties: u8 {
        const HAS_Z = 0x01;
        const HAS_M = 0x02;
        const IS_VALID = 0x04;
        const IS_SINGLE_POINT = 0x08;
        const IS_SINGLE_LINE_SEGMENT = 0x10;
        /// Geography only. Read and ignored.
        const IS_LARGER_THAN_A_HEMISPHERE = 0x20;
    }
}

impl SerializationProperties {
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            has_z: self.contains(SerializationProperties::HAS_Z),
            has_m: self.contains(SerializationProperties::HAS_M),
        }
    }

    pub fn from_dimensions(dims: Dimensions) -> Self {
        let mut props = SerializationProperties::empty();
        props.set(SerializationProperties::HAS_Z, dims.has_z);
        props.set(SerializationProperties::HAS_M, dims.has_m);
        props
    }

    /// Byte width of one point record, summed over the x/y, z and m arrays.
    pub fn point_size(&self) -> usize {
        let dims = self.dimensions();
        16 + 8 * usize::from(dims.has_z) + 8 * usize::from(dims.has_m)
    }
}
