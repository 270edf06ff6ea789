//! Flat arena representation of a geometry tree, mirroring the three
//! parallel arrays (points, figures, shapes) of the native format.

use crate::codec::properties::SerializationProperties;
use crate::codec::registry::OpenGisType;
use crate::error::{GeoError, GeoResult};
use crate::geometry::{Coord, Dimensions, Srid};

/// Only serialization version handled by this codec.
pub const VERSION: u8 = 1;

/// SRID (4) + version (1) + serialization properties (1).
pub const HEADER_SIZE: usize = 6;

pub(crate) const FIGURE_SIZE: usize = 5;
pub(crate) const SHAPE_SIZE: usize = 9;

/// Figure attributes of serialization version 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FigureAttribute {
    InteriorRing = 0,
    Stroke = 1,
    ExteriorRing = 2,
}

impl TryFrom<u8> for FigureAttribute {
    type Error = GeoError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(FigureAttribute::InteriorRing),
            1 => Ok(FigureAttribute::Stroke),
            2 => Ok(FigureAttribute::ExteriorRing),
            _ => Err(GeoError::UnsupportedFigureAttribute(format!(
                "attribute byte {}",
                value
            ))),
        }
    }
}

/// A ring or line: a run of the shared point array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Figure {
    pub(crate) attribute: FigureAttribute,
    pub(crate) point_offset: usize,
}

/// One node of the tree. `parent` is `None` for the root, `figure_offset`
/// is `None` for an empty shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ShapeRecord {
    pub(crate) parent: Option<usize>,
    pub(crate) figure_offset: Option<usize>,
    pub(crate) open_gis_type: OpenGisType,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NativeLayout {
    pub(crate) srid: Srid,
    pub(crate) dims: Dimensions,
    pub(crate) points: Vec<Coord>,
    pub(crate) figures: Vec<Figure>,
    pub(crate) shapes: Vec<ShapeRecord>,
}

impl NativeLayout {
    pub(crate) fn new(srid: Srid, dims: Dimensions) -> Self {
        Self {
            srid,
            dims,
            points: vec![],
            figures: vec![],
            shapes: vec![],
        }
    }

    pub(crate) fn properties(&self) -> SerializationProperties {
        SerializationProperties::from_dimensions(self.dims) | SerializationProperties::IS_VALID
    }

    /// Point index range `[start, end)` covered by a figure.
    pub(crate) fn figure_points(&self, figure_index: usize) -> (usize, usize) {
        let start = self.figures[figure_index].point_offset;
        let end = self
            .figures
            .get(figure_index + 1)
            .map(|f| f.point_offset)
            .unwrap_or(self.points.len());
        (start, end)
    }

    /// Figure index range `[start, end)` owned by a leaf shape. Runs up to
    /// the next shape that owns figures.
    pub(crate) fn shape_figures(&self, shape_index: usize) -> (usize, usize) {
        let Some(start) = self.shapes[shape_index].figure_offset else {
            return (0, 0);
        };
        let end = self.shapes[shape_index + 1..]
            .iter()
            .find_map(|s| s.figure_offset)
            .unwrap_or(self.figures.len());
        (start, end)
    }

    /// Exact byte length of the serialized form, without shortcuts.
    pub(crate) fn serialized_size(&self) -> usize {
        HEADER_SIZE
            + 4
            + self.points.len() * self.properties().point_size()
            + 4
            + self.figures.len() * FIGURE_SIZE
            + 4
            + self.shapes.len() * SHAPE_SIZE
    }
}

pub(crate) fn to_offset(value: usize, what: &str) -> GeoResult<i32> {
    i32::try_from(value).map_err(|_| {
        GeoError::InvalidArgument(format!("{} {} does not fit the native format", what, value))
    })
}
