use crate::error::{GeoError, GeoResult};
use crate::geometry::GeometryKind;
use std::fmt;

/// OpenGIS type codes as stored in the shape records of the native format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpenGisType {
    Point = 1,
    LineString = 2,
    Polygon = 3,
    MultiPoint = 4,
    MultiLineString = 5,
    MultiPolygon = 6,
    GeometryCollection = 7,
}

/// Which child shapes a shape may own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Members {
    /// Leaf: the shape's coordinates come from its own figures.
    None,
    /// Homogeneous collection of the given leaf type.
    Only(OpenGisType),
    /// Heterogeneous collection.
    Any,
}

#[derive(Debug)]
pub struct TypeRule {
    pub open_gis_type: OpenGisType,
    pub kind: GeometryKind,
    pub members: Members,
    /// Whether a lone instance may use the inline single point header.
    pub single_point: bool,
    /// Whether a lone two point instance may use the inline segment header.
    pub single_line_segment: bool,
}

impl TypeRule {
    pub fn is_leaf(&self) -> bool {
        self.members == Members::None
    }

    pub fn accepts_member(&self, child: OpenGisType) -> bool {
        match self.members {
            Members::None => false,
            Members::Only(member) => member == child,
            Members::Any => true,
        }
    }
}

static TYPE_RULES: [TypeRule; 7] = [
    TypeRule {
        open_gis_type: OpenGisType::Point,
        kind: GeometryKind::Point,
        members: Members::None,
        single_point: true,
        single_line_segment: false,
    },
    TypeRule {
        open_gis_type: OpenGisType::LineString,
        kind: GeometryKind::LineString,
        members: Members::None,
        single_point: false,
        single_line_segment: true,
    },
    TypeRule {
        open_gis_type: OpenGisType::Polygon,
        kind: GeometryKind::Polygon,
        members: Members::None,
        single_point: false,
        single_line_segment: false,
    },
    TypeRule {
        open_gis_type: OpenGisType::MultiPoint,
        kind: GeometryKind::MultiPoint,
        members: Members::Only(OpenGisType::Point),
        single_point: false,
        single_line_segment: false,
    },
    TypeRule {
        open_gis_type: OpenGisType::MultiLineString,
        kind: GeometryKind::MultiLineString,
        members: Members::Only(OpenGisType::LineString),
        single_point: false,
        single_line_segment: false,
    },
    TypeRule {
        open_gis_type: OpenGisType::MultiPolygon,
        kind: GeometryKind::MultiPolygon,
        members: Members::Only(OpenGisType::Polygon),
        single_point: false,
        single_line_segment: false,
    },
    TypeRule {
        open_gis_type: OpenGisType::GeometryCollection,
        kind: GeometryKind::GeometryCollection,
        members: Members::Any,
        single_point: false,
        single_line_segment: false,
    },
];

/// Codes the engine defines for later format versions. Recognised only to
/// give a precise error.
const RESERVED_CODES: [(u8, &str); 4] = [
    (8, "CircularString"),
    (9, "CompoundCurve"),
    (10, "CurvePolygon"),
    (11, "FullGlobe"),
];

impl OpenGisType {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn rule(self) -> &'static TypeRule {
        &TYPE_RULES[self as usize - 1]
    }
}

impl fmt::Display for OpenGisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.rule().kind)
    }
}

impl TryFrom<u8> for OpenGisType {
    type Error = GeoError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        lookup(code).map(|rule| rule.open_gis_type)
    }
}

/// Looks up the decoding rule for a type code read from a shape record.
pub fn lookup(code: u8) -> GeoResult<&'static TypeRule> {
    if let Some(rule) = TYPE_RULES
        .iter()
        .find(|rule| rule.open_gis_type.code() == code)
    {
        return Ok(rule);
    }
    match RESERVED_CODES.iter().find(|(reserved, _)| *reserved == code) {
        Some((_, name)) => Err(GeoError::UnsupportedGeometryKind(format!(
            "{} (type code {})",
            name, code
        ))),
        None => Err(GeoError::UnsupportedGeometryKind(format!(
            "unknown type code {}",
            code
        ))),
    }
}

/// Looks up the encoding rule for a geometry kind of the in-memory model.
pub fn rule_for_kind(kind: GeometryKind) -> GeoResult<&'static TypeRule> {
    TYPE_RULES
        .iter()
        .find(|rule| rule.kind == kind)
        .ok_or_else(|| GeoError::UnsupportedGeometryKind(kind.to_string()))
}
