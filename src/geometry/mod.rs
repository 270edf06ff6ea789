mod convert;
mod envelope;
mod geozero;

pub use self::geozero::GeometryWriter;
pub use envelope::*;

use std::fmt;

/// Spatial reference identifier. 0 means "unspecified".
pub type Srid = i32;

/// A single position. `z` and `m` are optional ordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
    pub m: Option<f64>,
}

impl Coord {
    pub fn xy(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            z: None,
            m: None,
        }
    }

    pub fn xyz(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z: Some(z),
            m: None,
        }
    }

    pub fn xym(x: f64, y: f64, m: f64) -> Self {
        Self {
            x,
            y,
            z: None,
            m: Some(m),
        }
    }

    pub fn xyzm(x: f64, y: f64, z: f64, m: f64) -> Self {
        Self {
            x,
            y,
            z: Some(z),
            m: Some(m),
        }
    }
}

impl From<(f64, f64)> for Coord {
    fn from((x, y): (f64, f64)) -> Self {
        Coord::xy(x, y)
    }
}

/// Presence of the optional ordinates across a whole geometry tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dimensions {
    pub has_z: bool,
    pub has_m: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Point(pub Option<Coord>);

impl Point {
    pub fn new(coord: Coord) -> Self {
        Self(Some(coord))
    }

    pub fn empty() -> Self {
        Self(None)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LineString(pub Vec<Coord>);

impl LineString {
    pub fn new(coords: Vec<Coord>) -> Self {
        Self(coords)
    }

    pub fn coords(&self) -> &[Coord] {
        &self.0
    }

    pub fn is_closed(&self) -> bool {
        match (self.0.first(), self.0.last()) {
            (Some(first), Some(last)) => first.x == last.x && first.y == last.y,
            _ => true,
        }
    }
}

impl<C: Into<Coord>> FromIterator<C> for LineString {
    fn from_iter<T: IntoIterator<Item = C>>(iter: T) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// A polygon as an ordered list of rings: the first ring is the exterior
/// boundary, the rest are holes. No rings means the empty polygon.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Polygon {
    rings: Vec<LineString>,
}

impl Polygon {
    pub fn new(exterior: LineString, interiors: Vec<LineString>) -> Self {
        let mut rings = Vec::with_capacity(interiors.len() + 1);
        rings.push(exterior);
        rings.extend(interiors);
        Self { rings }
    }

    pub fn from_rings(rings: Vec<LineString>) -> Self {
        Self { rings }
    }

    pub fn empty() -> Self {
        Self { rings: vec![] }
    }

    pub fn exterior(&self) -> Option<&LineString> {
        self.rings.first()
    }

    pub fn interiors(&self) -> &[LineString] {
        self.rings.get(1..).unwrap_or(&[])
    }

    pub fn rings(&self) -> &[LineString] {
        &self.rings
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MultiPoint(pub Vec<Point>);

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MultiLineString(pub Vec<LineString>);

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MultiPolygon(pub Vec<Polygon>);

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GeometryCollection(pub Vec<Shape>);

/// A node of a geometry tree. Children carry no SRID of their own, the
/// root [`Geometry`] holds it for the whole tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Point(Point),
    LineString(LineString),
    Polygon(Polygon),
    MultiPoint(MultiPoint),
    MultiLineString(MultiLineString),
    MultiPolygon(MultiPolygon),
    GeometryCollection(GeometryCollection),
    /// Arc segments through every other point. Only modelled so curve input
    /// can be rejected, the native format version handled here has no arcs.
    CircularString(LineString),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    GeometryCollection,
    CircularString,
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GeometryKind::Point => "Point",
            GeometryKind::LineString => "LineString",
            GeometryKind::Polygon => "Polygon",
            GeometryKind::MultiPoint => "MultiPoint",
            GeometryKind::MultiLineString => "MultiLineString",
            GeometryKind::MultiPolygon => "MultiPolygon",
            GeometryKind::GeometryCollection => "GeometryCollection",
            GeometryKind::CircularString => "CircularString",
        };
        f.write_str(name)
    }
}

impl Shape {
    pub fn kind(&self) -> GeometryKind {
        match self {
            Shape::Point(_) => GeometryKind::Point,
            Shape::LineString(_) => GeometryKind::LineString,
            Shape::Polygon(_) => GeometryKind::Polygon,
            Shape::MultiPoint(_) => GeometryKind::MultiPoint,
            Shape::MultiLineString(_) => GeometryKind::MultiLineString,
            Shape::MultiPolygon(_) => GeometryKind::MultiPolygon,
            Shape::GeometryCollection(_) => GeometryKind::GeometryCollection,
            Shape::CircularString(_) => GeometryKind::CircularString,
        }
    }

    /// Visits every coordinate in depth-first order.
    pub fn for_each_coord<F: FnMut(&Coord)>(&self, f: &mut F) {
        match self {
            Shape::Point(p) => {
                if let Some(c) = &p.0 {
                    f(c);
                }
            }
            Shape::LineString(ls) | Shape::CircularString(ls) => {
                for c in &ls.0 {
                    f(c);
                }
            }
            Shape::Polygon(poly) => {
                for c in poly.rings().iter().flat_map(|r| r.0.iter()) {
                    f(c);
                }
            }
            Shape::MultiPoint(mp) => {
                for c in mp.0.iter().filter_map(|p| p.0.as_ref()) {
                    f(c);
                }
            }
            Shape::MultiLineString(mls) => {
                for c in mls.0.iter().flat_map(|ls| ls.0.iter()) {
                    f(c);
                }
            }
            Shape::MultiPolygon(mpoly) => {
                for poly in &mpoly.0 {
                    for c in poly.rings().iter().flat_map(|r| r.0.iter()) {
                        f(c);
                    }
                }
            }
            Shape::GeometryCollection(gc) => {
                for child in &gc.0 {
                    child.for_each_coord(f);
                }
            }
        }
    }

    pub fn num_coords(&self) -> usize {
        let mut n = 0;
        self.for_each_coord(&mut |_| n += 1);
        n
    }

    pub fn is_empty(&self) -> bool {
        self.num_coords() == 0
    }
}

/// Root of a geometry tree together with its spatial reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    srid: Srid,
    shape: Shape,
}

impl Geometry {
    pub fn new(shape: impl Into<Shape>, srid: Srid) -> Self {
        Self {
            srid,
            shape: shape.into(),
        }
    }

    pub fn srid(&self) -> Srid {
        self.srid
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn into_shape(self) -> Shape {
        self.shape
    }

    pub fn kind(&self) -> GeometryKind {
        self.shape.kind()
    }

    pub fn is_empty(&self) -> bool {
        self.shape.is_empty()
    }

    pub fn with_srid(mut self, srid: Srid) -> Self {
        self.srid = srid;
        self
    }

    /// Z/M presence for the whole tree. A dimension is present as soon as
    /// one coordinate carries it.
    pub fn dimensions(&self) -> Dimensions {
        let mut dims = Dimensions::default();
        self.shape.for_each_coord(&mut |c| {
            dims.has_z |= c.z.is_some();
            dims.has_m |= c.m.is_some();
        });
        dims
    }

    /// Bounding rectangle, empty for an empty geometry.
    pub fn envelope(&self) -> Envelope {
        use geo::BoundingRect;

        let geom: geo::Geometry = (&self.shape).into();
        match geom.bounding_rect() {
            Some(rect) => Envelope::from(rect),
            None => Envelope::empty(),
        }
    }
}

macro_rules! impl_into_shape {
    ($($ty:ident),*) => {
        $(
            impl From<$ty> for Shape {
                fn from(value: $ty) -> Self {
                    Shape::$ty(value)
                }
            }
        )*
    };
}

impl_into_shape!(
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    GeometryCollection
);
