use crate::geometry::{Coord, Geometry, LineString, Polygon, Srid};

/// Axis-aligned bounding rectangle. Empty when `xmin > xmax`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub(crate) xmin: f64,
    pub(crate) ymin: f64,
    pub(crate) xmax: f64,
    pub(crate) ymax: f64,
}

impl Envelope {
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    pub fn empty() -> Self {
        Self {
            xmin: f64::INFINITY,
            ymin: f64::INFINITY,
            xmax: f64::NEG_INFINITY,
            ymax: f64::NEG_INFINITY,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.xmin > self.xmax
    }

    pub fn xmin(&self) -> f64 {
        self.xmin
    }

    pub fn ymin(&self) -> f64 {
        self.ymin
    }

    pub fn xmax(&self) -> f64 {
        self.xmax
    }

    pub fn ymax(&self) -> f64 {
        self.ymax
    }

    /// The rectangle as a closed polygon in the given reference system,
    /// counter-clockwise from the lower-left corner. An empty envelope
    /// becomes the empty polygon.
    pub fn to_geometry(&self, srid: Srid) -> Geometry {
        if self.is_empty() {
            return Geometry::new(Polygon::empty(), srid);
        }
        let ring = LineString::new(vec![
            Coord::xy(self.xmin, self.ymin),
            Coord::xy(self.xmax, self.ymin),
            Coord::xy(self.xmax, self.ymax),
            Coord::xy(self.xmin, self.ymax),
            Coord::xy(self.xmin, self.ymin),
        ]);
        Geometry::new(Polygon::new(ring, vec![]), srid)
    }
}

impl From<geo::Rect> for Envelope {
    fn from(value: geo::Rect) -> Self {
        Self {
            xmin: value.min().x,
            ymin: value.min().y,
            xmax: value.max().x,
            ymax: value.max().y,
        }
    }
}
