use crate::geometry::{
    Coord, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon, Point,
    Polygon, Shape,
};

impl From<&Coord> for geo::Coord {
    fn from(value: &Coord) -> Self {
        geo::Coord {
            x: value.x,
            y: value.y,
        }
    }
}

impl From<geo::Coord> for Coord {
    fn from(value: geo::Coord) -> Self {
        Coord::xy(value.x, value.y)
    }
}

impl From<&LineString> for geo::LineString {
    fn from(value: &LineString) -> Self {
        geo::LineString::new(value.0.iter().map(Into::into).collect())
    }
}

impl From<&Polygon> for geo::Polygon {
    fn from(value: &Polygon) -> Self {
        let exterior = value
            .exterior()
            .map(Into::into)
            .unwrap_or_else(|| geo::LineString::new(vec![]));
        let interiors = value.interiors().iter().map(Into::into).collect();
        geo::Polygon::new(exterior, interiors)
    }
}

/// Drops Z and M. An empty point has no `geo` counterpart and becomes an
/// empty collection.
impl From<&Shape> for geo::Geometry {
    fn from(value: &Shape) -> Self {
        match value {
            Shape::Point(Point(Some(c))) => {
                geo::Geometry::Point(geo::Point::from(geo::Coord::from(c)))
            }
            Shape::Point(Point(None)) => {
                geo::Geometry::GeometryCollection(geo::GeometryCollection::new_from(vec![]))
            }
            Shape::LineString(ls) | Shape::CircularString(ls) => {
                geo::Geometry::LineString(ls.into())
            }
            Shape::Polygon(poly) => geo::Geometry::Polygon(poly.into()),
            Shape::MultiPoint(mp) => geo::Geometry::MultiPoint(geo::MultiPoint::new(
                mp.0.iter()
                    .filter_map(|p| p.0.as_ref())
                    .map(|c| geo::Point::from(geo::Coord::from(c)))
                    .collect(),
            )),
            Shape::MultiLineString(mls) => geo::Geometry::MultiLineString(
                geo::MultiLineString::new(mls.0.iter().map(Into::into).collect()),
            ),
            Shape::MultiPolygon(mpoly) => geo::Geometry::MultiPolygon(geo::MultiPolygon::new(
                mpoly.0.iter().map(Into::into).collect(),
            )),
            Shape::GeometryCollection(gc) => geo::Geometry::GeometryCollection(
                geo::GeometryCollection::new_from(gc.0.iter().map(Into::into).collect()),
            ),
        }
    }
}

impl From<geo::LineString> for LineString {
    fn from(value: geo::LineString) -> Self {
        LineString(value.0.into_iter().map(Into::into).collect())
    }
}

impl From<geo::Polygon> for Polygon {
    fn from(value: geo::Polygon) -> Self {
        let (exterior, interiors) = value.into_inner();
        if exterior.0.is_empty() && interiors.is_empty() {
            return Polygon::empty();
        }
        Polygon::new(
            exterior.into(),
            interiors.into_iter().map(Into::into).collect(),
        )
    }
}

impl From<geo::Geometry> for Shape {
    fn from(value: geo::Geometry) -> Self {
        match value {
            geo::Geometry::Point(p) => Shape::Point(Point::new(p.0.into())),
            geo::Geometry::Line(line) => Shape::LineString(LineString::new(vec![
                line.start.into(),
                line.end.into(),
            ])),
            geo::Geometry::LineString(ls) => Shape::LineString(ls.into()),
            geo::Geometry::Polygon(poly) => Shape::Polygon(poly.into()),
            geo::Geometry::MultiPoint(mp) => Shape::MultiPoint(MultiPoint(
                mp.0.into_iter().map(|p| Point::new(p.0.into())).collect(),
            )),
            geo::Geometry::MultiLineString(mls) => Shape::MultiLineString(MultiLineString(
                mls.0.into_iter().map(Into::into).collect(),
            )),
            geo::Geometry::MultiPolygon(mpoly) => Shape::MultiPolygon(MultiPolygon(
                mpoly.0.into_iter().map(Into::into).collect(),
            )),
            geo::Geometry::GeometryCollection(gc) => Shape::GeometryCollection(
                GeometryCollection(gc.0.into_iter().map(Into::into).collect()),
            ),
            geo::Geometry::Rect(rect) => Shape::Polygon(rect.to_polygon().into()),
            geo::Geometry::Triangle(triangle) => Shape::Polygon(triangle.to_polygon().into()),
        }
    }
}
