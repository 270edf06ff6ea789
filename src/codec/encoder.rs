use crate::codec::layout::{
    to_offset, Figure, FigureAttribute, NativeLayout, ShapeRecord, HEADER_SIZE, VERSION,
};
use crate::codec::properties::SerializationProperties;
use crate::codec::registry::{rule_for_kind, OpenGisType};
use crate::error::{GeoError, GeoResult};
use crate::geometry::{Coord, Geometry, LineString, Point, Polygon, Shape};
use byteorder::{LittleEndian, WriteBytesExt};
use tracing::trace;

/// Serializes a geometry into the native binary format.
///
/// A lone point or two point line string uses the inline shortcut header,
/// everything else is flattened into the points/figures/shapes arrays.
pub fn encode(geometry: &Geometry) -> GeoResult<Vec<u8>> {
    if geometry.srid() < 0 {
        return Err(GeoError::InvalidArgument(format!(
            "SRID must not be negative, got {}",
            geometry.srid()
        )));
    }
    let dims = geometry.dimensions();

    match geometry.shape() {
        Shape::Point(Point(Some(coord))) => {
            let props = SerializationProperties::from_dimensions(dims)
                | SerializationProperties::IS_VALID
                | SerializationProperties::IS_SINGLE_POINT;
            return write_inline(geometry, props, &[*coord]);
        }
        Shape::LineString(ls) if ls.0.len() == 2 => {
            let props = SerializationProperties::from_dimensions(dims)
                | SerializationProperties::IS_VALID
                | SerializationProperties::IS_SINGLE_LINE_SEGMENT;
            return write_inline(geometry, props, &ls.0);
        }
        _ => {}
    }

    let mut flattener = Flattener {
        layout: NativeLayout::new(geometry.srid(), dims),
    };
    flattener.visit(geometry.shape(), None)?;
    write_layout(&flattener.layout)
}

fn write_inline(
    geometry: &Geometry,
    props: SerializationProperties,
    coords: &[Coord],
) -> GeoResult<Vec<u8>> {
    let mut buf = Vec::with_capacity(HEADER_SIZE + coords.len() * props.point_size());
    write_header(&mut buf, geometry.srid(), props)?;
    write_points(&mut buf, props, coords)?;
    trace!(
        kind = %geometry.kind(),
        bytes = buf.len(),
        "encoded geometry with inline shortcut"
    );
    Ok(buf)
}

fn write_header(buf: &mut Vec<u8>, srid: i32, props: SerializationProperties) -> GeoResult<()> {
    buf.write_i32::<LittleEndian>(srid)?;
    buf.write_u8(VERSION)?;
    buf.write_u8(props.bits())?;
    Ok(())
}

/// X/Y pairs for all points, then all Z values, then all M values. A
/// missing ordinate in a geometry that has that dimension is written as NaN.
fn write_points(
    buf: &mut Vec<u8>,
    props: SerializationProperties,
    coords: &[Coord],
) -> GeoResult<()> {
    let dims = props.dimensions();
    for coord in coords {
        buf.write_f64::<LittleEndian>(coord.x)?;
        buf.write_f64::<LittleEndian>(coord.y)?;
    }
    if dims.has_z {
        for coord in coords {
            buf.write_f64::<LittleEndian>(coord.z.unwrap_or(f64::NAN))?;
        }
    }
    if dims.has_m {
        for coord in coords {
            buf.write_f64::<LittleEndian>(coord.m.unwrap_or(f64::NAN))?;
        }
    }
    Ok(())
}

fn write_layout(layout: &NativeLayout) -> GeoResult<Vec<u8>> {
    let props = layout.properties();
    let mut buf = Vec::with_capacity(layout.serialized_size());
    write_header(&mut buf, layout.srid, props)?;

    buf.write_i32::<LittleEndian>(to_offset(layout.points.len(), "point count")?)?;
    write_points(&mut buf, props, &layout.points)?;

    buf.write_i32::<LittleEndian>(to_offset(layout.figures.len(), "figure count")?)?;
    for figure in &layout.figures {
        buf.write_u8(figure.attribute as u8)?;
        buf.write_i32::<LittleEndian>(to_offset(figure.point_offset, "point offset")?)?;
    }

    buf.write_i32::<LittleEndian>(to_offset(layout.shapes.len(), "shape count")?)?;
    for shape in &layout.shapes {
        let parent = match shape.parent {
            Some(parent) => to_offset(parent, "parent offset")?,
            None => -1,
        };
        let figure_offset = match shape.figure_offset {
            Some(offset) => to_offset(offset, "figure offset")?,
            None => -1,
        };
        buf.write_i32::<LittleEndian>(parent)?;
        buf.write_i32::<LittleEndian>(figure_offset)?;
        buf.write_u8(shape.open_gis_type.code())?;
    }

    trace!(
        points = layout.points.len(),
        figures = layout.figures.len(),
        shapes = layout.shapes.len(),
        bytes = buf.len(),
        "encoded geometry"
    );
    Ok(buf)
}

/// Depth-first walk assigning shape indices in pre-order, so every parent
/// is recorded before its children.
struct Flattener {
    layout: NativeLayout,
}

impl Flattener {
    fn push_shape(&mut self, open_gis_type: OpenGisType, parent: Option<usize>) -> usize {
        let index = self.layout.shapes.len();
        self.layout.shapes.push(ShapeRecord {
            parent,
            figure_offset: None,
            open_gis_type,
        });
        index
    }

    /// Marks the shape as owning figures from `first_figure` on, unless it
    /// ended up with none.
    fn close_shape(&mut self, index: usize, first_figure: usize) {
        if self.layout.figures.len() > first_figure {
            self.layout.shapes[index].figure_offset = Some(first_figure);
        }
    }

    fn push_figure(&mut self, attribute: FigureAttribute, coords: &[Coord]) {
        self.layout.figures.push(Figure {
            attribute,
            point_offset: self.layout.points.len(),
        });
        self.layout.points.extend_from_slice(coords);
    }

    fn visit(&mut self, shape: &Shape, parent: Option<usize>) -> GeoResult<()> {
        match shape {
            Shape::Point(point) => self.visit_point(point, parent),
            Shape::LineString(ls) => self.visit_linestring(ls, parent),
            Shape::Polygon(poly) => self.visit_polygon(poly, parent),
            Shape::MultiPoint(mp) => {
                let (index, first_figure) = self.begin_collection(shape, parent)?;
                for point in &mp.0 {
                    self.visit_point(point, Some(index))?;
                }
                self.close_shape(index, first_figure);
                Ok(())
            }
            Shape::MultiLineString(mls) => {
                let (index, first_figure) = self.begin_collection(shape, parent)?;
                for ls in &mls.0 {
                    self.visit_linestring(ls, Some(index))?;
                }
                self.close_shape(index, first_figure);
                Ok(())
            }
            Shape::MultiPolygon(mpoly) => {
                let (index, first_figure) = self.begin_collection(shape, parent)?;
                for poly in &mpoly.0 {
                    self.visit_polygon(poly, Some(index))?;
                }
                self.close_shape(index, first_figure);
                Ok(())
            }
            Shape::GeometryCollection(gc) => {
                let (index, first_figure) = self.begin_collection(shape, parent)?;
                for child in &gc.0 {
                    self.visit(child, Some(index))?;
                }
                self.close_shape(index, first_figure);
                Ok(())
            }
            Shape::CircularString(_) => Err(GeoError::UnsupportedFigureAttribute(
                "circular arc segments need serialization version 2".to_string(),
            )),
        }
    }

    fn begin_collection(
        &mut self,
        shape: &Shape,
        parent: Option<usize>,
    ) -> GeoResult<(usize, usize)> {
        let rule = rule_for_kind(shape.kind())?;
        let index = self.push_shape(rule.open_gis_type, parent);
        Ok((index, self.layout.figures.len()))
    }

    fn visit_point(&mut self, point: &Point, parent: Option<usize>) -> GeoResult<()> {
        let index = self.push_shape(OpenGisType::Point, parent);
        let first_figure = self.layout.figures.len();
        if let Some(coord) = &point.0 {
            self.push_figure(FigureAttribute::Stroke, std::slice::from_ref(coord));
        }
        self.close_shape(index, first_figure);
        Ok(())
    }

    fn visit_linestring(&mut self, ls: &LineString, parent: Option<usize>) -> GeoResult<()> {
        let index = self.push_shape(OpenGisType::LineString, parent);
        let first_figure = self.layout.figures.len();
        if !ls.0.is_empty() {
            self.push_figure(FigureAttribute::Stroke, &ls.0);
        }
        self.close_shape(index, first_figure);
        Ok(())
    }

    fn visit_polygon(&mut self, poly: &Polygon, parent: Option<usize>) -> GeoResult<()> {
        let index = self.push_shape(OpenGisType::Polygon, parent);
        let first_figure = self.layout.figures.len();
        for (i, ring) in poly.rings().iter().enumerate() {
            if !ring.is_closed() {
                return Err(GeoError::InvalidArgument(format!(
                    "polygon ring {} is not closed",
                    i
                )));
            }
            let attribute = if i == 0 {
                FigureAttribute::ExteriorRing
            } else {
                FigureAttribute::InteriorRing
            };
            self.push_figure(attribute, &ring.0);
        }
        self.close_shape(index, first_figure);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::codec::encode;
    use crate::error::GeoError;
    use crate::geometry::{
        Coord, Geometry, GeometryCollection, LineString, MultiPoint, Point, Polygon, Shape,
    };

    fn ring(coords: &[(f64, f64)]) -> LineString {
        coords.iter().copied().collect()
    }

    fn read_i32(buf: &[u8], at: usize) -> i32 {
        i32::from_le_bytes(buf[at..at + 4].try_into().unwrap())
    }

    fn read_f64(buf: &[u8], at: usize) -> f64 {
        f64::from_le_bytes(buf[at..at + 8].try_into().unwrap())
    }

    #[test]
    fn polygon_with_hole_layout() {
        let poly = Polygon::new(
            ring(&[(0., 0.), (0., 10.), (10., 10.), (10., 0.), (0., 0.)]),
            vec![ring(&[(2., 2.), (2., 4.), (4., 4.), (4., 2.), (2., 2.)])],
        );
        let buf = encode(&Geometry::new(poly, 4326)).unwrap();

        assert_eq!(read_i32(&buf, 0), 4326);
        assert_eq!(buf[4], 1);
        // IsValid only, no Z/M
        assert_eq!(buf[5], 0x04);
        assert_eq!(read_i32(&buf, 6), 10);
        assert_eq!(read_f64(&buf, 10), 0.);
        assert_eq!(read_f64(&buf, 10 + 16 + 8), 10.);

        let figures_at = 10 + 10 * 16;
        assert_eq!(read_i32(&buf, figures_at), 2);
        assert_eq!(buf[figures_at + 4], 2);
        assert_eq!(read_i32(&buf, figures_at + 5), 0);
        assert_eq!(buf[figures_at + 9], 0);
        assert_eq!(read_i32(&buf, figures_at + 10), 5);

        let shapes_at = figures_at + 4 + 2 * 5;
        assert_eq!(read_i32(&buf, shapes_at), 1);
        assert_eq!(read_i32(&buf, shapes_at + 4), -1);
        assert_eq!(read_i32(&buf, shapes_at + 8), 0);
        assert_eq!(buf[shapes_at + 12], 3);
        assert_eq!(buf.len(), shapes_at + 4 + 9);
    }

    #[test]
    fn single_point_shortcut() {
        let buf = encode(&Geometry::new(Point::new(Coord::xy(1.5, -2.)), 4326)).unwrap();
        assert_eq!(buf.len(), 6 + 16);
        assert_eq!(buf[5], 0x0C);
        assert_eq!(read_f64(&buf, 6), 1.5);
        assert_eq!(read_f64(&buf, 14), -2.);
    }

    #[test]
    fn single_segment_shortcut_with_z() {
        let ls = LineString::new(vec![Coord::xyz(0., 1., 5.), Coord::xyz(2., 3., 6.)]);
        let buf = encode(&Geometry::new(ls, 0)).unwrap();
        assert_eq!(buf[5], 0x15);
        assert_eq!(buf.len(), 6 + 2 * 16 + 2 * 8);
        // x/y block first, then the z block
        assert_eq!(read_f64(&buf, 6 + 16), 2.);
        assert_eq!(read_f64(&buf, 6 + 32), 5.);
        assert_eq!(read_f64(&buf, 6 + 40), 6.);
    }

    #[test]
    fn missing_z_written_as_nan() {
        let ls = LineString::new(vec![
            Coord::xyz(0., 0., 1.),
            Coord::xy(1., 1.),
            Coord::xyz(2., 2., 3.),
        ]);
        let buf = encode(&Geometry::new(ls, 0)).unwrap();
        assert_eq!(buf[5], 0x05);
        let z_at = 10 + 3 * 16;
        assert_eq!(read_f64(&buf, z_at), 1.);
        assert!(read_f64(&buf, z_at + 8).is_nan());
    }

    #[test]
    fn empty_geometry_keeps_one_shape() {
        let buf = encode(&Geometry::new(Polygon::empty(), 4326)).unwrap();
        assert_eq!(
            buf,
            vec![
                0xE6, 0x10, 0, 0, 1, 0x04, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0xFF, 0xFF, 0xFF,
                0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 3
            ]
        );
    }

    #[test]
    fn collection_parent_links() {
        let gc = GeometryCollection(vec![
            Shape::Point(Point::new(Coord::xy(1., 1.))),
            Shape::MultiPoint(MultiPoint(vec![
                Point::new(Coord::xy(2., 2.)),
                Point::empty(),
            ])),
        ]);
        let buf = encode(&Geometry::new(gc, 0)).unwrap();
        let shapes_at = 10 + 2 * 16 + 4 + 2 * 5;
        assert_eq!(read_i32(&buf, shapes_at), 5);
        let shape = |i: usize| {
            let at = shapes_at + 4 + i * 9;
            (read_i32(&buf, at), read_i32(&buf, at + 4), buf[at + 8])
        };
        assert_eq!(shape(0), (-1, 0, 7));
        assert_eq!(shape(1), (0, 0, 1));
        assert_eq!(shape(2), (0, 1, 4));
        assert_eq!(shape(3), (2, 1, 1));
        assert_eq!(shape(4), (2, -1, 1));
    }

    #[test]
    fn rejects_curves_and_bad_input() {
        let arc = Shape::CircularString(LineString::new(vec![
            Coord::xy(0., 0.),
            Coord::xy(1., 1.),
            Coord::xy(2., 0.),
        ]));
        assert!(matches!(
            encode(&Geometry::new(arc.clone(), 0)),
            Err(GeoError::UnsupportedFigureAttribute(_))
        ));
        assert!(matches!(
            encode(&Geometry::new(GeometryCollection(vec![arc]), 0)),
            Err(GeoError::UnsupportedFigureAttribute(_))
        ));

        let open = Polygon::new(ring(&[(0., 0.), (0., 1.), (1., 1.)]), vec![]);
        assert!(matches!(
            encode(&Geometry::new(open, 0)),
            Err(GeoError::InvalidArgument(_))
        ));
        assert!(matches!(
            encode(&Geometry::new(Point::new(Coord::xy(0., 0.)), -1)),
            Err(GeoError::InvalidArgument(_))
        ));
    }
}
