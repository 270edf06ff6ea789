use crate::codec::layout::{
    Figure, FigureAttribute, NativeLayout, ShapeRecord, FIGURE_SIZE, HEADER_SIZE, SHAPE_SIZE,
    VERSION,
};
use crate::codec::properties::SerializationProperties;
use crate::codec::registry::{lookup, OpenGisType};
use crate::error::{GeoError, GeoResult};
use crate::geometry::{
    Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon,
    Point, Polygon, Shape,
};
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;
use tracing::trace;

fn malformed(msg: impl Into<String>) -> GeoError {
    GeoError::MalformedBuffer(msg.into())
}

/// Parses a native binary geometry.
///
/// Either the whole tree is rebuilt or an error is returned, nothing partial
/// escapes.
pub fn decode(bytes: &[u8]) -> GeoResult<Geometry> {
    if bytes.len() < HEADER_SIZE {
        return Err(malformed(format!(
            "expected at least {} header bytes, got {}",
            HEADER_SIZE,
            bytes.len()
        )));
    }
    let mut rdr = Cursor::new(bytes);
    let srid = rdr.read_i32::<LittleEndian>()?;
    let version = rdr.read_u8()?;
    if version != VERSION {
        return Err(malformed(format!(
            "unsupported serialization version {}",
            version
        )));
    }
    if srid < 0 {
        return Err(malformed(format!("negative SRID {}", srid)));
    }
    let props = SerializationProperties::from_bits_retain(rdr.read_u8()?);

    let geometry = if props.contains(SerializationProperties::IS_SINGLE_POINT) {
        let coords = read_points(&mut rdr, props, 1)?;
        Geometry::new(Point(coords.into_iter().next()), srid)
    } else if props.contains(SerializationProperties::IS_SINGLE_LINE_SEGMENT) {
        let coords = read_points(&mut rdr, props, 2)?;
        Geometry::new(LineString::new(coords), srid)
    } else {
        let layout = read_layout(&mut rdr, srid, props)?;
        let shape = build_tree(&layout)?;
        Geometry::new(shape, srid)
    };

    let trailing = remaining(&rdr);
    if trailing != 0 {
        return Err(malformed(format!("{} trailing bytes", trailing)));
    }
    trace!(
        kind = %geometry.kind(),
        bytes = bytes.len(),
        "decoded geometry"
    );
    Ok(geometry)
}

fn remaining(rdr: &Cursor<&[u8]>) -> usize {
    rdr.get_ref().len().saturating_sub(rdr.position() as usize)
}

/// Reads a count field and checks that `count` records of `record_size`
/// bytes fit in what is left of the buffer.
fn read_count(rdr: &mut Cursor<&[u8]>, record_size: usize, what: &str) -> GeoResult<usize> {
    if remaining(rdr) < 4 {
        return Err(malformed(format!("missing {} count", what)));
    }
    let count = rdr.read_i32::<LittleEndian>()?;
    let count = usize::try_from(count)
        .map_err(|_| malformed(format!("negative {} count {}", what, count)))?;
    let needed = count
        .checked_mul(record_size)
        .ok_or_else(|| malformed(format!("{} count {} overflows", what, count)))?;
    if needed > remaining(rdr) {
        return Err(malformed(format!(
            "{} count {} needs {} bytes, only {} remain",
            what,
            count,
            needed,
            remaining(rdr)
        )));
    }
    Ok(count)
}

fn read_points(
    rdr: &mut Cursor<&[u8]>,
    props: SerializationProperties,
    count: usize,
) -> GeoResult<Vec<Coord>> {
    if count * props.point_size() > remaining(rdr) {
        return Err(malformed(format!(
            "{} points do not fit in {} remaining bytes",
            count,
            remaining(rdr)
        )));
    }
    let dims = props.dimensions();
    let mut coords = Vec::with_capacity(count);
    for _ in 0..count {
        let x = rdr.read_f64::<LittleEndian>()?;
        let y = rdr.read_f64::<LittleEndian>()?;
        coords.push(Coord::xy(x, y));
    }
    if dims.has_z {
        for coord in coords.iter_mut() {
            let z = rdr.read_f64::<LittleEndian>()?;
            coord.z = (!z.is_nan()).then_some(z);
        }
    }
    if dims.has_m {
        for coord in coords.iter_mut() {
            let m = rdr.read_f64::<LittleEndian>()?;
            coord.m = (!m.is_nan()).then_some(m);
        }
    }
    Ok(coords)
}

fn read_offset(rdr: &mut Cursor<&[u8]>) -> GeoResult<Option<usize>> {
    let value = rdr.read_i32::<LittleEndian>()?;
    match value {
        -1 => Ok(None),
        v if v < 0 => Err(malformed(format!("invalid offset {}", v))),
        v => Ok(Some(v as usize)),
    }
}

fn read_layout(
    rdr: &mut Cursor<&[u8]>,
    srid: i32,
    props: SerializationProperties,
) -> GeoResult<NativeLayout> {
    let mut layout = NativeLayout::new(srid, props.dimensions());

    let num_points = read_count(rdr, props.point_size(), "point")?;
    layout.points = read_points(rdr, props, num_points)?;

    let num_figures = read_count(rdr, FIGURE_SIZE, "figure")?;
    layout.figures.reserve(num_figures);
    let mut last_point_offset = 0;
    for i in 0..num_figures {
        let attribute = FigureAttribute::try_from(rdr.read_u8()?)?;
        let point_offset = read_offset(rdr)?
            .ok_or_else(|| malformed(format!("figure {} has no point offset", i)))?;
        if point_offset < last_point_offset || point_offset > num_points {
            return Err(malformed(format!(
                "figure {} point offset {} out of order or past {} points",
                i, point_offset, num_points
            )));
        }
        last_point_offset = point_offset;
        layout.figures.push(Figure {
            attribute,
            point_offset,
        });
    }

    let num_shapes = read_count(rdr, SHAPE_SIZE, "shape")?;
    if num_shapes == 0 {
        return Err(malformed("no shapes"));
    }
    layout.shapes.reserve(num_shapes);
    let mut last_figure_offset = 0;
    for i in 0..num_shapes {
        let parent = read_offset(rdr)?;
        let figure_offset = read_offset(rdr)?;
        let open_gis_type = lookup(rdr.read_u8()?)?.open_gis_type;

        match parent {
            None if i != 0 => {
                return Err(malformed(format!("shape {} is a second root", i)));
            }
            Some(_) if i == 0 => {
                return Err(malformed("first shape must be the root"));
            }
            Some(p) if p >= i => {
                return Err(malformed(format!(
                    "shape {} has parent {}, parents must precede children",
                    i, p
                )));
            }
            _ => {}
        }
        if let Some(offset) = figure_offset {
            if offset < last_figure_offset || offset >= num_figures {
                return Err(malformed(format!(
                    "shape {} figure offset {} out of order or past {} figures",
                    i, offset, num_figures
                )));
            }
            last_figure_offset = offset;
        }
        layout.shapes.push(ShapeRecord {
            parent,
            figure_offset,
            open_gis_type,
        });
    }
    Ok(layout)
}

fn ring(layout: &NativeLayout, figure_index: usize) -> LineString {
    let (start, end) = layout.figure_points(figure_index);
    LineString::new(layout.points[start..end].to_vec())
}

fn expect_attribute(
    layout: &NativeLayout,
    figure_index: usize,
    expected: FigureAttribute,
    shape_index: usize,
) -> GeoResult<()> {
    let attribute = layout.figures[figure_index].attribute;
    if attribute != expected {
        return Err(malformed(format!(
            "shape {} figure {} is {:?}, expected {:?}",
            shape_index, figure_index, attribute, expected
        )));
    }
    Ok(())
}

fn build_leaf(layout: &NativeLayout, index: usize) -> GeoResult<Shape> {
    let record = &layout.shapes[index];
    let (first, last) = layout.shape_figures(index);
    let figure_count = last - first;
    match record.open_gis_type {
        OpenGisType::Point => match figure_count {
            0 => Ok(Shape::Point(Point::empty())),
            1 => {
                expect_attribute(layout, first, FigureAttribute::Stroke, index)?;
                let (start, end) = layout.figure_points(first);
                if end - start != 1 {
                    return Err(malformed(format!(
                        "point shape {} has {} points",
                        index,
                        end - start
                    )));
                }
                Ok(Shape::Point(Point::new(layout.points[start])))
            }
            n => Err(malformed(format!("point shape {} has {} figures", index, n))),
        },
        OpenGisType::LineString => match figure_count {
            0 => Ok(Shape::LineString(LineString::default())),
            1 => {
                expect_attribute(layout, first, FigureAttribute::Stroke, index)?;
                Ok(Shape::LineString(ring(layout, first)))
            }
            n => Err(malformed(format!(
                "linestring shape {} has {} figures",
                index, n
            ))),
        },
        OpenGisType::Polygon => {
            let mut rings = Vec::with_capacity(figure_count);
            for figure in first..last {
                let expected = if figure == first {
                    FigureAttribute::ExteriorRing
                } else {
                    FigureAttribute::InteriorRing
                };
                expect_attribute(layout, figure, expected, index)?;
                let ring = ring(layout, figure);
                if !ring.is_closed() {
                    return Err(malformed(format!(
                        "polygon shape {} ring {} is not closed",
                        index,
                        figure - first
                    )));
                }
                rings.push(ring);
            }
            Ok(Shape::Polygon(Polygon::from_rings(rings)))
        }
        other => Err(malformed(format!("{} is not a leaf type", other))),
    }
}

fn build_collection(
    open_gis_type: OpenGisType,
    members: Vec<Shape>,
    index: usize,
) -> GeoResult<Shape> {
    let mismatch = || malformed(format!("shape {} has a member of the wrong type", index));
    let shape = match open_gis_type {
        OpenGisType::MultiPoint => Shape::MultiPoint(MultiPoint(
            members
                .into_iter()
                .map(|m| match m {
                    Shape::Point(p) => Ok(p),
                    _ => Err(mismatch()),
                })
                .collect::<GeoResult<_>>()?,
        )),
        OpenGisType::MultiLineString => Shape::MultiLineString(MultiLineString(
            members
                .into_iter()
                .map(|m| match m {
                    Shape::LineString(ls) => Ok(ls),
                    _ => Err(mismatch()),
                })
                .collect::<GeoResult<_>>()?,
        )),
        OpenGisType::MultiPolygon => Shape::MultiPolygon(MultiPolygon(
            members
                .into_iter()
                .map(|m| match m {
                    Shape::Polygon(poly) => Ok(poly),
                    _ => Err(mismatch()),
                })
                .collect::<GeoResult<_>>()?,
        )),
        OpenGisType::GeometryCollection => {
            Shape::GeometryCollection(GeometryCollection(members))
        }
        other => return Err(malformed(format!("{} is not a collection type", other))),
    };
    Ok(shape)
}

/// Rebuilds the nested tree from the flat shape arena. Shapes are visited
/// from last to first: children always have higher indices than their
/// parent, so a parent's members are complete when it is reached.
fn build_tree(layout: &NativeLayout) -> GeoResult<Shape> {
    let num_shapes = layout.shapes.len();
    let mut children: Vec<Vec<usize>> = vec![vec![]; num_shapes];
    for (index, record) in layout.shapes.iter().enumerate() {
        if let Some(parent) = record.parent {
            let parent_rule = layout.shapes[parent].open_gis_type.rule();
            if !parent_rule.accepts_member(record.open_gis_type) {
                return Err(malformed(format!(
                    "{} shape {} cannot be a member of {}",
                    record.open_gis_type, index, parent_rule.open_gis_type
                )));
            }
            children[parent].push(index);
        }
    }

    let mut built: Vec<Option<Shape>> = vec![None; num_shapes];
    for index in (0..num_shapes).rev() {
        let record = &layout.shapes[index];
        let shape = if record.open_gis_type.rule().is_leaf() {
            build_leaf(layout, index)?
        } else {
            let members = children[index]
                .iter()
                .map(|&child| {
                    built[child]
                        .take()
                        .ok_or_else(|| malformed(format!("shape {} referenced twice", child)))
                })
                .collect::<GeoResult<Vec<_>>>()?;
            build_collection(record.open_gis_type, members, index)?
        };
        built[index] = Some(shape);
    }
    built[0].take().ok_or_else(|| malformed("missing root shape"))
}

#[cfg(test)]
mod tests {
    use crate::codec::{decode, encode};
    use crate::error::GeoError;
    use crate::geometry::{
        Coord, Geometry, GeometryCollection, GeometryKind, LineString, MultiLineString,
        MultiPoint, MultiPolygon, Point, Polygon, Shape,
    };

    fn ring(coords: &[(f64, f64)]) -> LineString {
        coords.iter().copied().collect()
    }

    fn square(x: f64, y: f64, size: f64) -> LineString {
        ring(&[
            (x, y),
            (x, y + size),
            (x + size, y + size),
            (x + size, y),
            (x, y),
        ])
    }

    fn assert_round_trip(geom: Geometry) {
        let buf = encode(&geom).unwrap();
        let decoded = decode(&buf).unwrap();
        assert_eq!(decoded, geom);
        assert_eq!(decoded.dimensions(), geom.dimensions());
        // a second pass must produce the very same bytes
        assert_eq!(encode(&decoded).unwrap(), buf);
    }

    #[test]
    fn round_trip_all_kinds() {
        let polygon = Polygon::new(square(0., 0., 10.), vec![square(2., 2., 2.)]);
        let shapes: Vec<Shape> = vec![
            Point::new(Coord::xy(1., 2.)).into(),
            LineString::new(vec![Coord::xy(0., 0.), Coord::xy(1., 1.)]).into(),
            LineString::new(vec![
                Coord::xy(0., 0.),
                Coord::xy(1., 1.),
                Coord::xy(2., 0.),
            ])
            .into(),
            polygon.clone().into(),
            MultiPoint(vec![
                Point::new(Coord::xy(0., 0.)),
                Point::new(Coord::xy(3., 4.)),
            ])
            .into(),
            MultiLineString(vec![
                ring(&[(0., 0.), (1., 1.), (2., 2.)]),
                ring(&[(5., 5.), (6., 6.)]),
            ])
            .into(),
            MultiPolygon(vec![polygon.clone(), Polygon::new(square(20., 20., 1.), vec![])])
                .into(),
            GeometryCollection(vec![
                Point::new(Coord::xy(9., 9.)).into(),
                polygon.clone().into(),
                GeometryCollection(vec![
                    ring(&[(1., 1.), (2., 2.)]).into(),
                    MultiPoint(vec![Point::new(Coord::xy(7., 7.))]).into(),
                ])
                .into(),
            ])
            .into(),
        ];
        for shape in shapes {
            assert_round_trip(Geometry::new(shape, 4326));
        }
    }

    #[test]
    fn round_trip_z_and_m() {
        assert_round_trip(Geometry::new(Point::new(Coord::xyzm(1., 2., 3., 4.)), 0));
        assert_round_trip(Geometry::new(
            LineString::new(vec![
                Coord::xyz(0., 0., 1.),
                Coord::xyz(1., 1., 2.),
                Coord::xyz(2., 2., 3.),
            ]),
            3857,
        ));
        assert_round_trip(Geometry::new(
            MultiPoint(vec![
                Point::new(Coord::xym(0., 0., 10.)),
                Point::new(Coord::xym(1., 1., 20.)),
            ]),
            0,
        ));
        // partially missing z survives as absent
        assert_round_trip(Geometry::new(
            LineString::new(vec![
                Coord::xyz(0., 0., 1.),
                Coord::xy(1., 1.),
                Coord::xyz(2., 2., 3.),
            ]),
            0,
        ));
    }

    #[test]
    fn round_trip_empty_geometries() {
        let empties: Vec<Shape> = vec![
            Point::empty().into(),
            LineString::default().into(),
            Polygon::empty().into(),
            MultiPoint::default().into(),
            MultiLineString::default().into(),
            MultiPolygon::default().into(),
            GeometryCollection::default().into(),
        ];
        for shape in empties {
            let kind = shape.kind();
            let geom = Geometry::new(shape, 4326);
            let decoded = decode(&encode(&geom).unwrap()).unwrap();
            assert_eq!(decoded.kind(), kind);
            assert_eq!(decoded.srid(), 4326);
            assert!(decoded.is_empty());
            assert_eq!(decoded, geom);
        }
    }

    #[test]
    fn round_trip_empty_members() {
        assert_round_trip(Geometry::new(
            GeometryCollection(vec![
                Point::empty().into(),
                ring(&[(0., 0.), (1., 1.), (2., 1.)]).into(),
                Polygon::empty().into(),
            ]),
            0,
        ));
        assert_round_trip(Geometry::new(
            MultiPoint(vec![Point::empty(), Point::new(Coord::xy(1., 1.))]),
            0,
        ));
    }

    #[test]
    fn concrete_polygon_scenario() {
        let polygon = Polygon::new(
            ring(&[(0., 0.), (0., 10.), (10., 10.), (10., 0.), (0., 0.)]),
            vec![ring(&[(2., 2.), (2., 4.), (4., 4.), (4., 2.), (2., 2.)])],
        );
        let geom = Geometry::new(polygon, 4326);
        let buf = encode(&geom).unwrap();
        assert_eq!(buf[5] & 0x03, 0);
        let decoded = decode(&buf).unwrap();
        assert_eq!(decoded.kind(), GeometryKind::Polygon);
        assert_eq!(decoded, geom);
    }

    #[test]
    fn decode_sql_server_point() {
        // POINT (3 4) with SRID 4326, as returned by the engine
        let mut buf = vec![0xE6, 0x10, 0x00, 0x00, 0x01, 0x0C];
        buf.extend_from_slice(&3f64.to_le_bytes());
        buf.extend_from_slice(&4f64.to_le_bytes());
        assert_eq!(
            decode(&buf).unwrap(),
            Geometry::new(Point::new(Coord::xy(3., 4.)), 4326)
        );
    }

    fn multilinestring_bytes() -> Vec<u8> {
        encode(&Geometry::new(
            MultiLineString(vec![
                ring(&[(0., 0.), (1., 1.), (2., 2.)]),
                ring(&[(5., 5.), (6., 6.), (7., 7.)]),
            ]),
            0,
        ))
        .unwrap()
    }

    fn is_malformed<T: std::fmt::Debug>(result: Result<T, GeoError>) -> bool {
        matches!(result, Err(GeoError::MalformedBuffer(_)))
    }

    #[test]
    fn truncated_buffers() {
        let buf = multilinestring_bytes();
        assert!(is_malformed(decode(&buf[..3])));
        assert!(is_malformed(decode(&[])));
        for len in [6, 9, 20, buf.len() - 1] {
            assert!(is_malformed(decode(&buf[..len])), "length {}", len);
        }
        let mut longer = buf.clone();
        longer.push(0);
        assert!(is_malformed(decode(&longer)));
    }

    #[test]
    fn bad_version() {
        let mut buf = multilinestring_bytes();
        buf[4] = 2;
        assert!(is_malformed(decode(&buf)));
    }

    #[test]
    fn shape_count_exceeds_buffer() {
        let mut buf = multilinestring_bytes();
        let shapes_at = buf.len() - 4 - 3 * 9;
        buf[shapes_at..shapes_at + 4].copy_from_slice(&1000i32.to_le_bytes());
        assert!(is_malformed(decode(&buf)));
    }

    #[test]
    fn parent_must_precede_child() {
        let mut buf = multilinestring_bytes();
        let shapes_at = buf.len() - 4 - 3 * 9;
        let second_parent = shapes_at + 4 + 9;
        buf[second_parent..second_parent + 4].copy_from_slice(&1i32.to_le_bytes());
        assert!(is_malformed(decode(&buf)));

        let mut buf = multilinestring_bytes();
        buf[second_parent..second_parent + 4].copy_from_slice(&5i32.to_le_bytes());
        assert!(is_malformed(decode(&buf)));
    }

    #[test]
    fn unknown_type_code() {
        let mut buf = multilinestring_bytes();
        let last_type = buf.len() - 1;
        buf[last_type] = 8;
        assert!(matches!(
            decode(&buf),
            Err(GeoError::UnsupportedGeometryKind(_))
        ));
    }

    #[test]
    fn member_of_wrong_type() {
        let mut buf = multilinestring_bytes();
        let last_type = buf.len() - 1;
        buf[last_type] = 1;
        assert!(is_malformed(decode(&buf)));
    }

    #[test]
    fn unknown_figure_attribute() {
        let mut buf = multilinestring_bytes();
        let figures_at = 10 + 6 * 16;
        buf[figures_at + 4] = 3;
        assert!(matches!(
            decode(&buf),
            Err(GeoError::UnsupportedFigureAttribute(_))
        ));
    }

    fn polygon_bytes() -> Vec<u8> {
        encode(&Geometry::new(
            Polygon::new(square(0., 0., 10.), vec![square(2., 2., 2.)]),
            4326,
        ))
        .unwrap()
    }

    #[test]
    fn unclosed_polygon_ring() {
        let mut buf = polygon_bytes();
        // x of the exterior ring's closing point
        let closing_x = 10 + 4 * 16;
        buf[closing_x..closing_x + 8].copy_from_slice(&5f64.to_le_bytes());
        assert!(is_malformed(decode(&buf)));

        let mut buf = polygon_bytes();
        let closing_y = 10 + 9 * 16 + 8;
        buf[closing_y..closing_y + 8].copy_from_slice(&3f64.to_le_bytes());
        assert!(is_malformed(decode(&buf)));
    }

    #[test]
    fn polygon_ring_attributes() {
        let figures_at = 10 + 10 * 16;
        let exterior = figures_at + 4;
        let interior = exterior + 5;

        let mut buf = polygon_bytes();
        buf[exterior] = 1;
        assert!(is_malformed(decode(&buf)));

        let mut buf = polygon_bytes();
        buf[exterior] = 0;
        assert!(is_malformed(decode(&buf)));

        let mut buf = polygon_bytes();
        buf[interior] = 2;
        assert!(is_malformed(decode(&buf)));

        let mut buf = polygon_bytes();
        buf[interior] = 1;
        assert!(is_malformed(decode(&buf)));

        assert!(decode(&polygon_bytes()).is_ok());
    }

    #[test]
    fn stroke_figures_must_be_strokes() {
        let figures_at = 10 + 6 * 16;
        for attribute in [0, 2] {
            let mut buf = multilinestring_bytes();
            buf[figures_at + 4] = attribute;
            assert!(is_malformed(decode(&buf)), "attribute {}", attribute);
        }

        let points = encode(&Geometry::new(
            MultiPoint(vec![
                Point::new(Coord::xy(1., 1.)),
                Point::new(Coord::xy(2., 2.)),
            ]),
            0,
        ))
        .unwrap();
        let figures_at = 10 + 2 * 16;
        for attribute in [0, 2] {
            let mut buf = points.clone();
            buf[figures_at + 4 + 5] = attribute;
            assert!(is_malformed(decode(&buf)), "attribute {}", attribute);
        }
    }
}
