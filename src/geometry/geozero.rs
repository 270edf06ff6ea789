use crate::geometry::{
    Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon,
    Point, Polygon, Shape, Srid,
};
use geozero::error::{GeozeroError, Result};
use geozero::wkb::{FromWkb, WkbDialect};
use geozero::{CoordDimensions, GeomProcessor, GeozeroGeometry};
use std::io::Read;

impl GeozeroGeometry for Geometry {
    fn process_geom<P: GeomProcessor>(&self, processor: &mut P) -> Result<()>
    where
        Self: Sized,
    {
        process_shape(self.shape(), 0, processor)
    }

    fn dims(&self) -> CoordDimensions {
        let dims = self.dimensions();
        CoordDimensions {
            z: dims.has_z,
            m: dims.has_m,
            t: false,
            tm: false,
        }
    }

    fn srid(&self) -> Option<i32> {
        Some(self.srid)
    }
}

fn process_coord<P: GeomProcessor>(coord: &Coord, idx: usize, processor: &mut P) -> Result<()> {
    if processor.multi_dim() {
        processor.coordinate(coord.x, coord.y, coord.z, coord.m, None, None, idx)
    } else {
        processor.xy(coord.x, coord.y, idx)
    }
}

fn process_point<P: GeomProcessor>(point: &Point, idx: usize, processor: &mut P) -> Result<()> {
    match &point.0 {
        Some(coord) => {
            processor.point_begin(idx)?;
            process_coord(coord, 0, processor)?;
            processor.point_end(idx)
        }
        None => processor.empty_point(idx),
    }
}

fn process_linestring<P: GeomProcessor>(
    ls: &LineString,
    tagged: bool,
    idx: usize,
    processor: &mut P,
) -> Result<()> {
    processor.linestring_begin(tagged, ls.0.len(), idx)?;
    for (i, coord) in ls.0.iter().enumerate() {
        process_coord(coord, i, processor)?;
    }
    processor.linestring_end(tagged, idx)
}

fn process_polygon<P: GeomProcessor>(
    poly: &Polygon,
    tagged: bool,
    idx: usize,
    processor: &mut P,
) -> Result<()> {
    processor.polygon_begin(tagged, poly.rings().len(), idx)?;
    for (i, ring) in poly.rings().iter().enumerate() {
        process_linestring(ring, false, i, processor)?;
    }
    processor.polygon_end(tagged, idx)
}

fn process_shape<P: GeomProcessor>(shape: &Shape, idx: usize, processor: &mut P) -> Result<()> {
    match shape {
        Shape::Point(point) => process_point(point, idx, processor),
        Shape::LineString(ls) => process_linestring(ls, true, idx, processor),
        Shape::Polygon(poly) => process_polygon(poly, true, idx, processor),
        Shape::MultiPoint(mp) => {
            // members are bare coordinates, empty points have nothing to emit
            let coords: Vec<&Coord> = mp.0.iter().filter_map(|p| p.0.as_ref()).collect();
            processor.multipoint_begin(coords.len(), idx)?;
            for (i, coord) in coords.into_iter().enumerate() {
                process_coord(coord, i, processor)?;
            }
            processor.multipoint_end(idx)
        }
        Shape::MultiLineString(mls) => {
            processor.multilinestring_begin(mls.0.len(), idx)?;
            for (i, ls) in mls.0.iter().enumerate() {
                process_linestring(ls, false, i, processor)?;
            }
            processor.multilinestring_end(idx)
        }
        Shape::MultiPolygon(mpoly) => {
            processor.multipolygon_begin(mpoly.0.len(), idx)?;
            for (i, poly) in mpoly.0.iter().enumerate() {
                process_polygon(poly, false, i, processor)?;
            }
            processor.multipolygon_end(idx)
        }
        Shape::GeometryCollection(gc) => {
            processor.geometrycollection_begin(gc.0.len(), idx)?;
            for (i, child) in gc.0.iter().enumerate() {
                process_shape(child, i, processor)?;
            }
            processor.geometrycollection_end(idx)
        }
        Shape::CircularString(ls) => {
            processor.circularstring_begin(ls.0.len(), idx)?;
            for (i, coord) in ls.0.iter().enumerate() {
                process_coord(coord, i, processor)?;
            }
            processor.circularstring_end(idx)
        }
    }
}

/// Builds a [`Geometry`] from a geozero event stream, keeping Z and M.
#[derive(Debug, Default)]
pub struct GeometryWriter {
    coords: Vec<Coord>,
    in_point: bool,
    points: Option<Vec<Point>>,
    rings: Option<Vec<LineString>>,
    lines: Option<Vec<LineString>>,
    polygons: Option<Vec<Polygon>>,
    collections: Vec<Vec<Shape>>,
    finished: Option<Shape>,
}

impl GeometryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The completed geometry, in reference system `srid`.
    pub fn take_geometry(&mut self, srid: Srid) -> Option<Geometry> {
        self.finished.take().map(|shape| Geometry::new(shape, srid))
    }

    fn finish(&mut self, shape: Shape) {
        match self.collections.last_mut() {
            Some(members) => members.push(shape),
            None => self.finished = Some(shape),
        }
    }

    fn push_point(&mut self, point: Point) {
        match self.points.as_mut() {
            Some(points) => points.push(point),
            None => self.finish(Shape::Point(point)),
        }
    }
}

fn unsupported_curve(kind: &str) -> GeozeroError {
    GeozeroError::Geometry(format!("{kind} cannot be stored as a native geometry"))
}

#[allow(unused_variables)]
impl GeomProcessor for GeometryWriter {
    fn dimensions(&self) -> CoordDimensions {
        CoordDimensions {
            z: true,
            m: true,
            t: false,
            tm: false,
        }
    }

    fn xy(&mut self, x: f64, y: f64, idx: usize) -> Result<()> {
        self.coordinate(x, y, None, None, None, None, idx)
    }

    fn coordinate(
        &mut self,
        x: f64,
        y: f64,
        z: Option<f64>,
        m: Option<f64>,
        t: Option<f64>,
        tm: Option<u64>,
        idx: usize,
    ) -> Result<()> {
        let coord = Coord { x, y, z, m };
        match self.points.as_mut() {
            // multipoint members arrive as bare coordinates
            Some(points) if !self.in_point => points.push(Point::new(coord)),
            _ => self.coords.push(coord),
        }
        Ok(())
    }

    fn empty_point(&mut self, idx: usize) -> Result<()> {
        self.push_point(Point::empty());
        Ok(())
    }

    fn point_begin(&mut self, idx: usize) -> Result<()> {
        self.in_point = true;
        self.coords.clear();
        Ok(())
    }

    fn point_end(&mut self, idx: usize) -> Result<()> {
        self.in_point = false;
        let coord = self.coords.drain(..).next();
        self.push_point(Point(coord));
        Ok(())
    }

    fn multipoint_begin(&mut self, size: usize, idx: usize) -> Result<()> {
        self.points = Some(Vec::with_capacity(size));
        Ok(())
    }

    fn multipoint_end(&mut self, idx: usize) -> Result<()> {
        let points = self.points.take().unwrap_or_default();
        self.finish(Shape::MultiPoint(MultiPoint(points)));
        Ok(())
    }

    fn linestring_begin(&mut self, tagged: bool, size: usize, idx: usize) -> Result<()> {
        self.coords = Vec::with_capacity(size);
        Ok(())
    }

    fn linestring_end(&mut self, tagged: bool, idx: usize) -> Result<()> {
        let line = LineString::new(std::mem::take(&mut self.coords));
        if let Some(rings) = self.rings.as_mut() {
            rings.push(line);
        } else if let (Some(lines), false) = (self.lines.as_mut(), tagged) {
            lines.push(line);
        } else {
            self.finish(Shape::LineString(line));
        }
        Ok(())
    }

    fn multilinestring_begin(&mut self, size: usize, idx: usize) -> Result<()> {
        self.lines = Some(Vec::with_capacity(size));
        Ok(())
    }

    fn multilinestring_end(&mut self, idx: usize) -> Result<()> {
        let lines = self.lines.take().unwrap_or_default();
        self.finish(Shape::MultiLineString(MultiLineString(lines)));
        Ok(())
    }

    fn polygon_begin(&mut self, tagged: bool, size: usize, idx: usize) -> Result<()> {
        self.rings = Some(Vec::with_capacity(size));
        Ok(())
    }

    fn polygon_end(&mut self, tagged: bool, idx: usize) -> Result<()> {
        let polygon = Polygon::from_rings(self.rings.take().unwrap_or_default());
        match self.polygons.as_mut() {
            Some(polygons) => polygons.push(polygon),
            None => self.finish(Shape::Polygon(polygon)),
        }
        Ok(())
    }

    fn multipolygon_begin(&mut self, size: usize, idx: usize) -> Result<()> {
        self.polygons = Some(Vec::with_capacity(size));
        Ok(())
    }

    fn multipolygon_end(&mut self, idx: usize) -> Result<()> {
        let polygons = self.polygons.take().unwrap_or_default();
        self.finish(Shape::MultiPolygon(MultiPolygon(polygons)));
        Ok(())
    }

    fn geometrycollection_begin(&mut self, size: usize, idx: usize) -> Result<()> {
        self.collections.push(Vec::with_capacity(size));
        Ok(())
    }

    fn geometrycollection_end(&mut self, idx: usize) -> Result<()> {
        let members = self.collections.pop().unwrap_or_default();
        self.finish(Shape::GeometryCollection(GeometryCollection(members)));
        Ok(())
    }

    fn circularstring_begin(&mut self, size: usize, idx: usize) -> Result<()> {
        Err(unsupported_curve("CircularString"))
    }

    fn compoundcurve_begin(&mut self, size: usize, idx: usize) -> Result<()> {
        Err(unsupported_curve("CompoundCurve"))
    }

    fn curvepolygon_begin(&mut self, size: usize, idx: usize) -> Result<()> {
        Err(unsupported_curve("CurvePolygon"))
    }
}

impl FromWkb for Geometry {
    fn from_wkb<R: Read>(rdr: &mut R, dialect: WkbDialect) -> Result<Self> {
        let mut writer = GeometryWriter::new();
        geozero::wkb::process_wkb_type_geom(rdr, &mut writer, dialect)?;
        writer
            .take_geometry(0)
            .ok_or_else(|| GeozeroError::Geometry("Missing geometry".to_string()))
    }
}
