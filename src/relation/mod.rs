//! Spatial relations and the predicate expressions built from them.

mod criterion;

pub use criterion::*;

use crate::error::{GeoError, GeoResult};
use crate::geometry::{Envelope, Geometry, Srid};
use std::fmt;

/// Closed set of spatial relations a predicate can test.
///
/// The discriminants are the relation codes shared with callers that select a
/// relation numerically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum SpatialRelation {
    Equals = 0,
    Disjoint = 1,
    Touches = 2,
    Crosses = 3,
    Within = 4,
    Overlaps = 5,
    Contains = 6,
    Intersects = 7,
    /// Bounding-box overlap, answered from the spatial index only.
    Filter = 8,
}

impl SpatialRelation {
    pub const ALL: [SpatialRelation; 9] = [
        SpatialRelation::Equals,
        SpatialRelation::Disjoint,
        SpatialRelation::Touches,
        SpatialRelation::Crosses,
        SpatialRelation::Within,
        SpatialRelation::Overlaps,
        SpatialRelation::Contains,
        SpatialRelation::Intersects,
        SpatialRelation::Filter,
    ];

    pub fn code(self) -> i32 {
        self as i32
    }

    /// True when the relation tests envelopes instead of exact topology.
    pub fn is_approximate(self) -> bool {
        matches!(self, SpatialRelation::Filter)
    }
}

impl TryFrom<i32> for SpatialRelation {
    type Error = GeoError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        SpatialRelation::ALL
            .into_iter()
            .find(|relation| relation.code() == code)
            .ok_or_else(|| GeoError::InvalidArgument("Non-existent spatial relation".to_string()))
    }
}

impl fmt::Display for SpatialRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SpatialRelation::Equals => "EQUALS",
            SpatialRelation::Disjoint => "DISJOINT",
            SpatialRelation::Touches => "TOUCHES",
            SpatialRelation::Crosses => "CROSSES",
            SpatialRelation::Within => "WITHIN",
            SpatialRelation::Overlaps => "OVERLAPS",
            SpatialRelation::Contains => "CONTAINS",
            SpatialRelation::Intersects => "INTERSECTS",
            SpatialRelation::Filter => "FILTER",
        };
        write!(f, "{name}")
    }
}

/// Right-hand side of a spatial predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Geometry(Geometry),
    Envelope { envelope: Envelope, srid: Srid },
}

impl Operand {
    pub fn srid(&self) -> Srid {
        match self {
            Operand::Geometry(geometry) => geometry.srid(),
            Operand::Envelope { srid, .. } => *srid,
        }
    }

    /// The operand as a geometry, an envelope becoming its rectangle polygon.
    pub fn to_geometry(&self) -> Geometry {
        match self {
            Operand::Geometry(geometry) => geometry.clone(),
            Operand::Envelope { envelope, srid } => envelope.to_geometry(*srid),
        }
    }
}

impl From<Geometry> for Operand {
    fn from(value: Geometry) -> Self {
        Operand::Geometry(value)
    }
}

/// A spatial relation between a mapped property and a literal operand.
#[derive(Debug, Clone, PartialEq)]
pub struct PredicateExpression {
    property_name: String,
    relation: SpatialRelation,
    operand: Operand,
    srid_hint: Option<Srid>,
}

impl PredicateExpression {
    pub fn property_name(&self) -> &str {
        &self.property_name
    }

    pub fn relation(&self) -> SpatialRelation {
        self.relation
    }

    pub fn operand(&self) -> &Operand {
        &self.operand
    }

    pub fn srid_hint(&self) -> Option<Srid> {
        self.srid_hint
    }

    /// Predicate with a geometry operand, valid for every relation. FILTER
    /// reduces the geometry to its envelope.
    pub(crate) fn with_geometry(
        relation: SpatialRelation,
        property_name: String,
        geometry: Geometry,
    ) -> Self {
        if relation.is_approximate() {
            let srid = geometry.srid();
            return Self::with_envelope(property_name, geometry.envelope(), srid);
        }
        Self {
            property_name,
            relation,
            operand: Operand::Geometry(geometry),
            srid_hint: None,
        }
    }

    pub(crate) fn with_envelope(property_name: String, envelope: Envelope, srid: Srid) -> Self {
        Self {
            property_name,
            relation: SpatialRelation::Filter,
            operand: Operand::Envelope { envelope, srid },
            srid_hint: Some(srid),
        }
    }
}

/// Builds the predicate for `relation` applied to `property_name`.
///
/// Exact relations take a geometry operand verbatim. FILTER accepts either a
/// geometry, which is reduced to its envelope, or an explicit envelope.
pub fn dispatch(
    relation: SpatialRelation,
    property_name: impl Into<String>,
    operand: impl Into<Operand>,
) -> GeoResult<PredicateExpression> {
    let property_name = property_name.into();
    match (relation, operand.into()) {
        (_, Operand::Geometry(geometry)) => Ok(PredicateExpression::with_geometry(
            relation,
            property_name,
            geometry,
        )),
        (SpatialRelation::Filter, Operand::Envelope { envelope, srid }) => Ok(
            PredicateExpression::with_envelope(property_name, envelope, srid),
        ),
        (_, Operand::Envelope { .. }) => Err(GeoError::InvalidArgument(format!(
            "{relation} requires a geometry operand"
        ))),
    }
}

/// [`dispatch`] keyed by a numeric relation code. Unknown codes fail.
pub fn dispatch_code(
    code: i32,
    property_name: impl Into<String>,
    operand: impl Into<Operand>,
) -> GeoResult<PredicateExpression> {
    dispatch(SpatialRelation::try_from(code)?, property_name, operand)
}

#[cfg(test)]
mod tests {
    use crate::error::GeoError;
    use crate::geometry::{Coord, Envelope, Geometry, LineString, Point};
    use crate::relation::{dispatch, dispatch_code, Operand, SpatialRelation};

    fn line() -> Geometry {
        Geometry::new(
            LineString::new(vec![
                Coord::xy(1., 2.),
                Coord::xy(5., -1.),
                Coord::xy(3., 7.),
            ]),
            4326,
        )
    }

    #[test]
    fn relation_codes() {
        for relation in SpatialRelation::ALL {
            assert_eq!(SpatialRelation::try_from(relation.code()).unwrap(), relation);
        }
        assert_eq!(SpatialRelation::Equals.code(), 0);
        assert_eq!(SpatialRelation::Intersects.code(), 7);
        assert_eq!(SpatialRelation::Filter.code(), 8);
        assert!(SpatialRelation::Filter.is_approximate());
        assert!(!SpatialRelation::Within.is_approximate());
    }

    #[test]
    fn dispatch_exact_relation() {
        let expr = dispatch(SpatialRelation::Equals, "geom", line()).unwrap();
        assert_eq!(expr.property_name(), "geom");
        assert_eq!(expr.relation(), SpatialRelation::Equals);
        assert_eq!(expr.operand(), &Operand::Geometry(line()));
        assert_eq!(expr.srid_hint(), None);
    }

    #[test]
    fn dispatch_unknown_code() {
        let err = dispatch_code(999, "geom", line()).unwrap_err();
        assert!(matches!(err, GeoError::InvalidArgument(_)));
        assert_eq!(err.to_string(), "Invalid argument: Non-existent spatial relation");
        assert!(dispatch_code(-1, "geom", line()).is_err());
    }

    #[test]
    fn dispatch_filter_with_envelope() {
        let operand = Operand::Envelope {
            envelope: Envelope::new(0., 0., 10., 10.),
            srid: 4326,
        };
        let expr = dispatch(SpatialRelation::Filter, "geom", operand).unwrap();
        assert_eq!(expr.relation(), SpatialRelation::Filter);
        assert_eq!(expr.srid_hint(), Some(4326));
        let Operand::Envelope { envelope, srid } = expr.operand() else {
            panic!("expected envelope operand");
        };
        assert_eq!(
            (envelope.xmin(), envelope.ymin(), envelope.xmax(), envelope.ymax()),
            (0., 0., 10., 10.)
        );
        assert_eq!(*srid, 4326);
    }

    #[test]
    fn dispatch_filter_uses_geometry_envelope() {
        let expr = dispatch_code(8, "geom", line()).unwrap();
        assert_eq!(
            expr.operand(),
            &Operand::Envelope {
                envelope: Envelope::new(1., -1., 5., 7.),
                srid: 4326
            }
        );

        let empty = dispatch(
            SpatialRelation::Filter,
            "geom",
            Geometry::new(Point::empty(), 0),
        )
        .unwrap();
        let Operand::Envelope { envelope, .. } = empty.operand() else {
            panic!("expected envelope operand");
        };
        assert!(envelope.is_empty());
    }

    #[test]
    fn exact_relation_rejects_envelope() {
        let operand = Operand::Envelope {
            envelope: Envelope::new(0., 0., 1., 1.),
            srid: 0,
        };
        assert!(matches!(
            dispatch(SpatialRelation::Within, "geom", operand),
            Err(GeoError::InvalidArgument(_))
        ));
    }
}
