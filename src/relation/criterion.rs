use crate::error::{GeoError, GeoResult};
use crate::geometry::{Envelope, Geometry, Srid};
use crate::relation::{PredicateExpression, SpatialRelation};

/// A spatial restriction on one mapped property, rendered later by a dialect.
#[derive(Debug, Clone, PartialEq)]
pub enum SpatialCriterion {
    Relate(PredicateExpression),
    DistanceWithin {
        property_name: String,
        geometry: Geometry,
        distance: f64,
    },
    HavingSrid {
        property_name: String,
        srid: Srid,
    },
    IsEmpty {
        property_name: String,
        empty: bool,
    },
}

impl SpatialCriterion {
    pub fn property_name(&self) -> &str {
        match self {
            SpatialCriterion::Relate(expr) => expr.property_name(),
            SpatialCriterion::DistanceWithin { property_name, .. }
            | SpatialCriterion::HavingSrid { property_name, .. }
            | SpatialCriterion::IsEmpty { property_name, .. } => property_name,
        }
    }
}

impl From<PredicateExpression> for SpatialCriterion {
    fn from(value: PredicateExpression) -> Self {
        SpatialCriterion::Relate(value)
    }
}

fn relate(
    relation: SpatialRelation,
    property_name: impl Into<String>,
    geometry: Geometry,
) -> SpatialCriterion {
    SpatialCriterion::Relate(PredicateExpression::with_geometry(
        relation,
        property_name.into(),
        geometry,
    ))
}

pub fn eq(property_name: impl Into<String>, geometry: Geometry) -> SpatialCriterion {
    relate(SpatialRelation::Equals, property_name, geometry)
}

pub fn within(property_name: impl Into<String>, geometry: Geometry) -> SpatialCriterion {
    relate(SpatialRelation::Within, property_name, geometry)
}

pub fn contains(property_name: impl Into<String>, geometry: Geometry) -> SpatialCriterion {
    relate(SpatialRelation::Contains, property_name, geometry)
}

pub fn crosses(property_name: impl Into<String>, geometry: Geometry) -> SpatialCriterion {
    relate(SpatialRelation::Crosses, property_name, geometry)
}

pub fn disjoint(property_name: impl Into<String>, geometry: Geometry) -> SpatialCriterion {
    relate(SpatialRelation::Disjoint, property_name, geometry)
}

pub fn intersects(property_name: impl Into<String>, geometry: Geometry) -> SpatialCriterion {
    relate(SpatialRelation::Intersects, property_name, geometry)
}

pub fn overlaps(property_name: impl Into<String>, geometry: Geometry) -> SpatialCriterion {
    relate(SpatialRelation::Overlaps, property_name, geometry)
}

pub fn touches(property_name: impl Into<String>, geometry: Geometry) -> SpatialCriterion {
    relate(SpatialRelation::Touches, property_name, geometry)
}

/// Bounding-box overlap with the envelope of `geometry`. Approximate: rows
/// whose envelope overlaps may still be disjoint from `geometry`.
pub fn filter(property_name: impl Into<String>, geometry: Geometry) -> SpatialCriterion {
    relate(SpatialRelation::Filter, property_name, geometry)
}

/// Bounding-box overlap with an explicit envelope in reference system `srid`.
pub fn filter_envelope(
    property_name: impl Into<String>,
    envelope: Envelope,
    srid: Srid,
) -> SpatialCriterion {
    SpatialCriterion::Relate(PredicateExpression::with_envelope(
        property_name.into(),
        envelope,
        srid,
    ))
}

/// Same as [`filter`]; the name states that the test is approximate.
pub fn filter_approx(property_name: impl Into<String>, geometry: Geometry) -> SpatialCriterion {
    filter(property_name, geometry)
}

/// Distance between the property and `geometry` is at most `distance`.
/// The distance must be a non-negative number.
pub fn distance_within(
    property_name: impl Into<String>,
    geometry: Geometry,
    distance: f64,
) -> GeoResult<SpatialCriterion> {
    if distance.is_nan() || distance < 0. {
        return Err(GeoError::InvalidArgument(format!(
            "distance must be a non-negative number, got {}",
            distance
        )));
    }
    Ok(SpatialCriterion::DistanceWithin {
        property_name: property_name.into(),
        geometry,
        distance,
    })
}

pub fn having_srid(property_name: impl Into<String>, srid: Srid) -> GeoResult<SpatialCriterion> {
    if srid < 0 {
        return Err(GeoError::InvalidArgument(format!(
            "SRID must not be negative, got {}",
            srid
        )));
    }
    Ok(SpatialCriterion::HavingSrid {
        property_name: property_name.into(),
        srid,
    })
}

pub fn is_empty(property_name: impl Into<String>) -> SpatialCriterion {
    SpatialCriterion::IsEmpty {
        property_name: property_name.into(),
        empty: true,
    }
}

pub fn is_not_empty(property_name: impl Into<String>) -> SpatialCriterion {
    SpatialCriterion::IsEmpty {
        property_name: property_name.into(),
        empty: false,
    }
}

/// Restriction selected by numeric relation code. Unknown codes fail with
/// `InvalidArgument`; they are never mapped to a default relation.
pub fn spatial_restriction(
    code: i32,
    property_name: impl Into<String>,
    geometry: Geometry,
) -> GeoResult<SpatialCriterion> {
    let relation = SpatialRelation::try_from(code)?;
    Ok(relate(relation, property_name, geometry))
}
