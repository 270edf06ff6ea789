//! SQL Server rendering of spatial criteria.

use crate::error::{GeoError, GeoResult};
use crate::relation::{PredicateExpression, SpatialCriterion, SpatialRelation};
use crate::value::{GeometryValueBinder, NativeGeometry};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// How FILTER predicates are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// Index-only bounding-box test (`Filter`). May return false positives.
    #[default]
    Approximate,
    /// Exact intersection test (`STIntersects`) against the same envelope.
    Exact,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialectConfig {
    pub filter_mode: FilterMode,
    /// Emit a warning every time a FILTER predicate is rendered approximately.
    pub warn_on_approximate_filter: bool,
}

impl DialectConfig {
    pub fn from_json(json: &str) -> GeoResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| GeoError::InvalidArgument(format!("Invalid dialect config: {e}")))
    }
}

/// A positional parameter of a rendered predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Parameter {
    Geometry(NativeGeometry),
    Double(f64),
    Int(i32),
}

/// SQL fragment with `?` placeholders and their values in order.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPredicate {
    pub sql: String,
    pub parameters: Vec<Parameter>,
}

#[derive(Debug, Clone, Default)]
pub struct SqlServerDialect {
    config: DialectConfig,
    binder: GeometryValueBinder,
}

impl SqlServerDialect {
    pub fn new(config: DialectConfig) -> Self {
        Self {
            config,
            binder: GeometryValueBinder,
        }
    }

    pub fn config(&self) -> &DialectConfig {
        &self.config
    }

    /// Name of the `geometry` method testing `relation`.
    pub fn relation_function(relation: SpatialRelation) -> &'static str {
        match relation {
            SpatialRelation::Equals => "STEquals",
            SpatialRelation::Disjoint => "STDisjoint",
            SpatialRelation::Touches => "STTouches",
            SpatialRelation::Crosses => "STCrosses",
            SpatialRelation::Within => "STWithin",
            SpatialRelation::Overlaps => "STOverlaps",
            SpatialRelation::Contains => "STContains",
            SpatialRelation::Intersects => "STIntersects",
            SpatialRelation::Filter => "Filter",
        }
    }

    fn function_for(&self, relation: SpatialRelation) -> &'static str {
        match (relation, self.config.filter_mode) {
            (SpatialRelation::Filter, FilterMode::Exact) => {
                Self::relation_function(SpatialRelation::Intersects)
            }
            _ => Self::relation_function(relation),
        }
    }

    pub fn render(&self, criterion: &SpatialCriterion) -> GeoResult<RenderedPredicate> {
        let rendered = match criterion {
            SpatialCriterion::Relate(expr) => self.render_predicate(expr)?,
            SpatialCriterion::DistanceWithin {
                property_name,
                geometry,
                distance,
            } => RenderedPredicate {
                sql: format!("{property_name}.STDistance(?) <= ?"),
                parameters: vec![
                    Parameter::Geometry(self.binder.to_native(Some(geometry))?),
                    Parameter::Double(*distance),
                ],
            },
            SpatialCriterion::HavingSrid {
                property_name,
                srid,
            } => RenderedPredicate {
                sql: format!("{property_name}.STSrid = (?)"),
                parameters: vec![Parameter::Int(*srid)],
            },
            SpatialCriterion::IsEmpty {
                property_name,
                empty,
            } => RenderedPredicate {
                sql: format!(
                    "{property_name}.STIsEmpty() = {}",
                    if *empty { 1 } else { 0 }
                ),
                parameters: vec![],
            },
        };
        debug!(sql = %rendered.sql, "rendered spatial predicate");
        Ok(rendered)
    }

    pub fn render_predicate(&self, expr: &PredicateExpression) -> GeoResult<RenderedPredicate> {
        let relation = expr.relation();
        if relation.is_approximate()
            && self.config.filter_mode == FilterMode::Approximate
            && self.config.warn_on_approximate_filter
        {
            warn!(
                property = expr.property_name(),
                "FILTER is rendered as an index-only bounding-box test"
            );
        }
        let operand = expr.operand().to_geometry();
        Ok(RenderedPredicate {
            sql: format!(
                "{}.{}(?) = 1",
                expr.property_name(),
                self.function_for(relation)
            ),
            parameters: vec![Parameter::Geometry(self.binder.to_native(Some(&operand))?)],
        })
    }
}
