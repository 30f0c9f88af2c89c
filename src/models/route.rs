use serde::{Deserialize, Serialize};

use crate::models::point::{DeliveryPoint, GeoPoint};

/// Figures reported by the optimizer for a computed stop sequence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmissionStats {
    pub total_distance_km: f64,
    pub baseline: f64,
    pub optimized: f64,
    pub saved: f64,
    pub percent: f64,
}

#[derive(Debug, Clone)]
pub struct OptimizedSequence {
    pub stops: Vec<DeliveryPoint>,
    pub logs: Vec<String>,
    pub stats: Option<EmissionStats>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PathKind {
    Road,
    StraightLine,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoadPath {
    pub path: Vec<GeoPoint>,
    pub distance_m: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouteResult {
    pub stops: Vec<DeliveryPoint>,
    pub path: Vec<GeoPoint>,
    pub distance_m: f64,
    pub path_kind: PathKind,
    pub stats: Option<EmissionStats>,
}

impl RouteResult {
    pub fn is_approximate(&self) -> bool {
        self.path_kind == PathKind::StraightLine
    }
}
