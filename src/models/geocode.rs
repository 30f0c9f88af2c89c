use serde::{Deserialize, Serialize};

use crate::models::point::GeoPoint;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeocodeCandidate {
    pub display_name: String,
    pub lat: f64,
    pub lng: f64,
}

impl GeocodeCandidate {
    pub fn position(&self) -> GeoPoint {
        GeoPoint {
            lat: self.lat,
            lng: self.lng,
        }
    }
}
