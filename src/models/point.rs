use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::models::lenient;

use crate::models::pickup::PickupRequest;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    /// Returns `None` unless both coordinates are finite and inside WGS84 bounds.
    pub fn checked(lat: f64, lng: f64) -> Option<Self> {
        let valid = lat.is_finite()
            && lng.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lng);

        valid.then_some(Self { lat, lng })
    }
}

/// A stop on the operator's map.
///
/// Coordinates are optional on the wire because the optimizer echoes stops
/// back verbatim; points created locally always carry them. Ids may arrive
/// as numbers, and fields this crate does not know travel along in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliveryPoint {
    #[serde(default, deserialize_with = "lenient::identifier")]
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, deserialize_with = "lenient::optional_number")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient::optional_number")]
    pub lng: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DeliveryPoint {
    pub fn new(id: impl Into<String>, label: impl Into<String>, position: GeoPoint) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            lat: Some(position.lat),
            lng: Some(position.lng),
            extra: Map::new(),
        }
    }

    pub fn from_map_click(position: GeoPoint, ordinal: usize) -> Self {
        Self::new(
            Uuid::new_v4().to_string(),
            format!("Point {ordinal}"),
            position,
        )
    }

    /// Promotes a pickup request into a routable point. Requests that were
    /// never geocoded cannot be routed and yield `None`.
    pub fn from_request(request: &PickupRequest) -> Option<Self> {
        let position = GeoPoint::checked(request.lat?, request.lng?)?;

        Some(Self::new(
            format!("request-{}", request.id),
            format!("{} ({} kg)", request.seller_name, request.weight),
            position,
        ))
    }

    pub fn position(&self) -> Option<GeoPoint> {
        GeoPoint::checked(self.lat?, self.lng?)
    }
}
