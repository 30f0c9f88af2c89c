use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::lenient;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum GoodsType {
    Perishables,
    Textiles,
    Hardware,
    Electronics,
    #[default]
    Other,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PickupStatus {
    Pending,
    Accepted,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PickupRequest {
    pub id: i64,
    pub seller_name: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub weight: f64,
    #[serde(rename = "type")]
    pub goods_type: GoodsType,
    pub date: Option<NaiveDate>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub status: PickupStatus,
    pub created_at: DateTime<Utc>,
}

/// Create payload as submitted by a seller. Every field is optional on the
/// wire so that missing fields surface as a validation error listing all of
/// them rather than a decode failure. Numbers sent as strings and an unset
/// date (`""`) are accepted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewPickupRequest {
    pub seller_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_text")]
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_number")]
    pub weight: Option<f64>,
    #[serde(rename = "type", default)]
    pub goods_type: Option<GoodsType>,
    #[serde(default, deserialize_with = "lenient::optional_date")]
    pub date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::optional_number")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient::optional_number")]
    pub lng: Option<f64>,
}

/// Wire names of the fields a create payload must carry.
pub const REQUIRED_FIELDS: [&str; 5] = ["sellerName", "phone", "email", "address", "weight"];

/// Fields of a [`NewPickupRequest`] that passed presence validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidPickup {
    pub seller_name: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub weight: f64,
    pub goods_type: GoodsType,
    pub date: Option<NaiveDate>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

impl NewPickupRequest {
    /// Checks presence of the required fields. On failure returns the wire
    /// names of every missing field.
    pub fn validate(self) -> Result<ValidPickup, Vec<&'static str>> {
        let mut missing = Vec::new();

        let seller_name = present(self.seller_name, "sellerName", &mut missing);
        let phone = present(self.phone, "phone", &mut missing);
        let email = present(self.email, "email", &mut missing);
        let address = present(self.address, "address", &mut missing);
        let weight = self.weight.filter(|w| w.is_finite() && *w > 0.0);
        if weight.is_none() {
            missing.push("weight");
        }

        match (seller_name, phone, email, address, weight) {
            (Some(seller_name), Some(phone), Some(email), Some(address), Some(weight)) => {
                Ok(ValidPickup {
                    seller_name,
                    phone,
                    email,
                    address,
                    weight,
                    goods_type: self.goods_type.unwrap_or_default(),
                    date: self.date,
                    lat: self.lat,
                    lng: self.lng,
                })
            }
            _ => Err(missing),
        }
    }
}

fn present(
    value: Option<String>,
    name: &'static str,
    missing: &mut Vec<&'static str>,
) -> Option<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Some(v),
        _ => {
            missing.push(name);
            None
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "request", rename_all = "snake_case")]
pub enum PickupEvent {
    Created(PickupRequest),
    Accepted(PickupRequest),
}
