use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use super::{map_transport_error, read_json, Geocoder, UpstreamError};
use crate::models::geocode::GeocodeCandidate;
use crate::models::point::GeoPoint;

const USER_AGENT: &str = "eco-logistics/0.1";

/// Nominatim-compatible free-text geocoder.
pub struct NominatimGeocoder {
    client: Client,
    base_url: String,
    limit: usize,
}

/// Nominatim returns coordinates as decimal strings.
#[derive(Deserialize)]
struct PlaceDto {
    display_name: String,
    lat: String,
    lon: String,
}

impl NominatimGeocoder {
    pub fn new(base_url: &str, timeout: Duration, limit: usize) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            base_url: super::base_url(base_url),
            limit: limit.max(1),
        })
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn search(&self, query: &str) -> Result<Vec<GeocodeCandidate>, UpstreamError> {
        let limit = self.limit.to_string();
        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[("format", "json"), ("limit", limit.as_str()), ("q", query)])
            .send()
            .await
            .map_err(map_transport_error)?;

        let places: Vec<PlaceDto> = read_json(response).await?;
        Ok(into_candidates(places))
    }
}

fn into_candidates(places: Vec<PlaceDto>) -> Vec<GeocodeCandidate> {
    places
        .into_iter()
        .filter_map(|place| {
            let position = place
                .lat
                .parse::<f64>()
                .ok()
                .zip(place.lon.parse::<f64>().ok())
                .and_then(|(lat, lng)| GeoPoint::checked(lat, lng));

            match position {
                Some(position) => Some(GeocodeCandidate {
                    display_name: place.display_name,
                    lat: position.lat,
                    lng: position.lng,
                }),
                None => {
                    warn!(place = %place.display_name, "skipping geocode match with unusable coordinates");
                    None
                }
            }
        })
        .collect()
}
