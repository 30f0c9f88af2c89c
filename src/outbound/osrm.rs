use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{map_transport_error, read_json, RoadRouter, UpstreamError};
use crate::models::point::GeoPoint;
use crate::models::route::RoadPath;

/// OSRM-compatible driving router.
pub struct OsrmRouter {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct RouteReply {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<RouteDto>,
}

#[derive(Deserialize)]
struct RouteDto {
    distance: f64,
    geometry: GeometryDto,
}

/// GeoJSON line string; coordinates are `[lng, lat]`.
#[derive(Deserialize)]
struct GeometryDto {
    coordinates: Vec<[f64; 2]>,
}

impl OsrmRouter {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: super::base_url(base_url),
        })
    }
}

#[async_trait]
impl RoadRouter for OsrmRouter {
    async fn route(&self, waypoints: &[GeoPoint]) -> Result<RoadPath, UpstreamError> {
        let response = self
            .client
            .get(format!(
                "{}/route/v1/driving/{}",
                self.base_url,
                waypoint_list(waypoints)
            ))
            .query(&[("overview", "full"), ("geometries", "geojson")])
            .send()
            .await
            .map_err(map_transport_error)?;

        let reply: RouteReply = read_json(response).await?;
        into_road_path(reply)
    }
}

fn waypoint_list(waypoints: &[GeoPoint]) -> String {
    waypoints
        .iter()
        .map(|point| format!("{},{}", point.lng, point.lat))
        .collect::<Vec<_>>()
        .join(";")
}

fn into_road_path(reply: RouteReply) -> Result<RoadPath, UpstreamError> {
    if reply.code != "Ok" {
        return Err(UpstreamError::Decode(format!(
            "router answered {}: {}",
            reply.code,
            reply.message.unwrap_or_default()
        )));
    }

    let route = reply
        .routes
        .into_iter()
        .next()
        .ok_or_else(|| UpstreamError::Decode("router returned no routes".to_string()))?;

    let path = route
        .geometry
        .coordinates
        .into_iter()
        .map(|[lng, lat]| {
            GeoPoint::checked(lat, lng).ok_or_else(|| {
                UpstreamError::Decode(format!("invalid coordinate [{lng}, {lat}] in geometry"))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if path.len() < 2 || !route.distance.is_finite() || route.distance < 0.0 {
        return Err(UpstreamError::Decode(
            "router geometry is degenerate".to_string(),
        ));
    }

    Ok(RoadPath {
        path,
        distance_m: route.distance,
    })
}
