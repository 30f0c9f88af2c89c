use crate::models::point::{DeliveryPoint, GeoPoint};
use crate::models::route::RoadPath;

const EARTH_RADIUS_KM: f64 = 6_371.0;

pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let sin_lat = (delta_lat / 2.0).sin();
    let sin_lng = (delta_lng / 2.0).sin();

    let haversine = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lng * sin_lng;
    let central_angle = 2.0 * haversine.sqrt().asin();

    EARTH_RADIUS_KM * central_angle
}

pub fn haversine_m(a: &GeoPoint, b: &GeoPoint) -> f64 {
    haversine_km(a, b) * 1_000.0
}

/// Straight segments between consecutive stops, in stop order.
///
/// Stops without usable coordinates are skipped, so a corrupt stop only
/// bends the segment around it instead of discarding the path.
pub fn straight_line_path(stops: &[DeliveryPoint]) -> RoadPath {
    let path: Vec<GeoPoint> = stops.iter().filter_map(DeliveryPoint::position).collect();

    let distance_m: f64 = path
        .windows(2)
        .map(|pair| haversine_m(&pair[0], &pair[1]))
        .sum();

    RoadPath { path, distance_m }
}
