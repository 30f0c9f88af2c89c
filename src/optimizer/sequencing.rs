use crate::models::point::{DeliveryPoint, GeoPoint};

/// Rough conversion used by the sequencer; not a geodesic distance.
pub const KM_PER_DEGREE: f64 = 111.0;

fn planar_degrees(a: &GeoPoint, b: &GeoPoint) -> f64 {
    ((a.lat - b.lat).powi(2) + (a.lng - b.lng).powi(2)).sqrt()
}

#[derive(Debug, Clone)]
pub struct Sequence {
    pub stops: Vec<DeliveryPoint>,
    pub total_km: f64,
    pub logs: Vec<String>,
}

/// Greedy nearest-neighbour tour starting at the first point.
///
/// Every point must carry coordinates; callers reject the rest beforehand.
pub fn nearest_neighbour(points: Vec<(DeliveryPoint, GeoPoint)>) -> Sequence {
    let mut unvisited = points.into_iter();
    let Some((first, mut current)) = unvisited.next() else {
        return Sequence {
            stops: Vec::new(),
            total_km: 0.0,
            logs: Vec::new(),
        };
    };
    let mut unvisited: Vec<(DeliveryPoint, GeoPoint)> = unvisited.collect();

    let mut stops = vec![first];
    let mut logs = vec!["Optimization Started...".to_string()];
    let mut total_degrees = 0.0;

    while !unvisited.is_empty() {
        let nearest = unvisited
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                planar_degrees(&current, &a.1).total_cmp(&planar_degrees(&current, &b.1))
            })
            .map(|(index, _)| index);
        let Some(index) = nearest else { break };

        let (point, position) = unvisited.remove(index);
        total_degrees += planar_degrees(&current, &position);
        logs.push(format!("Connected to nearest node at {:.4}", position.lat));

        current = position;
        stops.push(point);
    }

    Sequence {
        stops,
        total_km: total_degrees * KM_PER_DEGREE,
        logs,
    }
}
