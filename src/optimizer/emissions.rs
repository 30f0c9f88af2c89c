use crate::models::emission::{EmissionEstimate, EmissionInput, TransportMode};
use crate::models::route::EmissionStats;

/// Unoptimized routes are modelled as this much longer than the optimized one.
const BASELINE_DETOUR_FACTOR: f64 = 1.45;

pub fn emission_kg(distance_km: f64, weight_kg: f64, mode: TransportMode) -> f64 {
    let weight_tonnes = weight_kg / 1_000.0;
    distance_km * weight_tonnes * mode.emission_factor()
}

/// Chosen mode against the same shipment flown by air.
pub fn manual_estimate(input: &EmissionInput) -> EmissionEstimate {
    let chosen = emission_kg(input.distance, input.weight, input.mode);
    let baseline = emission_kg(input.distance, input.weight, TransportMode::Air);

    EmissionEstimate {
        emission_kg: chosen,
        baseline_kg: baseline,
        savings_kg: (baseline - chosen).max(0.0),
    }
}

pub fn route_stats(total_distance_km: f64, weight_kg: f64) -> EmissionStats {
    let optimized = emission_kg(total_distance_km, weight_kg, TransportMode::Road);
    let baseline = emission_kg(
        total_distance_km * BASELINE_DETOUR_FACTOR,
        weight_kg,
        TransportMode::Road,
    );
    let saved = (baseline - optimized).max(0.0);
    let percent = if baseline > 0.0 {
        saved / baseline * 100.0
    } else {
        0.0
    };

    EmissionStats {
        total_distance_km,
        baseline,
        optimized,
        saved,
        percent,
    }
}
