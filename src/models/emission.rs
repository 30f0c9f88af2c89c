use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    #[default]
    Road,
    Rail,
    Air,
}

impl TransportMode {
    /// kg CO2 per tonne-km.
    pub fn emission_factor(self) -> f64 {
        match self {
            TransportMode::Road => 0.080,
            TransportMode::Rail => 0.020,
            TransportMode::Air => 0.500,
        }
    }

    /// Unknown names fall back to road freight.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "rail" => TransportMode::Rail,
            "air" => TransportMode::Air,
            _ => TransportMode::Road,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct EmissionInput {
    pub distance: f64,
    pub weight: f64,
    pub mode: TransportMode,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct EmissionEstimate {
    pub emission_kg: f64,
    pub baseline_kg: f64,
    pub savings_kg: f64,
}
