//! Scripted collaborators for workflow tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::models::emission::{EmissionEstimate, EmissionInput};
use crate::models::geocode::GeocodeCandidate;
use crate::models::point::{DeliveryPoint, GeoPoint};
use crate::models::route::{EmissionStats, OptimizedSequence, RoadPath};
use crate::optimizer::emissions::manual_estimate;
use crate::outbound::{EmissionCalculator, Geocoder, Optimizer, RoadRouter, UpstreamError};

#[derive(Debug, Clone, Copy)]
pub enum OptimizerScript {
    Echo,
    EchoWithStats,
    Reverse,
    /// Echoes the points but strips the coordinates of the second stop.
    CorruptSecond,
    Empty,
    Unreachable,
    /// Never answers within any reasonable timeout.
    Hang,
}

pub struct ScriptedOptimizer {
    script: Mutex<OptimizerScript>,
    first_call_delay: Mutex<Option<Duration>>,
    calls: AtomicUsize,
}

impl ScriptedOptimizer {
    pub fn new(script: OptimizerScript) -> Self {
        Self {
            script: Mutex::new(script),
            first_call_delay: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_script(&self, script: OptimizerScript) {
        *self.script.lock().unwrap() = script;
    }

    pub fn delay_first_call(&self, delay: Duration) {
        *self.first_call_delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Optimizer for ScriptedOptimizer {
    async fn optimize(&self, points: &[DeliveryPoint]) -> Result<OptimizedSequence, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.first_call_delay.lock().unwrap().take();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let script = *self.script.lock().unwrap();
        let mut stops = points.to_vec();
        let mut stats = None;
        match script {
            OptimizerScript::Echo => {}
            OptimizerScript::EchoWithStats => {
                stats = Some(EmissionStats {
                    total_distance_km: 111.0,
                    baseline: 12.876,
                    optimized: 8.88,
                    saved: 3.996,
                    percent: 31.0,
                });
            }
            OptimizerScript::Reverse => stops.reverse(),
            OptimizerScript::CorruptSecond => {
                if let Some(stop) = stops.get_mut(1) {
                    stop.lat = None;
                }
            }
            OptimizerScript::Empty => stops.clear(),
            OptimizerScript::Unreachable => {
                return Err(UpstreamError::Transport("connection refused".to_string()));
            }
            OptimizerScript::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
        }

        Ok(OptimizedSequence {
            stops,
            logs: Vec::new(),
            stats,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub enum RouterScript {
    Road,
    Unreachable,
    Hang,
}

pub struct ScriptedRouter {
    script: RouterScript,
    calls: AtomicUsize,
    last_waypoints: Mutex<Vec<GeoPoint>>,
}

impl ScriptedRouter {
    pub fn new(script: RouterScript) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
            last_waypoints: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_waypoints(&self) -> Vec<GeoPoint> {
        self.last_waypoints.lock().unwrap().clone()
    }
}

#[async_trait]
impl RoadRouter for ScriptedRouter {
    async fn route(&self, waypoints: &[GeoPoint]) -> Result<RoadPath, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_waypoints.lock().unwrap() = waypoints.to_vec();

        match self.script {
            RouterScript::Road => Ok(RoadPath {
                path: waypoints.to_vec(),
                distance_m: 4_242.0,
            }),
            RouterScript::Unreachable => {
                Err(UpstreamError::Transport("dns error".to_string()))
            }
            RouterScript::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Err(UpstreamError::Timeout("hung".to_string()))
            }
        }
    }
}

#[derive(Default)]
pub struct ScriptedGeocoder {
    answers: HashMap<String, Vec<GeocodeCandidate>>,
    calls: AtomicUsize,
}

impl ScriptedGeocoder {
    pub fn with_answer(mut self, query: &str, candidates: Vec<GeocodeCandidate>) -> Self {
        self.answers.insert(query.to_string(), candidates);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Geocoder for ScriptedGeocoder {
    async fn search(&self, query: &str) -> Result<Vec<GeocodeCandidate>, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.answers.get(query) {
            Some(candidates) => Ok(candidates.clone()),
            None => Err(UpstreamError::Status {
                status: 503,
                message: "geocoder unavailable".to_string(),
            }),
        }
    }
}

pub fn candidate(name: &str, lat: f64, lng: f64) -> GeocodeCandidate {
    GeocodeCandidate {
        display_name: name.to_string(),
        lat,
        lng,
    }
}

#[derive(Default)]
pub struct RecordingCalculator {
    inputs: Mutex<Vec<EmissionInput>>,
}

impl RecordingCalculator {
    pub fn inputs(&self) -> Vec<EmissionInput> {
        self.inputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmissionCalculator for RecordingCalculator {
    async fn calculate(&self, input: &EmissionInput) -> Result<EmissionEstimate, UpstreamError> {
        self.inputs.lock().unwrap().push(*input);
        if input.distance < 0.0 {
            return Err(UpstreamError::Status {
                status: 400,
                message: "negative distance".to_string(),
            });
        }
        Ok(manual_estimate(input))
    }
}
