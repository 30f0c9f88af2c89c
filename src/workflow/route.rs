use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::error::AppError;
use crate::geo::straight_line_path;
use crate::models::point::{DeliveryPoint, GeoPoint};
use crate::models::route::{PathKind, RoadPath, RouteResult};
use crate::outbound::{bounded, Optimizer, RoadRouter};

#[derive(Debug, Clone, PartialEq)]
pub enum RouteUpdate {
    Applied(RouteResult),
    /// A newer optimize run started before this one finished; its result was
    /// dropped.
    Superseded,
}

/// Active delivery-point set plus the most recent route computed for it.
pub struct RouteAssembly {
    optimizer: Arc<dyn Optimizer>,
    router: Arc<dyn RoadRouter>,
    call_timeout: Duration,
    points: RwLock<Vec<DeliveryPoint>>,
    current: RwLock<Option<RouteResult>>,
    generation: AtomicU64,
}

impl RouteAssembly {
    pub fn new(
        optimizer: Arc<dyn Optimizer>,
        router: Arc<dyn RoadRouter>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            optimizer,
            router,
            call_timeout,
            points: RwLock::new(Vec::new()),
            current: RwLock::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// Adds a point, replacing any point with the same id.
    pub async fn add_point(&self, point: DeliveryPoint) {
        let mut points = self.points.write().await;
        match points.iter_mut().find(|existing| existing.id == point.id) {
            Some(existing) => *existing = point,
            None => points.push(point),
        }
    }

    pub async fn add_map_click(&self, position: GeoPoint) -> DeliveryPoint {
        let mut points = self.points.write().await;
        let point = DeliveryPoint::from_map_click(position, points.len() + 1);
        points.push(point.clone());
        point
    }

    pub async fn remove_point(&self, id: &str) -> bool {
        let mut points = self.points.write().await;
        let before = points.len();
        points.retain(|point| point.id != id);
        points.len() != before
    }

    /// Drops every point and the displayed route. In-flight runs are
    /// superseded.
    pub async fn clear(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.points.write().await.clear();
        *self.current.write().await = None;
    }

    pub async fn points(&self) -> Vec<DeliveryPoint> {
        self.points.read().await.clone()
    }

    pub async fn current(&self) -> Option<RouteResult> {
        self.current.read().await.clone()
    }

    /// Orders the active points through the optimizer, then fetches road
    /// geometry for that order, falling back to straight segments.
    ///
    /// Fails without any network call when fewer than two points are active.
    /// When the optimizer fails the previously displayed route is kept.
    pub async fn optimize(&self) -> Result<RouteUpdate, AppError> {
        let points = self.points().await;
        if points.len() < 2 {
            return Err(AppError::InsufficientPoints(points.len()));
        }

        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let start = Instant::now();

        let sequence = match bounded(self.call_timeout, self.optimizer.optimize(&points)).await {
            Ok(sequence) if !sequence.stops.is_empty() => sequence,
            Ok(_) => {
                return self.fail_unless_superseded(
                    ticket,
                    "optimizer returned no stop sequence".to_string(),
                );
            }
            Err(err) => return self.fail_unless_superseded(ticket, err.to_string()),
        };

        if self.is_superseded(ticket) {
            return Ok(RouteUpdate::Superseded);
        }

        let (road, path_kind) = self.road_geometry(&sequence.stops).await;
        let result = RouteResult {
            stops: sequence.stops,
            path: road.path,
            distance_m: road.distance_m,
            path_kind,
            stats: sequence.stats,
        };

        let mut current = self.current.write().await;
        if self.is_superseded(ticket) {
            return Ok(RouteUpdate::Superseded);
        }
        *current = Some(result.clone());

        info!(
            stops = result.stops.len(),
            distance_m = result.distance_m,
            path_kind = ?result.path_kind,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "route assembled"
        );
        Ok(RouteUpdate::Applied(result))
    }

    fn is_superseded(&self, ticket: u64) -> bool {
        self.generation.load(Ordering::SeqCst) != ticket
    }

    fn fail_unless_superseded(&self, ticket: u64, reason: String) -> Result<RouteUpdate, AppError> {
        if self.is_superseded(ticket) {
            return Ok(RouteUpdate::Superseded);
        }
        error!(reason = %reason, "route optimization unavailable");
        Err(AppError::OptimizationUnavailable(reason))
    }

    async fn road_geometry(&self, stops: &[DeliveryPoint]) -> (RoadPath, PathKind) {
        let waypoints: Option<Vec<GeoPoint>> = stops.iter().map(DeliveryPoint::position).collect();

        let failure = match waypoints {
            Some(waypoints) if waypoints.len() >= 2 => {
                match bounded(self.call_timeout, self.router.route(&waypoints)).await {
                    Ok(road) => return (road, PathKind::Road),
                    Err(err) => err.to_string(),
                }
            }
            Some(_) => "fewer than two routable stops".to_string(),
            None => "stop sequence contains points without coordinates".to_string(),
        };

        warn!(reason = %failure, "road routing degraded; using straight-line path");
        (straight_line_path(stops), PathKind::StraightLine)
    }
}
