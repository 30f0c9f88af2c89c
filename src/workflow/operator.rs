use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, Instant};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::AppError;
use crate::models::point::DeliveryPoint;
use crate::outbound::Collaborators;
use crate::store::PickupStore;
use crate::workflow::estimator::EmissionEstimator;
use crate::workflow::notifications::{Notification, NotificationFeed, NotificationSnapshot};
use crate::workflow::route::RouteAssembly;

/// The logistics operator's dashboard state.
///
/// Notifications change only through [`apply_snapshot`](Self::apply_snapshot)
/// and [`accept_notification`](Self::accept_notification); the route through
/// [`RouteAssembly`].
pub struct OperatorSession {
    store: Arc<dyn PickupStore>,
    route: Arc<RouteAssembly>,
    snapshots: watch::Receiver<NotificationSnapshot>,
    notifications: Vec<Notification>,
    applied_seq: u64,
    /// Requests accepted here, by when the store confirmed them.
    accepted: HashMap<i64, Instant>,
    call_timeout: Duration,
}

impl OperatorSession {
    pub fn new(
        store: Arc<dyn PickupStore>,
        route: Arc<RouteAssembly>,
        snapshots: watch::Receiver<NotificationSnapshot>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            store,
            route,
            snapshots,
            notifications: Vec::new(),
            applied_seq: 0,
            accepted: HashMap::new(),
            call_timeout,
        }
    }

    pub fn route(&self) -> &Arc<RouteAssembly> {
        &self.route
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    /// Pulls the newest polled snapshot, if one arrived since the last call.
    pub fn refresh_notifications(&mut self) -> bool {
        let snapshot = self.snapshots.borrow_and_update().clone();
        self.apply_snapshot(snapshot)
    }

    /// Replaces the notification list with a newer snapshot; older or
    /// already-applied snapshots are ignored.
    ///
    /// A poll issued before a local accept can land after it. Requests
    /// accepted since the poll went out are dropped from its snapshot.
    pub fn apply_snapshot(&mut self, snapshot: NotificationSnapshot) -> bool {
        if snapshot.seq <= self.applied_seq {
            return false;
        }
        self.applied_seq = snapshot.seq;

        if let Some(polled_at) = snapshot.polled_at {
            self.accepted.retain(|_, accepted_at| *accepted_at >= polled_at);
        }
        let mut notifications = snapshot.notifications;
        notifications.retain(|notification| !self.accepted.contains_key(&notification.request_id));
        self.notifications = notifications;
        true
    }

    /// Accepts a pending request and promotes it into the active point set.
    ///
    /// Requests without verified coordinates are refused before the store is
    /// touched.
    pub async fn accept_notification(&mut self, request_id: i64) -> Result<DeliveryPoint, AppError> {
        let notification = self
            .notifications
            .iter()
            .find(|notification| notification.request_id == request_id)
            .ok_or_else(|| AppError::NotFound(format!("notification {request_id} not found")))?;

        if notification.position().is_none() {
            return Err(AppError::LocationUnverified);
        }

        let accepted = match time::timeout(self.call_timeout, self.store.accept(request_id)).await {
            Ok(Ok(accepted)) => accepted,
            Ok(Err(err)) => {
                warn!(request_id, error = %err, "accepting pickup request failed");
                return Err(err);
            }
            Err(_) => {
                warn!(request_id, "pickup store timed out accepting request");
                return Err(AppError::Upstream(format!(
                    "pickup store did not answer within {:?}",
                    self.call_timeout
                )));
            }
        };

        self.accepted.insert(request_id, Instant::now());
        let point = DeliveryPoint::from_request(&accepted).ok_or(AppError::LocationUnverified)?;

        self.notifications
            .retain(|notification| notification.request_id != request_id);
        self.route.add_point(point.clone()).await;

        info!(request_id, point_id = %point.id, "notification accepted into route");
        Ok(point)
    }
}

/// A fully wired operator dashboard: session, its polling feed and the manual
/// emission estimator.
pub struct Dashboard {
    pub session: OperatorSession,
    pub estimator: EmissionEstimator,
    feed: NotificationFeed,
}

impl Dashboard {
    pub fn connect(collaborators: Collaborators, config: &Config) -> Self {
        let feed = NotificationFeed::spawn(
            collaborators.store.clone(),
            config.poll_interval,
            config.http_timeout,
        );
        let route = Arc::new(RouteAssembly::new(
            collaborators.optimizer,
            collaborators.router,
            config.http_timeout,
        ));
        let session = OperatorSession::new(
            collaborators.store,
            route,
            feed.subscribe(),
            config.http_timeout,
        );
        let estimator = EmissionEstimator::spawn(
            collaborators.calculator,
            config.debounce,
            config.http_timeout,
        );

        Self {
            session,
            estimator,
            feed,
        }
    }

    /// Teardown: stops the polling task.
    pub async fn close(self) {
        self.feed.shutdown().await;
    }
}
