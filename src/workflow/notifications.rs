use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::models::pickup::{GoodsType, PickupRequest, PickupStatus};
use crate::models::point::GeoPoint;
use crate::store::PickupStore;

/// A pending pickup request as shown to the operator.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Notification {
    pub request_id: i64,
    pub seller_name: String,
    pub address: String,
    pub weight: f64,
    pub goods_type: GoodsType,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

impl Notification {
    pub fn position(&self) -> Option<GeoPoint> {
        GeoPoint::checked(self.lat?, self.lng?)
    }
}

impl From<&PickupRequest> for Notification {
    fn from(request: &PickupRequest) -> Self {
        Self {
            request_id: request.id,
            seller_name: request.seller_name.clone(),
            address: request.address.clone(),
            weight: request.weight,
            goods_type: request.goods_type,
            lat: request.lat,
            lng: request.lng,
        }
    }
}

/// Result of one poll. A snapshot with a higher `seq` wholly replaces any
/// earlier one. `polled_at` is when the poll was issued, not when it landed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationSnapshot {
    pub seq: u64,
    pub polled_at: Option<Instant>,
    pub notifications: Vec<Notification>,
}

pub fn pending_notifications(requests: &[PickupRequest]) -> Vec<Notification> {
    requests
        .iter()
        .filter(|request| request.status == PickupStatus::Pending)
        .map(Notification::from)
        .collect()
}

/// Standing background task polling the store for pending requests.
pub struct NotificationFeed {
    snapshot_rx: watch::Receiver<NotificationSnapshot>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl NotificationFeed {
    pub fn spawn(store: Arc<dyn PickupStore>, interval: Duration, call_timeout: Duration) -> Self {
        let (snapshot_tx, snapshot_rx) = watch::channel(NotificationSnapshot::default());
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(run_feed(
            store,
            interval,
            call_timeout,
            snapshot_tx,
            shutdown_rx,
        ));

        Self {
            snapshot_rx,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<NotificationSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Stops polling and waits for the task to exit.
    pub async fn shutdown(mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                warn!(error = %err, "notification feed task failed");
            }
        }
    }
}

impl Drop for NotificationFeed {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run_feed(
    store: Arc<dyn PickupStore>,
    interval: Duration,
    call_timeout: Duration,
    snapshot_tx: watch::Sender<NotificationSnapshot>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut ticks = IntervalStream::new(ticker);
    let mut seq = 0_u64;

    info!(interval_ms = interval.as_millis() as u64, "notification feed started");

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => break,
            tick = ticks.next() => {
                if tick.is_none() {
                    break;
                }

                let polled_at = Instant::now();
                let listed = match time::timeout(call_timeout, store.list()).await {
                    Ok(listed) => listed,
                    Err(_) => Err(AppError::Upstream(format!(
                        "pickup store did not answer within {call_timeout:?}"
                    ))),
                };

                match listed {
                    Ok(requests) => {
                        seq += 1;
                        let notifications = pending_notifications(&requests);
                        debug!(seq, pending = notifications.len(), "notifications refreshed");
                        snapshot_tx.send_replace(NotificationSnapshot {
                            seq,
                            polled_at: Some(polled_at),
                            notifications,
                        });
                    }
                    Err(err) => warn!(error = %err, "notification poll failed; keeping last snapshot"),
                }
            }
        }
    }

    info!("notification feed stopped");
}
