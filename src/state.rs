use std::sync::Arc;

use tokio::sync::broadcast;

use crate::models::pickup::PickupEvent;
use crate::observability::metrics::Metrics;
use crate::store::{InMemoryPickupStore, PickupStore};

pub struct AppState {
    pub store: Arc<dyn PickupStore>,
    pub pickup_events_tx: broadcast::Sender<PickupEvent>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(event_buffer_size: usize) -> Self {
        Self::with_store(
            Arc::new(InMemoryPickupStore::new()),
            event_buffer_size,
            Metrics::new(),
        )
    }

    pub fn with_store(
        store: Arc<dyn PickupStore>,
        event_buffer_size: usize,
        metrics: Metrics,
    ) -> Self {
        let (pickup_events_tx, _unused_rx) = broadcast::channel(event_buffer_size);

        Self {
            store,
            pickup_events_tx,
            metrics,
        }
    }
}
