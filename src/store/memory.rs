use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use crate::error::AppError;
use crate::models::pickup::{NewPickupRequest, PickupRequest, PickupStatus};
use crate::store::PickupStore;

/// Process-lifetime store. A restart loses every request.
#[derive(Default)]
pub struct InMemoryPickupStore {
    requests: DashMap<i64, PickupRequest>,
    last_id: AtomicI64,
}

impl InMemoryPickupStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with existing records; new ids continue after the
    /// highest seeded one.
    pub fn with_records(records: impl IntoIterator<Item = PickupRequest>) -> Self {
        let store = Self::new();
        for record in records {
            store.last_id.fetch_max(record.id, Ordering::AcqRel);
            store.requests.insert(record.id, record);
        }
        store
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Millisecond creation timestamp, bumped past the previous id when two
    /// requests land in the same millisecond.
    fn next_id(&self, now_ms: i64) -> i64 {
        let mut current = self.last_id.load(Ordering::Relaxed);
        loop {
            let candidate = now_ms.max(current + 1);
            match self.last_id.compare_exchange_weak(
                current,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return candidate,
                Err(actual) => current = actual,
            }
        }
    }
}

#[async_trait]
impl PickupStore for InMemoryPickupStore {
    async fn create(&self, request: NewPickupRequest) -> Result<PickupRequest, AppError> {
        let valid = request.validate().map_err(AppError::Validation)?;

        let created_at = Utc::now();
        let record = PickupRequest {
            id: self.next_id(created_at.timestamp_millis()),
            seller_name: valid.seller_name,
            phone: valid.phone,
            email: valid.email,
            address: valid.address,
            weight: valid.weight,
            goods_type: valid.goods_type,
            date: valid.date,
            lat: valid.lat,
            lng: valid.lng,
            status: PickupStatus::Pending,
            created_at,
        };

        self.requests.insert(record.id, record.clone());
        Ok(record)
    }

    async fn list(&self) -> Result<Vec<PickupRequest>, AppError> {
        let mut requests: Vec<PickupRequest> = self
            .requests
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        requests.sort_by_key(|request| request.id);
        Ok(requests)
    }

    async fn accept(&self, id: i64) -> Result<PickupRequest, AppError> {
        let mut request = self
            .requests
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("pickup request {id} not found")))?;

        request.status = PickupStatus::Accepted;
        Ok(request.clone())
    }
}
