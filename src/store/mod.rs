//! Pickup-request storage.
//!
//! Workflows and handlers only see the [`PickupStore`] port so that a durable
//! backend can replace the in-memory list without touching them.

mod memory;

pub use memory::InMemoryPickupStore;

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::pickup::{NewPickupRequest, PickupRequest};

#[async_trait]
pub trait PickupStore: Send + Sync {
    /// Validates presence of the required fields and stores a new `Pending`
    /// record. Nothing is stored when validation fails.
    async fn create(&self, request: NewPickupRequest) -> Result<PickupRequest, AppError>;

    /// All records in creation order.
    async fn list(&self) -> Result<Vec<PickupRequest>, AppError>;

    /// Marks a record `Accepted`. Re-accepting is a no-op.
    async fn accept(&self, id: i64) -> Result<PickupRequest, AppError>;
}
