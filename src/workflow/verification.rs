//! Address verification for the seller's pickup form.
//!
//! ```text
//! Unverified --search--> Resolved | Ambiguous | NotFound
//! Ambiguous  --select--> Resolved
//! any state  --edit----> Unverified   (only when the text changes)
//! ```
//!
//! A request can only be submitted from `Resolved`.

use std::time::Duration;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::error::AppError;
use crate::models::geocode::GeocodeCandidate;
use crate::models::pickup::{GoodsType, NewPickupRequest, PickupRequest};
use crate::outbound::{bounded, Geocoder};
use crate::store::PickupStore;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum VerificationState {
    #[default]
    Unverified,
    Resolved(GeocodeCandidate),
    Ambiguous(Vec<GeocodeCandidate>),
    NotFound,
}

#[derive(Debug, Clone, Default)]
pub struct AddressVerification {
    address: String,
    state: VerificationState,
}

impl AddressVerification {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            state: VerificationState::Unverified,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn state(&self) -> &VerificationState {
        &self.state
    }

    pub fn resolved(&self) -> Option<&GeocodeCandidate> {
        match &self.state {
            VerificationState::Resolved(candidate) => Some(candidate),
            _ => None,
        }
    }

    /// Replaces the address text. A changed text invalidates whatever was
    /// verified before.
    pub fn edit_address(&mut self, address: impl Into<String>) {
        let address = address.into();
        if address != self.address {
            self.address = address;
            self.state = VerificationState::Unverified;
        }
    }

    /// Geocodes the current address text.
    ///
    /// Returns `GeocodeAmbiguous` after moving to `Ambiguous`; the caller then
    /// presents [`VerificationState::Ambiguous`] candidates and calls
    /// [`select`](Self::select). `NotFound` is sticky until the text changes.
    pub async fn verify(
        &mut self,
        geocoder: &dyn Geocoder,
        call_timeout: Duration,
    ) -> Result<&GeocodeCandidate, AppError> {
        match &self.state {
            VerificationState::Resolved(_) => return self.resolved_or_internal(),
            VerificationState::NotFound => {
                return Err(AppError::GeocodeNotFound(self.address.clone()));
            }
            VerificationState::Unverified | VerificationState::Ambiguous(_) => {}
        }

        let query = self.address.trim().to_string();
        if query.is_empty() {
            return Err(AppError::BadRequest("address is empty".to_string()));
        }

        let candidates = bounded(call_timeout, geocoder.search(&query))
            .await
            .map_err(|err| {
                warn!(error = %err, address = %query, "geocoding failed");
                AppError::Upstream(format!("geocoder: {err}"))
            })?;

        self.apply_candidates(candidates)
    }

    /// Transition for a completed search.
    pub fn apply_candidates(
        &mut self,
        mut candidates: Vec<GeocodeCandidate>,
    ) -> Result<&GeocodeCandidate, AppError> {
        match candidates.len() {
            0 => {
                info!(address = %self.address, "no location matches address");
                self.state = VerificationState::NotFound;
                Err(AppError::GeocodeNotFound(self.address.clone()))
            }
            1 => {
                let candidate = candidates.remove(0);
                info!(address = %self.address, resolved = %candidate.display_name, "address verified");
                self.state = VerificationState::Resolved(candidate);
                self.resolved_or_internal()
            }
            count => {
                info!(address = %self.address, matches = count, "address is ambiguous");
                self.state = VerificationState::Ambiguous(candidates);
                Err(AppError::GeocodeAmbiguous(count))
            }
        }
    }

    /// Picks one of the ambiguous candidates.
    pub fn select(&mut self, index: usize) -> Result<&GeocodeCandidate, AppError> {
        let VerificationState::Ambiguous(candidates) = &self.state else {
            return Err(AppError::BadRequest(
                "no ambiguous matches to choose from".to_string(),
            ));
        };

        let candidate = candidates.get(index).cloned().ok_or_else(|| {
            AppError::BadRequest(format!(
                "candidate {index} out of range ({} matches)",
                candidates.len()
            ))
        })?;

        self.state = VerificationState::Resolved(candidate);
        self.resolved_or_internal()
    }

    fn resolved_or_internal(&self) -> Result<&GeocodeCandidate, AppError> {
        self.resolved()
            .ok_or_else(|| AppError::Internal("verification is not resolved".to_string()))
    }
}

/// The seller's pickup-request form.
#[derive(Debug, Clone, Default)]
pub struct PickupForm {
    pub seller_name: String,
    pub phone: String,
    pub email: String,
    pub weight: Option<f64>,
    pub goods_type: GoodsType,
    pub date: Option<NaiveDate>,
    location: AddressVerification,
}

impl PickupForm {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            location: AddressVerification::new(address),
            ..Self::default()
        }
    }

    pub fn location(&self) -> &AddressVerification {
        &self.location
    }

    pub fn location_mut(&mut self) -> &mut AddressVerification {
        &mut self.location
    }

    pub fn set_address(&mut self, address: impl Into<String>) {
        self.location.edit_address(address);
    }

    /// Create payload carrying the verified coordinates.
    pub fn to_request(&self) -> Result<NewPickupRequest, AppError> {
        let resolved = self.location.resolved().ok_or(AppError::LocationUnverified)?;

        Ok(NewPickupRequest {
            seller_name: Some(self.seller_name.clone()),
            phone: Some(self.phone.clone()),
            email: Some(self.email.clone()),
            address: Some(self.location.address().to_string()),
            weight: self.weight,
            goods_type: Some(self.goods_type),
            date: self.date,
            lat: Some(resolved.lat),
            lng: Some(resolved.lng),
        })
    }

    pub async fn submit(&self, store: &dyn PickupStore) -> Result<PickupRequest, AppError> {
        let request = self.to_request()?;
        store.create(request).await.inspect_err(|err| {
            warn!(error = %err, "pickup request submission failed");
        })
    }
}
