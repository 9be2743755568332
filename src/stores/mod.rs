//! Structured-store adapters for the tour catalog and registrations.
//!
//! Services depend on the traits here, never on Diesel directly, so tests can
//! substitute in-memory doubles and the registration workflow's conditional
//! write stays a single seam.

pub mod registration_store;
pub mod tour_store;

use crate::errors::AppError;
use crate::models::{Registration, Tour};
use async_trait::async_trait;

pub use registration_store::DieselRegistrationStore;
pub use tour_store::DieselTourStore;

/// One page of a catalog scan or partition query.
///
/// `last_evaluated_id` is the keyset continuation point: present only when
/// the store had more rows past this page. Callers thread it back verbatim
/// into the next request.
#[derive(Debug, Clone)]
pub struct TourPage {
    pub tours: Vec<Tour>,
    pub last_evaluated_id: Option<String>,
}

#[async_trait]
pub trait TourStore: Send + Sync {
    /// Partition query: all tours for one place, paged by tour id.
    async fn query_by_place(
        &self,
        place: &str,
        limit: u64,
        exclusive_start: Option<String>,
    ) -> Result<TourPage, AppError>;

    /// Full catalog scan, paged by tour id.
    async fn scan(&self, limit: u64, exclusive_start: Option<String>)
        -> Result<TourPage, AppError>;

    /// Point lookup via the tour-id index.
    async fn find_by_id(&self, tour_id: &str) -> Result<Option<Tour>, AppError>;
}

#[async_trait]
pub trait RegistrationStore: Send + Sync {
    /// All registrations for a phone number, oldest first.
    async fn list_by_phone(&self, phone_number: &str) -> Result<Vec<Registration>, AppError>;

    async fn find(
        &self,
        tour_id: &str,
        phone_number: &str,
    ) -> Result<Option<Registration>, AppError>;

    /// Conditional write: inserts the registration unless the
    /// (tour_id, phone_number) pair already exists. Returns `false` when the
    /// row was already present. This write, not the read in the workflow
    /// above it, is the uniqueness guarantee under concurrent registration
    /// attempts.
    async fn insert_if_absent(&self, registration: Registration) -> Result<bool, AppError>;
}
