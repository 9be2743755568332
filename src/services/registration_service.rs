// src/services/registration_service.rs

//! The registration workflow: the one write path in the system, and the one
//! path that fails loudly instead of degrading.

use crate::errors::AppError;
use crate::models::Registration;
use crate::stores::{RegistrationStore, TourStore};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument};

pub struct RegistrationService {
    tour_store: Arc<dyn TourStore>,
    registration_store: Arc<dyn RegistrationStore>,
}

impl RegistrationService {
    pub fn new(
        tour_store: Arc<dyn TourStore>,
        registration_store: Arc<dyn RegistrationStore>,
    ) -> Self {
        Self {
            tour_store,
            registration_store,
        }
    }

    /// Registers `phone_number` for `tour_id`.
    ///
    /// Fails with `NotFound` when the tour does not exist and `Conflict`
    /// when the pair is already registered. The early duplicate check gives
    /// a fast, friendly failure; the `insert_if_absent` write is what
    /// actually enforces uniqueness when two registrations race past the
    /// check together.
    #[instrument(skip(self), fields(tour_id, phone_number))]
    pub async fn register_tour(
        &self,
        tour_id: &str,
        phone_number: &str,
    ) -> Result<Registration, AppError> {
        let tour_id = tour_id.trim();
        let phone_number = phone_number.trim();
        if tour_id.is_empty() {
            return Err(AppError::InvalidInput("tourId is required".to_string()));
        }
        if phone_number.is_empty() {
            return Err(AppError::InvalidInput("phoneNumber is required".to_string()));
        }

        let tour = self
            .tour_store
            .find_by_id(tour_id)
            .await?
            .ok_or_else(|| AppError::NotFound("tour not found".to_string()))?;

        if self
            .registration_store
            .find(tour_id, phone_number)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict("tour is registered".to_string()));
        }

        let registration = Registration {
            tour_id: tour_id.to_string(),
            phone_number: phone_number.to_string(),
            create_at: Utc::now().timestamp(),
            start_date: tour.start_date,
        };

        let inserted = self
            .registration_store
            .insert_if_absent(registration.clone())
            .await?;
        if !inserted {
            // A concurrent registration won the conditional write.
            return Err(AppError::Conflict("tour is registered".to_string()));
        }

        info!(tour_id = %registration.tour_id, "Registration created");
        Ok(registration)
    }
}
