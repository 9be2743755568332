use super::RegistrationStore;
use crate::errors::AppError;
use crate::models::Registration;
use crate::schema::registrations;
use crate::PgPool;
use async_trait::async_trait;
use diesel::prelude::*;
use tracing::{error, instrument};

pub struct DieselRegistrationStore {
    pool: PgPool,
}

impl DieselRegistrationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RegistrationStore for DieselRegistrationStore {
    #[instrument(skip(self), fields(phone_number))]
    async fn list_by_phone(&self, phone_number: &str) -> Result<Vec<Registration>, AppError> {
        let conn = self.pool.get().await.map_err(|e| {
            error!("Failed to get database connection: {}", e);
            AppError::DbPoolError(format!("Connection pool error: {e}"))
        })?;

        let phone_number = phone_number.to_string();
        conn.interact(move |conn| {
            registrations::table
                .filter(registrations::phone_number.eq(phone_number))
                .order(registrations::create_at.asc())
                .select(Registration::as_select())
                .load(conn)
        })
        .await
        .map_err(|e| {
            error!("Database interaction error when listing registrations: {}", e);
            AppError::DbInteractError(format!("Failed to list registrations: {e}"))
        })?
        .map_err(|e| {
            error!("Diesel error when listing registrations: {}", e);
            AppError::DatabaseQueryError(format!("Failed to list registrations: {e}"))
        })
    }

    #[instrument(skip(self), fields(tour_id, phone_number))]
    async fn find(
        &self,
        tour_id: &str,
        phone_number: &str,
    ) -> Result<Option<Registration>, AppError> {
        let conn = self.pool.get().await.map_err(|e| {
            error!("Failed to get database connection: {}", e);
            AppError::DbPoolError(format!("Connection pool error: {e}"))
        })?;

        let tour_id = tour_id.to_string();
        let phone_number = phone_number.to_string();
        conn.interact(move |conn| {
            registrations::table
                .find((tour_id, phone_number))
                .select(Registration::as_select())
                .first(conn)
                .optional()
        })
        .await
        .map_err(|e| {
            error!("Database interaction error when finding registration: {}", e);
            AppError::DbInteractError(format!("Failed to find registration: {e}"))
        })?
        .map_err(|e| {
            error!("Diesel error when finding registration: {}", e);
            AppError::DatabaseQueryError(format!("Failed to find registration: {e}"))
        })
    }

    #[instrument(skip(self, registration), fields(tour_id = %registration.tour_id))]
    async fn insert_if_absent(&self, registration: Registration) -> Result<bool, AppError> {
        let conn = self.pool.get().await.map_err(|e| {
            error!("Failed to get database connection: {}", e);
            AppError::DbPoolError(format!("Connection pool error: {e}"))
        })?;

        // ON CONFLICT DO NOTHING against the composite primary key: the row
        // count tells us whether this call won the write. Two concurrent
        // registrations for the same pair cannot both see 1 here.
        let inserted = conn
            .interact(move |conn| {
                diesel::insert_into(registrations::table)
                    .values(&registration)
                    .on_conflict_do_nothing()
                    .execute(conn)
            })
            .await
            .map_err(|e| {
                error!("Database interaction error when inserting registration: {}", e);
                AppError::DbInteractError(format!("Failed to insert registration: {e}"))
            })?
            .map_err(|e| {
                error!("Diesel error when inserting registration: {}", e);
                AppError::DatabaseQueryError(format!("Failed to insert registration: {e}"))
            })?;

        Ok(inserted > 0)
    }
}
