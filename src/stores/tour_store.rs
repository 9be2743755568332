use super::{TourPage, TourStore};
use crate::errors::AppError;
use crate::models::Tour;
use crate::schema::tours;
use crate::PgPool;
use async_trait::async_trait;
use diesel::prelude::*;
use tracing::{error, instrument};

/// Postgres-backed tour catalog access.
///
/// Pages are keyset-continued on `tour_id` (the primary key), so following
/// `last_evaluated_id` over a static table walks every row exactly once. One
/// extra row is fetched per page to learn whether a continuation exists
/// without a second count query.
pub struct DieselTourStore {
    pool: PgPool,
}

impl DieselTourStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_page(
        &self,
        place: Option<String>,
        limit: u64,
        exclusive_start: Option<String>,
    ) -> Result<TourPage, AppError> {
        let conn = self.pool.get().await.map_err(|e| {
            error!("Failed to get database connection: {}", e);
            AppError::DbPoolError(format!("Connection pool error: {e}"))
        })?;

        // Fetch one row past the page to detect whether more pages exist.
        let fetch_limit = (limit + 1) as i64;

        let mut rows: Vec<Tour> = conn
            .interact(move |conn| {
                let mut query = tours::table
                    .order(tours::tour_id.asc())
                    .limit(fetch_limit)
                    .into_boxed();
                if let Some(place) = place {
                    query = query.filter(tours::place.eq(place));
                }
                if let Some(start) = exclusive_start {
                    query = query.filter(tours::tour_id.gt(start));
                }
                query.select(Tour::as_select()).load(conn)
            })
            .await
            .map_err(|e| {
                error!("Database interaction error when loading tours: {}", e);
                AppError::DbInteractError(format!("Failed to load tours: {e}"))
            })?
            .map_err(|e| {
                error!("Diesel error when loading tours: {}", e);
                AppError::DatabaseQueryError(format!("Failed to load tours: {e}"))
            })?;

        let last_evaluated_id = if rows.len() as u64 > limit {
            rows.truncate(limit as usize);
            rows.last().map(|tour| tour.tour_id.clone())
        } else {
            None
        };

        Ok(TourPage {
            tours: rows,
            last_evaluated_id,
        })
    }
}

#[async_trait]
impl TourStore for DieselTourStore {
    #[instrument(skip(self), fields(place, limit))]
    async fn query_by_place(
        &self,
        place: &str,
        limit: u64,
        exclusive_start: Option<String>,
    ) -> Result<TourPage, AppError> {
        self.load_page(Some(place.to_string()), limit, exclusive_start)
            .await
    }

    #[instrument(skip(self), fields(limit))]
    async fn scan(
        &self,
        limit: u64,
        exclusive_start: Option<String>,
    ) -> Result<TourPage, AppError> {
        self.load_page(None, limit, exclusive_start).await
    }

    #[instrument(skip(self), fields(tour_id))]
    async fn find_by_id(&self, tour_id: &str) -> Result<Option<Tour>, AppError> {
        let conn = self.pool.get().await.map_err(|e| {
            error!("Failed to get database connection: {}", e);
            AppError::DbPoolError(format!("Connection pool error: {e}"))
        })?;

        let tour_id = tour_id.to_string();
        conn.interact(move |conn| {
            tours::table
                .filter(tours::tour_id.eq(tour_id))
                .select(Tour::as_select())
                .first(conn)
                .optional()
        })
        .await
        .map_err(|e| {
            error!("Database interaction error when finding tour: {}", e);
            AppError::DbInteractError(format!("Failed to find tour: {e}"))
        })?
        .map_err(|e| {
            error!("Diesel error when finding tour: {}", e);
            AppError::DatabaseQueryError(format!("Failed to find tour: {e}"))
        })
    }
}
