pub mod config;
pub mod errors;
pub mod llm;
pub mod logging;
pub mod models;
pub mod routes;
pub mod schema;
pub mod services;
pub mod state;
pub mod storage;
pub mod stores;
pub mod text_processing;
pub mod vector_db;

use deadpool_diesel::postgres::Pool as DeadpoolPool;

// Define PgPool type alias here for library-wide use
pub type PgPool = DeadpoolPool;

// Re-export AppState for convenience
pub use state::AppState;

// Mock collaborators shared by unit and integration tests
pub mod test_helpers;
