//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the maritime claims system using SQLx.
//!
//! # Architecture
//!
//! - [`repositories`] hold the SQL for each group of tables and map rows to
//!   domain types.
//! - [`adapters::PgClaimStore`] implements the domain's `ClaimStore` port,
//!   composing repository calls into transactions.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PgClaimStore};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/claims")).await?;
//! run_migrations(&pool).await?;
//! let store = PgClaimStore::new(pool);
//! ```

pub mod pool;
pub mod error;
pub mod repositories;
pub mod adapters;

pub use pool::{create_pool, run_migrations, DatabaseConfig, DatabasePool};
pub use error::DatabaseError;
pub use adapters::PgClaimStore;
