//! Domain Adapters
//!
//! Implementations of domain ports on top of the repositories.
//!
//! ```rust,ignore
//! use infra_db::adapters::PgClaimStore;
//! use domain_claims::ClaimStore;
//! use std::sync::Arc;
//!
//! let store: Arc<dyn ClaimStore> = Arc::new(PgClaimStore::new(pool));
//! ```

pub mod claims;

pub use claims::PgClaimStore;
