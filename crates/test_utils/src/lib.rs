//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! maritime claims test suite.
//!
//! # Modules
//!
//! - `fixtures`: Users, owners, dates and a seeded service harness
//! - `builders`: Builder patterns for voyage and claim input
//! - `database`: PostgreSQL testcontainer management
//! - `assertions`: Assertion helpers for claims
//! - `generators`: Property-based test data generators

pub mod fixtures;
pub mod builders;
pub mod database;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use database::*;
pub use assertions::*;
pub use generators::*;
