//! Repository implementations for the claims schema
//!
//! Each repository owns the SQL for one group of tables and maps rows to
//! domain types. Read methods use the pool; writes that must share a
//! transaction take a `&mut PgConnection` so the adapter can compose them.
//!
//! Enumerations travel as TEXT and are parsed back with `FromStr`, so a
//! value the domain does not know surfaces as [`DatabaseError::CorruptValue`].
//!
//! [`DatabaseError::CorruptValue`]: crate::error::DatabaseError::CorruptValue

pub mod users;
pub mod voyages;
pub mod claims;
pub mod threads;
pub mod port_activities;

pub use users::UserRepository;
pub use voyages::VoyageRepository;
pub use claims::ClaimsRepository;
pub use threads::ThreadRepository;
pub use port_activities::PortActivityRepository;

use std::str::FromStr;

use crate::error::DatabaseError;

/// Parses a TEXT column into a domain enum
pub(crate) fn parse_column<T>(column: &str, value: &str) -> Result<T, DatabaseError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e| DatabaseError::corrupt(column, e))
}

/// Parses an optional TEXT column
pub(crate) fn parse_optional<T>(column: &str, value: Option<&str>) -> Result<Option<T>, DatabaseError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.map(|v| parse_column(column, v)).transpose()
}
