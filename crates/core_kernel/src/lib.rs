//! Core Kernel - Foundational types for the maritime claims system
//!
//! This crate provides the building blocks shared by the domain, database
//! and API layers:
//! - Strongly-typed identifiers for users, owners, voyages and claims
//! - Money types with precise decimal arithmetic
//! - A business clock that defines "today" for deadline logic
//! - Port error and health-check infrastructure for adapters

pub mod money;
pub mod clock;
pub mod identifiers;
pub mod error;
pub mod ports;

pub use money::{Money, Currency, MoneyError};
pub use clock::{Clock, SystemClock, FixedClock, Timezone, TemporalError};
pub use identifiers::{
    UserId, ShipOwnerId, VoyageId, AssignmentId, PortActivityId, ClaimId,
    CommentId, DocumentId, ActivityLogId,
};
pub use error::CoreError;
pub use ports::{
    PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth,
};
