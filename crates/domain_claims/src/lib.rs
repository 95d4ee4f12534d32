//! Maritime Claims Domain
//!
//! This crate implements the claim lifecycle for demurrage and post-deal
//! claims raised against ship owners, from draft through settlement and
//! payment, together with the voyages those claims belong to.
//!
//! # Claim Lifecycle
//!
//! ```text
//! DRAFT -> UNDER_REVIEW -> SUBMITTED -> SETTLED | REJECTED
//!
//! NOT_SENT -> SENT -> PARTIALLY_PAID -> PAID
//!     \-> TIMEBAR (deadline passed while NOT_SENT, one-way)
//! ```
//!
//! Every save runs the same pipeline: authorization, validation,
//! [`derive::derive_fields`], the optimistic version guard and a single
//! store transaction that also records the activity trail.

#[macro_use]
mod macros;

pub mod error;
pub mod authz;
pub mod voyage;
pub mod port_activity;
pub mod claim;
pub mod numbering;
pub mod derive;
pub mod activity;
pub mod thread;
pub mod ports;
pub mod memory;
pub mod notification;
pub mod analytics;
pub mod service;
pub mod timebar;

pub use error::ClaimError;
pub use authz::{Action, Capability, CapabilitySet, Resource, Role, User, authorize, can_perform};
pub use voyage::{AssignmentStatus, CharterType, NewVoyage, ShipOwner, Voyage, VoyageAssignment};
pub use port_activity::{
    ActivityCategory, CategorySummary, DateStatus, NewPortActivity, PortActivity, PortActivityTimeline,
};
pub use claim::{Claim, ClaimStatus, ClaimType, CostType, NewClaim, PaymentStatus, StatusChange};
pub use numbering::ClaimNumber;
pub use derive::{derive_fields, Derivation};
pub use activity::{ActivityAction, ClaimActivityLog};
pub use thread::{Comment, Document, DocumentType, NewDocument};
pub use ports::{AssignmentChange, AssignmentOutcome, ClaimQuery, ClaimStore, VoyageQuery};
pub use memory::InMemoryClaimStore;
pub use notification::{LogNotifier, Notification, Notifier, RecordingNotifier};
pub use analytics::ClaimAnalytics;
pub use service::ClaimService;
pub use timebar::{SweepReport, TimebarSweep};
