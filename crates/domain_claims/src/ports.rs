//! Storage port for the claims domain
//!
//! A [`ClaimStore`] is the transactional collaborator behind
//! [`crate::service::ClaimService`]. Implementations must guarantee:
//!
//! - `insert_claim` rejects a duplicate claim number or external id with
//!   [`PortError::Duplicate`]; nothing is written.
//! - `update_claim` compares the persisted version with `expected_version`
//!   and writes the claim plus its activity entries in one transaction, or
//!   fails with [`PortError::VersionConflict`] and writes nothing.
//! - `apply_assignment` updates the voyage, closes the active assignment
//!   record, appends the new one and cascades the analyst onto the voyage's
//!   unassigned claims, all in one transaction.
//! - `list_port_activities` returns a voyage's activities in start order.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use core_kernel::{
    ClaimId, DomainPort, HealthCheckable, PortError, ShipOwnerId, UserId, VoyageId,
};
use crate::activity::ClaimActivityLog;
use crate::authz::User;
use crate::claim::{Claim, ClaimStatus, ClaimType, PaymentStatus};
use crate::port_activity::PortActivity;
use crate::thread::{Comment, Document};
use crate::voyage::{AssignmentStatus, ShipOwner, Voyage, VoyageAssignment};

/// Filters for listing claims; unset fields match everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimQuery {
    pub voyage_id: Option<VoyageId>,
    pub ship_owner_id: Option<ShipOwnerId>,
    pub assigned_to: Option<UserId>,
    pub status: Option<ClaimStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub claim_type: Option<ClaimType>,
    pub is_time_barred: Option<bool>,
    /// Deadline on or after this date
    pub deadline_from: Option<NaiveDate>,
    /// Deadline on or before this date
    pub deadline_to: Option<NaiveDate>,
    /// Deadline strictly before this date
    pub deadline_before: Option<NaiveDate>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ClaimQuery {
    pub fn for_voyage(voyage_id: VoyageId) -> Self {
        Self {
            voyage_id: Some(voyage_id),
            ..Default::default()
        }
    }

    /// Whether a claim passes every filter (pagination aside)
    pub fn matches(&self, claim: &Claim) -> bool {
        fn eq<T: PartialEq>(filter: &Option<T>, value: &T) -> bool {
            filter.as_ref().map_or(true, |f| f == value)
        }

        let deadline_ok = |bound: Option<NaiveDate>, test: fn(NaiveDate, NaiveDate) -> bool| match bound {
            None => true,
            Some(bound) => claim.claim_deadline.map_or(false, |d| test(d, bound)),
        };

        eq(&self.voyage_id, &claim.voyage_id)
            && eq(&self.ship_owner_id, &claim.ship_owner_id)
            && self.assigned_to.map_or(true, |a| claim.assigned_to == Some(a))
            && eq(&self.status, &claim.status)
            && eq(&self.payment_status, &claim.payment_status)
            && eq(&self.claim_type, &claim.claim_type)
            && eq(&self.is_time_barred, &claim.is_time_barred)
            && deadline_ok(self.deadline_from, |d, b| d >= b)
            && deadline_ok(self.deadline_to, |d, b| d <= b)
            && deadline_ok(self.deadline_before, |d, b| d < b)
    }
}

/// Filters for listing voyages
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoyageQuery {
    pub ship_owner_id: Option<ShipOwnerId>,
    pub assigned_analyst_id: Option<UserId>,
    pub assignment_status: Option<AssignmentStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl VoyageQuery {
    pub fn matches(&self, voyage: &Voyage) -> bool {
        self.ship_owner_id.map_or(true, |id| voyage.ship_owner_id == id)
            && self
                .assigned_analyst_id
                .map_or(true, |id| voyage.assigned_analyst_id == Some(id))
            && self
                .assignment_status
                .map_or(true, |status| voyage.assignment_status == status)
    }
}

/// Everything needed to apply a voyage assignment atomically
#[derive(Debug, Clone)]
pub struct AssignmentChange {
    /// The voyage with its new analyst already set
    pub voyage: Voyage,
    /// History record to append as the active one
    pub assignment: VoyageAssignment,
    pub at: DateTime<Utc>,
}

/// Result of an applied assignment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentOutcome {
    /// Claims that had no assignee and now carry the voyage's analyst
    pub cascaded_claims: Vec<ClaimId>,
}

/// Applies `offset`/`limit` to an already ordered list
pub fn paginate<T>(items: Vec<T>, limit: Option<i64>, offset: Option<i64>) -> Vec<T> {
    let offset = offset.unwrap_or(0).max(0) as usize;
    let iter = items.into_iter().skip(offset);
    match limit {
        Some(limit) => iter.take(limit.max(0) as usize).collect(),
        None => iter.collect(),
    }
}

/// Transactional storage for users, voyages, claims and their threads
#[async_trait]
pub trait ClaimStore: DomainPort + HealthCheckable {
    // ------------------------------------------------------------------
    // Users and owners
    // ------------------------------------------------------------------

    async fn get_user(&self, id: UserId) -> Result<User, PortError>;

    /// Inserts or replaces a user
    async fn save_user(&self, user: &User) -> Result<(), PortError>;

    async fn get_ship_owner(&self, id: ShipOwnerId) -> Result<ShipOwner, PortError>;

    /// Inserts or replaces a ship owner
    async fn save_ship_owner(&self, owner: &ShipOwner) -> Result<(), PortError>;

    // ------------------------------------------------------------------
    // Voyages
    // ------------------------------------------------------------------

    async fn get_voyage(&self, id: VoyageId) -> Result<Voyage, PortError>;

    /// Fails with `Duplicate` when the external id is taken
    async fn insert_voyage(&self, voyage: &Voyage) -> Result<(), PortError>;

    async fn find_voyages(&self, query: &VoyageQuery) -> Result<Vec<Voyage>, PortError>;

    async fn apply_assignment(&self, change: &AssignmentChange) -> Result<AssignmentOutcome, PortError>;

    /// Assignment records of a voyage, oldest first
    async fn assignment_history(&self, voyage_id: VoyageId) -> Result<Vec<VoyageAssignment>, PortError>;

    /// The activity's voyage must exist
    async fn insert_port_activity(&self, activity: &PortActivity) -> Result<(), PortError>;

    /// Activities of a voyage, earliest start first
    async fn list_port_activities(&self, voyage_id: VoyageId) -> Result<Vec<PortActivity>, PortError>;

    // ------------------------------------------------------------------
    // Claims
    // ------------------------------------------------------------------

    async fn get_claim(&self, id: ClaimId) -> Result<Claim, PortError>;

    /// Matching claims, newest first
    async fn find_claims(&self, query: &ClaimQuery) -> Result<Vec<Claim>, PortError>;

    /// Highest claim number starting with `prefix`
    async fn latest_claim_number(&self, prefix: &str) -> Result<Option<String>, PortError>;

    async fn insert_claim(&self, claim: &Claim, activity: &[ClaimActivityLog]) -> Result<(), PortError>;

    /// Version-guarded write; `claim.version` is the new version
    async fn update_claim(
        &self,
        claim: &Claim,
        expected_version: i64,
        activity: &[ClaimActivityLog],
    ) -> Result<(), PortError>;

    /// Removes the claim with its comments and documents after recording `activity`
    async fn delete_claim(&self, id: ClaimId, activity: &ClaimActivityLog) -> Result<(), PortError>;

    // ------------------------------------------------------------------
    // Threads
    // ------------------------------------------------------------------

    async fn add_comment(&self, comment: &Comment) -> Result<(), PortError>;

    async fn list_comments(&self, claim_id: ClaimId) -> Result<Vec<Comment>, PortError>;

    async fn add_document(&self, document: &Document) -> Result<(), PortError>;

    async fn list_documents(&self, claim_id: ClaimId) -> Result<Vec<Document>, PortError>;

    /// Activity entries of a claim, oldest first
    async fn list_activity(&self, claim_id: ClaimId) -> Result<Vec<ClaimActivityLog>, PortError>;
}
