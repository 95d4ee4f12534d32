//! In-memory ClaimStore adapter
//!
//! Keeps all state behind one `tokio::sync::RwLock`, so every trait call is
//! a single critical section and gets the same all-or-nothing behaviour the
//! PostgreSQL adapter gets from a transaction. Used by tests and by the
//! server's `memory` storage backend.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::RwLock;

use core_kernel::{
    ClaimId, DomainPort, HealthCheckResult, HealthCheckable, PortError, ShipOwnerId, UserId,
    VoyageId,
};
use crate::activity::ClaimActivityLog;
use crate::authz::User;
use crate::claim::Claim;
use crate::port_activity::PortActivity;
use crate::ports::{paginate, AssignmentChange, AssignmentOutcome, ClaimQuery, ClaimStore, VoyageQuery};
use crate::thread::{Comment, Document};
use crate::voyage::{ShipOwner, Voyage, VoyageAssignment};

#[derive(Debug, Default)]
struct State {
    users: HashMap<UserId, User>,
    owners: HashMap<ShipOwnerId, ShipOwner>,
    voyages: HashMap<VoyageId, Voyage>,
    assignments: Vec<VoyageAssignment>,
    port_activities: Vec<PortActivity>,
    claims: HashMap<ClaimId, Claim>,
    comments: Vec<Comment>,
    documents: Vec<Document>,
    activity: Vec<ClaimActivityLog>,
}

impl State {
    fn check_claim_uniqueness(&self, claim: &Claim) -> Result<(), PortError> {
        for other in self.claims.values().filter(|c| c.id != claim.id) {
            if other.claim_number == claim.claim_number {
                return Err(PortError::duplicate("Claim", "claim_number", &claim.claim_number));
            }
            if let (Some(mine), Some(theirs)) = (&claim.external_id, &other.external_id) {
                if mine == theirs {
                    return Err(PortError::duplicate("Claim", "external_id", mine));
                }
            }
        }
        Ok(())
    }

    fn check_claim_references(&self, claim: &Claim) -> Result<(), PortError> {
        if !self.voyages.contains_key(&claim.voyage_id) {
            return Err(PortError::validation_field(
                format!("voyage {} does not exist", claim.voyage_id),
                "voyage_id",
            ));
        }
        for user in [claim.assigned_to, claim.created_by].into_iter().flatten() {
            if !self.users.contains_key(&user) {
                return Err(PortError::validation(format!("user {} does not exist", user)));
            }
        }
        Ok(())
    }
}

/// In-memory implementation of [`ClaimStore`]
#[derive(Debug, Default)]
pub struct InMemoryClaimStore {
    state: RwLock<State>,
    forced_number_collisions: AtomicU32,
}

impl InMemoryClaimStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` claim inserts fail as claim-number collisions,
    /// as if another writer had taken the number first
    pub fn inject_claim_number_collisions(&self, count: u32) {
        self.forced_number_collisions.store(count, Ordering::SeqCst);
    }

    fn take_forced_collision(&self) -> bool {
        self.forced_number_collisions
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    /// Overwrites a stored claim without any checks, standing in for a
    /// concurrent writer
    pub async fn overwrite_claim(&self, claim: Claim) {
        self.state.write().await.claims.insert(claim.id, claim);
    }

    /// Every activity entry in insertion order, including orphaned ones
    pub async fn all_activity(&self) -> Vec<ClaimActivityLog> {
        self.state.read().await.activity.clone()
    }
}

impl DomainPort for InMemoryClaimStore {}

#[async_trait]
impl HealthCheckable for InMemoryClaimStore {
    async fn health_check(&self) -> HealthCheckResult {
        let mut result = HealthCheckResult::healthy("memory-claim-store");
        result.message = Some("In-memory adapter always healthy".to_string());
        result
    }
}

#[async_trait]
impl ClaimStore for InMemoryClaimStore {
    async fn get_user(&self, id: UserId) -> Result<User, PortError> {
        self.state
            .read()
            .await
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("User", id))
    }

    async fn save_user(&self, user: &User) -> Result<(), PortError> {
        let mut state = self.state.write().await;
        if state
            .users
            .values()
            .any(|u| u.id != user.id && u.username == user.username)
        {
            return Err(PortError::duplicate("User", "username", &user.username));
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_ship_owner(&self, id: ShipOwnerId) -> Result<ShipOwner, PortError> {
        self.state
            .read()
            .await
            .owners
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("ShipOwner", id))
    }

    async fn save_ship_owner(&self, owner: &ShipOwner) -> Result<(), PortError> {
        let mut state = self.state.write().await;
        if let Some(other) = state
            .owners
            .values()
            .find(|o| o.id != owner.id && (o.name == owner.name || o.code == owner.code))
        {
            let field = if other.name == owner.name { "name" } else { "code" };
            return Err(PortError::duplicate("ShipOwner", field, &owner.name));
        }
        state.owners.insert(owner.id, owner.clone());
        Ok(())
    }

    async fn get_voyage(&self, id: VoyageId) -> Result<Voyage, PortError> {
        self.state
            .read()
            .await
            .voyages
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("Voyage", id))
    }

    async fn insert_voyage(&self, voyage: &Voyage) -> Result<(), PortError> {
        let mut state = self.state.write().await;
        if state.voyages.values().any(|v| v.external_id == voyage.external_id) {
            return Err(PortError::duplicate("Voyage", "external_id", &voyage.external_id));
        }
        if !state.owners.contains_key(&voyage.ship_owner_id) {
            return Err(PortError::validation_field(
                format!("ship owner {} does not exist", voyage.ship_owner_id),
                "ship_owner_id",
            ));
        }
        state.voyages.insert(voyage.id, voyage.clone());
        Ok(())
    }

    async fn find_voyages(&self, query: &VoyageQuery) -> Result<Vec<Voyage>, PortError> {
        let state = self.state.read().await;
        let mut voyages: Vec<Voyage> = state
            .voyages
            .values()
            .filter(|v| query.matches(v))
            .cloned()
            .collect();
        voyages.sort_by(|a, b| b.laycan_start.cmp(&a.laycan_start).then(a.voyage_number.cmp(&b.voyage_number)));
        Ok(paginate(voyages, query.limit, query.offset))
    }

    async fn apply_assignment(&self, change: &AssignmentChange) -> Result<AssignmentOutcome, PortError> {
        let mut state = self.state.write().await;
        let voyage = &change.voyage;
        if !state.voyages.contains_key(&voyage.id) {
            return Err(PortError::not_found("Voyage", voyage.id));
        }
        let analyst = voyage
            .assigned_analyst_id
            .ok_or_else(|| PortError::validation("assignment requires an analyst"))?;

        state.voyages.insert(voyage.id, voyage.clone());

        for record in state
            .assignments
            .iter_mut()
            .filter(|a| a.voyage_id == voyage.id && a.is_active)
        {
            record.close(change.at);
        }
        state.assignments.push(change.assignment.clone());

        let mut cascaded = Vec::new();
        for claim in state
            .claims
            .values_mut()
            .filter(|c| c.voyage_id == voyage.id && c.assigned_to.is_none())
        {
            claim.assigned_to = Some(analyst);
            claim.version += 1;
            claim.updated_at = change.at;
            cascaded.push(claim.id);
        }

        Ok(AssignmentOutcome {
            cascaded_claims: cascaded,
        })
    }

    async fn assignment_history(&self, voyage_id: VoyageId) -> Result<Vec<VoyageAssignment>, PortError> {
        let state = self.state.read().await;
        Ok(state
            .assignments
            .iter()
            .filter(|a| a.voyage_id == voyage_id)
            .cloned()
            .collect())
    }

    async fn insert_port_activity(&self, activity: &PortActivity) -> Result<(), PortError> {
        let mut state = self.state.write().await;
        if !state.voyages.contains_key(&activity.voyage_id) {
            return Err(PortError::not_found("Voyage", activity.voyage_id));
        }
        state.port_activities.push(activity.clone());
        Ok(())
    }

    async fn list_port_activities(&self, voyage_id: VoyageId) -> Result<Vec<PortActivity>, PortError> {
        let state = self.state.read().await;
        let mut activities: Vec<PortActivity> = state
            .port_activities
            .iter()
            .filter(|a| a.voyage_id == voyage_id)
            .cloned()
            .collect();
        activities.sort_by(|a, b| a.start_at.cmp(&b.start_at).then(a.id.cmp(&b.id)));
        Ok(activities)
    }

    async fn get_claim(&self, id: ClaimId) -> Result<Claim, PortError> {
        self.state
            .read()
            .await
            .claims
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("Claim", id))
    }

    async fn find_claims(&self, query: &ClaimQuery) -> Result<Vec<Claim>, PortError> {
        let state = self.state.read().await;
        let mut claims: Vec<Claim> = state
            .claims
            .values()
            .filter(|c| query.matches(c))
            .cloned()
            .collect();
        claims.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.claim_number.cmp(&a.claim_number))
        });
        Ok(paginate(claims, query.limit, query.offset))
    }

    async fn latest_claim_number(&self, prefix: &str) -> Result<Option<String>, PortError> {
        let state = self.state.read().await;
        Ok(state
            .claims
            .values()
            .map(|c| &c.claim_number)
            .filter(|n| n.starts_with(prefix))
            .max()
            .cloned())
    }

    async fn insert_claim(&self, claim: &Claim, activity: &[ClaimActivityLog]) -> Result<(), PortError> {
        let mut state = self.state.write().await;
        if self.take_forced_collision() {
            return Err(PortError::duplicate("Claim", "claim_number", &claim.claim_number));
        }
        if state.claims.contains_key(&claim.id) {
            return Err(PortError::duplicate("Claim", "id", claim.id));
        }
        state.check_claim_uniqueness(claim)?;
        state.check_claim_references(claim)?;

        state.claims.insert(claim.id, claim.clone());
        state.activity.extend_from_slice(activity);
        Ok(())
    }

    async fn update_claim(
        &self,
        claim: &Claim,
        expected_version: i64,
        activity: &[ClaimActivityLog],
    ) -> Result<(), PortError> {
        let mut state = self.state.write().await;
        let found = state
            .claims
            .get(&claim.id)
            .map(|c| c.version)
            .ok_or_else(|| PortError::not_found("Claim", claim.id))?;
        if found != expected_version {
            return Err(PortError::version_conflict("Claim", claim.id, expected_version, found));
        }
        state.check_claim_uniqueness(claim)?;
        state.check_claim_references(claim)?;

        state.claims.insert(claim.id, claim.clone());
        state.activity.extend_from_slice(activity);
        Ok(())
    }

    async fn delete_claim(&self, id: ClaimId, activity: &ClaimActivityLog) -> Result<(), PortError> {
        let mut state = self.state.write().await;
        if state.claims.remove(&id).is_none() {
            return Err(PortError::not_found("Claim", id));
        }
        state.comments.retain(|c| c.claim_id != id);
        state.documents.retain(|d| d.claim_id != id);
        state.activity.push(activity.clone());
        for entry in state.activity.iter_mut().filter(|e| e.claim_id == Some(id)) {
            entry.claim_id = None;
        }
        Ok(())
    }

    async fn add_comment(&self, comment: &Comment) -> Result<(), PortError> {
        let mut state = self.state.write().await;
        if !state.claims.contains_key(&comment.claim_id) {
            return Err(PortError::not_found("Claim", comment.claim_id));
        }
        state.comments.push(comment.clone());
        Ok(())
    }

    async fn list_comments(&self, claim_id: ClaimId) -> Result<Vec<Comment>, PortError> {
        let state = self.state.read().await;
        Ok(state
            .comments
            .iter()
            .filter(|c| c.claim_id == claim_id)
            .cloned()
            .collect())
    }

    async fn add_document(&self, document: &Document) -> Result<(), PortError> {
        let mut state = self.state.write().await;
        if !state.claims.contains_key(&document.claim_id) {
            return Err(PortError::not_found("Claim", document.claim_id));
        }
        state.documents.push(document.clone());
        Ok(())
    }

    async fn list_documents(&self, claim_id: ClaimId) -> Result<Vec<Document>, PortError> {
        let state = self.state.read().await;
        Ok(state
            .documents
            .iter()
            .filter(|d| d.claim_id == claim_id)
            .cloned()
            .collect())
    }

    async fn list_activity(&self, claim_id: ClaimId) -> Result<Vec<ClaimActivityLog>, PortError> {
        let state = self.state.read().await;
        Ok(state
            .activity
            .iter()
            .filter(|e| e.claim_id == Some(claim_id))
            .cloned()
            .collect())
    }
}
