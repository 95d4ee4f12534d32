//! PostgreSQL ClaimStore adapter
//!
//! Every multi-statement operation runs in one transaction. Guarded claim
//! updates lock the row with `SELECT ... FOR UPDATE` first so a concurrent
//! writer either waits or is reported as a version conflict; the `UPDATE`
//! repeats the version check in its `WHERE` clause.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::{debug, instrument};
use uuid::Uuid;

use core_kernel::{
    AdapterHealth, ClaimId, DomainPort, HealthCheckResult, HealthCheckable, PortError,
    ShipOwnerId, UserId, VoyageId,
};
use domain_claims::{
    AssignmentChange, AssignmentOutcome, Claim, ClaimActivityLog, ClaimQuery, ClaimStore,
    Comment, Document, PortActivity, ShipOwner, User, Voyage, VoyageAssignment, VoyageQuery,
};

use crate::error::DatabaseError;
use crate::repositories::{
    ClaimsRepository, PortActivityRepository, ThreadRepository, UserRepository, VoyageRepository,
};

const ADAPTER_ID: &str = "postgres-claim-store";

/// PostgreSQL-backed implementation of [`ClaimStore`]
#[derive(Debug, Clone)]
pub struct PgClaimStore {
    pool: PgPool,
    users: UserRepository,
    voyages: VoyageRepository,
    claims: ClaimsRepository,
    threads: ThreadRepository,
    port_activities: PortActivityRepository,
}

impl PgClaimStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            voyages: VoyageRepository::new(pool.clone()),
            claims: ClaimsRepository::new(pool.clone()),
            threads: ThreadRepository::new(pool.clone()),
            port_activities: PortActivityRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl DomainPort for PgClaimStore {}

#[async_trait]
impl HealthCheckable for PgClaimStore {
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();
        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await;
        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(_) => HealthCheckResult {
                adapter_id: ADAPTER_ID.to_string(),
                status: AdapterHealth::Healthy,
                latency_ms,
                message: None,
                checked_at: Utc::now(),
            },
            Err(e) => HealthCheckResult {
                adapter_id: ADAPTER_ID.to_string(),
                status: AdapterHealth::Unhealthy,
                latency_ms,
                message: Some(format!("Database error: {}", e)),
                checked_at: Utc::now(),
            },
        }
    }
}

fn port(error: impl Into<DatabaseError>) -> PortError {
    let error: DatabaseError = error.into();
    error.into()
}

#[async_trait]
impl ClaimStore for PgClaimStore {
    async fn get_user(&self, id: UserId) -> Result<User, PortError> {
        self.users.get_user(id.into()).await.map_err(port)
    }

    async fn save_user(&self, user: &User) -> Result<(), PortError> {
        self.users.upsert_user(user).await.map_err(port)
    }

    async fn get_ship_owner(&self, id: ShipOwnerId) -> Result<ShipOwner, PortError> {
        self.users.get_ship_owner(id.into()).await.map_err(port)
    }

    async fn save_ship_owner(&self, owner: &ShipOwner) -> Result<(), PortError> {
        self.users.upsert_ship_owner(owner).await.map_err(port)
    }

    async fn get_voyage(&self, id: VoyageId) -> Result<Voyage, PortError> {
        self.voyages.get(id.into()).await.map_err(port)
    }

    #[instrument(skip_all, fields(voyage_id = %voyage.id))]
    async fn insert_voyage(&self, voyage: &Voyage) -> Result<(), PortError> {
        self.voyages.insert(voyage).await.map_err(port)
    }

    async fn find_voyages(&self, query: &VoyageQuery) -> Result<Vec<Voyage>, PortError> {
        self.voyages.find(query).await.map_err(port)
    }

    #[instrument(skip_all, fields(voyage_id = %change.voyage.id))]
    async fn apply_assignment(&self, change: &AssignmentChange) -> Result<AssignmentOutcome, PortError> {
        let analyst = change
            .voyage
            .assigned_analyst_id
            .ok_or_else(|| PortError::validation("assignment requires an analyst"))?;
        let voyage_id = Uuid::from(change.voyage.id);

        let mut tx = self.pool.begin().await.map_err(port)?;
        VoyageRepository::update_assignment(&mut tx, &change.voyage)
            .await
            .map_err(port)?;
        let closed = VoyageRepository::close_active_assignment(&mut tx, voyage_id, change.at)
            .await
            .map_err(port)?;
        VoyageRepository::insert_assignment(&mut tx, &change.assignment)
            .await
            .map_err(port)?;
        let cascaded = ClaimsRepository::cascade_assignee(&mut tx, voyage_id, analyst.into(), change.at)
            .await
            .map_err(port)?;
        tx.commit().await.map_err(port)?;

        debug!(closed, cascaded = cascaded.len(), "assignment applied");
        Ok(AssignmentOutcome {
            cascaded_claims: cascaded,
        })
    }

    async fn assignment_history(&self, voyage_id: VoyageId) -> Result<Vec<VoyageAssignment>, PortError> {
        self.voyages
            .assignment_history(voyage_id.into())
            .await
            .map_err(port)
    }

    async fn insert_port_activity(&self, activity: &PortActivity) -> Result<(), PortError> {
        self.port_activities.insert(activity).await.map_err(port)
    }

    async fn list_port_activities(&self, voyage_id: VoyageId) -> Result<Vec<PortActivity>, PortError> {
        self.port_activities
            .list_for_voyage(voyage_id.into())
            .await
            .map_err(port)
    }

    async fn get_claim(&self, id: ClaimId) -> Result<Claim, PortError> {
        self.claims.get_by_id(id.into()).await.map_err(port)
    }

    async fn find_claims(&self, query: &ClaimQuery) -> Result<Vec<Claim>, PortError> {
        self.claims.find(query).await.map_err(port)
    }

    async fn latest_claim_number(&self, prefix: &str) -> Result<Option<String>, PortError> {
        self.claims.latest_number(prefix).await.map_err(port)
    }

    #[instrument(skip_all, fields(claim_number = %claim.claim_number))]
    async fn insert_claim(&self, claim: &Claim, activity: &[ClaimActivityLog]) -> Result<(), PortError> {
        let mut tx = self.pool.begin().await.map_err(port)?;
        ClaimsRepository::insert(&mut tx, claim).await.map_err(port)?;
        ThreadRepository::append_activity(&mut tx, activity)
            .await
            .map_err(port)?;
        tx.commit().await.map_err(port)
    }

    #[instrument(skip_all, fields(claim_number = %claim.claim_number, expected_version = expected_version))]
    async fn update_claim(
        &self,
        claim: &Claim,
        expected_version: i64,
        activity: &[ClaimActivityLog],
    ) -> Result<(), PortError> {
        let id = Uuid::from(claim.id);
        let conflict = |found: i64| {
            PortError::version_conflict("Claim", &claim.claim_number, expected_version, found)
        };

        let mut tx = self.pool.begin().await.map_err(port)?;
        let found = ClaimsRepository::lock_version(&mut tx, id).await.map_err(port)?;
        if found != expected_version {
            return Err(conflict(found));
        }
        if !ClaimsRepository::update_guarded(&mut tx, claim, expected_version)
            .await
            .map_err(port)?
        {
            return Err(conflict(found));
        }
        ThreadRepository::append_activity(&mut tx, activity)
            .await
            .map_err(port)?;
        tx.commit().await.map_err(port)
    }

    #[instrument(skip_all, fields(claim_id = %id))]
    async fn delete_claim(&self, id: ClaimId, activity: &ClaimActivityLog) -> Result<(), PortError> {
        let mut tx = self.pool.begin().await.map_err(port)?;
        ThreadRepository::append_activity(&mut tx, std::slice::from_ref(activity))
            .await
            .map_err(port)?;
        ClaimsRepository::delete(&mut tx, id.into()).await.map_err(port)?;
        tx.commit().await.map_err(port)
    }

    async fn add_comment(&self, comment: &Comment) -> Result<(), PortError> {
        self.threads.insert_comment(comment).await.map_err(port)
    }

    async fn list_comments(&self, claim_id: ClaimId) -> Result<Vec<Comment>, PortError> {
        self.threads.list_comments(claim_id.into()).await.map_err(port)
    }

    async fn add_document(&self, document: &Document) -> Result<(), PortError> {
        self.threads.insert_document(document).await.map_err(port)
    }

    async fn list_documents(&self, claim_id: ClaimId) -> Result<Vec<Document>, PortError> {
        self.threads.list_documents(claim_id.into()).await.map_err(port)
    }

    async fn list_activity(&self, claim_id: ClaimId) -> Result<Vec<ClaimActivityLog>, PortError> {
        self.threads.list_activity(claim_id.into()).await.map_err(port)
    }
}
