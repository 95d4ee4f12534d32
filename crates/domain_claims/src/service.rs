//! Claim application service
//!
//! [`ClaimService`] is the only entry point that mutates claims, voyages and
//! their port activity timelines.
//! Each operation authorizes the actor, validates input, derives computed
//! fields and hands a complete change to the [`ClaimStore`] in one call so
//! the store can apply it atomically.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use core_kernel::{ClaimId, Clock, PortError, UserId, VoyageId};
use crate::activity::{self, ClaimActivityLog};
use crate::analytics::ClaimAnalytics;
use crate::authz::{authorize, can_perform, Action, Resource, User};
use crate::claim::{Claim, NewClaim, StatusChange};
use crate::derive::{derive_fields, Derivation};
use crate::error::ClaimError;
use crate::notification::{self, Notification, Notifier};
use crate::numbering::ClaimNumber;
use crate::port_activity::{NewPortActivity, PortActivity, PortActivityTimeline};
use crate::ports::{AssignmentChange, ClaimQuery, ClaimStore, VoyageQuery};
use crate::thread::{Comment, Document, NewDocument};
use crate::voyage::{NewVoyage, Voyage, VoyageAssignment};

/// Attempts at finding a free claim number before giving up
pub const MAX_NUMBERING_ATTEMPTS: u32 = 5;

/// Application service for claims and voyages
pub struct ClaimService {
    store: Arc<dyn ClaimStore>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
}

impl ClaimService {
    pub fn new(store: Arc<dyn ClaimStore>, clock: Arc<dyn Clock>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            clock,
            notifier,
        }
    }

    pub fn store(&self) -> &Arc<dyn ClaimStore> {
        &self.store
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    /// Loads a user by id
    pub async fn get_user(&self, id: UserId) -> Result<User, ClaimError> {
        Ok(self.store.get_user(id).await?)
    }

    // ------------------------------------------------------------------
    // Claims
    // ------------------------------------------------------------------

    /// Creates a draft claim owned by `actor`
    #[instrument(skip_all, fields(actor = %actor.username, voyage_id = %new_claim.voyage_id))]
    pub async fn create_claim(&self, actor: &User, new_claim: NewClaim) -> Result<Claim, ClaimError> {
        authorize(actor, Action::CreateClaim, Resource::None)?;
        self.check_assignee(actor, None, new_claim.assigned_to).await?;
        let voyage = self.voyage_for_claim(new_claim.voyage_id).await?;
        let claim = Claim::draft(new_claim, &voyage, Some(actor.id), self.clock.now());
        self.insert_claim(actor, claim, &voyage).await
    }

    /// Saves a claim
    ///
    /// A claim without a number is inserted and numbered. Otherwise the
    /// claim's `version` must match the stored one; on success the returned
    /// claim carries `version + 1`. A new claim always starts as a draft
    /// created by `actor`, whatever lifecycle fields it arrives with.
    ///
    /// # Errors
    ///
    /// `ConcurrencyConflict` when the claim changed since it was loaded,
    /// `Validation` for bad amounts, a missing voyage or an assignee who
    /// cannot handle claims, and `PermissionDenied` before anything is read
    /// for writing.
    #[instrument(skip_all, fields(actor = %actor.username, claim_id = %claim.id, version = claim.version))]
    pub async fn save_claim(&self, actor: &User, claim: Claim) -> Result<Claim, ClaimError> {
        if !claim.is_persisted() {
            authorize(actor, Action::CreateClaim, Resource::None)?;
            self.check_assignee(actor, None, claim.assigned_to).await?;
            let mut claim = claim;
            claim.reset_to_draft(actor.id);
            let voyage = self.voyage_for_claim(claim.voyage_id).await?;
            return self.insert_claim(actor, claim, &voyage).await;
        }

        let previous = self.fetch_claim(claim.id).await?;
        authorize(actor, Action::EditClaim, Resource::Claim(&previous))?;
        self.check_assignee(actor, previous.assigned_to, claim.assigned_to).await?;
        self.persist_update(Some(actor), &previous, claim).await
    }

    /// Changes lifecycle and/or payment status
    #[instrument(skip_all, fields(actor = %actor.username, claim_id = %claim_id, version = version))]
    pub async fn update_status(
        &self,
        actor: &User,
        claim_id: ClaimId,
        version: i64,
        change: StatusChange,
    ) -> Result<Claim, ClaimError> {
        let previous = self.fetch_claim(claim_id).await?;
        authorize(actor, Action::EditClaim, Resource::Claim(&previous))?;

        let mut claim = previous.clone();
        claim.version = version;
        claim.apply_status_change(&change, self.clock.today(), self.clock.now())?;
        self.persist_update(Some(actor), &previous, claim).await
    }

    /// Records a payment received from the owner
    #[instrument(skip_all, fields(actor = %actor.username, claim_id = %claim_id, version = version, amount = %amount))]
    pub async fn record_payment(
        &self,
        actor: &User,
        claim_id: ClaimId,
        version: i64,
        amount: Decimal,
    ) -> Result<Claim, ClaimError> {
        let previous = self.fetch_claim(claim_id).await?;
        authorize(actor, Action::RecordPayment, Resource::Claim(&previous))?;

        let mut claim = previous.clone();
        claim.version = version;
        claim.apply_payment(amount, self.clock.now())?;
        let saved = self.persist_update(Some(actor), &previous, claim).await?;

        if let Some(assignee) = saved.assigned_to.filter(|id| *id != actor.id) {
            if let Some(analyst) = self.load_user_quietly(assignee).await {
                self.notify(notification::payment_received(&saved, amount, &analyst)).await;
            }
        }
        Ok(saved)
    }

    /// Deletes a draft claim; its activity trail is kept
    #[instrument(skip_all, fields(actor = %actor.username, claim_id = %claim_id))]
    pub async fn delete_claim(&self, actor: &User, claim_id: ClaimId) -> Result<(), ClaimError> {
        let claim = self.fetch_claim(claim_id).await?;
        authorize(actor, Action::DeleteClaim, Resource::Claim(&claim))?;

        let entry = ClaimActivityLog::deleted(&claim, Some(actor.id), self.clock.now());
        self.store.delete_claim(claim_id, &entry).await?;
        info!(claim_number = %claim.claim_number, "claim deleted");
        Ok(())
    }

    pub async fn get_claim(&self, actor: &User, claim_id: ClaimId) -> Result<Claim, ClaimError> {
        let claim = self.fetch_claim(claim_id).await?;
        authorize(actor, Action::ViewClaim, Resource::Claim(&claim))?;
        Ok(claim)
    }

    pub async fn find_claims(&self, actor: &User, query: &ClaimQuery) -> Result<Vec<Claim>, ClaimError> {
        authorize(actor, Action::ViewClaim, Resource::None)?;
        Ok(self.store.find_claims(query).await?)
    }

    /// Totals over every claim matching the query (pagination ignored)
    pub async fn analytics(&self, actor: &User, query: &ClaimQuery) -> Result<ClaimAnalytics, ClaimError> {
        authorize(actor, Action::ViewClaim, Resource::None)?;
        let query = ClaimQuery {
            limit: None,
            offset: None,
            ..query.clone()
        };
        let claims = self.store.find_claims(&query).await?;
        Ok(ClaimAnalytics::from_claims(&claims))
    }

    // ------------------------------------------------------------------
    // Comments, documents, activity
    // ------------------------------------------------------------------

    #[instrument(skip_all, fields(actor = %actor.username, claim_id = %claim_id))]
    pub async fn add_comment(&self, actor: &User, claim_id: ClaimId, content: &str) -> Result<Comment, ClaimError> {
        let claim = self.fetch_claim(claim_id).await?;
        authorize(actor, Action::CommentOnClaim, Resource::Claim(&claim))?;

        let comment = Comment::new(claim.id, actor.id, content, self.clock.now())?;
        self.store.add_comment(&comment).await?;
        Ok(comment)
    }

    #[instrument(skip_all, fields(actor = %actor.username, claim_id = %claim_id))]
    pub async fn attach_document(
        &self,
        actor: &User,
        claim_id: ClaimId,
        input: NewDocument,
    ) -> Result<Document, ClaimError> {
        let claim = self.fetch_claim(claim_id).await?;
        authorize(actor, Action::EditClaim, Resource::Claim(&claim))?;

        let document = Document::new(claim.voyage_id, claim.id, input, actor.id, self.clock.now())?;
        self.store.add_document(&document).await?;
        info!(path = %document.file_path, "document attached");
        Ok(document)
    }

    pub async fn comments(&self, actor: &User, claim_id: ClaimId) -> Result<Vec<Comment>, ClaimError> {
        self.get_claim(actor, claim_id).await?;
        Ok(self.store.list_comments(claim_id).await?)
    }

    pub async fn documents(&self, actor: &User, claim_id: ClaimId) -> Result<Vec<Document>, ClaimError> {
        self.get_claim(actor, claim_id).await?;
        Ok(self.store.list_documents(claim_id).await?)
    }

    pub async fn activity(&self, actor: &User, claim_id: ClaimId) -> Result<Vec<ClaimActivityLog>, ClaimError> {
        self.get_claim(actor, claim_id).await?;
        Ok(self.store.list_activity(claim_id).await?)
    }

    // ------------------------------------------------------------------
    // Voyages
    // ------------------------------------------------------------------

    #[instrument(skip_all, fields(actor = %actor.username, external_id = %input.external_id))]
    pub async fn register_voyage(&self, actor: &User, input: NewVoyage) -> Result<Voyage, ClaimError> {
        authorize(actor, Action::RegisterVoyage, Resource::None)?;
        input.validate()?;
        self.store
            .get_ship_owner(input.ship_owner_id)
            .await
            .map_err(|err| missing_link(err, "ship owner", input.ship_owner_id))?;

        let voyage = input.into_voyage(self.clock.now());
        self.store.insert_voyage(&voyage).await?;
        info!(voyage_id = %voyage.id, voyage_number = %voyage.voyage_number, "voyage registered");
        Ok(voyage)
    }

    pub async fn get_voyage(&self, actor: &User, voyage_id: VoyageId) -> Result<Voyage, ClaimError> {
        authorize(actor, Action::ViewVoyage, Resource::None)?;
        Ok(self.store.get_voyage(voyage_id).await?)
    }

    pub async fn find_voyages(&self, actor: &User, query: &VoyageQuery) -> Result<Vec<Voyage>, ClaimError> {
        authorize(actor, Action::ViewVoyage, Resource::None)?;
        Ok(self.store.find_voyages(query).await?)
    }

    pub async fn assignment_history(
        &self,
        actor: &User,
        voyage_id: VoyageId,
    ) -> Result<Vec<VoyageAssignment>, ClaimError> {
        authorize(actor, Action::ViewVoyage, Resource::None)?;
        self.store.get_voyage(voyage_id).await?;
        Ok(self.store.assignment_history(voyage_id).await?)
    }

    /// Assigns a voyage and cascades the analyst onto its unassigned claims
    ///
    /// Claims that already have an assignee keep it. Assigning to yourself
    /// needs write access; assigning to someone else needs a team lead.
    #[instrument(skip_all, fields(actor = %actor.username, voyage_id = %voyage_id, analyst_id = %analyst_id))]
    pub async fn assign_voyage(
        &self,
        voyage_id: VoyageId,
        analyst_id: UserId,
        actor: &User,
    ) -> Result<Voyage, ClaimError> {
        let action = if analyst_id == actor.id {
            Action::AssignVoyageToSelf
        } else {
            Action::AssignVoyageToOther
        };
        authorize(actor, action, Resource::None)?;

        let voyage = self.store.get_voyage(voyage_id).await?;
        let analyst = self.assignable_analyst(analyst_id).await?;
        self.apply_assignment(actor, voyage, &analyst, None).await
    }

    /// Moves a voyage to another analyst, recording why
    ///
    /// When a reason is given every claim of the voyage gets a comment
    /// saying so. That step is best-effort and never fails the call.
    #[instrument(skip_all, fields(actor = %actor.username, voyage_id = %voyage_id, analyst_id = %analyst_id))]
    pub async fn reassign_voyage(
        &self,
        voyage_id: VoyageId,
        analyst_id: UserId,
        actor: &User,
        reason: Option<String>,
    ) -> Result<Voyage, ClaimError> {
        let voyage = self.store.get_voyage(voyage_id).await?;
        authorize(actor, Action::ReassignVoyage, Resource::Voyage(&voyage))?;
        let analyst = self.assignable_analyst(analyst_id).await?;

        let previous_name = match voyage.assigned_analyst_id {
            Some(id) => match self.load_user_quietly(id).await {
                Some(user) => user.display_name().to_string(),
                None => id.to_string(),
            },
            None => "Unassigned".to_string(),
        };
        let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());

        let voyage = self.apply_assignment(actor, voyage, &analyst, reason.clone()).await?;

        if let Some(reason) = reason {
            let note = format!(
                "Reassigned from {} to {}. Reason: {}",
                previous_name,
                analyst.display_name(),
                reason
            );
            self.annotate_voyage_claims(actor, voyage.id, &note).await;
        }
        Ok(voyage)
    }

    // ------------------------------------------------------------------
    // Port activities
    // ------------------------------------------------------------------

    /// Adds an activity to a voyage's timeline
    ///
    /// Activities of one voyage may not overlap in time.
    #[instrument(skip_all, fields(actor = %actor.username, voyage_id = %voyage_id, category = %input.category))]
    pub async fn record_port_activity(
        &self,
        actor: &User,
        voyage_id: VoyageId,
        input: NewPortActivity,
    ) -> Result<PortActivity, ClaimError> {
        authorize(actor, Action::RecordPortActivity, Resource::None)?;
        let voyage = self.store.get_voyage(voyage_id).await?;
        let activity = PortActivity::new(voyage.id, input, actor.id, self.clock.now())?;

        let timeline = PortActivityTimeline::new(voyage.id, self.store.list_port_activities(voyage.id).await?);
        if let Some(existing) = timeline.conflict_with(&activity) {
            return Err(ClaimError::validation(format!(
                "activity overlaps {} at {} starting {}",
                existing.category, existing.port_name, existing.start_at
            )));
        }

        self.store.insert_port_activity(&activity).await?;
        info!(
            voyage_number = %voyage.voyage_number,
            port = %activity.port_name,
            hours = %activity.duration_hours(),
            "port activity recorded"
        );
        Ok(activity)
    }

    /// The voyage's activities in start order with totals per category
    pub async fn voyage_timeline(&self, actor: &User, voyage_id: VoyageId) -> Result<PortActivityTimeline, ClaimError> {
        authorize(actor, Action::ViewVoyage, Resource::None)?;
        self.store.get_voyage(voyage_id).await?;
        let activities = self.store.list_port_activities(voyage_id).await?;
        Ok(PortActivityTimeline::new(voyage_id, activities))
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    async fn fetch_claim(&self, claim_id: ClaimId) -> Result<Claim, ClaimError> {
        Ok(self.store.get_claim(claim_id).await?)
    }

    /// The claim's voyage; a missing voyage is a validation failure
    async fn voyage_for_claim(&self, voyage_id: VoyageId) -> Result<Voyage, ClaimError> {
        self.store
            .get_voyage(voyage_id)
            .await
            .map_err(|err| missing_link(err, "voyage", voyage_id))
    }

    /// Gates a change of claim assignee
    ///
    /// Handing a claim to someone else needs a team lead, and the new
    /// assignee must be able to handle claims. Clearing the assignee or
    /// leaving it unchanged needs nothing beyond the edit itself.
    async fn check_assignee(
        &self,
        actor: &User,
        current: Option<UserId>,
        requested: Option<UserId>,
    ) -> Result<(), ClaimError> {
        let Some(target) = requested.filter(|id| Some(*id) != current) else {
            return Ok(());
        };
        if target != actor.id {
            authorize(actor, Action::AssignClaimToOther, Resource::None)?;
        }
        self.assignable_analyst(target).await?;
        Ok(())
    }

    /// Loads an assignment target; inactive users and roles without write
    /// access are refused
    async fn assignable_analyst(&self, analyst_id: UserId) -> Result<User, ClaimError> {
        let analyst = self.store.get_user(analyst_id).await?;
        if !analyst.is_active {
            return Err(ClaimError::validation(format!(
                "{} is inactive and cannot be assigned claims",
                analyst.username
            )));
        }
        if !can_perform(&analyst, Action::HandleClaims, Resource::None) {
            return Err(ClaimError::validation(format!(
                "{} cannot be assigned claims",
                analyst.username
            )));
        }
        Ok(analyst)
    }

    async fn insert_claim(&self, actor: &User, claim: Claim, voyage: &Voyage) -> Result<Claim, ClaimError> {
        claim.validate()?;
        let today = self.clock.today();
        let now = self.clock.now();

        let Derivation {
            mut claim,
            newly_time_barred,
            ..
        } = derive_fields(claim, voyage, today);
        claim.version = 0;
        claim.created_at = now;
        claim.updated_at = now;

        for attempt in 1..=MAX_NUMBERING_ATTEMPTS {
            let latest = self
                .store
                .latest_claim_number(&ClaimNumber::day_prefix(today))
                .await?;
            claim.claim_number = ClaimNumber::next_after(today, latest.as_deref())?.to_string();

            let mut entries = vec![ClaimActivityLog::created(&claim, Some(actor.id), now)];
            if newly_time_barred {
                entries.push(ClaimActivityLog::time_barred(&claim, None, now));
            }

            match self.store.insert_claim(&claim, &entries).await {
                Ok(()) => {
                    info!(claim_number = %claim.claim_number, attempt, "claim created");
                    self.notify_claim_assignee(actor, &claim, voyage).await;
                    return Ok(claim);
                }
                Err(PortError::Duplicate { field, .. }) if field == "claim_number" => {
                    debug!(claim_number = %claim.claim_number, attempt, "claim number taken, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }

        warn!(claim_number = %claim.claim_number, "giving up on claim numbering");
        Err(ClaimError::UniquenessViolation {
            entity: "Claim".to_string(),
            field: "claim_number".to_string(),
            value: claim.claim_number,
        })
    }

    /// Guarded update of an existing claim
    ///
    /// `claim.version` is the version the caller loaded. `actor` is `None`
    /// for system updates such as the time-bar sweep.
    pub(crate) async fn persist_update(
        &self,
        actor: Option<&User>,
        previous: &Claim,
        mut claim: Claim,
    ) -> Result<Claim, ClaimError> {
        if claim.version != previous.version {
            return Err(ClaimError::ConcurrencyConflict {
                claim: previous.claim_number.clone(),
                expected: claim.version,
                found: previous.version,
            });
        }
        if claim.claim_number != previous.claim_number {
            return Err(ClaimError::validation("claim number cannot be changed"));
        }
        claim.validate()?;

        claim.id = previous.id;
        claim.created_by = previous.created_by;
        claim.created_at = previous.created_at;
        if previous.is_time_barred {
            claim.is_time_barred = true;
            claim.time_bar_date = previous.time_bar_date;
        }

        let voyage = self.voyage_for_claim(claim.voyage_id).await?;
        let now = self.clock.now();
        let Derivation { mut claim, .. } = derive_fields(claim, &voyage, self.clock.today());

        let expected_version = claim.version;
        claim.version = expected_version + 1;
        claim.updated_at = now;

        let entries = activity::diff(previous, &claim, actor.map(|a| a.id), now);
        self.store.update_claim(&claim, expected_version, &entries).await?;
        info!(
            claim_number = %claim.claim_number,
            version = claim.version,
            changes = entries.len(),
            "claim updated"
        );

        if claim.assigned_to != previous.assigned_to {
            if let Some(actor) = actor {
                self.notify_claim_assignee(actor, &claim, &voyage).await;
            }
        }
        Ok(claim)
    }

    async fn apply_assignment(
        &self,
        actor: &User,
        mut voyage: Voyage,
        analyst: &User,
        reason: Option<String>,
    ) -> Result<Voyage, ClaimError> {
        let now = self.clock.now();
        voyage.assign_to(analyst.id, now);
        let change = AssignmentChange {
            assignment: VoyageAssignment::new(voyage.id, analyst.id, Some(actor.id), now, reason),
            voyage,
            at: now,
        };

        let outcome = self.store.apply_assignment(&change).await?;
        info!(
            voyage_number = %change.voyage.voyage_number,
            analyst = %analyst.username,
            cascaded = outcome.cascaded_claims.len(),
            "voyage assigned"
        );

        if analyst.id != actor.id {
            self.notify(notification::voyage_assigned(&change.voyage, analyst)).await;
        }
        Ok(change.voyage)
    }

    async fn annotate_voyage_claims(&self, actor: &User, voyage_id: VoyageId, note: &str) {
        let claims = match self.store.find_claims(&ClaimQuery::for_voyage(voyage_id)).await {
            Ok(claims) => claims,
            Err(err) => {
                warn!(error = %err, %voyage_id, "could not load claims for reassignment note");
                return;
            }
        };

        let now = self.clock.now();
        for claim in claims {
            let result = match Comment::new(claim.id, actor.id, note, now) {
                Ok(comment) => self.store.add_comment(&comment).await.map_err(ClaimError::from),
                Err(err) => Err(err),
            };
            if let Err(err) = result {
                warn!(error = %err, claim_number = %claim.claim_number, "reassignment note not recorded");
            }
        }
    }

    async fn notify_claim_assignee(&self, actor: &User, claim: &Claim, voyage: &Voyage) {
        let Some(assignee) = claim.assigned_to.filter(|id| *id != actor.id) else {
            return;
        };
        if let Some(analyst) = self.load_user_quietly(assignee).await {
            self.notify(notification::claim_assigned(claim, voyage, &analyst)).await;
        }
    }

    pub(crate) async fn load_user_quietly(&self, id: UserId) -> Option<User> {
        match self.store.get_user(id).await {
            Ok(user) => Some(user),
            Err(err) => {
                warn!(error = %err, user_id = %id, "user lookup failed");
                None
            }
        }
    }

    /// Sends a notification, logging instead of failing
    pub(crate) async fn notify(&self, notification: Option<Notification>) {
        let Some(notification) = notification else {
            return;
        };
        let subject = notification.subject.clone();
        if let Err(err) = self.notifier.send(notification).await {
            warn!(error = %err, %subject, "notification failed");
        }
    }

    pub(crate) fn today(&self) -> NaiveDate {
        self.clock.today()
    }
}

/// A referenced record that does not exist makes the input invalid
fn missing_link(err: PortError, what: &str, id: impl std::fmt::Display) -> ClaimError {
    match err {
        PortError::NotFound { .. } => ClaimError::validation(format!("{} {} does not exist", what, id)),
        other => other.into(),
    }
}
