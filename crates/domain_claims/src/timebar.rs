//! Periodic time-bar sweep
//!
//! Saving a claim already flags it when its deadline has passed, but claims
//! nobody touches would never be saved. The sweep finds them, warns the
//! analysts about claims whose deadline is close, and re-saves overdue
//! claims through the normal guarded update path as the system user.

use chrono::{Days, NaiveDate};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::authz::User;
use crate::claim::{Claim, PaymentStatus};
use crate::error::ClaimError;
use crate::notification;
use crate::ports::ClaimQuery;
use crate::service::ClaimService;
use crate::voyage::Voyage;

/// Days before the deadline at which analysts are warned
pub const DEFAULT_WARNING_DAYS: i64 = 30;

/// Outcome of one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Claims within the warning window
    pub approaching: usize,
    /// Claims flagged time-barred by this run
    pub time_barred: usize,
    /// Claims left for the next run because they changed underneath us
    pub skipped: usize,
}

/// Finds and flags claims whose deadline passed while still unsent
pub struct TimebarSweep {
    service: Arc<ClaimService>,
    warning_days: i64,
}

impl TimebarSweep {
    pub fn new(service: Arc<ClaimService>) -> Self {
        Self {
            service,
            warning_days: DEFAULT_WARNING_DAYS,
        }
    }

    pub fn with_warning_days(mut self, days: i64) -> Self {
        self.warning_days = days.max(0);
        self
    }

    #[instrument(skip(self), fields(warning_days = self.warning_days))]
    pub async fn run(&self) -> Result<SweepReport, ClaimError> {
        let store = self.service.store();
        let today = self.service.today();
        let mut report = SweepReport::default();
        // A window past the calendar's end covers every future deadline
        let horizon = today
            .checked_add_days(Days::new(self.warning_days.unsigned_abs()))
            .unwrap_or(NaiveDate::MAX);

        let approaching = store
            .find_claims(&ClaimQuery {
                is_time_barred: Some(false),
                payment_status: Some(PaymentStatus::NotSent),
                deadline_from: Some(today),
                deadline_to: Some(horizon),
                ..Default::default()
            })
            .await?;
        report.approaching = approaching.len();
        for claim in &approaching {
            let days_left = claim.days_until_deadline(today).unwrap_or_default();
            if let Some((analyst, voyage)) = self.recipient(claim).await {
                self.service
                    .notify(notification::timebar_warning(claim, &voyage, days_left, &analyst))
                    .await;
            }
        }

        let overdue = store
            .find_claims(&ClaimQuery {
                is_time_barred: Some(false),
                payment_status: Some(PaymentStatus::NotSent),
                deadline_before: Some(today),
                ..Default::default()
            })
            .await?;

        for claim in overdue {
            match self.service.persist_update(None, &claim, claim.clone()).await {
                Ok(saved) if saved.is_time_barred => {
                    report.time_barred += 1;
                    if let Some((analyst, voyage)) = self.recipient(&saved).await {
                        self.service
                            .notify(notification::time_barred(&saved, &voyage, &analyst))
                            .await;
                    }
                }
                Ok(_) => {}
                Err(err) if err.is_conflict() => {
                    warn!(claim_number = %claim.claim_number, "claim changed during sweep, skipping");
                    report.skipped += 1;
                }
                Err(err @ ClaimError::Validation(_)) => {
                    warn!(claim_number = %claim.claim_number, error = %err, "claim could not be re-saved, skipping");
                    report.skipped += 1;
                }
                Err(err) => return Err(err),
            }
        }

        info!(
            approaching = report.approaching,
            time_barred = report.time_barred,
            skipped = report.skipped,
            "time-bar sweep completed"
        );
        Ok(report)
    }

    async fn recipient(&self, claim: &Claim) -> Option<(User, Voyage)> {
        let assignee = claim.assigned_to?;
        let analyst = self.service.load_user_quietly(assignee).await?;
        match self.service.store().get_voyage(claim.voyage_id).await {
            Ok(voyage) => Some((analyst, voyage)),
            Err(err) => {
                warn!(error = %err, claim_number = %claim.claim_number, "voyage lookup failed");
                None
            }
        }
    }
}
