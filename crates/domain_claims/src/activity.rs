//! Claim activity trail
//!
//! Entries are append-only. Stores expose no update or delete for them; when
//! a claim is deleted its entries survive with the claim reference cleared
//! and the claim number kept for reference.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{ActivityLogId, ClaimId, UserId};
use crate::claim::Claim;

text_enum! {
    /// Kind of recorded activity
    ActivityAction {
        Created => "CREATED",
        StatusChanged => "STATUS_CHANGED",
        PaymentStatusChanged => "PAYMENT_STATUS_CHANGED",
        AmountChanged => "AMOUNT_CHANGED",
        PaidAmountChanged => "PAID_AMOUNT_CHANGED",
        Assigned => "ASSIGNED",
        Reassigned => "REASSIGNED",
        DeadlineChanged => "DEADLINE_CHANGED",
        TimeBarred => "TIME_BARRED",
        Deleted => "DELETED",
    }
}

/// One entry in a claim's audit trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimActivityLog {
    pub id: ActivityLogId,
    /// Cleared when the claim is deleted
    pub claim_id: Option<ClaimId>,
    pub claim_number: String,
    /// `None` for system actions such as the time-bar sweep
    pub user_id: Option<UserId>,
    pub action: ActivityAction,
    pub message: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ClaimActivityLog {
    pub fn new(
        claim: &Claim,
        user_id: Option<UserId>,
        action: ActivityAction,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ActivityLogId::new_v7(),
            claim_id: Some(claim.id),
            claim_number: claim.claim_number.clone(),
            user_id,
            action,
            message: message.into(),
            old_value: None,
            new_value: None,
            created_at: now,
        }
    }

    pub fn with_change(mut self, old: Option<String>, new: Option<String>) -> Self {
        self.old_value = old;
        self.new_value = new;
        self
    }

    pub fn created(claim: &Claim, user_id: Option<UserId>, now: DateTime<Utc>) -> Self {
        Self::new(
            claim,
            user_id,
            ActivityAction::Created,
            format!("Claim {} created", claim.claim_number),
            now,
        )
    }

    pub fn time_barred(claim: &Claim, user_id: Option<UserId>, now: DateTime<Utc>) -> Self {
        let message = match claim.claim_deadline {
            Some(deadline) => format!("Claim time-barred; deadline {} passed", deadline),
            None => "Claim marked time-barred".to_string(),
        };
        Self::new(claim, user_id, ActivityAction::TimeBarred, message, now)
    }

    pub fn deleted(claim: &Claim, user_id: Option<UserId>, now: DateTime<Utc>) -> Self {
        Self::new(
            claim,
            user_id,
            ActivityAction::Deleted,
            format!("Claim {} deleted", claim.claim_number),
            now,
        )
    }
}

fn show<T: ToString>(value: &Option<T>) -> Option<String> {
    value.as_ref().map(ToString::to_string)
}

/// Activity entries describing what changed between two saved states
pub fn diff(previous: &Claim, current: &Claim, user_id: Option<UserId>, now: DateTime<Utc>) -> Vec<ClaimActivityLog> {
    let mut entries = Vec::new();
    let entry = |action, message: String| ClaimActivityLog::new(current, user_id, action, message, now);

    if previous.status != current.status {
        entries.push(
            entry(
                ActivityAction::StatusChanged,
                format!("Status changed from {} to {}", previous.status, current.status),
            )
            .with_change(Some(previous.status.to_string()), Some(current.status.to_string())),
        );
    }

    if previous.claim_amount != current.claim_amount {
        entries.push(
            entry(
                ActivityAction::AmountChanged,
                format!("Claim amount changed from {} to {}", previous.claim_amount, current.claim_amount),
            )
            .with_change(Some(previous.claim_amount.to_string()), Some(current.claim_amount.to_string())),
        );
    }

    if previous.paid_amount != current.paid_amount {
        entries.push(
            entry(
                ActivityAction::PaidAmountChanged,
                format!("Paid amount changed from {} to {}", previous.paid_amount, current.paid_amount),
            )
            .with_change(Some(previous.paid_amount.to_string()), Some(current.paid_amount.to_string())),
        );
    }

    if previous.claim_deadline != current.claim_deadline {
        entries.push(
            entry(ActivityAction::DeadlineChanged, "Claim deadline changed".to_string())
                .with_change(show(&previous.claim_deadline), show(&current.claim_deadline)),
        );
    }

    if previous.assigned_to != current.assigned_to {
        let action = if previous.assigned_to.is_none() {
            ActivityAction::Assigned
        } else {
            ActivityAction::Reassigned
        };
        entries.push(
            entry(action, "Claim assignee changed".to_string())
                .with_change(show(&previous.assigned_to), show(&current.assigned_to)),
        );
    }

    if !previous.is_time_barred && current.is_time_barred {
        entries.push(ClaimActivityLog::time_barred(current, user_id, now));
    }

    if previous.payment_status != current.payment_status {
        entries.push(
            entry(
                ActivityAction::PaymentStatusChanged,
                format!("Payment status changed from {} to {}", previous.payment_status, current.payment_status),
            )
            .with_change(
                Some(previous.payment_status.to_string()),
                Some(current.payment_status.to_string()),
            ),
        );
    }

    entries
}
