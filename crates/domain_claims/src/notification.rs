//! Outbound notifications
//!
//! Transport is someone else's problem; the domain builds the message and
//! hands it to a [`Notifier`]. Every send is best-effort: callers log a
//! failure and carry on.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Mutex;
use tracing::info;

use core_kernel::{DomainPort, PortError};
use crate::authz::User;
use crate::claim::Claim;
use crate::voyage::Voyage;

/// A rendered message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
    pub recipients: Vec<String>,
}

impl Notification {
    /// Addressed to the user's email, or `None` when they have none
    pub fn to_user(user: &User, subject: String, body: String) -> Option<Self> {
        let email = user.email.as_ref().filter(|e| !e.trim().is_empty())?;
        Some(Self {
            subject,
            body,
            recipients: vec![email.clone()],
        })
    }
}

/// Port for delivering notifications
#[async_trait]
pub trait Notifier: DomainPort {
    async fn send(&self, notification: Notification) -> Result<(), PortError>;
}

/// Writes notifications to the log instead of delivering them
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl DomainPort for LogNotifier {}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: Notification) -> Result<(), PortError> {
        info!(
            subject = %notification.subject,
            recipients = ?notification.recipients,
            "notification"
        );
        Ok(())
    }
}

/// Keeps every notification for later inspection
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl DomainPort for RecordingNotifier {}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: Notification) -> Result<(), PortError> {
        let mut sent = self.sent.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        sent.push(notification);
        Ok(())
    }
}

fn deadline_text(claim: &Claim) -> String {
    claim
        .claim_deadline
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "Not set".to_string())
}

fn optional(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("-")
}

pub fn voyage_assigned(voyage: &Voyage, analyst: &User) -> Option<Notification> {
    Notification::to_user(
        analyst,
        format!("Voyage Assigned to You: {}", voyage.voyage_number),
        format!(
            "You have been assigned a new voyage.\n\n\
             Voyage Number: {}\n\
             Vessel: {}\n\
             Charter Party: {}\n\
             Load Port: {}\n\
             Discharge Port: {}\n\
             Laycan: {} to {}\n\n\
             Please review the voyage details and monitor for any claims.",
            voyage.voyage_number,
            voyage.vessel_name,
            optional(&voyage.charter_party),
            optional(&voyage.load_port),
            optional(&voyage.discharge_port),
            voyage.laycan_start.format("%Y-%m-%d"),
            voyage.laycan_end.format("%Y-%m-%d"),
        ),
    )
}

pub fn claim_assigned(claim: &Claim, voyage: &Voyage, analyst: &User) -> Option<Notification> {
    Notification::to_user(
        analyst,
        format!("Claim Assigned to You: {}", claim.claim_number),
        format!(
            "You have been assigned a new claim.\n\n\
             Claim Number: {}\n\
             Type: {}\n\
             Amount: {}\n\
             Voyage: {}\n\
             Vessel: {}\n\
             Status: {}\n\
             Deadline: {}\n\n\
             Please log in to view the claim details.",
            claim.claim_number,
            claim.claim_type,
            claim.claimed(),
            voyage.voyage_number,
            voyage.vessel_name,
            claim.status,
            deadline_text(claim),
        ),
    )
}

pub fn timebar_warning(claim: &Claim, voyage: &Voyage, days_remaining: i64, analyst: &User) -> Option<Notification> {
    Notification::to_user(
        analyst,
        format!("Time-Bar Warning: {} ({} days)", claim.claim_number, days_remaining),
        format!(
            "WARNING: Claim is approaching time-bar deadline!\n\n\
             Claim Number: {}\n\
             Amount: {}\n\
             Voyage: {}\n\
             Vessel: {}\n\
             Deadline: {}\n\
             Days Remaining: {}\n\n\
             URGENT ACTION REQUIRED: Please submit this claim before the deadline.",
            claim.claim_number,
            claim.claimed(),
            voyage.voyage_number,
            voyage.vessel_name,
            deadline_text(claim),
            days_remaining,
        ),
    )
}

pub fn time_barred(claim: &Claim, voyage: &Voyage, analyst: &User) -> Option<Notification> {
    Notification::to_user(
        analyst,
        format!("Claim Time-Barred: {}", claim.claim_number),
        format!(
            "The deadline for this claim has passed and it is now time-barred.\n\n\
             Claim Number: {}\n\
             Amount: {}\n\
             Voyage: {}\n\
             Vessel: {}\n\
             Deadline: {}",
            claim.claim_number,
            claim.claimed(),
            voyage.voyage_number,
            voyage.vessel_name,
            deadline_text(claim),
        ),
    )
}

pub fn payment_received(claim: &Claim, amount: Decimal, analyst: &User) -> Option<Notification> {
    Notification::to_user(
        analyst,
        format!("Payment Received: {}", claim.claim_number),
        format!(
            "A payment has been received for claim {}.\n\n\
             Payment Amount: {} {:.2}\n\
             Total Paid: {}\n\
             Outstanding: {}\n\
             Payment Status: {}\n\n\
             View full claim details in the system.",
            claim.claim_number,
            claim.currency,
            amount,
            claim.paid(),
            claim.outstanding_amount(),
            claim.payment_status,
        ),
    )
}
