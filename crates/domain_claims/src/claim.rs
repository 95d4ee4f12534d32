//! Claim aggregate

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{ClaimId, Currency, Money, ShipOwnerId, UserId, VoyageId};
use crate::error::ClaimError;
use crate::voyage::Voyage;

text_enum! {
    /// Type of claim
    ClaimType {
        Demurrage => "DEMURRAGE",
        PostDeal => "POST_DEAL",
        Despatch => "DESPATCH",
        DeadFreight => "DEAD_FREIGHT",
        Other => "OTHER",
    }
}

text_enum! {
    /// Claim lifecycle status
    ClaimStatus {
        Draft => "DRAFT",
        UnderReview => "UNDER_REVIEW",
        Submitted => "SUBMITTED",
        Settled => "SETTLED",
        Rejected => "REJECTED",
    }
}

text_enum! {
    /// Payment status towards the ship owner
    PaymentStatus {
        NotSent => "NOT_SENT",
        Sent => "SENT",
        PartiallyPaid => "PARTIALLY_PAID",
        Paid => "PAID",
        /// Deadline passed before the claim was sent
        Timebar => "TIMEBAR",
        Disputed => "DISPUTED",
    }
}

text_enum! {
    /// Cost category for post-deal claims
    CostType {
        PortCosts => "PORT_COSTS",
        CanalCosts => "CANAL_COSTS",
        BunkerCosts => "BUNKER_COSTS",
        AgencyFees => "AGENCY_FEES",
        Demurrage => "DEMURRAGE",
        Despatch => "DESPATCH",
        Other => "OTHER",
    }
}

/// A monetary claim tied to one voyage and one ship owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub id: ClaimId,
    /// `CLM-YYYYMMDD-####`; empty until first persisted
    pub claim_number: String,
    pub external_id: Option<String>,
    pub voyage_id: VoyageId,
    /// Always equal to the voyage's owner
    pub ship_owner_id: ShipOwnerId,
    pub claim_type: ClaimType,
    pub cost_type: Option<CostType>,
    pub status: ClaimStatus,
    pub payment_status: PaymentStatus,
    pub claim_amount: Decimal,
    pub paid_amount: Decimal,
    pub currency: Currency,
    /// Laytime used in days
    pub laytime_used: Option<Decimal>,
    /// Days over allowed laytime; derived on every save
    pub demurrage_days: Decimal,
    pub claim_deadline: Option<NaiveDate>,
    pub is_time_barred: bool,
    pub time_bar_date: Option<NaiveDate>,
    /// Optimistic concurrency counter
    pub version: i64,
    pub assigned_to: Option<UserId>,
    pub created_by: Option<UserId>,
    pub description: Option<String>,
    pub settlement_notes: Option<String>,
    pub internal_notes: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub sent_to_owner_at: Option<DateTime<Utc>>,
    pub settled_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a claim
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewClaim {
    pub voyage_id: VoyageId,
    pub claim_type: ClaimType,
    pub cost_type: Option<CostType>,
    pub external_id: Option<String>,
    pub claim_amount: Decimal,
    /// Defaults to the voyage currency
    pub currency: Option<Currency>,
    pub laytime_used: Option<Decimal>,
    pub claim_deadline: Option<NaiveDate>,
    pub assigned_to: Option<UserId>,
    pub description: Option<String>,
}

/// A requested change of lifecycle and/or payment status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: Option<ClaimStatus>,
    pub payment_status: Option<PaymentStatus>,
}

impl Claim {
    /// Builds an unnumbered draft for the given voyage
    pub fn draft(new: NewClaim, voyage: &Voyage, created_by: Option<UserId>, now: DateTime<Utc>) -> Self {
        Self {
            id: ClaimId::new_v7(),
            claim_number: String::new(),
            external_id: new.external_id.filter(|id| !id.trim().is_empty()),
            voyage_id: voyage.id,
            ship_owner_id: voyage.ship_owner_id,
            claim_type: new.claim_type,
            cost_type: new.cost_type,
            status: ClaimStatus::Draft,
            payment_status: PaymentStatus::NotSent,
            claim_amount: new.claim_amount,
            paid_amount: Decimal::ZERO,
            currency: new.currency.unwrap_or(voyage.currency),
            laytime_used: new.laytime_used,
            demurrage_days: Decimal::ZERO,
            claim_deadline: new.claim_deadline,
            is_time_barred: false,
            time_bar_date: None,
            version: 0,
            assigned_to: new.assigned_to,
            created_by,
            description: new.description,
            settlement_notes: None,
            internal_notes: None,
            submitted_at: None,
            sent_to_owner_at: None,
            settled_at: None,
            paid_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Puts an unsaved claim back into the state [`Claim::draft`] produces,
    /// keeping its content fields
    pub fn reset_to_draft(&mut self, created_by: UserId) {
        self.status = ClaimStatus::Draft;
        self.payment_status = PaymentStatus::NotSent;
        self.paid_amount = Decimal::ZERO;
        self.demurrage_days = Decimal::ZERO;
        self.is_time_barred = false;
        self.time_bar_date = None;
        self.version = 0;
        self.created_by = Some(created_by);
        self.submitted_at = None;
        self.sent_to_owner_at = None;
        self.settled_at = None;
        self.paid_at = None;
    }

    /// True once a claim number has been assigned
    pub fn is_persisted(&self) -> bool {
        !self.claim_number.is_empty()
    }

    pub fn validate(&self) -> Result<(), ClaimError> {
        if self.claim_amount < Decimal::ZERO {
            return Err(ClaimError::validation("claim amount must not be negative"));
        }
        if self.paid_amount < Decimal::ZERO {
            return Err(ClaimError::validation("paid amount must not be negative"));
        }
        if matches!(self.laytime_used, Some(used) if used < Decimal::ZERO) {
            return Err(ClaimError::validation("laytime used must not be negative"));
        }
        if matches!(&self.external_id, Some(id) if id.trim().is_empty()) {
            return Err(ClaimError::validation("external id must not be blank"));
        }
        Ok(())
    }

    /// Claimed minus paid; negative when overpaid
    pub fn outstanding_amount(&self) -> Money {
        Money::new(self.claim_amount - self.paid_amount, self.currency)
    }

    pub fn claimed(&self) -> Money {
        Money::new(self.claim_amount, self.currency)
    }

    pub fn paid(&self) -> Money {
        Money::new(self.paid_amount, self.currency)
    }

    /// Applies a status change, stamping the first time each milestone is reached
    pub fn apply_status_change(
        &mut self,
        change: &StatusChange,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<(), ClaimError> {
        if change.status.is_none() && change.payment_status.is_none() {
            return Err(ClaimError::validation("no status change requested"));
        }

        if let Some(status) = change.status {
            self.status = status;
            match status {
                ClaimStatus::Submitted => {
                    self.submitted_at.get_or_insert(now);
                }
                ClaimStatus::Settled => {
                    self.settled_at.get_or_insert(now);
                }
                _ => {}
            }
        }

        if let Some(payment_status) = change.payment_status {
            self.payment_status = payment_status;
            match payment_status {
                PaymentStatus::Sent => {
                    self.sent_to_owner_at.get_or_insert(now);
                }
                PaymentStatus::Paid | PaymentStatus::PartiallyPaid => {
                    self.paid_at.get_or_insert(now);
                }
                PaymentStatus::Timebar => self.mark_time_barred(today),
                _ => {}
            }
        }
        Ok(())
    }

    /// Adds a received payment and recomputes the payment status
    ///
    /// Overpayment is accepted and leaves a negative outstanding amount.
    pub fn apply_payment(&mut self, amount: Decimal, now: DateTime<Utc>) -> Result<(), ClaimError> {
        if amount <= Decimal::ZERO {
            return Err(ClaimError::validation("payment amount must be positive"));
        }
        self.paid_amount += amount;
        self.payment_status = if self.paid_amount >= self.claim_amount {
            PaymentStatus::Paid
        } else {
            PaymentStatus::PartiallyPaid
        };
        self.paid_at.get_or_insert(now);
        Ok(())
    }

    /// Flags the claim time-barred; the date is kept from the first time
    pub fn mark_time_barred(&mut self, today: NaiveDate) {
        self.is_time_barred = true;
        self.time_bar_date.get_or_insert(today);
        self.payment_status = PaymentStatus::Timebar;
    }

    /// Days from `today` to the deadline, negative once passed
    pub fn days_until_deadline(&self, today: NaiveDate) -> Option<i64> {
        self.claim_deadline.map(|deadline| (deadline - today).num_days())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_claim() -> Claim {
        let now = Utc::now();
        Claim {
            id: ClaimId::new(),
            claim_number: String::new(),
            external_id: None,
            voyage_id: VoyageId::new(),
            ship_owner_id: ShipOwnerId::new(),
            claim_type: ClaimType::Demurrage,
            cost_type: None,
            status: ClaimStatus::Draft,
            payment_status: PaymentStatus::NotSent,
            claim_amount: dec!(100000),
            paid_amount: Decimal::ZERO,
            currency: Currency::USD,
            laytime_used: None,
            demurrage_days: Decimal::ZERO,
            claim_deadline: None,
            is_time_barred: false,
            time_bar_date: None,
            version: 0,
            assigned_to: None,
            created_by: None,
            description: None,
            settlement_notes: None,
            internal_notes: None,
            submitted_at: None,
            sent_to_owner_at: None,
            settled_at: None,
            paid_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_negative_amounts_rejected() {
        let mut claim = sample_claim();
        claim.claim_amount = dec!(-1);
        assert!(claim.validate().is_err());

        let mut claim = sample_claim();
        claim.laytime_used = Some(dec!(-0.5));
        assert!(claim.validate().is_err());
    }

    #[test]
    fn test_partial_then_full_payment() {
        let mut claim = sample_claim();
        let now = Utc::now();

        claim.apply_payment(dec!(40000), now).unwrap();
        assert_eq!(claim.payment_status, PaymentStatus::PartiallyPaid);
        assert_eq!(claim.outstanding_amount().amount(), dec!(60000));

        claim.apply_payment(dec!(60000), now).unwrap();
        assert_eq!(claim.payment_status, PaymentStatus::Paid);
        assert!(claim.outstanding_amount().amount().is_zero());
    }

    #[test]
    fn test_overpayment_leaves_negative_outstanding() {
        let mut claim = sample_claim();
        claim.apply_payment(dec!(120000), Utc::now()).unwrap();
        assert_eq!(claim.payment_status, PaymentStatus::Paid);
        assert_eq!(claim.outstanding_amount().amount(), dec!(-20000));
    }

    #[test]
    fn test_zero_payment_rejected() {
        let mut claim = sample_claim();
        assert!(claim.apply_payment(Decimal::ZERO, Utc::now()).is_err());
        assert_eq!(claim.paid_amount, Decimal::ZERO);
    }

    #[test]
    fn test_status_change_stamps_once() {
        let mut claim = sample_claim();
        let today = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let first = Utc::now();
        let change = StatusChange {
            status: Some(ClaimStatus::Submitted),
            payment_status: Some(PaymentStatus::Sent),
        };

        claim.apply_status_change(&change, today, first).unwrap();
        let stamped = claim.submitted_at;
        claim
            .apply_status_change(&change, today, first + chrono::Duration::hours(1))
            .unwrap();

        assert_eq!(claim.submitted_at, stamped);
        assert!(claim.sent_to_owner_at.is_some());
    }

    #[test]
    fn test_manual_timebar_sets_flag_and_date() {
        let mut claim = sample_claim();
        let today = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let change = StatusChange {
            status: None,
            payment_status: Some(PaymentStatus::Timebar),
        };

        claim.apply_status_change(&change, today, Utc::now()).unwrap();
        assert!(claim.is_time_barred);
        assert_eq!(claim.time_bar_date, Some(today));
    }

    #[test]
    fn test_empty_status_change_rejected() {
        let mut claim = sample_claim();
        let result = claim.apply_status_change(&StatusChange::default(), Utc::now().date_naive(), Utc::now());
        assert!(result.is_err());
    }

    #[test]
    fn test_days_until_deadline() {
        let mut claim = sample_claim();
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        claim.claim_deadline = NaiveDate::from_ymd_opt(2024, 1, 31);
        assert_eq!(claim.days_until_deadline(today), Some(30));
    }
}
