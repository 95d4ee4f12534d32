//! Derived claim fields
//!
//! [`derive_fields`] is a pure function of the claim, its voyage and the
//! business date. The service calls it before every insert and update so
//! the store never has to know the rules.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use core_kernel::UserId;
use crate::claim::{Claim, ClaimType, PaymentStatus};
use crate::voyage::Voyage;

/// A claim with its derived fields refreshed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Derivation {
    pub claim: Claim,
    /// The deadline check flipped the claim to time-barred on this pass
    pub newly_time_barred: bool,
    /// Assignee copied from the voyage on this pass
    pub inherited_assignee: Option<UserId>,
}

/// Days over the allowed laytime, never negative
pub fn demurrage_days(laytime_used: Decimal, laytime_allowed: Decimal) -> Decimal {
    (laytime_used - laytime_allowed).max(Decimal::ZERO)
}

/// Deadline passed while the claim was never sent
pub fn is_due_for_time_bar(claim: &Claim, today: NaiveDate) -> bool {
    match claim.claim_deadline {
        Some(deadline) => {
            !claim.is_time_barred && today > deadline && claim.payment_status == PaymentStatus::NotSent
        }
        None => false,
    }
}

/// Recomputes owner, demurrage days, inherited assignee and time-bar state
pub fn derive_fields(mut claim: Claim, voyage: &Voyage, today: NaiveDate) -> Derivation {
    claim.ship_owner_id = voyage.ship_owner_id;

    if claim.claim_type == ClaimType::Demurrage {
        if let Some(used) = claim.laytime_used {
            claim.demurrage_days = demurrage_days(used, voyage.laytime_allowed);
        }
    }

    let mut inherited_assignee = None;
    if claim.assigned_to.is_none() {
        if let Some(analyst) = voyage.assigned_analyst_id {
            claim.assigned_to = Some(analyst);
            inherited_assignee = Some(analyst);
        }
    }

    let newly_time_barred = is_due_for_time_bar(&claim, today);
    if newly_time_barred {
        claim.mark_time_barred(today);
    }

    Derivation {
        claim,
        newly_time_barred,
        inherited_assignee,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_demurrage_days_clamped() {
        assert_eq!(demurrage_days(dec!(90.00), dec!(72.00)), dec!(18.00));
        assert_eq!(demurrage_days(dec!(60.00), dec!(72.00)), dec!(0));
        assert_eq!(demurrage_days(dec!(72.00), dec!(72.00)), dec!(0));
    }
}
