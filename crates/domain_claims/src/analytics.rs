//! Portfolio figures over a set of claims

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::claim::Claim;

/// Totals and breakdowns for a list of claims
///
/// Amounts are summed as plain decimals across currencies, matching how the
/// back office reports them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClaimAnalytics {
    pub total_claims: usize,
    pub total_claimed: Decimal,
    pub total_paid: Decimal,
    /// May be negative when claims are overpaid
    pub total_outstanding: Decimal,
    pub time_barred: usize,
    pub by_status: BTreeMap<String, usize>,
    pub by_payment_status: BTreeMap<String, usize>,
    pub by_claim_type: BTreeMap<String, usize>,
}

impl ClaimAnalytics {
    pub fn from_claims(claims: &[Claim]) -> Self {
        let mut analytics = Self::default();
        for claim in claims {
            analytics.total_claims += 1;
            analytics.total_claimed += claim.claim_amount;
            analytics.total_paid += claim.paid_amount;
            if claim.is_time_barred {
                analytics.time_barred += 1;
            }
            *analytics.by_status.entry(claim.status.to_string()).or_default() += 1;
            *analytics
                .by_payment_status
                .entry(claim.payment_status.to_string())
                .or_default() += 1;
            *analytics.by_claim_type.entry(claim.claim_type.to_string()).or_default() += 1;
        }
        analytics.total_outstanding = analytics.total_claimed - analytics.total_paid;
        analytics
    }
}
