//! Property-Based Test Generators
//!
//! Provides proptest strategies for generating claim inputs that respect
//! the domain's validation rules.

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use rust_decimal::Decimal;

use core_kernel::Currency;
use domain_claims::{ClaimStatus, ClaimType, PaymentStatus};

/// Strategy for generating supported currencies
pub fn currency_strategy() -> impl Strategy<Value = Currency> {
    proptest::sample::select(Currency::ALL.to_vec())
}

/// Strategy for generating claim types
pub fn claim_type_strategy() -> impl Strategy<Value = ClaimType> {
    proptest::sample::select(ClaimType::ALL.to_vec())
}

pub fn claim_status_strategy() -> impl Strategy<Value = ClaimStatus> {
    proptest::sample::select(ClaimStatus::ALL.to_vec())
}

pub fn payment_status_strategy() -> impl Strategy<Value = PaymentStatus> {
    proptest::sample::select(PaymentStatus::ALL.to_vec())
}

/// Laytime in days with two decimals, 0.00 to 365.00
pub fn laytime_days_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..=36_500i64).prop_map(|hundredths| Decimal::new(hundredths, 2))
}

/// Non-negative claim amounts with cents
pub fn claim_amount_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strictly positive payment amounts with cents
pub fn payment_amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Dates within a few years of 2024-01-01
pub fn date_strategy() -> impl Strategy<Value = NaiveDate> {
    (0i64..1500i64).prop_map(|offset| {
        NaiveDate::from_ymd_opt(2023, 1, 1).unwrap() + Duration::days(offset)
    })
}
