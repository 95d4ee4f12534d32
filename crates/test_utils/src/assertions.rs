//! Custom Test Assertions
//!
//! Assertion helpers for claims that give more meaningful failure messages
//! than plain `assert!`.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use domain_claims::{Claim, ClaimError, ClaimNumber, PaymentStatus};

/// Asserts that a claim number is well formed and dated `date`
pub fn assert_claim_number_on(claim: &Claim, date: NaiveDate) {
    let parsed: ClaimNumber = claim
        .claim_number
        .parse()
        .unwrap_or_else(|e| panic!("claim number '{}' is malformed: {}", claim.claim_number, e));
    assert_eq!(
        parsed.date(),
        date,
        "claim number {} is not dated {}",
        claim.claim_number,
        date
    );
}

/// Asserts the claim is time-barred on `date` with payment status TIMEBAR
pub fn assert_time_barred_on(claim: &Claim, date: NaiveDate) {
    assert!(claim.is_time_barred, "claim {} is not time-barred", claim.claim_number);
    assert_eq!(claim.payment_status, PaymentStatus::Timebar);
    assert_eq!(
        claim.time_bar_date,
        Some(date),
        "claim {} time-bar date mismatch",
        claim.claim_number
    );
}

/// Asserts demurrage days equal `expected`, ignoring scale
pub fn assert_demurrage_days(claim: &Claim, expected: Decimal) {
    assert_eq!(
        claim.demurrage_days.normalize(),
        expected.normalize(),
        "demurrage days: actual={}, expected={}",
        claim.demurrage_days,
        expected
    );
}

/// Asserts a result failed with a concurrency conflict
pub fn assert_conflict<T: std::fmt::Debug>(result: Result<T, ClaimError>) {
    match result {
        Err(ClaimError::ConcurrencyConflict { .. }) => {}
        other => panic!("expected ConcurrencyConflict, got {:?}", other),
    }
}

/// Asserts a result failed with a permission error
pub fn assert_permission_denied<T: std::fmt::Debug>(result: Result<T, ClaimError>) {
    match result {
        Err(ClaimError::PermissionDenied(_)) => {}
        other => panic!("expected PermissionDenied, got {:?}", other),
    }
}

/// Asserts a result failed validation
pub fn assert_validation<T: std::fmt::Debug>(result: Result<T, ClaimError>) {
    match result {
        Err(ClaimError::Validation(_)) => {}
        other => panic!("expected Validation, got {:?}", other),
    }
}
