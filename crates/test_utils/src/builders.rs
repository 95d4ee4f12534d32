//! Test Data Builders
//!
//! Builder patterns for voyage and claim input with sensible defaults, so
//! tests only spell out the fields they care about.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use core_kernel::{Currency, ShipOwnerId, UserId, VoyageId};
use domain_claims::{CharterType, ClaimType, CostType, NewClaim, NewVoyage};

use crate::fixtures::DateFixtures;

/// Builder for voyage registration input
pub struct VoyageBuilder {
    input: NewVoyage,
}

impl VoyageBuilder {
    /// A spot voyage with 72 days laytime allowed at 25,000 USD/day
    pub fn new(ship_owner_id: ShipOwnerId) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self {
            input: NewVoyage {
                external_id: format!("EXT-{}", &suffix[..12]),
                voyage_number: format!("V-{}", &suffix[..6].to_uppercase()),
                vessel_name: "MV Test Carrier".to_string(),
                imo_number: Some("9321483".to_string()),
                ship_owner_id,
                charter_type: CharterType::Spot,
                charter_party: Some("GENCON 1994".to_string()),
                load_port: Some("Rotterdam".to_string()),
                discharge_port: Some("Singapore".to_string()),
                laycan_start: DateFixtures::date(2024, 1, 10),
                laycan_end: DateFixtures::date(2024, 1, 15),
                demurrage_rate: dec!(25000),
                laytime_allowed: dec!(72.00),
                currency: Currency::USD,
            },
        }
    }

    pub fn external_id(mut self, external_id: impl Into<String>) -> Self {
        self.input.external_id = external_id.into();
        self
    }

    pub fn laytime_allowed(mut self, days: Decimal) -> Self {
        self.input.laytime_allowed = days;
        self
    }

    pub fn demurrage_rate(mut self, rate: Decimal) -> Self {
        self.input.demurrage_rate = rate;
        self
    }

    pub fn laycan(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.input.laycan_start = start;
        self.input.laycan_end = end;
        self
    }

    pub fn currency(mut self, currency: Currency) -> Self {
        self.input.currency = currency;
        self
    }

    pub fn build(self) -> NewVoyage {
        self.input
    }
}

/// Builder for claim creation input
pub struct NewClaimBuilder {
    input: NewClaim,
}

impl NewClaimBuilder {
    /// A 100,000 demurrage claim with no laytime, deadline or assignee
    pub fn new(voyage_id: VoyageId) -> Self {
        Self {
            input: NewClaim {
                voyage_id,
                claim_type: ClaimType::Demurrage,
                cost_type: None,
                external_id: None,
                claim_amount: dec!(100000),
                currency: None,
                laytime_used: None,
                claim_deadline: None,
                assigned_to: None,
                description: None,
            },
        }
    }

    pub fn claim_type(mut self, claim_type: ClaimType) -> Self {
        self.input.claim_type = claim_type;
        self
    }

    pub fn cost_type(mut self, cost_type: CostType) -> Self {
        self.input.cost_type = Some(cost_type);
        self
    }

    pub fn amount(mut self, amount: Decimal) -> Self {
        self.input.claim_amount = amount;
        self
    }

    pub fn laytime_used(mut self, days: Decimal) -> Self {
        self.input.laytime_used = Some(days);
        self
    }

    pub fn deadline(mut self, deadline: NaiveDate) -> Self {
        self.input.claim_deadline = Some(deadline);
        self
    }

    pub fn assigned_to(mut self, user: UserId) -> Self {
        self.input.assigned_to = Some(user);
        self
    }

    pub fn external_id(mut self, external_id: impl Into<String>) -> Self {
        self.input.external_id = Some(external_id.into());
        self
    }

    pub fn currency(mut self, currency: Currency) -> Self {
        self.input.currency = Some(currency);
        self
    }

    pub fn build(self) -> NewClaim {
        self.input
    }
}
