//! Voyages, ship owners and voyage assignment history

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use core_kernel::{AssignmentId, Currency, ShipOwnerId, UserId, VoyageId};
use crate::error::ClaimError;

/// Smallest contractual demurrage rate accepted per day
pub const MIN_DEMURRAGE_RATE: Decimal = dec!(0.01);

text_enum! {
    /// Voyage assignment status
    AssignmentStatus {
        Unassigned => "UNASSIGNED",
        Assigned => "ASSIGNED",
        Completed => "COMPLETED",
    }
}

text_enum! {
    /// Charter type
    CharterType {
        Spot => "SPOT",
        Traded => "TRADED",
    }
}

/// Counterparty against whom claims are raised
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipOwner {
    pub id: ShipOwnerId,
    pub name: String,
    pub code: String,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ShipOwner {
    pub fn new(name: impl Into<String>, code: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: ShipOwnerId::new_v7(),
            name: name.into(),
            code: code.into(),
            contact_email: None,
            contact_phone: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A shipping voyage under a charter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voyage {
    pub id: VoyageId,
    /// Identifier in the chartering system; unique
    pub external_id: String,
    pub voyage_number: String,
    pub vessel_name: String,
    pub imo_number: Option<String>,
    pub ship_owner_id: ShipOwnerId,
    pub charter_type: CharterType,
    pub charter_party: Option<String>,
    pub load_port: Option<String>,
    pub discharge_port: Option<String>,
    pub laycan_start: NaiveDate,
    pub laycan_end: NaiveDate,
    /// Demurrage rate per day in `currency`
    pub demurrage_rate: Decimal,
    /// Allowed laytime in days
    pub laytime_allowed: Decimal,
    pub currency: Currency,
    pub assignment_status: AssignmentStatus,
    pub assigned_analyst_id: Option<UserId>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Voyage {
    pub fn validate(&self) -> Result<(), ClaimError> {
        validate_voyage_fields(
            &self.external_id,
            self.laycan_start,
            self.laycan_end,
            self.demurrage_rate,
            self.laytime_allowed,
        )?;
        if !self.assignment_is_consistent() {
            return Err(ClaimError::validation(
                "an ASSIGNED voyage needs an analyst and an assignment time",
            ));
        }
        Ok(())
    }

    /// `ASSIGNED` implies analyst and timestamp are both set
    pub fn assignment_is_consistent(&self) -> bool {
        self.assignment_status != AssignmentStatus::Assigned
            || (self.assigned_analyst_id.is_some() && self.assigned_at.is_some())
    }

    pub fn is_assigned(&self) -> bool {
        self.assignment_status == AssignmentStatus::Assigned
    }

    /// Points the voyage at a new analyst
    ///
    /// Cascading the analyst onto the voyage's unassigned claims is the
    /// store's job and happens in the same transaction as this update.
    pub fn assign_to(&mut self, analyst: UserId, now: DateTime<Utc>) {
        self.assigned_analyst_id = Some(analyst);
        self.assignment_status = AssignmentStatus::Assigned;
        self.assigned_at = Some(now);
        self.updated_at = now;
    }
}

/// Input for registering a voyage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVoyage {
    pub external_id: String,
    pub voyage_number: String,
    pub vessel_name: String,
    pub imo_number: Option<String>,
    pub ship_owner_id: ShipOwnerId,
    pub charter_type: CharterType,
    pub charter_party: Option<String>,
    pub load_port: Option<String>,
    pub discharge_port: Option<String>,
    pub laycan_start: NaiveDate,
    pub laycan_end: NaiveDate,
    pub demurrage_rate: Decimal,
    pub laytime_allowed: Decimal,
    pub currency: Currency,
}

impl NewVoyage {
    pub fn validate(&self) -> Result<(), ClaimError> {
        if self.voyage_number.trim().is_empty() {
            return Err(ClaimError::validation("voyage number is required"));
        }
        if self.vessel_name.trim().is_empty() {
            return Err(ClaimError::validation("vessel name is required"));
        }
        validate_voyage_fields(
            &self.external_id,
            self.laycan_start,
            self.laycan_end,
            self.demurrage_rate,
            self.laytime_allowed,
        )
    }

    /// Builds an unassigned voyage
    pub fn into_voyage(self, now: DateTime<Utc>) -> Voyage {
        Voyage {
            id: VoyageId::new_v7(),
            external_id: self.external_id.trim().to_string(),
            voyage_number: self.voyage_number,
            vessel_name: self.vessel_name,
            imo_number: self.imo_number,
            ship_owner_id: self.ship_owner_id,
            charter_type: self.charter_type,
            charter_party: self.charter_party,
            load_port: self.load_port,
            discharge_port: self.discharge_port,
            laycan_start: self.laycan_start,
            laycan_end: self.laycan_end,
            demurrage_rate: self.demurrage_rate,
            laytime_allowed: self.laytime_allowed,
            currency: self.currency,
            assignment_status: AssignmentStatus::Unassigned,
            assigned_analyst_id: None,
            assigned_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

fn validate_voyage_fields(
    external_id: &str,
    laycan_start: NaiveDate,
    laycan_end: NaiveDate,
    demurrage_rate: Decimal,
    laytime_allowed: Decimal,
) -> Result<(), ClaimError> {
    if external_id.trim().is_empty() {
        return Err(ClaimError::validation("voyage external id is required"));
    }
    if laycan_end < laycan_start {
        return Err(ClaimError::validation(format!(
            "laycan end {} is before laycan start {}",
            laycan_end, laycan_start
        )));
    }
    if demurrage_rate < MIN_DEMURRAGE_RATE {
        return Err(ClaimError::validation(format!(
            "demurrage rate must be at least {}",
            MIN_DEMURRAGE_RATE
        )));
    }
    if laytime_allowed < Decimal::ZERO {
        return Err(ClaimError::validation("allowed laytime must not be negative"));
    }
    Ok(())
}

/// Append-only record of who held a voyage and when
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoyageAssignment {
    pub id: AssignmentId,
    pub voyage_id: VoyageId,
    pub assigned_to: UserId,
    pub assigned_by: Option<UserId>,
    pub assigned_at: DateTime<Utc>,
    pub unassigned_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub reason: Option<String>,
}

impl VoyageAssignment {
    pub fn new(
        voyage_id: VoyageId,
        assigned_to: UserId,
        assigned_by: Option<UserId>,
        assigned_at: DateTime<Utc>,
        reason: Option<String>,
    ) -> Self {
        Self {
            id: AssignmentId::new_v7(),
            voyage_id,
            assigned_to,
            assigned_by,
            assigned_at,
            unassigned_at: None,
            is_active: true,
            reason,
        }
    }

    /// Closes an active record
    pub fn close(&mut self, at: DateTime<Utc>) {
        self.is_active = false;
        self.unassigned_at = Some(at);
    }
}
