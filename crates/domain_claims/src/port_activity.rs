//! Port activity timeline of a voyage
//!
//! Activities record what the vessel did in port and when: loading,
//! discharging, waiting, bunkering. They are the laytime evidence behind a
//! demurrage claim. Times start out estimated and are replaced by actual
//! ones as the statement of facts comes in.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{PortActivityId, UserId, VoyageId};
use crate::error::ClaimError;

text_enum! {
    /// Broad kind of port activity
    ActivityCategory {
        CargoOps => "CARGO_OPS",
        Ballasting => "BALLASTING",
        Cleaning => "CLEANING",
        Bunkering => "BUNKERING",
        Maintenance => "MAINTENANCE",
        Operational => "OPERATIONAL",
        Administrative => "ADMINISTRATIVE",
        Offhire => "OFFHIRE",
        Transit => "TRANSIT",
        Commercial => "COMMERCIAL",
    }
}

text_enum! {
    /// Whether a timestamp is a plan or a fact
    DateStatus {
        Estimated => "ESTIMATED",
        Actual => "ACTUAL",
    }
}

/// One activity on a voyage's timeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortActivity {
    pub id: PortActivityId,
    pub voyage_id: VoyageId,
    pub category: ActivityCategory,
    pub port_name: String,
    pub start_at: DateTime<Utc>,
    pub start_status: DateStatus,
    pub end_at: DateTime<Utc>,
    pub end_status: DateStatus,
    /// Tonnes handled, for cargo operations
    pub cargo_quantity: Option<Decimal>,
    pub notes: Option<String>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

/// Input for recording a port activity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPortActivity {
    pub category: ActivityCategory,
    pub port_name: String,
    pub start_at: DateTime<Utc>,
    pub start_status: DateStatus,
    pub end_at: DateTime<Utc>,
    pub end_status: DateStatus,
    pub cargo_quantity: Option<Decimal>,
    pub notes: Option<String>,
}

impl PortActivity {
    pub fn new(
        voyage_id: VoyageId,
        input: NewPortActivity,
        created_by: UserId,
        now: DateTime<Utc>,
    ) -> Result<Self, ClaimError> {
        let port_name = input.port_name.trim();
        if port_name.is_empty() {
            return Err(ClaimError::validation("port name is required"));
        }
        if input.end_at <= input.start_at {
            return Err(ClaimError::validation("activity must end after it starts"));
        }
        if matches!(input.cargo_quantity, Some(q) if q < Decimal::ZERO) {
            return Err(ClaimError::validation("cargo quantity must not be negative"));
        }
        Ok(Self {
            id: PortActivityId::new_v7(),
            voyage_id,
            category: input.category,
            port_name: port_name.to_string(),
            start_at: input.start_at,
            start_status: input.start_status,
            end_at: input.end_at,
            end_status: input.end_status,
            cargo_quantity: input.cargo_quantity,
            notes: input.notes.filter(|n| !n.trim().is_empty()),
            created_by,
            created_at: now,
        })
    }

    pub fn duration(&self) -> Duration {
        self.end_at - self.start_at
    }

    /// Duration in hours, to two decimals
    pub fn duration_hours(&self) -> Decimal {
        (Decimal::from(self.duration().num_seconds()) / Decimal::from(3600)).round_dp(2)
    }

    /// Whole days elapsed
    pub fn duration_days(&self) -> i64 {
        self.duration().num_days()
    }

    pub fn is_fully_actual(&self) -> bool {
        self.start_status == DateStatus::Actual && self.end_status == DateStatus::Actual
    }

    pub fn is_fully_estimated(&self) -> bool {
        self.start_status == DateStatus::Estimated && self.end_status == DateStatus::Estimated
    }

    /// Time ranges intersect; touching ends do not count
    pub fn overlaps(&self, other: &PortActivity) -> bool {
        self.start_at < other.end_at && other.start_at < self.end_at
    }
}

/// Totals for one category on a timeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySummary {
    pub category: ActivityCategory,
    pub activities: usize,
    pub total_hours: Decimal,
    pub total_cargo: Decimal,
}

/// A voyage's activities in start order with per-category totals
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortActivityTimeline {
    pub voyage_id: VoyageId,
    pub activities: Vec<PortActivity>,
    pub total_hours: Decimal,
    /// Busiest category first
    pub by_category: Vec<CategorySummary>,
}

impl PortActivityTimeline {
    pub fn new(voyage_id: VoyageId, mut activities: Vec<PortActivity>) -> Self {
        activities.sort_by(|a, b| a.start_at.cmp(&b.start_at).then(a.id.cmp(&b.id)));

        let mut by_category: Vec<CategorySummary> = Vec::new();
        for activity in &activities {
            let index = match by_category.iter().position(|s| s.category == activity.category) {
                Some(index) => index,
                None => {
                    by_category.push(CategorySummary {
                        category: activity.category,
                        activities: 0,
                        total_hours: Decimal::ZERO,
                        total_cargo: Decimal::ZERO,
                    });
                    by_category.len() - 1
                }
            };
            let summary = &mut by_category[index];
            summary.activities += 1;
            summary.total_hours += activity.duration_hours();
            summary.total_cargo += activity.cargo_quantity.unwrap_or_default();
        }
        by_category.sort_by(|a, b| {
            b.activities
                .cmp(&a.activities)
                .then_with(|| a.category.as_str().cmp(b.category.as_str()))
        });

        Self {
            voyage_id,
            total_hours: by_category.iter().map(|s| s.total_hours).sum(),
            activities,
            by_category,
        }
    }

    /// First activity that intersects `candidate`
    pub fn conflict_with(&self, candidate: &PortActivity) -> Option<&PortActivity> {
        self.activities.iter().find(|a| a.overlaps(candidate))
    }
}
