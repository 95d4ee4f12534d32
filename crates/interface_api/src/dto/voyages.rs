//! Voyage DTOs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{Currency, ShipOwnerId, UserId, VoyageId};
use domain_claims::{
    ActivityCategory, AssignmentStatus, CategorySummary, CharterType, DateStatus, NewPortActivity, NewVoyage,
    PortActivity, PortActivityTimeline, VoyageQuery,
};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterVoyageRequest {
    #[validate(length(min = 1, max = 100))]
    pub external_id: String,
    #[validate(length(min = 1, max = 50))]
    pub voyage_number: String,
    #[validate(length(min = 1, max = 200))]
    pub vessel_name: String,
    #[validate(length(max = 20))]
    pub imo_number: Option<String>,
    pub ship_owner_id: Uuid,
    pub charter_type: CharterType,
    #[validate(length(max = 200))]
    pub charter_party: Option<String>,
    #[validate(length(max = 200))]
    pub load_port: Option<String>,
    #[validate(length(max = 200))]
    pub discharge_port: Option<String>,
    pub laycan_start: NaiveDate,
    pub laycan_end: NaiveDate,
    /// Amount per day
    pub demurrage_rate: Decimal,
    /// Days
    pub laytime_allowed: Decimal,
    #[serde(default)]
    pub currency: Currency,
}

impl From<RegisterVoyageRequest> for NewVoyage {
    fn from(request: RegisterVoyageRequest) -> Self {
        NewVoyage {
            external_id: request.external_id,
            voyage_number: request.voyage_number,
            vessel_name: request.vessel_name,
            imo_number: request.imo_number,
            ship_owner_id: ShipOwnerId::from_uuid(request.ship_owner_id),
            charter_type: request.charter_type,
            charter_party: request.charter_party,
            load_port: request.load_port,
            discharge_port: request.discharge_port,
            laycan_start: request.laycan_start,
            laycan_end: request.laycan_end,
            demurrage_rate: request.demurrage_rate,
            laytime_allowed: request.laytime_allowed,
            currency: request.currency,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AssignVoyageRequest {
    pub analyst_id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReassignVoyageRequest {
    pub analyst_id: Uuid,
    #[validate(length(max = 1000))]
    pub reason: Option<String>,
}

/// Query string for listing voyages
#[derive(Debug, Default, Deserialize, Validate)]
pub struct VoyageListParams {
    pub ship_owner_id: Option<Uuid>,
    pub assigned_analyst_id: Option<Uuid>,
    pub assignment_status: Option<AssignmentStatus>,
    #[validate(range(min = 1, max = 500))]
    pub limit: Option<i64>,
    #[validate(range(min = 0))]
    pub offset: Option<i64>,
}

impl From<VoyageListParams> for VoyageQuery {
    fn from(params: VoyageListParams) -> Self {
        VoyageQuery {
            ship_owner_id: params.ship_owner_id.map(ShipOwnerId::from_uuid),
            assigned_analyst_id: params.assigned_analyst_id.map(UserId::from_uuid),
            assignment_status: params.assignment_status,
            limit: params.limit,
            offset: params.offset,
        }
    }
}

fn estimated() -> DateStatus {
    DateStatus::Estimated
}

#[derive(Debug, Deserialize, Validate)]
pub struct RecordPortActivityRequest {
    pub category: ActivityCategory,
    #[validate(length(min = 1, max = 200))]
    pub port_name: String,
    pub start_at: DateTime<Utc>,
    #[serde(default = "estimated")]
    pub start_status: DateStatus,
    pub end_at: DateTime<Utc>,
    #[serde(default = "estimated")]
    pub end_status: DateStatus,
    /// Tonnes
    pub cargo_quantity: Option<Decimal>,
    #[validate(length(max = 5000))]
    pub notes: Option<String>,
}

impl From<RecordPortActivityRequest> for NewPortActivity {
    fn from(request: RecordPortActivityRequest) -> Self {
        NewPortActivity {
            category: request.category,
            port_name: request.port_name,
            start_at: request.start_at,
            start_status: request.start_status,
            end_at: request.end_at,
            end_status: request.end_status,
            cargo_quantity: request.cargo_quantity,
            notes: request.notes,
        }
    }
}

/// A port activity with its computed durations
#[derive(Debug, Serialize)]
pub struct PortActivityResponse {
    #[serde(flatten)]
    pub activity: PortActivity,
    pub duration_hours: Decimal,
    pub duration_days: i64,
}

impl From<PortActivity> for PortActivityResponse {
    fn from(activity: PortActivity) -> Self {
        Self {
            duration_hours: activity.duration_hours(),
            duration_days: activity.duration_days(),
            activity,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TimelineResponse {
    pub voyage_id: VoyageId,
    pub activities: Vec<PortActivityResponse>,
    pub total_hours: Decimal,
    pub by_category: Vec<CategorySummary>,
}

impl From<PortActivityTimeline> for TimelineResponse {
    fn from(timeline: PortActivityTimeline) -> Self {
        Self {
            voyage_id: timeline.voyage_id,
            activities: timeline.activities.into_iter().map(PortActivityResponse::from).collect(),
            total_hours: timeline.total_hours,
            by_category: timeline.by_category,
        }
    }
}
