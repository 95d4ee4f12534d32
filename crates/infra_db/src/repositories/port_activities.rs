//! Port activity timelines

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use core_kernel::{PortActivityId, UserId, VoyageId};
use domain_claims::PortActivity;

use super::parse_column;
use crate::error::DatabaseError;

/// Repository for port activities
#[derive(Debug, Clone)]
pub struct PortActivityRepository {
    pool: PgPool,
}

impl PortActivityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, activity: &PortActivity) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO port_activities (
                id, voyage_id, category, port_name, start_at, start_status, end_at, end_status,
                cargo_quantity, notes, created_by, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(Uuid::from(activity.id))
        .bind(Uuid::from(activity.voyage_id))
        .bind(activity.category.as_str())
        .bind(&activity.port_name)
        .bind(activity.start_at)
        .bind(activity.start_status.as_str())
        .bind(activity.end_at)
        .bind(activity.end_status.as_str())
        .bind(activity.cargo_quantity)
        .bind(&activity.notes)
        .bind(Uuid::from(activity.created_by))
        .bind(activity.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Activities of a voyage, earliest start first
    pub async fn list_for_voyage(&self, voyage_id: Uuid) -> Result<Vec<PortActivity>, DatabaseError> {
        sqlx::query_as::<_, PortActivityRow>(
            r#"
            SELECT id, voyage_id, category, port_name, start_at, start_status, end_at, end_status,
                   cargo_quantity, notes, created_by, created_at
            FROM port_activities
            WHERE voyage_id = $1
            ORDER BY start_at ASC, id ASC
            "#,
        )
        .bind(voyage_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(PortActivity::try_from)
        .collect()
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct PortActivityRow {
    pub id: Uuid,
    pub voyage_id: Uuid,
    pub category: String,
    pub port_name: String,
    pub start_at: DateTime<Utc>,
    pub start_status: String,
    pub end_at: DateTime<Utc>,
    pub end_status: String,
    pub cargo_quantity: Option<Decimal>,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<PortActivityRow> for PortActivity {
    type Error = DatabaseError;

    fn try_from(row: PortActivityRow) -> Result<Self, Self::Error> {
        Ok(PortActivity {
            id: PortActivityId::from(row.id),
            voyage_id: VoyageId::from(row.voyage_id),
            category: parse_column("port_activities.category", &row.category)?,
            port_name: row.port_name,
            start_at: row.start_at,
            start_status: parse_column("port_activities.start_status", &row.start_status)?,
            end_at: row.end_at,
            end_status: parse_column("port_activities.end_status", &row.end_status)?,
            cargo_quantity: row.cargo_quantity,
            notes: row.notes,
            created_by: UserId::from(row.created_by),
            created_at: row.created_at,
        })
    }
}
