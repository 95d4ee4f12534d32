//! Voyages and their assignment history

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use core_kernel::{AssignmentId, ShipOwnerId, UserId, VoyageId};
use domain_claims::{Voyage, VoyageAssignment, VoyageQuery};

use super::parse_column;
use crate::error::DatabaseError;

const VOYAGE_COLUMNS: &str = r#"
    id, external_id, voyage_number, vessel_name, imo_number, ship_owner_id,
    charter_type, charter_party, load_port, discharge_port, laycan_start, laycan_end,
    demurrage_rate, laytime_allowed, currency, assignment_status, assigned_analyst_id,
    assigned_at, created_at, updated_at
"#;

/// Repository for voyages
#[derive(Debug, Clone)]
pub struct VoyageRepository {
    pool: PgPool,
}

impl VoyageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, id: Uuid) -> Result<Voyage, DatabaseError> {
        sqlx::query_as::<_, VoyageRow>(&format!("SELECT {} FROM voyages WHERE id = $1", VOYAGE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Voyage", id))?
            .try_into()
    }

    pub async fn insert(&self, voyage: &Voyage) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO voyages (
                id, external_id, voyage_number, vessel_name, imo_number, ship_owner_id,
                charter_type, charter_party, load_port, discharge_port, laycan_start, laycan_end,
                demurrage_rate, laytime_allowed, currency, assignment_status, assigned_analyst_id,
                assigned_at, created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                $11, $12, $13, $14, $15, $16, $17, $18, $19, $20
            )
            "#,
        )
        .bind(Uuid::from(voyage.id))
        .bind(&voyage.external_id)
        .bind(&voyage.voyage_number)
        .bind(&voyage.vessel_name)
        .bind(&voyage.imo_number)
        .bind(Uuid::from(voyage.ship_owner_id))
        .bind(voyage.charter_type.as_str())
        .bind(&voyage.charter_party)
        .bind(&voyage.load_port)
        .bind(&voyage.discharge_port)
        .bind(voyage.laycan_start)
        .bind(voyage.laycan_end)
        .bind(voyage.demurrage_rate)
        .bind(voyage.laytime_allowed)
        .bind(voyage.currency.code())
        .bind(voyage.assignment_status.as_str())
        .bind(voyage.assigned_analyst_id.map(Uuid::from))
        .bind(voyage.assigned_at)
        .bind(voyage.created_at)
        .bind(voyage.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Voyages matching the query, latest laycan first
    pub async fn find(&self, query: &VoyageQuery) -> Result<Vec<Voyage>, DatabaseError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM voyages WHERE TRUE", VOYAGE_COLUMNS));
        if let Some(owner) = query.ship_owner_id {
            builder.push(" AND ship_owner_id = ").push_bind(Uuid::from(owner));
        }
        if let Some(analyst) = query.assigned_analyst_id {
            builder.push(" AND assigned_analyst_id = ").push_bind(Uuid::from(analyst));
        }
        if let Some(status) = query.assignment_status {
            builder.push(" AND assignment_status = ").push_bind(status.as_str());
        }
        builder.push(" ORDER BY laycan_start DESC, voyage_number ASC");
        if let Some(limit) = query.limit {
            builder.push(" LIMIT ").push_bind(limit.max(0));
        }
        if let Some(offset) = query.offset {
            builder.push(" OFFSET ").push_bind(offset.max(0));
        }

        builder
            .build_query_as::<VoyageRow>()
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Voyage::try_from)
            .collect()
    }

    /// Assignment records of a voyage, oldest first
    pub async fn assignment_history(&self, voyage_id: Uuid) -> Result<Vec<VoyageAssignment>, DatabaseError> {
        let rows = sqlx::query_as::<_, AssignmentRow>(
            r#"
            SELECT id, voyage_id, assigned_to, assigned_by, assigned_at, unassigned_at, is_active, reason
            FROM voyage_assignments
            WHERE voyage_id = $1
            ORDER BY assigned_at ASC, is_active ASC
            "#,
        )
        .bind(voyage_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(VoyageAssignment::from).collect())
    }

    /// Writes the voyage's assignment columns; fails when the voyage is gone
    pub async fn update_assignment(conn: &mut PgConnection, voyage: &Voyage) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE voyages
            SET assignment_status = $2, assigned_analyst_id = $3, assigned_at = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(Uuid::from(voyage.id))
        .bind(voyage.assignment_status.as_str())
        .bind(voyage.assigned_analyst_id.map(Uuid::from))
        .bind(voyage.assigned_at)
        .bind(voyage.updated_at)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Voyage", voyage.id));
        }
        Ok(())
    }

    /// Closes the active assignment record, if any
    pub async fn close_active_assignment(
        conn: &mut PgConnection,
        voyage_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<u64, DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE voyage_assignments
            SET is_active = FALSE, unassigned_at = $2
            WHERE voyage_id = $1 AND is_active
            "#,
        )
        .bind(voyage_id)
        .bind(at)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn insert_assignment(
        conn: &mut PgConnection,
        assignment: &VoyageAssignment,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO voyage_assignments (
                id, voyage_id, assigned_to, assigned_by, assigned_at, unassigned_at, is_active, reason
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(Uuid::from(assignment.id))
        .bind(Uuid::from(assignment.voyage_id))
        .bind(Uuid::from(assignment.assigned_to))
        .bind(assignment.assigned_by.map(Uuid::from))
        .bind(assignment.assigned_at)
        .bind(assignment.unassigned_at)
        .bind(assignment.is_active)
        .bind(&assignment.reason)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }
}

/// Database row for a voyage
#[derive(Debug, Clone, FromRow)]
pub struct VoyageRow {
    pub id: Uuid,
    pub external_id: String,
    pub voyage_number: String,
    pub vessel_name: String,
    pub imo_number: Option<String>,
    pub ship_owner_id: Uuid,
    pub charter_type: String,
    pub charter_party: Option<String>,
    pub load_port: Option<String>,
    pub discharge_port: Option<String>,
    pub laycan_start: NaiveDate,
    pub laycan_end: NaiveDate,
    pub demurrage_rate: Decimal,
    pub laytime_allowed: Decimal,
    pub currency: String,
    pub assignment_status: String,
    pub assigned_analyst_id: Option<Uuid>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<VoyageRow> for Voyage {
    type Error = DatabaseError;

    fn try_from(row: VoyageRow) -> Result<Self, Self::Error> {
        Ok(Voyage {
            id: VoyageId::from(row.id),
            external_id: row.external_id,
            voyage_number: row.voyage_number,
            vessel_name: row.vessel_name,
            imo_number: row.imo_number,
            ship_owner_id: ShipOwnerId::from(row.ship_owner_id),
            charter_type: parse_column("voyages.charter_type", &row.charter_type)?,
            charter_party: row.charter_party,
            load_port: row.load_port,
            discharge_port: row.discharge_port,
            laycan_start: row.laycan_start,
            laycan_end: row.laycan_end,
            demurrage_rate: row.demurrage_rate,
            laytime_allowed: row.laytime_allowed,
            currency: parse_column("voyages.currency", &row.currency)?,
            assignment_status: parse_column("voyages.assignment_status", &row.assignment_status)?,
            assigned_analyst_id: row.assigned_analyst_id.map(UserId::from),
            assigned_at: row.assigned_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Database row for an assignment record
#[derive(Debug, Clone, FromRow)]
pub struct AssignmentRow {
    pub id: Uuid,
    pub voyage_id: Uuid,
    pub assigned_to: Uuid,
    pub assigned_by: Option<Uuid>,
    pub assigned_at: DateTime<Utc>,
    pub unassigned_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub reason: Option<String>,
}

impl From<AssignmentRow> for VoyageAssignment {
    fn from(row: AssignmentRow) -> Self {
        VoyageAssignment {
            id: AssignmentId::from(row.id),
            voyage_id: VoyageId::from(row.voyage_id),
            assigned_to: UserId::from(row.assigned_to),
            assigned_by: row.assigned_by.map(UserId::from),
            assigned_at: row.assigned_at,
            unassigned_at: row.unassigned_at,
            is_active: row.is_active,
            reason: row.reason,
        }
    }
}
