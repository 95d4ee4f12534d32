//! Claims repository
//!
//! Reads go through the pool. Inserts, guarded updates and deletes take a
//! connection so the adapter can run them in the same transaction as the
//! activity entries they produce.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use core_kernel::{ClaimId, ShipOwnerId, UserId, VoyageId};
use domain_claims::{Claim, ClaimQuery};

use super::{parse_column, parse_optional};
use crate::error::DatabaseError;

const CLAIM_COLUMNS: &str = r#"
    id, claim_number, external_id, voyage_id, ship_owner_id, claim_type, cost_type,
    status, payment_status, claim_amount, paid_amount, currency, laytime_used,
    demurrage_days, claim_deadline, is_time_barred, time_bar_date, version,
    assigned_to, created_by, description, settlement_notes, internal_notes,
    submitted_at, sent_to_owner_at, settled_at, paid_at, created_at, updated_at
"#;

/// Repository for managing claims data
#[derive(Debug, Clone)]
pub struct ClaimsRepository {
    pool: PgPool,
}

impl ClaimsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Claim, DatabaseError> {
        sqlx::query_as::<_, ClaimRow>(&format!("SELECT {} FROM claims WHERE id = $1", CLAIM_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Claim", id))?
            .try_into()
    }

    /// Claims matching the query, newest first
    pub async fn find(&self, query: &ClaimQuery) -> Result<Vec<Claim>, DatabaseError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM claims WHERE TRUE", CLAIM_COLUMNS));

        if let Some(voyage) = query.voyage_id {
            builder.push(" AND voyage_id = ").push_bind(Uuid::from(voyage));
        }
        if let Some(owner) = query.ship_owner_id {
            builder.push(" AND ship_owner_id = ").push_bind(Uuid::from(owner));
        }
        if let Some(user) = query.assigned_to {
            builder.push(" AND assigned_to = ").push_bind(Uuid::from(user));
        }
        if let Some(status) = query.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(status) = query.payment_status {
            builder.push(" AND payment_status = ").push_bind(status.as_str());
        }
        if let Some(claim_type) = query.claim_type {
            builder.push(" AND claim_type = ").push_bind(claim_type.as_str());
        }
        if let Some(barred) = query.is_time_barred {
            builder.push(" AND is_time_barred = ").push_bind(barred);
        }
        if let Some(from) = query.deadline_from {
            builder.push(" AND claim_deadline >= ").push_bind(from);
        }
        if let Some(to) = query.deadline_to {
            builder.push(" AND claim_deadline <= ").push_bind(to);
        }
        if let Some(before) = query.deadline_before {
            builder.push(" AND claim_deadline < ").push_bind(before);
        }
        builder.push(" ORDER BY created_at DESC, claim_number DESC");
        if let Some(limit) = query.limit {
            builder.push(" LIMIT ").push_bind(limit.max(0));
        }
        if let Some(offset) = query.offset {
            builder.push(" OFFSET ").push_bind(offset.max(0));
        }

        builder
            .build_query_as::<ClaimRow>()
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Claim::try_from)
            .collect()
    }

    /// Highest claim number starting with `prefix`
    pub async fn latest_number(&self, prefix: &str) -> Result<Option<String>, DatabaseError> {
        let number = sqlx::query_scalar::<_, String>(
            r#"
            SELECT claim_number FROM claims
            WHERE claim_number LIKE $1
            ORDER BY claim_number DESC
            LIMIT 1
            "#,
        )
        .bind(format!("{}%", prefix))
        .fetch_optional(&self.pool)
        .await?;
        Ok(number)
    }

    pub async fn insert(conn: &mut PgConnection, claim: &Claim) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO claims (
                id, claim_number, external_id, voyage_id, ship_owner_id, claim_type, cost_type,
                status, payment_status, claim_amount, paid_amount, currency, laytime_used,
                demurrage_days, claim_deadline, is_time_barred, time_bar_date, version,
                assigned_to, created_by, description, settlement_notes, internal_notes,
                submitted_at, sent_to_owner_at, settled_at, paid_at, created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                $11, $12, $13, $14, $15, $16, $17, $18, $19, $20,
                $21, $22, $23, $24, $25, $26, $27, $28, $29
            )
            "#,
        )
        .bind(Uuid::from(claim.id))
        .bind(&claim.claim_number)
        .bind(&claim.external_id)
        .bind(Uuid::from(claim.voyage_id))
        .bind(Uuid::from(claim.ship_owner_id))
        .bind(claim.claim_type.as_str())
        .bind(claim.cost_type.map(|c| c.as_str()))
        .bind(claim.status.as_str())
        .bind(claim.payment_status.as_str())
        .bind(claim.claim_amount)
        .bind(claim.paid_amount)
        .bind(claim.currency.code())
        .bind(claim.laytime_used)
        .bind(claim.demurrage_days)
        .bind(claim.claim_deadline)
        .bind(claim.is_time_barred)
        .bind(claim.time_bar_date)
        .bind(claim.version)
        .bind(claim.assigned_to.map(Uuid::from))
        .bind(claim.created_by.map(Uuid::from))
        .bind(&claim.description)
        .bind(&claim.settlement_notes)
        .bind(&claim.internal_notes)
        .bind(claim.submitted_at)
        .bind(claim.sent_to_owner_at)
        .bind(claim.settled_at)
        .bind(claim.paid_at)
        .bind(claim.created_at)
        .bind(claim.updated_at)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Locks the claim row and returns its current version
    pub async fn lock_version(conn: &mut PgConnection, id: Uuid) -> Result<i64, DatabaseError> {
        sqlx::query_scalar::<_, i64>("SELECT version FROM claims WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Claim", id))
    }

    /// Writes every mutable column when the stored version is `expected_version`
    ///
    /// Returns false when no row matched, meaning the version moved on.
    pub async fn update_guarded(
        conn: &mut PgConnection,
        claim: &Claim,
        expected_version: i64,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE claims SET
                external_id = $3,
                voyage_id = $4,
                ship_owner_id = $5,
                claim_type = $6,
                cost_type = $7,
                status = $8,
                payment_status = $9,
                claim_amount = $10,
                paid_amount = $11,
                currency = $12,
                laytime_used = $13,
                demurrage_days = $14,
                claim_deadline = $15,
                is_time_barred = $16,
                time_bar_date = $17,
                version = $18,
                assigned_to = $19,
                description = $20,
                settlement_notes = $21,
                internal_notes = $22,
                submitted_at = $23,
                sent_to_owner_at = $24,
                settled_at = $25,
                paid_at = $26,
                updated_at = $27
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(Uuid::from(claim.id))
        .bind(expected_version)
        .bind(&claim.external_id)
        .bind(Uuid::from(claim.voyage_id))
        .bind(Uuid::from(claim.ship_owner_id))
        .bind(claim.claim_type.as_str())
        .bind(claim.cost_type.map(|c| c.as_str()))
        .bind(claim.status.as_str())
        .bind(claim.payment_status.as_str())
        .bind(claim.claim_amount)
        .bind(claim.paid_amount)
        .bind(claim.currency.code())
        .bind(claim.laytime_used)
        .bind(claim.demurrage_days)
        .bind(claim.claim_deadline)
        .bind(claim.is_time_barred)
        .bind(claim.time_bar_date)
        .bind(claim.version)
        .bind(claim.assigned_to.map(Uuid::from))
        .bind(&claim.description)
        .bind(&claim.settlement_notes)
        .bind(&claim.internal_notes)
        .bind(claim.submitted_at)
        .bind(claim.sent_to_owner_at)
        .bind(claim.settled_at)
        .bind(claim.paid_at)
        .bind(claim.updated_at)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Gives the voyage's unassigned claims an analyst, returning their ids
    pub async fn cascade_assignee(
        conn: &mut PgConnection,
        voyage_id: Uuid,
        analyst: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Vec<ClaimId>, DatabaseError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE claims
            SET assigned_to = $2, version = version + 1, updated_at = $3
            WHERE voyage_id = $1 AND assigned_to IS NULL
            RETURNING id
            "#,
        )
        .bind(voyage_id)
        .bind(analyst)
        .bind(at)
        .fetch_all(&mut *conn)
        .await?;
        Ok(ids.into_iter().map(ClaimId::from).collect())
    }

    /// Deletes the claim; comments and documents go with it
    pub async fn delete(conn: &mut PgConnection, id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM claims WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Claim", id));
        }
        Ok(())
    }
}

/// Database row for a claim
#[derive(Debug, Clone, FromRow)]
pub struct ClaimRow {
    pub id: Uuid,
    pub claim_number: String,
    pub external_id: Option<String>,
    pub voyage_id: Uuid,
    pub ship_owner_id: Uuid,
    pub claim_type: String,
    pub cost_type: Option<String>,
    pub status: String,
    pub payment_status: String,
    pub claim_amount: Decimal,
    pub paid_amount: Decimal,
    pub currency: String,
    pub laytime_used: Option<Decimal>,
    pub demurrage_days: Decimal,
    pub claim_deadline: Option<NaiveDate>,
    pub is_time_barred: bool,
    pub time_bar_date: Option<NaiveDate>,
    pub version: i64,
    pub assigned_to: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub description: Option<String>,
    pub settlement_notes: Option<String>,
    pub internal_notes: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub sent_to_owner_at: Option<DateTime<Utc>>,
    pub settled_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ClaimRow> for Claim {
    type Error = DatabaseError;

    fn try_from(row: ClaimRow) -> Result<Self, Self::Error> {
        Ok(Claim {
            id: ClaimId::from(row.id),
            claim_number: row.claim_number,
            external_id: row.external_id,
            voyage_id: VoyageId::from(row.voyage_id),
            ship_owner_id: ShipOwnerId::from(row.ship_owner_id),
            claim_type: parse_column("claims.claim_type", &row.claim_type)?,
            cost_type: parse_optional("claims.cost_type", row.cost_type.as_deref())?,
            status: parse_column("claims.status", &row.status)?,
            payment_status: parse_column("claims.payment_status", &row.payment_status)?,
            claim_amount: row.claim_amount,
            paid_amount: row.paid_amount,
            currency: parse_column("claims.currency", &row.currency)?,
            laytime_used: row.laytime_used,
            demurrage_days: row.demurrage_days,
            claim_deadline: row.claim_deadline,
            is_time_barred: row.is_time_barred,
            time_bar_date: row.time_bar_date,
            version: row.version,
            assigned_to: row.assigned_to.map(UserId::from),
            created_by: row.created_by.map(UserId::from),
            description: row.description,
            settlement_notes: row.settlement_notes,
            internal_notes: row.internal_notes,
            submitted_at: row.submitted_at,
            sent_to_owner_at: row.sent_to_owner_at,
            settled_at: row.settled_at,
            paid_at: row.paid_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
