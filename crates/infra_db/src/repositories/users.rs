//! Users and ship owners

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use core_kernel::{ShipOwnerId, UserId};
use domain_claims::{ShipOwner, User};

use super::parse_column;
use crate::error::DatabaseError;

/// Repository for users and ship owners
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_user(&self, id: Uuid) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, UserRow>(
            "SELECT id, username, full_name, email, role, is_active FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("User", id))?
        .try_into()
    }

    /// Inserts the user or replaces every column of the existing row
    pub async fn upsert_user(&self, user: &User) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, full_name, email, role, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                username = EXCLUDED.username,
                full_name = EXCLUDED.full_name,
                email = EXCLUDED.email,
                role = EXCLUDED.role,
                is_active = EXCLUDED.is_active
            "#,
        )
        .bind(Uuid::from(user.id))
        .bind(&user.username)
        .bind(&user.full_name)
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(user.is_active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_ship_owner(&self, id: Uuid) -> Result<ShipOwner, DatabaseError> {
        let row = sqlx::query_as::<_, ShipOwnerRow>(
            r#"
            SELECT id, name, code, contact_email, contact_phone, is_active, created_at, updated_at
            FROM ship_owners
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("ShipOwner", id))?;
        Ok(row.into())
    }

    pub async fn upsert_ship_owner(&self, owner: &ShipOwner) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO ship_owners (
                id, name, code, contact_email, contact_phone, is_active, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                code = EXCLUDED.code,
                contact_email = EXCLUDED.contact_email,
                contact_phone = EXCLUDED.contact_phone,
                is_active = EXCLUDED.is_active,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(Uuid::from(owner.id))
        .bind(&owner.name)
        .bind(&owner.code)
        .bind(&owner.contact_email)
        .bind(&owner.contact_phone)
        .bind(owner.is_active)
        .bind(owner.created_at)
        .bind(owner.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Database row for a user
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub email: Option<String>,
    pub role: String,
    pub is_active: bool,
}

impl TryFrom<UserRow> for User {
    type Error = DatabaseError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: UserId::from(row.id),
            username: row.username,
            full_name: row.full_name,
            email: row.email,
            role: parse_column("users.role", &row.role)?,
            is_active: row.is_active,
        })
    }
}

/// Database row for a ship owner
#[derive(Debug, Clone, FromRow)]
pub struct ShipOwnerRow {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ShipOwnerRow> for ShipOwner {
    fn from(row: ShipOwnerRow) -> Self {
        ShipOwner {
            id: ShipOwnerId::from(row.id),
            name: row.name,
            code: row.code,
            contact_email: row.contact_email,
            contact_phone: row.contact_phone,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
