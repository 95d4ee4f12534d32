//! Comments, documents and the activity log

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use core_kernel::{ActivityLogId, ClaimId, CommentId, DocumentId, UserId};
use domain_claims::{ClaimActivityLog, Comment, Document};

use super::parse_column;
use crate::error::DatabaseError;

/// Repository for everything hanging off a claim
#[derive(Debug, Clone)]
pub struct ThreadRepository {
    pool: PgPool,
}

impl ThreadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert_comment(&self, comment: &Comment) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO claim_comments (id, claim_id, author_id, content, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::from(comment.id))
        .bind(Uuid::from(comment.claim_id))
        .bind(Uuid::from(comment.author_id))
        .bind(&comment.content)
        .bind(comment.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Comments of a claim, oldest first
    pub async fn list_comments(&self, claim_id: Uuid) -> Result<Vec<Comment>, DatabaseError> {
        let rows = sqlx::query_as::<_, CommentRow>(
            r#"
            SELECT id, claim_id, author_id, content, created_at
            FROM claim_comments
            WHERE claim_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(claim_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Comment::from).collect())
    }

    pub async fn insert_document(&self, document: &Document) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO claim_documents (
                id, claim_id, title, document_type, file_path, uploaded_by, uploaded_at, description
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(Uuid::from(document.id))
        .bind(Uuid::from(document.claim_id))
        .bind(&document.title)
        .bind(document.document_type.as_str())
        .bind(&document.file_path)
        .bind(Uuid::from(document.uploaded_by))
        .bind(document.uploaded_at)
        .bind(&document.description)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_documents(&self, claim_id: Uuid) -> Result<Vec<Document>, DatabaseError> {
        sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT id, claim_id, title, document_type, file_path, uploaded_by, uploaded_at, description
            FROM claim_documents
            WHERE claim_id = $1
            ORDER BY uploaded_at ASC, id ASC
            "#,
        )
        .bind(claim_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Document::try_from)
        .collect()
    }

    /// Activity of a claim, oldest first
    pub async fn list_activity(&self, claim_id: Uuid) -> Result<Vec<ClaimActivityLog>, DatabaseError> {
        sqlx::query_as::<_, ActivityRow>(
            r#"
            SELECT id, claim_id, claim_number, user_id, action, message, old_value, new_value, created_at
            FROM claim_activity_log
            WHERE claim_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(claim_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(ClaimActivityLog::try_from)
        .collect()
    }

    /// Appends activity entries inside the caller's transaction
    pub async fn append_activity(
        conn: &mut PgConnection,
        entries: &[ClaimActivityLog],
    ) -> Result<(), DatabaseError> {
        for entry in entries {
            sqlx::query(
                r#"
                INSERT INTO claim_activity_log (
                    id, claim_id, claim_number, user_id, action, message, old_value, new_value, created_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(Uuid::from(entry.id))
            .bind(entry.claim_id.map(Uuid::from))
            .bind(&entry.claim_number)
            .bind(entry.user_id.map(Uuid::from))
            .bind(entry.action.as_str())
            .bind(&entry.message)
            .bind(&entry.old_value)
            .bind(&entry.new_value)
            .bind(entry.created_at)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct CommentRow {
    pub id: Uuid,
    pub claim_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Comment {
            id: CommentId::from(row.id),
            claim_id: ClaimId::from(row.claim_id),
            author_id: UserId::from(row.author_id),
            content: row.content,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DocumentRow {
    pub id: Uuid,
    pub claim_id: Uuid,
    pub title: String,
    pub document_type: String,
    pub file_path: String,
    pub uploaded_by: Uuid,
    pub uploaded_at: DateTime<Utc>,
    pub description: Option<String>,
}

impl TryFrom<DocumentRow> for Document {
    type Error = DatabaseError;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        Ok(Document {
            id: DocumentId::from(row.id),
            claim_id: ClaimId::from(row.claim_id),
            title: row.title,
            document_type: parse_column("claim_documents.document_type", &row.document_type)?,
            file_path: row.file_path,
            uploaded_by: UserId::from(row.uploaded_by),
            uploaded_at: row.uploaded_at,
            description: row.description,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ActivityRow {
    pub id: Uuid,
    pub claim_id: Option<Uuid>,
    pub claim_number: String,
    pub user_id: Option<Uuid>,
    pub action: String,
    pub message: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ActivityRow> for ClaimActivityLog {
    type Error = DatabaseError;

    fn try_from(row: ActivityRow) -> Result<Self, Self::Error> {
        Ok(ClaimActivityLog {
            id: ActivityLogId::from(row.id),
            claim_id: row.claim_id.map(ClaimId::from),
            claim_number: row.claim_number,
            user_id: row.user_id.map(UserId::from),
            action: parse_column("claim_activity_log.action", &row.action)?,
            message: row.message,
            old_value: row.old_value,
            new_value: row.new_value,
            created_at: row.created_at,
        })
    }
}
