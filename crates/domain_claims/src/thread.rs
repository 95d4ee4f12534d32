//! Comments and documents attached to a claim

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{ClaimId, CommentId, DocumentId, UserId, VoyageId};
use crate::error::ClaimError;

/// Longest comment accepted, in characters
pub const MAX_COMMENT_LENGTH: usize = 5000;

/// A note on a claim; immutable once written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub claim_id: ClaimId,
    pub author_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(
        claim_id: ClaimId,
        author_id: UserId,
        content: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, ClaimError> {
        let content = content.into();
        let length = content.trim().chars().count();
        if length == 0 {
            return Err(ClaimError::validation("comment must not be empty"));
        }
        if content.chars().count() > MAX_COMMENT_LENGTH {
            return Err(ClaimError::validation(format!(
                "comment exceeds {} characters",
                MAX_COMMENT_LENGTH
            )));
        }
        Ok(Self {
            id: CommentId::new_v7(),
            claim_id,
            author_id,
            content,
            created_at: now,
        })
    }
}

text_enum! {
    /// Kind of supporting document
    DocumentType {
        CharterParty => "CHARTER_PARTY",
        /// Statement of facts
        Sof => "SOF",
        LaytimeCalc => "LAYTIME_CALC",
        Correspondence => "CORRESPONDENCE",
        Invoice => "INVOICE",
        Other => "OTHER",
    }
}

/// Metadata for a document stored elsewhere
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub claim_id: ClaimId,
    pub title: String,
    pub document_type: DocumentType,
    /// Object-store key under which the file lives
    pub file_path: String,
    pub uploaded_by: UserId,
    pub uploaded_at: DateTime<Utc>,
    pub description: Option<String>,
}

/// Input for attaching a document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDocument {
    pub title: String,
    pub document_type: DocumentType,
    pub file_name: String,
    pub description: Option<String>,
}

/// Storage key for a claim document
pub fn storage_path(voyage_id: VoyageId, claim_id: ClaimId, file_name: &str) -> String {
    format!(
        "voyages/{}/claims/{}/documents/{}",
        voyage_id.as_uuid(),
        claim_id.as_uuid(),
        file_name
    )
}

impl Document {
    pub fn new(
        voyage_id: VoyageId,
        claim_id: ClaimId,
        input: NewDocument,
        uploaded_by: UserId,
        now: DateTime<Utc>,
    ) -> Result<Self, ClaimError> {
        if input.title.trim().is_empty() {
            return Err(ClaimError::validation("document title is required"));
        }
        let file_name = input.file_name.trim();
        if file_name.is_empty()
            || file_name.contains('/')
            || file_name.contains('\\')
            || file_name.starts_with('.')
        {
            return Err(ClaimError::validation(format!(
                "invalid document file name '{}'",
                input.file_name
            )));
        }
        Ok(Self {
            id: DocumentId::new_v7(),
            claim_id,
            title: input.title.trim().to_string(),
            document_type: input.document_type,
            file_path: storage_path(voyage_id, claim_id, file_name),
            uploaded_by,
            uploaded_at: now,
            description: input.description,
        })
    }
}
