//! Claims DTOs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{ClaimId, Currency, ShipOwnerId, UserId, VoyageId};
use domain_claims::{
    Claim, ClaimQuery, ClaimStatus, ClaimType, CostType, DocumentType, NewClaim, NewDocument,
    PaymentStatus, StatusChange,
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateClaimRequest {
    pub voyage_id: Uuid,
    pub claim_type: ClaimType,
    pub cost_type: Option<CostType>,
    #[validate(length(min = 1, max = 100))]
    pub external_id: Option<String>,
    pub claim_amount: Decimal,
    /// Defaults to the voyage currency
    pub currency: Option<Currency>,
    pub laytime_used: Option<Decimal>,
    pub claim_deadline: Option<NaiveDate>,
    pub assigned_to: Option<Uuid>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
}

impl CreateClaimRequest {
    pub fn into_new_claim(self) -> NewClaim {
        NewClaim {
            voyage_id: VoyageId::from_uuid(self.voyage_id),
            claim_type: self.claim_type,
            cost_type: self.cost_type,
            external_id: self.external_id,
            claim_amount: self.claim_amount,
            currency: self.currency,
            laytime_used: self.laytime_used,
            claim_deadline: self.claim_deadline,
            assigned_to: self.assigned_to.map(UserId::from_uuid),
            description: self.description,
        }
    }
}

/// Full replacement of the editable fields, guarded by `version`
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateClaimRequest {
    /// Version the client last read
    pub version: i64,
    pub claim_type: ClaimType,
    pub cost_type: Option<CostType>,
    #[validate(length(min = 1, max = 100))]
    pub external_id: Option<String>,
    pub claim_amount: Decimal,
    pub currency: Currency,
    pub laytime_used: Option<Decimal>,
    pub claim_deadline: Option<NaiveDate>,
    pub assigned_to: Option<Uuid>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(length(max = 5000))]
    pub settlement_notes: Option<String>,
    #[validate(length(max = 5000))]
    pub internal_notes: Option<String>,
}

impl UpdateClaimRequest {
    pub fn apply_to(self, claim: &mut Claim) {
        claim.version = self.version;
        claim.claim_type = self.claim_type;
        claim.cost_type = self.cost_type;
        claim.external_id = self.external_id;
        claim.claim_amount = self.claim_amount;
        claim.currency = self.currency;
        claim.laytime_used = self.laytime_used;
        claim.claim_deadline = self.claim_deadline;
        claim.assigned_to = self.assigned_to.map(UserId::from_uuid);
        claim.description = self.description;
        claim.settlement_notes = self.settlement_notes;
        claim.internal_notes = self.internal_notes;
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub version: i64,
    pub status: Option<ClaimStatus>,
    pub payment_status: Option<PaymentStatus>,
}

impl UpdateStatusRequest {
    pub fn change(&self) -> StatusChange {
        StatusChange {
            status: self.status,
            payment_status: self.payment_status,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RecordPaymentRequest {
    pub version: i64,
    pub amount: Decimal,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddCommentRequest {
    #[validate(length(min = 1, max = 5000))]
    pub content: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AttachDocumentRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    pub document_type: DocumentType,
    #[validate(length(min = 1, max = 255))]
    pub file_name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

impl From<AttachDocumentRequest> for NewDocument {
    fn from(request: AttachDocumentRequest) -> Self {
        NewDocument {
            title: request.title,
            document_type: request.document_type,
            file_name: request.file_name,
            description: request.description,
        }
    }
}

/// Query string for listing claims
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ClaimListParams {
    pub voyage_id: Option<Uuid>,
    pub ship_owner_id: Option<Uuid>,
    pub assigned_to: Option<Uuid>,
    pub status: Option<ClaimStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub claim_type: Option<ClaimType>,
    pub is_time_barred: Option<bool>,
    pub deadline_from: Option<NaiveDate>,
    pub deadline_to: Option<NaiveDate>,
    #[validate(range(min = 1, max = 500))]
    pub limit: Option<i64>,
    #[validate(range(min = 0))]
    pub offset: Option<i64>,
}

impl From<ClaimListParams> for ClaimQuery {
    fn from(params: ClaimListParams) -> Self {
        ClaimQuery {
            voyage_id: params.voyage_id.map(VoyageId::from_uuid),
            ship_owner_id: params.ship_owner_id.map(ShipOwnerId::from_uuid),
            assigned_to: params.assigned_to.map(UserId::from_uuid),
            status: params.status,
            payment_status: params.payment_status,
            claim_type: params.claim_type,
            is_time_barred: params.is_time_barred,
            deadline_from: params.deadline_from,
            deadline_to: params.deadline_to,
            deadline_before: None,
            limit: params.limit,
            offset: params.offset,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ClaimResponse {
    pub id: ClaimId,
    pub claim_number: String,
    pub external_id: Option<String>,
    pub voyage_id: VoyageId,
    pub ship_owner_id: ShipOwnerId,
    pub claim_type: ClaimType,
    pub cost_type: Option<CostType>,
    pub status: ClaimStatus,
    pub payment_status: PaymentStatus,
    pub claim_amount: Decimal,
    pub paid_amount: Decimal,
    /// Negative when overpaid
    pub outstanding_amount: Decimal,
    pub currency: Currency,
    pub laytime_used: Option<Decimal>,
    pub demurrage_days: Decimal,
    pub claim_deadline: Option<NaiveDate>,
    pub days_until_deadline: Option<i64>,
    pub is_time_barred: bool,
    pub time_bar_date: Option<NaiveDate>,
    pub version: i64,
    pub assigned_to: Option<UserId>,
    pub created_by: Option<UserId>,
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

impl ClaimResponse {
    pub fn new(claim: Claim, today: NaiveDate) -> Self {
        Self {
            outstanding_amount: claim.claim_amount - claim.paid_amount,
            days_until_deadline: claim.days_until_deadline(today),
            id: claim.id,
            claim_number: claim.claim_number,
            external_id: claim.external_id,
            voyage_id: claim.voyage_id,
            ship_owner_id: claim.ship_owner_id,
            claim_type: claim.claim_type,
            cost_type: claim.cost_type,
            status: claim.status,
            payment_status: claim.payment_status,
            claim_amount: claim.claim_amount,
            paid_amount: claim.paid_amount,
            currency: claim.currency,
            laytime_used: claim.laytime_used,
            demurrage_days: claim.demurrage_days,
            claim_deadline: claim.claim_deadline,
            is_time_barred: claim.is_time_barred,
            time_bar_date: claim.time_bar_date,
            version: claim.version,
            assigned_to: claim.assigned_to,
            created_by: claim.created_by,
            description: claim.description,
            settlement_notes: claim.settlement_notes,
            internal_notes: claim.internal_notes,
            submitted_at: claim.submitted_at,
            sent_to_owner_at: claim.sent_to_owner_at,
            settled_at: claim.settled_at,
            paid_at: claim.paid_at,
            created_at: claim.created_at,
            updated_at: claim.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_rejects_empty_external_id() {
        let request: CreateClaimRequest = serde_json::from_value(serde_json::json!({
            "voyage_id": Uuid::new_v4(),
            "claim_type": "DEMURRAGE",
            "external_id": "",
            "claim_amount": "100000.00"
        }))
        .unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_list_params_become_query() {
        let voyage = Uuid::new_v4();
        let params = ClaimListParams {
            voyage_id: Some(voyage),
            payment_status: Some(PaymentStatus::NotSent),
            limit: Some(20),
            ..Default::default()
        };
        let query = ClaimQuery::from(params);
        assert_eq!(query.voyage_id, Some(VoyageId::from_uuid(voyage)));
        assert_eq!(query.payment_status, Some(PaymentStatus::NotSent));
        assert_eq!(query.limit, Some(20));
        assert!(query.deadline_before.is_none());
    }

    #[test]
    fn test_limit_bounds() {
        let params = ClaimListParams {
            limit: Some(0),
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }
}
