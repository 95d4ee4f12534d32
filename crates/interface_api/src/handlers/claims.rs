//! Claims handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::ClaimId;
use domain_claims::{Claim, ClaimActivityLog, ClaimAnalytics, ClaimQuery, Comment, Document, User};

use crate::dto::claims::*;
use crate::{error::ApiError, AppState};

fn respond(state: &AppState, claim: Claim) -> Json<ClaimResponse> {
    Json(ClaimResponse::new(claim, state.service.clock().today()))
}

/// Creates a draft claim and assigns its number
pub async fn create_claim(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateClaimRequest>,
) -> Result<(StatusCode, Json<ClaimResponse>), ApiError> {
    request.validate()?;
    let claim = state.service.create_claim(&user, request.into_new_claim()).await?;
    Ok((StatusCode::CREATED, respond(&state, claim)))
}

/// Lists claims, newest first
pub async fn list_claims(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Query(params): Query<ClaimListParams>,
) -> Result<Json<Vec<ClaimResponse>>, ApiError> {
    params.validate()?;
    let today = state.service.clock().today();
    let claims = state.service.find_claims(&user, &ClaimQuery::from(params)).await?;
    Ok(Json(claims.into_iter().map(|c| ClaimResponse::new(c, today)).collect()))
}

/// Totals over the claims matching the filters
pub async fn claim_analytics(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Query(params): Query<ClaimListParams>,
) -> Result<Json<ClaimAnalytics>, ApiError> {
    params.validate()?;
    let analytics = state.service.analytics(&user, &ClaimQuery::from(params)).await?;
    Ok(Json(analytics))
}

/// Gets a claim by ID
pub async fn get_claim(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> Result<Json<ClaimResponse>, ApiError> {
    let claim = state.service.get_claim(&user, ClaimId::from_uuid(id)).await?;
    Ok(respond(&state, claim))
}

/// Saves edited fields; a stale `version` is rejected with 409
pub async fn update_claim(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateClaimRequest>,
) -> Result<Json<ClaimResponse>, ApiError> {
    request.validate()?;
    let mut claim = state.service.get_claim(&user, ClaimId::from_uuid(id)).await?;
    request.apply_to(&mut claim);
    let saved = state.service.save_claim(&user, claim).await?;
    Ok(respond(&state, saved))
}

/// Deletes a draft claim
pub async fn delete_claim(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.service.delete_claim(&user, ClaimId::from_uuid(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Updates claim and/or payment status
pub async fn update_status(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<ClaimResponse>, ApiError> {
    let claim = state
        .service
        .update_status(&user, ClaimId::from_uuid(id), request.version, request.change())
        .await?;
    Ok(respond(&state, claim))
}

/// Records a payment from the owner
pub async fn record_payment(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
    Json(request): Json<RecordPaymentRequest>,
) -> Result<Json<ClaimResponse>, ApiError> {
    let claim = state
        .service
        .record_payment(&user, ClaimId::from_uuid(id), request.version, request.amount)
        .await?;
    Ok(respond(&state, claim))
}

pub async fn add_comment(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
    Json(request): Json<AddCommentRequest>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    request.validate()?;
    let comment = state
        .service
        .add_comment(&user, ClaimId::from_uuid(id), &request.content)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn list_comments(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    Ok(Json(state.service.comments(&user, ClaimId::from_uuid(id)).await?))
}

/// Registers document metadata; file bytes are stored elsewhere
pub async fn attach_document(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
    Json(request): Json<AttachDocumentRequest>,
) -> Result<(StatusCode, Json<Document>), ApiError> {
    request.validate()?;
    let document = state
        .service
        .attach_document(&user, ClaimId::from_uuid(id), request.into())
        .await?;
    Ok((StatusCode::CREATED, Json(document)))
}

pub async fn list_documents(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Document>>, ApiError> {
    Ok(Json(state.service.documents(&user, ClaimId::from_uuid(id)).await?))
}

/// Audit trail of a claim, oldest first
pub async fn list_activity(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ClaimActivityLog>>, ApiError> {
    Ok(Json(state.service.activity(&user, ClaimId::from_uuid(id)).await?))
}
