//! Voyage handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{UserId, VoyageId};
use domain_claims::{ClaimQuery, User, Voyage, VoyageAssignment, VoyageQuery};

use crate::dto::claims::ClaimResponse;
use crate::dto::voyages::*;
use crate::{error::ApiError, AppState};

/// Registers a voyage
pub async fn register_voyage(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(request): Json<RegisterVoyageRequest>,
) -> Result<(StatusCode, Json<Voyage>), ApiError> {
    request.validate()?;
    let voyage = state.service.register_voyage(&user, request.into()).await?;
    Ok((StatusCode::CREATED, Json(voyage)))
}

/// Lists voyages
pub async fn list_voyages(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Query(params): Query<VoyageListParams>,
) -> Result<Json<Vec<Voyage>>, ApiError> {
    params.validate()?;
    let voyages = state.service.find_voyages(&user, &VoyageQuery::from(params)).await?;
    Ok(Json(voyages))
}

/// Gets a voyage by ID
pub async fn get_voyage(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> Result<Json<Voyage>, ApiError> {
    Ok(Json(state.service.get_voyage(&user, VoyageId::from_uuid(id)).await?))
}

/// Claims raised under a voyage
pub async fn voyage_claims(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ClaimResponse>>, ApiError> {
    let voyage = state.service.get_voyage(&user, VoyageId::from_uuid(id)).await?;
    let today = state.service.clock().today();
    let claims = state
        .service
        .find_claims(&user, &ClaimQuery::for_voyage(voyage.id))
        .await?;
    Ok(Json(claims.into_iter().map(|c| ClaimResponse::new(c, today)).collect()))
}

/// Assigns a voyage and its unassigned claims to an analyst
pub async fn assign_voyage(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
    Json(request): Json<AssignVoyageRequest>,
) -> Result<Json<Voyage>, ApiError> {
    let voyage = state
        .service
        .assign_voyage(VoyageId::from_uuid(id), UserId::from_uuid(request.analyst_id), &user)
        .await?;
    Ok(Json(voyage))
}

/// Hands a voyage to another analyst
pub async fn reassign_voyage(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
    Json(request): Json<ReassignVoyageRequest>,
) -> Result<Json<Voyage>, ApiError> {
    request.validate()?;
    let voyage = state
        .service
        .reassign_voyage(
            VoyageId::from_uuid(id),
            UserId::from_uuid(request.analyst_id),
            &user,
            request.reason,
        )
        .await?;
    Ok(Json(voyage))
}

/// Who held the voyage when, oldest first
pub async fn assignment_history(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<VoyageAssignment>>, ApiError> {
    Ok(Json(
        state
            .service
            .assignment_history(&user, VoyageId::from_uuid(id))
            .await?,
    ))
}

/// Adds an activity to the voyage's port timeline
pub async fn record_port_activity(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
    Json(request): Json<RecordPortActivityRequest>,
) -> Result<(StatusCode, Json<PortActivityResponse>), ApiError> {
    request.validate()?;
    let activity = state
        .service
        .record_port_activity(&user, VoyageId::from_uuid(id), request.into())
        .await?;
    Ok((StatusCode::CREATED, Json(activity.into())))
}

/// Port timeline with totals per activity category
pub async fn port_timeline(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> Result<Json<TimelineResponse>, ApiError> {
    let timeline = state.service.voyage_timeline(&user, VoyageId::from_uuid(id)).await?;
    Ok(Json(timeline.into()))
}
