//! Maintenance handlers

use axum::{extract::State, Extension, Json};

use domain_claims::{authorize, Action, Resource, SweepReport, TimebarSweep, User};

use crate::{error::ApiError, AppState};

/// Runs the time-bar sweep now instead of waiting for the next tick
pub async fn run_timebar_sweep(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<SweepReport>, ApiError> {
    authorize(&user, Action::RunMaintenance, Resource::None)?;
    let report = TimebarSweep::new(state.service.clone())
        .with_warning_days(state.config.timebar_warning_days)
        .run()
        .await?;
    Ok(Json(report))
}
