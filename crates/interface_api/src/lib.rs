//! HTTP API Layer
//!
//! This crate provides the REST API for the maritime claims system using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: Request handlers for claims, voyages and maintenance
//! - **Middleware**: Authentication, tracing, audit logging
//! - **DTOs**: Request/Response data transfer objects
//! - **Error Handling**: Consistent error responses
//! - **Jobs**: The periodic time-bar sweep
//!
//! Permission checks live in the domain; handlers pass the authenticated
//! [`domain_claims::User`] to every [`ClaimService`] call.
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::create_router;
//!
//! let app = create_router(service, config);
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod handlers;
pub mod dto;
pub mod auth;
pub mod jobs;

use axum::{
    Router,
    routing::{get, post, put},
    middleware as axum_middleware,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tower_http::cors::{CorsLayer, Any};

use domain_claims::ClaimService;

use crate::config::ApiConfig;
use crate::middleware::{auth_middleware, audit_middleware};
use crate::handlers::{claims, health, maintenance, voyages};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ClaimService>,
    pub config: ApiConfig,
}

/// Creates the main API router
///
/// # Arguments
///
/// * `service` - Claim service over the configured store
/// * `config` - API configuration
///
/// # Returns
///
/// Configured Axum router with all routes and middleware
pub fn create_router(service: Arc<ClaimService>, config: ApiConfig) -> Router {
    let state = AppState { service, config };

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let voyage_routes = Router::new()
        .route("/", post(voyages::register_voyage).get(voyages::list_voyages))
        .route("/:id", get(voyages::get_voyage))
        .route("/:id/claims", get(voyages::voyage_claims))
        .route("/:id/assign", post(voyages::assign_voyage))
        .route("/:id/reassign", post(voyages::reassign_voyage))
        .route("/:id/assignments", get(voyages::assignment_history))
        .route(
            "/:id/port-activities",
            post(voyages::record_port_activity).get(voyages::port_timeline),
        );

    let claims_routes = Router::new()
        .route("/", post(claims::create_claim).get(claims::list_claims))
        .route("/analytics", get(claims::claim_analytics))
        .route(
            "/:id",
            get(claims::get_claim)
                .put(claims::update_claim)
                .delete(claims::delete_claim),
        )
        .route("/:id/status", put(claims::update_status))
        .route("/:id/payments", post(claims::record_payment))
        .route("/:id/comments", post(claims::add_comment).get(claims::list_comments))
        .route("/:id/documents", post(claims::attach_document).get(claims::list_documents))
        .route("/:id/activity", get(claims::list_activity));

    let maintenance_routes = Router::new()
        .route("/timebar-sweep", post(maintenance::run_timebar_sweep));

    // Protected API routes
    let api_routes = Router::new()
        .nest("/voyages", voyage_routes)
        .nest("/claims", claims_routes)
        .nest("/maintenance", maintenance_routes)
        .layer(axum_middleware::from_fn_with_state(state.clone(), audit_middleware))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Combine all routes
    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
