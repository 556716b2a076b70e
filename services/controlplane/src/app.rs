//! Control-plane HTTP application wiring.
//!
//! # Purpose
//! Builds the Axum router, configures middleware, and defines the shared
//! application state injected into handlers.
//!
//! # Notes
//! This module centralizes route composition to keep `main` small and testable.
use crate::api;
use crate::api::openapi::ApiDoc;
use crate::governance::GovernanceEngine;
use axum::{Json, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<GovernanceEngine>,
    pub api_version: String,
}

impl AppState {
    pub fn new(engine: Arc<GovernanceEngine>) -> Self {
        Self {
            engine,
            api_version: "v1".to_string(),
        }
    }
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            let actor = request
                .headers()
                .get(api::ACTOR_HEADER)
                .and_then(|value| value.to_str().ok())
                .unwrap_or("-");
            tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
                actor = %actor
            )
        });

    Router::new()
        .route(
            "/v1/system/health",
            axum::routing::get(api::system::system_health),
        )
        .route("/v1/openapi.json", axum::routing::get(openapi_json))
        .route(
            "/v1/access/pages/:page",
            axum::routing::get(api::access::check_page),
        )
        .route(
            "/v1/access/modules/:module",
            axum::routing::get(api::access::check_module),
        )
        .route(
            "/v1/access/sidebar/:section",
            axum::routing::get(api::access::check_sidebar_section),
        )
        .route(
            "/v1/access/widgets/:widget",
            axum::routing::get(api::access::check_widget),
        )
        .route(
            "/v1/access/capabilities",
            axum::routing::get(api::access::capabilities),
        )
        .route(
            "/v1/change-requests",
            axum::routing::get(api::requests::list_requests).post(api::requests::submit),
        )
        .route(
            "/v1/change-requests/:id",
            axum::routing::get(api::requests::get_request),
        )
        .route(
            "/v1/change-requests/:id/approve",
            axum::routing::post(api::requests::approve),
        )
        .route(
            "/v1/change-requests/:id/reject",
            axum::routing::post(api::requests::reject),
        )
        .route("/v1/audit", axum::routing::get(api::audit::query_audit))
        .route(
            "/v1/reports/access",
            axum::routing::get(api::audit::access_report),
        )
        .route(
            "/v1/actors/:actor_id/revoke",
            axum::routing::post(api::audit::revoke),
        )
        .route(
            "/v1/profiles",
            axum::routing::get(api::admin::list_profiles).post(api::admin::create_profile),
        )
        .route(
            "/v1/profiles/:id",
            axum::routing::put(api::admin::update_profile).delete(api::admin::delete_profile),
        )
        .route(
            "/v1/roles",
            axum::routing::get(api::admin::list_roles).post(api::admin::create_role),
        )
        .route(
            "/v1/roles/:id",
            axum::routing::put(api::admin::update_role).delete(api::admin::delete_role),
        )
        .route(
            "/v1/bindings",
            axum::routing::get(api::admin::list_bindings),
        )
        .route(
            "/v1/bindings/:actor_id",
            axum::routing::put(api::admin::put_binding),
        )
        .route(
            "/v1/matrices/:scope",
            axum::routing::get(api::admin::get_matrix).put(api::admin::put_matrix),
        )
        .layer(trace_layer)
        .with_state(state)
}
