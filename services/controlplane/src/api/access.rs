//! Access-check API handlers.
//!
//! # Purpose and responsibility
//! Answers "may the calling actor see this?" for pages, modules, sidebar
//! sections, and home widgets, and exposes the caller's aggregated
//! capability set.
//!
//! # Key invariants and assumptions
//! - Checks never fail on store errors; they answer `granted: false` with a
//!   denial reason. Only a missing caller header is an error.
//! - Every check is recorded as an access attempt by the engine.
use crate::api::error::{ApiError, api_forbidden, api_unavailable};
use crate::api::types::{AccessCheckResponse, CapabilitiesResponse, ModuleAccessResponse};
use crate::api::{attempt_metadata, caller};
use crate::app::AppState;
use crate::model::AccessResource;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use gatehouse_authz::{ActorId, Decision, DenialReason};

fn check_response(
    actor: &ActorId,
    resource: AccessResource,
    key: String,
    decision: Decision,
) -> AccessCheckResponse {
    AccessCheckResponse {
        actor_id: actor.to_string(),
        resource: resource.as_str().to_string(),
        key,
        granted: decision.is_granted(),
        denial_reason: decision.denial_reason().map(|reason| reason.to_string()),
    }
}

#[utoipa::path(
    get,
    path = "/v1/access/pages/{page}",
    tag = "access",
    params(("page" = String, Path, description = "Page name")),
    responses(
        (status = 200, description = "Page access decision", body = AccessCheckResponse),
        (status = 401, description = "Caller not identified", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn check_page(
    State(state): State<AppState>,
    Path(page): Path<String>,
    headers: HeaderMap,
) -> Result<Json<AccessCheckResponse>, ApiError> {
    let actor = caller(&headers)?;
    let decision = state
        .engine
        .check_page(&actor, &page, attempt_metadata(&headers))
        .await;
    Ok(Json(check_response(
        &actor,
        AccessResource::Page,
        page,
        decision,
    )))
}

#[utoipa::path(
    get,
    path = "/v1/access/modules/{module}",
    tag = "access",
    params(("module" = String, Path, description = "Module name")),
    responses(
        (status = 200, description = "Effective module level", body = ModuleAccessResponse),
        (status = 401, description = "Caller not identified", body = crate::api::types::ErrorResponse)
    )
)]
/// Return the caller's effective level (`blocked`, `read`, `write`, `admin`) on a module.
pub(crate) async fn check_module(
    State(state): State<AppState>,
    Path(module): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ModuleAccessResponse>, ApiError> {
    let actor = caller(&headers)?;
    let level = state
        .engine
        .check_module(&actor, &module, attempt_metadata(&headers))
        .await;
    Ok(Json(ModuleAccessResponse {
        actor_id: actor.to_string(),
        module,
        level: level.to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/v1/access/sidebar/{section}",
    tag = "access",
    params(("section" = String, Path, description = "Sidebar section key")),
    responses(
        (status = 200, description = "Sidebar visibility decision", body = AccessCheckResponse),
        (status = 401, description = "Caller not identified", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn check_sidebar_section(
    State(state): State<AppState>,
    Path(section): Path<String>,
    headers: HeaderMap,
) -> Result<Json<AccessCheckResponse>, ApiError> {
    let actor = caller(&headers)?;
    let decision = state
        .engine
        .check_sidebar_section(&actor, &section, attempt_metadata(&headers))
        .await;
    Ok(Json(check_response(
        &actor,
        AccessResource::SidebarSection,
        section,
        decision,
    )))
}

#[utoipa::path(
    get,
    path = "/v1/access/widgets/{widget}",
    tag = "access",
    params(("widget" = String, Path, description = "Home widget key")),
    responses(
        (status = 200, description = "Widget visibility decision", body = AccessCheckResponse),
        (status = 401, description = "Caller not identified", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn check_widget(
    State(state): State<AppState>,
    Path(widget): Path<String>,
    headers: HeaderMap,
) -> Result<Json<AccessCheckResponse>, ApiError> {
    let actor = caller(&headers)?;
    let decision = state
        .engine
        .check_widget(&actor, &widget, attempt_metadata(&headers))
        .await;
    Ok(Json(check_response(
        &actor,
        AccessResource::Widget,
        widget,
        decision,
    )))
}

#[utoipa::path(
    get,
    path = "/v1/access/capabilities",
    tag = "access",
    responses(
        (status = 200, description = "Caller's aggregated capabilities", body = CapabilitiesResponse),
        (status = 403, description = "Caller has no access binding", body = crate::api::types::ErrorResponse),
        (status = 503, description = "Permission store unavailable", body = crate::api::types::ErrorResponse)
    )
)]
/// Return the caller's aggregated capability set.
///
/// # Errors
/// - 403 when the caller has no binding.
/// - 503 when the permission sources could not be loaded.
pub(crate) async fn capabilities(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<CapabilitiesResponse>, ApiError> {
    let actor = caller(&headers)?;
    match state.engine.effective_capabilities(&actor).await {
        Ok(set) => Ok(Json(CapabilitiesResponse {
            capabilities: set.as_ref().clone(),
        })),
        Err(DenialReason::StoreUnavailable) => {
            Err(api_unavailable("permission store unavailable"))
        }
        Err(_) => Err(api_forbidden("caller has no access binding")),
    }
}
