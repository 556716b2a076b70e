//! Audit, reporting, and revocation API handlers.
//!
//! # Security considerations
//! - Audit and report reads require at least `read` on the `permissions` module.
//! - Revocation requires administrative capability.
use crate::api::caller;
use crate::api::error::ApiError;
use crate::api::types::{
    AccessReportResponse, AuditListResponse, AuditQuery, BindingResponse, ErrorResponse,
    ReportQuery, RevokeRequest,
};
use crate::app::AppState;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use gatehouse_authz::{AccessLevel, ActorId, PERMISSIONS_MODULE};

#[utoipa::path(
    get,
    path = "/v1/audit",
    tag = "audit",
    params(
        ("actor" = Option<String>, Query, description = "Actor who made the change"),
        ("subject" = Option<String>, Query, description = "Subject, e.g. actor:alice or role:ops"),
        ("action" = Option<String>, Query, description = "Audit action"),
        ("from" = Option<String>, Query, description = "Inclusive RFC 3339 lower bound"),
        ("to" = Option<String>, Query, description = "Inclusive RFC 3339 upper bound")
    ),
    responses(
        (status = 200, description = "Matching audit entries, oldest first", body = AuditListResponse),
        (status = 403, description = "Caller may not read audit entries", body = ErrorResponse)
    )
)]
pub(crate) async fn query_audit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<AuditQuery>,
) -> Result<Json<AuditListResponse>, ApiError> {
    let actor = caller(&headers)?;
    state
        .engine
        .require_module_level(&actor, PERMISSIONS_MODULE, AccessLevel::Read)
        .await?;
    let items = state.engine.query_audit(&query.into_filter()).await?;
    Ok(Json(AuditListResponse { items }))
}

#[utoipa::path(
    get,
    path = "/v1/reports/access",
    tag = "audit",
    params(
        ("from" = Option<String>, Query, description = "Inclusive RFC 3339 lower bound"),
        ("to" = Option<String>, Query, description = "Inclusive RFC 3339 upper bound")
    ),
    responses(
        (status = 200, description = "Access attempt summary", body = AccessReportResponse),
        (status = 403, description = "Caller may not read reports", body = ErrorResponse)
    )
)]
/// Summarize logged access attempts over a window.
pub(crate) async fn access_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ReportQuery>,
) -> Result<Json<AccessReportResponse>, ApiError> {
    let actor = caller(&headers)?;
    state
        .engine
        .require_module_level(&actor, PERMISSIONS_MODULE, AccessLevel::Read)
        .await?;
    let report = state.engine.access_report(query.from, query.to).await?;
    Ok(Json(AccessReportResponse { report }))
}

#[utoipa::path(
    post,
    path = "/v1/actors/{actor_id}/revoke",
    tag = "audit",
    params(("actor_id" = String, Path, description = "Actor whose access is revoked")),
    request_body = RevokeRequest,
    responses(
        (status = 200, description = "Updated binding", body = BindingResponse),
        (status = 403, description = "Caller is not an administrator", body = ErrorResponse),
        (status = 404, description = "Actor has no binding", body = ErrorResponse)
    )
)]
/// Strip an actor's role bindings, and optionally its profile.
pub(crate) async fn revoke(
    State(state): State<AppState>,
    Path(actor_id): Path<String>,
    headers: HeaderMap,
    body: Option<Json<RevokeRequest>>,
) -> Result<Json<BindingResponse>, ApiError> {
    let reviewer = caller(&headers)?;
    let request = body.map(|Json(body)| body).unwrap_or_default();
    let binding = state
        .engine
        .revoke_actor(&reviewer, &ActorId::new(actor_id), request.include_profile)
        .await?;
    Ok(Json(BindingResponse { binding }))
}
