//! Permission change-request API handlers.
//!
//! # Purpose and responsibility
//! Submission, lookup, listing, and review (approve/reject) of permission
//! change requests. Review requires administrative capability; the engine
//! enforces it.
use crate::api::caller;
use crate::api::error::ApiError;
use crate::api::types::{
    ChangeRequestCreateRequest, ChangeRequestCreated, ChangeRequestListQuery,
    ChangeRequestListResponse, ChangeRequestResponse, ErrorResponse,
};
use crate::app::AppState;
use crate::model::RequestId;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};

#[utoipa::path(
    post,
    path = "/v1/change-requests",
    tag = "change-requests",
    request_body = ChangeRequestCreateRequest,
    responses(
        (status = 201, description = "Change request submitted", body = ChangeRequestCreated),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Target not found", body = ErrorResponse)
    )
)]
/// Submit a change request on behalf of the caller.
///
/// # Errors
/// - 400 for an empty value, a wildcard value, or a malformed role change.
/// - 404 when the target does not exist.
pub(crate) async fn submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ChangeRequestCreateRequest>,
) -> Result<(StatusCode, Json<ChangeRequestCreated>), ApiError> {
    let requester = caller(&headers)?;
    let id = state
        .engine
        .submit_change_request(
            &requester,
            body.target,
            body.kind,
            &body.value,
            &body.justification,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(ChangeRequestCreated { id })))
}

#[utoipa::path(
    get,
    path = "/v1/change-requests",
    tag = "change-requests",
    params(("status" = Option<String>, Query, description = "pending, approved or rejected")),
    responses(
        (status = 200, description = "Change requests, oldest first", body = ChangeRequestListResponse)
    )
)]
pub(crate) async fn list_requests(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ChangeRequestListQuery>,
) -> Result<Json<ChangeRequestListResponse>, ApiError> {
    caller(&headers)?;
    let items = state.engine.list_change_requests(query.status).await?;
    Ok(Json(ChangeRequestListResponse { items }))
}

#[utoipa::path(
    get,
    path = "/v1/change-requests/{id}",
    tag = "change-requests",
    params(("id" = u64, Path, description = "Change request id")),
    responses(
        (status = 200, description = "Change request", body = ChangeRequestResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    )
)]
pub(crate) async fn get_request(
    State(state): State<AppState>,
    Path(id): Path<RequestId>,
    headers: HeaderMap,
) -> Result<Json<ChangeRequestResponse>, ApiError> {
    caller(&headers)?;
    let request = state.engine.get_change_request(id).await?;
    Ok(Json(ChangeRequestResponse { request }))
}

#[utoipa::path(
    post,
    path = "/v1/change-requests/{id}/approve",
    tag = "change-requests",
    params(("id" = u64, Path, description = "Change request id")),
    responses(
        (status = 200, description = "Request approved and applied", body = ChangeRequestResponse),
        (status = 403, description = "Reviewer is not an administrator", body = ErrorResponse),
        (status = 409, description = "Request already reviewed", body = ErrorResponse)
    )
)]
/// Approve a pending request, applying its delta atomically.
pub(crate) async fn approve(
    State(state): State<AppState>,
    Path(id): Path<RequestId>,
    headers: HeaderMap,
) -> Result<Json<ChangeRequestResponse>, ApiError> {
    let reviewer = caller(&headers)?;
    let request = state.engine.approve_request(&reviewer, id).await?;
    Ok(Json(ChangeRequestResponse { request }))
}

#[utoipa::path(
    post,
    path = "/v1/change-requests/{id}/reject",
    tag = "change-requests",
    params(("id" = u64, Path, description = "Change request id")),
    responses(
        (status = 200, description = "Request rejected", body = ChangeRequestResponse),
        (status = 403, description = "Reviewer is not an administrator", body = ErrorResponse),
        (status = 409, description = "Request already reviewed", body = ErrorResponse)
    )
)]
pub(crate) async fn reject(
    State(state): State<AppState>,
    Path(id): Path<RequestId>,
    headers: HeaderMap,
) -> Result<Json<ChangeRequestResponse>, ApiError> {
    let reviewer = caller(&headers)?;
    let request = state.engine.reject_request(&reviewer, id).await?;
    Ok(Json(ChangeRequestResponse { request }))
}
