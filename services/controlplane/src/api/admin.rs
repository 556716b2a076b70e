//! Administrative API handlers for permission sources.
//!
//! # Purpose and responsibility
//! CRUD over profiles and custom roles, binding replacement, and visibility
//! matrix edits. Each write produces exactly one audit entry (see
//! `governance::admin`).
//!
//! # Key invariants and assumptions
//! - The path id is authoritative; an id in the body is overwritten.
//! - Listing requires `read` on the `permissions` module; writes require
//!   administrative capability.
use crate::api::caller;
use crate::api::error::ApiError;
use crate::api::types::{
    BindingListResponse, BindingResponse, ErrorResponse, MatrixResponse, ProfileListResponse,
    ProfileResponse, RoleListResponse, RoleResponse,
};
use crate::app::AppState;
use crate::governance::GovernanceError;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use gatehouse_authz::{
    ActorId, CustomRole, Profile, ProfileId, RoleId, UserAccessBinding, VisibilityMatrix,
    VisibilityScope,
};

fn parse_scope(scope: &str) -> Result<VisibilityScope, ApiError> {
    scope
        .parse::<VisibilityScope>()
        .map_err(|err| ApiError::from(GovernanceError::from(err)))
}

#[utoipa::path(
    get,
    path = "/v1/profiles",
    tag = "admin",
    responses(
        (status = 200, description = "List profiles", body = ProfileListResponse),
        (status = 403, description = "Caller may not read permission sources", body = ErrorResponse)
    )
)]
pub(crate) async fn list_profiles(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ProfileListResponse>, ApiError> {
    let actor = caller(&headers)?;
    let items = state.engine.list_profiles(&actor).await?;
    Ok(Json(ProfileListResponse { items }))
}

#[utoipa::path(
    post,
    path = "/v1/profiles",
    tag = "admin",
    responses(
        (status = 201, description = "Profile created", body = ProfileResponse),
        (status = 400, description = "Invalid profile", body = ErrorResponse),
        (status = 409, description = "Profile already exists", body = ErrorResponse)
    )
)]
pub(crate) async fn create_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(profile): Json<Profile>,
) -> Result<(StatusCode, Json<ProfileResponse>), ApiError> {
    let actor = caller(&headers)?;
    let profile = state.engine.create_profile(&actor, profile).await?;
    Ok((StatusCode::CREATED, Json(ProfileResponse { profile })))
}

#[utoipa::path(
    put,
    path = "/v1/profiles/{id}",
    tag = "admin",
    params(("id" = String, Path, description = "Profile id")),
    responses(
        (status = 200, description = "Profile replaced", body = ProfileResponse),
        (status = 404, description = "Profile not found", body = ErrorResponse)
    )
)]
pub(crate) async fn update_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(mut profile): Json<Profile>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let actor = caller(&headers)?;
    profile.id = ProfileId::new(id);
    let profile = state.engine.update_profile(&actor, profile).await?;
    Ok(Json(ProfileResponse { profile }))
}

#[utoipa::path(
    delete,
    path = "/v1/profiles/{id}",
    tag = "admin",
    params(("id" = String, Path, description = "Profile id")),
    responses(
        (status = 204, description = "Profile deleted"),
        (status = 404, description = "Profile not found", body = ErrorResponse)
    )
)]
pub(crate) async fn delete_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let actor = caller(&headers)?;
    state
        .engine
        .delete_profile(&actor, &ProfileId::new(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/v1/roles",
    tag = "admin",
    responses(
        (status = 200, description = "List custom roles", body = RoleListResponse),
        (status = 403, description = "Caller may not read permission sources", body = ErrorResponse)
    )
)]
pub(crate) async fn list_roles(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RoleListResponse>, ApiError> {
    let actor = caller(&headers)?;
    let items = state.engine.list_roles(&actor).await?;
    Ok(Json(RoleListResponse { items }))
}

#[utoipa::path(
    post,
    path = "/v1/roles",
    tag = "admin",
    responses(
        (status = 201, description = "Role created", body = RoleResponse),
        (status = 400, description = "Invalid role", body = ErrorResponse),
        (status = 409, description = "Role already exists", body = ErrorResponse)
    )
)]
pub(crate) async fn create_role(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(role): Json<CustomRole>,
) -> Result<(StatusCode, Json<RoleResponse>), ApiError> {
    let actor = caller(&headers)?;
    let role = state.engine.create_role(&actor, role).await?;
    Ok((StatusCode::CREATED, Json(RoleResponse { role })))
}

#[utoipa::path(
    put,
    path = "/v1/roles/{id}",
    tag = "admin",
    params(("id" = String, Path, description = "Role id")),
    responses(
        (status = 200, description = "Role replaced", body = RoleResponse),
        (status = 404, description = "Role not found", body = ErrorResponse)
    )
)]
pub(crate) async fn update_role(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(mut role): Json<CustomRole>,
) -> Result<Json<RoleResponse>, ApiError> {
    let actor = caller(&headers)?;
    role.id = RoleId::new(id);
    let role = state.engine.update_role(&actor, role).await?;
    Ok(Json(RoleResponse { role }))
}

#[utoipa::path(
    delete,
    path = "/v1/roles/{id}",
    tag = "admin",
    params(("id" = String, Path, description = "Role id")),
    responses(
        (status = 204, description = "Role deleted"),
        (status = 404, description = "Role not found", body = ErrorResponse),
        (status = 409, description = "Role is still bound to actors", body = ErrorResponse)
    )
)]
/// Delete a custom role.
///
/// # Errors
/// - 409 while any actor binding still references the role.
pub(crate) async fn delete_role(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let actor = caller(&headers)?;
    state.engine.delete_role(&actor, &RoleId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/v1/bindings",
    tag = "admin",
    responses(
        (status = 200, description = "List actor bindings", body = BindingListResponse)
    )
)]
pub(crate) async fn list_bindings(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<BindingListResponse>, ApiError> {
    let actor = caller(&headers)?;
    let items = state.engine.list_bindings(&actor).await?;
    Ok(Json(BindingListResponse { items }))
}

#[utoipa::path(
    put,
    path = "/v1/bindings/{actor_id}",
    tag = "admin",
    params(("actor_id" = String, Path, description = "Bound actor")),
    responses(
        (status = 200, description = "Binding created or replaced", body = BindingResponse),
        (status = 400, description = "Unknown profile or role", body = ErrorResponse)
    )
)]
pub(crate) async fn put_binding(
    State(state): State<AppState>,
    Path(actor_id): Path<String>,
    headers: HeaderMap,
    Json(mut binding): Json<UserAccessBinding>,
) -> Result<Json<BindingResponse>, ApiError> {
    let actor = caller(&headers)?;
    binding.actor_id = ActorId::new(actor_id);
    let binding = state.engine.put_binding(&actor, binding).await?;
    Ok(Json(BindingResponse { binding }))
}

#[utoipa::path(
    get,
    path = "/v1/matrices/{scope}",
    tag = "admin",
    params(("scope" = String, Path, description = "sidebar or portal")),
    responses(
        (status = 200, description = "Visibility matrix", body = MatrixResponse),
        (status = 400, description = "Unknown scope", body = ErrorResponse)
    )
)]
pub(crate) async fn get_matrix(
    State(state): State<AppState>,
    Path(scope): Path<String>,
    headers: HeaderMap,
) -> Result<Json<MatrixResponse>, ApiError> {
    let actor = caller(&headers)?;
    let scope = parse_scope(&scope)?;
    let matrix = state.engine.get_visibility_matrix(&actor, scope).await?;
    Ok(Json(MatrixResponse {
        scope: scope.to_string(),
        matrix,
    }))
}

#[utoipa::path(
    put,
    path = "/v1/matrices/{scope}",
    tag = "admin",
    params(("scope" = String, Path, description = "sidebar or portal")),
    responses(
        (status = 200, description = "Visibility matrix replaced", body = MatrixResponse),
        (status = 400, description = "Unknown scope", body = ErrorResponse)
    )
)]
pub(crate) async fn put_matrix(
    State(state): State<AppState>,
    Path(scope): Path<String>,
    headers: HeaderMap,
    Json(matrix): Json<VisibilityMatrix>,
) -> Result<Json<MatrixResponse>, ApiError> {
    let actor = caller(&headers)?;
    let scope = parse_scope(&scope)?;
    let matrix = state
        .engine
        .put_visibility_matrix(&actor, scope, matrix)
        .await?;
    Ok(Json(MatrixResponse {
        scope: scope.to_string(),
        matrix,
    }))
}
