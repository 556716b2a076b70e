//! HTTP API request/response types.
//!
//! # Purpose
//! Defines shared payload shapes for the governance REST API and OpenAPI
//! schema generation. Domain records from `gatehouse-authz` and the control
//! plane model are embedded as-is and documented as generic objects.
use crate::model::{
    AccessReport, AuditAction, AuditFilter, AuditLogEntry, ChangeTarget, PermissionChangeRequest,
    RequestKind, RequestStatus,
};
use chrono::{DateTime, Utc};
use gatehouse_authz::{
    ActorId, AggregatedCapabilitySet, CustomRole, Profile, UserAccessBinding, VisibilityMatrix,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct HealthStatus {
    pub status: String,
    pub backend: String,
    pub durable: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub request_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct AccessCheckResponse {
    pub actor_id: String,
    pub resource: String,
    pub key: String,
    pub granted: bool,
    pub denial_reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct ModuleAccessResponse {
    pub actor_id: String,
    pub module: String,
    pub level: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct CapabilitiesResponse {
    #[schema(value_type = Object)]
    pub capabilities: AggregatedCapabilitySet,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct ChangeRequestCreateRequest {
    /// `{"type": "actor" | "profile" | "role", "id": "..."}`
    #[schema(value_type = Object)]
    pub target: ChangeTarget,
    /// One of `add_page`, `remove_page`, `add_widget`, `remove_widget`, `change_role`.
    #[schema(value_type = String)]
    pub kind: RequestKind,
    pub value: String,
    #[serde(default)]
    pub justification: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct ChangeRequestCreated {
    pub id: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct ChangeRequestResponse {
    #[schema(value_type = Object)]
    pub request: PermissionChangeRequest,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct ChangeRequestListResponse {
    #[schema(value_type = Vec<Object>)]
    pub items: Vec<PermissionChangeRequest>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeRequestListQuery {
    #[serde(default)]
    pub status: Option<RequestStatus>,
}

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    #[serde(default)]
    pub actor: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub action: Option<AuditAction>,
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
}

impl AuditQuery {
    pub fn into_filter(self) -> AuditFilter {
        AuditFilter {
            actor: self.actor.map(ActorId::new),
            subject: self.subject,
            action: self.action,
            from: self.from,
            to: self.to,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct AuditListResponse {
    #[schema(value_type = Vec<Object>)]
    pub items: Vec<AuditLogEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct AccessReportResponse {
    #[schema(value_type = Object)]
    pub report: AccessReport,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Default)]
pub struct RevokeRequest {
    /// Also clear the actor's profile binding.
    #[serde(default)]
    pub include_profile: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct BindingResponse {
    #[schema(value_type = Object)]
    pub binding: UserAccessBinding,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct BindingListResponse {
    #[schema(value_type = Vec<Object>)]
    pub items: Vec<UserAccessBinding>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct ProfileResponse {
    #[schema(value_type = Object)]
    pub profile: Profile,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct ProfileListResponse {
    #[schema(value_type = Vec<Object>)]
    pub items: Vec<Profile>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct RoleResponse {
    #[schema(value_type = Object)]
    pub role: CustomRole,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct RoleListResponse {
    #[schema(value_type = Vec<Object>)]
    pub items: Vec<CustomRole>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct MatrixResponse {
    pub scope: String,
    #[schema(value_type = Object)]
    pub matrix: VisibilityMatrix,
}
