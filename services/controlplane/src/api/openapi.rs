//! OpenAPI schema aggregation for the control-plane API.
//!
//! # Purpose
//! Collects all routes and schema types into a single OpenAPI document for docs
//! and client generation.
use crate::api::{
    access, admin, audit, requests, system,
    types::{
        AccessCheckResponse, AccessReportResponse, AuditListResponse, BindingListResponse,
        BindingResponse, CapabilitiesResponse, ChangeRequestCreateRequest, ChangeRequestCreated,
        ChangeRequestListResponse, ChangeRequestResponse, ErrorResponse, HealthStatus,
        MatrixResponse, ModuleAccessResponse, ProfileListResponse, ProfileResponse,
        RevokeRequest, RoleListResponse, RoleResponse,
    },
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "gatehouse-controlplane",
        version = "v1",
        description = "Gatehouse access governance HTTP API"
    ),
    paths(
        system::system_health,
        access::check_page,
        access::check_module,
        access::check_sidebar_section,
        access::check_widget,
        access::capabilities,
        requests::submit,
        requests::list_requests,
        requests::get_request,
        requests::approve,
        requests::reject,
        audit::query_audit,
        audit::access_report,
        audit::revoke,
        admin::list_profiles,
        admin::create_profile,
        admin::update_profile,
        admin::delete_profile,
        admin::list_roles,
        admin::create_role,
        admin::update_role,
        admin::delete_role,
        admin::list_bindings,
        admin::put_binding,
        admin::get_matrix,
        admin::put_matrix
    ),
    components(schemas(
        HealthStatus,
        ErrorResponse,
        AccessCheckResponse,
        ModuleAccessResponse,
        CapabilitiesResponse,
        ChangeRequestCreateRequest,
        ChangeRequestCreated,
        ChangeRequestResponse,
        ChangeRequestListResponse,
        AuditListResponse,
        AccessReportResponse,
        RevokeRequest,
        BindingResponse,
        BindingListResponse,
        ProfileResponse,
        ProfileListResponse,
        RoleResponse,
        RoleListResponse,
        MatrixResponse
    )),
    tags(
        (name = "system", description = "Health"),
        (name = "access", description = "Access decisions for the calling actor"),
        (name = "change-requests", description = "Permission change workflow"),
        (name = "audit", description = "Audit log, access reports, revocation"),
        (name = "admin", description = "Profiles, roles, bindings, visibility matrices")
    )
)]
pub struct ApiDoc;
