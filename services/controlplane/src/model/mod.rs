//! Control-plane data model module.
//!
//! # Purpose
//! Re-exports the change-request, audit, and access-attempt records used by
//! the governance engine, the store layer, and the HTTP API. Permission
//! sources themselves (profiles, roles, bindings, matrices) live in
//! `gatehouse-authz`.
mod access_log;
mod audit;
mod change_request;

pub use access_log::{AccessAttemptLog, AccessReport, AccessResource, DeniedKeyCount};
pub use audit::{AuditAction, AuditFilter, AuditLogEntry, AuditRecord};
pub use change_request::{
    ChangeTarget, NewChangeRequest, PermissionChangeRequest, RequestId, RequestKind,
    RequestStatus,
};
