//! Storage seams for the governance engine.
//!
//! # Purpose
//! Declares one narrow trait per capability source (profiles, roles, settings,
//! bindings) plus the workflow, audit, and access-attempt stores. The engine
//! depends only on these traits; [`memory::InMemoryStore`] is the bundled
//! backend.
//!
//! # Key invariants
//! - Every permission mutation, its audit entry, and (for reviewed requests)
//!   the request status transition are committed through
//!   [`GovernedChangeStore::commit`] as one unit: all of it lands or none of it
//!   does.
//! - Mutations carry the version the caller read; a mismatch is rejected with
//!   [`StoreError::VersionMismatch`] and nothing is applied.
use crate::model::{
    AccessAttemptLog, AuditFilter, AuditLogEntry, AuditRecord, NewChangeRequest,
    PermissionChangeRequest, RequestId, RequestStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gatehouse_authz::{
    ActorId, CustomRole, Profile, ProfileId, RoleId, UserAccessBinding, VisibilityMatrix,
    VisibilityScope,
};
use thiserror::Error;

pub mod memory;

#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Maximum number of access attempts retained; oldest are evicted first.
    pub access_log_retention: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            access_log_retention: 100_000,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("version mismatch on {entity}: expected {expected}, found {actual}")]
    VersionMismatch {
        entity: String,
        expected: u64,
        actual: u64,
    },
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A single write to a permission source.
///
/// `expected_version: None` means the record must not exist yet; the stored
/// version after a write is `expected + 1` (or `1` on create). Matrices that
/// were never written have version `0`.
#[derive(Debug, Clone)]
pub enum Mutation {
    PutProfile {
        profile: Profile,
        expected_version: Option<u64>,
    },
    DeleteProfile {
        id: ProfileId,
        expected_version: u64,
    },
    PutRole {
        role: CustomRole,
        expected_version: Option<u64>,
    },
    /// Rejected with `Conflict` while any binding references the role.
    DeleteRole { id: RoleId, expected_version: u64 },
    PutBinding {
        binding: UserAccessBinding,
        expected_version: Option<u64>,
    },
    PutMatrix {
        scope: VisibilityScope,
        matrix: VisibilityMatrix,
        expected_version: u64,
    },
}

/// Moves a pending change request to a terminal status.
#[derive(Debug, Clone)]
pub struct RequestTransition {
    pub request_id: RequestId,
    pub status: RequestStatus,
    pub reviewer: ActorId,
    pub reviewed_at: DateTime<Utc>,
}

/// Unit of work applied atomically by [`GovernedChangeStore::commit`].
#[derive(Debug, Clone)]
pub struct GovernedChange {
    pub mutation: Option<Mutation>,
    pub transition: Option<RequestTransition>,
    pub audit: AuditRecord,
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, id: &ProfileId) -> StoreResult<Profile>;
    async fn list_profiles(&self) -> StoreResult<Vec<Profile>>;
}

#[async_trait]
pub trait CustomRoleStore: Send + Sync {
    async fn get_role(&self, id: &RoleId) -> StoreResult<CustomRole>;
    /// Batch lookup; ids with no stored role are skipped.
    async fn get_roles(&self, ids: &[RoleId]) -> StoreResult<Vec<CustomRole>>;
    async fn list_roles(&self) -> StoreResult<Vec<CustomRole>>;
    async fn list_active_roles(&self) -> StoreResult<Vec<CustomRole>>;
    async fn count_role_bindings(&self, id: &RoleId) -> StoreResult<usize>;
}

#[async_trait]
pub trait SettingStore: Send + Sync {
    /// Returns an empty matrix (version 0) when none was ever written.
    async fn get_visibility_matrix(&self, scope: VisibilityScope) -> StoreResult<VisibilityMatrix>;
}

#[async_trait]
pub trait ActorDirectory: Send + Sync {
    async fn get_binding(&self, actor_id: &ActorId) -> StoreResult<UserAccessBinding>;
    async fn list_bindings(&self) -> StoreResult<Vec<UserAccessBinding>>;
}

#[async_trait]
pub trait ChangeRequestStore: Send + Sync {
    async fn create_change_request(
        &self,
        request: NewChangeRequest,
    ) -> StoreResult<PermissionChangeRequest>;
    async fn get_change_request(&self, id: RequestId) -> StoreResult<PermissionChangeRequest>;
    async fn list_change_requests(
        &self,
        status: Option<RequestStatus>,
    ) -> StoreResult<Vec<PermissionChangeRequest>>;
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Matching entries in append order.
    async fn query_audit(&self, filter: &AuditFilter) -> StoreResult<Vec<AuditLogEntry>>;
}

#[async_trait]
pub trait AccessLogStore: Send + Sync {
    async fn record_access_attempt(&self, attempt: AccessAttemptLog) -> StoreResult<()>;
    async fn list_access_attempts(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<AccessAttemptLog>>;
}

#[async_trait]
pub trait GovernedChangeStore: Send + Sync {
    /// Validate, then apply the mutation, the request transition, and the audit
    /// append together. On any error nothing is applied.
    async fn commit(&self, change: GovernedChange) -> StoreResult<AuditLogEntry>;
}

#[async_trait]
pub trait GovernanceStore:
    ProfileStore
    + CustomRoleStore
    + SettingStore
    + ActorDirectory
    + ChangeRequestStore
    + AuditSink
    + AccessLogStore
    + GovernedChangeStore
{
    async fn health_check(&self) -> StoreResult<()>;
    fn is_durable(&self) -> bool;
    fn backend_name(&self) -> &'static str;
}
