#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use chrono::{DateTime, Utc};
use gatehouse_authz::{
    AccessLevel, ActorId, CapabilitySet, CustomRole, Dimension, Profile, ProfileId, ProfileKind,
    RoleId, UserAccessBinding, VisibilityMatrix, VisibilityScope,
};
use gatehouse_controlplane::app::{AppState, build_router};
use gatehouse_controlplane::governance::{EngineSettings, GovernanceEngine};
use gatehouse_controlplane::model::{
    AccessAttemptLog, AuditAction, AuditFilter, AuditLogEntry, AuditRecord, NewChangeRequest,
    PermissionChangeRequest, RequestId, RequestStatus,
};
use gatehouse_controlplane::store::memory::InMemoryStore;
use gatehouse_controlplane::store::{
    AccessLogStore, ActorDirectory, AuditSink, ChangeRequestStore, CustomRoleStore,
    GovernanceStore, GovernedChange, GovernedChangeStore, Mutation, ProfileStore, SettingStore,
    StoreError, StoreResult,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub const ADMIN: &str = "root";
pub const ALICE: &str = "alice";
pub const BOB: &str = "bob";
pub const PARTNER: &str = "partner-user";

pub async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

pub fn json_request(
    method: &str,
    uri: &str,
    actor: Option<&str>,
    body: serde_json::Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(actor) = actor {
        builder = builder.header("x-actor-id", actor);
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

pub fn get_request(uri: &str, actor: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(actor) = actor {
        builder = builder.header("x-actor-id", actor);
    }
    builder.body(Body::empty()).expect("request")
}

/// Wraps the in-memory store and fails selected calls on demand.
#[derive(Default)]
pub struct FaultyStore {
    pub inner: InMemoryStore,
    pub fail_commits: AtomicBool,
    pub fail_reads: AtomicBool,
}

impl FaultyStore {
    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    fn check_read(&self) -> StoreResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected read failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for FaultyStore {
    async fn get_profile(&self, id: &ProfileId) -> StoreResult<Profile> {
        self.check_read()?;
        self.inner.get_profile(id).await
    }

    async fn list_profiles(&self) -> StoreResult<Vec<Profile>> {
        self.check_read()?;
        self.inner.list_profiles().await
    }
}

#[async_trait]
impl CustomRoleStore for FaultyStore {
    async fn get_role(&self, id: &RoleId) -> StoreResult<CustomRole> {
        self.check_read()?;
        self.inner.get_role(id).await
    }

    async fn get_roles(&self, ids: &[RoleId]) -> StoreResult<Vec<CustomRole>> {
        self.check_read()?;
        self.inner.get_roles(ids).await
    }

    async fn list_roles(&self) -> StoreResult<Vec<CustomRole>> {
        self.check_read()?;
        self.inner.list_roles().await
    }

    async fn list_active_roles(&self) -> StoreResult<Vec<CustomRole>> {
        self.check_read()?;
        self.inner.list_active_roles().await
    }

    async fn count_role_bindings(&self, id: &RoleId) -> StoreResult<usize> {
        self.check_read()?;
        self.inner.count_role_bindings(id).await
    }
}

#[async_trait]
impl SettingStore for FaultyStore {
    async fn get_visibility_matrix(&self, scope: VisibilityScope) -> StoreResult<VisibilityMatrix> {
        self.check_read()?;
        self.inner.get_visibility_matrix(scope).await
    }
}

#[async_trait]
impl ActorDirectory for FaultyStore {
    async fn get_binding(&self, actor_id: &ActorId) -> StoreResult<UserAccessBinding> {
        self.check_read()?;
        self.inner.get_binding(actor_id).await
    }

    async fn list_bindings(&self) -> StoreResult<Vec<UserAccessBinding>> {
        self.check_read()?;
        self.inner.list_bindings().await
    }
}

#[async_trait]
impl ChangeRequestStore for FaultyStore {
    async fn create_change_request(
        &self,
        request: NewChangeRequest,
    ) -> StoreResult<PermissionChangeRequest> {
        self.inner.create_change_request(request).await
    }

    async fn get_change_request(&self, id: RequestId) -> StoreResult<PermissionChangeRequest> {
        self.inner.get_change_request(id).await
    }

    async fn list_change_requests(
        &self,
        status: Option<RequestStatus>,
    ) -> StoreResult<Vec<PermissionChangeRequest>> {
        self.inner.list_change_requests(status).await
    }
}

#[async_trait]
impl AuditSink for FaultyStore {
    async fn query_audit(&self, filter: &AuditFilter) -> StoreResult<Vec<AuditLogEntry>> {
        self.inner.query_audit(filter).await
    }
}

#[async_trait]
impl AccessLogStore for FaultyStore {
    async fn record_access_attempt(&self, attempt: AccessAttemptLog) -> StoreResult<()> {
        self.inner.record_access_attempt(attempt).await
    }

    async fn list_access_attempts(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<AccessAttemptLog>> {
        self.inner.list_access_attempts(from, to).await
    }
}

#[async_trait]
impl GovernedChangeStore for FaultyStore {
    async fn commit(&self, change: GovernedChange) -> StoreResult<AuditLogEntry> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected commit failure".into()));
        }
        self.inner.commit(change).await
    }
}

#[async_trait]
impl GovernanceStore for FaultyStore {
    async fn health_check(&self) -> StoreResult<()> {
        self.check_read()?;
        self.inner.health_check().await
    }

    fn is_durable(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &'static str {
        "faulty-memory"
    }
}

/// Write directly through the store; fixtures bypass the engine's guards.
pub async fn seed<S: GovernedChangeStore + ?Sized>(store: &S, mutation: Mutation) {
    store
        .commit(GovernedChange {
            mutation: Some(mutation),
            transition: None,
            audit: AuditRecord {
                actor: ActorId::new("fixture"),
                subject: "fixture".to_string(),
                action: AuditAction::BindingUpdated,
                field: "fixture".to_string(),
                old_value: None,
                new_value: None,
                request_id: None,
                timestamp: Utc::now(),
            },
        })
        .await
        .expect("seed fixture");
}

/// Standard world:
/// - `root`: admin, no profile.
/// - `alice`: profile `staff` (pages Dashboard; sidebar overview, billing; widget news;
///   tasks module read) plus role `tasks` (pages Tasks).
/// - `bob`: profile `staff` only.
/// - `partner-user`: external profile `partner` (pages Portal; widget news).
/// - Role `everything` (pages `*`) exists but is unbound.
/// - Sidebar matrix hides `billing` for label `user`.
pub async fn seed_world<S: GovernedChangeStore + ?Sized>(store: &S) {
    let staff = Profile::new(ProfileId::new("staff"), "Staff", ProfileKind::Internal)
        .with_permissions(
            CapabilitySet::with_pages(["Dashboard"])
                .with(Dimension::SidebarSections, ["overview", "billing"])
                .with(Dimension::HomeWidgets, ["news"]),
        )
        .with_module("tasks", AccessLevel::Read);
    let partner = Profile::new(ProfileId::new("partner"), "Partner", ProfileKind::External)
        .with_permissions(
            CapabilitySet::with_pages(["Portal"]).with(Dimension::HomeWidgets, ["news"]),
        );
    for profile in [staff, partner] {
        seed(
            store,
            Mutation::PutProfile {
                profile,
                expected_version: None,
            },
        )
        .await;
    }

    let tasks = CustomRole::new(RoleId::new("tasks"), "Tasks")
        .with_permissions(CapabilitySet::with_pages(["Tasks"]))
        .with_module("tasks", AccessLevel::Write);
    let everything = CustomRole::new(RoleId::new("everything"), "Everything")
        .with_permissions(CapabilitySet::with_pages(["*"]));
    for role in [tasks, everything] {
        seed(
            store,
            Mutation::PutRole {
                role,
                expected_version: None,
            },
        )
        .await;
    }

    let bindings = [
        UserAccessBinding::new(ActorId::new(ADMIN)).admin(),
        UserAccessBinding::new(ActorId::new(ALICE))
            .with_profile(ProfileId::new("staff"))
            .with_role(RoleId::new("tasks")),
        UserAccessBinding::new(ActorId::new(BOB)).with_profile(ProfileId::new("staff")),
        UserAccessBinding::new(ActorId::new(PARTNER)).with_profile(ProfileId::new("partner")),
    ];
    for binding in bindings {
        seed(
            store,
            Mutation::PutBinding {
                binding,
                expected_version: None,
            },
        )
        .await;
    }

    seed(
        store,
        Mutation::PutMatrix {
            scope: VisibilityScope::Sidebar,
            matrix: VisibilityMatrix::default().with_entry("user", "billing", false),
            expected_version: 0,
        },
    )
    .await;
}

pub async fn world() -> (Arc<GovernanceEngine>, Arc<FaultyStore>) {
    world_with(EngineSettings::default()).await
}

pub async fn world_with(settings: EngineSettings) -> (Arc<GovernanceEngine>, Arc<FaultyStore>) {
    let store = Arc::new(FaultyStore::default());
    seed_world(store.as_ref()).await;
    let engine = Arc::new(GovernanceEngine::new(store.clone(), settings));
    (engine, store)
}

pub async fn router() -> (axum::Router, Arc<FaultyStore>) {
    let (engine, store) = world().await;
    (build_router(AppState::new(engine)), store)
}

/// Audit entries written after the fixture seed.
pub async fn governed_audit(engine: &GovernanceEngine) -> Vec<AuditLogEntry> {
    engine
        .query_audit(&AuditFilter::default())
        .await
        .expect("audit")
        .into_iter()
        .filter(|entry| entry.actor.as_str() != "fixture")
        .collect()
}
