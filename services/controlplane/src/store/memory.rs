//! In-memory implementation of the governance store.
//!
//! # Purpose
//! This store implements every governance store trait in memory using `HashMap`s guarded by
//! `tokio::sync::RwLock`. It exists for:
//! - local development and tests (no external dependencies)
//! - deployments where durability is not required
//!
//! # Durability and consistency
//! - **Not durable**: all state is lost on process restart.
//! - **Single-process consistency**: reads take read locks; `commit` takes write locks on every
//!   structure it may touch, validates the whole change, and only then applies it. A failed
//!   validation leaves every structure untouched.
//! - **Lock order**: profiles, roles, bindings, matrices, requests, audit. Any method taking more
//!   than one lock must follow it.
//!
//! # Logs
//! - The audit log is append-only and never evicted.
//! - The access-attempt log keeps the most recent `StoreConfig::access_log_retention` attempts.
//!
//! # Metrics
//! Gauges for profile, role, and binding counts plus an audit append counter, so the in-memory
//! backend reports the same series a durable one would.
use super::{
    AccessLogStore, ActorDirectory, AuditSink, ChangeRequestStore, CustomRoleStore,
    GovernanceStore, GovernedChange, GovernedChangeStore, Mutation, ProfileStore,
    RequestTransition, SettingStore, StoreConfig, StoreError, StoreResult,
};
use crate::model::{
    AccessAttemptLog, AuditFilter, AuditLogEntry, NewChangeRequest, PermissionChangeRequest,
    RequestId, RequestStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gatehouse_authz::{
    ActorId, CustomRole, Profile, ProfileId, RoleId, UserAccessBinding, VisibilityMatrix,
    VisibilityScope,
};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory append-only log keyed by a monotonically increasing `seq`.
///
/// With a capacity, older items are evicted once it is exceeded; without one the log only grows.
#[derive(Debug)]
struct SequencedLog<T> {
    next_seq: u64,
    capacity: Option<usize>,
    items: VecDeque<T>,
}

impl<T> SequencedLog<T> {
    fn unbounded() -> Self {
        Self {
            next_seq: 1,
            capacity: None,
            items: VecDeque::new(),
        }
    }

    fn bounded(capacity: usize) -> Self {
        Self {
            next_seq: 1,
            capacity: Some(capacity),
            items: VecDeque::new(),
        }
    }

    fn record(&mut self, item: impl FnOnce(u64) -> T) -> &T {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.items.push_back(item(seq));
        if let Some(capacity) = self.capacity {
            while self.items.len() > capacity {
                self.items.pop_front();
            }
        }
        // Non-empty: just pushed, and capacity 0 is rejected at construction.
        &self.items[self.items.len() - 1]
    }
}

/// Version check shared by every mutation kind.
fn check_version(entity: &str, expected: Option<u64>, current: Option<u64>) -> StoreResult<()> {
    match (expected, current) {
        (None, None) => Ok(()),
        (None, Some(_)) => Err(StoreError::Conflict(format!("{entity} already exists"))),
        (Some(_), None) => Err(StoreError::NotFound(entity.to_string())),
        (Some(expected), Some(actual)) if expected != actual => Err(StoreError::VersionMismatch {
            entity: entity.to_string(),
            expected,
            actual,
        }),
        (Some(_), Some(_)) => Ok(()),
    }
}

fn next_version(expected: Option<u64>) -> u64 {
    expected.map_or(1, |version| version + 1)
}

/// In-memory governance store.
///
/// All maps/logs are wrapped in `Arc<RwLock<...>>` so the store can be shared across request
/// handlers, reads proceed concurrently, and writes are serialized.
pub struct InMemoryStore {
    profiles: Arc<RwLock<HashMap<ProfileId, Profile>>>,
    roles: Arc<RwLock<HashMap<RoleId, CustomRole>>>,
    bindings: Arc<RwLock<HashMap<ActorId, UserAccessBinding>>>,
    /// Matrices keyed by scope; persisted under `VisibilityScope::setting_key`.
    matrices: Arc<RwLock<HashMap<VisibilityScope, VisibilityMatrix>>>,
    /// Change requests keyed by id; ids are assigned from `next_request_id`.
    requests: Arc<RwLock<RequestTable>>,
    audit_log: Arc<RwLock<SequencedLog<AuditLogEntry>>>,
    access_log: Arc<RwLock<SequencedLog<AccessAttemptLog>>>,
}

#[derive(Debug)]
struct RequestTable {
    next_request_id: RequestId,
    items: BTreeMap<RequestId, PermissionChangeRequest>,
}

impl InMemoryStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            profiles: Arc::new(RwLock::new(HashMap::new())),
            roles: Arc::new(RwLock::new(HashMap::new())),
            bindings: Arc::new(RwLock::new(HashMap::new())),
            matrices: Arc::new(RwLock::new(HashMap::new())),
            requests: Arc::new(RwLock::new(RequestTable {
                next_request_id: 1,
                items: BTreeMap::new(),
            })),
            audit_log: Arc::new(RwLock::new(SequencedLog::unbounded())),
            access_log: Arc::new(RwLock::new(SequencedLog::bounded(
                config.access_log_retention.max(1),
            ))),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

/// Write guards held for the duration of one commit.
struct CommitGuards<'a> {
    profiles: tokio::sync::RwLockWriteGuard<'a, HashMap<ProfileId, Profile>>,
    roles: tokio::sync::RwLockWriteGuard<'a, HashMap<RoleId, CustomRole>>,
    bindings: tokio::sync::RwLockWriteGuard<'a, HashMap<ActorId, UserAccessBinding>>,
    matrices: tokio::sync::RwLockWriteGuard<'a, HashMap<VisibilityScope, VisibilityMatrix>>,
    requests: tokio::sync::RwLockWriteGuard<'a, RequestTable>,
}

impl CommitGuards<'_> {
    fn validate_mutation(&self, mutation: &Mutation) -> StoreResult<()> {
        match mutation {
            Mutation::PutProfile {
                profile,
                expected_version,
            } => check_version(
                &format!("profile {}", profile.id),
                *expected_version,
                self.profiles.get(&profile.id).map(|p| p.version),
            ),
            Mutation::DeleteProfile {
                id,
                expected_version,
            } => check_version(
                &format!("profile {id}"),
                Some(*expected_version),
                self.profiles.get(id).map(|p| p.version),
            ),
            Mutation::PutRole {
                role,
                expected_version,
            } => check_version(
                &format!("role {}", role.id),
                *expected_version,
                self.roles.get(&role.id).map(|r| r.version),
            ),
            Mutation::DeleteRole {
                id,
                expected_version,
            } => {
                check_version(
                    &format!("role {id}"),
                    Some(*expected_version),
                    self.roles.get(id).map(|r| r.version),
                )?;
                let bound = self
                    .bindings
                    .values()
                    .filter(|binding| binding.references_role(id))
                    .count();
                if bound > 0 {
                    return Err(StoreError::Conflict(format!(
                        "role {id} is bound to {bound} actor(s)"
                    )));
                }
                Ok(())
            }
            Mutation::PutBinding {
                binding,
                expected_version,
            } => check_version(
                &format!("binding {}", binding.actor_id),
                *expected_version,
                self.bindings.get(&binding.actor_id).map(|b| b.version),
            ),
            Mutation::PutMatrix {
                scope,
                expected_version,
                ..
            } => check_version(
                &format!("matrix {scope}"),
                Some(*expected_version),
                Some(self.matrices.get(scope).map_or(0, |m| m.version)),
            ),
        }
    }

    fn validate_transition(&self, transition: &RequestTransition) -> StoreResult<()> {
        let request = self
            .requests
            .items
            .get(&transition.request_id)
            .ok_or_else(|| StoreError::NotFound(format!("change request {}", transition.request_id)))?;
        if request.status.is_terminal() {
            return Err(StoreError::Conflict(format!(
                "change request {} is already {}",
                request.id, request.status
            )));
        }
        if transition.status == RequestStatus::Pending {
            return Err(StoreError::Conflict(
                "change request can only move to a terminal status".into(),
            ));
        }
        Ok(())
    }

    fn apply_mutation(&mut self, mutation: Mutation) {
        match mutation {
            Mutation::PutProfile {
                mut profile,
                expected_version,
            } => {
                profile.version = next_version(expected_version);
                self.profiles.insert(profile.id.clone(), profile);
                metrics::gauge!("gatehouse_profiles_total").set(self.profiles.len() as f64);
            }
            Mutation::DeleteProfile { id, .. } => {
                self.profiles.remove(&id);
                metrics::gauge!("gatehouse_profiles_total").set(self.profiles.len() as f64);
            }
            Mutation::PutRole {
                mut role,
                expected_version,
            } => {
                role.version = next_version(expected_version);
                self.roles.insert(role.id.clone(), role);
                metrics::gauge!("gatehouse_roles_total").set(self.roles.len() as f64);
            }
            Mutation::DeleteRole { id, .. } => {
                self.roles.remove(&id);
                metrics::gauge!("gatehouse_roles_total").set(self.roles.len() as f64);
            }
            Mutation::PutBinding {
                mut binding,
                expected_version,
            } => {
                binding.version = next_version(expected_version);
                self.bindings.insert(binding.actor_id.clone(), binding);
                metrics::gauge!("gatehouse_bindings_total").set(self.bindings.len() as f64);
            }
            Mutation::PutMatrix {
                scope,
                mut matrix,
                expected_version,
            } => {
                matrix.version = expected_version + 1;
                self.matrices.insert(scope, matrix);
            }
        }
    }

    fn apply_transition(&mut self, transition: RequestTransition) {
        if let Some(request) = self.requests.items.get_mut(&transition.request_id) {
            request.status = transition.status;
            request.reviewer = Some(transition.reviewer);
            request.reviewed_at = Some(transition.reviewed_at);
        }
    }
}

#[async_trait]
impl ProfileStore for InMemoryStore {
    async fn get_profile(&self, id: &ProfileId) -> StoreResult<Profile> {
        self.profiles
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("profile {id}")))
    }

    async fn list_profiles(&self) -> StoreResult<Vec<Profile>> {
        let mut profiles: Vec<_> = self.profiles.read().await.values().cloned().collect();
        profiles.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(profiles)
    }
}

#[async_trait]
impl CustomRoleStore for InMemoryStore {
    async fn get_role(&self, id: &RoleId) -> StoreResult<CustomRole> {
        self.roles
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("role {id}")))
    }

    async fn get_roles(&self, ids: &[RoleId]) -> StoreResult<Vec<CustomRole>> {
        let roles = self.roles.read().await;
        Ok(ids.iter().filter_map(|id| roles.get(id).cloned()).collect())
    }

    async fn list_roles(&self) -> StoreResult<Vec<CustomRole>> {
        let mut roles: Vec<_> = self.roles.read().await.values().cloned().collect();
        roles.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(roles)
    }

    async fn list_active_roles(&self) -> StoreResult<Vec<CustomRole>> {
        let mut roles = self.list_roles().await?;
        roles.retain(|role| role.active);
        Ok(roles)
    }

    async fn count_role_bindings(&self, id: &RoleId) -> StoreResult<usize> {
        Ok(self
            .bindings
            .read()
            .await
            .values()
            .filter(|binding| binding.references_role(id))
            .count())
    }
}

#[async_trait]
impl SettingStore for InMemoryStore {
    async fn get_visibility_matrix(&self, scope: VisibilityScope) -> StoreResult<VisibilityMatrix> {
        Ok(self
            .matrices
            .read()
            .await
            .get(&scope)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl ActorDirectory for InMemoryStore {
    async fn get_binding(&self, actor_id: &ActorId) -> StoreResult<UserAccessBinding> {
        self.bindings
            .read()
            .await
            .get(actor_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("binding {actor_id}")))
    }

    async fn list_bindings(&self) -> StoreResult<Vec<UserAccessBinding>> {
        let mut bindings: Vec<_> = self.bindings.read().await.values().cloned().collect();
        bindings.sort_by(|a, b| a.actor_id.cmp(&b.actor_id));
        Ok(bindings)
    }
}

#[async_trait]
impl ChangeRequestStore for InMemoryStore {
    async fn create_change_request(
        &self,
        request: NewChangeRequest,
    ) -> StoreResult<PermissionChangeRequest> {
        let mut requests = self.requests.write().await;
        let id = requests.next_request_id;
        requests.next_request_id += 1;
        let request = request.into_request(id);
        requests.items.insert(id, request.clone());
        Ok(request)
    }

    async fn get_change_request(&self, id: RequestId) -> StoreResult<PermissionChangeRequest> {
        self.requests
            .read()
            .await
            .items
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("change request {id}")))
    }

    async fn list_change_requests(
        &self,
        status: Option<RequestStatus>,
    ) -> StoreResult<Vec<PermissionChangeRequest>> {
        Ok(self
            .requests
            .read()
            .await
            .items
            .values()
            .filter(|request| status.is_none_or(|status| request.status == status))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AuditSink for InMemoryStore {
    async fn query_audit(&self, filter: &AuditFilter) -> StoreResult<Vec<AuditLogEntry>> {
        Ok(self
            .audit_log
            .read()
            .await
            .items
            .iter()
            .filter(|entry| filter.matches(entry))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AccessLogStore for InMemoryStore {
    async fn record_access_attempt(&self, attempt: AccessAttemptLog) -> StoreResult<()> {
        self.access_log.write().await.record(|_| attempt);
        Ok(())
    }

    async fn list_access_attempts(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<AccessAttemptLog>> {
        Ok(self
            .access_log
            .read()
            .await
            .items
            .iter()
            .filter(|attempt| {
                from.is_none_or(|from| attempt.timestamp >= from)
                    && to.is_none_or(|to| attempt.timestamp <= to)
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl GovernedChangeStore for InMemoryStore {
    async fn commit(&self, change: GovernedChange) -> StoreResult<AuditLogEntry> {
        let mut guards = CommitGuards {
            profiles: self.profiles.write().await,
            roles: self.roles.write().await,
            bindings: self.bindings.write().await,
            matrices: self.matrices.write().await,
            requests: self.requests.write().await,
        };
        let mut audit_log = self.audit_log.write().await;

        if let Some(transition) = &change.transition {
            guards.validate_transition(transition)?;
        }
        if let Some(mutation) = &change.mutation {
            guards.validate_mutation(mutation)?;
        }

        if let Some(mutation) = change.mutation {
            guards.apply_mutation(mutation);
        }
        if let Some(transition) = change.transition {
            guards.apply_transition(transition);
        }
        // Timestamps never run backwards in sequence order.
        let floor = audit_log.items.back().map(|last| last.timestamp);
        let entry = audit_log
            .record(|seq| {
                let mut entry = change.audit.into_entry(seq);
                if let Some(floor) = floor {
                    entry.timestamp = entry.timestamp.max(floor);
                }
                entry
            })
            .clone();
        metrics::counter!("gatehouse_audit_entries_total", "action" => entry.action.as_str())
            .increment(1);
        Ok(entry)
    }
}

#[async_trait]
impl GovernanceStore for InMemoryStore {
    async fn health_check(&self) -> StoreResult<()> {
        // Always healthy while the process runs.
        Ok(())
    }

    /// In-memory store does not persist state and is therefore not durable.
    fn is_durable(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
