//! Administrative edits to permission sources.
//!
//! Every edit requires administrative capability, runs under the edited entity's lock, records the
//! JSON-rendered old and new record in exactly one audit entry, and invalidates the cache entries
//! derived from the entity.
use super::locks::{binding_key, matrix_key, profile_key, role_key};
use super::{GovernanceEngine, GovernanceError, GovernanceResult, SYSTEM_ACTOR};
use crate::model::{AuditAction, AuditRecord};
use crate::store::{GovernedChange, Mutation, StoreError};
use chrono::Utc;
use gatehouse_authz::{
    AccessLevel, ActorId, CustomRole, PERMISSIONS_MODULE, Profile, ProfileId, RoleId,
    UserAccessBinding, VisibilityMatrix, VisibilityScope,
};
use serde::Serialize;
use std::collections::BTreeSet;

fn render<T: Serialize>(value: &T) -> GovernanceResult<String> {
    serde_json::to_string(value)
        .map_err(|err| GovernanceError::ValidationError(format!("unrenderable record: {err}")))
}

impl GovernanceEngine {
    /// Commit one mutation with its audit entry, then drop dependent cache entries.
    pub(super) async fn commit_edit(
        &self,
        mutation: Mutation,
        audit: AuditRecord,
        invalidate: Vec<String>,
    ) -> GovernanceResult<()> {
        let action = audit.action;
        let subject = audit.subject.clone();
        self.bounded(self.store.commit(GovernedChange {
            mutation: Some(mutation),
            transition: None,
            audit,
        }))
        .await?;
        self.cache.invalidate(invalidate);
        tracing::info!(action = action.as_str(), subject = %subject, "permission source updated");
        Ok(())
    }

    async fn find_profile(&self, id: &ProfileId) -> GovernanceResult<Option<Profile>> {
        match self.bounded(self.store.get_profile(id)).await {
            Ok(profile) => Ok(Some(profile)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn find_role(&self, id: &RoleId) -> GovernanceResult<Option<CustomRole>> {
        match self.bounded(self.store.get_role(id)).await {
            Ok(role) => Ok(Some(role)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn find_binding(&self, actor: &ActorId) -> GovernanceResult<Option<UserAccessBinding>> {
        match self.bounded(self.store.get_binding(actor)).await {
            Ok(binding) => Ok(Some(binding)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn list_profiles(&self, actor: &ActorId) -> GovernanceResult<Vec<Profile>> {
        self.require_module_level(actor, PERMISSIONS_MODULE, AccessLevel::Read)
            .await?;
        Ok(self.bounded(self.store.list_profiles()).await?)
    }

    /// Create (`expect_existing = false`) or replace (`true`) a profile.
    async fn put_profile(
        &self,
        actor: &ActorId,
        mut profile: Profile,
        expect_existing: bool,
    ) -> GovernanceResult<Profile> {
        self.require_admin(actor).await?;
        profile.validate()?;
        let _guard = self.locks.lock(profile_key(&profile.id)).await;
        let current = self.find_profile(&profile.id).await?;
        let (action, expected_version) = match (&current, expect_existing) {
            (None, false) => (AuditAction::ProfileCreated, None),
            (Some(existing), true) => (AuditAction::ProfileUpdated, Some(existing.version)),
            (Some(_), false) => {
                return Err(GovernanceError::Conflict(format!(
                    "profile {} already exists",
                    profile.id
                )));
            }
            (None, true) => {
                return Err(GovernanceError::NotFound(format!("profile {}", profile.id)));
            }
        };
        profile.version = expected_version.map_or(1, |v| v + 1);
        let audit = AuditRecord {
            actor: actor.clone(),
            subject: format!("profile:{}", profile.id),
            action,
            field: "profile".to_string(),
            old_value: current.as_ref().map(render).transpose()?,
            new_value: Some(render(&profile)?),
            request_id: None,
            timestamp: Utc::now(),
        };
        self.commit_edit(
            Mutation::PutProfile {
                profile: profile.clone(),
                expected_version,
            },
            audit,
            vec![profile_key(&profile.id)],
        )
        .await?;
        Ok(profile)
    }

    pub async fn create_profile(&self, actor: &ActorId, profile: Profile) -> GovernanceResult<Profile> {
        self.put_profile(actor, profile, false).await
    }

    pub async fn update_profile(&self, actor: &ActorId, profile: Profile) -> GovernanceResult<Profile> {
        self.put_profile(actor, profile, true).await
    }

    /// Bindings that still reference the profile keep the dangling id and contribute nothing.
    pub async fn delete_profile(&self, actor: &ActorId, id: &ProfileId) -> GovernanceResult<()> {
        self.require_admin(actor).await?;
        let _guard = self.locks.lock(profile_key(id)).await;
        let current = self.bounded(self.store.get_profile(id)).await?;
        let audit = AuditRecord {
            actor: actor.clone(),
            subject: format!("profile:{id}"),
            action: AuditAction::ProfileDeleted,
            field: "profile".to_string(),
            old_value: Some(render(&current)?),
            new_value: None,
            request_id: None,
            timestamp: Utc::now(),
        };
        self.commit_edit(
            Mutation::DeleteProfile {
                id: id.clone(),
                expected_version: current.version,
            },
            audit,
            vec![profile_key(id)],
        )
        .await
    }

    pub async fn list_roles(&self, actor: &ActorId) -> GovernanceResult<Vec<CustomRole>> {
        self.require_module_level(actor, PERMISSIONS_MODULE, AccessLevel::Read)
            .await?;
        Ok(self.bounded(self.store.list_roles()).await?)
    }

    async fn put_role(
        &self,
        actor: &ActorId,
        mut role: CustomRole,
        expect_existing: bool,
    ) -> GovernanceResult<CustomRole> {
        self.require_admin(actor).await?;
        role.validate()?;
        let _guard = self.locks.lock(role_key(&role.id)).await;
        let current = self.find_role(&role.id).await?;
        let (action, expected_version) = match (&current, expect_existing) {
            (None, false) => (AuditAction::RoleCreated, None),
            (Some(existing), true) => (AuditAction::RoleUpdated, Some(existing.version)),
            (Some(_), false) => {
                return Err(GovernanceError::Conflict(format!(
                    "role {} already exists",
                    role.id
                )));
            }
            (None, true) => return Err(GovernanceError::NotFound(format!("role {}", role.id))),
        };
        role.version = expected_version.map_or(1, |v| v + 1);
        let audit = AuditRecord {
            actor: actor.clone(),
            subject: format!("role:{}", role.id),
            action,
            field: "role".to_string(),
            old_value: current.as_ref().map(render).transpose()?,
            new_value: Some(render(&role)?),
            request_id: None,
            timestamp: Utc::now(),
        };
        self.commit_edit(
            Mutation::PutRole {
                role: role.clone(),
                expected_version,
            },
            audit,
            vec![role_key(&role.id)],
        )
        .await?;
        Ok(role)
    }

    pub async fn create_role(&self, actor: &ActorId, role: CustomRole) -> GovernanceResult<CustomRole> {
        self.put_role(actor, role, false).await
    }

    pub async fn update_role(&self, actor: &ActorId, role: CustomRole) -> GovernanceResult<CustomRole> {
        self.put_role(actor, role, true).await
    }

    /// Fails with `Conflict` while any actor is bound to the role.
    pub async fn delete_role(&self, actor: &ActorId, id: &RoleId) -> GovernanceResult<()> {
        self.require_admin(actor).await?;
        let _guard = self.locks.lock(role_key(id)).await;
        let current = self.bounded(self.store.get_role(id)).await?;
        let bound = self.bounded(self.store.count_role_bindings(id)).await?;
        if bound > 0 {
            return Err(GovernanceError::Conflict(format!(
                "role {id} is bound to {bound} actor(s)"
            )));
        }
        let audit = AuditRecord {
            actor: actor.clone(),
            subject: format!("role:{id}"),
            action: AuditAction::RoleDeleted,
            field: "role".to_string(),
            old_value: Some(render(&current)?),
            new_value: None,
            request_id: None,
            timestamp: Utc::now(),
        };
        self.commit_edit(
            Mutation::DeleteRole {
                id: id.clone(),
                expected_version: current.version,
            },
            audit,
            vec![role_key(id)],
        )
        .await
    }

    pub async fn list_bindings(&self, actor: &ActorId) -> GovernanceResult<Vec<UserAccessBinding>> {
        self.require_module_level(actor, PERMISSIONS_MODULE, AccessLevel::Read)
            .await?;
        Ok(self.bounded(self.store.list_bindings()).await?)
    }

    /// Create or replace an actor's binding. Referenced profile and roles must exist.
    pub async fn put_binding(
        &self,
        actor: &ActorId,
        mut binding: UserAccessBinding,
    ) -> GovernanceResult<UserAccessBinding> {
        self.require_admin(actor).await?;
        if binding.role_label.trim().is_empty() {
            return Err(GovernanceError::ValidationError(
                "role label must not be empty".into(),
            ));
        }
        if let Some(profile_id) = &binding.profile_id {
            if self.find_profile(profile_id).await?.is_none() {
                return Err(GovernanceError::ValidationError(format!(
                    "unknown profile {profile_id}"
                )));
            }
        }
        let mut seen = BTreeSet::new();
        binding.role_ids.retain(|id| seen.insert(id.clone()));
        let known = self.bounded(self.store.get_roles(&binding.role_ids)).await?;
        if let Some(missing) = binding
            .role_ids
            .iter()
            .find(|id| !known.iter().any(|role| &role.id == *id))
        {
            return Err(GovernanceError::ValidationError(format!("unknown role {missing}")));
        }

        let _guard = self.locks.lock(binding_key(&binding.actor_id)).await;
        let current = self.find_binding(&binding.actor_id).await?;
        let expected_version = current.as_ref().map(|b| b.version);
        binding.version = expected_version.map_or(1, |v| v + 1);
        let audit = AuditRecord {
            actor: actor.clone(),
            subject: format!("actor:{}", binding.actor_id),
            action: AuditAction::BindingUpdated,
            field: "binding".to_string(),
            old_value: current.as_ref().map(render).transpose()?,
            new_value: Some(render(&binding)?),
            request_id: None,
            timestamp: Utc::now(),
        };
        self.commit_edit(
            Mutation::PutBinding {
                binding: binding.clone(),
                expected_version,
            },
            audit,
            vec![binding_key(&binding.actor_id)],
        )
        .await?;
        Ok(binding)
    }

    pub async fn get_visibility_matrix(
        &self,
        actor: &ActorId,
        scope: VisibilityScope,
    ) -> GovernanceResult<VisibilityMatrix> {
        self.require_module_level(actor, PERMISSIONS_MODULE, AccessLevel::Read)
            .await?;
        Ok(self.bounded(self.store.get_visibility_matrix(scope)).await?)
    }

    /// Replace the whole matrix for `scope`.
    pub async fn put_visibility_matrix(
        &self,
        actor: &ActorId,
        scope: VisibilityScope,
        mut matrix: VisibilityMatrix,
    ) -> GovernanceResult<VisibilityMatrix> {
        self.require_admin(actor).await?;
        let _guard = self.locks.lock(matrix_key(scope)).await;
        let current = self
            .bounded(self.store.get_visibility_matrix(scope))
            .await?;
        matrix.version = current.version + 1;
        let audit = AuditRecord {
            actor: actor.clone(),
            subject: format!("matrix:{scope}"),
            action: AuditAction::MatrixUpdated,
            field: scope.setting_key().to_string(),
            old_value: Some(render(&current.rows)?),
            new_value: Some(render(&matrix.rows)?),
            request_id: None,
            timestamp: Utc::now(),
        };
        self.commit_edit(
            Mutation::PutMatrix {
                scope,
                matrix: matrix.clone(),
                expected_version: current.version,
            },
            audit,
            vec![matrix_key(scope)],
        )
        .await?;
        Ok(matrix)
    }

    /// Ensure `actor_id` holds an admin binding. Returns `false` when it already did.
    ///
    /// Runs without a capability guard; it is only called at startup.
    pub async fn bootstrap_admin(&self, actor_id: &ActorId) -> GovernanceResult<bool> {
        let _guard = self.locks.lock(binding_key(actor_id)).await;
        let current = self.find_binding(actor_id).await?;
        if current.as_ref().is_some_and(|binding| binding.is_admin) {
            return Ok(false);
        }
        let expected_version = current.as_ref().map(|b| b.version);
        let mut binding = current
            .clone()
            .unwrap_or_else(|| UserAccessBinding::new(actor_id.clone()))
            .admin();
        binding.version = expected_version.map_or(1, |v| v + 1);
        let audit = AuditRecord {
            actor: ActorId::new(SYSTEM_ACTOR),
            subject: format!("actor:{actor_id}"),
            action: AuditAction::BindingUpdated,
            field: "binding".to_string(),
            old_value: current.as_ref().map(render).transpose()?,
            new_value: Some(render(&binding)?),
            request_id: None,
            timestamp: Utc::now(),
        };
        self.commit_edit(
            Mutation::PutBinding {
                binding,
                expected_version,
            },
            audit,
            vec![binding_key(actor_id)],
        )
        .await?;
        tracing::info!(actor = %actor_id, "bootstrap admin binding seeded");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::governance::EngineSettings;
    use crate::model::AuditFilter;
    use crate::store::AuditSink;
    use crate::store::memory::InMemoryStore;
    use gatehouse_authz::{CapabilitySet, ProfileKind};
    use std::sync::Arc;

    async fn engine() -> (GovernanceEngine, Arc<InMemoryStore>, ActorId) {
        let store = Arc::new(InMemoryStore::default());
        let engine = GovernanceEngine::new(store.clone(), EngineSettings::default());
        let root = ActorId::new("root");
        assert!(engine.bootstrap_admin(&root).await.expect("bootstrap"));
        (engine, store, root)
    }

    #[tokio::test]
    async fn bootstrap_is_idempotent() {
        let (engine, store, root) = engine().await;
        assert!(!engine.bootstrap_admin(&root).await.expect("again"));
        let entries = store.query_audit(&AuditFilter::default()).await.expect("audit");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].actor, ActorId::new(SYSTEM_ACTOR));
    }

    #[tokio::test]
    async fn profile_update_records_old_and_new_json() {
        let (engine, store, root) = engine().await;
        let profile = Profile::new(ProfileId::new("staff"), "Staff", ProfileKind::Internal)
            .with_permissions(CapabilitySet::with_pages(["Dashboard"]));
        let created = engine.create_profile(&root, profile).await.expect("create");
        assert_eq!(created.version, 1);

        let mut edited = created.clone();
        edited.name = "Staff members".to_string();
        let updated = engine.update_profile(&root, edited).await.expect("update");
        assert_eq!(updated.version, 2);

        let entries = store
            .query_audit(&AuditFilter {
                subject: Some("profile:staff".to_string()),
                ..AuditFilter::default()
            })
            .await
            .expect("audit");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].action, AuditAction::ProfileUpdated);
        let old: Profile =
            serde_json::from_str(entries[1].old_value.as_deref().expect("old")).expect("old json");
        let new: Profile =
            serde_json::from_str(entries[1].new_value.as_deref().expect("new")).expect("new json");
        assert_eq!(old.name, "Staff");
        assert_eq!(new.name, "Staff members");
        assert_eq!(new.version, 2);
    }

    #[tokio::test]
    async fn duplicate_create_and_missing_update_are_rejected() {
        let (engine, _, root) = engine().await;
        let role = CustomRole::new(RoleId::new("ops"), "Ops");
        engine.create_role(&root, role.clone()).await.expect("create");
        assert!(matches!(
            engine.create_role(&root, role).await,
            Err(GovernanceError::Conflict(_))
        ));
        assert!(matches!(
            engine
                .update_role(&root, CustomRole::new(RoleId::new("ghost"), "Ghost"))
                .await,
            Err(GovernanceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn unknown_system_role_is_a_validation_error() {
        let (engine, _, root) = engine().await;
        let mut role = CustomRole::new(RoleId::new("odd"), "Odd");
        role.system_roles.push("superuser".to_string());
        assert!(matches!(
            engine.create_role(&root, role).await,
            Err(GovernanceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn binding_must_reference_existing_sources() {
        let (engine, _, root) = engine().await;
        let binding = UserAccessBinding::new(ActorId::new("alice")).with_role(RoleId::new("nope"));
        assert!(matches!(
            engine.put_binding(&root, binding).await,
            Err(GovernanceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn non_admin_cannot_edit() {
        let (engine, _, root) = engine().await;
        engine
            .put_binding(&root, UserAccessBinding::new(ActorId::new("alice")))
            .await
            .expect("binding");
        let err = engine
            .create_role(&ActorId::new("alice"), CustomRole::new(RoleId::new("ops"), "Ops"))
            .await
            .expect_err("guarded");
        assert!(matches!(err, GovernanceError::Unauthorized(_)));
    }
}
