//! Access decisions for one actor, backed by the store and the capability cache.
//!
//! Each check loads the actor's binding, then the bound profile and every bound role in one
//! batched pass, aggregates them, and evaluates the pure resolver. Anything that goes wrong while
//! loading denies.
use super::{GovernanceEngine, GovernanceError, GovernanceResult};
use crate::model::{AccessAttemptLog, AccessResource};
use crate::store::StoreError;
use chrono::Utc;
use gatehouse_authz::{
    AccessLevel, ActorId, AggregatedCapabilitySet, Decision, DenialReason, UserAccessBinding,
    VisibilityMatrix, VisibilityScope, aggregate, can_access_module, has_admin_capability,
    module_decision, page_decision, sidebar_section_decision, widget_decision,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Caller context recorded with access attempts (user agent, forwarded address, ...).
pub type AttemptMetadata = BTreeMap<String, String>;

impl GovernanceEngine {
    /// Aggregated capabilities for `actor`, served from cache when fresh.
    ///
    /// # Errors
    /// Returns the denial reason every check for this actor should carry when the capabilities
    /// cannot be determined: `UnknownActor` without a binding, `StoreUnavailable` on store failure.
    pub async fn effective_capabilities(
        &self,
        actor: &ActorId,
    ) -> Result<Arc<AggregatedCapabilitySet>, DenialReason> {
        if let Some(set) = self.cache.get_capabilities(actor) {
            return Ok(set);
        }
        let generation = self.cache.generation();

        let binding = match self.bounded(self.store.get_binding(actor)).await {
            Ok(binding) => binding,
            Err(StoreError::NotFound(_)) => return Err(DenialReason::UnknownActor),
            Err(err) => {
                tracing::warn!(actor = %actor, error = %err, "binding lookup failed; denying");
                return Err(DenialReason::StoreUnavailable);
            }
        };

        let profile_lookup = async {
            match &binding.profile_id {
                None => Ok(None),
                Some(profile_id) => match self.bounded(self.store.get_profile(profile_id)).await {
                    Ok(profile) => Ok(Some(profile)),
                    // A dangling profile reference contributes nothing.
                    Err(StoreError::NotFound(_)) => Ok(None),
                    Err(err) => Err(err),
                },
            }
        };
        let roles_lookup = self.bounded(self.store.get_roles(&binding.role_ids));
        let (profile, roles) = match tokio::join!(profile_lookup, roles_lookup) {
            (Ok(profile), Ok(roles)) => (profile, roles),
            (Err(err), _) | (_, Err(err)) => {
                tracing::warn!(actor = %actor, error = %err, "capability sources unavailable; denying");
                return Err(DenialReason::StoreUnavailable);
            }
        };

        let set = Arc::new(aggregate(&binding, profile.as_ref(), &roles));
        self.cache
            .insert_capabilities(&binding, set.clone(), generation);
        Ok(set)
    }

    async fn visibility_matrix(
        &self,
        scope: VisibilityScope,
    ) -> Result<Arc<VisibilityMatrix>, DenialReason> {
        if let Some(matrix) = self.cache.get_matrix(scope) {
            return Ok(matrix);
        }
        let generation = self.cache.generation();
        match self.bounded(self.store.get_visibility_matrix(scope)).await {
            Ok(matrix) => {
                let matrix = Arc::new(matrix);
                self.cache.insert_matrix(scope, matrix.clone(), generation);
                Ok(matrix)
            }
            Err(err) => {
                tracing::warn!(scope = %scope, error = %err, "visibility matrix unavailable; denying");
                Err(DenialReason::StoreUnavailable)
            }
        }
    }

    /// Capabilities for evaluation, plus the reason that overrides any denial when the actor's
    /// sources could not be loaded. The fallback set is empty, so only public checks pass.
    async fn evaluation_set(
        &self,
        actor: &ActorId,
    ) -> (Arc<AggregatedCapabilitySet>, Option<DenialReason>) {
        match self.effective_capabilities(actor).await {
            Ok(set) => (set, None),
            Err(reason) => (
                Arc::new(AggregatedCapabilitySet::empty(&UserAccessBinding::new(
                    actor.clone(),
                ))),
                Some(reason),
            ),
        }
    }

    pub async fn check_page(&self, actor: &ActorId, page: &str, metadata: AttemptMetadata) -> Decision {
        let (set, failure) = self.evaluation_set(actor).await;
        let decision = override_denial(page_decision(&set, page), failure);
        self.record_attempt(actor, AccessResource::Page, page, decision, metadata)
            .await;
        decision
    }

    pub async fn can_access_page(&self, actor: &ActorId, page: &str) -> bool {
        self.check_page(actor, page, AttemptMetadata::new())
            .await
            .is_granted()
    }

    pub async fn check_module(
        &self,
        actor: &ActorId,
        module: &str,
        metadata: AttemptMetadata,
    ) -> AccessLevel {
        let (set, failure) = self.evaluation_set(actor).await;
        let level = can_access_module(&set, module);
        let decision = override_denial(module_decision(&set, module, AccessLevel::Read), failure);
        self.record_attempt(actor, AccessResource::Module, module, decision, metadata)
            .await;
        level
    }

    pub async fn can_access_module(&self, actor: &ActorId, module: &str) -> AccessLevel {
        self.check_module(actor, module, AttemptMetadata::new()).await
    }

    pub async fn check_sidebar_section(
        &self,
        actor: &ActorId,
        section: &str,
        metadata: AttemptMetadata,
    ) -> Decision {
        let decision = self
            .gated_decision(actor, section, sidebar_section_decision)
            .await;
        self.record_attempt(actor, AccessResource::SidebarSection, section, decision, metadata)
            .await;
        decision
    }

    pub async fn can_see_sidebar_section(&self, actor: &ActorId, section: &str) -> bool {
        self.check_sidebar_section(actor, section, AttemptMetadata::new())
            .await
            .is_granted()
    }

    pub async fn check_widget(
        &self,
        actor: &ActorId,
        widget: &str,
        metadata: AttemptMetadata,
    ) -> Decision {
        let decision = self.gated_decision(actor, widget, widget_decision).await;
        self.record_attempt(actor, AccessResource::Widget, widget, decision, metadata)
            .await;
        decision
    }

    pub async fn can_see_widget(&self, actor: &ActorId, widget: &str) -> bool {
        self.check_widget(actor, widget, AttemptMetadata::new())
            .await
            .is_granted()
    }

    async fn gated_decision(
        &self,
        actor: &ActorId,
        key: &str,
        decide: fn(&AggregatedCapabilitySet, &VisibilityMatrix, &str) -> Decision,
    ) -> Decision {
        let set = match self.effective_capabilities(actor).await {
            Ok(set) => set,
            Err(reason) => return Decision::Denied(reason),
        };
        if set.is_admin {
            return Decision::Granted;
        }
        match self.visibility_matrix(VisibilityScope::for_kind(set.kind)).await {
            Ok(matrix) => decide(&set, &matrix, key),
            Err(reason) => Decision::Denied(reason),
        }
    }

    async fn record_attempt(
        &self,
        actor: &ActorId,
        resource: AccessResource,
        key: &str,
        decision: Decision,
        metadata: AttemptMetadata,
    ) {
        let outcome = if decision.is_granted() { "granted" } else { "denied" };
        metrics::counter!(
            "gatehouse_access_decisions_total",
            "resource" => resource.as_str(),
            "outcome" => outcome
        )
        .increment(1);

        if decision.is_granted() && !self.settings.log_granted_attempts {
            return;
        }
        if let Some(reason) = decision.denial_reason() {
            tracing::info!(actor = %actor, %resource, key, %reason, "access denied");
        }
        let attempt = AccessAttemptLog {
            actor: actor.clone(),
            resource,
            key: key.to_string(),
            granted: decision.is_granted(),
            denial_reason: decision.denial_reason(),
            timestamp: Utc::now(),
            metadata,
        };
        if let Err(err) = self.bounded(self.store.record_access_attempt(attempt)).await {
            tracing::warn!(actor = %actor, error = %err, "failed to record access attempt");
        }
    }

    /// Fails unless `actor` holds administrative capability.
    pub async fn require_admin(&self, actor: &ActorId) -> GovernanceResult<()> {
        let set = self.capabilities_or_error(actor).await?;
        if has_admin_capability(&set) {
            Ok(())
        } else {
            Err(GovernanceError::Unauthorized(format!(
                "{actor} lacks administrative capability"
            )))
        }
    }

    /// Fails unless `actor`'s level on `module` satisfies `required`.
    pub async fn require_module_level(
        &self,
        actor: &ActorId,
        module: &str,
        required: AccessLevel,
    ) -> GovernanceResult<()> {
        let set = self.capabilities_or_error(actor).await?;
        if module_decision(&set, module, required).is_granted() {
            Ok(())
        } else {
            Err(GovernanceError::Unauthorized(format!(
                "{actor} needs {required} on {module}"
            )))
        }
    }

    async fn capabilities_or_error(
        &self,
        actor: &ActorId,
    ) -> GovernanceResult<Arc<AggregatedCapabilitySet>> {
        self.effective_capabilities(actor)
            .await
            .map_err(|reason| match reason {
                DenialReason::StoreUnavailable => GovernanceError::StoreUnavailable(format!(
                    "capabilities for {actor} could not be loaded"
                )),
                _ => GovernanceError::Unauthorized(format!("{actor} has no access binding")),
            })
    }
}

fn override_denial(decision: Decision, failure: Option<DenialReason>) -> Decision {
    match (decision, failure) {
        (Decision::Denied(_), Some(reason)) => Decision::Denied(reason),
        (decision, _) => decision,
    }
}
