//! Change-request workflow: `pending → approved | rejected`.
//!
//! # Key invariants
//! - Submission stores a pending request and writes no audit entry.
//! - Only reviewers with administrative capability may approve or reject.
//! - Transitions out of a terminal state fail with `InvalidStateTransition` and write nothing.
//! - Approval commits the permission delta, one `approved` audit entry, and the status transition
//!   in one store commit; if any part fails the request stays pending.
use super::locks::{EntityGuard, binding_key, profile_key, request_key, role_key};
use super::{GovernanceEngine, GovernanceError, GovernanceResult};
use crate::model::{
    AuditAction, AuditRecord, ChangeTarget, NewChangeRequest, PermissionChangeRequest, RequestId,
    RequestKind, RequestStatus,
};
use crate::store::{GovernedChange, Mutation, RequestTransition, StoreError};
use chrono::Utc;
use gatehouse_authz::{ActorId, CapabilitySet, Dimension, ProfileId, RoleId, WILDCARD};

/// Delta computed against the current target record, with the locks it was read under.
struct PlannedDelta {
    mutation: Mutation,
    field: String,
    old_value: Option<String>,
    new_value: Option<String>,
    invalidate: Vec<String>,
    _guards: Vec<EntityGuard>,
}

/// Apply an add/remove to one dimension; returns the (old, new) audit values.
fn edit_capabilities(
    set: &mut CapabilitySet,
    dimension: Dimension,
    kind: RequestKind,
    value: &str,
) -> GovernanceResult<(Option<String>, Option<String>)> {
    let keys = set.get_mut(dimension);
    if kind.is_removal() {
        if !keys.remove(value) {
            return Err(GovernanceError::ValidationError(format!(
                "{value} is not granted in {dimension}"
            )));
        }
        Ok((Some(value.to_string()), None))
    } else {
        let already = !keys.insert(value.to_string());
        Ok((already.then(|| value.to_string()), Some(value.to_string())))
    }
}

impl GovernanceEngine {
    pub async fn submit_change_request(
        &self,
        requester: &ActorId,
        target: ChangeTarget,
        kind: RequestKind,
        value: &str,
        justification: &str,
    ) -> GovernanceResult<RequestId> {
        let value = value.trim();
        if value.is_empty() {
            return Err(GovernanceError::ValidationError(
                "change request value must not be empty".into(),
            ));
        }
        match (kind, &target) {
            (RequestKind::ChangeRole, ChangeTarget::Actor(_)) => {
                match self.bounded(self.store.get_role(&RoleId::new(value))).await {
                    Ok(_) => {}
                    Err(StoreError::NotFound(_)) => {
                        return Err(GovernanceError::ValidationError(format!(
                            "unknown role {value}"
                        )));
                    }
                    Err(err) => return Err(err.into()),
                }
            }
            (RequestKind::ChangeRole, _) => {
                return Err(GovernanceError::ValidationError(
                    "change_role requests must target an actor".into(),
                ));
            }
            _ if value == WILDCARD => {
                return Err(GovernanceError::ValidationError(
                    "wildcard grants are only set through administrative edits".into(),
                ));
            }
            _ => {}
        }
        self.ensure_target_exists(&target).await?;

        let request = self
            .bounded(self.store.create_change_request(NewChangeRequest {
                requester: requester.clone(),
                target,
                kind,
                value: value.to_string(),
                justification: justification.trim().to_string(),
                created_at: Utc::now(),
            }))
            .await?;
        metrics::counter!("gatehouse_change_requests_total", "op" => "submitted").increment(1);
        tracing::info!(
            request_id = request.id,
            requester = %requester,
            kind = request.kind.as_str(),
            subject = %request.target.subject(),
            "change request submitted"
        );
        Ok(request.id)
    }

    async fn ensure_target_exists(&self, target: &ChangeTarget) -> GovernanceResult<()> {
        match target {
            ChangeTarget::Actor(actor) => {
                self.bounded(self.store.get_binding(actor)).await?;
            }
            ChangeTarget::Profile(id) => {
                self.bounded(self.store.get_profile(id)).await?;
            }
            ChangeTarget::Role(id) => {
                self.bounded(self.store.get_role(id)).await?;
            }
        }
        Ok(())
    }

    pub async fn get_change_request(&self, id: RequestId) -> GovernanceResult<PermissionChangeRequest> {
        Ok(self.bounded(self.store.get_change_request(id)).await?)
    }

    pub async fn list_change_requests(
        &self,
        status: Option<RequestStatus>,
    ) -> GovernanceResult<Vec<PermissionChangeRequest>> {
        Ok(self
            .bounded(self.store.list_change_requests(status))
            .await?)
    }

    async fn pending_request(&self, id: RequestId) -> GovernanceResult<PermissionChangeRequest> {
        let request = self.get_change_request(id).await?;
        if request.status.is_terminal() {
            return Err(GovernanceError::InvalidStateTransition {
                id,
                status: request.status,
            });
        }
        Ok(request)
    }

    pub async fn approve_request(
        &self,
        reviewer: &ActorId,
        id: RequestId,
    ) -> GovernanceResult<PermissionChangeRequest> {
        self.require_admin(reviewer).await?;
        let _request_guard = self.locks.lock(request_key(id)).await;
        let mut request = self.pending_request(id).await?;

        let delta = match self.plan_delta(&request).await {
            Ok(delta) => delta,
            Err(err) => {
                metrics::counter!("gatehouse_change_requests_total", "op" => "approve_failed")
                    .increment(1);
                tracing::warn!(request_id = id, error = %err, "change request delta could not be applied");
                return Err(err);
            }
        };
        let now = Utc::now();
        let change = GovernedChange {
            mutation: Some(delta.mutation),
            transition: Some(RequestTransition {
                request_id: id,
                status: RequestStatus::Approved,
                reviewer: reviewer.clone(),
                reviewed_at: now,
            }),
            audit: AuditRecord {
                actor: reviewer.clone(),
                subject: request.target.subject(),
                action: AuditAction::Approved,
                field: delta.field,
                old_value: delta.old_value,
                new_value: delta.new_value,
                request_id: Some(id),
                timestamp: now,
            },
        };
        if let Err(err) = self.bounded(self.store.commit(change)).await {
            metrics::counter!("gatehouse_change_requests_total", "op" => "approve_failed")
                .increment(1);
            tracing::warn!(request_id = id, error = %err, "approval commit failed; request stays pending");
            return Err(err.into());
        }
        self.cache.invalidate(delta.invalidate);

        request.status = RequestStatus::Approved;
        request.reviewer = Some(reviewer.clone());
        request.reviewed_at = Some(now);
        metrics::counter!("gatehouse_change_requests_total", "op" => "approved").increment(1);
        tracing::info!(request_id = id, reviewer = %reviewer, "change request approved");
        Ok(request)
    }

    pub async fn reject_request(
        &self,
        reviewer: &ActorId,
        id: RequestId,
    ) -> GovernanceResult<PermissionChangeRequest> {
        self.require_admin(reviewer).await?;
        let _request_guard = self.locks.lock(request_key(id)).await;
        let mut request = self.pending_request(id).await?;

        let now = Utc::now();
        self.bounded(self.store.commit(GovernedChange {
            mutation: None,
            transition: Some(RequestTransition {
                request_id: id,
                status: RequestStatus::Rejected,
                reviewer: reviewer.clone(),
                reviewed_at: now,
            }),
            audit: AuditRecord {
                actor: reviewer.clone(),
                subject: request.target.subject(),
                action: AuditAction::Rejected,
                field: "status".to_string(),
                old_value: Some(RequestStatus::Pending.as_str().to_string()),
                new_value: Some(RequestStatus::Rejected.as_str().to_string()),
                request_id: Some(id),
                timestamp: now,
            },
        }))
        .await?;

        request.status = RequestStatus::Rejected;
        request.reviewer = Some(reviewer.clone());
        request.reviewed_at = Some(now);
        metrics::counter!("gatehouse_change_requests_total", "op" => "rejected").increment(1);
        tracing::info!(request_id = id, reviewer = %reviewer, "change request rejected");
        Ok(request)
    }

    async fn plan_delta(&self, request: &PermissionChangeRequest) -> GovernanceResult<PlannedDelta> {
        match (request.kind.dimension(), &request.target) {
            (None, ChangeTarget::Actor(actor)) => self.plan_role_swap(actor, &request.value).await,
            (None, _) => Err(GovernanceError::ValidationError(
                "change_role requests must target an actor".into(),
            )),
            (Some(dimension), ChangeTarget::Profile(id)) => {
                self.plan_profile_edit(id, dimension, request, Vec::new())
                    .await
            }
            (Some(dimension), ChangeTarget::Role(id)) => {
                self.plan_role_edit(id, dimension, request).await
            }
            (Some(dimension), ChangeTarget::Actor(actor)) => {
                let binding_guard = self.locks.lock(binding_key(actor)).await;
                let binding = self.bounded(self.store.get_binding(actor)).await?;
                let profile_id = binding.profile_id.ok_or_else(|| {
                    GovernanceError::ValidationError(format!("{actor} has no bound profile"))
                })?;
                self.plan_profile_edit(&profile_id, dimension, request, vec![binding_guard])
                    .await
            }
        }
    }

    async fn plan_profile_edit(
        &self,
        id: &ProfileId,
        dimension: Dimension,
        request: &PermissionChangeRequest,
        mut guards: Vec<EntityGuard>,
    ) -> GovernanceResult<PlannedDelta> {
        guards.push(self.locks.lock(profile_key(id)).await);
        let current = self.bounded(self.store.get_profile(id)).await?;
        let mut next = current.clone();
        let (old_value, new_value) =
            edit_capabilities(&mut next.custom_permissions, dimension, request.kind, &request.value)?;
        next.version = current.version + 1;
        Ok(PlannedDelta {
            mutation: Mutation::PutProfile {
                profile: next,
                expected_version: Some(current.version),
            },
            field: format!("custom_permissions.{dimension}"),
            old_value,
            new_value,
            invalidate: vec![profile_key(id)],
            _guards: guards,
        })
    }

    async fn plan_role_edit(
        &self,
        id: &RoleId,
        dimension: Dimension,
        request: &PermissionChangeRequest,
    ) -> GovernanceResult<PlannedDelta> {
        let guard = self.locks.lock(role_key(id)).await;
        let current = self.bounded(self.store.get_role(id)).await?;
        let mut next = current.clone();
        let (old_value, new_value) =
            edit_capabilities(&mut next.permissions, dimension, request.kind, &request.value)?;
        next.version = current.version + 1;
        Ok(PlannedDelta {
            mutation: Mutation::PutRole {
                role: next,
                expected_version: Some(current.version),
            },
            field: format!("permissions.{dimension}"),
            old_value,
            new_value,
            invalidate: vec![role_key(id)],
            _guards: vec![guard],
        })
    }

    async fn plan_role_swap(&self, actor: &ActorId, value: &str) -> GovernanceResult<PlannedDelta> {
        let guard = self.locks.lock(binding_key(actor)).await;
        let current = self.bounded(self.store.get_binding(actor)).await?;
        let role_id = RoleId::new(value);
        self.bounded(self.store.get_role(&role_id)).await?;

        let old_value = (!current.role_ids.is_empty()).then(|| {
            current
                .role_ids
                .iter()
                .map(RoleId::as_str)
                .collect::<Vec<_>>()
                .join(",")
        });
        let mut next = current.clone();
        next.role_ids = vec![role_id];
        next.version = current.version + 1;
        Ok(PlannedDelta {
            mutation: Mutation::PutBinding {
                binding: next,
                expected_version: Some(current.version),
            },
            field: "role_ids".to_string(),
            old_value,
            new_value: Some(value.to_string()),
            invalidate: vec![binding_key(actor)],
            _guards: vec![guard],
        })
    }
}
