//! Access reporting, revocation, and audit queries.
use super::locks::binding_key;
use super::{GovernanceEngine, GovernanceResult};
use crate::model::{
    AccessAttemptLog, AccessReport, AccessResource, AuditAction, AuditFilter, AuditLogEntry,
    AuditRecord, DeniedKeyCount,
};
use crate::store::Mutation;
use chrono::{DateTime, Utc};
use gatehouse_authz::{ActorId, UserAccessBinding};
use std::collections::{BTreeSet, HashMap};

/// Fold attempts into counts; `top_n` bounds `top_denied`.
pub fn summarize_attempts(
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    attempts: &[AccessAttemptLog],
    top_n: usize,
) -> AccessReport {
    let mut granted = 0;
    let mut denied = 0;
    let mut actors = BTreeSet::new();
    let mut denied_keys: HashMap<(AccessResource, &str), u64> = HashMap::new();
    for attempt in attempts {
        actors.insert(&attempt.actor);
        if attempt.granted {
            granted += 1;
        } else {
            denied += 1;
            *denied_keys
                .entry((attempt.resource, attempt.key.as_str()))
                .or_default() += 1;
        }
    }
    let mut top_denied: Vec<DeniedKeyCount> = denied_keys
        .into_iter()
        .map(|((resource, key), count)| DeniedKeyCount {
            resource,
            key: key.to_string(),
            count,
        })
        .collect();
    top_denied.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then(a.resource.cmp(&b.resource))
            .then_with(|| a.key.cmp(&b.key))
    });
    top_denied.truncate(top_n);
    AccessReport {
        from,
        to,
        granted,
        denied,
        unique_actors: actors.len() as u64,
        top_denied,
    }
}

impl GovernanceEngine {
    /// Audit entries matching every set predicate, oldest first.
    pub async fn query_audit(&self, filter: &AuditFilter) -> GovernanceResult<Vec<AuditLogEntry>> {
        Ok(self.bounded(self.store.query_audit(filter)).await?)
    }

    pub async fn access_report(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> GovernanceResult<AccessReport> {
        let attempts = self
            .bounded(self.store.list_access_attempts(from, to))
            .await?;
        Ok(summarize_attempts(
            from,
            to,
            &attempts,
            self.settings.report_top_n,
        ))
    }

    /// Clear `actor_id`'s role bindings, and its profile when `include_profile` is set.
    ///
    /// The admin flag and role label are left as they are.
    pub async fn revoke_actor(
        &self,
        reviewer: &ActorId,
        actor_id: &ActorId,
        include_profile: bool,
    ) -> GovernanceResult<UserAccessBinding> {
        self.require_admin(reviewer).await?;
        let _guard = self.locks.lock(binding_key(actor_id)).await;
        let current = self.bounded(self.store.get_binding(actor_id)).await?;

        let mut next = current.clone();
        next.role_ids.clear();
        if include_profile {
            next.profile_id = None;
        }
        next.version = current.version + 1;
        let audit = AuditRecord {
            actor: reviewer.clone(),
            subject: format!("actor:{actor_id}"),
            action: AuditAction::Revoked,
            field: if include_profile {
                "role_ids,profile_id".to_string()
            } else {
                "role_ids".to_string()
            },
            old_value: Some(describe_sources(&current)),
            new_value: Some(describe_sources(&next)),
            request_id: None,
            timestamp: Utc::now(),
        };
        self.commit_edit(
            Mutation::PutBinding {
                binding: next.clone(),
                expected_version: Some(current.version),
            },
            audit,
            vec![binding_key(actor_id)],
        )
        .await?;
        tracing::info!(actor = %actor_id, reviewer = %reviewer, include_profile, "actor access revoked");
        Ok(next)
    }
}

/// `profile=<id|none>;roles=<a,b>` summary used for revocation audit values.
fn describe_sources(binding: &UserAccessBinding) -> String {
    let profile = binding
        .profile_id
        .as_ref()
        .map_or("none", |profile_id| profile_id.as_str());
    let roles: Vec<&str> = binding.role_ids.iter().map(|id| id.as_str()).collect();
    format!("profile={profile};roles={}", roles.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatehouse_authz::{DenialReason, ProfileId, RoleId};
    use std::collections::BTreeMap;

    fn attempt(actor: &str, key: &str, granted: bool) -> AccessAttemptLog {
        AccessAttemptLog {
            actor: ActorId::new(actor),
            resource: AccessResource::Page,
            key: key.to_string(),
            granted,
            denial_reason: (!granted).then_some(DenialReason::NotGranted),
            timestamp: Utc::now(),
            metadata: BTreeMap::new(),
        }
    }

    #[test]
    fn summary_counts_and_ranks_denials() {
        let attempts = vec![
            attempt("alice", "Dashboard", true),
            attempt("alice", "Billing", false),
            attempt("bob", "Billing", false),
            attempt("bob", "Audit", false),
            attempt("carol", "Dashboard", true),
        ];
        let report = summarize_attempts(None, None, &attempts, 1);
        assert_eq!(report.granted, 2);
        assert_eq!(report.denied, 3);
        assert_eq!(report.unique_actors, 3);
        assert_eq!(report.top_denied.len(), 1);
        assert_eq!(report.top_denied[0].key, "Billing");
        assert_eq!(report.top_denied[0].count, 2);
    }

    #[test]
    fn empty_window_yields_zero_counts() {
        let report = summarize_attempts(None, None, &[], 10);
        assert_eq!(report.granted + report.denied + report.unique_actors, 0);
        assert!(report.top_denied.is_empty());
    }

    #[test]
    fn source_summary_lists_profile_and_roles() {
        let binding = UserAccessBinding::new(ActorId::new("alice"))
            .with_profile(ProfileId::new("staff"))
            .with_role(RoleId::new("ops"))
            .with_role(RoleId::new("leads"));
        assert_eq!(describe_sources(&binding), "profile=staff;roles=ops,leads");
        assert_eq!(
            describe_sources(&UserAccessBinding::new(ActorId::new("bob"))),
            "profile=none;roles="
        );
    }
}
