mod common;

use common::{ADMIN, ALICE, BOB, PARTNER, governed_audit, world, world_with};
use gatehouse_authz::{
    AccessLevel, ActorId, Decision, DenialReason, ProfileId, RoleId, UserAccessBinding,
    VisibilityMatrix, VisibilityScope,
};
use gatehouse_controlplane::governance::{
    AttemptMetadata, EngineSettings, GovernanceError,
};
use gatehouse_controlplane::model::{AuditAction, ChangeTarget, RequestKind, RequestStatus};
use gatehouse_controlplane::store::{ActorDirectory, CustomRoleStore, ProfileStore};

fn actor(id: &str) -> ActorId {
    ActorId::new(id)
}

#[tokio::test]
async fn profile_and_role_pages_union() {
    let (engine, _) = world().await;
    let alice = actor(ALICE);
    assert!(engine.can_access_page(&alice, "Dashboard").await);
    assert!(engine.can_access_page(&alice, "Tasks").await);
    assert!(!engine.can_access_page(&alice, "Billing").await);

    let bob = actor(BOB);
    assert!(engine.can_access_page(&bob, "Dashboard").await);
    assert!(!engine.can_access_page(&bob, "Tasks").await);
}

#[tokio::test]
async fn module_levels_take_the_highest_source() {
    let (engine, _) = world().await;
    assert_eq!(
        engine.can_access_module(&actor(ALICE), "tasks").await,
        AccessLevel::Write
    );
    assert_eq!(
        engine.can_access_module(&actor(BOB), "tasks").await,
        AccessLevel::Read
    );
    assert_eq!(
        engine.can_access_module(&actor(BOB), "billing").await,
        AccessLevel::Blocked
    );
}

#[tokio::test]
async fn admin_binding_grants_everything() {
    let (engine, _) = world().await;
    let root = actor(ADMIN);
    for page in ["Dashboard", "Billing", "AnythingAtAll"] {
        assert!(engine.can_access_page(&root, page).await);
    }
    assert_eq!(engine.can_access_module(&root, "billing").await, AccessLevel::Admin);
    assert!(engine.can_see_sidebar_section(&root, "billing").await);
    assert!(engine.can_see_widget(&root, "anything").await);
}

#[tokio::test]
async fn wildcard_role_grants_every_page() {
    let (engine, _) = world().await;
    let root = actor(ADMIN);
    let binding = UserAccessBinding::new(actor(BOB))
        .with_profile(ProfileId::new("staff"))
        .with_role(RoleId::new("everything"));
    engine.put_binding(&root, binding).await.expect("bind");

    assert!(engine.can_access_page(&actor(BOB), "AnythingAtAll").await);
}

#[tokio::test]
async fn unknown_actor_is_denied_with_reason() {
    let (engine, _) = world().await;
    let ghost = actor("ghost");
    assert_eq!(
        engine
            .check_page(&ghost, "Dashboard", AttemptMetadata::new())
            .await,
        Decision::Denied(DenialReason::UnknownActor)
    );
    assert_eq!(
        engine
            .check_widget(&ghost, "news", AttemptMetadata::new())
            .await,
        Decision::Denied(DenialReason::UnknownActor)
    );
}

#[tokio::test]
async fn rejected_role_change_leaves_binding_untouched() {
    let (engine, store) = world().await;
    let root = actor(ADMIN);
    let id = engine
        .submit_change_request(
            &actor(BOB),
            ChangeTarget::Actor(actor(BOB)),
            RequestKind::ChangeRole,
            "tasks",
            "need the task board",
        )
        .await
        .expect("submit");

    let rejected = engine.reject_request(&root, id).await.expect("reject");
    assert_eq!(rejected.status, RequestStatus::Rejected);
    assert_eq!(rejected.reviewer, Some(root.clone()));
    assert_eq!(
        engine.get_change_request(id).await.expect("get").status,
        RequestStatus::Rejected
    );

    let audit = governed_audit(&engine).await;
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].action, AuditAction::Rejected);
    assert_eq!(audit[0].request_id, Some(id));
    assert_eq!(audit[0].subject, format!("actor:{BOB}"));

    let binding = store.get_binding(&actor(BOB)).await.expect("binding");
    assert!(binding.role_ids.is_empty());
    assert_eq!(binding.version, 1);
}

#[tokio::test]
async fn approved_page_request_extends_the_actor() {
    let (engine, _) = world().await;
    let alice = actor(ALICE);
    assert!(!engine.can_access_page(&alice, "Reports").await);

    let id = engine
        .submit_change_request(
            &alice,
            ChangeTarget::Actor(alice.clone()),
            RequestKind::AddPage,
            "Reports",
            "quarterly numbers",
        )
        .await
        .expect("submit");
    assert!(governed_audit(&engine).await.is_empty());

    let approved = engine
        .approve_request(&actor(ADMIN), id)
        .await
        .expect("approve");
    assert_eq!(approved.status, RequestStatus::Approved);

    let set = engine.effective_capabilities(&alice).await.expect("caps");
    assert!(set.pages.contains("Reports"));
    assert!(engine.can_access_page(&alice, "Reports").await);

    let audit = governed_audit(&engine).await;
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].action, AuditAction::Approved);
    assert_eq!(audit[0].old_value, None);
    assert_eq!(audit[0].new_value.as_deref(), Some("Reports"));
    assert_eq!(audit[0].field, "custom_permissions.pages");
}

#[tokio::test]
async fn approved_role_change_replaces_role_bindings() {
    let (engine, store) = world().await;
    let id = engine
        .submit_change_request(
            &actor(ALICE),
            ChangeTarget::Actor(actor(ALICE)),
            RequestKind::ChangeRole,
            "everything",
            "",
        )
        .await
        .expect("submit");
    engine
        .approve_request(&actor(ADMIN), id)
        .await
        .expect("approve");

    let binding = store.get_binding(&actor(ALICE)).await.expect("binding");
    assert_eq!(binding.role_ids, vec![RoleId::new("everything")]);
    let audit = governed_audit(&engine).await;
    assert_eq!(audit[0].field, "role_ids");
    assert_eq!(audit[0].old_value.as_deref(), Some("tasks"));
    assert_eq!(audit[0].new_value.as_deref(), Some("everything"));
}

#[tokio::test]
async fn reviewed_requests_are_terminal() {
    let (engine, _) = world().await;
    let root = actor(ADMIN);
    let approved = engine
        .submit_change_request(
            &actor(BOB),
            ChangeTarget::Profile(ProfileId::new("staff")),
            RequestKind::AddWidget,
            "weather",
            "",
        )
        .await
        .expect("submit");
    let rejected = engine
        .submit_change_request(
            &actor(BOB),
            ChangeTarget::Role(RoleId::new("tasks")),
            RequestKind::AddPage,
            "Billing",
            "",
        )
        .await
        .expect("submit");
    engine.approve_request(&root, approved).await.expect("approve");
    engine.reject_request(&root, rejected).await.expect("reject");
    let before = governed_audit(&engine).await.len();

    for id in [approved, rejected] {
        let err = engine.approve_request(&root, id).await.expect_err("terminal");
        assert!(matches!(err, GovernanceError::InvalidStateTransition { .. }));
        let err = engine.reject_request(&root, id).await.expect_err("terminal");
        assert!(matches!(err, GovernanceError::InvalidStateTransition { .. }));
    }
    assert_eq!(governed_audit(&engine).await.len(), before);
}

#[tokio::test]
async fn concurrent_approvals_apply_once() {
    let (engine, _) = world().await;
    let root = actor(ADMIN);
    let id = engine
        .submit_change_request(
            &actor(BOB),
            ChangeTarget::Role(RoleId::new("tasks")),
            RequestKind::AddPage,
            "Calendar",
            "",
        )
        .await
        .expect("submit");

    let (first, second) = tokio::join!(
        engine.approve_request(&root, id),
        engine.approve_request(&root, id)
    );
    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes.iter().any(|r| matches!(
        r,
        Err(GovernanceError::InvalidStateTransition { .. })
    )));
    assert_eq!(governed_audit(&engine).await.len(), 1);
}

#[tokio::test]
async fn failed_approval_commit_keeps_request_pending() {
    let (engine, store) = world().await;
    let root = actor(ADMIN);
    let id = engine
        .submit_change_request(
            &actor(ALICE),
            ChangeTarget::Actor(actor(ALICE)),
            RequestKind::AddPage,
            "Reports",
            "",
        )
        .await
        .expect("submit");

    store.fail_commits(true);
    let err = engine.approve_request(&root, id).await.expect_err("commit fails");
    assert!(matches!(err, GovernanceError::StoreUnavailable(_)));
    store.fail_commits(false);

    assert_eq!(
        engine.get_change_request(id).await.expect("get").status,
        RequestStatus::Pending
    );
    assert!(governed_audit(&engine).await.is_empty());
    let staff = store
        .get_profile(&ProfileId::new("staff"))
        .await
        .expect("profile");
    assert!(!staff.custom_permissions.get(gatehouse_authz::Dimension::Pages).contains("Reports"));
    assert!(!engine.can_access_page(&actor(ALICE), "Reports").await);

    engine.approve_request(&root, id).await.expect("retry succeeds");
    assert!(engine.can_access_page(&actor(ALICE), "Reports").await);
}

#[tokio::test]
async fn approval_against_deleted_target_fails_cleanly() {
    let (engine, _) = world().await;
    let root = actor(ADMIN);
    let id = engine
        .submit_change_request(
            &actor(BOB),
            ChangeTarget::Role(RoleId::new("everything")),
            RequestKind::AddWidget,
            "weather",
            "",
        )
        .await
        .expect("submit");
    engine
        .delete_role(&root, &RoleId::new("everything"))
        .await
        .expect("delete unbound role");
    let audit_before = governed_audit(&engine).await.len();

    let err = engine.approve_request(&root, id).await.expect_err("target gone");
    assert!(matches!(err, GovernanceError::NotFound(_)));
    assert_eq!(
        engine.get_change_request(id).await.expect("get").status,
        RequestStatus::Pending
    );
    assert_eq!(governed_audit(&engine).await.len(), audit_before);
}

#[tokio::test]
async fn removing_an_ungranted_key_is_a_validation_error() {
    let (engine, _) = world().await;
    let id = engine
        .submit_change_request(
            &actor(BOB),
            ChangeTarget::Profile(ProfileId::new("staff")),
            RequestKind::RemovePage,
            "Billing",
            "",
        )
        .await
        .expect("submit");
    let err = engine
        .approve_request(&actor(ADMIN), id)
        .await
        .expect_err("nothing to remove");
    assert!(matches!(err, GovernanceError::ValidationError(_)));
}

#[tokio::test]
async fn submission_rejects_bad_input() {
    let (engine, _) = world().await;
    let bob = actor(BOB);
    let cases = [
        (ChangeTarget::Actor(bob.clone()), RequestKind::AddPage, "  "),
        (ChangeTarget::Actor(bob.clone()), RequestKind::AddPage, "*"),
        (ChangeTarget::Actor(bob.clone()), RequestKind::ChangeRole, "missing-role"),
        (
            ChangeTarget::Profile(ProfileId::new("staff")),
            RequestKind::ChangeRole,
            "tasks",
        ),
    ];
    for (target, kind, value) in cases {
        let err = engine
            .submit_change_request(&bob, target, kind, value, "")
            .await
            .expect_err("invalid submission");
        assert!(matches!(err, GovernanceError::ValidationError(_)), "{err}");
    }

    let err = engine
        .submit_change_request(
            &bob,
            ChangeTarget::Profile(ProfileId::new("missing")),
            RequestKind::AddPage,
            "Reports",
            "",
        )
        .await
        .expect_err("missing target");
    assert!(matches!(err, GovernanceError::NotFound(_)));
    assert!(
        engine
            .list_change_requests(None)
            .await
            .expect("list")
            .is_empty()
    );
}

#[tokio::test]
async fn only_admins_review_requests() {
    let (engine, _) = world().await;
    let id = engine
        .submit_change_request(
            &actor(BOB),
            ChangeTarget::Actor(actor(BOB)),
            RequestKind::AddPage,
            "Reports",
            "",
        )
        .await
        .expect("submit");
    let err = engine
        .approve_request(&actor(BOB), id)
        .await
        .expect_err("bob is not an admin");
    assert!(matches!(err, GovernanceError::Unauthorized(_)));
    assert_eq!(
        engine
            .list_change_requests(Some(RequestStatus::Pending))
            .await
            .expect("pending")
            .len(),
        1
    );
}

#[tokio::test]
async fn audit_records_one_entry_per_mutation() {
    let (engine, store) = world().await;
    let root = actor(ADMIN);

    let mut staff = store
        .get_profile(&ProfileId::new("staff"))
        .await
        .expect("staff");
    staff.name = "Staff v2".to_string();
    engine.update_profile(&root, staff).await.expect("profile edit");

    let mut tasks = store.get_role(&RoleId::new("tasks")).await.expect("tasks");
    tasks.description = Some("task board".to_string());
    engine.update_role(&root, tasks).await.expect("role edit");

    let id = engine
        .submit_change_request(
            &actor(BOB),
            ChangeTarget::Role(RoleId::new("tasks")),
            RequestKind::AddWidget,
            "weather",
            "",
        )
        .await
        .expect("submit");
    engine.approve_request(&root, id).await.expect("approve");

    engine
        .revoke_actor(&root, &actor(ALICE), false)
        .await
        .expect("revoke");

    let audit = governed_audit(&engine).await;
    assert_eq!(audit.len(), 4);
    assert!(audit.windows(2).all(|pair| pair[0].seq < pair[1].seq));

    assert_eq!(audit[0].action, AuditAction::ProfileUpdated);
    assert_eq!(audit[0].subject, "profile:staff");
    let old: serde_json::Value =
        serde_json::from_str(audit[0].old_value.as_deref().expect("old")).expect("json");
    let new: serde_json::Value =
        serde_json::from_str(audit[0].new_value.as_deref().expect("new")).expect("json");
    assert_eq!(old["name"], "Staff");
    assert_eq!(new["name"], "Staff v2");

    assert_eq!(audit[1].action, AuditAction::RoleUpdated);
    assert_eq!(audit[1].subject, "role:tasks");

    assert_eq!(audit[2].action, AuditAction::Approved);
    assert_eq!(audit[2].field, "permissions.home_widgets");
    assert_eq!(audit[2].old_value, None);
    assert_eq!(audit[2].new_value.as_deref(), Some("weather"));

    assert_eq!(audit[3].action, AuditAction::Revoked);
    assert_eq!(audit[3].subject, format!("actor:{ALICE}"));
    assert_eq!(audit[3].old_value.as_deref(), Some("profile=staff;roles=tasks"));
    assert_eq!(audit[3].new_value.as_deref(), Some("profile=staff;roles="));

    assert!(!engine.can_access_page(&actor(ALICE), "Tasks").await);
    assert!(engine.can_access_page(&actor(ALICE), "Dashboard").await);
}

#[tokio::test]
async fn revoke_with_profile_clears_all_sources() {
    let (engine, _) = world().await;
    let binding = engine
        .revoke_actor(&actor(ADMIN), &actor(ALICE), true)
        .await
        .expect("revoke");
    assert!(binding.profile_id.is_none());
    assert!(binding.role_ids.is_empty());
    assert!(!engine.can_access_page(&actor(ALICE), "Dashboard").await);
}

#[tokio::test]
async fn bound_roles_cannot_be_deleted() {
    let (engine, store) = world().await;
    let root = actor(ADMIN);
    let err = engine
        .delete_role(&root, &RoleId::new("tasks"))
        .await
        .expect_err("tasks is bound to alice");
    assert!(matches!(err, GovernanceError::Conflict(_)));
    assert!(store.get_role(&RoleId::new("tasks")).await.is_ok());

    engine
        .delete_role(&root, &RoleId::new("everything"))
        .await
        .expect("unbound role");
    assert!(store.get_role(&RoleId::new("everything")).await.is_err());
}

#[tokio::test]
async fn approval_invalidates_cached_capabilities() {
    let (engine, _) = world().await;
    let alice = actor(ALICE);
    let bob = actor(BOB);
    assert!(engine.can_access_page(&alice, "Dashboard").await);
    assert!(engine.can_access_page(&bob, "Dashboard").await);

    let id = engine
        .submit_change_request(
            &alice,
            ChangeTarget::Profile(ProfileId::new("staff")),
            RequestKind::RemovePage,
            "Dashboard",
            "",
        )
        .await
        .expect("submit");
    engine
        .approve_request(&actor(ADMIN), id)
        .await
        .expect("approve");

    assert!(!engine.can_access_page(&alice, "Dashboard").await);
    assert!(!engine.can_access_page(&bob, "Dashboard").await);
}

#[tokio::test]
async fn store_failure_denies_with_store_unavailable() {
    let (engine, store) = world().await;
    store.fail_reads(true);
    let alice = actor(ALICE);
    assert_eq!(
        engine
            .check_page(&alice, "Dashboard", AttemptMetadata::new())
            .await,
        Decision::Denied(DenialReason::StoreUnavailable)
    );
    assert_eq!(
        engine
            .check_sidebar_section(&alice, "overview", AttemptMetadata::new())
            .await,
        Decision::Denied(DenialReason::StoreUnavailable)
    );
    assert!(engine.can_access_page(&alice, "").await);

    let err = engine
        .approve_request(&actor(ADMIN), 1)
        .await
        .expect_err("reviewer capabilities unavailable");
    assert!(matches!(err, GovernanceError::StoreUnavailable(_)));
}

#[tokio::test]
async fn cached_admin_bypasses_an_unavailable_matrix() {
    let (engine, store) = world().await;
    let root = actor(ADMIN);
    assert!(engine.can_access_page(&root, "Dashboard").await);

    store.fail_reads(true);
    assert_eq!(
        engine
            .check_sidebar_section(&root, "billing", AttemptMetadata::new())
            .await,
        Decision::Granted
    );
    assert_eq!(
        engine
            .check_widget(&root, "news", AttemptMetadata::new())
            .await,
        Decision::Granted
    );
}

#[tokio::test]
async fn concurrent_profile_edits_each_audit_their_predecessor() {
    let (engine, store) = world().await;
    let root = actor(ADMIN);
    let staff = store
        .get_profile(&ProfileId::new("staff"))
        .await
        .expect("staff");
    let mut first = staff.clone();
    first.name = "Staff A".to_string();
    let mut second = staff;
    second.name = "Staff B".to_string();

    let (a, b) = tokio::join!(
        engine.update_profile(&root, first),
        engine.update_profile(&root, second)
    );
    let mut versions = vec![a.expect("first edit").version, b.expect("second edit").version];
    versions.sort();
    assert_eq!(versions, vec![2, 3]);

    let audit = governed_audit(&engine).await;
    assert_eq!(audit.len(), 2);
    let parse = |value: Option<&str>| -> serde_json::Value {
        serde_json::from_str(value.expect("value")).expect("json")
    };
    let (old0, new0) = (parse(audit[0].old_value.as_deref()), parse(audit[0].new_value.as_deref()));
    let (old1, new1) = (parse(audit[1].old_value.as_deref()), parse(audit[1].new_value.as_deref()));
    assert_eq!(old0["name"], "Staff");
    assert_eq!(old0["version"], 1);
    assert_eq!(new0["version"], 2);
    assert_eq!(old1, new0);
    assert_eq!(new1["version"], 3);
    assert_ne!(new0["name"], new1["name"]);

    let stored = store
        .get_profile(&ProfileId::new("staff"))
        .await
        .expect("staff");
    assert_eq!(stored.version, 3);
    assert_eq!(serde_json::json!(stored.name), new1["name"]);
}

#[tokio::test]
async fn concurrent_role_edits_each_audit_their_predecessor() {
    let (engine, store) = world().await;
    let root = actor(ADMIN);
    let tasks = store.get_role(&RoleId::new("tasks")).await.expect("tasks");
    let mut first = tasks.clone();
    first.name = "Tasks A".to_string();
    let mut second = tasks;
    second.name = "Tasks B".to_string();

    let (a, b) = tokio::join!(
        engine.update_role(&root, first),
        engine.update_role(&root, second)
    );
    a.expect("first edit");
    b.expect("second edit");

    let audit = governed_audit(&engine).await;
    assert_eq!(audit.len(), 2);
    assert!(audit.iter().all(|entry| entry.action == AuditAction::RoleUpdated));
    assert_eq!(audit[1].old_value, audit[0].new_value);
    let old0: serde_json::Value =
        serde_json::from_str(audit[0].old_value.as_deref().expect("old")).expect("json");
    assert_eq!(old0["name"], "Tasks");
    assert_eq!(
        store.get_role(&RoleId::new("tasks")).await.expect("tasks").version,
        3
    );
}

#[tokio::test]
async fn deleted_profile_leaves_a_dangling_binding() {
    let (engine, store) = world().await;
    let (alice, bob) = (actor(ALICE), actor(BOB));
    assert!(engine.can_access_page(&bob, "Dashboard").await);
    assert!(engine.can_access_page(&alice, "Dashboard").await);

    engine
        .delete_profile(&actor(ADMIN), &ProfileId::new("staff"))
        .await
        .expect("delete");

    assert!(!engine.can_access_page(&bob, "Dashboard").await);
    assert_eq!(engine.can_access_module(&bob, "tasks").await, AccessLevel::Blocked);
    assert!(!engine.can_access_page(&alice, "Dashboard").await);
    assert!(engine.can_access_page(&alice, "Tasks").await);
    assert_eq!(
        store.get_binding(&bob).await.expect("binding").profile_id,
        Some(ProfileId::new("staff"))
    );

    let deleted: Vec<_> = governed_audit(&engine)
        .await
        .into_iter()
        .filter(|entry| entry.action == AuditAction::ProfileDeleted)
        .collect();
    assert_eq!(deleted.len(), 1);
    assert_eq!(deleted[0].subject, "profile:staff");
    assert_eq!(deleted[0].new_value, None);
}

#[tokio::test]
async fn visibility_matrix_hides_granted_sections() {
    let (engine, _) = world().await;
    let root = actor(ADMIN);
    let alice = actor(ALICE);
    assert!(engine.can_see_sidebar_section(&alice, "overview").await);
    assert_eq!(
        engine
            .check_sidebar_section(&alice, "billing", AttemptMetadata::new())
            .await,
        Decision::Denied(DenialReason::HiddenByVisibilityMatrix)
    );
    assert_eq!(
        engine
            .check_sidebar_section(&alice, "payroll", AttemptMetadata::new())
            .await,
        Decision::Denied(DenialReason::NotGranted)
    );

    let manager = UserAccessBinding::new(alice.clone())
        .with_profile(ProfileId::new("staff"))
        .with_role(RoleId::new("tasks"))
        .with_role_label("manager");
    engine.put_binding(&root, manager).await.expect("relabel");
    assert!(engine.can_see_sidebar_section(&alice, "billing").await);
}

#[tokio::test]
async fn external_actors_use_the_portal_matrix() {
    let (engine, _) = world().await;
    let root = actor(ADMIN);
    let partner = actor(PARTNER);
    assert!(engine.can_see_widget(&partner, "news").await);

    engine
        .put_visibility_matrix(
            &root,
            VisibilityScope::Portal,
            VisibilityMatrix::default().with_entry("user", "news", false),
        )
        .await
        .expect("portal matrix");

    assert!(!engine.can_see_widget(&partner, "news").await);
    assert!(engine.can_see_widget(&actor(ALICE), "news").await);

    let audit = governed_audit(&engine).await;
    assert_eq!(audit.last().expect("entry").action, AuditAction::MatrixUpdated);
    assert_eq!(audit.last().expect("entry").subject, "matrix:portal");
}

#[tokio::test]
async fn report_counts_attempts_and_ranks_denials() {
    let (engine, _) = world().await;
    let alice = actor(ALICE);
    let bob = actor(BOB);
    engine.can_access_page(&alice, "Dashboard").await;
    engine.can_access_page(&alice, "Billing").await;
    engine.can_access_page(&bob, "Billing").await;
    engine.can_access_page(&bob, "Billing").await;
    engine.can_access_page(&bob, "Tasks").await;

    let report = engine.access_report(None, None).await.expect("report");
    assert_eq!(report.granted, 1);
    assert_eq!(report.denied, 4);
    assert_eq!(report.unique_actors, 2);
    assert_eq!(report.top_denied[0].key, "Billing");
    assert_eq!(report.top_denied[0].count, 3);
}

#[tokio::test]
async fn granted_attempts_can_be_left_out_of_the_log() {
    let (engine, _) = world_with(EngineSettings {
        log_granted_attempts: false,
        ..EngineSettings::default()
    })
    .await;
    engine.can_access_page(&actor(ALICE), "Dashboard").await;
    engine.can_access_page(&actor(ALICE), "Billing").await;

    let report = engine.access_report(None, None).await.expect("report");
    assert_eq!(report.granted, 0);
    assert_eq!(report.denied, 1);
}
