use std::sync::Arc;

use fleetops_core::AppError;
use fleetops_domain::PermissionCatalog;

use crate::test_support::{
    FakeProfileRepository, FakeRoleRepository, RecordingNotifier, edge, profile, role_record,
};
use crate::{NoticeLevel, PermissionRecord, RolePermissionEdge};

use super::RoleManager;

const DISPATCHER_GRANTS: [&str; 5] = [
    "bookings:view",
    "bookings:create",
    "bookings:assign",
    "vehicles:view",
    "drivers:view",
];

struct Fixture {
    manager: RoleManager,
    repository: Arc<FakeRoleRepository>,
    notifier: Arc<RecordingNotifier>,
}

fn fixture() -> Fixture {
    fixture_with(FakeRoleRepository::with_roles(
        vec![
            role_record("role-admin", "Admin", true),
            role_record("role-dispatcher", "Dispatcher", false),
            role_record("role-auditor", "Auditor", false),
        ],
        DISPATCHER_GRANTS
            .iter()
            .map(|key| edge("role-dispatcher", key))
            .chain([
                edge("role-admin", "roles:manage"),
                edge("role-dispatcher", "fleet:teleport"),
            ])
            .collect(),
    ))
}

fn fixture_with(repository: FakeRoleRepository) -> Fixture {
    let repository = Arc::new(repository);
    let profiles = Arc::new(FakeProfileRepository::with_profiles(vec![
        profile("u-1", "Dana", "Dispatcher"),
        profile("u-2", "Alex", "admin"),
        profile("u-3", "Casey", "Customer"),
    ]));
    let notifier = Arc::new(RecordingNotifier::default());

    Fixture {
        manager: RoleManager::new(repository.clone(), profiles, notifier.clone()),
        repository,
        notifier,
    }
}

async fn edges_of(repository: &FakeRoleRepository, role_id: &str) -> Vec<String> {
    repository
        .edges
        .lock()
        .await
        .iter()
        .filter(|edge| edge.role_id == role_id)
        .map(|edge| edge.permission_name.clone())
        .collect()
}

#[tokio::test]
async fn list_roles_builds_full_matrix_and_ignores_unknown_keys() {
    let fixture = fixture();

    let roles = fixture.manager.list_roles().await.unwrap_or_default();
    assert_eq!(roles.len(), 3);

    let Some(dispatcher) = roles.iter().find(|role| role.id == "role-dispatcher") else {
        panic!("dispatcher role missing");
    };
    assert_eq!(
        dispatcher.permissions.len(),
        PermissionCatalog::all_keys().count()
    );
    assert_eq!(dispatcher.enabled_permissions(), DISPATCHER_GRANTS.to_vec());
    assert!(!dispatcher.permissions.contains_key("fleet:teleport"));
    assert_eq!(dispatcher.user_count, 1);

    let Some(admin) = roles.iter().find(|role| role.id == "role-admin") else {
        panic!("admin role missing");
    };
    assert_eq!(admin.user_count, 1);
    assert_eq!(fixture.manager.roles().await, roles);
}

#[tokio::test]
async fn category_summary_reports_partial_grants() {
    let fixture = fixture();
    let role = fixture.manager.role("role-dispatcher").await;
    let Ok(role) = role else {
        panic!("dispatcher role missing");
    };

    let summary = RoleManager::category_summary(&role);
    let Some(bookings) = summary.iter().find(|entry| entry.category == "Bookings") else {
        panic!("bookings summary missing");
    };
    assert_eq!((bookings.enabled, bookings.total), (3, 5));
    assert!(!bookings.all_enabled);
}

#[tokio::test]
async fn create_role_starts_with_every_permission_disabled() {
    let fixture = fixture();

    let role = fixture.manager.create_role("Support", "L1 support").await;
    let Ok(role) = role else {
        panic!("role creation failed");
    };

    assert_eq!(role.name, "Support");
    assert_eq!(role.description, "L1 support");
    assert!(!role.is_built_in);
    assert!(role.permissions.values().all(|enabled| !enabled));
    assert_eq!(fixture.manager.roles().await, vec![role]);
    assert!(matches!(
        fixture.notifier.notices().last(),
        Some(notice) if notice.level == NoticeLevel::Success
    ));
}

#[tokio::test]
async fn create_role_rejects_duplicate_name_without_backend_call() {
    let fixture = fixture();
    let _ = fixture.manager.list_roles().await;

    let result = fixture.manager.create_role(" dispatcher ", "").await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(fixture.repository.backend_calls(), 0);
}

#[tokio::test]
async fn built_in_roles_reject_every_edit() {
    let fixture = fixture();

    let set = fixture
        .manager
        .set_permission("role-admin", "bookings:view", true)
        .await;
    let category = fixture
        .manager
        .set_category_permissions("role-admin", "Bookings", true)
        .await;
    let rename = fixture
        .manager
        .update_role("role-admin", "Superuser", "")
        .await;
    let delete = fixture.manager.delete_role("role-admin").await;

    assert!(matches!(set, Err(AppError::Forbidden(_))));
    assert!(matches!(category, Err(AppError::Forbidden(_))));
    assert!(matches!(rename, Err(AppError::Forbidden(_))));
    assert!(matches!(delete, Err(AppError::Forbidden(_))));
    assert_eq!(fixture.repository.backend_calls(), 0);
}

#[tokio::test]
async fn set_permission_rejects_keys_outside_catalog() {
    let fixture = fixture();

    let result = fixture
        .manager
        .set_permission("role-dispatcher", "fleet:teleport", true)
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(fixture.repository.backend_calls(), 0);
}

#[tokio::test]
async fn create_role_rejects_duplicate_name_on_cold_cache() {
    let fixture = fixture();

    let result = fixture.manager.create_role("dispatcher", "").await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(fixture.repository.backend_calls(), 0);
    assert_eq!(fixture.manager.roles().await.len(), 3);
}

#[tokio::test]
async fn set_permission_reaches_backend_even_when_cache_shows_grant() {
    let fixture = fixture();
    let _ = fixture.manager.list_roles().await;
    let is_revoked_grant = |edge: &RolePermissionEdge| {
        edge.role_id == "role-dispatcher" && edge.permission_name == "bookings:view"
    };
    fixture
        .repository
        .edges
        .lock()
        .await
        .retain(|edge| !is_revoked_grant(edge));

    let result = fixture
        .manager
        .set_permission("role-dispatcher", "bookings:view", true)
        .await;

    assert!(result.is_ok());
    assert_eq!(fixture.repository.backend_calls(), 1);
    assert!(
        fixture
            .repository
            .edges
            .lock()
            .await
            .iter()
            .any(is_revoked_grant)
    );
}

#[tokio::test]
async fn delete_role_refuses_roles_assigned_to_users() {
    let fixture = fixture();

    let result = fixture.manager.delete_role("role-dispatcher").await;

    assert!(matches!(result, Err(AppError::Conflict(message)) if message.contains("1 user")));
    assert_eq!(fixture.repository.backend_calls(), 0);
    assert!(fixture.manager.role("role-dispatcher").await.is_ok());
}

#[tokio::test]
async fn delete_role_removes_unassigned_custom_role() {
    let fixture = fixture();

    let result = fixture.manager.delete_role("role-auditor").await;

    assert!(result.is_ok());
    assert!(
        fixture
            .manager
            .roles()
            .await
            .iter()
            .all(|role| role.id != "role-auditor")
    );
    assert!(matches!(
        fixture.manager.role("role-auditor").await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn set_category_permissions_grants_only_missing_keys() {
    let fixture = fixture();

    let result = fixture
        .manager
        .set_category_permissions("role-dispatcher", "Bookings", true)
        .await;
    assert!(result.is_ok());
    assert_eq!(fixture.repository.backend_calls(), 2);

    let Ok(role) = fixture.manager.role("role-dispatcher").await else {
        panic!("dispatcher role missing");
    };
    let Some(bookings) = PermissionCatalog::category("Bookings") else {
        panic!("bookings category missing");
    };
    assert!(role.all_enabled_in_category(bookings));
    assert_eq!(role.count_enabled_in_category(bookings), 5);
}

#[tokio::test]
async fn set_category_permissions_rejects_unknown_category() {
    let fixture = fixture();

    let result = fixture
        .manager
        .set_category_permissions("role-dispatcher", "Fleet", true)
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn category_failure_reverts_applied_keys_and_reloads() {
    let fixture = fixture();
    let Ok(support) = fixture.manager.create_role("Support", "").await else {
        panic!("role creation failed");
    };
    fixture.repository.fail_permission("bookings:edit").await;

    let result = fixture
        .manager
        .set_category_permissions(support.id.as_str(), "Bookings", true)
        .await;

    assert!(result.is_err());
    assert!(
        edges_of(&fixture.repository, support.id.as_str())
            .await
            .is_empty()
    );
    let Ok(reloaded) = fixture.manager.role(support.id.as_str()).await else {
        panic!("support role missing after reload");
    };
    assert!(reloaded.enabled_permissions().is_empty());
    assert!(matches!(
        fixture.notifier.notices().last(),
        Some(notice) if notice.level == NoticeLevel::Error
    ));
}

#[tokio::test]
async fn failed_permission_update_reloads_backend_state() {
    let fixture = fixture();
    fixture.repository.fail_permission("invoices:view").await;

    let result = fixture
        .manager
        .set_permission("role-dispatcher", "invoices:view", true)
        .await;

    assert!(result.is_err());
    let Ok(role) = fixture.manager.role("role-dispatcher").await else {
        panic!("dispatcher role missing");
    };
    assert!(!role.is_enabled("invoices:view"));
    assert_eq!(role.enabled_permissions(), DISPATCHER_GRANTS.to_vec());
}

#[tokio::test]
async fn copy_role_carries_every_enabled_permission() {
    let fixture = fixture();

    let copy = fixture
        .manager
        .copy_role("role-dispatcher", "Dispatcher-EU")
        .await;
    let Ok(copy) = copy else {
        panic!("role copy failed");
    };

    assert_eq!(copy.name, "Dispatcher-EU");
    assert!(!copy.is_built_in);
    assert_eq!(copy.enabled_permissions(), DISPATCHER_GRANTS.to_vec());
    assert_eq!(copy.user_count, 0);
    assert_eq!(fixture.repository.backend_calls(), 1 + DISPATCHER_GRANTS.len());
    assert_eq!(
        edges_of(&fixture.repository, copy.id.as_str()).await.len(),
        DISPATCHER_GRANTS.len()
    );
}

#[tokio::test]
async fn copy_role_failure_deletes_partial_copy() {
    let fixture = fixture();
    fixture.repository.fail_permission("vehicles:view").await;

    let result = fixture
        .manager
        .copy_role("role-dispatcher", "Dispatcher-EU")
        .await;

    assert!(result.is_err());
    assert!(
        fixture
            .repository
            .roles
            .lock()
            .await
            .iter()
            .all(|role| role.name != "Dispatcher-EU")
    );
    assert!(
        fixture
            .manager
            .roles()
            .await
            .iter()
            .all(|role| role.name != "Dispatcher-EU")
    );
}

#[tokio::test]
async fn update_role_renames_and_keeps_names_unique() {
    let fixture = fixture();

    let clash = fixture
        .manager
        .update_role("role-auditor", "DISPATCHER", "")
        .await;
    assert!(matches!(clash, Err(AppError::Validation(_))));

    let renamed = fixture
        .manager
        .update_role("role-auditor", "Auditor (read only)", "Reads everything")
        .await;
    let Ok(renamed) = renamed else {
        panic!("rename failed");
    };
    assert_eq!(renamed.name, "Auditor (read only)");
    assert_eq!(renamed.description, "Reads everything");

    let same_name = fixture
        .manager
        .update_role("role-auditor", "auditor (read only)", "")
        .await;
    assert!(same_name.is_ok());
}

#[tokio::test]
async fn catalog_drift_reports_both_directions() {
    let mut repository = FakeRoleRepository::default();
    repository.permissions = PermissionCatalog::all_keys()
        .filter(|key| *key != "roles:manage")
        .chain(["fleet:teleport"])
        .map(|key| PermissionRecord {
            permission_id: format!("perm-{key}"),
            name: key.to_owned(),
            description: None,
        })
        .collect();
    let fixture = fixture_with(repository);

    let Ok(drift) = fixture.manager.catalog_drift().await else {
        panic!("drift check failed");
    };

    assert_eq!(drift.unknown_to_catalog, vec!["fleet:teleport".to_owned()]);
    assert_eq!(drift.missing_on_backend, vec!["roles:manage".to_owned()]);
    assert!(!drift.is_empty());
}
