use std::sync::Arc;

use fleetops_core::{AppError, Identity};
use fleetops_domain::AVATAR_PALETTE;

use crate::test_support::{
    FakeProfileRepository, FakeRoleRepository, RecordingNotifier, profile, role_record,
};
use crate::{IdentityCache, NoticeLevel, ProfileRecord, RoleManager};

use super::UserRoleService;

struct Fixture {
    service: UserRoleService,
    profiles: Arc<FakeProfileRepository>,
    cache: IdentityCache,
    notifier: Arc<RecordingNotifier>,
}

fn fixture(profiles: FakeProfileRepository) -> Fixture {
    let profiles = Arc::new(profiles);
    let roles = Arc::new(FakeRoleRepository::with_roles(
        vec![
            role_record("role-admin", "Admin", true),
            role_record("role-dispatcher", "Dispatcher", false),
        ],
        Vec::new(),
    ));
    let notifier = Arc::new(RecordingNotifier::default());
    let cache = IdentityCache::new();
    let role_manager = RoleManager::new(roles, profiles.clone(), notifier.clone());

    Fixture {
        service: UserRoleService::new(
            profiles.clone(),
            role_manager,
            cache.clone(),
            notifier.clone(),
        ),
        profiles,
        cache,
        notifier,
    }
}

#[tokio::test]
async fn list_users_derives_display_attributes() {
    let fixture = fixture(FakeProfileRepository::with_profiles(vec![
        profile("u-1", "Dana Scully", "Dispatcher"),
        ProfileRecord {
            user_id: "u-2".to_owned(),
            name: None,
            email: Some("mulder@example.com".to_owned()),
            role: None,
        },
    ]));

    let users = fixture.service.list_users().await.unwrap_or_default();
    assert_eq!(users.len(), 2);

    assert_eq!(users[0].name, "Dana Scully");
    assert_eq!(users[0].initials, "DS");
    assert_eq!(users[0].role, "Dispatcher");
    assert!(AVATAR_PALETTE.contains(&users[0].color));

    assert_eq!(users[1].name, "mulder");
    assert_eq!(users[1].initials, "M");
    assert_eq!(users[1].role, "Customer");
}

#[tokio::test]
async fn set_user_role_stores_role_name_and_invalidates_identity() {
    let fixture = fixture(FakeProfileRepository::with_profiles(vec![profile(
        "u-1", "Dana", "Customer",
    )]));
    fixture
        .cache
        .insert(Identity::new("u-1", "u-1@example.com", "Dana", "Customer"))
        .await;

    let result = fixture
        .service
        .set_user_role("u-1", "role-dispatcher")
        .await;

    assert!(result.is_ok());
    assert_eq!(
        fixture.profiles.profiles.lock().await[0].role.as_deref(),
        Some("Dispatcher")
    );
    assert!(fixture.cache.get("u-1").await.is_none());
    assert!(matches!(
        fixture.notifier.notices().last(),
        Some(notice) if notice.level == NoticeLevel::Success
    ));
}

#[tokio::test]
async fn set_user_role_rejects_unknown_role() {
    let fixture = fixture(FakeProfileRepository::with_profiles(vec![profile(
        "u-1", "Dana", "Customer",
    )]));

    let result = fixture.service.set_user_role("u-1", "role-missing").await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert_eq!(
        fixture.profiles.profiles.lock().await[0].role.as_deref(),
        Some("Customer")
    );
}

#[tokio::test]
async fn set_user_role_failure_keeps_cache_and_reports_error() {
    let mut profiles = FakeProfileRepository::with_profiles(vec![profile("u-1", "Dana", "Customer")]);
    profiles.fail_updates = true;
    let fixture = fixture(profiles);
    fixture
        .cache
        .insert(Identity::new("u-1", "u-1@example.com", "Dana", "Customer"))
        .await;

    let result = fixture
        .service
        .set_user_role("u-1", "role-dispatcher")
        .await;

    assert!(matches!(result, Err(AppError::Internal(_))));
    assert!(fixture.cache.get("u-1").await.is_some());
    assert!(matches!(
        fixture.notifier.notices().last(),
        Some(notice) if notice.level == NoticeLevel::Error
    ));
}
