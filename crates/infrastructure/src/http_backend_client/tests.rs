use std::path::Path;

use chrono::{Duration, TimeZone, Utc};
use reqwest::StatusCode;
use url::Url;

use fleetops_application::{AuthBackend, BackendSession, BackendUser};
use fleetops_core::AppError;

use super::auth::{TokenResponse, is_near_expiry};
use super::rest::{ProfileRow, RolePermissionRow};
use super::{EndpointKind, HttpBackendClient, error_message, status_error};

fn client(token_path: &Path) -> HttpBackendClient {
    let Ok(base_url) = Url::parse("https://fleet.example.com/api") else {
        panic!("invalid test url");
    };
    HttpBackendClient::new(reqwest::Client::new(), base_url, "anon-key", token_path)
}

fn session(expires_at: Option<chrono::DateTime<Utc>>) -> BackendSession {
    BackendSession {
        access_token: "access".to_owned(),
        refresh_token: "refresh".to_owned(),
        expires_at,
        user: BackendUser {
            id: "u-1".to_owned(),
            email: Some("dana@example.com".to_owned()),
            display_name: None,
        },
    }
}

#[test]
fn endpoints_keep_base_path_and_encode_query() {
    let client = client(Path::new("tokens.json"));

    let url = client.endpoint("auth/v1/token", &[("grant_type", "password")]);
    assert_eq!(
        url.map(|url| url.to_string()).unwrap_or_default(),
        "https://fleet.example.com/api/auth/v1/token?grant_type=password"
    );

    let url = client.endpoint("rest/v1/profiles", &[("id", "eq.u 1")]);
    assert_eq!(
        url.map(|url| url.to_string()).unwrap_or_default(),
        "https://fleet.example.com/api/rest/v1/profiles?id=eq.u+1"
    );
}

#[test]
fn auth_rejections_map_to_unauthorized() {
    assert!(matches!(
        status_error(StatusCode::BAD_REQUEST, "Invalid login credentials", EndpointKind::Auth),
        AppError::Unauthorized(_)
    ));
    assert!(matches!(
        status_error(StatusCode::UNAUTHORIZED, "JWT expired", EndpointKind::Rest),
        AppError::Unauthorized(_)
    ));
    assert!(matches!(
        status_error(StatusCode::FORBIDDEN, "permission denied", EndpointKind::Rest),
        AppError::Forbidden(_)
    ));
    assert!(matches!(
        status_error(StatusCode::BAD_REQUEST, "bad filter", EndpointKind::Rest),
        AppError::Validation(_)
    ));
    assert!(matches!(
        status_error(StatusCode::CONFLICT, "duplicate key", EndpointKind::Rest),
        AppError::Conflict(_)
    ));
    assert!(matches!(
        status_error(StatusCode::BAD_GATEWAY, "upstream", EndpointKind::Rest),
        AppError::Internal(_)
    ));
}

#[test]
fn error_message_prefers_descriptive_fields() {
    assert_eq!(
        error_message(r#"{"error":"invalid_grant","error_description":"Invalid Refresh Token"}"#),
        "Invalid Refresh Token"
    );
    assert_eq!(error_message(r#"{"message":"duplicate key"}"#), "duplicate key");
    assert_eq!(error_message(" gateway timeout \n"), "gateway timeout");
}

#[test]
fn token_response_converts_expiry_and_display_name() {
    let body = r#"{
        "access_token": "a",
        "refresh_token": "r",
        "expires_in": 3600,
        "user": {
            "id": "u-1",
            "email": "dana@example.com",
            "user_metadata": { "full_name": "Dana Scully" }
        }
    }"#;
    let Ok(token) = serde_json::from_str::<TokenResponse>(body) else {
        panic!("token response did not decode");
    };
    let Some(now) = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).single() else {
        panic!("invalid test timestamp");
    };

    let session = token.into_session(now);

    assert_eq!(session.expires_at, Some(now + Duration::hours(1)));
    assert_eq!(session.user.display_name.as_deref(), Some("Dana Scully"));
}

#[test]
fn absolute_expiry_wins_over_relative() {
    let body = r#"{
        "access_token": "a",
        "refresh_token": "r",
        "expires_in": 3600,
        "expires_at": 1893456000,
        "user": { "id": "u-1" }
    }"#;
    let Ok(token) = serde_json::from_str::<TokenResponse>(body) else {
        panic!("token response did not decode");
    };

    let session = token.into_session(Utc::now());

    assert_eq!(
        session.expires_at,
        chrono::DateTime::from_timestamp(1_893_456_000, 0)
    );
    assert_eq!(session.user.email, None);
}

#[test]
fn rest_rows_decode_embedded_permissions() {
    let body = r#"[
        {"role_id": "r-1", "permissions": {"name": "bookings:view"}},
        {"role_id": "r-1", "permissions": null}
    ]"#;
    let rows = serde_json::from_str::<Vec<RolePermissionRow>>(body).unwrap_or_default();

    assert_eq!(rows.len(), 2);
    assert_eq!(
        rows[0].permissions.as_ref().map(|permission| permission.name.as_str()),
        Some("bookings:view")
    );
    assert!(rows[1].permissions.is_none());

    let profiles =
        serde_json::from_str::<Vec<ProfileRow>>(r#"[{"id": "u-1", "role": "Dispatcher"}]"#)
            .unwrap_or_default();
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0].name, None);
}

#[test]
fn near_expiry_uses_leeway() {
    let now = Utc::now();

    assert!(is_near_expiry(&session(Some(now + Duration::seconds(10))), now));
    assert!(!is_near_expiry(&session(Some(now + Duration::minutes(10))), now));
    assert!(!is_near_expiry(&session(None), now));
}

#[tokio::test]
async fn current_session_is_none_without_token_file() {
    let directory = tempfile::tempdir();
    assert!(directory.is_ok());
    let directory = directory.unwrap_or_else(|_| unreachable!());
    let client = client(directory.path().join("tokens.json").as_path());

    assert!(matches!(client.current_session().await, Ok(None)));
    assert!(matches!(
        client.refresh_session().await,
        Err(AppError::Unauthorized(message)) if message.contains("Refresh Token")
    ));
    assert_eq!(client.bearer_token().await.unwrap_or_default(), "anon-key");
}

#[tokio::test]
async fn stored_tokens_are_picked_up_and_cleared() {
    let directory = tempfile::tempdir();
    assert!(directory.is_ok());
    let directory = directory.unwrap_or_else(|_| unreachable!());
    let token_path = directory.path().join("state").join("tokens.json");

    let writer = client(token_path.as_path());
    assert!(writer.store_session(&session(None)).await.is_ok());

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&token_path)
            .map(|metadata| metadata.permissions().mode() & 0o777)
            .unwrap_or_default();
        assert_eq!(mode, 0o600);
    }

    let reader = client(token_path.as_path());
    assert_eq!(reader.bearer_token().await.unwrap_or_default(), "access");

    assert!(reader.clear_local_session().await.is_ok());
    assert!(!token_path.exists());
    assert!(matches!(reader.stored_session().await, Ok(None)));
}
