use super::*;

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use fleetops_application::{
    PermissionRecord, ProfileRecord, ProfileRepository, RolePermissionEdge, RoleRecord,
    RoleRepository,
};

const ROLE_COLUMNS: &str = "id,name,description,is_built_in";
const PROFILE_COLUMNS: &str = "id,name,email,role";

#[derive(Debug, Deserialize)]
pub(super) struct RoleRow {
    pub(super) id: String,
    pub(super) name: String,
    #[serde(default)]
    pub(super) description: Option<String>,
    #[serde(default)]
    pub(super) is_built_in: bool,
}

impl From<RoleRow> for RoleRecord {
    fn from(row: RoleRow) -> Self {
        Self {
            role_id: row.id,
            name: row.name,
            description: row.description,
            is_built_in: row.is_built_in,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PermissionRow {
    id: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct PermissionName {
    pub(super) name: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct RolePermissionRow {
    pub(super) role_id: String,
    pub(super) permissions: Option<PermissionName>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ProfileRow {
    pub(super) id: String,
    #[serde(default)]
    pub(super) name: Option<String>,
    #[serde(default)]
    pub(super) email: Option<String>,
    #[serde(default)]
    pub(super) role: Option<String>,
}

impl From<ProfileRow> for ProfileRecord {
    fn from(row: ProfileRow) -> Self {
        Self {
            user_id: row.id,
            name: row.name,
            email: row.email,
            role: row.role,
        }
    }
}

impl HttpBackendClient {
    async fn send_rest(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> AppResult<reqwest::Response> {
        let url = self.endpoint(path, query)?;
        let bearer = self.bearer_token().await?;

        let mut builder = self
            .http_client
            .request(method, url)
            .header("apikey", self.api_key.as_str())
            .bearer_auth(bearer);
        if let Some(body) = body {
            builder = builder.json(body).header("Prefer", "return=minimal");
        }

        let response = builder
            .send()
            .await
            .map_err(|error| transport_error(&error))?;
        check_response(response, EndpointKind::Rest).await
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, &str)],
    ) -> AppResult<Vec<T>> {
        let path = format!("rest/v1/{table}");
        let response = self
            .send_rest(Method::GET, path.as_str(), query, None)
            .await?;
        response.json().await.map_err(|error| {
            AppError::Internal(format!("failed to decode '{table}' rows: {error}"))
        })
    }

    async fn rpc(&self, function: &str, args: &Value) -> AppResult<reqwest::Response> {
        let path = format!("rest/v1/rpc/{function}");
        let url = self.endpoint(path.as_str(), &[])?;
        let bearer = self.bearer_token().await?;

        let response = self
            .http_client
            .post(url)
            .header("apikey", self.api_key.as_str())
            .bearer_auth(bearer)
            .json(args)
            .send()
            .await
            .map_err(|error| transport_error(&error))?;
        check_response(response, EndpointKind::Rest).await
    }
}

fn eq_filter(value: &str) -> String {
    format!("eq.{value}")
}

#[async_trait]
impl RoleRepository for HttpBackendClient {
    async fn list_roles(&self) -> AppResult<Vec<RoleRecord>> {
        let rows: Vec<RoleRow> = self
            .select("roles", &[("select", ROLE_COLUMNS), ("order", "name.asc")])
            .await?;
        Ok(rows.into_iter().map(RoleRecord::from).collect())
    }

    async fn list_permissions(&self) -> AppResult<Vec<PermissionRecord>> {
        let rows: Vec<PermissionRow> = self
            .select(
                "permissions",
                &[("select", "id,name,description"), ("order", "name.asc")],
            )
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| PermissionRecord {
                permission_id: row.id,
                name: row.name,
                description: row.description,
            })
            .collect())
    }

    async fn list_role_permissions(&self) -> AppResult<Vec<RolePermissionEdge>> {
        let rows: Vec<RolePermissionRow> = self
            .select("role_permissions", &[("select", "role_id,permissions(name)")])
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                row.permissions.map(|permission| RolePermissionEdge {
                    role_id: row.role_id,
                    permission_name: permission.name,
                })
            })
            .collect())
    }

    async fn create_role(&self, name: &str, description: &str) -> AppResult<RoleRecord> {
        let response = self
            .rpc(
                "create_role",
                &serde_json::json!({ "p_name": name, "p_description": description }),
            )
            .await?;
        let row: RoleRow = response.json().await.map_err(|error| {
            AppError::Internal(format!("failed to decode created role: {error}"))
        })?;
        Ok(row.into())
    }

    async fn update_role(&self, role_id: &str, name: &str, description: &str) -> AppResult<()> {
        let filter = eq_filter(role_id);
        self.send_rest(
            Method::PATCH,
            "rest/v1/roles",
            &[("id", filter.as_str())],
            Some(&serde_json::json!({ "name": name, "description": description })),
        )
        .await
        .map(|_| ())
    }

    async fn delete_role(&self, role_id: &str) -> AppResult<()> {
        self.rpc("delete_role", &serde_json::json!({ "p_role_id": role_id }))
            .await
            .map(|_| ())
    }

    async fn add_permission_to_role(
        &self,
        role_id: &str,
        permission_name: &str,
    ) -> AppResult<()> {
        self.rpc(
            "add_permission_to_role",
            &serde_json::json!({ "p_role_id": role_id, "p_permission_name": permission_name }),
        )
        .await
        .map(|_| ())
    }

    async fn remove_permission_from_role(
        &self,
        role_id: &str,
        permission_name: &str,
    ) -> AppResult<()> {
        self.rpc(
            "remove_permission_from_role",
            &serde_json::json!({ "p_role_id": role_id, "p_permission_name": permission_name }),
        )
        .await
        .map(|_| ())
    }
}

#[async_trait]
impl ProfileRepository for HttpBackendClient {
    async fn find_profile(&self, user_id: &str) -> AppResult<Option<ProfileRecord>> {
        let filter = eq_filter(user_id);
        let rows: Vec<ProfileRow> = self
            .select(
                "profiles",
                &[("select", PROFILE_COLUMNS), ("id", filter.as_str())],
            )
            .await?;
        Ok(rows.into_iter().next().map(ProfileRecord::from))
    }

    async fn list_profiles(&self) -> AppResult<Vec<ProfileRecord>> {
        let rows: Vec<ProfileRow> = self
            .select(
                "profiles",
                &[("select", PROFILE_COLUMNS), ("order", "name.asc")],
            )
            .await?;
        Ok(rows.into_iter().map(ProfileRecord::from).collect())
    }

    async fn update_user_role(&self, user_id: &str, role_name: &str) -> AppResult<()> {
        let filter = eq_filter(user_id);
        self.send_rest(
            Method::PATCH,
            "rest/v1/profiles",
            &[("id", filter.as_str())],
            Some(&serde_json::json!({ "role": role_name })),
        )
        .await
        .map(|_| ())
    }
}
