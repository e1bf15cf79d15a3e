//! HTTP client for the directory REST API.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{
    directory::{
        bucket::TokenBucket,
        cache::TtlCache,
        errors::DirectoryError,
        models::{
            DirectoryRole, Freshness, GroupResponse, RolesResponse, SetDescriptionRequest,
            SetRoleRequest,
        },
        service::DirectoryService,
    },
    domain::identifiers::{GroupId, RoleId, SubjectId},
};

const ROLES_TTL: Duration = Duration::from_secs(5 * 60);
const DESCRIPTION_TTL: Duration = Duration::from_secs(60);

/// Connection settings for the directory API.
#[derive(Clone)]
pub struct DirectoryConfig {
    /// Base URL, e.g. `"https://directory.example.com/v1"`.
    pub base_url: String,

    /// Sent as the `x-api-key` header.
    pub api_key: String,

    /// Per-request timeout.
    pub timeout: Duration,

    /// Ceiling per logical endpoint.
    pub calls_per_minute: u32,
}

impl fmt::Debug for DirectoryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"**redacted**")
            .field("timeout", &self.timeout)
            .field("calls_per_minute", &self.calls_per_minute)
            .finish()
    }
}

#[derive(Debug)]
struct EndpointBuckets {
    list_roles: TokenBucket,
    user_role: TokenBucket,
    set_role: TokenBucket,
    group: TokenBucket,
    set_description: TokenBucket,
}

/// Rate-limited, caching directory client.
pub struct HttpDirectoryClient {
    http: Client,
    base_url: String,
    api_key: String,
    buckets: EndpointBuckets,
    roles: TtlCache<GroupId, Vec<DirectoryRole>>,
    descriptions: TtlCache<GroupId, String>,
}

impl fmt::Debug for HttpDirectoryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpDirectoryClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"**redacted**")
            .finish_non_exhaustive()
    }
}

impl HttpDirectoryClient {
    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be constructed.
    pub fn new(config: DirectoryConfig) -> Result<Self, DirectoryError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(DirectoryError::Transport)?;

        let per_minute = config.calls_per_minute;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            buckets: EndpointBuckets {
                list_roles: TokenBucket::per_minute(per_minute),
                user_role: TokenBucket::per_minute(per_minute),
                set_role: TokenBucket::per_minute(per_minute),
                group: TokenBucket::per_minute(per_minute),
                set_description: TokenBucket::per_minute(per_minute),
            },
            roles: TtlCache::new(ROLES_TTL),
            descriptions: TtlCache::new(DESCRIPTION_TTL),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, DirectoryError> {
        let response = request.header("x-api-key", &self.api_key).send().await?;

        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(DirectoryError::RateLimited);
        }

        let body = response.text().await.unwrap_or_default();

        Err(DirectoryError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, DirectoryError> {
        let response = self.send(self.http.get(self.url(path))).await?;

        response.json().await.map_err(DirectoryError::from)
    }
}

#[async_trait]
impl DirectoryService for HttpDirectoryClient {
    async fn list_roles(
        &self,
        group: GroupId,
        freshness: Freshness,
    ) -> Result<Vec<DirectoryRole>, DirectoryError> {
        if freshness == Freshness::Cached
            && let Some(roles) = self.roles.get(&group)
        {
            return Ok(roles);
        }

        self.buckets.list_roles.acquire().await;

        let response: RolesResponse = self.get_json(&roles_path(group)).await?;

        debug!(group = %group, roles = response.roles.len(), "role catalog fetched");

        self.roles.insert(group, response.roles.clone());

        Ok(response.roles)
    }

    async fn get_user_role(
        &self,
        group: GroupId,
        subject: SubjectId,
    ) -> Result<DirectoryRole, DirectoryError> {
        self.buckets.user_role.acquire().await;

        match self.get_json(&user_role_path(group, subject)).await {
            Err(DirectoryError::Status { status: 404, .. }) => Err(DirectoryError::NotMember),
            other => other,
        }
    }

    async fn set_user_role(
        &self,
        group: GroupId,
        subject: SubjectId,
        role: RoleId,
    ) -> Result<(), DirectoryError> {
        self.buckets.set_role.acquire().await;

        let request = self
            .http
            .patch(self.url(&user_path(group, subject)))
            .json(&SetRoleRequest { role_id: role });

        match self.send(request).await {
            Err(DirectoryError::Status { status: 404, .. }) => Err(DirectoryError::NotMember),
            Err(error) => Err(error),
            Ok(_) => Ok(()),
        }
    }

    async fn get_description(
        &self,
        group: GroupId,
        freshness: Freshness,
    ) -> Result<String, DirectoryError> {
        if freshness == Freshness::Cached
            && let Some(description) = self.descriptions.get(&group)
        {
            return Ok(description);
        }

        self.buckets.group.acquire().await;

        let response: GroupResponse = self.get_json(&group_path(group)).await?;
        let description = response.description.unwrap_or_default();

        self.descriptions.insert(group, description.clone());

        Ok(description)
    }

    async fn set_description(
        &self,
        group: GroupId,
        description: String,
    ) -> Result<(), DirectoryError> {
        self.buckets.set_description.acquire().await;

        let request = self
            .http
            .patch(self.url(&description_path(group)))
            .json(&SetDescriptionRequest {
                description: &description,
            });

        self.send(request).await?;
        self.descriptions.invalidate(&group);

        Ok(())
    }
}

fn roles_path(group: GroupId) -> String {
    format!("/groups/{group}/roles")
}

fn user_role_path(group: GroupId, subject: SubjectId) -> String {
    format!("/groups/{group}/users/{subject}/role")
}

fn user_path(group: GroupId, subject: SubjectId) -> String {
    format!("/groups/{group}/users/{subject}")
}

fn group_path(group: GroupId) -> String {
    format!("/groups/{group}")
}

fn description_path(group: GroupId) -> String {
    format!("/groups/{group}/description")
}
