//! Resolution of bearer tokens to user identities and collab membership.

use anyhow::{Context, Result};
use parking_lot::RwLock;
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use crate::model::UserContext;

/// Source of user identities and collab memberships.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The user owning `token`, or `None` if the token is not valid.
    async fn user_info(&self, token: &str) -> Result<Option<UserContext>>;

    /// Whether the user owning `token` may edit the content of `collab_id`.
    async fn is_collab_member(&self, collab_id: &str, token: &str) -> Result<bool>;
}

/// Identity provider backed by an OpenID Connect userinfo endpoint and the
/// collaboratory permission service.
#[derive(Debug, Clone)]
pub struct OidcIdentityProvider {
    client: reqwest::Client,
    userinfo_url: String,
    collab_api_url: String,
}

#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    sub: String,
    #[serde(default)]
    preferred_username: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    given_name: Option<String>,
    #[serde(default)]
    family_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PermissionsResponse {
    #[serde(rename = "UPDATE", default)]
    update: bool,
}

impl OidcIdentityProvider {
    pub fn new(userinfo_url: &str, collab_api_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build identity provider HTTP client")?;

        Ok(Self {
            client,
            userinfo_url: userinfo_url.to_string(),
            collab_api_url: collab_api_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait::async_trait]
impl IdentityProvider for OidcIdentityProvider {
    async fn user_info(&self, token: &str) -> Result<Option<UserContext>> {
        let response = self
            .client
            .get(&self.userinfo_url)
            .bearer_auth(token)
            .send()
            .await
            .context("Failed to reach identity provider")?;

        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            return Ok(None);
        }

        let info: UserInfoResponse = response
            .error_for_status()
            .context("Identity provider rejected userinfo request")?
            .json()
            .await
            .context("Failed to parse userinfo response")?;

        Ok(Some(UserContext::with_details(
            info.sub,
            info.preferred_username,
            info.email,
            info.given_name,
            info.family_name,
        )))
    }

    async fn is_collab_member(&self, collab_id: &str, token: &str) -> Result<bool> {
        let url = format!("{}/collab/{}/permissions/", self.collab_api_url, collab_id);
        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .context("Failed to reach collab service")?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                return Ok(false)
            }
            _ => {}
        }

        let permissions: PermissionsResponse = response
            .error_for_status()
            .context("Collab service rejected permissions request")?
            .json()
            .await
            .context("Failed to parse collab permissions")?;

        Ok(permissions.update)
    }
}

/// Fixed token table for development and tests.
#[derive(Debug, Default)]
pub struct StaticIdentityProvider {
    users: RwLock<HashMap<String, UserContext>>,
    memberships: RwLock<HashSet<(String, String)>>,
}

impl StaticIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, token: &str, user: UserContext) -> Self {
        self.users.write().insert(token.to_string(), user);
        self
    }

    pub fn with_membership(self, user_id: &str, collab_id: &str) -> Self {
        self.memberships
            .write()
            .insert((user_id.to_string(), collab_id.to_string()));
        self
    }
}

#[async_trait::async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn user_info(&self, token: &str) -> Result<Option<UserContext>> {
        Ok(self.users.read().get(token).cloned())
    }

    async fn is_collab_member(&self, collab_id: &str, token: &str) -> Result<bool> {
        let Some(user_id) = self.users.read().get(token).map(|u| u.user_id.clone()) else {
            return Ok(false);
        };
        Ok(self
            .memberships
            .read()
            .contains(&(user_id, collab_id.to_string())))
    }
}
