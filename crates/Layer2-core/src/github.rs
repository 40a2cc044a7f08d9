//! GitHub 사용자 조회
//!
//! Resolves the login behind a personal access token. Used only to label the
//! authorized account; failures never block authorization.

use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Default API root
pub const GITHUB_API: &str = "https://api.github.com";

#[derive(Debug, Deserialize)]
struct GithubUser {
    login: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GithubClient {
    client: Client,
    api_base: String,
}

impl Default for GithubClient {
    fn default() -> Self {
        Self::new(GITHUB_API)
    }
}

impl GithubClient {
    pub fn new(api_base: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent("CloudSave/1.0")
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Login of the token's owner; `None` on any failure
    pub async fn login(&self, token: &str) -> Option<String> {
        if token.is_empty() {
            return None;
        }

        let url = format!("{}/user", self.api_base);
        let response = match self
            .client
            .get(&url)
            .header("Authorization", format!("token {}", token))
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                warn!("GitHub user lookup failed: {}", e);
                return None;
            }
        };

        if !response.status().is_success() {
            warn!("GitHub user lookup returned HTTP {}", response.status());
            return None;
        }

        match response.json::<GithubUser>().await {
            Ok(user) => {
                debug!("Resolved GitHub login: {:?}", user.login);
                user.login
            }
            Err(e) => {
                warn!("Unreadable GitHub user response: {}", e);
                None
            }
        }
    }
}
