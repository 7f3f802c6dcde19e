// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Minimal GitHub REST client: one request per tool, no retries.

use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use tracing::{debug, info};

use super::schemas::{
    GetFileContentsArgs, GetTreeArgs, GitHubContent, GitHubErrorBody, GitHubTreeResponse,
};
use crate::error::GithubError;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const TOKEN_VAR: &str = "GITHUB_PERSONAL_ACCESS_TOKEN";
pub const API_URL_VAR: &str = "GITHUB_API_URL";

const ACCEPT_V3: &str = "application/vnd.github.v3+json";
const USER_AGENT_VALUE: &str = "github-mcp-server";

#[derive(Debug, Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    api_url: String,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(api_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    /// `GITHUB_API_URL` (default api.github.com) and
    /// `GITHUB_PERSONAL_ACCESS_TOKEN`.
    pub fn from_env() -> Self {
        let api_url = std::env::var(API_URL_VAR)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        Self::new(api_url, std::env::var(TOKEN_VAR).ok())
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        // The header is sent even without a token, as `token None` would be.
        let token = self.token.as_deref().unwrap_or_default();
        if let Ok(value) = HeaderValue::from_str(&format!("token {}", token)) {
            headers.insert(AUTHORIZATION, value);
        }
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_V3));
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, GithubError> {
        debug!(%url, "GitHub request");
        let response = self.http.get(url).headers(self.headers()).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<GitHubErrorBody>(&body)
                .ok()
                .and_then(|b| b.message)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
            return Err(GithubError::Status {
                status: status.as_u16(),
                message,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }

    pub fn contents_url(&self, args: &GetFileContentsArgs) -> String {
        let mut url = format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_url, args.owner, args.repo, args.path
        );
        if let Some(branch) = args.branch.as_deref().filter(|b| !b.is_empty()) {
            url.push_str("?ref=");
            url.push_str(branch);
        }
        url
    }

    pub fn tree_url(&self, args: &GetTreeArgs) -> String {
        format!(
            "{}/repos/{}/{}/git/trees/{}?recursive={}",
            self.api_url, args.owner, args.repo, args.branch, args.recursive
        )
    }

    /// Fetch a file and return its decoded UTF-8 text. A response without
    /// content yields an empty string.
    pub async fn get_file_contents(&self, args: &GetFileContentsArgs) -> Result<String, GithubError> {
        let content: GitHubContent = self.get_json(&self.contents_url(args)).await?;
        match content.content {
            Some(encoded) => decode_content(&encoded),
            None => Ok(String::new()),
        }
    }

    pub async fn list_repo_tree(&self, args: &GetTreeArgs) -> Result<GitHubTreeResponse, GithubError> {
        let url = self.tree_url(args);
        info!("Listing tree for: {}", url);
        self.get_json(&url).await
    }
}

/// Decode GitHub's line-wrapped base64 into text.
pub fn decode_content(encoded: &str) -> Result<String, GithubError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD.decode(compact)?;
    Ok(String::from_utf8(bytes)?)
}
