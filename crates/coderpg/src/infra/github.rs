//! GitHub code-host collaborator: recursive tree listings and blob reads.

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;

use crate::domain::errors::UpstreamError;
use crate::domain::model::{RemoteEntry, RepoRef};

pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Remote code host the browser reads trees and blobs from.
#[async_trait]
pub trait CodeHost: Send + Sync {
    /// Recursive listing of one repository snapshot.
    async fn list_files(&self, repo: &RepoRef) -> Result<Vec<RemoteEntry>, UpstreamError>;
    /// Decoded text content of one blob URL from a listing.
    async fn read_blob(&self, url: &str) -> Result<String, UpstreamError>;
}

pub struct GithubClient {
    http: reqwest::Client,
    api_base: String,
    token: Option<String>,
}

#[derive(Deserialize)]
struct TreeResponse {
    #[serde(default)]
    tree: Vec<RemoteEntry>,
}

#[derive(Deserialize)]
struct BlobResponse {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct ApiMessage {
    message: Option<String>,
}

impl GithubClient {
    pub fn new(api_base: impl Into<String>, token: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .context("failed to build github http client")?;
        Ok(Self {
            http,
            api_base: api_base.into(),
            token,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<T, UpstreamError> {
        // GitHub rejects requests without a User-Agent.
        let mut request = self
            .http
            .get(url)
            .header(reqwest::header::USER_AGENT, "coderpg");
        if let Some(token) = &self.token {
            request = request.header(reqwest::header::AUTHORIZATION, format!("token {token}"));
        }

        let response = request
            .send()
            .await
            .map_err(|err| UpstreamError(err.to_string()))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| UpstreamError(err.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ApiMessage>(&body)
                .ok()
                .and_then(|m| m.message)
                .unwrap_or_else(|| format!("github api returned {status}"));
            return Err(UpstreamError(message));
        }

        serde_json::from_slice(&body)
            .map_err(|err| UpstreamError(format!("unexpected github response: {err}")))
    }
}

#[async_trait]
impl CodeHost for GithubClient {
    async fn list_files(&self, repo: &RepoRef) -> Result<Vec<RemoteEntry>, UpstreamError> {
        let url = format!(
            "{}/repos/{}/{}/git/trees/{}?recursive=true",
            self.api_base, repo.owner, repo.repo, repo.tag
        );
        tracing::debug!(%url, "listing remote tree");
        let listing: TreeResponse = self.get_json(&url).await?;
        Ok(listing.tree)
    }

    async fn read_blob(&self, url: &str) -> Result<String, UpstreamError> {
        let blob: BlobResponse = self.get_json(url).await?;
        decode_content(&blob.content)
    }
}

/// Decode the base64 blob payload. GitHub wraps the encoding with
/// newlines, so whitespace is stripped first.
fn decode_content(content: &str) -> Result<String, UpstreamError> {
    let compact: String = content.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = BASE64
        .decode(compact.as_bytes())
        .map_err(|err| UpstreamError(format!("undecodable blob content: {err}")))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
