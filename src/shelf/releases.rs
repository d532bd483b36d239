//! GitHub Releases as the durable home for migrated documents.

use crate::error::PublishError;
use crate::shelf::util::truncate_with_ellipsis;
use reqwest::blocking::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const GITHUB_API_BASE: &str = "https://api.github.com";
const REQUEST_TIMEOUT_SECS: u64 = 300;
const MAX_REASON_CHARS: usize = 120;

pub trait AssetPublisher {
    /// Publish `bytes` under `name` and return the public download URL.
    fn publish(&mut self, name: &str, bytes: &[u8]) -> Result<String, PublishError>;
}

#[derive(Debug, Deserialize)]
struct ReleaseInfo {
    #[serde(default)]
    upload_url: String,
}

#[derive(Debug, Deserialize)]
struct UploadedAsset {
    #[serde(default)]
    browser_download_url: String,
}

#[derive(Debug, Clone)]
pub struct ReleaseTarget {
    pub repo: String,
    pub tag: String,
    pub name: String,
    pub body: String,
}

pub struct GithubReleasePublisher {
    client: Client,
    token: String,
    target: ReleaseTarget,
    upload_url: Option<String>,
}

/// The upload endpoint with its `{?name,label}` URI template removed.
pub fn upload_base(raw: &str) -> &str {
    raw.split('{').next().unwrap_or(raw).trim()
}

fn failure_reason(status: u16, body: &str) -> String {
    format!(
        "http {status}: {}",
        truncate_with_ellipsis(body.trim(), MAX_REASON_CHARS)
    )
}

impl GithubReleasePublisher {
    pub fn new(token: &str, target: ReleaseTarget) -> Result<Self, PublishError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(concat!("docshelf/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            token: token.trim().to_string(),
            target,
            upload_url: None,
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", "application/vnd.github+json")
    }

    fn create_release(&self) -> Result<ReleaseInfo, PublishError> {
        let url = format!("{GITHUB_API_BASE}/repos/{}/releases", self.target.repo);
        let payload = json!({
            "tag_name": self.target.tag,
            "name": self.target.name,
            "body": self.target.body,
            "draft": false,
            "prerelease": false,
        });
        let response = self.authorized(self.client.post(&url)).json(&payload).send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(PublishError::ReleaseCreation(failure_reason(
                status.as_u16(),
                &body,
            )));
        }
        tracing::info!(repo = %self.target.repo, tag = %self.target.tag, "created release");
        response
            .json()
            .map_err(|err| PublishError::ReleaseCreation(format!("unreadable release: {err}")))
    }

    /// Resolve the release by tag, creating it on 404. Cached for the rest
    /// of the run.
    fn ensure_upload_url(&mut self) -> Result<String, PublishError> {
        if let Some(url) = &self.upload_url {
            return Ok(url.clone());
        }
        let url = format!(
            "{GITHUB_API_BASE}/repos/{}/releases/tags/{}",
            self.target.repo, self.target.tag
        );
        let response = self.authorized(self.client.get(&url)).send()?;
        let status = response.status();
        let release = if status.as_u16() == 404 {
            self.create_release()?
        } else if status.is_success() {
            response
                .json()
                .map_err(|err| PublishError::ReleaseCreation(format!("unreadable release: {err}")))?
        } else {
            let body = response.text().unwrap_or_default();
            return Err(PublishError::ReleaseCreation(failure_reason(
                status.as_u16(),
                &body,
            )));
        };

        let base = upload_base(&release.upload_url);
        if base.is_empty() {
            return Err(PublishError::ReleaseCreation(
                "release has no upload url".to_string(),
            ));
        }
        self.upload_url = Some(base.to_string());
        Ok(base.to_string())
    }
}

impl AssetPublisher for GithubReleasePublisher {
    fn publish(&mut self, name: &str, bytes: &[u8]) -> Result<String, PublishError> {
        let upload_url = self.ensure_upload_url()?;
        let response = self
            .authorized(self.client.post(&upload_url))
            .query(&[("name", name)])
            .header("Content-Type", "application/pdf")
            .body(bytes.to_vec())
            .send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(PublishError::Upload(failure_reason(status.as_u16(), &body)));
        }
        let asset: UploadedAsset = response
            .json()
            .map_err(|err| PublishError::Upload(format!("unreadable asset: {err}")))?;
        if asset.browser_download_url.is_empty() {
            return Err(PublishError::Upload(
                "asset has no browser_download_url".to_string(),
            ));
        }
        Ok(asset.browser_download_url)
    }
}
