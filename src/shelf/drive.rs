//! Google Drive downloads.

use crate::error::FetchError;
use crate::shelf::util::truncate_with_ellipsis;
use regex::Regex;
use reqwest::blocking::{Client, Response};
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use std::sync::LazyLock;
use std::time::Duration;

const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3/files";
const PUBLIC_DOWNLOAD_URL: &str = "https://drive.google.com/uc?export=download&id=";
const CONFIRM_DOWNLOAD_URL: &str = "https://drive.usercontent.google.com/download";
const NATIVE_MIME_PREFIX: &str = "application/vnd.google-apps";
const REQUEST_TIMEOUT_SECS: u64 = 120;
const MAX_REASON_CHARS: usize = 80;

static CONFIRM_INPUT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"name="confirm"\s+value="([0-9A-Za-z_-]+)""#).expect("valid regex")
});
static CONFIRM_QUERY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bconfirm=([0-9A-Za-z_-]+)").expect("valid regex"));
static UUID_INPUT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"name="uuid"\s+value="([0-9A-Za-z_-]+)""#).expect("valid regex")
});

#[derive(Debug, Clone)]
pub struct FetchedAsset {
    pub bytes: Vec<u8>,
    pub size: u64,
}

pub trait AssetFetcher {
    fn fetch(&self, file_id: &str) -> Result<FetchedAsset, FetchError>;
}

#[derive(Debug, Deserialize)]
struct DriveMetadata {
    #[serde(default)]
    name: String,
    #[serde(rename = "mimeType", default)]
    mime_type: String,
}

pub struct GoogleDriveFetcher {
    client: Client,
    access_token: Option<String>,
    min_valid_bytes: u64,
}

/// Map an HTTP failure onto the fetch error classes.
pub fn classify_failure(status: u16, body: &str) -> FetchError {
    let reason = truncate_with_ellipsis(body.trim(), MAX_REASON_CHARS);
    let lower = body.to_ascii_lowercase();
    if status == 404 || lower.contains("file not found") {
        return FetchError::NotFound(format!("http {status}: no such file or no access"));
    }
    if status == 429 || (status == 403 && lower.contains("ratelimit")) || lower.contains("rate limit")
    {
        return FetchError::RateLimited(format!("http {status}: wait and retry"));
    }
    FetchError::Other(format!("http {status}: {reason}"))
}

pub fn validate_file_id(file_id: &str) -> Result<(), FetchError> {
    let trimmed = file_id.trim();
    if trimmed.is_empty() || trimmed == "FILE_ID" || trimmed == "#" {
        return Err(FetchError::InvalidIdentifier(file_id.to_string()));
    }
    Ok(())
}

/// Reject public downloads too small to be a document.
pub fn check_payload(bytes: Vec<u8>, min_valid_bytes: u64) -> Result<FetchedAsset, FetchError> {
    let size = bytes.len() as u64;
    if size <= min_valid_bytes {
        return Err(FetchError::Other(format!(
            "response too small ({size} bytes); expected more than {min_valid_bytes}"
        )));
    }
    Ok(FetchedAsset { bytes, size })
}

/// Authenticated API responses carry the file itself, whatever its size.
pub fn api_payload(bytes: Vec<u8>) -> FetchedAsset {
    FetchedAsset {
        size: bytes.len() as u64,
        bytes,
    }
}

/// True when a download answered with a web page instead of file content.
pub fn is_html_page(content_type: Option<&str>, bytes: &[u8]) -> bool {
    if content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("text/html")) {
        return true;
    }
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(256)]).to_ascii_lowercase();
    let head = head.trim_start();
    head.starts_with("<!doctype html") || head.starts_with("<html")
}

/// Download URL carried by the large-file confirmation page, if any.
pub fn confirm_download_url(file_id: &str, page: &str) -> Option<String> {
    let confirm = CONFIRM_INPUT
        .captures(page)
        .or_else(|| CONFIRM_QUERY.captures(page))?
        .get(1)?
        .as_str();
    let mut url = format!("{CONFIRM_DOWNLOAD_URL}?id={file_id}&export=download&confirm={confirm}");
    if let Some(uuid) = UUID_INPUT.captures(page).and_then(|caps| caps.get(1)) {
        url.push_str("&uuid=");
        url.push_str(uuid.as_str());
    }
    Some(url)
}

fn html_page_error() -> FetchError {
    FetchError::Other("received an html page instead of the document".to_string())
}

impl GoogleDriveFetcher {
    pub fn new(access_token: Option<String>, min_valid_bytes: u64) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        let access_token = access_token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        Ok(Self {
            client,
            access_token,
            min_valid_bytes,
        })
    }

    pub fn uses_api(&self) -> bool {
        self.access_token.is_some()
    }

    fn read_success(response: Response) -> Result<Vec<u8>, FetchError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(classify_failure(status.as_u16(), &body));
        }
        Ok(response.bytes()?.to_vec())
    }

    /// Body of a successful response and whether it is an html page.
    fn read_document(response: Response) -> Result<(Vec<u8>, bool), FetchError> {
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = Self::read_success(response)?;
        let html = is_html_page(content_type.as_deref(), &bytes);
        Ok((bytes, html))
    }

    fn fetch_with_token(&self, file_id: &str, token: &str) -> Result<Vec<u8>, FetchError> {
        let meta_url = format!("{DRIVE_API_BASE}/{file_id}?fields=name,mimeType,size");
        let response = self.client.get(&meta_url).bearer_auth(token).send()?;
        let meta_bytes = Self::read_success(response)?;
        let meta: DriveMetadata = serde_json::from_slice(&meta_bytes)
            .map_err(|err| FetchError::Other(format!("unreadable metadata: {err}")))?;
        tracing::debug!(file_id, name = %meta.name, mime = %meta.mime_type, "drive metadata");

        let content_url = if meta.mime_type.starts_with(NATIVE_MIME_PREFIX) {
            format!("{DRIVE_API_BASE}/{file_id}/export?mimeType=application/pdf")
        } else {
            format!("{DRIVE_API_BASE}/{file_id}?alt=media")
        };
        let response = self.client.get(&content_url).bearer_auth(token).send()?;
        Self::read_success(response)
    }

    fn fetch_public(&self, file_id: &str) -> Result<FetchedAsset, FetchError> {
        let url = format!("{PUBLIC_DOWNLOAD_URL}{file_id}");
        let (bytes, html) = Self::read_document(self.client.get(&url).send()?)?;
        if !html {
            return check_payload(bytes, self.min_valid_bytes);
        }

        let page = String::from_utf8_lossy(&bytes);
        let Some(confirm_url) = confirm_download_url(file_id, &page) else {
            return Err(html_page_error());
        };
        tracing::debug!(file_id, "following download confirmation");
        let (bytes, html) = Self::read_document(self.client.get(&confirm_url).send()?)?;
        if html {
            return Err(html_page_error());
        }
        check_payload(bytes, self.min_valid_bytes)
    }
}

impl AssetFetcher for GoogleDriveFetcher {
    fn fetch(&self, file_id: &str) -> Result<FetchedAsset, FetchError> {
        validate_file_id(file_id)?;
        match self.access_token.as_deref() {
            Some(token) => Ok(api_payload(self.fetch_with_token(file_id, token)?)),
            None => self.fetch_public(file_id),
        }
    }
}
