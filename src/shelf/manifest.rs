//! Content and code manifests consumed by the front end's updater.

use crate::shelf::filename::{FilenameParser, ParsedFilename};
use crate::shelf::util::write_text;
use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

pub const CONTENT_MANIFEST_FILE: &str = "content-manifest.json";
pub const CODE_MANIFEST_FILE: &str = "code-manifest.json";
const CONTENT_VERSION: &str = "1.0.0";
const DEFAULT_CODE_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum BumpKind {
    Major,
    Minor,
    Patch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDigest {
    pub file: String,
    pub hash: String,
    pub size: u64,
}

type TermMap = BTreeMap<String, FileDigest>;
type DocumentTree = BTreeMap<String, BTreeMap<String, BTreeMap<String, TermMap>>>;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentManifest {
    pub version: String,
    pub last_updated: String,
    pub base_url: String,
    pub documents: DocumentTree,
    pub study_materials: BTreeMap<String, FileDigest>,
    #[serde(skip)]
    pub unparsed: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeFileEntry {
    pub version: String,
    pub url: String,
    pub hash: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub kind: String,
    pub critical: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeManifest {
    pub version: String,
    pub last_updated: String,
    pub base_url: String,
    pub files: BTreeMap<String, CodeFileEntry>,
    #[serde(skip)]
    pub missing: Vec<String>,
}

pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file =
        fs::File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(format!("{:x}", hasher.finalize()))
}

fn digest(dir: &Path, name: &str) -> Result<FileDigest> {
    let path = dir.join(name);
    let size = fs::metadata(&path)
        .with_context(|| format!("failed to stat {}", path.display()))?
        .len();
    Ok(FileDigest {
        file: name.to_string(),
        hash: sha256_file(&path)?,
        size,
    })
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn bump_version(current: &str, kind: BumpKind) -> Result<String> {
    let mut version = semver::Version::parse(current.trim())
        .with_context(|| format!("invalid manifest version `{current}`"))?;
    match kind {
        BumpKind::Major => {
            version.major += 1;
            version.minor = 0;
            version.patch = 0;
        }
        BumpKind::Minor => {
            version.minor += 1;
            version.patch = 0;
        }
        BumpKind::Patch => version.patch += 1,
    }
    version.pre = semver::Prerelease::EMPTY;
    version.build = semver::BuildMetadata::EMPTY;
    Ok(version.to_string())
}

/// Version recorded in an existing code manifest, or the default when the
/// file is missing or unreadable.
pub fn current_code_version(path: &Path) -> String {
    let Ok(raw) = fs::read_to_string(path) else {
        return DEFAULT_CODE_VERSION.to_string();
    };
    match serde_json::from_str::<serde_json::Value>(&raw) {
        Ok(value) => value
            .get("version")
            .and_then(serde_json::Value::as_str)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(DEFAULT_CODE_VERSION)
            .to_string(),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "unreadable code manifest; using default version");
            DEFAULT_CODE_VERSION.to_string()
        }
    }
}

pub fn build_content_manifest(
    documents_dir: &Path,
    files: &[String],
    parser: &FilenameParser,
    base_url: &str,
) -> Result<ContentManifest> {
    let mut manifest = ContentManifest {
        version: CONTENT_VERSION.to_string(),
        last_updated: timestamp(),
        base_url: format!("{base_url}content-v{CONTENT_VERSION}/"),
        documents: BTreeMap::new(),
        study_materials: BTreeMap::new(),
        unparsed: Vec::new(),
    };

    for name in files {
        match parser.parse(name) {
            Some(ParsedFilename::Exam(key)) => {
                let entry = digest(documents_dir, name)?;
                manifest
                    .documents
                    .entry(key.year)
                    .or_default()
                    .entry(key.class_label)
                    .or_default()
                    .entry(key.term)
                    .or_default()
                    .entry(key.subject)
                    .or_insert(entry);
            }
            Some(ParsedFilename::Misc { label }) => {
                let entry = digest(documents_dir, name)?;
                manifest.study_materials.entry(label).or_insert(entry);
            }
            None => manifest.unparsed.push(name.clone()),
        }
    }
    Ok(manifest)
}

pub fn build_code_manifest(
    code_dir: &Path,
    code_files: &[String],
    critical_markers: &[String],
    base_url: &str,
    version: &str,
) -> Result<CodeManifest> {
    let mut manifest = CodeManifest {
        version: version.to_string(),
        last_updated: timestamp(),
        base_url: format!("{base_url}src/"),
        files: BTreeMap::new(),
        missing: Vec::new(),
    };

    for rel in code_files {
        let path = code_dir.join(rel);
        if !path.is_file() {
            manifest.missing.push(rel.clone());
            continue;
        }
        let size = fs::metadata(&path)
            .with_context(|| format!("failed to stat {}", path.display()))?
            .len();
        let kind = if rel.ends_with(".css") { "css" } else { "js" };
        manifest.files.insert(
            rel.clone(),
            CodeFileEntry {
                version: version.to_string(),
                url: format!("{base_url}src/{rel}"),
                hash: sha256_file(&path)?,
                size,
                kind: kind.to_string(),
                critical: critical_markers.iter().any(|m| rel.contains(m.as_str())),
            },
        );
    }
    Ok(manifest)
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let data = serde_json::to_string_pretty(value)?;
    write_text(path, &format!("{data}\n"))
}
