use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxonomyConfig {
    pub years: Vec<String>,
    pub classes: Vec<String>,
    pub terms: Vec<String>,
    pub subjects: Vec<String>,
}

impl Default for TaxonomyConfig {
    fn default() -> Self {
        Self {
            years: strings(&[
                "2020-21", "2021-22", "2022-23", "2023-24", "2024-25", "2025-26",
            ]),
            classes: strings(&["Class 9", "Class 10", "Class 11", "Class 12"]),
            terms: strings(&["MT 1", "MT 2", "HY", "FT"]),
            subjects: strings(&[
                "Bengali",
                "Biology",
                "Chemistry",
                "Commerce",
                "Computer",
                "Economics",
                "English Language",
                "English Literature",
                "EVA",
                "EVS",
                "French",
                "Geography",
                "German",
                "Hindi",
                "History",
                "Home Science",
                "Math",
                "PE",
                "Physics",
                "RAI",
            ]),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Prepended to a matched filename to form the resolved reference.
    pub link_prefix: String,
    pub placeholder: String,
    pub binding: String,
    pub misc_label: String,
    pub misc_strip_prefix: String,
    pub extensions: Vec<String>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            link_prefix: "documents/".to_string(),
            placeholder: "#".to_string(),
            binding: "documents".to_string(),
            misc_label: "Study Materials".to_string(),
            misc_strip_prefix: "Study_Material_Class_9_".to_string(),
            extensions: strings(&["pdf"]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NearDuplicatePolicy {
    #[default]
    Exact,
    Containment,
    Off,
}

impl NearDuplicatePolicy {
    pub fn label(self) -> &'static str {
        match self {
            NearDuplicatePolicy::Exact => "exact",
            NearDuplicatePolicy::Containment => "containment",
            NearDuplicatePolicy::Off => "off",
        }
    }
}

impl fmt::Display for NearDuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for NearDuplicatePolicy {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(NearDuplicatePolicy::Exact),
            "containment" => Ok(NearDuplicatePolicy::Containment),
            "off" | "none" => Ok(NearDuplicatePolicy::Off),
            other => Err(anyhow!(
                "invalid near-duplicate policy `{other}`: use `exact`, `containment`, or `off`"
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub token_fallback: bool,
    pub near_duplicate: NearDuplicatePolicy,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            token_fallback: true,
            near_duplicate: NearDuplicatePolicy::Exact,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrateConfig {
    pub github_repo: String,
    pub release_tag: String,
    pub release_name: String,
    pub release_body: String,
    pub fetch_delay_ms: u64,
    pub migrate_delay_ms: u64,
    pub checkpoint_every: usize,
    pub min_valid_bytes: u64,
}

impl Default for MigrateConfig {
    fn default() -> Self {
        Self {
            github_repo: String::new(),
            release_tag: "study-materials-v1".to_string(),
            release_name: "Study Materials PDFs".to_string(),
            release_body: "Study materials PDFs for offline access".to_string(),
            fetch_delay_ms: 200,
            migrate_delay_ms: 300,
            checkpoint_every: 10,
            min_valid_bytes: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestConfig {
    pub base_url: String,
    pub code_files: Vec<String>,
    pub critical_markers: Vec<String>,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            code_files: strings(&[
                "js/app.js",
                "js/contentUpdater.js",
                "js/hotUpdater.js",
                "css/styles.css",
            ]),
            critical_markers: strings(&["app.js", "hotUpdater"]),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ShelfConfig {
    pub taxonomy: TaxonomyConfig,
    pub layout: LayoutConfig,
    pub matching: MatchingConfig,
    pub migrate: MigrateConfig,
    pub manifest: ManifestConfig,
}

fn env_or_u64(var: &str, fallback: u64) -> u64 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u64>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_bool(var: &str, fallback: bool) -> bool {
    match env::var(var) {
        Ok(v) => match v.trim() {
            "1" | "true" | "TRUE" | "yes" | "on" => true,
            "0" | "false" | "FALSE" | "no" | "off" => false,
            _ => fallback,
        },
        Err(_) => fallback,
    }
}

fn env_or_string(var: &str, fallback: &str) -> String {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => fallback.to_string(),
    }
}

fn non_empty_axis(name: &str, values: &[String]) -> Result<()> {
    if values.iter().all(|v| v.trim().is_empty()) {
        return Err(anyhow!("invalid taxonomy: `{name}` must list at least one value"));
    }
    Ok(())
}

pub fn validate(cfg: &ShelfConfig) -> Result<()> {
    non_empty_axis("years", &cfg.taxonomy.years)?;
    non_empty_axis("classes", &cfg.taxonomy.classes)?;
    non_empty_axis("terms", &cfg.taxonomy.terms)?;
    non_empty_axis("subjects", &cfg.taxonomy.subjects)?;
    if cfg.layout.extensions.is_empty() {
        return Err(anyhow!("invalid layout: at least one document extension is required"));
    }
    if cfg.layout.binding.trim().is_empty() {
        return Err(anyhow!("invalid layout: binding name cannot be empty"));
    }
    if cfg.migrate.checkpoint_every == 0 {
        return Err(anyhow!("invalid migrate checkpoint interval: must be >= 1"));
    }
    let repo = cfg.migrate.github_repo.trim();
    if !repo.is_empty() {
        let valid = repo
            .split_once('/')
            .is_some_and(|(owner, name)| !owner.is_empty() && !name.is_empty() && !name.contains('/'));
        if !valid {
            return Err(anyhow!("invalid github repo `{repo}`: use `owner/name`"));
        }
    }
    if cfg.migrate.release_tag.trim().is_empty() {
        return Err(anyhow!("invalid release tag: cannot be empty"));
    }
    Ok(())
}

fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(custom) = env::var("DOCSHELF_CONFIG_PATH") {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }

    let local = PathBuf::from("docshelf.toml");
    if local.is_file() {
        return Some(local);
    }

    let home = dirs::home_dir()?;
    Some(home.join(".docshelf").join("docshelf.toml"))
}

pub fn parse_config(raw: &str) -> Result<ShelfConfig> {
    toml::from_str(raw).map_err(|err| anyhow!("failed to parse docshelf config: {err}"))
}

fn load_file_config() -> Result<ShelfConfig> {
    let Some(path) = resolve_config_path() else {
        return Ok(ShelfConfig::default());
    };
    if !path.exists() {
        return Ok(ShelfConfig::default());
    }

    let raw = fs::read_to_string(&path)
        .map_err(|err| anyhow!("failed to read docshelf config {}: {err}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded docshelf config file");
    parse_config(&raw).map_err(|err| anyhow!("{err} ({})", path.display()))
}

fn apply_env_overrides(cfg: &mut ShelfConfig) -> Result<()> {
    cfg.migrate.github_repo = env_or_string("DOCSHELF_GITHUB_REPO", &cfg.migrate.github_repo);
    cfg.migrate.release_tag = env_or_string("DOCSHELF_RELEASE_TAG", &cfg.migrate.release_tag);
    cfg.migrate.fetch_delay_ms = env_or_u64("DOCSHELF_FETCH_DELAY_MS", cfg.migrate.fetch_delay_ms);
    cfg.migrate.migrate_delay_ms =
        env_or_u64("DOCSHELF_MIGRATE_DELAY_MS", cfg.migrate.migrate_delay_ms);
    cfg.migrate.checkpoint_every = env_or_u64(
        "DOCSHELF_CHECKPOINT_EVERY",
        cfg.migrate.checkpoint_every as u64,
    ) as usize;
    cfg.migrate.min_valid_bytes =
        env_or_u64("DOCSHELF_MIN_VALID_BYTES", cfg.migrate.min_valid_bytes);
    cfg.matching.token_fallback =
        env_or_bool("DOCSHELF_TOKEN_FALLBACK", cfg.matching.token_fallback);
    if let Ok(raw) = env::var("DOCSHELF_NEAR_DUPLICATE")
        && !raw.trim().is_empty()
    {
        cfg.matching.near_duplicate = raw.parse()?;
    }
    cfg.manifest.base_url = env_or_string("DOCSHELF_MANIFEST_BASE_URL", &cfg.manifest.base_url);
    Ok(())
}

pub fn load_config() -> Result<ShelfConfig> {
    let mut cfg = load_file_config()?;
    apply_env_overrides(&mut cfg)?;
    validate(&cfg)?;
    Ok(cfg)
}
