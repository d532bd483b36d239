use anyhow::Result;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::commands::fetch::{drive_token, report_failures};
use crate::commands::{CommandReport, read_index_text};
use crate::shelf::audit;
use crate::shelf::config::{load_config, validate};
use crate::shelf::drive::GoogleDriveFetcher;
use crate::shelf::links::collect_remote_links;
use crate::shelf::mapping::UrlMapping;
use crate::shelf::migration::{RunOptions, migrate_all};
use crate::shelf::paths::resolve_paths;
use crate::shelf::releases::{GithubReleasePublisher, ReleaseTarget};

pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";

#[derive(Debug, Clone, Default)]
pub struct MigrateOptions {
    pub input: Option<PathBuf>,
    pub upload: bool,
    pub token: Option<String>,
    pub repo: Option<String>,
    pub limit: Option<usize>,
}

fn resolve_token(opts: &MigrateOptions) -> Option<String> {
    opts.token
        .clone()
        .or_else(|| env::var(GITHUB_TOKEN_ENV).ok())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

pub fn run(opts: &MigrateOptions) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let mut cfg = load_config()?;
    if let Some(repo) = opts.repo.as_deref() {
        cfg.migrate.github_repo = repo.trim().to_string();
        validate(&cfg)?;
    }
    let mut report = CommandReport::new("migrate");
    let input = opts.input.clone().unwrap_or_else(|| paths.index_file.clone());

    let Some(text) = read_index_text(&input, &mut report)? else {
        return Ok(report);
    };
    let links = collect_remote_links(&text, &cfg.layout.binding)?;
    report.detail(format!("links={}", links.len()));
    if links.is_empty() {
        report.detail("no remote documents to process");
        return Ok(report);
    }

    let mut mapping = UrlMapping::load(&paths.mapping_file)?;
    report.detail(format!(
        "mapping_file={} existing={}",
        mapping.path().display(),
        mapping.len()
    ));

    let mut upload = opts.upload;
    let token = resolve_token(opts);
    if upload && token.is_none() {
        report.detail(format!(
            "upload needs a GitHub token: pass --token or set {GITHUB_TOKEN_ENV} (classic token with `repo` scope); continuing download-only"
        ));
        upload = false;
    }
    if upload && cfg.migrate.github_repo.is_empty() {
        report.issue(
            "upload needs a repository: pass --repo, set DOCSHELF_GITHUB_REPO, or set migrate.github_repo; continuing download-only",
        );
        upload = false;
    }

    let mut publisher = match (upload, token.as_deref()) {
        (true, Some(token)) => Some(GithubReleasePublisher::new(
            token,
            ReleaseTarget {
                repo: cfg.migrate.github_repo.clone(),
                tag: cfg.migrate.release_tag.clone(),
                name: cfg.migrate.release_name.clone(),
                body: cfg.migrate.release_body.clone(),
            },
        )?),
        _ => None,
    };
    if publisher.is_some() {
        report.detail(format!(
            "publishing to {} release {}",
            cfg.migrate.github_repo, cfg.migrate.release_tag
        ));
    }

    let fetcher = GoogleDriveFetcher::new(drive_token(), cfg.migrate.min_valid_bytes)?;
    let run_opts = RunOptions {
        download_dir: paths.download_dir.clone(),
        delay: Duration::from_millis(cfg.migrate.migrate_delay_ms),
        checkpoint_every: cfg.migrate.checkpoint_every,
        min_valid_bytes: cfg.migrate.min_valid_bytes,
        limit: opts.limit,
    };

    audit::append_event(
        &paths,
        "migrate",
        "started",
        &format!("links={} upload={}", links.len(), publisher.is_some()),
    )?;
    let stats = migrate_all(&links, &fetcher, publisher.as_mut(), &mut mapping, &run_opts)?;
    audit::append_event(
        &paths,
        "migrate",
        "completed",
        &format!(
            "downloaded={} uploaded={} skipped={} failed={}",
            stats.downloaded, stats.uploaded, stats.skipped_mapped, stats.failed
        ),
    )?;

    report.detail(format!(
        "processed={} downloaded={} already_present={} uploaded={} skipped_mapped={} failed={}",
        stats.total,
        stats.downloaded,
        stats.already_present,
        stats.uploaded,
        stats.skipped_mapped,
        stats.failed
    ));
    report_failures(&mut report, &stats, "migrate");

    if !mapping.is_empty() {
        report.detail(format!(
            "mapped_urls={}; run `docshelf apply-mapping` to rewrite the index",
            mapping.len()
        ));
    }
    if !upload {
        report.detail("to publish, rerun with `docshelf migrate --upload --token <TOKEN>`");
    }
    Ok(report)
}
