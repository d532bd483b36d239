use anyhow::Result;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::commands::{CommandReport, read_index_text};
use crate::shelf::audit;
use crate::shelf::config::load_config;
use crate::shelf::drive::GoogleDriveFetcher;
use crate::shelf::links::collect_remote_links;
use crate::shelf::migration::{RunOptions, RunStats, fetch_all};
use crate::shelf::paths::resolve_paths;

pub const DRIVE_TOKEN_ENV: &str = "GOOGLE_DRIVE_ACCESS_TOKEN";

#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub input: Option<PathBuf>,
    pub limit: Option<usize>,
}

pub fn drive_token() -> Option<String> {
    env::var(DRIVE_TOKEN_ENV)
        .ok()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

pub fn report_failures(report: &mut CommandReport, stats: &RunStats, verb: &str) {
    for failure in &stats.failures {
        report.detail(format!("failed: {failure}"));
    }
    if stats.failed > 0 {
        report.issue(format!(
            "{} item(s) failed to {verb}; rerun to retry",
            stats.failed
        ));
    }
}

pub fn run(opts: &FetchOptions) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let cfg = load_config()?;
    let mut report = CommandReport::new("fetch");
    let input = opts.input.clone().unwrap_or_else(|| paths.index_file.clone());

    let Some(text) = read_index_text(&input, &mut report)? else {
        return Ok(report);
    };
    let links = collect_remote_links(&text, &cfg.layout.binding)?;
    report.detail(format!("links={}", links.len()));
    report.detail(format!("download_dir={}", paths.download_dir.display()));
    if links.is_empty() {
        return Ok(report);
    }

    let fetcher = GoogleDriveFetcher::new(drive_token(), cfg.migrate.min_valid_bytes)?;
    if !fetcher.uses_api() {
        report.detail(format!(
            "{DRIVE_TOKEN_ENV} not set; using public download links (private files will fail)"
        ));
    }

    let run_opts = RunOptions {
        download_dir: paths.download_dir.clone(),
        delay: Duration::from_millis(cfg.migrate.fetch_delay_ms),
        checkpoint_every: cfg.migrate.checkpoint_every,
        min_valid_bytes: cfg.migrate.min_valid_bytes,
        limit: opts.limit,
    };
    audit::append_event(&paths, "fetch", "started", &format!("links={}", links.len()))?;
    let stats = fetch_all(&links, &fetcher, &run_opts)?;
    audit::append_event(
        &paths,
        "fetch",
        "completed",
        &format!(
            "downloaded={} already_present={} failed={}",
            stats.downloaded, stats.already_present, stats.failed
        ),
    )?;

    report.detail(format!(
        "processed={} downloaded={} already_present={} failed={}",
        stats.total, stats.downloaded, stats.already_present, stats.failed
    ));
    report_failures(&mut report, &stats, "download");
    Ok(report)
}
