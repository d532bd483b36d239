//! Batch download and publish of remote documents, resumable across runs.

use crate::shelf::drive::AssetFetcher;
use crate::shelf::links::RemoteLink;
use crate::shelf::mapping::UrlMapping;
use crate::shelf::releases::AssetPublisher;
use crate::shelf::util::file_size;
use crate::shelf::warn::{self, WarnEvent};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

const MAX_NAME_PATH_CHARS: usize = 80;
const SHORT_ID_CHARS: usize = 8;
const INVALID_NAME_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];
const LOCAL_IO_CODE: &str = "LOCAL_IO";

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub download_dir: PathBuf,
    pub delay: Duration,
    pub checkpoint_every: usize,
    pub min_valid_bytes: u64,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStats {
    pub total: usize,
    pub downloaded: usize,
    pub already_present: usize,
    pub uploaded: usize,
    pub skipped_mapped: usize,
    pub failed: usize,
    pub failures: Vec<String>,
}

impl RunStats {
    fn fail(&mut self, link: &RemoteLink, reason: &str) {
        self.failed += 1;
        self.failures
            .push(format!("{} ({}): {reason}", link.display_path(), link.file_id));
    }
}

/// Download filename for fetch-only runs: the full key path joined with
/// underscores, filesystem-hostile characters and whitespace replaced.
pub fn download_name(path: &[String]) -> String {
    let joined = path.join("_");
    let trimmed = match joined.len().checked_sub(4) {
        Some(cut) if joined.is_char_boundary(cut) && joined[cut..].eq_ignore_ascii_case("_pdf") => {
            &joined[..cut]
        }
        _ => joined.as_str(),
    };
    let cleaned: String = trimmed
        .chars()
        .map(|c| if INVALID_NAME_CHARS.contains(&c) { '_' } else { c })
        .collect();
    let mut name = cleaned.split_whitespace().collect::<Vec<_>>().join("_");
    if !name.to_ascii_lowercase().ends_with(".pdf") {
        name.push_str(".pdf");
    }
    name
}

/// Asset filename for migration runs:
/// `{path restricted to [A-Za-z0-9_-], at most 80 chars}_{id prefix}.pdf`.
pub fn migration_name(path: &[String], file_id: &str) -> String {
    let joined = path.join("_");
    let mut sanitized = String::with_capacity(joined.len());
    for c in joined.chars() {
        let c = if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            c
        } else {
            '_'
        };
        if c == '_' && sanitized.ends_with('_') {
            continue;
        }
        sanitized.push(c);
    }
    let mut stem = sanitized.trim_matches('_').to_string();
    stem.truncate(MAX_NAME_PATH_CHARS);
    let short_id: String = file_id.chars().take(SHORT_ID_CHARS).collect();
    format!("{stem}_{short_id}.pdf")
}

fn present_on_disk(path: &Path, min_valid_bytes: u64) -> Option<u64> {
    file_size(path).filter(|size| *size > min_valid_bytes)
}

fn prepare(opts: &RunOptions, links: &[RemoteLink]) -> Result<usize> {
    fs::create_dir_all(&opts.download_dir)
        .with_context(|| format!("failed to create {}", opts.download_dir.display()))?;
    Ok(opts.limit.map_or(links.len(), |limit| limit.min(links.len())))
}

enum LocalCopy {
    Fresh(Vec<u8>),
    Present,
    Failed,
}

fn warn_failure(stats: &mut RunStats, link: &RemoteLink, code: &str, stage: &str, reason: &str) {
    warn::emit(&WarnEvent {
        code,
        stage,
        item: &link.display_path(),
        file_id: &link.file_id,
        retry: "next-run",
        reason,
    });
    stats.fail(link, reason);
}

/// Download into `target` unless a valid copy is already there. Fetch and
/// local write failures are recorded against the item.
fn download_into<F: AssetFetcher>(
    fetcher: &F,
    link: &RemoteLink,
    target: &Path,
    opts: &RunOptions,
    stats: &mut RunStats,
) -> LocalCopy {
    if let Some(size) = present_on_disk(target, opts.min_valid_bytes) {
        tracing::info!(path = %link.display_path(), size, "already downloaded");
        stats.already_present += 1;
        return LocalCopy::Present;
    }
    match fetcher.fetch(&link.file_id) {
        Ok(asset) => {
            if let Err(err) = fs::write(target, &asset.bytes) {
                let reason = format!("failed to write {}: {err}", target.display());
                warn_failure(stats, link, LOCAL_IO_CODE, "store", &reason);
                return LocalCopy::Failed;
            }
            tracing::info!(path = %link.display_path(), size = asset.size, "downloaded");
            stats.downloaded += 1;
            LocalCopy::Fresh(asset.bytes)
        }
        Err(err) => {
            warn_failure(stats, link, err.code(), "fetch", &err.to_string());
            LocalCopy::Failed
        }
    }
}

fn local_bytes(
    fresh: Option<Vec<u8>>,
    target: &Path,
    link: &RemoteLink,
    stats: &mut RunStats,
) -> Option<Vec<u8>> {
    if fresh.is_some() {
        return fresh;
    }
    match fs::read(target) {
        Ok(bytes) => Some(bytes),
        Err(err) => {
            let reason = format!("failed to read {}: {err}", target.display());
            warn_failure(stats, link, LOCAL_IO_CODE, "store", &reason);
            None
        }
    }
}

/// Fetch-only run: download every link into the download dir, skipping
/// files already present.
pub fn fetch_all<F: AssetFetcher>(
    links: &[RemoteLink],
    fetcher: &F,
    opts: &RunOptions,
) -> Result<RunStats> {
    let count = prepare(opts, links)?;
    let mut stats = RunStats {
        total: count,
        ..RunStats::default()
    };
    for link in &links[..count] {
        let target = opts.download_dir.join(download_name(&link.path));
        match download_into(fetcher, link, &target, opts, &mut stats) {
            LocalCopy::Present => continue,
            LocalCopy::Fresh(_) | LocalCopy::Failed => thread::sleep(opts.delay),
        }
    }
    Ok(stats)
}

/// Migration run: for each link not yet in `mapping`, make sure a local
/// copy exists and, when a publisher is given, publish it and record the
/// new URL. The mapping is saved every `checkpoint_every` items and at the
/// end, and only when something new was recorded.
pub fn migrate_all<F: AssetFetcher, P: AssetPublisher>(
    links: &[RemoteLink],
    fetcher: &F,
    mut publisher: Option<&mut P>,
    mapping: &mut UrlMapping,
    opts: &RunOptions,
) -> Result<RunStats> {
    let count = prepare(opts, links)?;
    let checkpoint_every = opts.checkpoint_every.max(1);
    let mut stats = RunStats {
        total: count,
        ..RunStats::default()
    };
    let mut unsaved = 0usize;

    for (i, link) in links[..count].iter().enumerate() {
        if mapping.contains(&link.url) {
            tracing::debug!(path = %link.display_path(), "already mapped");
            stats.skipped_mapped += 1;
            continue;
        }

        let name = migration_name(&link.path, &link.file_id);
        let target = opts.download_dir.join(&name);
        let fresh = match download_into(fetcher, link, &target, opts, &mut stats) {
            LocalCopy::Fresh(bytes) => Some(bytes),
            LocalCopy::Present => None,
            LocalCopy::Failed => {
                thread::sleep(opts.delay);
                continue;
            }
        };

        if let Some(publisher) = publisher.as_deref_mut()
            && let Some(bytes) = local_bytes(fresh, &target, link, &mut stats)
        {
            match publisher.publish(&name, &bytes) {
                Ok(new_url) => {
                    tracing::info!(path = %link.display_path(), url = %new_url, "published");
                    mapping.insert(&link.url, &new_url);
                    stats.uploaded += 1;
                    unsaved += 1;
                }
                Err(err) => {
                    warn_failure(&mut stats, link, err.code(), "publish", &err.to_string());
                }
            }
        }

        if unsaved > 0 && (i + 1) % checkpoint_every == 0 {
            mapping.save()?;
            unsaved = 0;
        }
        thread::sleep(opts.delay);
    }

    if unsaved > 0 {
        mapping.save()?;
    }
    Ok(stats)
}
