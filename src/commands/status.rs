use anyhow::Result;

use crate::commands::CommandReport;
use crate::shelf::builder::list_documents;
use crate::shelf::config::load_config;
use crate::shelf::mapping::UrlMapping;
use crate::shelf::paths::resolve_paths;

pub fn run() -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let cfg = load_config()?;
    let mut report = CommandReport::new("status");

    report.detail(format!("home={}", paths.home.display()));
    report.detail(format!("documents_dir={}", paths.documents_dir.display()));
    report.detail(format!("index_file={}", paths.index_file.display()));
    report.detail(format!("download_dir={}", paths.download_dir.display()));
    report.detail(format!("mapping_file={}", paths.mapping_file.display()));
    report.detail(format!("manifest_dir={}", paths.manifest_dir.display()));
    report.detail(format!("logs_dir={}", paths.logs_dir.display()));

    let taxonomy = &cfg.taxonomy;
    report.detail(format!(
        "taxonomy: years={} classes={} terms={} subjects={} cells={}",
        taxonomy.years.len(),
        taxonomy.classes.len(),
        taxonomy.terms.len(),
        taxonomy.subjects.len(),
        taxonomy.years.len() * taxonomy.classes.len() * taxonomy.terms.len() * taxonomy.subjects.len()
    ));
    report.detail(format!(
        "matching: token_fallback={} near_duplicate={}",
        cfg.matching.token_fallback, cfg.matching.near_duplicate
    ));
    let repo = if cfg.migrate.github_repo.is_empty() {
        "<unset>"
    } else {
        cfg.migrate.github_repo.as_str()
    };
    report.detail(format!(
        "migrate: repo={repo} release_tag={} checkpoint_every={}",
        cfg.migrate.release_tag, cfg.migrate.checkpoint_every
    ));

    if paths.documents_dir.is_dir() {
        let files = list_documents(&paths.documents_dir, &cfg.layout.extensions)?;
        report.detail(format!("documents_listed={}", files.len()));
    } else {
        report.issue(format!(
            "documents directory not found at {}",
            paths.documents_dir.display()
        ));
    }

    if !paths.index_file.is_file() {
        report.issue(format!(
            "index file not found at {}; run `docshelf build-index`",
            paths.index_file.display()
        ));
    }

    let mapping = UrlMapping::load(&paths.mapping_file)?;
    report.detail(format!("mapped_urls={}", mapping.len()));

    Ok(report)
}
