use anyhow::Result;
use std::path::PathBuf;

use crate::commands::CommandReport;
use crate::shelf::builder::{IndexBuilder, list_documents};
use crate::shelf::config::load_config;
use crate::shelf::paths::resolve_paths;
use crate::shelf::serialize::render_index;
use crate::shelf::util::write_text;

#[derive(Debug, Clone, Default)]
pub struct BuildIndexOptions {
    pub discovered_only: bool,
    pub output: Option<PathBuf>,
    pub dry_run: bool,
}

pub fn run(opts: &BuildIndexOptions) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let cfg = load_config()?;
    let mut report = CommandReport::new("build-index");
    let output = opts.output.clone().unwrap_or(paths.index_file);

    report.detail(format!("documents_dir={}", paths.documents_dir.display()));
    report.detail(format!("output={}", output.display()));
    report.detail(format!(
        "mode={}",
        if opts.discovered_only { "discovered" } else { "taxonomy" }
    ));

    if !paths.documents_dir.is_dir() {
        report.issue(format!(
            "documents directory not found at {}",
            paths.documents_dir.display()
        ));
        return Ok(report);
    }

    let files = list_documents(&paths.documents_dir, &cfg.layout.extensions)?;
    let builder = IndexBuilder::new(&cfg);
    let built = if opts.discovered_only {
        builder.build_discovered(&files)
    } else {
        builder.build_taxonomy(&files)
    };
    let stats = &built.stats;

    report.detail(format!("listed={}", stats.listed));
    if !opts.discovered_only {
        report.detail(format!(
            "resolved={} placeholders={}",
            stats.resolved, stats.placeholders
        ));
        report.detail(format!(
            "extras={} suppressed_extras={} near_duplicate={}",
            stats.extras, stats.suppressed_extras, cfg.matching.near_duplicate
        ));
    }
    report.detail(format!("study_materials={}", stats.misc));
    if stats.duplicates > 0 {
        report.detail(format!("duplicates_skipped={}", stats.duplicates));
    }
    for file in &stats.unplaced {
        tracing::debug!(file = %file, "file not placed in index");
    }
    report.detail(format!("unplaced={}", stats.unplaced.len()));

    let text = render_index(&built.index, &cfg.layout.binding, &cfg.layout.placeholder);
    if opts.dry_run {
        report.detail(format!(
            "dry-run: would write {} bytes to {}",
            text.len(),
            output.display()
        ));
        return Ok(report);
    }

    write_text(&output, &text)?;
    report.detail(format!("wrote {} bytes", text.len()));
    Ok(report)
}
