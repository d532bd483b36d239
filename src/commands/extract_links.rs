use anyhow::Result;
use std::path::PathBuf;

use crate::commands::{CommandReport, read_index_text};
use crate::shelf::config::load_config;
use crate::shelf::links::collect_remote_links;
use crate::shelf::paths::resolve_paths;

#[derive(Debug, Clone, Default)]
pub struct ExtractLinksOptions {
    pub input: Option<PathBuf>,
}

pub fn run(opts: &ExtractLinksOptions) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let cfg = load_config()?;
    let mut report = CommandReport::new("extract-links");
    let input = opts.input.clone().unwrap_or(paths.index_file);

    let Some(text) = read_index_text(&input, &mut report)? else {
        return Ok(report);
    };
    let links = collect_remote_links(&text, &cfg.layout.binding)?;

    report.detail(format!("links={}", links.len()));
    for link in &links {
        report.detail(format!("{} -> {}", link.display_path(), link.file_id));
    }
    Ok(report)
}
