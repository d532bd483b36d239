use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::commands::{CommandReport, read_index_text};
use crate::shelf::mapping::UrlMapping;
use crate::shelf::paths::resolve_paths;
use crate::shelf::util::write_text;

#[derive(Debug, Clone, Default)]
pub struct ApplyMappingOptions {
    pub input: Option<PathBuf>,
}

pub fn backup_path(path: &Path) -> PathBuf {
    let mut raw = path.as_os_str().to_os_string();
    raw.push(".backup");
    PathBuf::from(raw)
}

pub fn run(opts: &ApplyMappingOptions) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let mut report = CommandReport::new("apply-mapping");
    let input = opts.input.clone().unwrap_or_else(|| paths.index_file.clone());

    report.detail(format!("mapping_file={}", paths.mapping_file.display()));
    if !paths.mapping_file.is_file() {
        report.issue("no url mapping found; run `docshelf migrate --upload` first");
        return Ok(report);
    }
    let mapping = UrlMapping::load(&paths.mapping_file)?;
    if mapping.is_empty() {
        report.issue("url mapping is empty; run `docshelf migrate --upload` first");
        return Ok(report);
    }

    let Some(original) = read_index_text(&input, &mut report)? else {
        return Ok(report);
    };
    let (rewritten, replaced) = mapping.rewrite(&original);
    if replaced == 0 {
        report.detail("no changes: none of the mapped urls appear in the index");
        return Ok(report);
    }

    let backup = backup_path(&input);
    write_text(&backup, &original)?;
    write_text(&input, &rewritten)?;
    report.detail(format!("backup={}", backup.display()));
    report.detail(format!("updated {replaced} url(s)"));
    Ok(report)
}
