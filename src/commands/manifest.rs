use anyhow::Result;

use crate::commands::CommandReport;
use crate::shelf::builder::list_documents;
use crate::shelf::config::load_config;
use crate::shelf::filename::FilenameParser;
use crate::shelf::manifest::{
    BumpKind, CODE_MANIFEST_FILE, CONTENT_MANIFEST_FILE, build_code_manifest,
    build_content_manifest, bump_version, current_code_version, write_json,
};
use crate::shelf::paths::resolve_paths;

#[derive(Debug, Clone, Default)]
pub struct ManifestOptions {
    pub bump: Option<BumpKind>,
    pub code_files: Vec<String>,
}

pub fn run(opts: &ManifestOptions) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let cfg = load_config()?;
    let mut report = CommandReport::new("manifest");
    let base_url = cfg.manifest.base_url.as_str();

    if paths.documents_dir.is_dir() {
        let files = list_documents(&paths.documents_dir, &cfg.layout.extensions)?;
        let parser =
            FilenameParser::new(&cfg.taxonomy.terms, &cfg.layout.misc_strip_prefix);
        let content = build_content_manifest(&paths.documents_dir, &files, &parser, base_url)?;
        for name in &content.unparsed {
            report.detail(format!("could not parse: {name}"));
        }
        let out = paths.manifest_dir.join(CONTENT_MANIFEST_FILE);
        write_json(&out, &content)?;
        let total_bytes: u64 = content
            .documents
            .values()
            .flat_map(|classes| classes.values())
            .flat_map(|terms| terms.values())
            .flat_map(|subjects| subjects.values())
            .chain(content.study_materials.values())
            .map(|entry| entry.size)
            .sum();
        report.detail(format!(
            "content_manifest={} files={} bytes={total_bytes}",
            out.display(),
            files.len()
        ));
    } else {
        report.issue(format!(
            "documents directory not found at {}; content manifest skipped",
            paths.documents_dir.display()
        ));
    }

    let code_out = paths.manifest_dir.join(CODE_MANIFEST_FILE);
    let current = current_code_version(&code_out);
    let version = match opts.bump {
        Some(kind) => {
            let next = bump_version(&current, kind)?;
            report.detail(format!("bumped code version {current} -> {next}"));
            next
        }
        None => current,
    };
    let code_files = if opts.code_files.is_empty() {
        cfg.manifest.code_files.clone()
    } else {
        opts.code_files.clone()
    };
    let code = build_code_manifest(
        &paths.code_dir,
        &code_files,
        &cfg.manifest.critical_markers,
        base_url,
        &version,
    )?;
    for rel in &code.missing {
        report.detail(format!("code file not found: {rel}"));
    }
    write_json(&code_out, &code)?;
    report.detail(format!(
        "code_manifest={} version={} files={}",
        code_out.display(),
        code.version,
        code.files.len()
    ));
    Ok(report)
}
