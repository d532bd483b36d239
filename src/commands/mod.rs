pub mod apply_mapping;
pub mod build_index;
pub mod extract_links;
pub mod fetch;
pub mod manifest;
pub mod migrate;
pub mod status;

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    pub command: String,
    pub ok: bool,
    pub details: Vec<String>,
    pub issues: Vec<String>,
}

impl CommandReport {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ok: true,
            details: Vec::new(),
            issues: Vec::new(),
        }
    }

    pub fn detail(&mut self, text: impl Into<String>) {
        self.details.push(text.into());
    }

    pub fn issue(&mut self, text: impl Into<String>) {
        self.ok = false;
        self.issues.push(text.into());
    }
}

/// Text of the serialized index at `path`, or `None` with an issue recorded
/// when the file is missing.
pub fn read_index_text(path: &Path, report: &mut CommandReport) -> Result<Option<String>> {
    report.detail(format!("index_file={}", path.display()));
    if !path.is_file() {
        report.issue(format!(
            "index file not found at {}; run `docshelf build-index` or pass --input",
            path.display()
        ));
        return Ok(None);
    }
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(Some(text))
}
