use crate::shelf::util::write_text;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Persisted old-URL to new-URL mapping. A key being present means the
/// document was already published and must not be published again.
#[derive(Debug, Clone)]
pub struct UrlMapping {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl UrlMapping {
    pub fn load(path: &Path) -> Result<Self> {
        let entries = if path.exists() {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            if raw.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&raw)
                    .with_context(|| format!("failed to parse {}", path.display()))?
            }
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, old_url: &str) -> bool {
        self.entries.contains_key(old_url)
    }

    #[cfg(test)]
    pub fn get(&self, old_url: &str) -> Option<&str> {
        self.entries.get(old_url).map(String::as_str)
    }

    pub fn insert(&mut self, old_url: &str, new_url: &str) {
        self.entries.insert(old_url.to_string(), new_url.to_string());
    }

    /// Replace every quoted occurrence of a mapped old URL with its new URL.
    /// Returns the rewritten text and how many distinct URLs were replaced.
    pub fn rewrite(&self, text: &str) -> (String, usize) {
        let mut out = text.to_string();
        let mut replaced = 0usize;
        for (old_url, new_url) in &self.entries {
            let quoted_old = format!("\"{old_url}\"");
            if !out.contains(&quoted_old) {
                continue;
            }
            out = out.replace(&quoted_old, &format!("\"{new_url}\""));
            replaced += 1;
        }
        (out, replaced)
    }

    pub fn save(&self) -> Result<()> {
        let data = serde_json::to_string_pretty(&self.entries)?;
        write_text(&self.path, &format!("{data}\n"))
    }
}
