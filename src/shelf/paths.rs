use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ShelfPaths {
    pub home: PathBuf,
    pub documents_dir: PathBuf,
    pub index_file: PathBuf,
    pub download_dir: PathBuf,
    pub mapping_file: PathBuf,
    pub manifest_dir: PathBuf,
    pub code_dir: PathBuf,
    pub logs_dir: PathBuf,
}

fn env_or_default_path(var: &str, fallback: PathBuf) -> PathBuf {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => fallback,
    }
}

pub fn resolve_paths() -> Result<ShelfPaths> {
    let cwd = env::current_dir().context("current directory could not be resolved")?;
    let home = env_or_default_path("DOCSHELF_HOME", cwd);

    let documents_dir = env_or_default_path("DOCSHELF_DOCUMENTS_DIR", home.join("src/documents"));
    let index_file = env_or_default_path(
        "DOCSHELF_INDEX_FILE",
        home.join("scripts/full_documents_object.js"),
    );
    let download_dir = env_or_default_path(
        "DOCSHELF_DOWNLOAD_DIR",
        home.join("scripts/downloaded_pdfs"),
    );
    let mapping_file = env_or_default_path(
        "DOCSHELF_MAPPING_FILE",
        home.join("scripts/url_mapping.json"),
    );
    let manifest_dir = env_or_default_path("DOCSHELF_MANIFEST_DIR", home.clone());
    let code_dir = env_or_default_path("DOCSHELF_CODE_DIR", home.join("src"));
    let logs_dir = env_or_default_path("DOCSHELF_LOGS_DIR", home.join(".docshelf/logs"));

    Ok(ShelfPaths {
        home,
        documents_dir,
        index_file,
        download_dir,
        mapping_file,
        manifest_dir,
        code_dir,
        logs_dir,
    })
}

#[cfg(test)]
pub fn test_paths(root: &std::path::Path) -> ShelfPaths {
    ShelfPaths {
        home: root.to_path_buf(),
        documents_dir: root.join("src/documents"),
        index_file: root.join("scripts/full_documents_object.js"),
        download_dir: root.join("scripts/downloaded_pdfs"),
        mapping_file: root.join("scripts/url_mapping.json"),
        manifest_dir: root.to_path_buf(),
        code_dir: root.join("src"),
        logs_dir: root.join(".docshelf/logs"),
    }
}
