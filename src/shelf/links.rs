//! Remote-provider links inside a serialized document index.

use crate::shelf::serialize::{locate_object_literal, parse_object_literal};
use anyhow::Result;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::LazyLock;

const PROVIDER_HOSTS: [&str; 2] = ["drive.google.com", "docs.google.com"];
const PLACEHOLDER_ID: &str = "FILE_ID";

static FILE_PATH_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/file/d/([A-Za-z0-9_-]{20,})").expect("valid regex"));
static DOCUMENT_PATH_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/document/d/([A-Za-z0-9_-]{20,})").expect("valid regex"));
static QUERY_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&]id=([A-Za-z0-9_-]{20,})").expect("valid regex"));
static QUOTED_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""([^"\\]+)"\s*:\s*"(https://(?:drive|docs)\.google\.com[^"]*)""#)
        .expect("valid regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteLink {
    pub path: Vec<String>,
    pub url: String,
    pub file_id: String,
}

impl RemoteLink {
    pub fn display_path(&self) -> String {
        self.path.join(" > ")
    }
}

pub fn is_provider_url(url: &str) -> bool {
    PROVIDER_HOSTS.iter().any(|host| url.contains(host))
}

/// Stable identifier embedded in a provider URL, if any.
pub fn extract_file_id(url: &str) -> Option<String> {
    if url.contains(PLACEHOLDER_ID) {
        return None;
    }
    [&*FILE_PATH_ID, &*DOCUMENT_PATH_ID, &*QUERY_ID]
        .iter()
        .find_map(|re| re.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

struct Collector {
    seen: BTreeSet<String>,
    links: Vec<RemoteLink>,
}

impl Collector {
    fn new() -> Self {
        Self {
            seen: BTreeSet::new(),
            links: Vec::new(),
        }
    }

    fn offer(&mut self, path: Vec<String>, url: &str) {
        if !is_provider_url(url) {
            return;
        }
        let Some(file_id) = extract_file_id(url) else {
            tracing::debug!(url, "provider link without a usable identifier");
            return;
        };
        if !self.seen.insert(file_id.clone()) {
            return;
        }
        self.links.push(RemoteLink {
            path,
            url: url.to_string(),
            file_id,
        });
    }

    fn walk(&mut self, node: &Value, path: &mut Vec<String>) {
        match node {
            Value::Object(map) => {
                for (key, child) in map {
                    path.push(key.clone());
                    self.walk(child, path);
                    path.pop();
                }
            }
            Value::Array(items) => {
                for (i, child) in items.iter().enumerate() {
                    path.push(i.to_string());
                    self.walk(child, path);
                    path.pop();
                }
            }
            Value::String(url) => self.offer(path.clone(), url),
            _ => {}
        }
    }
}

/// Provider links from an already parsed index tree, in document order,
/// first occurrence of each identifier only.
pub fn links_in_value(root: &Value) -> Vec<RemoteLink> {
    let mut collector = Collector::new();
    collector.walk(root, &mut Vec::new());
    collector.links
}

fn scan_quoted_pairs(text: &str) -> Vec<RemoteLink> {
    let mut collector = Collector::new();
    for caps in QUOTED_PAIR.captures_iter(text) {
        let (Some(key), Some(url)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        collector.offer(vec![key.as_str().to_string()], url.as_str());
    }
    collector.links
}

/// Provider links from the text of an index artifact. When the `binding`
/// assignment cannot be found, falls back to scanning quoted
/// `"key": "https://..."` pairs anywhere in the text.
pub fn collect_remote_links(text: &str, binding: &str) -> Result<Vec<RemoteLink>> {
    match locate_object_literal(text, binding) {
        Some(literal) => {
            let root = parse_object_literal(literal)?;
            Ok(links_in_value(&root))
        }
        None => {
            tracing::warn!(binding, "index assignment not found; scanning quoted pairs");
            Ok(scan_quoted_pairs(text))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "ABCDEFGHIJKLMNOPQRST1234";

    #[test]
    fn extracts_all_three_url_shapes() {
        assert_eq!(
            extract_file_id(&format!("https://drive.google.com/file/d/{ID}/view")),
            Some(ID.to_string())
        );
        assert_eq!(
            extract_file_id(&format!("https://docs.google.com/document/d/{ID}/edit")),
            Some(ID.to_string())
        );
        assert_eq!(
            extract_file_id(&format!("https://drive.google.com/open?id={ID}&usp=sharing")),
            Some(ID.to_string())
        );
    }

    #[test]
    fn rejects_placeholders_and_short_ids() {
        assert_eq!(extract_file_id("https://drive.google.com/file/d/FILE_ID/view"), None);
        assert_eq!(
            extract_file_id("https://drive.google.com/file/d/FILE_ID_GOES_HERE_PLEASE/view"),
            None
        );
        assert_eq!(
            extract_file_id("https://drive.google.com/open?id=FILE_ID_FOR_THIS_DOCUMENT"),
            None
        );
        assert_eq!(extract_file_id("https://drive.google.com/file/d/short/view"), None);
        assert_eq!(extract_file_id("#"), None);
    }

    #[test]
    fn collects_full_key_paths_in_document_order() {
        let text = format!(
            r##"let documents = {{
    "2021-22": {{
        "Class 9": {{
            "FT": {{
                "Math": "https://drive.google.com/file/d/{ID}/view",
                "Physics": "documents/local.pdf",
                "Bengali": "#",
                "Chemistry": "https://drive.google.com/file/d/FILE_ID/view"
            }}
        }}
    }},
    "Study Materials": {{
        "Optics": "https://docs.google.com/document/d/ZYXWVUTSRQPONMLKJIHG9876/edit"
    }}
}};"##
        );
        let links = collect_remote_links(&text, "documents").expect("links");
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].path, vec!["2021-22", "Class 9", "FT", "Math"]);
        assert_eq!(links[0].file_id, ID);
        assert_eq!(links[1].path, vec!["Study Materials", "Optics"]);
        assert_eq!(links[1].display_path(), "Study Materials > Optics");
    }

    #[test]
    fn duplicate_identifiers_keep_first_occurrence() {
        let text = format!(
            r#"const documents = {{
    a: "https://drive.google.com/file/d/{ID}/view",
    b: "https://drive.google.com/open?id={ID}",
}};"#
        );
        let links = collect_remote_links(&text, "documents").expect("links");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].path, vec!["a"]);
    }

    #[test]
    fn falls_back_to_quoted_pair_scan_without_assignment() {
        let text = format!(
            r#"window.data = {{ "Math": "https://drive.google.com/file/d/{ID}/view" }};"#
        );
        let links = collect_remote_links(&text, "documents").expect("links");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].path, vec!["Math"]);
    }

    #[test]
    fn malformed_literal_is_an_error() {
        let text = "let documents = { \"a\": [1, };";
        assert!(collect_remote_links(text, "documents").is_err());
    }
}
