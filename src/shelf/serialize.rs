//! Rendering the index as a `let documents = {...};` literal and reading
//! such a literal back into a structured value.

use crate::shelf::index::{Branch, DocumentIndex, IndexNode};
use anyhow::{Context, Result};
use regex::Regex;
use serde_json::Value;

const INDENT: &str = "    ";

fn quote(raw: &str) -> String {
    Value::String(raw.to_string()).to_string()
}

fn render_branch(branch: &Branch, placeholder: &str, depth: usize, out: &mut String) {
    if branch.is_empty() {
        out.push_str("{}");
        return;
    }
    out.push_str("{\n");
    let indent = INDENT.repeat(depth + 1);
    let last = branch.len() - 1;
    for (i, (key, node)) in branch.iter().enumerate() {
        out.push_str(&indent);
        out.push_str(&quote(key));
        out.push_str(": ");
        match node {
            IndexNode::Branch(child) => render_branch(child, placeholder, depth + 1, out),
            IndexNode::Leaf(entry) => out.push_str(&quote(entry.render(placeholder))),
        }
        if i < last {
            out.push(',');
        }
        out.push('\n');
    }
    out.push_str(&INDENT.repeat(depth));
    out.push('}');
}

/// Render `let {binding} = {...};` with one key per line, four-space
/// indentation, and no trailing commas.
pub fn render_index(index: &DocumentIndex, binding: &str, placeholder: &str) -> String {
    let mut out = format!("let {binding} = ");
    render_branch(index.root(), placeholder, 0, &mut out);
    out.push_str(";\n");
    out
}

/// Byte length of the balanced `{...}` at the start of `text`, skipping
/// braces inside string literals.
fn balanced_object_len(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (pos, ch) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' | '`' => quote = Some(ch),
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(pos + ch.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}

/// The object literal assigned to `binding` via `let`, `const`, or `var`.
pub fn locate_object_literal<'a>(text: &'a str, binding: &str) -> Option<&'a str> {
    let pattern = format!(r"\b(?:let|const|var)\s+{}\s*=\s*", regex::escape(binding));
    let re = Regex::new(&pattern).ok()?;
    let found = re.find(text)?;
    let rest = &text[found.end()..];
    if !rest.starts_with('{') {
        return None;
    }
    let len = balanced_object_len(rest)?;
    Some(&rest[..len])
}

/// Parse an object literal (JSON5: quoted or bare keys, trailing commas,
/// comments) into an insertion-ordered value.
pub fn parse_object_literal(literal: &str) -> Result<Value> {
    json5::from_str::<Value>(literal).context("failed to parse document index literal")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shelf::index::DocumentEntry;

    fn sample_index() -> DocumentIndex {
        let mut index = DocumentIndex::new();
        index.insert_if_absent(
            &["2021-22", "Class 9", "FT", "Math"],
            DocumentEntry::Resolved("documents/2021-22_CL_9_FT_Math.pdf".to_string()),
        );
        index.insert_if_absent(&["2021-22", "Class 9", "FT", "Bengali"], DocumentEntry::Placeholder);
        index.insert_if_absent(
            &["Study Materials", "Optics \"notes\""],
            DocumentEntry::Resolved("documents/Study_Material_Optics.pdf".to_string()),
        );
        index
    }

    #[test]
    fn render_uses_one_key_per_line_without_trailing_commas() {
        let text = render_index(&sample_index(), "documents", "#");
        let expected = r##"let documents = {
    "2021-22": {
        "Class 9": {
            "FT": {
                "Math": "documents/2021-22_CL_9_FT_Math.pdf",
                "Bengali": "#"
            }
        }
    },
    "Study Materials": {
        "Optics \"notes\"": "documents/Study_Material_Optics.pdf"
    }
};
"##;
        assert_eq!(text, expected);
    }

    #[test]
    fn rendered_literal_round_trips_through_json5() {
        let index = sample_index();
        let text = render_index(&index, "documents", "#");
        let literal = locate_object_literal(&text, "documents").expect("literal");
        let parsed = parse_object_literal(literal).expect("parse");
        assert_eq!(parsed, index.to_value("#"));

        let keys: Vec<&String> = parsed.as_object().expect("object").keys().collect();
        assert_eq!(keys, vec!["2021-22", "Study Materials"]);
    }

    #[test]
    fn empty_index_renders_empty_object() {
        let text = render_index(&DocumentIndex::new(), "documents", "#");
        assert_eq!(text, "let documents = {};\n");
    }

    #[test]
    fn locate_skips_braces_inside_strings_and_other_bindings() {
        let text = r#"const theme = { a: 1 };
let documents = {
    "odd}key": { "x": "https://example.com/{id}" }, "y": '}'
};
function after() { return 1; }
"#;
        let literal = locate_object_literal(text, "documents").expect("literal");
        assert!(literal.starts_with('{'));
        assert!(literal.ends_with('}'));
        let parsed = parse_object_literal(literal).expect("parse");
        assert_eq!(parsed["odd}key"]["x"], "https://example.com/{id}");
        assert_eq!(parsed["y"], "}");
    }

    #[test]
    fn locate_returns_none_without_assignment() {
        assert!(locate_object_literal("var other = {};", "documents").is_none());
    }
}
