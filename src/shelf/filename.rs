//! Filename parsing for `{year}_CL_{class}_{term}_{subject...}.ext` documents
//! and the misc-material prefix family.

use crate::shelf::util::{humanize, strip_prefix_ignore_ascii_case};
use std::collections::BTreeSet;
use std::path::Path;

const MISC_PREFIXES: [&str; 2] = ["Study_Material", "StudyMaterial"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamKey {
    pub year: String,
    pub class_label: String,
    pub term: String,
    pub subject: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedFilename {
    Exam(ExamKey),
    Misc { label: String },
}

/// Parses document filenames into key paths.
///
/// Multi-part term families (`MT` in `MT 1`) are derived from the configured
/// terms, so `MT_1`, `MT1`, and `MT` + `1` all resolve to `MT 1`.
#[derive(Debug, Clone)]
pub struct FilenameParser {
    term_families: BTreeSet<String>,
    misc_strip_prefix: String,
}

fn split_family(term: &str) -> Option<(String, String)> {
    let compact: String = term.split_whitespace().collect();
    let digits_at = compact.find(|c: char| c.is_ascii_digit())?;
    let (family, number) = compact.split_at(digits_at);
    if family.is_empty()
        || !family.chars().all(|c| c.is_ascii_alphabetic())
        || !number.chars().all(|c| c.is_ascii_digit())
    {
        return None;
    }
    Some((family.to_ascii_uppercase(), number.to_string()))
}

pub fn file_stem(filename: &str) -> &str {
    Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename)
}

impl FilenameParser {
    pub fn new(terms: &[String], misc_strip_prefix: &str) -> Self {
        let term_families = terms
            .iter()
            .filter_map(|term| split_family(term).map(|(family, _)| family))
            .collect();
        Self {
            term_families,
            misc_strip_prefix: misc_strip_prefix.to_string(),
        }
    }

    pub fn is_misc(filename: &str) -> bool {
        MISC_PREFIXES
            .iter()
            .any(|prefix| strip_prefix_ignore_ascii_case(filename, prefix).is_some())
    }

    fn misc_label(&self, stem: &str) -> String {
        let mut rest = stem;
        if !self.misc_strip_prefix.is_empty()
            && let Some(stripped) = strip_prefix_ignore_ascii_case(rest, &self.misc_strip_prefix)
        {
            rest = stripped;
        } else {
            for prefix in MISC_PREFIXES {
                if let Some(stripped) = strip_prefix_ignore_ascii_case(rest, prefix) {
                    rest = stripped;
                    break;
                }
            }
        }
        let label = humanize(rest);
        if label.is_empty() { humanize(stem) } else { label }
    }

    /// Returns the display term and the index of the first subject token.
    fn parse_term(&self, parts: &[&str], term_idx: usize) -> (String, usize) {
        let token = parts[term_idx].to_ascii_uppercase();

        if self.term_families.contains(&token)
            && let Some(next) = parts.get(term_idx + 1)
            && !next.is_empty()
            && next.chars().all(|c| c.is_ascii_digit())
        {
            return (format!("{token} {next}"), term_idx + 2);
        }

        if let Some((family, number)) = split_family(&token)
            && self.term_families.contains(&family)
        {
            return (format!("{family} {number}"), term_idx + 1);
        }

        (token, term_idx + 1)
    }

    pub fn parse(&self, filename: &str) -> Option<ParsedFilename> {
        let stem = file_stem(filename);

        if Self::is_misc(stem) {
            return Some(ParsedFilename::Misc {
                label: self.misc_label(stem),
            });
        }

        let parts: Vec<&str> = stem.split('_').collect();
        if parts.len() < 4 {
            tracing::debug!(filename, "skipping filename with fewer than 4 tokens");
            return None;
        }

        let year = parts[0].trim();
        let class_number = parts[2].trim();
        if year.is_empty() || !parts[1].eq_ignore_ascii_case("CL") || class_number.is_empty() {
            tracing::debug!(filename, "skipping filename without a year_CL_class prefix");
            return None;
        }

        let (term, subject_start) = self.parse_term(&parts, 3);
        let subject = humanize(&parts.get(subject_start..).unwrap_or_default().join("_"));
        if subject.is_empty() {
            tracing::debug!(filename, "skipping filename without a subject");
            return None;
        }

        Some(ParsedFilename::Exam(ExamKey {
            year: year.to_string(),
            class_label: format!("Class {class_number}"),
            term,
            subject,
        }))
    }
}
