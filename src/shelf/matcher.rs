use crate::shelf::config::NearDuplicatePolicy;
use crate::shelf::filename::file_stem;
use crate::shelf::util::{humanize, normalize_name, strip_prefix_ignore_ascii_case};
use std::collections::BTreeSet;

/// One `(year, class, term)` node of the taxonomy, with the filename forms
/// derived from it.
#[derive(Debug, Clone)]
pub struct TermSlot<'a> {
    pub year: &'a str,
    pub class_number: String,
    pub term_underscored: String,
    pub term_compact: String,
}

fn is_token_separator(c: char) -> bool {
    c == '_' || c == '-' || c.is_whitespace()
}

fn lowercase_tokens(text: &str) -> Vec<String> {
    text.split(is_token_separator)
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

pub fn class_number(class_label: &str) -> String {
    let trimmed = class_label.trim();
    trimmed
        .strip_prefix("Class ")
        .unwrap_or(trimmed)
        .trim()
        .to_string()
}

impl<'a> TermSlot<'a> {
    pub fn new(year: &'a str, class_label: &str, term: &str) -> Self {
        Self {
            year,
            class_number: class_number(class_label),
            term_underscored: term.split_whitespace().collect::<Vec<_>>().join("_"),
            term_compact: term.split_whitespace().collect(),
        }
    }

    fn term_forms(&self) -> [&str; 2] {
        [self.term_underscored.as_str(), self.term_compact.as_str()]
    }

    fn prefixes(&self) -> Vec<String> {
        self.term_forms()
            .iter()
            .map(|term| format!("{}_CL_{}_{}_", self.year, self.class_number, term))
            .collect()
    }

    /// Loose membership test: the lowercase filename mentions the year, the
    /// `_cl_{n}_` marker, and one of the term forms.
    pub fn mentions(&self, filename: &str) -> bool {
        let lower = filename.to_lowercase();
        if !lower.contains(&self.year.to_lowercase()) {
            return false;
        }
        if !lower.contains(&format!("_cl_{}_", self.class_number.to_lowercase())) {
            return false;
        }
        self.term_forms()
            .iter()
            .any(|term| lower.contains(&format!("_{}_", term.to_lowercase())))
    }

    /// Candidate filename prefixes for one subject cell, in priority order.
    pub fn cell_patterns(&self, subject: &str) -> Vec<String> {
        let subject_us = subject.split_whitespace().collect::<Vec<_>>().join("_");
        self.prefixes()
            .into_iter()
            .map(|prefix| format!("{prefix}{subject_us}").to_lowercase())
            .collect()
    }

    /// Prefix match first, listing order, first hit wins. With
    /// `token_fallback`, a file in this slot not yet claimed by another cell
    /// matches when every subject token equals one of its `_`/`-` delimited
    /// name tokens.
    pub fn find_cell_match<'f>(
        &self,
        files: &'f [String],
        subject: &str,
        token_fallback: bool,
        claimed: &BTreeSet<&str>,
    ) -> Option<&'f str> {
        let patterns = self.cell_patterns(subject);
        for file in files {
            let lower = file.to_lowercase();
            if patterns.iter().any(|p| lower.starts_with(p.as_str())) {
                return Some(file.as_str());
            }
        }

        if !token_fallback {
            return None;
        }

        let tokens = lowercase_tokens(subject);
        if tokens.is_empty() {
            return None;
        }
        files
            .iter()
            .filter(|file| !claimed.contains(file.as_str()))
            .find(|file| {
                if !self.mentions(file) {
                    return false;
                }
                let name_tokens = lowercase_tokens(file_stem(file));
                tokens.iter().all(|t| name_tokens.contains(t))
            })
            .map(String::as_str)
    }

    /// Display label for an extra document: the filename with the
    /// `year_CL_n_term_` prefix and extension removed.
    pub fn extra_label(&self, filename: &str) -> String {
        let stem = file_stem(filename);
        let rest = self
            .prefixes()
            .iter()
            .find_map(|prefix| strip_prefix_ignore_ascii_case(stem, prefix))
            .unwrap_or(stem);
        humanize(rest)
    }
}

pub fn is_near_duplicate(label: &str, subjects: &[String], policy: NearDuplicatePolicy) -> bool {
    let label_norm = normalize_name(label);
    match policy {
        NearDuplicatePolicy::Off => false,
        NearDuplicatePolicy::Exact => subjects
            .iter()
            .any(|subject| normalize_name(subject) == label_norm),
        NearDuplicatePolicy::Containment => subjects.iter().any(|subject| {
            let subject_norm = normalize_name(subject);
            subject_norm.contains(&label_norm) || label_norm.contains(&subject_norm)
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| (*n).to_string()).collect()
    }

    fn none() -> BTreeSet<&'static str> {
        BTreeSet::new()
    }

    #[test]
    fn prefix_match_covers_both_term_conventions() {
        let listing = files(&["2022-23_CL_9_MT2_Physics.pdf"]);
        let slot = TermSlot::new("2022-23", "Class 9", "MT 2");
        assert_eq!(
            slot.find_cell_match(&listing, "Physics", true, &none()),
            Some("2022-23_CL_9_MT2_Physics.pdf")
        );

        let listing = files(&["2022-23_cl_9_mt_2_physics.PDF"]);
        assert_eq!(
            slot.find_cell_match(&listing, "Physics", false, &none()),
            Some("2022-23_cl_9_mt_2_physics.PDF")
        );
    }

    #[test]
    fn first_listed_candidate_wins() {
        let listing = files(&["2021-22_CL_9_FT_Math.pdf", "2021-22_CL_9_FT_Math_II.pdf"]);
        let slot = TermSlot::new("2021-22", "Class 9", "FT");
        assert_eq!(
            slot.find_cell_match(&listing, "Math", true, &none()),
            Some("2021-22_CL_9_FT_Math.pdf")
        );
    }

    #[test]
    fn class_marker_does_not_confuse_9_with_10() {
        let listing = files(&["2021-22_CL_10_FT_Math.pdf"]);
        let slot = TermSlot::new("2021-22", "Class 1", "FT");
        assert_eq!(slot.find_cell_match(&listing, "Math", true, &none()), None);
    }

    #[test]
    fn token_fallback_recovers_reordered_subjects() {
        let listing = files(&["2023-24_CL_11_HY_Language_English.pdf"]);
        let slot = TermSlot::new("2023-24", "Class 11", "HY");
        assert_eq!(
            slot.find_cell_match(&listing, "English Language", true, &none()),
            Some("2023-24_CL_11_HY_Language_English.pdf")
        );
        assert_eq!(slot.find_cell_match(&listing, "English Language", false, &none()), None);
    }

    #[test]
    fn token_fallback_requires_term_marker() {
        let listing = files(&["2023-24_CL_11_FT_Language_English.pdf"]);
        let slot = TermSlot::new("2023-24", "Class 11", "HY");
        assert_eq!(slot.find_cell_match(&listing, "English Language", true, &none()), None);
    }

    #[test]
    fn token_fallback_matches_whole_tokens_only() {
        let listing = files(&["2021-22_CL_9_FT_English_Language_Paper.pdf"]);
        let slot = TermSlot::new("2021-22", "Class 9", "FT");
        assert_eq!(slot.find_cell_match(&listing, "PE", true, &none()), None);
        assert_eq!(
            slot.find_cell_match(&listing, "English Language", true, &none()),
            Some("2021-22_CL_9_FT_English_Language_Paper.pdf")
        );
    }

    #[test]
    fn token_fallback_skips_files_claimed_by_another_cell() {
        let listing = files(&["2021-22_CL_9_FT_Language_English.pdf"]);
        let slot = TermSlot::new("2021-22", "Class 9", "FT");
        let claimed = slot
            .find_cell_match(&listing, "English", true, &none())
            .into_iter()
            .collect::<BTreeSet<_>>();
        assert_eq!(claimed.len(), 1);
        assert_eq!(
            slot.find_cell_match(&listing, "English Language", true, &claimed),
            None
        );
    }

    #[test]
    fn extra_label_strips_prefix_for_either_term_form() {
        let slot = TermSlot::new("2021-22", "Class 9", "MT 1");
        assert_eq!(slot.extra_label("2021-22_CL_9_MT1_Bengali_II.pdf"), "Bengali II");
        assert_eq!(slot.extra_label("2021-22_CL_9_MT_1_Bengali_II.pdf"), "Bengali II");
    }

    #[test]
    fn near_duplicate_policies_differ_on_suffixed_labels() {
        let subjects = files(&["Bengali", "English Language"]);
        assert!(!is_near_duplicate("Bengali II", &subjects, NearDuplicatePolicy::Exact));
        assert!(is_near_duplicate("Bengali II", &subjects, NearDuplicatePolicy::Containment));
        assert!(is_near_duplicate("english_language", &subjects, NearDuplicatePolicy::Exact));
        assert!(is_near_duplicate("English Lang", &subjects, NearDuplicatePolicy::Containment));
        assert!(!is_near_duplicate("Bengali", &subjects, NearDuplicatePolicy::Off));
    }
}
