use crate::shelf::config::ShelfConfig;
use crate::shelf::filename::{ExamKey, FilenameParser, ParsedFilename};
use crate::shelf::index::{DocumentEntry, DocumentIndex};
use crate::shelf::matcher::{TermSlot, class_number, is_near_duplicate};
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildStats {
    pub listed: usize,
    pub resolved: usize,
    pub placeholders: usize,
    pub extras: usize,
    pub suppressed_extras: usize,
    pub misc: usize,
    pub duplicates: usize,
    pub unplaced: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct BuiltIndex {
    pub index: DocumentIndex,
    pub stats: BuildStats,
}

fn has_document_extension(path: &Path, extensions: &[String]) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    extensions
        .iter()
        .any(|wanted| wanted.trim_start_matches('.').eq_ignore_ascii_case(ext))
}

/// Document filenames in `dir`, filtered by extension and sorted by name.
pub fn list_documents(dir: &Path, extensions: &[String]) -> Result<Vec<String>> {
    let mut out = Vec::new();
    let entries =
        fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("failed to list {}", dir.display()))?;
        let path = entry.path();
        if !path.is_file() || !has_document_extension(&path, extensions) {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => out.push(name),
            Err(raw) => tracing::warn!(name = ?raw, "skipping non UTF-8 filename"),
        }
    }
    out.sort();
    Ok(out)
}

pub struct IndexBuilder<'a> {
    config: &'a ShelfConfig,
    parser: FilenameParser,
}

impl<'a> IndexBuilder<'a> {
    pub fn new(config: &'a ShelfConfig) -> Self {
        let parser = FilenameParser::new(&config.taxonomy.terms, &config.layout.misc_strip_prefix);
        Self { config, parser }
    }

    fn location(&self, filename: &str) -> String {
        format!("{}{}", self.config.layout.link_prefix, filename)
    }

    fn insert_misc<'f>(
        &self,
        index: &mut DocumentIndex,
        mut misc: Vec<(String, &'f str)>,
        stats: &mut BuildStats,
        placed: &mut BTreeSet<&'f str>,
    ) {
        if misc.is_empty() {
            return;
        }
        misc.sort_by(|a, b| a.0.cmp(&b.0));
        let bucket = self.config.layout.misc_label.as_str();
        for (label, file) in misc {
            if index.insert_if_absent(
                &[bucket, label.as_str()],
                DocumentEntry::Resolved(self.location(file)),
            ) {
                stats.misc += 1;
                placed.insert(file);
            } else {
                stats.duplicates += 1;
            }
        }
    }

    fn misc_files<'f>(&self, files: &'f [String]) -> Vec<(String, &'f str)> {
        files
            .iter()
            .filter(|file| FilenameParser::is_misc(file))
            .filter_map(|file| match self.parser.parse(file) {
                Some(ParsedFilename::Misc { label }) => Some((label, file.as_str())),
                _ => None,
            })
            .collect()
    }

    /// Fill every taxonomy cell, then add extra entries and the misc bucket.
    pub fn build_taxonomy(&self, files: &[String]) -> BuiltIndex {
        let taxonomy = &self.config.taxonomy;
        let matching = &self.config.matching;
        let mut index = DocumentIndex::new();
        let mut stats = BuildStats {
            listed: files.len(),
            ..BuildStats::default()
        };
        let mut consumed: BTreeSet<&str> = BTreeSet::new();
        let mut placed: BTreeSet<&str> = BTreeSet::new();

        for year in &taxonomy.years {
            for class_label in &taxonomy.classes {
                for term in &taxonomy.terms {
                    let slot = TermSlot::new(year, class_label, term);

                    for subject in &taxonomy.subjects {
                        let found = slot.find_cell_match(
                            files,
                            subject,
                            matching.token_fallback,
                            &consumed,
                        );
                        let entry = match found {
                            Some(file) => {
                                consumed.insert(file);
                                placed.insert(file);
                                DocumentEntry::Resolved(self.location(file))
                            }
                            None => DocumentEntry::Placeholder,
                        };
                        let resolved = entry.is_resolved();
                        let path = [
                            year.as_str(),
                            class_label.as_str(),
                            term.as_str(),
                            subject.as_str(),
                        ];
                        if index.insert_if_absent(&path, entry) {
                            if resolved {
                                stats.resolved += 1;
                            } else {
                                stats.placeholders += 1;
                            }
                        }
                    }

                    for file in files.iter().filter(|f| slot.mentions(f)) {
                        if consumed.contains(file.as_str()) {
                            continue;
                        }
                        let label = slot.extra_label(file);
                        if label.is_empty()
                            || is_near_duplicate(&label, &taxonomy.subjects, matching.near_duplicate)
                        {
                            tracing::debug!(file = %file, label = %label, "extra entry suppressed");
                            stats.suppressed_extras += 1;
                            continue;
                        }
                        if index.insert_if_absent(
                            &[
                                year.as_str(),
                                class_label.as_str(),
                                term.as_str(),
                                label.as_str(),
                            ],
                            DocumentEntry::Resolved(self.location(file)),
                        ) {
                            stats.extras += 1;
                            placed.insert(file.as_str());
                        }
                    }
                }
            }
        }

        let misc = self.misc_files(files);
        self.insert_misc(&mut index, misc, &mut stats, &mut placed);

        stats.unplaced = files
            .iter()
            .filter(|f| !placed.contains(f.as_str()))
            .cloned()
            .collect();

        BuiltIndex { index, stats }
    }

    fn term_rank(&self, term: &str) -> (usize, String) {
        let rank = self
            .config
            .taxonomy
            .terms
            .iter()
            .position(|t| t == term)
            .unwrap_or(self.config.taxonomy.terms.len());
        (rank, term.to_string())
    }

    /// Index of parsed files only: no placeholders, years newest first.
    pub fn build_discovered(&self, files: &[String]) -> BuiltIndex {
        let mut index = DocumentIndex::new();
        let mut stats = BuildStats {
            listed: files.len(),
            ..BuildStats::default()
        };
        let mut placed: BTreeSet<&str> = BTreeSet::new();
        let mut exams: Vec<(ExamKey, &str)> = Vec::new();

        for file in files {
            if let Some(ParsedFilename::Exam(key)) = self.parser.parse(file) {
                exams.push((key, file.as_str()));
            }
        }

        exams.sort_by(|(a, _), (b, _)| {
            let class_key = |k: &ExamKey| {
                let n = class_number(&k.class_label);
                (n.parse::<u32>().unwrap_or(u32::MAX), n)
            };
            b.year
                .cmp(&a.year)
                .then_with(|| class_key(a).cmp(&class_key(b)))
                .then_with(|| self.term_rank(&a.term).cmp(&self.term_rank(&b.term)))
                .then_with(|| a.subject.cmp(&b.subject))
        });

        for (key, file) in exams {
            let inserted = index.insert_if_absent(
                &[
                    key.year.as_str(),
                    key.class_label.as_str(),
                    key.term.as_str(),
                    key.subject.as_str(),
                ],
                DocumentEntry::Resolved(self.location(file)),
            );
            if inserted {
                stats.resolved += 1;
                placed.insert(file);
            } else {
                tracing::debug!(file, "duplicate key path; first file kept");
                stats.duplicates += 1;
            }
        }

        let misc = self.misc_files(files);
        self.insert_misc(&mut index, misc, &mut stats, &mut placed);

        stats.unplaced = files
            .iter()
            .filter(|f| !placed.contains(f.as_str()))
            .cloned()
            .collect();

        BuiltIndex { index, stats }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shelf::config::NearDuplicatePolicy;
    use tempfile::tempdir;

    fn files(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| (*n).to_string()).collect()
    }

    fn small_config() -> ShelfConfig {
        let mut cfg = ShelfConfig::default();
        cfg.taxonomy.years = files(&["2021-22"]);
        cfg.taxonomy.classes = files(&["Class 9"]);
        cfg.taxonomy.terms = files(&["MT 1", "FT"]);
        cfg.taxonomy.subjects = files(&["Bengali", "Math"]);
        cfg
    }

    fn resolved(path: &str) -> DocumentEntry {
        DocumentEntry::Resolved(path.to_string())
    }

    #[test]
    fn every_taxonomy_cell_has_exactly_one_leaf() {
        let cfg = ShelfConfig::default();
        let listing = files(&["2021-22_CL_10_HY_Chemistry.pdf"]);
        let built = IndexBuilder::new(&cfg).build_taxonomy(&listing);

        let t = &cfg.taxonomy;
        let cells = t.years.len() * t.classes.len() * t.terms.len() * t.subjects.len();
        assert_eq!(built.stats.resolved + built.stats.placeholders, cells);
        assert_eq!(built.index.leaves().len(), cells);
        assert_eq!(built.stats.resolved, 1);
        assert_eq!(
            built.index.get(&["2021-22", "Class 10", "HY", "Chemistry"]),
            Some(&resolved("documents/2021-22_CL_10_HY_Chemistry.pdf"))
        );
        assert_eq!(
            built.index.get(&["2021-22", "Class 10", "FT", "Chemistry"]),
            Some(&DocumentEntry::Placeholder)
        );
    }

    #[test]
    fn one_file_fills_one_cell_with_default_taxonomy() {
        let cfg = ShelfConfig::default();
        let listing = files(&["2021-22_CL_9_FT_English_Language_Paper.pdf"]);
        let built = IndexBuilder::new(&cfg).build_taxonomy(&listing);

        assert_eq!(
            built.index.get(&["2021-22", "Class 9", "FT", "English Language"]),
            Some(&resolved("documents/2021-22_CL_9_FT_English_Language_Paper.pdf"))
        );
        assert_eq!(
            built.index.get(&["2021-22", "Class 9", "FT", "PE"]),
            Some(&DocumentEntry::Placeholder)
        );
        assert_eq!(built.stats.resolved, 1);
    }

    #[test]
    fn math_and_math_ii_become_siblings() {
        let cfg = small_config();
        let listing = files(&["2021-22_CL_9_FT_Math.pdf", "2021-22_CL_9_FT_Math_II.pdf"]);
        let built = IndexBuilder::new(&cfg).build_taxonomy(&listing);

        assert_eq!(
            built.index.get(&["2021-22", "Class 9", "FT", "Math"]),
            Some(&resolved("documents/2021-22_CL_9_FT_Math.pdf"))
        );
        assert_eq!(
            built.index.get(&["2021-22", "Class 9", "FT", "Math II"]),
            Some(&resolved("documents/2021-22_CL_9_FT_Math_II.pdf"))
        );
        assert_eq!(built.stats.extras, 1);
        assert!(built.stats.unplaced.is_empty());
    }

    #[test]
    fn extra_entries_never_overwrite_taxonomy_leaves() {
        let cfg = small_config();
        let listing = files(&[
            "2021-22_CL_9_MT_1_Bengali.pdf",
            "2021-22_CL_9_MT_1_Bengali_II.pdf",
        ]);
        let built = IndexBuilder::new(&cfg).build_taxonomy(&listing);

        assert_eq!(
            built.index.get(&["2021-22", "Class 9", "MT 1", "Bengali"]),
            Some(&resolved("documents/2021-22_CL_9_MT_1_Bengali.pdf"))
        );
        assert_eq!(
            built.index.get(&["2021-22", "Class 9", "MT 1", "Bengali II"]),
            Some(&resolved("documents/2021-22_CL_9_MT_1_Bengali_II.pdf"))
        );
    }

    #[test]
    fn prefix_match_claims_suffixed_file_when_base_is_missing() {
        let cfg = small_config();
        let listing = files(&["2021-22_CL_9_MT_1_Bengali_II.pdf"]);
        let built = IndexBuilder::new(&cfg).build_taxonomy(&listing);

        // the prefix `..._Bengali` matches `Bengali_II`, so the cell takes it
        assert_eq!(
            built.index.get(&["2021-22", "Class 9", "MT 1", "Bengali"]),
            Some(&resolved("documents/2021-22_CL_9_MT_1_Bengali_II.pdf"))
        );
        assert!(built.index.get(&["2021-22", "Class 9", "MT 1", "Bengali II"]).is_none());
    }

    #[test]
    fn containment_policy_suppresses_suffixed_extras() {
        let mut cfg = small_config();
        cfg.matching.near_duplicate = NearDuplicatePolicy::Containment;
        let listing = files(&["2021-22_CL_9_FT_Math.pdf", "2021-22_CL_9_FT_Math_II.pdf"]);
        let built = IndexBuilder::new(&cfg).build_taxonomy(&listing);

        assert!(built.index.get(&["2021-22", "Class 9", "FT", "Math II"]).is_none());
        assert_eq!(built.stats.suppressed_extras, 1);
        assert_eq!(built.stats.unplaced, vec!["2021-22_CL_9_FT_Math_II.pdf"]);
    }

    #[test]
    fn term_encodings_resolve_to_same_key_path() {
        let cfg = small_config();
        for name in [
            "2021-22_CL_9_MT_1_Math.pdf",
            "2021-22_CL_9_MT1_Math.pdf",
        ] {
            let built = IndexBuilder::new(&cfg).build_taxonomy(&files(&[name]));
            let expected = format!("documents/{name}");
            assert_eq!(
                built.index.get(&["2021-22", "Class 9", "MT 1", "Math"]),
                Some(&DocumentEntry::Resolved(expected))
            );
        }

        for name in ["2021-22_CL_9_MT_1_Math.pdf", "2021-22_CL_9_MT1_Math.pdf"] {
            let built = IndexBuilder::new(&cfg).build_discovered(&files(&[name]));
            assert!(built.index.get(&["2021-22", "Class 9", "MT 1", "Math"]).is_some());
        }
    }

    #[test]
    fn rebuild_is_idempotent() {
        let cfg = ShelfConfig::default();
        let listing = files(&[
            "2020-21_CL_9_FT_Bengali.pdf",
            "2022-23_CL_9_MT2_Physics.pdf",
            "2022-23_CL_9_MT2_Physics_Practical.pdf",
            "Study_Material_Class_9_Optics.pdf",
        ]);
        let builder = IndexBuilder::new(&cfg);
        let first = builder.build_taxonomy(&listing);
        let second = builder.build_taxonomy(&listing);
        assert_eq!(first.index, second.index);
    }

    #[test]
    fn misc_bucket_follows_year_entries() {
        let cfg = small_config();
        let listing = files(&[
            "Study_Material_Class_9_Physics_Optics.pdf",
            "Study_Material_Class_9_Algebra.pdf",
        ]);
        let built = IndexBuilder::new(&cfg).build_taxonomy(&listing);

        let keys: Vec<&str> = built.index.root().iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["2021-22", "Study Materials"]);
        assert_eq!(
            built.index.get(&["Study Materials", "Algebra"]),
            Some(&resolved("documents/Study_Material_Class_9_Algebra.pdf"))
        );
        assert_eq!(built.stats.misc, 2);
    }

    #[test]
    fn discovered_index_orders_years_desc_and_terms_canonically() {
        let cfg = small_config();
        let listing = files(&[
            "2020-21_CL_9_FT_Math.pdf",
            "2021-22_CL_9_FT_Math.pdf",
            "2021-22_CL_9_MT_1_Math.pdf",
            "2021-22_CL_10_FT_Bengali.pdf",
            "notes.pdf",
        ]);
        let built = IndexBuilder::new(&cfg).build_discovered(&listing);

        let years: Vec<&str> = built.index.root().iter().map(|(k, _)| k).collect();
        assert_eq!(years, vec!["2021-22", "2020-21"]);
        let paths: Vec<String> = built
            .index
            .leaves()
            .into_iter()
            .map(|(p, _)| p.join("/"))
            .collect();
        assert_eq!(
            paths,
            vec![
                "2021-22/Class 9/MT 1/Math",
                "2021-22/Class 9/FT/Math",
                "2021-22/Class 10/FT/Bengali",
                "2020-21/Class 9/FT/Math",
            ]
        );
        assert_eq!(built.stats.unplaced, vec!["notes.pdf"]);
    }

    #[test]
    fn list_documents_filters_extensions_and_sorts() {
        let tmp = tempdir().expect("tempdir");
        fs::write(tmp.path().join("b.pdf"), b"x").expect("write");
        fs::write(tmp.path().join("a.PDF"), b"x").expect("write");
        fs::write(tmp.path().join("c.txt"), b"x").expect("write");
        fs::create_dir_all(tmp.path().join("d.pdf")).expect("mkdir");

        let listed = list_documents(tmp.path(), &files(&["pdf"])).expect("list");
        assert_eq!(listed, vec!["a.PDF", "b.pdf"]);
    }
}
