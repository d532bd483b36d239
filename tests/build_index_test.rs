use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const SMALL_TAXONOMY: &str = r#"
[taxonomy]
years = ["2021-22"]
classes = ["Class 9"]
terms = ["FT"]
subjects = ["Math", "Bengali"]
"#;

fn docshelf(root: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("docshelf");
    cmd.current_dir(root)
        .env("DOCSHELF_HOME", root)
        .env("DOCSHELF_CONFIG_PATH", root.join("docshelf.toml"));
    cmd
}

fn seed_documents(root: &Path, names: &[&str]) {
    let dir = root.join("src/documents");
    fs::create_dir_all(&dir).expect("mkdir documents");
    for name in names {
        fs::write(dir.join(name), "%PDF-1.4").expect("write document");
    }
}

#[test]
fn build_index_writes_taxonomy_with_extras_and_study_materials() {
    let tmp = tempdir().expect("tempdir");
    fs::write(tmp.path().join("docshelf.toml"), SMALL_TAXONOMY).expect("write config");
    seed_documents(
        tmp.path(),
        &[
            "2021-22_CL_9_FT_Math.pdf",
            "2021-22_CL_9_FT_Math_II.pdf",
            "Study_Material_Class_9_Optics.pdf",
            "notes.txt",
        ],
    );

    docshelf(tmp.path())
        .arg("build-index")
        .assert()
        .success()
        .stdout(predicate::str::contains("resolved=1 placeholders=1"));

    let written =
        fs::read_to_string(tmp.path().join("scripts/full_documents_object.js")).expect("read");
    let expected = r##"let documents = {
    "2021-22": {
        "Class 9": {
            "FT": {
                "Math": "documents/2021-22_CL_9_FT_Math.pdf",
                "Bengali": "#",
                "Math II": "documents/2021-22_CL_9_FT_Math_II.pdf"
            }
        }
    },
    "Study Materials": {
        "Optics": "documents/Study_Material_Class_9_Optics.pdf"
    }
};
"##;
    assert_eq!(written, expected);
}

#[test]
fn build_index_dry_run_leaves_output_untouched() {
    let tmp = tempdir().expect("tempdir");
    fs::write(tmp.path().join("docshelf.toml"), SMALL_TAXONOMY).expect("write config");
    seed_documents(tmp.path(), &["2021-22_CL_9_FT_Math.pdf"]);
    let output = tmp.path().join("out/index.js");

    docshelf(tmp.path())
        .args(["build-index", "--dry-run", "--output"])
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("dry-run: would write"));

    assert!(!output.exists());
}

#[test]
fn build_index_discovered_only_lists_newest_year_first() {
    let tmp = tempdir().expect("tempdir");
    seed_documents(
        tmp.path(),
        &["2021-22_CL_9_HY_Physics.pdf", "2023-24_CL_10_MT_1_Chemistry.pdf"],
    );

    docshelf(tmp.path())
        .args(["build-index", "--discovered-only"])
        .assert()
        .success();

    let written =
        fs::read_to_string(tmp.path().join("scripts/full_documents_object.js")).expect("read");
    let newer = written.find("\"2023-24\"").expect("newer year");
    let older = written.find("\"2021-22\"").expect("older year");
    assert!(newer < older);
    assert!(written.contains("\"MT 1\": {"));
    assert!(!written.contains("\"#\""));
}

#[test]
fn build_index_reports_missing_documents_dir_without_failing() {
    let tmp = tempdir().expect("tempdir");

    docshelf(tmp.path())
        .args(["--json", "build-index"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"ok\": false"))
        .stdout(predicate::str::contains("documents directory not found"));
}

#[test]
fn invalid_config_exits_with_error() {
    let tmp = tempdir().expect("tempdir");
    fs::write(
        tmp.path().join("docshelf.toml"),
        "[matching]\nnear_duplicate = \"fuzzy\"\n",
    )
    .expect("write config");

    docshelf(tmp.path())
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("error:"));
}
