use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const FILE_ID: &str = "ABCDEFGHIJKLMNOPQRST1234";

fn docshelf(root: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("docshelf");
    cmd.current_dir(root)
        .env("DOCSHELF_HOME", root)
        .env("DOCSHELF_CONFIG_PATH", root.join("docshelf.toml"))
        .env_remove("GITHUB_TOKEN")
        .env_remove("GOOGLE_DRIVE_ACCESS_TOKEN");
    cmd
}

fn write_index(root: &Path, body: &str) -> std::path::PathBuf {
    let path = root.join("scripts/full_documents_object.js");
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir scripts");
    fs::write(&path, body).expect("write index");
    path
}

fn drive_index() -> String {
    format!(
        r##"let documents = {{
    "2021-22": {{
        "Class 9": {{
            "FT": {{
                "Math": "https://drive.google.com/file/d/{FILE_ID}/view",
                "Bengali": "#"
            }}
        }}
    }}
}};
"##
    )
}

#[test]
fn extract_links_lists_path_and_identifier() {
    let tmp = tempdir().expect("tempdir");
    write_index(tmp.path(), &drive_index());

    docshelf(tmp.path())
        .arg("extract-links")
        .assert()
        .success()
        .stdout(predicate::str::contains("links=1"))
        .stdout(predicate::str::contains(format!(
            "2021-22 > Class 9 > FT > Math -> {FILE_ID}"
        )));
}

#[test]
fn extract_links_without_index_reports_issue() {
    let tmp = tempdir().expect("tempdir");

    docshelf(tmp.path())
        .arg("extract-links")
        .assert()
        .success()
        .stdout(predicate::str::contains("index file not found"));
}

#[test]
fn migrate_with_only_local_links_does_nothing() {
    let tmp = tempdir().expect("tempdir");
    write_index(
        tmp.path(),
        "let documents = {\n    \"a\": \"documents/a.pdf\"\n};\n",
    );

    docshelf(tmp.path())
        .args(["migrate", "--upload"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no remote documents to process"));

    assert!(!tmp.path().join("scripts/url_mapping.json").exists());
}

#[test]
fn apply_mapping_rewrites_index_and_keeps_backup() {
    let tmp = tempdir().expect("tempdir");
    let index = write_index(tmp.path(), &drive_index());
    let old_url = format!("https://drive.google.com/file/d/{FILE_ID}/view");
    let new_url = "https://github.com/o/r/releases/download/study-materials-v1/Math.pdf";
    let mut mapping = serde_json::Map::new();
    mapping.insert(old_url.clone(), serde_json::Value::String(new_url.to_string()));
    fs::write(
        tmp.path().join("scripts/url_mapping.json"),
        serde_json::to_string_pretty(&mapping).expect("json"),
    )
    .expect("write mapping");

    docshelf(tmp.path())
        .arg("apply-mapping")
        .assert()
        .success()
        .stdout(predicate::str::contains("updated 1 url(s)"));

    let rewritten = fs::read_to_string(&index).expect("read index");
    assert!(rewritten.contains(new_url));
    assert!(!rewritten.contains(&old_url));
    let backup = fs::read_to_string(tmp.path().join("scripts/full_documents_object.js.backup"))
        .expect("read backup");
    assert_eq!(backup, drive_index());
}

#[test]
fn apply_mapping_without_mapping_file_reports_issue() {
    let tmp = tempdir().expect("tempdir");
    let index = write_index(tmp.path(), &drive_index());

    docshelf(tmp.path())
        .arg("apply-mapping")
        .assert()
        .success()
        .stdout(predicate::str::contains("run `docshelf migrate --upload` first"));

    assert_eq!(fs::read_to_string(&index).expect("read"), drive_index());
}
