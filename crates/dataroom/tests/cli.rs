use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

fn dataroom(storage: &Path) -> Command {
    let mut cmd = Command::cargo_bin("dataroom").expect("binary builds");
    cmd.current_dir(storage)
        .env_remove("DATAROOM_STORAGE_DIR")
        .env_remove("DATAROOM_QUOTA_BYTES")
        .arg("--storage-dir")
        .arg(storage.join("store"));
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8(output).expect("utf-8 output")
}

#[test]
fn help_lists_commands() {
    Command::cargo_bin("dataroom")
        .expect("binary builds")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("mkdir"))
        .stdout(predicate::str::contains("upload"))
        .stdout(predicate::str::contains("--storage-dir"));
}

#[test]
fn mkdir_then_tree_shows_folder() {
    let temp = tempfile::tempdir().unwrap();
    let id = stdout_of(dataroom(temp.path()).args(["mkdir", "Contracts"]));
    assert!(id.trim().starts_with("folder_"));

    dataroom(temp.path())
        .arg("tree")
        .assert()
        .success()
        .stdout(predicate::str::contains("Main/  [root]"))
        .stdout(predicate::str::contains(format!("  Contracts/  [{}]", id.trim())));
    assert!(temp.path().join("store/data-room-mvp-v1.json").exists());
}

#[test]
fn upload_search_and_preview() {
    let temp = tempfile::tempdir().unwrap();
    let source = temp.path().join("Term Sheet.pdf");
    fs::write(&source, b"%PDF-1.7 term sheet").unwrap();

    let id = stdout_of(dataroom(temp.path()).arg("upload").arg(&source));
    let id = id.trim();

    dataroom(temp.path())
        .args(["search", "term"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("{id}\tTerm Sheet.pdf\t19 B")));

    let copy = temp.path().join("copy.pdf");
    dataroom(temp.path())
        .args(["preview", id, "--output"])
        .arg(&copy)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Term Sheet.pdf\tapplication/pdf"));
    assert_eq!(fs::read(copy).unwrap(), b"%PDF-1.7 term sheet");
}

#[test]
fn png_upload_is_rejected() {
    let temp = tempfile::tempdir().unwrap();
    let source = temp.path().join("photo.png");
    fs::write(&source, [0x89, b'P', b'N', b'G']).unwrap();

    dataroom(temp.path())
        .arg("upload")
        .arg(&source)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Only PDF files are supported."));

    dataroom(temp.path())
        .args(["ls"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn rm_without_confirmation_is_cancelled() {
    let temp = tempfile::tempdir().unwrap();
    let id = stdout_of(dataroom(temp.path()).args(["mkdir", "Keep"]));
    let id = id.trim();

    dataroom(temp.path())
        .args(["rm", id])
        .write_stdin("n\n")
        .assert()
        .success()
        .stdout("cancelled\n");

    dataroom(temp.path())
        .args(["rm", id, "--yes"])
        .assert()
        .success();

    dataroom(temp.path())
        .arg("ls")
        .assert()
        .success()
        .stdout(predicate::str::contains(id).not());
}

#[test]
fn root_cannot_be_deleted() {
    let temp = tempfile::tempdir().unwrap();
    dataroom(temp.path())
        .args(["rm", "root", "--yes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("root folder cannot be renamed or deleted"));
}
