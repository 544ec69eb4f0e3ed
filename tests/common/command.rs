use crate::common::file::{FileSpec, write_file};
use crate::common::{AUTHOR_DATE, AUTHOR_EMAIL, AUTHOR_NAME};
use assert_cmd::Command;
use assert_fs::TempDir;
use rstest::fixture;
use std::path::Path;

#[fixture]
pub fn repository_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp dir")
}

/// Repository with three files in nested directories, committed once
#[fixture]
pub fn init_repository_dir(repository_dir: TempDir) -> TempDir {
    run_cairn_command(repository_dir.path(), &["init"])
        .assert()
        .success();

    for (path, content) in [("1.txt", "one"), ("a/2.txt", "two"), ("a/b/3.txt", "three")] {
        write_file(&FileSpec::new(
            repository_dir.path().join(path),
            content.to_string(),
        ));
    }

    run_cairn_command(repository_dir.path(), &["add", "."])
        .assert()
        .success();

    run_cairn_command(repository_dir.path(), &["commit", "-m", "Initial commit"])
        .assert()
        .success();

    repository_dir
}

/// The binary, run in `dir` with a pinned author identity
pub fn run_cairn_command(dir: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::cargo_bin("cairn").expect("Failed to find the cairn binary");
    cmd.current_dir(dir)
        .args(args)
        .env("CAIRN_AUTHOR_NAME", AUTHOR_NAME)
        .env("CAIRN_AUTHOR_EMAIL", AUTHOR_EMAIL)
        .env("CAIRN_AUTHOR_DATE", AUTHOR_DATE)
        .env_remove("CAIRN_LOG")
        .env("NO_COLOR", "1");
    cmd
}

pub fn read_ref(dir: &Path, name: &str) -> String {
    std::fs::read_to_string(dir.join(".cairn").join(name))
        .unwrap_or_else(|e| panic!("Failed to read ref {name}: {e}"))
        .trim()
        .to_string()
}

pub fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.assert().success();
    String::from_utf8(output.get_output().stdout.clone()).expect("stdout is not UTF-8")
}
