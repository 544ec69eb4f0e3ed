use crate::common::command::{init_repository_dir, repository_dir, run_cairn_command, stdout_of};
use crate::common::file::{fake_content, fake_file_name};
use assert_fs::TempDir;
use assert_fs::fixture::{FileWriteStr, PathChild};
use cairn::artifacts::objects::blob::Blob;
use predicates::prelude::*;
use rstest::rstest;

mod common;

#[rstest]
fn hash_object_prints_the_blob_id(repository_dir: TempDir) -> Result<(), Box<dyn std::error::Error>> {
    let file = repository_dir.child("hello.txt");
    file.write_str("hello")?;

    run_cairn_command(repository_dir.path(), &["hash-object", "hello.txt"])
        .assert()
        .success()
        .stdout("b6fc4c620b67d95f953a5c1c1230aaab5db5a1b0\n");

    Ok(())
}

#[rstest]
fn hash_object_without_write_stores_nothing(
    repository_dir: TempDir,
) -> Result<(), Box<dyn std::error::Error>> {
    run_cairn_command(repository_dir.path(), &["init"])
        .assert()
        .success();
    repository_dir.child("hello.txt").write_str("hello")?;

    run_cairn_command(repository_dir.path(), &["hash-object", "hello.txt"])
        .assert()
        .success();

    let object_path = repository_dir
        .path()
        .join(".cairn/objects/b6/fc4c620b67d95f953a5c1c1230aaab5db5a1b0");
    assert!(!object_path.exists());

    Ok(())
}

#[rstest]
fn written_blob_can_be_read_back(repository_dir: TempDir) -> Result<(), Box<dyn std::error::Error>> {
    run_cairn_command(repository_dir.path(), &["init"])
        .assert()
        .success();

    let file_name = fake_file_name(&[]);
    let file_content = fake_content();
    repository_dir.child(&file_name).write_str(&file_content)?;

    let oid = stdout_of(&mut run_cairn_command(
        repository_dir.path(),
        &["hash-object", "-w", &file_name],
    ));
    let oid = oid.trim();
    assert_eq!(oid, Blob::new(file_content.clone()).object_id().to_string());

    run_cairn_command(repository_dir.path(), &["cat-file", "-p", oid])
        .assert()
        .success()
        .stdout(file_content);

    run_cairn_command(repository_dir.path(), &["cat-file", "-t", &oid[..8]])
        .assert()
        .success()
        .stdout("blob\n");

    Ok(())
}

#[rstest]
fn cat_file_resolves_references(init_repository_dir: TempDir) {
    run_cairn_command(init_repository_dir.path(), &["cat-file", "-t", "HEAD"])
        .assert()
        .success()
        .stdout("commit\n");

    run_cairn_command(init_repository_dir.path(), &["cat-file", "-p", "master"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("tree "))
        .stdout(predicate::str::contains(
            "author Ada Lovelace <ada@example.com> 1700000000 +0000",
        ))
        .stdout(predicate::str::ends_with("\n\nInitial commit"));
}

#[rstest]
fn cat_file_of_an_unknown_object_fails(init_repository_dir: TempDir) {
    run_cairn_command(
        init_repository_dir.path(),
        &["cat-file", "-p", "0123456789abcdef0123456789abcdef01234567"],
    )
    .assert()
    .failure()
    .stderr(predicate::str::contains("unknown revision"));
}
