use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn filex() -> Command {
    Command::cargo_bin("filex").unwrap()
}

#[test]
fn run_succeeds_on_clean_directory() {
    let input = TempDir::new().unwrap();
    fs::write(input.path().join("a.txt"), "alpha\nbeta\n").unwrap();
    fs::write(input.path().join("b.txt"), "gamma\n").unwrap();

    let out_dir = TempDir::new().unwrap();
    let out_file = out_dir.path().join("out.txt");

    filex()
        .arg(input.path())
        .arg("--out")
        .arg(&out_file)
        .arg("--output-format")
        .arg("plain")
        .assert()
        .success();

    let content = fs::read_to_string(&out_file).unwrap();
    assert!(content.contains("alpha"));
    assert!(content.contains("gamma"));
}

#[test]
fn missing_root_exits_with_discovery_failure() {
    let out_dir = TempDir::new().unwrap();

    filex()
        .arg("/definitely/not/a/real/directory")
        .arg("--out")
        .arg(out_dir.path().join("out.txt"))
        .arg("--output-format")
        .arg("plain")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Cannot scan"));
}

#[test]
fn identical_files_are_reported_as_one_duplicate_group() {
    let input = TempDir::new().unwrap();
    fs::write(input.path().join("a.txt"), "foo\nbar").unwrap();
    fs::write(input.path().join("b.txt"), "foo\nbar").unwrap();
    fs::write(input.path().join("c.txt"), "unrelated\n").unwrap();

    let out_dir = TempDir::new().unwrap();

    filex()
        .arg(input.path())
        .arg("--out")
        .arg(out_dir.path().join("out.txt"))
        .arg("--output-format")
        .arg("plain")
        .assert()
        .success()
        .stdout(predicate::str::contains("Duplicate groups: 1"))
        .stdout(predicate::str::contains("a.txt"))
        .stdout(predicate::str::contains("b.txt"));
}

#[test]
fn filter_selects_matching_lines_in_order() {
    let input = TempDir::new().unwrap();
    fs::write(
        input.path().join("app.log"),
        "start\nERROR one\nok\nok\nERROR two\nok\nok\nERROR three\nok\nend\n",
    )
    .unwrap();

    let out_dir = TempDir::new().unwrap();
    let out_file = out_dir.path().join("out.txt");

    filex()
        .arg(input.path())
        .arg("--filter")
        .arg("ERROR")
        .arg("--no-annotate")
        .arg("--out")
        .arg(&out_file)
        .arg("--output-format")
        .arg("plain")
        .assert()
        .success();

    let content = fs::read_to_string(&out_file).unwrap();
    assert_eq!(content, "ERROR one\nERROR two\nERROR three\n");
}

#[cfg(unix)]
#[test]
fn unreadable_file_causes_partial_failure_exit_code() {
    use std::os::unix::fs::PermissionsExt;

    let input = TempDir::new().unwrap();
    fs::write(input.path().join("readable.txt"), "fine\n").unwrap();

    let locked = input.path().join("locked.txt");
    fs::write(&locked, "secret\n").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // A privileged process can read the file anyway; nothing to test then
    if fs::read(&locked).is_ok() {
        return;
    }

    let out_dir = TempDir::new().unwrap();
    let out_file = out_dir.path().join("out.txt");

    filex()
        .arg(input.path())
        .arg("--out")
        .arg(&out_file)
        .arg("--output-format")
        .arg("plain")
        .assert()
        .code(2)
        .stdout(predicate::str::contains("Errors: 1"));

    // The readable file still made it into the output
    let content = fs::read_to_string(&out_file).unwrap();
    assert!(content.contains("fine"));
    assert!(!content.contains("secret"));

    // Restore permissions so TempDir cleanup works everywhere
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();
}

#[test]
fn corrupt_archive_causes_partial_failure_exit_code() {
    let input = TempDir::new().unwrap();
    fs::write(input.path().join("readable.txt"), "fine\n").unwrap();
    fs::write(input.path().join("broken.zip"), "this is not a zip file").unwrap();

    let out_dir = TempDir::new().unwrap();
    let out_file = out_dir.path().join("out.txt");

    filex()
        .arg(input.path())
        .arg("--out")
        .arg(&out_file)
        .arg("--output-format")
        .arg("plain")
        .assert()
        .code(2)
        .stdout(predicate::str::contains("Errors: 1"));

    let content = fs::read_to_string(&out_file).unwrap();
    assert!(content.contains("fine"));
}

#[test]
fn rerunning_on_unchanged_tree_is_idempotent() {
    let input = TempDir::new().unwrap();
    fs::write(input.path().join("a.txt"), "one\ntwo\n").unwrap();
    fs::write(input.path().join("b.txt"), "one\ntwo\n").unwrap();
    fs::write(input.path().join("c.txt"), "three\n").unwrap();

    let out_dir = TempDir::new().unwrap();
    let out_file = out_dir.path().join("out.txt");

    filex()
        .arg(input.path())
        .arg("--out")
        .arg(&out_file)
        .arg("--output-format")
        .arg("plain")
        .assert()
        .success();
    let first = fs::read_to_string(&out_file).unwrap();

    filex()
        .arg(input.path())
        .arg("--out")
        .arg(&out_file)
        .arg("--force")
        .arg("--output-format")
        .arg("plain")
        .assert()
        .success();
    let second = fs::read_to_string(&out_file).unwrap();

    assert_eq!(first, second);
}

#[test]
fn existing_output_is_refused_without_force() {
    let input = TempDir::new().unwrap();
    fs::write(input.path().join("a.txt"), "alpha\n").unwrap();

    let out_dir = TempDir::new().unwrap();
    let out_file = out_dir.path().join("out.txt");
    fs::write(&out_file, "precious data").unwrap();

    filex()
        .arg(input.path())
        .arg("--out")
        .arg(&out_file)
        .arg("--output-format")
        .arg("plain")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("already exists"));

    assert_eq!(fs::read_to_string(&out_file).unwrap(), "precious data");
}

#[test]
fn dry_run_reports_plan_without_writing_output() {
    let input = TempDir::new().unwrap();
    fs::write(input.path().join("a.txt"), "alpha\n").unwrap();

    let out_dir = TempDir::new().unwrap();
    let out_file = out_dir.path().join("out.txt");

    filex()
        .arg(input.path())
        .arg("--out")
        .arg(&out_file)
        .arg("--dry-run")
        .arg("--output-format")
        .arg("plain")
        .assert()
        .success()
        .stdout(predicate::str::contains("Files to process: 1"));

    assert!(!out_file.exists());
}

#[test]
fn generate_config_writes_sample_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("sample.toml");

    filex()
        .arg("ignored-root")
        .arg("--generate-config")
        .arg("--config")
        .arg(&config_path)
        .assert()
        .success();

    let content = fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("[filters]"));
    assert!(content.contains("[pipeline]"));
}

#[test]
fn include_and_exclude_globs_shape_the_batch() {
    let input = TempDir::new().unwrap();
    fs::write(input.path().join("keep.log"), "kept\n").unwrap();
    fs::write(input.path().join("drop.txt"), "dropped\n").unwrap();
    fs::write(input.path().join("skip.log"), "excluded\n").unwrap();

    let out_dir = TempDir::new().unwrap();
    let out_file = out_dir.path().join("out.txt");

    filex()
        .arg(input.path())
        .arg("--include")
        .arg("*.log")
        .arg("--exclude")
        .arg("skip.log")
        .arg("--no-annotate")
        .arg("--out")
        .arg(&out_file)
        .arg("--output-format")
        .arg("plain")
        .assert()
        .success();

    let content = fs::read_to_string(&out_file).unwrap();
    assert_eq!(content, "kept\n");
}
