//! Exit codes and manifest-reading commands of the `deplog` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn deplog() -> Command {
    Command::cargo_bin("deplog").expect("deplog binary")
}

fn setup_cfg_project() -> TempDir {
    let td = tempfile::tempdir().expect("tempdir");
    fs::write(
        td.path().join("setup.cfg"),
        "[metadata]\nname = demo-pkg\n\n[options.extras_require]\nTest =\n    pytest\ndev =\n    black\n",
    )
    .unwrap();
    td
}

#[test]
fn no_subcommand_is_usage_error() {
    deplog().assert().code(1);
}

#[test]
fn run_without_subtitle_is_usage_error() {
    let td = tempfile::tempdir().unwrap();
    fs::write(td.path().join("Containerfile"), "FROM python:3.12\n").unwrap();
    deplog()
        .current_dir(td.path())
        .args(["run", "Containerfile", "dependencies.log"])
        .assert()
        .code(1);
}

#[test]
fn run_with_missing_build_file_exits_2() {
    let td = tempfile::tempdir().unwrap();
    deplog()
        .current_dir(td.path())
        .args(["run", "missing.Containerfile", "dependencies.log", "demo"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("missing.Containerfile"));
    assert!(!td.path().join("dependencies.log").exists());
}

#[test]
fn help_exits_0() {
    deplog().arg("--help").assert().success().stdout(predicate::str::contains("run-all"));
}

#[test]
fn list_variants_prints_lowercased_extras() {
    let td = setup_cfg_project();
    deplog()
        .args(["list-variants", "--project"])
        .arg(td.path())
        .assert()
        .success()
        .stdout("test\ndev\n");
}

#[test]
fn package_name_from_setup_cfg() {
    let td = setup_cfg_project();
    deplog()
        .args(["package-name", "--project"])
        .arg(td.path())
        .assert()
        .success()
        .stdout("demo-pkg\n");
}

#[test]
fn package_name_defaults_to_unknown() {
    let td = tempfile::tempdir().unwrap();
    fs::write(td.path().join("setup.cfg"), "[options]\npackages = find:\n").unwrap();
    deplog()
        .args(["package-name", "--project"])
        .arg(td.path())
        .assert()
        .success()
        .stdout("UNKNOWN\n");
}

#[test]
fn package_name_from_pyproject() {
    let td = tempfile::tempdir().unwrap();
    fs::write(
        td.path().join("pyproject.toml"),
        "[project]\nname = \"toml-pkg\"\n\n[project.optional-dependencies]\nweb = [\"flask\"]\n",
    )
    .unwrap();
    deplog().args(["package-name", "--project"]).arg(td.path()).assert().success().stdout("toml-pkg\n");
    deplog().args(["list-variants", "--project"]).arg(td.path()).assert().success().stdout("web\n");
}

#[test]
fn missing_manifest_exits_2() {
    let td = tempfile::tempdir().unwrap();
    deplog().args(["list-variants", "--project"]).arg(td.path()).assert().code(2);
    deplog().args(["run-all", "--project"]).arg(td.path()).assert().code(2);
}

#[test]
fn duplicate_extra_is_usage_error() {
    let td = setup_cfg_project();
    deplog()
        .args(["run-all", "--extra", "dev", "--extra", "dev", "--project"])
        .arg(td.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("duplicate variant dev"));
}

#[test]
fn invalid_extra_name_is_usage_error() {
    let td = setup_cfg_project();
    deplog()
        .args(["run-all", "--extra", "bad name", "--project"])
        .arg(td.path())
        .assert()
        .code(1);
}

#[test]
fn malformed_config_is_reported() {
    let td = setup_cfg_project();
    fs::write(td.path().join("deplog.toml"), "[engine\n").unwrap();
    deplog()
        .args(["run-all", "--project"])
        .arg(td.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("deplog.toml"));
}

#[cfg(unix)]
#[test]
fn run_propagates_engine_exit_code_and_stderr() {
    use std::os::unix::fs::PermissionsExt;

    let td = tempfile::tempdir().unwrap();
    let engine = td.path().join("fake-engine.sh");
    fs::write(&engine, "#!/bin/sh\necho \"manifest for python:9.9 not found\" >&2\nexit 42\n").unwrap();
    fs::set_permissions(&engine, fs::Permissions::from_mode(0o755)).unwrap();
    fs::write(td.path().join("deplog.toml"), format!("[engine]\nprogram = \"{}\"\n", engine.display())).unwrap();
    fs::write(td.path().join("Containerfile"), "FROM python:9.9\n").unwrap();

    deplog()
        .current_dir(td.path())
        .args(["run", "Containerfile", "dependencies.log", "demo"])
        .assert()
        .code(42)
        .stderr(predicate::str::contains("manifest for python:9.9 not found"));
    assert!(!td.path().join("dependencies.log").exists());
}
