// SPDX-License-Identifier: AGPL-3.0-or-later
//! Integration tests for mlat-client-config

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::tempdir;

/// Command with a config path that does not exist, so defaults apply
fn cli(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("mlat-client-config").unwrap();
    cmd.arg("--config").arg(dir.join("mlat-client-config.toml"));
    cmd
}

/// Non-interactive run enabling the client with every required answer
fn write_enabled(dir: &Path, output: &Path) {
    cli(dir)
        .arg("defaults")
        .arg("--output")
        .arg(output)
        .args([
            "--set",
            "start-client=yes",
            "--set",
            "server-user=feeder",
            "--set",
            "server-key=s3cr3t",
            "--set",
            "receiver-lat=51.4769",
            "--set",
            "receiver-lon=-0.0005",
            "--set",
            "receiver-alt=47",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote configuration"));
}

/// Test the version command
#[test]
fn test_version_command() {
    let mut cmd = Command::cargo_bin("mlat-client-config").unwrap();
    cmd.arg("version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("mlat-client-config v"))
        .stdout(predicate::str::contains("multilateration"));
}

/// Test the help output
#[test]
fn test_help_command() {
    let mut cmd = Command::cargo_bin("mlat-client-config").unwrap();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("configure"))
        .stdout(predicate::str::contains("defaults"))
        .stdout(predicate::str::contains("check"));
}

/// Test listing the built-in template set
#[test]
fn test_templates_builtin() {
    let temp_dir = tempdir().unwrap();
    cli(temp_dir.path())
        .arg("templates")
        .assert()
        .success()
        .stdout(predicate::str::contains("Template set is valid"))
        .stdout(predicate::str::contains("server-hostport (string) [mlat.mutability.co.uk:40147]"))
        .stdout(predicate::str::contains("<non-root-user>"))
        .stdout(predicate::str::contains("invalid-port (error)"));
}

/// Test that a corrupt template set is refused before any prompting
#[test]
fn test_malformed_templates_abort() {
    let temp_dir = tempdir().unwrap();
    let templates = temp_dir.path().join("broken.templates");
    std::fs::write(
        &templates,
        "Template: input-type\nType: select\nChoices: beast, sbs\nDefault: dump1090\nDescription: Type\n",
    )
    .unwrap();
    let output = temp_dir.path().join("mlat-client");

    cli(temp_dir.path())
        .arg("--templates")
        .arg(&templates)
        .arg("--output")
        .arg(&output)
        .arg("configure")
        .write_stdin("yes\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Malformed template 'input-type'"));

    assert!(!output.exists());
}

/// Test the non-interactive run with the client disabled
#[test]
fn test_defaults_disabled_dry_run() {
    let temp_dir = tempdir().unwrap();
    let output = temp_dir.path().join("mlat-client");

    cli(temp_dir.path())
        .arg("--dry-run")
        .arg("--output")
        .arg(&output)
        .arg("defaults")
        .assert()
        .success()
        .stdout(predicate::str::contains("DRY RUN"))
        .stdout(predicate::str::contains("START_CLIENT=\"no\""))
        .stdout(predicate::str::contains("RUN_AS_USER=\"mlat\""));

    assert!(!output.exists());
}

/// Test that a required answer cannot be defaulted
#[test]
fn test_defaults_missing_required_answer() {
    let temp_dir = tempdir().unwrap();
    let output = temp_dir.path().join("mlat-client");

    cli(temp_dir.path())
        .arg("--output")
        .arg(&output)
        .args(["defaults", "--set", "start-client=yes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("server-user"))
        .stderr(predicate::str::contains("Value cannot be empty"));

    assert!(!output.exists());
}

/// Test that preseeding an unknown key is refused
#[test]
fn test_defaults_unknown_key() {
    let temp_dir = tempdir().unwrap();
    cli(temp_dir.path())
        .arg("--output")
        .arg(temp_dir.path().join("mlat-client"))
        .args(["defaults", "--set", "colour=blue"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown setting 'colour'"));
}

/// Test writing, checking and deriving arguments from a configuration
#[test]
fn test_defaults_check_and_args() {
    let temp_dir = tempdir().unwrap();
    let output = temp_dir.path().join("mlat-client");
    write_enabled(temp_dir.path(), &output);

    let content = std::fs::read_to_string(&output).unwrap();
    assert!(content.contains("START_CLIENT=\"yes\""));
    assert!(content.contains("SERVER_HOSTPORT=\"mlat.mutability.co.uk:40147\""));
    assert!(content.contains("INPUT_TYPE=\"dump1090\""));
    assert!(content.contains("RESULTS=\"basestation,listen,31003\""));

    cli(temp_dir.path())
        .arg("--output")
        .arg(&output)
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("is valid"));

    cli(temp_dir.path())
        .arg("--output")
        .arg(&output)
        .arg("args")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "--input-type dump1090 --input-connect localhost:30005",
        ))
        .stdout(predicate::str::contains("--lat 51.4769 --lon -0.0005 --alt 47"))
        .stdout(predicate::str::contains("s3cr3t").not());
}

/// Test that re-running with the committed defaults reproduces the file
#[test]
fn test_rerun_is_idempotent() {
    let temp_dir = tempdir().unwrap();
    let output = temp_dir.path().join("mlat-client");
    write_enabled(temp_dir.path(), &output);
    let first = std::fs::read(&output).unwrap();

    cli(temp_dir.path())
        .arg("--output")
        .arg(&output)
        .arg("defaults")
        .assert()
        .success();

    assert_eq!(std::fs::read(&output).unwrap(), first);
}

/// Test that an answer spanning lines is refused instead of corrupting the file
#[test]
fn test_defaults_multiline_value_refused() {
    let temp_dir = tempdir().unwrap();
    let output = temp_dir.path().join("mlat-client");
    write_enabled(temp_dir.path(), &output);
    let before = std::fs::read(&output).unwrap();

    cli(temp_dir.path())
        .arg("--output")
        .arg(&output)
        .args(["defaults", "--set", "extra-args=--a\n--b"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("extra-args"))
        .stderr(predicate::str::contains("single line"));

    assert_eq!(std::fs::read(&output).unwrap(), before);

    cli(temp_dir.path())
        .arg("--output")
        .arg(&output)
        .arg("check")
        .assert()
        .success();
}

/// Test an interactive run, including a rejected answer
#[test]
fn test_configure_interactive() {
    let temp_dir = tempdir().unwrap();
    let output = temp_dir.path().join("mlat-client");

    let answers = [
        "yes", // start-client
        "root", // run-as-user, rejected
        "feeder", // run-as-user
        "", // server-hostport
        "EGLL", // server-user
        "key", // server-key
        "", // log-file
        "51.4769", // receiver-lat
        "-0.0005", // receiver-lon
        "47", // receiver-alt
        "2", // input-type (beast)
        "", // input-hostport
        "none", // results
        "", // extra-args
    ]
    .join("\n")
        + "\n";

    cli(temp_dir.path())
        .arg("--output")
        .arg(&output)
        .arg("configure")
        .write_stdin(answers)
        .assert()
        .success()
        .stdout(predicate::str::contains("Invalid user name."))
        .stdout(predicate::str::contains("Wrote configuration"));

    let content = std::fs::read_to_string(&output).unwrap();
    assert!(content.contains("RUN_AS_USER=\"feeder\""));
    assert!(content.contains("INPUT_TYPE=\"beast\""));
    assert!(content.contains("RESULTS=\"none\""));
}

/// Test that an interrupted run leaves the previous configuration alone
#[test]
fn test_configure_abort_keeps_previous() {
    let temp_dir = tempdir().unwrap();
    let output = temp_dir.path().join("mlat-client");
    write_enabled(temp_dir.path(), &output);
    let before = std::fs::read(&output).unwrap();

    cli(temp_dir.path())
        .arg("--output")
        .arg(&output)
        .arg("configure")
        .write_stdin("yes\nsomeone\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("aborted"));

    assert_eq!(std::fs::read(&output).unwrap(), before);
}

/// Test that check reports invalid settings
#[test]
fn test_check_invalid_artifact() {
    let temp_dir = tempdir().unwrap();
    let output = temp_dir.path().join("mlat-client");
    std::fs::write(
        &output,
        "START_CLIENT=\"yes\"\nRUN_AS_USER=\"root\"\nRECEIVER_LAT=\"12e3\"\n",
    )
    .unwrap();

    cli(temp_dir.path())
        .arg("--output")
        .arg(&output)
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("run-as-user: Invalid user name: root"))
        .stderr(predicate::str::contains("receiver-lat: Invalid number: 12e3"));
}

/// Test check without any configuration
#[test]
fn test_check_missing_artifact() {
    let temp_dir = tempdir().unwrap();
    cli(temp_dir.path())
        .arg("--output")
        .arg(temp_dir.path().join("absent"))
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No configuration found"));
}

/// Test args refuses a disabled client
#[test]
fn test_args_disabled() {
    let temp_dir = tempdir().unwrap();
    let output = temp_dir.path().join("mlat-client");
    cli(temp_dir.path())
        .arg("--output")
        .arg(&output)
        .arg("defaults")
        .assert()
        .success();

    cli(temp_dir.path())
        .arg("--output")
        .arg(&output)
        .arg("args")
        .assert()
        .failure()
        .stderr(predicate::str::contains("disabled"));
}

/// Test show masks the server key
#[test]
fn test_show_json_masks_key() {
    let temp_dir = tempdir().unwrap();
    let output = temp_dir.path().join("mlat-client");
    write_enabled(temp_dir.path(), &output);

    cli(temp_dir.path())
        .arg("--output")
        .arg(&output)
        .args(["show", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"server-user\": \"feeder\""))
        .stdout(predicate::str::contains("\"server-key\": \"********\""))
        .stdout(predicate::str::contains("s3cr3t").not());
}

/// Test the tool configuration supplies the output path
#[test]
fn test_config_file_output() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("tool.toml");
    let output = temp_dir.path().join("from-config");
    std::fs::write(
        &config_path,
        format!(
            "name = \"mlat-client\"\noutput = \"{}\"\n\n[logging]\nlevel = \"warn\"\n",
            output.display()
        ),
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("mlat-client-config").unwrap();
    cmd.arg("--config").arg(&config_path).arg("defaults");
    cmd.assert().success();

    assert!(output.exists());
}

/// Test init command creates config file
#[test]
fn test_init_creates_config() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("mlat-client-config.toml");

    let mut cmd = Command::cargo_bin("mlat-client-config").unwrap();
    cmd.arg("--config").arg(&config_path).arg("init");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Created configuration file"));

    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("SPDX-License-Identifier"));
    assert!(content.contains("output = \"/etc/default/mlat-client\""));
}

/// Test init with --force overwrites existing config
#[test]
fn test_init_force() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("mlat-client-config.toml");
    std::fs::write(&config_path, "old content").unwrap();

    let mut cmd = Command::cargo_bin("mlat-client-config").unwrap();
    cmd.arg("--config").arg(&config_path).arg("init");
    cmd.assert().failure();

    let mut cmd = Command::cargo_bin("mlat-client-config").unwrap();
    cmd.arg("--config").arg(&config_path).arg("init").arg("--force");
    cmd.assert().success();

    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(!content.contains("old content"));
    assert!(content.contains("name = \"mlat-client\""));
}
