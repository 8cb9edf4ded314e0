//! `labinv` binary integration tests.
//!
//! Every command runs with data directories, config lookup and the working
//! directory pointed into a fresh temp dir.
//!
//! ## Exit Codes
//! - 0: Success
//! - 1: Operation or validation failure
//! - 2: Usage error

#![allow(clippy::expect_used)]

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use serde_json::Value as JsonValue;
use tempfile::TempDir;

fn labinv(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("labinv").expect("labinv binary");
    cmd.current_dir(root)
        .env("HOME", root)
        .env("XDG_CONFIG_HOME", root.join("config"))
        .env("LABINV_STORAGE__MATERIAL_DATA_DIR", root.join("materials"))
        .env("LABINV_STORAGE__DISH_DATA_DIR", root.join("dishes"))
        .env_remove("RUST_LOG");
    cmd
}

fn json_output(cmd: &mut Command) -> JsonValue {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).expect("valid JSON on stdout")
}

#[test]
fn config_show_reflects_environment() {
    let root = TempDir::new().expect("tempdir");
    let config = json_output(labinv(root.path()).args(["config", "show", "--json"]));

    let dish_dir = root.path().join("dishes");
    assert_eq!(
        config["storage"]["dish_data_dir"],
        JsonValue::String(dish_dir.display().to_string())
    );
    assert_eq!(config["preparation"]["agarose_expiration_days"], 60);
    // config show never touches the data directories
    assert!(!dish_dir.exists());
}

#[test]
fn config_file_flag_must_exist() {
    let root = TempDir::new().expect("tempdir");
    labinv(root.path())
        .args(["--config", "missing.toml", "config", "show"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn material_workflow() {
    let root = TempDir::new().expect("tempdir");
    labinv(root.path())
        .args(["water", "batch", "add", "FW-1", "--date", "2025-03-10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("FW-1 (20250310)"));
    labinv(root.path())
        .args([
            "agarose", "bottle", "add", "AG-1",
            "--source-number", "SRC-1",
            "--manufacturer", "Thermo",
            "--received", "20250101",
            "--expires", "20261231",
            "--location", "shelf 3",
        ])
        .assert()
        .success();

    let prepared = json_output(labinv(root.path()).args([
        "--json", "agarose", "solution", "prepare", "--bottle", "AG-1", "--water", "FW-1",
    ]));
    let (id, solution) = prepared
        .as_object()
        .and_then(|m| m.iter().next())
        .expect("one prepared solution");
    assert!(id.starts_with("AGSOL_"), "{id}");
    assert_eq!(solution["concentration"], 0.02);
    assert_eq!(solution["volume_prepared_mL"], 100.0);
    assert_eq!(solution["storage"]["location"], "2E.260-6-3");

    labinv(root.path())
        .args(["agarose", "solution", "show", id])
        .assert()
        .success()
        .stdout(predicate::str::contains("water:         FW-1"));

    let on_disk: JsonValue = serde_json::from_str(
        &fs::read_to_string(root.path().join("materials").join("agarose_solutions.json"))
            .expect("solutions file"),
    )
    .expect("solutions json");
    assert!(on_disk["agarose_solutions"].get(id).is_some());
}

#[test]
fn add_commands_honor_json_flag() {
    let root = TempDir::new().expect("tempdir");
    let batch = json_output(labinv(root.path()).args([
        "--json", "water", "batch", "add", "FW-2", "--date", "2025-03-11",
    ]));
    assert_eq!(batch["FW-2"]["preparation_date"], "20250311");

    let agarose = json_output(labinv(root.path()).args([
        "--json", "agarose", "bottle", "add", "AG-2",
        "--source-number", "SRC-2",
        "--manufacturer", "Thermo",
        "--received", "20250101",
        "--expires", "20261231",
        "--location", "shelf 1",
    ]));
    assert_eq!(agarose["AG-2"]["manufacturer"], "Thermo");

    let pls = json_output(labinv(root.path()).args([
        "--json", "pls", "bottle", "add", "PLS-2",
        "--manufacturer", "Sigma",
        "--expires", "20261231",
        "--location", "fridge",
    ]));
    assert_eq!(pls["PLS-2"]["expiration_date"], "20261231");
}

#[test]
fn unknown_references_fail_with_exit_code_one() {
    let root = TempDir::new().expect("tempdir");
    labinv(root.path())
        .args(["water", "filter", "add", "--source", "FW-404"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("error: fish water batch \"FW-404\" not found"));
    labinv(root.path())
        .args(["pls", "aliquot", "add", "--bottle", "PLS-404"])
        .assert()
        .code(1);
    labinv(root.path())
        .args(["dish", "show", "NOPE_1"])
        .assert()
        .code(1);
}

#[test]
fn usage_errors_exit_with_two() {
    let root = TempDir::new().expect("tempdir");
    labinv(root.path())
        .args(["dish", "list", "--sort", "color"])
        .assert()
        .code(2);
    labinv(root.path())
        .args(["agarose", "bottle", "add", "AG-1", "--received", "yesterday"])
        .assert()
        .code(2);
}

#[test]
fn dish_workflow() {
    let root = TempDir::new().expect("tempdir");
    labinv(root.path())
        .args([
            "dish", "create", "--cross", "CR7", "--number", "2", "--genotype", "mitfa",
            "--responsible", "Ana", "--dof", "20250312", "--count", "20",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("CR7_2_20250312.json"));
    assert!(root.path().join("dishes").join("CR7_2_20250312.json").exists());

    labinv(root.path())
        .args([
            "dish", "check", "CR7_2", "--time", "2025031509:30:00", "--dead", "3",
            "--water-changed", "--vol-water-changed", "15", "--notes", "cloudy",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("17 of 20 fish remaining"));

    let listed = json_output(labinv(root.path()).args(["dish", "list", "--json", "--search", "cloudy"]));
    let dishes = listed["dishes"].as_array().expect("dishes array");
    assert_eq!(dishes.len(), 1);
    let check = &dishes[0]["quality_checks"]["2025031509:30:00"];
    assert_eq!(check["num_dead"], 3);
    assert_eq!(check["vol_water_changed"], 15.0);

    labinv(root.path())
        .args(["dish", "terminate", "CR7_2", "--reason", "done", "--date", "20250320"])
        .assert()
        .success()
        .stdout(predicate::str::contains("inactive since 20250320 (done)"));

    let active = json_output(labinv(root.path()).args(["dish", "list", "--json", "--status", "active"]));
    assert_eq!(active["dishes"].as_array().map(Vec::len), Some(0));

    labinv(root.path())
        .args(["dish", "create", "--cross", "CR7", "--number", "2", "--genotype", "wt", "--responsible", "Bo"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn validate_fails_on_broken_documents() {
    let root = TempDir::new().expect("tempdir");
    labinv(root.path())
        .args(["water", "batch", "add", "FW-1", "--date", "20250310"])
        .assert()
        .success();
    labinv(root.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("0 invalid"));

    fs::write(
        root.path().join("materials").join("agarose_bottles.json"),
        r#"{"agarose_bottles": {"AG-1": {"manufacturer": "Thermo"}}}"#,
    )
    .expect("write broken file");
    labinv(root.path())
        .arg("validate")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("INVALID"));
}

#[test]
fn export_survival_writes_both_reports() {
    let root = TempDir::new().expect("tempdir");
    labinv(root.path())
        .args([
            "dish", "create", "--cross", "CR3", "--genotype", "wt", "--responsible", "Ana",
            "--dof", "20250310", "--count", "10",
        ])
        .assert()
        .success();

    labinv(root.path())
        .args(["export", "survival", "--both"])
        .assert()
        .success();
    let detailed = fs::read_to_string(root.path().join("survivability_report.csv"))
        .expect("detailed report in working directory");
    assert!(detailed.starts_with("dish_id,cross_id,genotype,date_fertilized"));
    let summary = fs::read_to_string(root.path().join("survivability_summary.csv"))
        .expect("summary report in working directory");
    assert!(summary.contains("CR3,wt,20250310,1,10,10,100.0,"), "{summary}");

    let empty = root.path().join("empty");
    fs::create_dir_all(&empty).expect("empty dir");
    labinv(root.path())
        .args(["export", "survival", "--dishes-dir"])
        .arg(&empty)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no dish data"));
}
