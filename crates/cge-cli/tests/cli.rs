use assert_cmd::Command;
use cge_io::{reference_technology, write_raw_tables};
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn cge(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("cge").unwrap();
    cmd.current_dir(dir);
    cmd
}

fn seed_raw_tables(dir: &Path) {
    write_raw_tables(&dir.join("data/raw"), &reference_technology()).unwrap();
}

#[test]
fn help_lists_every_stage() {
    let tmp = tempdir().unwrap();
    cge(tmp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("generate")
                .and(predicate::str::contains("calibrate"))
                .and(predicate::str::contains("run"))
                .and(predicate::str::contains("report"))
                .and(predicate::str::contains("trade"))
                .and(predicate::str::contains("pipeline"))
                .and(predicate::str::contains("scenarios")),
        );
}

#[test]
fn pipeline_runs_end_to_end() {
    let tmp = tempdir().unwrap();
    seed_raw_tables(tmp.path());

    cge(tmp.path())
        .arg("pipeline")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Reference")
                .and(predicate::str::contains("Cap (-20%)"))
                .and(predicate::str::contains("Tax ($10/tCO2)"))
                .and(predicate::str::contains("Double_TC_BA"))
                .and(predicate::str::contains("Pipeline complete")),
        );

    let root = tmp.path();
    assert!(root.join("data/generated/steel/manifest.json").exists());
    for file in [
        "calibration.json",
        "sweep.json",
        "summary.csv",
        "plants.csv",
        "factors.csv",
        "report.json",
        "trade_results.csv",
    ] {
        assert!(root.join("output").join(file).exists(), "missing {file}");
    }

    let summary = fs::read_to_string(root.join("output/summary.csv")).unwrap();
    let header = summary.lines().next().unwrap();
    assert!(header.starts_with("Scenario,Production,Emissions,Steel Price,Carbon Price"));
    assert!(summary.lines().nth(1).unwrap().starts_with("Reference,"));

    let runs = fs::read_dir(root.join("output/runs")).unwrap().count();
    assert_eq!(runs, 5);

    cge(root).arg("report").assert().success();
    let again = fs::read_to_string(root.join("output/summary.csv")).unwrap();
    assert_eq!(again, summary);
}

#[test]
fn stages_chain_through_default_paths() {
    let tmp = tempdir().unwrap();
    seed_raw_tables(tmp.path());

    cge(tmp.path())
        .args(["generate", "--seed", "7"])
        .assert()
        .success()
        .stdout(predicate::str::contains("seed 7"));
    cge(tmp.path())
        .arg("calibrate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Steel price"));
    cge(tmp.path())
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("Benchmark replicated"));
    cge(tmp.path())
        .args(["report", "--format", "csv"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Scenario,"));
}

#[test]
fn run_recalibrates_after_dataset_changes() {
    let tmp = tempdir().unwrap();
    seed_raw_tables(tmp.path());

    cge(tmp.path()).args(["pipeline", "--skip-trade"]).assert().success();
    let before = fs::read_to_string(tmp.path().join("output/calibration.json")).unwrap();

    cge(tmp.path())
        .args(["generate", "--seed", "7"])
        .assert()
        .success();
    cge(tmp.path())
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("Benchmark replicated"))
        .stderr(predicate::str::contains("recalibrating"));

    let after = fs::read_to_string(tmp.path().join("output/calibration.json")).unwrap();
    assert_ne!(before, after);
}

#[test]
fn config_file_redirects_outputs() {
    let tmp = tempdir().unwrap();
    seed_raw_tables(tmp.path());
    fs::write(
        tmp.path().join("cge.toml"),
        "[data]\ndataset = \"steel.json\"\noutput_dir = \"results\"\n\n[logging]\nlevel = \"warn\"\n",
    )
    .unwrap();

    cge(tmp.path()).arg("generate").assert().success();
    assert!(tmp.path().join("steel.json").exists());
    cge(tmp.path()).arg("calibrate").assert().success();
    assert!(tmp.path().join("results/calibration.json").exists());
}

#[test]
fn missing_raw_input_fails_with_file_name() {
    let tmp = tempdir().unwrap();
    cge(tmp.path())
        .arg("generate")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("abar.csv"));
}

#[test]
fn missing_dataset_fails() {
    let tmp = tempdir().unwrap();
    cge(tmp.path())
        .arg("calibrate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing input file"));
}

#[test]
fn scenarios_validate_and_list() {
    let tmp = tempdir().unwrap();
    let spec = tmp.path().join("scenarios.yaml");
    fs::write(
        &spec,
        "scenarios:\n  - scenario_id: Deep cap\n    policy: emissions_cap\n    cap_fraction: 0.6\n",
    )
    .unwrap();

    cge(tmp.path())
        .args(["scenarios", "validate", "scenarios.yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("validated successfully"));
    cge(tmp.path())
        .args(["scenarios", "list", "scenarios.yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Reference").and(predicate::str::contains("Deep cap")));
    cge(tmp.path())
        .args(["scenarios", "list", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"carbon_tax\": 10.0"));
}

#[test]
fn invalid_scenario_spec_is_rejected() {
    let tmp = tempdir().unwrap();
    fs::write(
        tmp.path().join("bad.yaml"),
        "scenarios:\n  - scenario_id: tax\n    policy: carbon_tax\n",
    )
    .unwrap();
    cge(tmp.path())
        .args(["scenarios", "validate", "bad.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("needs carbon_tax"));
}
