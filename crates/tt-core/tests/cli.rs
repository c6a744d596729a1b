//! CLI tests for tt-core: formats, exit codes, and error reporting.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

/// Get a Command for the tt-core binary with a clean configuration environment.
fn tt_core() -> Command {
    let mut cmd = Command::cargo_bin("tt-core").expect("tt-core binary should exist");
    cmd.env_remove("TRACT_TYPOLOGY_CONFIG")
        .env_remove("TRACT_TYPOLOGY_CONFIG_DIR")
        .env_remove("TT_LOG")
        .env_remove("RUST_LOG");
    cmd
}

/// Write a synthetic unit set produced by the binary itself.
fn synth_file(dir: &TempDir, n: usize, invalid: usize) -> std::path::PathBuf {
    let out = tt_core()
        .args(["-q", "synth", "--seed", "3"])
        .args(["-n", &n.to_string(), "--invalid", &invalid.to_string()])
        .output()
        .unwrap();
    assert!(out.status.success());
    let path = dir.path().join("units.json");
    std::fs::write(&path, &out.stdout).unwrap();
    path
}

/// Global flags shared by fitting commands.
const QUICK: [&str; 3] = ["-q", "--preset", "quick"];

/// Fit overrides, placed after the subcommand.
const SMALL_FIT: [&str; 4] = ["--max-classes", "2", "--restarts", "2"];

fn tract(id: usize, poverty: f64) -> serde_json::Value {
    let spread = id as f64;
    serde_json::json!({
        "id": format!("T{}", id),
        "name": format!("Tract {}", id),
        "counts": {
            "total_population": 1000.0,
            "native_born": 900.0 - 20.0 * spread,
            "occupied_units": 400.0,
            "renter_occupied": 100.0 + 15.0 * spread,
            "poverty_universe": 1000.0,
            "below_poverty": poverty * 1000.0,
            "population_25_plus": 700.0,
            "bachelors_plus": 200.0 + 10.0 * spread,
            "housing_units": 420.0,
            "units_5_plus": 50.0 + 12.0 * spread,
        }
    })
}

fn write_json(dir: &TempDir, name: &str, value: &serde_json::Value) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, serde_json::to_string(value).unwrap()).unwrap();
    path
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

// ============================================================================
// Successful Runs
// ============================================================================

mod success {
    use super::*;

    #[test]
    fn synth_emits_requested_units() {
        let out = tt_core()
            .args(["-q", "synth", "-n", "10", "--invalid", "2"])
            .output()
            .unwrap();
        assert!(out.status.success());
        let units: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
        assert_eq!(units.as_array().unwrap().len(), 12);
    }

    #[test]
    fn compare_prints_sorted_table() {
        let dir = TempDir::new().unwrap();
        let input = synth_file(&dir, 60, 2);
        let out = tt_core()
            .args(QUICK)
            .args(["compare", path_str(&input)])
            .args(SMALL_FIT)
            .output()
            .unwrap();
        assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

        let doc: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
        assert_eq!(doc["transform"]["total"], 62);
        assert_eq!(doc["transform"]["retained"], 60);
        let rows = doc["comparison"]["rows"].as_array().unwrap();
        assert_eq!(rows.len(), 4);
        let bics: Vec<f64> = rows.iter().map(|r| r["bic"].as_f64().unwrap()).collect();
        assert!(bics.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(doc["config"]["config_source"], "preset quick");
    }

    #[test]
    fn compare_sorts_by_requested_criterion() {
        let dir = TempDir::new().unwrap();
        let input = synth_file(&dir, 40, 0);
        let out = tt_core()
            .args(QUICK)
            .args(["compare", path_str(&input), "--sort", "aic"])
            .args(SMALL_FIT)
            .output()
            .unwrap();
        assert!(out.status.success());
        let doc: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
        assert_eq!(doc["comparison"]["sorted_by"], "aic");
        let aics: Vec<f64> = doc["comparison"]["rows"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["aic"].as_f64().unwrap())
            .collect();
        assert!(aics.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn classify_prints_one_row_per_retained_unit() {
        let dir = TempDir::new().unwrap();
        let input = synth_file(&dir, 50, 3);
        let out = tt_core()
            .args(QUICK)
            .args(["classify", path_str(&input), "-k", "2", "-s", "vvi"])
            .args(SMALL_FIT)
            .output()
            .unwrap();
        assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

        let doc: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
        assert_eq!(doc["fit"]["structure"], "VVI");
        assert_eq!(doc["table"]["rows"].as_array().unwrap().len(), 50);
        assert_eq!(doc["profiles"].as_array().unwrap().len(), 2);
        let columns = doc["table"]["columns"].as_array().unwrap();
        assert_eq!(columns[0], "id");
        assert_eq!(columns[3], "p_1");
    }

    #[test]
    fn classify_accepts_model_numbers_and_custom_columns() {
        let dir = TempDir::new().unwrap();
        let input = synth_file(&dir, 30, 0);
        tt_core()
            .args(QUICK)
            .args(["--format", "jsonl", "classify", path_str(&input)])
            .args(["-k", "2", "-s", "1", "--columns", "id,class,p_2,raw_poverty"])
            .args(SMALL_FIT)
            .assert()
            .success()
            .stdout(predicate::str::contains("\"raw_poverty\""))
            .stdout(predicate::function(|s: &str| s.lines().count() == 30));
    }

    #[test]
    fn markdown_and_summary_formats() {
        let dir = TempDir::new().unwrap();
        let input = synth_file(&dir, 30, 1);
        tt_core()
            .args(QUICK)
            .args(["--format", "md", "compare", path_str(&input)])
            .args(SMALL_FIT)
            .assert()
            .success()
            .stdout(predicate::str::starts_with("# Model comparison"))
            .stdout(predicate::str::contains("| k | structure |"));

        tt_core()
            .args(QUICK)
            .args(["--format", "summary", "classify", path_str(&input), "-k", "2", "-s", "EEI"])
            .args(SMALL_FIT)
            .assert()
            .success()
            .stdout(predicate::str::contains("classify: EEI k=2 on 30 units"));
    }

    #[test]
    fn check_and_presets() {
        tt_core()
            .args(["-q", "--preset", "thorough", "--format", "summary", "check"])
            .assert()
            .success()
            .stdout(predicate::str::contains("check: OK"));

        tt_core()
            .args(["-q", "--format", "jsonl", "config", "presets"])
            .assert()
            .success()
            .stdout(predicate::function(|s: &str| s.lines().count() == 3));
    }

    #[test]
    fn config_file_is_loaded() {
        let dir = TempDir::new().unwrap();
        let out = tt_core()
            .args(["-q", "--preset", "quick", "config", "show"])
            .output()
            .unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
        let path = write_json(&dir, "tract_typology.json", &doc["config"]);

        tt_core()
            .args(["-q", "--config", path_str(&path), "check"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"status\": \"ok\""))
            .stdout(predicate::str::contains("CLI argument"));
    }

    #[test]
    fn help_exits_zero() {
        tt_core().arg("--help").assert().code(0);
        tt_core().arg("--version").assert().code(0);
    }
}

// ============================================================================
// Exit Codes
// ============================================================================

mod exit_codes {
    use super::*;

    #[test]
    fn bad_arguments_exit_10() {
        tt_core().arg("--nonexistent-flag").assert().code(10);
        tt_core().arg("frobnicate").assert().code(10);
        tt_core().args(["classify", "units.json"]).assert().code(10);
        tt_core()
            .args(["--config", "a.json", "--preset", "quick", "check"])
            .assert()
            .code(10);
    }

    #[test]
    fn unknown_structure_exits_11() {
        let dir = TempDir::new().unwrap();
        let input = synth_file(&dir, 20, 0);
        tt_core()
            .args(QUICK)
            .args(["classify", path_str(&input), "-k", "2", "-s", "XYZ"])
            .args(SMALL_FIT)
            .assert()
            .code(11)
            .stderr(predicate::str::contains("XYZ"));
    }

    #[test]
    fn invalid_overrides_exit_11() {
        let dir = TempDir::new().unwrap();
        let input = synth_file(&dir, 20, 0);
        tt_core()
            .args(QUICK)
            .args(["compare", path_str(&input), "--min-classes", "3", "--max-classes", "2"])
            .assert()
            .code(11);
        tt_core()
            .args(QUICK)
            .args(["classify", path_str(&input), "-k", "50", "-s", "EEI"])
            .args(SMALL_FIT)
            .assert()
            .code(11)
            .stderr(predicate::str::contains("classes"));
        tt_core()
            .args(QUICK)
            .args(["classify", path_str(&input), "-k", "2", "-s", "EEI", "--columns", "id,geometry"])
            .args(SMALL_FIT)
            .assert()
            .code(11)
            .stderr(predicate::str::contains("geometry"));
    }

    #[test]
    fn unusable_input_exits_12() {
        let dir = TempDir::new().unwrap();
        let empty = write_json(&dir, "empty.json", &serde_json::json!([]));
        tt_core()
            .args(QUICK)
            .args(["compare", path_str(&empty)])
            .args(SMALL_FIT)
            .assert()
            .code(12);

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "[{\"id\": ").unwrap();
        tt_core()
            .args(QUICK)
            .args(["compare", path_str(&broken)])
            .args(SMALL_FIT)
            .assert()
            .code(12);
    }

    #[test]
    fn constant_feature_exits_13() {
        let dir = TempDir::new().unwrap();
        let units: Vec<_> = (0..8).map(|i| tract(i, 0.1)).collect();
        let path = write_json(&dir, "flat.json", &serde_json::json!(units));
        tt_core()
            .args(QUICK)
            .args(["compare", path_str(&path)])
            .args(SMALL_FIT)
            .assert()
            .code(13)
            .stderr(predicate::str::contains("poverty"));

        let out = tt_core()
            .args(QUICK)
            .args(["compare", path_str(&path)])
            .args(SMALL_FIT)
            .output()
            .unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&out.stderr).unwrap();
        assert_eq!(doc["error"]["category"], "config");
        assert_eq!(doc["error"]["context"]["feature"], "poverty");
        assert_eq!(doc["exit_code_name"], "ERR_DEGENERATE");
    }

    #[test]
    fn missing_input_exits_21() {
        tt_core()
            .args(QUICK)
            .args(["compare", "/nonexistent/units.json"])
            .args(SMALL_FIT)
            .assert()
            .code(21)
            .stderr(predicate::str::contains("/nonexistent/units.json"));
    }

    #[test]
    fn json_errors_are_structured() {
        let out = tt_core()
            .args(QUICK)
            .args(["compare", "/nonexistent/units.json"])
            .args(SMALL_FIT)
            .output()
            .unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&out.stderr).unwrap();
        assert_eq!(doc["status"], "error");
        assert_eq!(doc["exit_code"], 21);
        assert_eq!(doc["error"]["category"], "io");
    }
}
