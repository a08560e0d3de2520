use std::process::Command;

fn temp_path(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "foresight-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

#[test]
fn cli_list_scenarios_writes_output() {
    let exe = env!("CARGO_BIN_EXE_foresight-tester");
    let output_path = temp_path("list");
    let status = Command::new(exe)
        .args(["--list-scenarios", "--output"])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(&output_path).expect("read output");
    assert!(content.contains("Available scenarios"));
    assert!(content.contains("full-workflow"));
    let _ = std::fs::remove_file(output_path);
}

#[test]
fn cli_runs_all_scenarios_with_json_report() {
    let exe = env!("CARGO_BIN_EXE_foresight-tester");
    let output_path = temp_path("run");
    let output = Command::new(exe)
        .args([
            "--report",
            "json",
            "--scenarios",
            "all",
            "--iterations",
            "2",
            "--seeds",
            "1,99",
            "--output",
        ])
        .arg(&output_path)
        .output()
        .expect("run cli");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Foresight Automated Tester"));

    let content = std::fs::read_to_string(&output_path).expect("read report");
    let report: serde_json::Value = serde_json::from_str(&content).expect("json report");
    let runs = report.as_array().expect("array of results");
    assert_eq!(runs.len(), 16);
    assert!(runs.iter().all(|run| run["passed"] == true));
    let _ = std::fs::remove_file(output_path);
}

#[test]
fn cli_keeps_artifacts_in_save_dir() {
    let exe = env!("CARGO_BIN_EXE_foresight-tester");
    let save_dir = temp_path("artifacts");
    let status = Command::new(exe)
        .args(["--scenarios", "full-workflow", "--iterations", "1", "--seeds", "5"])
        .arg("--save-dir")
        .arg(&save_dir)
        .status()
        .expect("run cli");
    assert!(status.success());

    let seed_dir = save_dir.join("full-workflow").join("seed-5");
    let run_dir = std::fs::read_dir(&seed_dir)
        .expect("seed dir")
        .filter_map(Result::ok)
        .next()
        .expect("timestamped run dir")
        .path();
    assert!(run_dir.join("session.json").exists());
    assert!(run_dir.join("report.md").exists());
    assert!(run_dir.join("final.json").exists());
    let _ = std::fs::remove_dir_all(save_dir);
}

#[test]
fn cli_fails_on_unknown_scenario() {
    let exe = env!("CARGO_BIN_EXE_foresight-tester");
    let output = Command::new(exe)
        .args(["--scenarios", "smoke", "--iterations", "1"])
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown scenario"));
}

#[test]
fn cli_rejects_invalid_seed() {
    let exe = env!("CARGO_BIN_EXE_foresight-tester");
    let output = Command::new(exe)
        .args(["--seeds", "not-a-number"])
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid seed"));
}
