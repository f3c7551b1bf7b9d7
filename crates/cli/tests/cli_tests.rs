//! CLI integration tests

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Run fleetctl with an isolated config file and JSON output unless overridden
fn fleetctl(config_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_fleetctl"))
        .env("FLEETCTL_CONFIG", config_dir.join("config.json"))
        .env_remove("FLEETCTL_FORMAT")
        .env("NO_COLOR", "1")
        .args(args)
        .output()
        .expect("Failed to execute fleetctl")
}

fn json(output: &Output) -> serde_json::Value {
    assert!(
        output.status.success(),
        "fleetctl failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let dir = TempDir::new().unwrap();
    let output = fleetctl(dir.path(), &["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("Fleet Optimizer"), "Should show app name");
    for command in ["recommend", "estimate", "score", "tiers", "trend", "report", "savings", "roi"] {
        assert!(stdout.contains(command), "Should show {command} command");
    }
}

#[test]
fn test_recommend_scale_up_with_vertical_step() {
    let dir = TempDir::new().unwrap();
    let output = fleetctl(
        dir.path(),
        &[
            "-f", "json", "recommend", "--instances", "1", "--tier", "t2.micro", "--cpu", "95",
            "--memory", "92", "--network", "50",
        ],
    );
    let rec = json(&output);

    assert_eq!(rec["action"], "scale_up");
    assert_eq!(rec["recommended_instances"], 2);
    assert_eq!(rec["recommended_instance_type"], "t2.small");
}

#[test]
fn test_recommend_scale_down() {
    let dir = TempDir::new().unwrap();
    let output = fleetctl(
        dir.path(),
        &[
            "-f", "json", "recommend", "--instances", "3", "--tier", "t2.medium", "--cpu", "10",
            "--memory", "15",
        ],
    );
    let rec = json(&output);

    assert_eq!(rec["action"], "scale_down");
    assert_eq!(rec["recommended_instances"], 2);
    assert_eq!(rec["recommended_instance_type"], "t2.medium");
}

#[test]
fn test_recommend_infeasible_budget_prints_null() {
    let dir = TempDir::new().unwrap();
    let output = fleetctl(
        dir.path(),
        &[
            "-f", "json", "recommend", "--cpu", "95", "--memory", "92", "--budget", "1",
        ],
    );
    assert!(json(&output).is_null());
}

#[test]
fn test_recommend_uses_config_budget() {
    let dir = TempDir::new().unwrap();
    let saved = fleetctl(dir.path(), &["config", "set", "--budget", "20"]);
    assert!(saved.status.success());

    let output = fleetctl(
        dir.path(),
        &["-f", "json", "recommend", "--cpu", "95", "--memory", "92"],
    );
    let rec = json(&output);
    assert_eq!(rec["action"], "optimize");
    assert!(rec["estimated_cost"]["monthly"].as_f64().unwrap() <= 20.0);
}

#[test]
fn test_estimate_cost() {
    let dir = TempDir::new().unwrap();
    let output = fleetctl(
        dir.path(),
        &["-f", "json", "estimate", "--instances", "2", "--tier", "t3.medium"],
    );
    let cost = json(&output);

    let hourly = cost["hourly"].as_f64().unwrap();
    let monthly = cost["monthly"].as_f64().unwrap();
    assert!((hourly - 0.0832).abs() < 1e-9);
    assert!((monthly - hourly * 24.0 * 30.0).abs() < 1e-9);
}

#[test]
fn test_score_is_bounded() {
    let dir = TempDir::new().unwrap();
    let output = fleetctl(
        dir.path(),
        &["-f", "json", "score", "--cpu", "-50", "--memory", "250"],
    );
    let score = json(&output)["optimization_score"].as_f64().unwrap();
    assert!((0.0..=100.0).contains(&score));
}

#[test]
fn test_trend_from_file() {
    let dir = TempDir::new().unwrap();
    let costs = dir.path().join("costs.json");
    std::fs::write(&costs, "[]").unwrap();

    let output = fleetctl(
        dir.path(),
        &["-f", "json", "trend", "--costs", costs.to_str().unwrap()],
    );
    let analysis = json(&output);
    assert_eq!(analysis["trend"], "stable");
    assert_eq!(analysis["total_cost"], 0.0);
}

#[test]
fn test_report_from_file() {
    let dir = TempDir::new().unwrap();
    let costs = dir.path().join("costs.json");
    std::fs::write(
        &costs,
        r#"[
            {"timestamp": "2024-03-01T10:00:00Z", "cost": 10.0, "resource_type": "t2.micro"},
            {"timestamp": "2024-03-02T10:00:00Z", "cost": 20.0, "resource_type": "t2.small"},
            {"timestamp": "2024-03-05T10:00:00Z", "cost": 99.0, "resource_type": "t2.small"}
        ]"#,
    )
    .unwrap();

    let output = fleetctl(
        dir.path(),
        &[
            "-f", "json", "report", "--costs", costs.to_str().unwrap(), "--start", "2024-03-01",
            "--end", "2024-03-02",
        ],
    );
    let report = json(&output);
    assert_eq!(report["period"]["days"], 2);
    assert_eq!(report["costs"]["total"], 30.0);
    assert_eq!(report["costs"]["by_resource_type"]["t2.small"], 20.0);
}

#[test]
fn test_trend_missing_file_fails() {
    let dir = TempDir::new().unwrap();
    let output = fleetctl(dir.path(), &["trend", "--costs", "/nonexistent/costs.json"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to read"));
}

#[test]
fn test_savings_reserved_fallback() {
    let dir = TempDir::new().unwrap();
    let output = fleetctl(
        dir.path(),
        &[
            "-f", "json", "savings", "--instances", "3", "--tier", "t3.large", "--cpu", "70",
            "--memory", "65",
        ],
    );
    let suggestions = json(&output);
    assert_eq!(suggestions.as_array().unwrap().len(), 1);
    assert_eq!(suggestions[0]["kind"], "reserved");
}

#[test]
fn test_roi_instant_payback() {
    let dir = TempDir::new().unwrap();
    let output = fleetctl(
        dir.path(),
        &["-f", "json", "roi", "--baseline", "100", "--optimized", "40"],
    );
    let roi = json(&output);
    assert_eq!(roi["monthly_savings"], 60.0);
    assert_eq!(roi["roi_percent"], 100.0);
    assert_eq!(roi["payback_months"], 0.0);
}

#[test]
fn test_tiers_table() {
    let dir = TempDir::new().unwrap();
    let output = fleetctl(dir.path(), &["tiers"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("t2.micro"));
    assert!(stdout.contains("t3.2xlarge"));
}

#[test]
fn test_config_default_format() {
    let dir = TempDir::new().unwrap();
    let saved = fleetctl(dir.path(), &["config", "set", "--default-format", "json"]);
    assert!(saved.status.success());

    let output = fleetctl(dir.path(), &["estimate"]);
    let cost = json(&output);
    assert!((cost["hourly"].as_f64().unwrap() - 0.0116).abs() < 1e-9);
}
