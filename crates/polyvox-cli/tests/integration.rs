//! Integration tests for polyvox-cli.
//!
//! Tests cover the binary's parameter listing, offline rendering, and config
//! validation subcommands.

use std::process::Command;

/// Helper to get the path to the `polyvox` binary built by cargo.
fn polyvox_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_polyvox"))
}

fn write_config(dir: &tempfile::TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("engine.toml");
    std::fs::write(&path, body).expect("failed to write config");
    path
}

// ---------------------------------------------------------------------------
// CLI binary tests -- `polyvox params`
// ---------------------------------------------------------------------------

#[test]
fn cli_params_lists_all_parameters() {
    let output = polyvox_bin()
        .arg("params")
        .output()
        .expect("failed to run polyvox params");

    assert!(output.status.success(), "polyvox params failed");
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("Synth Parameters"));
    for name in [
        "osc1_waveform",
        "osc2_detune",
        "filter_cutoff",
        "filter_resonance",
        "amp_attack",
        "lfo_rate",
        "master_volume",
    ] {
        assert!(stdout.contains(name), "listing should contain '{name}'");
    }
}

#[test]
fn cli_params_shows_detail() {
    let output = polyvox_bin()
        .args(["params", "filter_cutoff"])
        .output()
        .expect("failed to run polyvox params filter_cutoff");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("filter_cutoff"));
    assert!(stdout.contains("Range:"));
    assert!(stdout.contains("Hz"));
}

#[test]
fn cli_params_unknown_fails() {
    let output = polyvox_bin()
        .args(["params", "wobble"])
        .output()
        .expect("failed to run polyvox params wobble");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unknown parameter"), "stderr: {stderr}");
}

// ---------------------------------------------------------------------------
// CLI binary tests -- `polyvox render`
// ---------------------------------------------------------------------------

#[test]
fn cli_render_text_summary() {
    let output = polyvox_bin()
        .args([
            "render",
            "--notes",
            "60,64,67",
            "--hold-secs",
            "0.2",
            "--release-secs",
            "0.5",
        ])
        .output()
        .expect("failed to run polyvox render");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Render Summary"));
    assert!(stdout.contains("Hold"));
    assert!(stdout.contains("Release"));
    assert!(stdout.contains("Faults:      0"));
}

#[test]
fn cli_render_json_report() {
    let output = polyvox_bin()
        .args([
            "render",
            "--notes",
            "48,52,55,60",
            "--hold-secs",
            "0.1",
            "--release-secs",
            "1.0",
            "--param",
            "amp_release=0.05",
            "--param",
            "osc1_waveform=square",
            "--json",
        ])
        .output()
        .expect("failed to run polyvox render --json");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");

    assert_eq!(report["notes"].as_array().map(Vec::len), Some(4));
    assert_eq!(report["hold"]["max_voices"], 4);
    assert_eq!(report["release"]["final_voices"], 0);
    assert_eq!(report["faults"], 0);

    let peak = report["hold"]["peak"].as_f64().expect("peak");
    assert!(peak > 0.0 && peak <= 1.0, "peak {peak}");
}

#[test]
fn cli_render_respects_polyphony() {
    let output = polyvox_bin()
        .args([
            "render",
            "--notes",
            "60,61,62,63,64",
            "--polyphony",
            "2",
            "--hold-secs",
            "0.1",
            "--release-secs",
            "0",
            "--json",
        ])
        .output()
        .expect("failed to run polyvox render");

    assert!(output.status.success());
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(report["polyphony"], 2);
    assert_eq!(report["hold"]["max_voices"], 2);
}

#[test]
fn cli_render_steal_policy() {
    let output = polyvox_bin()
        .args([
            "render",
            "--notes",
            "60,62,64",
            "--polyphony",
            "2",
            "--steal-policy",
            "lowest",
            "--hold-secs",
            "0.05",
            "--release-secs",
            "0",
            "--json",
        ])
        .output()
        .expect("failed to run polyvox render --steal-policy");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(report["steal_policy"], "lowest");
    assert_eq!(report["hold"]["max_voices"], 2);

    let bad = polyvox_bin()
        .args(["render", "--steal-policy", "newest"])
        .output()
        .expect("failed to run polyvox render");
    assert!(!bad.status.success());
}

#[test]
fn cli_render_uses_config_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_config(
        &dir,
        "sample_rate = 48000\npolyphony = 4\n\n[params]\nmaster_volume = 0.5\n",
    );

    let output = polyvox_bin()
        .args(["render", "--hold-secs", "0.05", "--release-secs", "0", "--json", "--config"])
        .arg(&path)
        .output()
        .expect("failed to run polyvox render --config");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(report["sample_rate"], 48000);
    assert_eq!(report["polyphony"], 4);
    assert_eq!(report["hold"]["samples"], 2400);
}

#[test]
fn cli_render_rejects_bad_param() {
    for param in ["wobble=1", "osc1_waveform=noise", "filter_cutoff=loud"] {
        let output = polyvox_bin()
            .args(["render", "--hold-secs", "0", "--release-secs", "0", "--param", param])
            .output()
            .expect("failed to run polyvox render");
        assert!(!output.status.success(), "{param} should be rejected");
    }
}

#[test]
fn cli_render_rejects_invalid_note() {
    let output = polyvox_bin()
        .args(["render", "--notes", "60,128"])
        .output()
        .expect("failed to run polyvox render");
    assert!(!output.status.success());
}

// ---------------------------------------------------------------------------
// CLI binary tests -- `polyvox check-config`
// ---------------------------------------------------------------------------

#[test]
fn cli_check_config_accepts_valid_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_config(
        &dir,
        "sample_rate = 44100\npolyphony = 16\n\n[params]\nfilter_cutoff = 1200.0\nosc2_waveform = \"triangle\"\n",
    );

    let output = polyvox_bin()
        .arg("check-config")
        .arg(&path)
        .output()
        .expect("failed to run polyvox check-config");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Config OK"));
    assert!(stdout.contains("Polyphony:       16"));
    assert!(stdout.contains("filter_cutoff"));
    assert!(stdout.contains("triangle"));
}

#[test]
fn cli_check_config_json_output() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_config(&dir, "polyphony = 12\n");

    let output = polyvox_bin()
        .args(["check-config", "--json"])
        .arg(&path)
        .output()
        .expect("failed to run polyvox check-config --json");

    assert!(output.status.success());
    let config: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(config["polyphony"], 12);
    assert_eq!(config["sample_rate"], 44100);
}

#[test]
fn cli_check_config_rejects_invalid_file() {
    let dir = tempfile::tempdir().expect("tempdir");

    for body in [
        "polyphony = 0\n",
        "sample_rate = 12345\n",
        "voices = 8\n",
        "[params]\nwobble = 1.0\n",
    ] {
        let path = write_config(&dir, body);
        let output = polyvox_bin()
            .arg("check-config")
            .arg(&path)
            .output()
            .expect("failed to run polyvox check-config");
        assert!(!output.status.success(), "{body:?} should be rejected");
    }
}

#[test]
fn cli_check_config_missing_file() {
    let output = polyvox_bin()
        .args(["check-config", "/nonexistent/polyvox/engine.toml"])
        .output()
        .expect("failed to run polyvox check-config");
    assert!(!output.status.success());
}
