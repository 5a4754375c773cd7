//! Integration tests that drive the `zipplan` binary end to end.
//!
//! Each test points `XDG_CONFIG_HOME` at its own fixture directory, writes a
//! config file naming the fixture sources, and runs the binary as a child
//! process.

use std::path::Path;
use std::process::{Command, Output};

use zipplan_test_utils::Fixture;

fn zipplan(fixture: &Fixture, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_zipplan"))
        .args(args)
        .env("XDG_CONFIG_HOME", fixture.root().join("config"))
        .env_remove("ZIPPLAN_DATA_DIR")
        .env_remove("ZIPPLAN_LANDSCAPE_CSV")
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to run zipplan binary")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "zipplan failed: {}\n{}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );
}

fn write_config(fixture: &Fixture) {
    let path = |p: &Path| p.display().to_string();
    let contents = format!(
        r#"[data]
dir = "{data}"

[source]
landscape_csv = "{csv}"
details_dir = "{details}"
zip_mappings_dir = "{zips}"
plan_year = 2026

[codec]
key_table = "{keys}"
value_table = "{values}"

[[states]]
abbr = "NH"
name = "New Hampshire"

[[states]]
abbr = "VT"
name = "Vermont"
"#,
        data = path(&fixture.data_dir()),
        csv = path(&fixture.landscape_csv()),
        details = path(&fixture.details_dir()),
        zips = path(&fixture.zip_mappings_dir()),
        keys = path(&fixture.key_table()),
        values = path(&fixture.value_table()),
    );
    fixture.write_file("config/zipplan/config.toml", &contents);
}

fn built_fixture() -> Fixture {
    let fixture = Fixture::new();
    write_config(&fixture);
    let output = zipplan(&fixture, &["build"]);
    assert_success(&output);
    fixture
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[test]
fn init_refuses_to_overwrite_without_force() {
    let fixture = Fixture::new();

    let first = zipplan(&fixture, &["init"]);
    assert_success(&first);
    assert!(fixture.root().join("config/zipplan/config.toml").exists());

    let second = zipplan(&fixture, &["init"]);
    assert!(!second.status.success(), "second init should fail");
    assert!(String::from_utf8_lossy(&second.stderr).contains("already exists"));

    let forced = zipplan(&fixture, &["init", "--force"]);
    assert_success(&forced);
}

#[test]
fn build_prints_summary() {
    let fixture = Fixture::new();
    write_config(&fixture);

    let output = zipplan(&fixture, &["build"]);
    assert_success(&output);
    let out = stdout(&output);
    assert!(out.contains("NH"), "missing NH row: {out}");
    assert!(out.contains("40.0%"), "missing NH coverage: {out}");
    assert!(out.contains("Warnings (4)"), "missing warnings: {out}");
    assert!(fixture.data_dir().join("current/states.json").exists());
}

#[test]
fn zip_lookup_prints_counties() {
    let fixture = built_fixture();

    let output = zipplan(&fixture, &["zip", "nh", "03602"]);
    assert_success(&output);
    let out = stdout(&output);
    assert!(out.contains("Primary county: Cheshire"), "unexpected output: {out}");
    assert!(out.contains("Sullivan County"), "unexpected output: {out}");

    let output = zipplan(&fixture, &["zip", "nh", "03602", "--summary", "--json"]);
    assert_success(&output);
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["counties"].as_array().unwrap().len(), 2);
}

#[test]
fn unknown_zip_fails_with_message() {
    let fixture = built_fixture();
    let output = zipplan(&fixture, &["zip", "nh", "00000"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("ZIP code not found: 00000"));
}

#[test]
fn lookups_fail_without_a_snapshot() {
    let fixture = Fixture::new();
    write_config(&fixture);
    let output = zipplan(&fixture, &["health"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("zipplan build"));
}

#[test]
fn compact_writes_documents_and_tables() {
    let fixture = built_fixture();
    let out_dir = fixture.root().join("out");

    let output = zipplan(&fixture, &["compact", "--out", &out_dir.display().to_string()]);
    assert_success(&output);
    assert!(out_dir.join("NH/03602.json").exists());
    assert!(out_dir.join("VT/05401.json").exists());
    assert!(out_dir.join("mappings/key_mapping.json").exists());
    assert!(out_dir.join("mappings/value_mapping.json").exists());
    assert!(stdout(&output).contains("TOTAL"));
}

#[test]
fn analyze_emits_json() {
    let fixture = Fixture::new();
    write_config(&fixture);
    let output = zipplan(&fixture, &["analyze", "--json"]);
    assert_success(&output);
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["New Hampshire"]["actual_county_count"], 4);
    assert_eq!(json["Vermont"]["plans_marked_all_counties"], 1);
}
