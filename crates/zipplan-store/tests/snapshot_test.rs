//! Integration tests for writing, committing, and reading snapshots.
//!
//! Each test works inside its own fixture directory, so tests are fully
//! isolated and can run in parallel.

use std::fs;

use zipplan_store::config::StoreConfig;
use zipplan_store::models::{
    CountyCoverage, CountyPlanSet, PlanId, PlanRecord, PlanScope, PlanSummary, StateInfo, ZipEntry,
};
use zipplan_store::snapshot::{SnapshotReader, SnapshotWriter};
use zipplan_store::StoreError;
use zipplan_test_utils::Fixture;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn nh() -> StateInfo {
    StateInfo::new("NH", "New Hampshire")
}

fn summary(id: &str, name: &str, scope: PlanScope) -> PlanSummary {
    PlanSummary {
        contract_plan_segment_id: id.parse::<PlanId>().unwrap(),
        plan_name: name.to_owned(),
        plan_type: "Local HMO".to_owned(),
        organization: "Granite Health".to_owned(),
        parent_organization: "Granite Holdings".to_owned(),
        part_c_premium: Some(0.0),
        part_d_total_premium: None,
        overall_star_rating: Some(4.0),
        snp_type: None,
        scope,
    }
}

fn county_set(county: &str) -> CountyPlanSet {
    let plans = vec![
        PlanRecord::new(
            summary("H1111_001_0", "Granite Basic (HMO)", PlanScope::Statewide),
            None,
        ),
        PlanRecord::new(
            summary(
                "H2222_002_0",
                "Local Choice (HMO)",
                PlanScope::County(county.to_owned()),
            ),
            Some(Default::default()),
        ),
    ];
    CountyPlanSet {
        state: "New Hampshire".into(),
        state_abbr: "NH".into(),
        county: county.into(),
        plan_count: 2,
        all_counties_plan_count: 1,
        county_specific_plan_count: 1,
        details_available_count: 1,
        plans,
    }
}

fn zip_entry(zip: &str, county: &str) -> ZipEntry {
    ZipEntry {
        zip: zip.into(),
        multi_county: false,
        primary_county: county.into(),
        counties: vec![CountyCoverage {
            name: county.into(),
            fips: "33005".into(),
            weight: None,
            state: None,
            plan_count: 2,
        }],
    }
}

fn write_snapshot(config: &StoreConfig, counties: &[&str]) {
    let sets: Vec<CountyPlanSet> = counties.iter().map(|c| county_set(c)).collect();
    let zips = vec![zip_entry("03462", counties[0])];
    let mut writer = SnapshotWriter::begin(config).unwrap();
    writer.write_state(&nh(), &sets, &zips).unwrap();
    writer.commit().unwrap();
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn committed_snapshot_reads_back() {
    let fixture = Fixture::new();
    let config = fixture.store_config();
    write_snapshot(&config, &["Sullivan", "Cheshire"]);

    let reader = SnapshotReader::open(&config).unwrap();
    let manifest = reader.manifest().unwrap();
    assert_eq!(manifest.states, vec![nh()]);

    let state_manifest = reader.state_manifest(&nh()).unwrap();
    let names: Vec<&str> = state_manifest
        .counties
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(names, vec!["Cheshire", "Sullivan"], "manifest sorted by county");

    let cheshire = reader
        .read_county(&nh(), &state_manifest.counties[0])
        .unwrap();
    assert_eq!(cheshire, county_set("Cheshire"));
    assert!(cheshire.counts_consistent());

    let zips = reader.read_zips(&state_manifest).unwrap();
    assert_eq!(zips.len(), 1);
    assert_eq!(zips[0].zip, "03462");
    assert!(!config.staging_dir().exists(), "staging consumed by commit");
}

#[test]
fn rebuild_replaces_previous_snapshot() {
    let fixture = Fixture::new();
    let config = fixture.store_config();
    write_snapshot(&config, &["Cheshire", "Sullivan"]);
    write_snapshot(&config, &["Coos"]);

    let reader = SnapshotReader::open(&config).unwrap();
    let state_manifest = reader.state_manifest(&nh()).unwrap();
    assert_eq!(state_manifest.counties.len(), 1);
    assert_eq!(state_manifest.counties[0].name, "Coos");
    assert!(!config.retired_dir().exists());
    assert!(
        !config
            .current_dir()
            .join("NH/counties/Cheshire.json")
            .exists(),
        "stale county files removed"
    );
}

#[test]
fn abandoned_build_leaves_current_untouched() {
    let fixture = Fixture::new();
    let config = fixture.store_config();
    write_snapshot(&config, &["Cheshire"]);

    let mut writer = SnapshotWriter::begin(&config).unwrap();
    writer
        .write_state(&nh(), &[county_set("Coos")], &[])
        .unwrap();
    writer.abandon();

    let reader = SnapshotReader::open(&config).unwrap();
    let state_manifest = reader.state_manifest(&nh()).unwrap();
    assert_eq!(state_manifest.counties[0].name, "Cheshire");
    assert!(!config.staging_dir().exists());
}

#[test]
fn failed_commit_keeps_current_and_clears_staging() {
    let fixture = Fixture::new();
    let config = fixture.store_config();
    write_snapshot(&config, &["Cheshire"]);
    // A plain file where the retired directory goes cannot be cleared.
    fs::write(config.retired_dir(), "not a directory").unwrap();

    let mut writer = SnapshotWriter::begin(&config).unwrap();
    writer
        .write_state(&nh(), &[county_set("Coos")], &[])
        .unwrap();
    let err = writer.commit().unwrap_err();
    assert!(matches!(err, StoreError::Write { .. }), "expected Write, got: {err}");

    assert!(!config.staging_dir().exists(), "staging removed after failed commit");
    let reader = SnapshotReader::open(&config).unwrap();
    let state_manifest = reader.state_manifest(&nh()).unwrap();
    assert_eq!(state_manifest.counties[0].name, "Cheshire");
}

#[test]
fn tampered_county_file_fails_digest_check() {
    let fixture = Fixture::new();
    let config = fixture.store_config();
    write_snapshot(&config, &["Cheshire"]);

    let path = config.current_dir().join("NH/counties/Cheshire.json");
    let mut contents = fs::read_to_string(&path).unwrap();
    contents.push('\n');
    fs::write(&path, contents).unwrap();

    let reader = SnapshotReader::open(&config).unwrap();
    let state_manifest = reader.state_manifest(&nh()).unwrap();
    let err = reader
        .read_county(&nh(), &state_manifest.counties[0])
        .unwrap_err();
    assert!(
        matches!(err, StoreError::DigestMismatch { .. }),
        "expected DigestMismatch, got: {err}"
    );
}

#[test]
fn colliding_county_file_names_are_rejected() {
    let fixture = Fixture::new();
    let config = fixture.store_config();
    let mut writer = SnapshotWriter::begin(&config).unwrap();
    let err = writer
        .write_state(&nh(), &[county_set("St. Paul"), county_set("St  Paul")], &[])
        .unwrap_err();
    assert!(
        matches!(err, StoreError::DuplicateArtifact(_)),
        "expected DuplicateArtifact, got: {err}"
    );
}
