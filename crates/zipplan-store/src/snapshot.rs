//! Snapshot layout on disk.
//!
//! ```text
//! <data>/current/states.json                 snapshot manifest (states built)
//! <data>/current/<ABBR>/manifest.json        state manifest (counties, digests)
//! <data>/current/<ABBR>/counties/<slug>.json one CountyPlanSet per county
//! <data>/current/<ABBR>/zips.json            normalized ZipEntry list
//! ```
//!
//! A build writes everything into `<data>/staging` through a
//! [`SnapshotWriter`] and only swaps it into `current` on
//! [`SnapshotWriter::commit`]. Readers never enumerate directories: the
//! manifests list every file to load, with a SHA-256 digest for each.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::models::{CountyPlanSet, StateInfo, ZipEntry};

pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;
pub const STATES_MANIFEST_FILE: &str = "states.json";
pub const STATE_MANIFEST_FILE: &str = "manifest.json";
pub const ZIPS_FILE: &str = "zips.json";
pub const COUNTIES_DIR: &str = "counties";

// ---------------------------------------------------------------------------
// Manifests
// ---------------------------------------------------------------------------

/// Top-level manifest: which states the snapshot contains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotManifest {
    pub format_version: u32,
    pub states: Vec<StateInfo>,
}

/// Everything a reader needs to load one state without listing directories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateManifest {
    pub state: StateInfo,
    pub zip_count: usize,
    pub zips_file: String,
    pub zips_sha256: String,
    pub counties: Vec<CountyManifestEntry>,
}

/// One county plan set file, relative to the state directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountyManifestEntry {
    pub name: String,
    pub file: String,
    pub sha256: String,
    pub plan_count: usize,
    pub details_available_count: usize,
}

/// File name used for a county's plan set: non-alphanumerics become `_`.
pub fn county_file_name(county: &str) -> String {
    let slug: String = county
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{slug}.json")
}

/// Hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Paths inside one snapshot directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotLayout {
    root: PathBuf,
}

impl SnapshotLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn states_manifest(&self) -> PathBuf {
        self.root.join(STATES_MANIFEST_FILE)
    }

    pub fn state_dir(&self, state: &StateInfo) -> PathBuf {
        self.root.join(&state.abbr)
    }

    pub fn state_manifest(&self, state: &StateInfo) -> PathBuf {
        self.state_dir(state).join(STATE_MANIFEST_FILE)
    }

    pub fn counties_dir(&self, state: &StateInfo) -> PathBuf {
        self.state_dir(state).join(COUNTIES_DIR)
    }
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Writes a complete snapshot into the staging directory.
#[derive(Debug)]
pub struct SnapshotWriter {
    config: StoreConfig,
    staging: SnapshotLayout,
    states: Vec<StateInfo>,
}

impl SnapshotWriter {
    /// Start a fresh staging directory, discarding any leftover from an
    /// earlier failed build.
    pub fn begin(config: &StoreConfig) -> Result<Self> {
        let staging_dir = config.staging_dir();
        if staging_dir.exists() {
            fs::remove_dir_all(&staging_dir).map_err(|e| StoreError::write(&staging_dir, e))?;
        }
        fs::create_dir_all(&staging_dir).map_err(|e| StoreError::write(&staging_dir, e))?;
        Ok(Self {
            config: config.clone(),
            staging: SnapshotLayout::new(staging_dir),
            states: Vec::new(),
        })
    }

    pub fn layout(&self) -> &SnapshotLayout {
        &self.staging
    }

    /// Write one state's county plan sets and postal-code entries.
    ///
    /// County files are listed in the manifest sorted by county name.
    pub fn write_state(
        &mut self,
        state: &StateInfo,
        county_sets: &[CountyPlanSet],
        zips: &[ZipEntry],
    ) -> Result<StateManifest> {
        let counties_dir = self.staging.counties_dir(state);
        fs::create_dir_all(&counties_dir).map_err(|e| StoreError::write(&counties_dir, e))?;

        let mut ordered: Vec<&CountyPlanSet> = county_sets.iter().collect();
        ordered.sort_by(|a, b| a.county.cmp(&b.county));

        let mut used_files = HashSet::new();
        let mut counties = Vec::with_capacity(ordered.len());
        for set in ordered {
            let file_name = county_file_name(&set.county);
            let relative = format!("{COUNTIES_DIR}/{file_name}");
            if !used_files.insert(relative.clone()) {
                return Err(StoreError::DuplicateArtifact(counties_dir.join(file_name)));
            }
            let sha256 = write_json(&counties_dir.join(&file_name), set)?;
            counties.push(CountyManifestEntry {
                name: set.county.clone(),
                file: relative,
                sha256,
                plan_count: set.plan_count,
                details_available_count: set.details_available_count,
            });
        }

        let zips_sha256 = write_json(&self.staging.state_dir(state).join(ZIPS_FILE), &zips)?;

        let manifest = StateManifest {
            state: state.clone(),
            zip_count: zips.len(),
            zips_file: ZIPS_FILE.to_owned(),
            zips_sha256,
            counties,
        };
        write_json(&self.staging.state_manifest(state), &manifest)?;
        self.states.push(state.clone());

        debug!(
            state = %state.abbr,
            counties = manifest.counties.len(),
            zips = manifest.zip_count,
            "state written to staging"
        );
        Ok(manifest)
    }

    /// Write the snapshot manifest and replace `current` with the staged
    /// snapshot. The previous snapshot is removed once the swap succeeds.
    ///
    /// On failure the staging directory is removed and `current` is left
    /// as it was.
    pub fn commit(self) -> Result<SnapshotLayout> {
        let manifest = SnapshotManifest {
            format_version: SNAPSHOT_FORMAT_VERSION,
            states: self.states,
        };
        let current = self.config.current_dir();
        let staging = self.staging.root();

        let swapped = write_json(&self.staging.states_manifest(), &manifest)
            .and_then(|_| swap_into_place(staging, &current, &self.config.retired_dir()));
        if let Err(err) = swapped {
            let _ = fs::remove_dir_all(staging);
            return Err(err);
        }

        info!(path = %current.display(), states = manifest.states.len(), "snapshot committed");
        Ok(SnapshotLayout::new(current))
    }

    /// Drop the staging directory without touching `current`.
    pub fn abandon(self) {
        let _ = fs::remove_dir_all(self.staging.root());
    }
}

/// Move `staging` to `current`, parking the previous snapshot at `retired`
/// for the duration of the swap. If the move fails the parked snapshot is
/// put back.
fn swap_into_place(staging: &Path, current: &Path, retired: &Path) -> Result<()> {
    if retired.exists() {
        fs::remove_dir_all(retired).map_err(|e| StoreError::write(retired, e))?;
    }
    let parked = current.exists();
    if parked {
        fs::rename(current, retired).map_err(|e| StoreError::write(current, e))?;
    }

    if let Err(e) = fs::rename(staging, current) {
        if parked {
            if let Err(restore) = fs::rename(retired, current) {
                warn!(
                    path = %retired.display(),
                    error = %restore,
                    "failed to restore previous snapshot"
                );
            }
        }
        return Err(StoreError::write(current, e));
    }

    if parked {
        if let Err(e) = fs::remove_dir_all(retired) {
            warn!(path = %retired.display(), error = %e, "failed to remove retired snapshot");
        }
    }
    Ok(())
}

/// Serialize `value` as pretty JSON at `path`; returns the digest of the
/// bytes written.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<String> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|e| StoreError::json(path, e))?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| StoreError::write(parent, e))?;
    }
    fs::write(path, &bytes).map_err(|e| StoreError::write(path, e))?;
    Ok(sha256_hex(&bytes))
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Reads a committed snapshot through its manifests.
#[derive(Debug, Clone)]
pub struct SnapshotReader {
    layout: SnapshotLayout,
}

impl SnapshotReader {
    /// Open the current snapshot of `config`.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        Self::at(SnapshotLayout::new(config.current_dir()))
    }

    /// Open the snapshot rooted at `layout`.
    pub fn at(layout: SnapshotLayout) -> Result<Self> {
        if !layout.states_manifest().is_file() {
            return Err(StoreError::NoSnapshot(layout.root().to_path_buf()));
        }
        Ok(Self { layout })
    }

    pub fn layout(&self) -> &SnapshotLayout {
        &self.layout
    }

    pub fn manifest(&self) -> Result<SnapshotManifest> {
        let path = self.layout.states_manifest();
        let manifest: SnapshotManifest = read_json(&path)?;
        if manifest.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(StoreError::UnsupportedFormat {
                path,
                found: manifest.format_version,
                expected: SNAPSHOT_FORMAT_VERSION,
            });
        }
        Ok(manifest)
    }

    pub fn state_manifest(&self, state: &StateInfo) -> Result<StateManifest> {
        read_json(&self.layout.state_manifest(state))
    }

    /// Read a county plan set, checking its digest against the manifest.
    pub fn read_county(
        &self,
        state: &StateInfo,
        entry: &CountyManifestEntry,
    ) -> Result<CountyPlanSet> {
        let path = self.layout.state_dir(state).join(&entry.file);
        read_verified(&path, &entry.sha256)
    }

    /// Read a state's postal-code entries, checking the digest.
    pub fn read_zips(&self, manifest: &StateManifest) -> Result<Vec<ZipEntry>> {
        let path = self.layout.state_dir(&manifest.state).join(&manifest.zips_file);
        read_verified(&path, &manifest.zips_sha256)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path).map_err(|e| StoreError::read(path, e))?;
    serde_json::from_slice(&bytes).map_err(|e| StoreError::json(path, e))
}

fn read_verified<T: DeserializeOwned>(path: &Path, expected: &str) -> Result<T> {
    let bytes = fs::read(path).map_err(|e| StoreError::read(path, e))?;
    let actual = sha256_hex(&bytes);
    if actual != expected {
        return Err(StoreError::DigestMismatch {
            path: path.to_path_buf(),
            expected: expected.to_owned(),
            actual,
        });
    }
    serde_json::from_slice(&bytes).map_err(|e| StoreError::json(path, e))
}
