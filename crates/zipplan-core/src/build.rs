//! Offline build: landscape + detail documents + postal-code mappings in,
//! one complete snapshot out.
//!
//! The pipeline is single-threaded and deterministic. Every state is
//! written into the staging area first; the current snapshot is replaced
//! only after all states succeed, so a failed run leaves it untouched.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{info, warn};

use zipplan_store::StoreError;
use zipplan_store::config::StoreConfig;
use zipplan_store::details::{DetailIndex, load_detail_documents};
use zipplan_store::landscape::read_landscape;
use zipplan_store::models::{CountyPlanSet, StateInfo};
use zipplan_store::snapshot::SnapshotWriter;
use zipplan_store::zip_mapping::{read_zip_mapping, zip_mapping_path};

use crate::aggregate::aggregate_counties;
use crate::catalog::{DataIntegrityWarning, PlanCatalog};
use crate::resolve::normalize_zip_mapping;

/// Source locations and the states to build.
#[derive(Debug, Clone)]
pub struct BuildInputs {
    pub landscape_csv: PathBuf,
    /// Directory of harvested detail documents. `None` builds without any.
    pub details_dir: Option<PathBuf>,
    pub zip_mappings_dir: PathBuf,
    pub states: Vec<StateInfo>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// What a failed build had finished before it stopped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildProgress {
    pub states_completed: Vec<String>,
    pub counties_written: usize,
}

impl fmt::Display for BuildProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.states_completed.is_empty() {
            return f.write_str("no states completed");
        }
        write!(
            f,
            "{} state(s) completed ({}), {} county plan sets written",
            self.states_completed.len(),
            self.states_completed.join(", "),
            self.counties_written
        )
    }
}

/// Fatal build errors. The previous snapshot is left in place.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("source {path} is unreadable ({progress}): {source}")]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: StoreError,
        progress: BuildProgress,
    },

    #[error("detail document store {path} is unreadable ({progress}): {source}")]
    DetailStoreUnreadable {
        path: PathBuf,
        #[source]
        source: StoreError,
        progress: BuildProgress,
    },

    #[error("failed to write snapshot ({progress}): {source}")]
    SnapshotWrite {
        #[source]
        source: StoreError,
        progress: BuildProgress,
    },
}

impl BuildError {
    pub fn progress(&self) -> &BuildProgress {
        match self {
            Self::SourceUnreadable { progress, .. }
            | Self::DetailStoreUnreadable { progress, .. }
            | Self::SnapshotWrite { progress, .. } => progress,
        }
    }
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// `with / total * 100`, or 0 when there is nothing to cover.
pub fn coverage_percent(with: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        with as f64 / total as f64 * 100.0
    }
}

/// Outcome of one state.
#[derive(Debug, Clone)]
pub struct StateBuildSummary {
    pub state: StateInfo,
    pub counties: usize,
    pub zip_codes: usize,
    pub unique_plans: usize,
    /// Plan entries across all county sets (a plan counts once per county).
    pub plan_entries: usize,
    pub with_details: usize,
    pub skipped_rows: usize,
    pub warnings: Vec<DataIntegrityWarning>,
}

impl StateBuildSummary {
    pub fn without_details(&self) -> usize {
        self.plan_entries - self.with_details
    }

    pub fn coverage_percent(&self) -> f64 {
        coverage_percent(self.with_details, self.plan_entries)
    }
}

/// Outcome of a whole build.
#[derive(Debug, Clone)]
pub struct BuildSummary {
    pub states: Vec<StateBuildSummary>,
    /// Rows that could not be decoded, before any state was assigned.
    pub file_warnings: Vec<DataIntegrityWarning>,
    pub snapshot_dir: PathBuf,
}

impl BuildSummary {
    pub fn counties(&self) -> usize {
        self.states.iter().map(|s| s.counties).sum()
    }

    pub fn plan_entries(&self) -> usize {
        self.states.iter().map(|s| s.plan_entries).sum()
    }

    pub fn with_details(&self) -> usize {
        self.states.iter().map(|s| s.with_details).sum()
    }

    pub fn without_details(&self) -> usize {
        self.plan_entries() - self.with_details()
    }

    pub fn skipped_rows(&self) -> usize {
        self.states.iter().map(|s| s.skipped_rows).sum::<usize>() + self.file_warnings.len()
    }

    pub fn warning_count(&self) -> usize {
        self.states.iter().map(|s| s.warnings.len()).sum::<usize>() + self.file_warnings.len()
    }

    pub fn coverage_percent(&self) -> f64 {
        coverage_percent(self.with_details(), self.plan_entries())
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Runs a full build into the snapshot store.
#[derive(Debug, Clone)]
pub struct BuildPipeline {
    inputs: BuildInputs,
    store: StoreConfig,
}

impl BuildPipeline {
    pub fn new(inputs: BuildInputs, store: StoreConfig) -> Self {
        Self { inputs, store }
    }

    /// Build every configured state and replace the current snapshot.
    pub fn run(&self) -> Result<BuildSummary, BuildError> {
        let mut progress = BuildProgress::default();

        let table = read_landscape(&self.inputs.landscape_csv).map_err(|source| {
            BuildError::SourceUnreadable {
                path: self.inputs.landscape_csv.clone(),
                source,
                progress: progress.clone(),
            }
        })?;
        let catalog = PlanCatalog::new(&table);
        let file_warnings = catalog.file_warnings();
        for warning in &file_warnings {
            warn!(%warning, "skipping landscape row");
        }

        let mut writer =
            SnapshotWriter::begin(&self.store).map_err(|source| BuildError::SnapshotWrite {
                source,
                progress: progress.clone(),
            })?;

        let mut states = Vec::with_capacity(self.inputs.states.len());
        for state in &self.inputs.states {
            match self.build_state(&catalog, state, &mut writer, &progress) {
                Ok(summary) => {
                    progress.states_completed.push(state.abbr.clone());
                    progress.counties_written += summary.counties;
                    states.push(summary);
                }
                Err(e) => {
                    writer.abandon();
                    return Err(e);
                }
            }
        }

        let layout = writer.commit().map_err(|source| BuildError::SnapshotWrite {
            source,
            progress: progress.clone(),
        })?;

        let summary = BuildSummary {
            states,
            file_warnings,
            snapshot_dir: layout.root().to_path_buf(),
        };
        info!(
            states = summary.states.len(),
            counties = summary.counties(),
            plan_entries = summary.plan_entries(),
            coverage = %format!("{:.1}%", summary.coverage_percent()),
            warnings = summary.warning_count(),
            "build complete"
        );
        Ok(summary)
    }

    fn build_state(
        &self,
        catalog: &PlanCatalog<'_>,
        state: &StateInfo,
        writer: &mut SnapshotWriter,
        progress: &BuildProgress,
    ) -> Result<StateBuildSummary, BuildError> {
        let details = match &self.inputs.details_dir {
            Some(dir) => load_detail_documents(dir, state).map_err(|source| {
                BuildError::DetailStoreUnreadable {
                    path: dir.clone(),
                    source,
                    progress: progress.clone(),
                }
            })?,
            None => DetailIndex::empty(),
        };

        let state_catalog = catalog.build(state, &details);
        if state_catalog.rows_read == 0 {
            warn!(state = %state.abbr, name = %state.name, "no landscape rows for state");
        }
        for warning in &state_catalog.warnings {
            warn!(state = %state.abbr, %warning, "data integrity warning");
        }

        let county_sets = aggregate_counties(&state_catalog);

        let mapping_path = zip_mapping_path(&self.inputs.zip_mappings_dir, state);
        let raw_zips =
            read_zip_mapping(&mapping_path).map_err(|source| BuildError::SourceUnreadable {
                path: mapping_path.clone(),
                source,
                progress: progress.clone(),
            })?;
        let zips = normalize_zip_mapping(&raw_zips, state, &county_sets);

        let county_sets: Vec<CountyPlanSet> = county_sets.into_values().collect();
        writer
            .write_state(state, &county_sets, &zips)
            .map_err(|source| BuildError::SnapshotWrite {
                source,
                progress: progress.clone(),
            })?;

        let plan_entries: usize = county_sets.iter().map(|s| s.plan_count).sum();
        let with_details: usize = county_sets.iter().map(|s| s.details_available_count).sum();
        let summary = StateBuildSummary {
            state: state.clone(),
            counties: county_sets.len(),
            zip_codes: zips.len(),
            unique_plans: state_catalog.canonical_plans().len(),
            plan_entries,
            with_details,
            skipped_rows: state_catalog.skipped_rows(),
            warnings: state_catalog.warnings,
        };
        info!(
            state = %state.abbr,
            counties = summary.counties,
            zips = summary.zip_codes,
            plans = summary.unique_plans,
            coverage = %format!("{:.1}%", summary.coverage_percent()),
            "state built"
        );
        Ok(summary)
    }
}
