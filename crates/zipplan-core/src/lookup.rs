//! Read-only lookups over a loaded snapshot.
//!
//! [`Snapshot::load`] reads every state listed in the snapshot manifest,
//! verifies each artifact and builds the composite-id index, all before the
//! first request. The result never changes afterwards; [`LookupService`]
//! only hands out borrowed views of it, so any number of readers can share
//! one instance without locking.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use zipplan_store::StoreError;
use zipplan_store::config::StoreConfig;
use zipplan_store::models::{
    CountyPlanSet, DetailDocument, PlanId, PlanRecord, PlanSummary, StateInfo, ZipEntry,
};
use zipplan_store::snapshot::SnapshotReader;

use crate::error::LookupError;
use crate::resolve::{PlanSummaryView, ZipResolver};

/// Errors that abort a snapshot load.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{state}: manifest entry {expected:?} points at the plan set of {found:?}")]
    CountyMismatch {
        state: String,
        expected: String,
        found: String,
    },

    #[error("{state}: plan counts of {county:?} do not add up")]
    InconsistentCounts { state: String, county: String },

    #[error("{state}: manifest lists {expected} ZIP codes, file holds {found}")]
    ZipCountMismatch {
        state: String,
        expected: usize,
        found: usize,
    },
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// A plan as listed in a postal-code response.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(untagged)]
pub enum PlanListing<'a> {
    Full(&'a PlanRecord),
    Summary(PlanSummaryView<'a>),
}

/// Plans of one county of a postal code.
#[derive(Debug, Clone, Serialize)]
pub struct CountyPlans<'a> {
    pub name: &'a str,
    pub fips: &'a str,
    pub percentage: Option<f64>,
    pub plan_count: usize,
    pub details_available_count: usize,
    pub plans: Vec<PlanListing<'a>>,
}

/// Response of [`StateLookup::get_plans_by_zip`].
#[derive(Debug, Clone, Serialize)]
pub struct ZipPlans<'a> {
    pub zip_code: &'a str,
    pub state: &'a str,
    pub state_abbr: &'a str,
    pub multi_county: bool,
    pub primary_county: &'a str,
    pub counties: Vec<CountyPlans<'a>>,
}

/// Response of [`StateLookup::get_plan_detail`].
#[derive(Debug, Clone, Serialize)]
pub struct PlanDetail<'a> {
    pub plan_id: &'a PlanId,
    pub state: &'a str,
    pub county: &'a str,
    pub summary: &'a PlanSummary,
    pub details: Option<&'a DetailDocument>,
    pub has_details: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CountyListing<'a> {
    pub name: &'a str,
    pub plan_count: usize,
    pub details_available_count: usize,
}

/// Response of [`StateLookup::list_counties`], sorted by county name.
#[derive(Debug, Clone, Serialize)]
pub struct CountyDirectory<'a> {
    pub state: &'a str,
    pub state_abbr: &'a str,
    pub county_count: usize,
    pub counties: Vec<CountyListing<'a>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StateListing<'a> {
    pub key: String,
    pub name: &'a str,
    pub abbr: &'a str,
    pub zip_codes: usize,
    pub counties: usize,
}

/// Response of [`LookupService::list_states`], sorted by state name.
#[derive(Debug, Clone, Serialize)]
pub struct StateDirectory<'a> {
    pub states: Vec<StateListing<'a>>,
    pub total_states: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub states_loaded: usize,
    pub zip_codes_loaded: usize,
    pub counties_loaded: usize,
    pub loaded_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Per-state lookups
// ---------------------------------------------------------------------------

/// Where a composite id was first found.
#[derive(Debug, Clone)]
struct PlanLocation {
    county: String,
    index: usize,
}

/// The loaded data of one state.
#[derive(Debug, Clone)]
pub struct StateLookup {
    info: StateInfo,
    counties: BTreeMap<String, CountyPlanSet>,
    zips: BTreeMap<String, ZipEntry>,
    plan_index: HashMap<PlanId, PlanLocation>,
}

impl StateLookup {
    /// Assemble a state from its county sets and postal-code entries.
    ///
    /// The plan index maps each composite id to its first occurrence,
    /// scanning counties in name order.
    pub fn from_parts(
        info: StateInfo,
        county_sets: impl IntoIterator<Item = CountyPlanSet>,
        zips: impl IntoIterator<Item = ZipEntry>,
    ) -> Self {
        let counties: BTreeMap<String, CountyPlanSet> = county_sets
            .into_iter()
            .map(|set| (set.county.clone(), set))
            .collect();
        let zips = zips.into_iter().map(|z| (z.zip.clone(), z)).collect();

        let mut plan_index = HashMap::new();
        for (county, set) in &counties {
            for (index, plan) in set.plans.iter().enumerate() {
                plan_index
                    .entry(plan.id().clone())
                    .or_insert_with(|| PlanLocation {
                        county: county.clone(),
                        index,
                    });
            }
        }

        Self {
            info,
            counties,
            zips,
            plan_index,
        }
    }

    pub fn info(&self) -> &StateInfo {
        &self.info
    }

    pub fn zip_count(&self) -> usize {
        self.zips.len()
    }

    pub fn county_count(&self) -> usize {
        self.counties.len()
    }

    /// Postal codes in ascending order.
    pub fn zip_codes(&self) -> impl Iterator<Item = &str> {
        self.zips.keys().map(String::as_str)
    }

    pub fn resolver(&self) -> ZipResolver<'_> {
        ZipResolver::new(&self.info, &self.zips, &self.counties)
    }

    /// Plans of every covered county of `zip`, full or summarized.
    pub fn get_plans_by_zip(
        &self,
        zip: &str,
        include_details: bool,
    ) -> Result<ZipPlans<'_>, LookupError> {
        let resolved = self.resolver().resolve(zip)?;
        let counties = resolved
            .counties
            .iter()
            .map(|county| CountyPlans {
                name: &county.coverage.name,
                fips: &county.coverage.fips,
                percentage: county.coverage.weight,
                plan_count: county.plans.plan_count,
                details_available_count: county.plans.details_available_count,
                plans: county
                    .plans
                    .plans
                    .iter()
                    .map(|plan| {
                        if include_details {
                            PlanListing::Full(plan)
                        } else {
                            PlanListing::Summary(PlanSummaryView::from(plan))
                        }
                    })
                    .collect(),
            })
            .collect();

        Ok(ZipPlans {
            zip_code: &resolved.entry.zip,
            state: &self.info.name,
            state_abbr: &self.info.abbr,
            multi_county: resolved.entry.multi_county,
            primary_county: &resolved.entry.primary_county,
            counties,
        })
    }

    /// The first county holding `plan_id`, with the plan's detail payload.
    pub fn get_plan_detail(&self, plan_id: &str) -> Result<PlanDetail<'_>, LookupError> {
        let unknown = || LookupError::UnknownPlan {
            plan_id: plan_id.to_owned(),
        };
        let id: PlanId = plan_id.parse().map_err(|_| unknown())?;
        let location = self.plan_index.get(&id).ok_or_else(unknown)?;
        let plan = self
            .counties
            .get(&location.county)
            .and_then(|set| set.plans.get(location.index))
            .ok_or_else(unknown)?;

        Ok(PlanDetail {
            plan_id: plan.id(),
            state: &self.info.name,
            county: &location.county,
            summary: &plan.summary,
            details: plan.details.as_ref(),
            has_details: plan.has_details,
        })
    }

    pub fn list_counties(&self) -> CountyDirectory<'_> {
        let counties: Vec<CountyListing<'_>> = self
            .counties
            .values()
            .map(|set| CountyListing {
                name: &set.county,
                plan_count: set.plan_count,
                details_available_count: set.details_available_count,
            })
            .collect();
        CountyDirectory {
            state: &self.info.name,
            state_abbr: &self.info.abbr,
            county_count: counties.len(),
            counties,
        }
    }

    pub fn get_county(&self, county: &str) -> Result<&CountyPlanSet, LookupError> {
        self.counties
            .get(county)
            .ok_or_else(|| LookupError::UnknownCounty {
                county: county.to_owned(),
            })
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Every state of one build, loaded and indexed.
#[derive(Debug, Clone)]
pub struct Snapshot {
    states: BTreeMap<String, StateLookup>,
    loaded_at: DateTime<Utc>,
}

impl Snapshot {
    /// Load and verify every state listed by `reader`'s manifest.
    pub fn load(reader: &SnapshotReader) -> Result<Self, LoadError> {
        let manifest = reader.manifest()?;
        let mut states = Vec::with_capacity(manifest.states.len());
        for state in &manifest.states {
            states.push(load_state(reader, state)?);
        }
        let snapshot = Self::from_states(states);
        info!(
            path = %reader.layout().root().display(),
            states = snapshot.states.len(),
            "snapshot loaded"
        );
        Ok(snapshot)
    }

    /// Wrap states assembled in memory.
    pub fn from_states(states: impl IntoIterator<Item = StateLookup>) -> Self {
        Self {
            states: states
                .into_iter()
                .map(|s| (s.info.key(), s))
                .collect(),
            loaded_at: Utc::now(),
        }
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}

fn load_state(reader: &SnapshotReader, state: &StateInfo) -> Result<StateLookup, LoadError> {
    let manifest = reader.state_manifest(state)?;

    let mut county_sets = Vec::with_capacity(manifest.counties.len());
    for entry in &manifest.counties {
        let set = reader.read_county(state, entry)?;
        if set.county != entry.name {
            return Err(LoadError::CountyMismatch {
                state: state.abbr.clone(),
                expected: entry.name.clone(),
                found: set.county,
            });
        }
        if !set.counts_consistent() || set.plan_count != entry.plan_count {
            return Err(LoadError::InconsistentCounts {
                state: state.abbr.clone(),
                county: set.county,
            });
        }
        county_sets.push(set);
    }

    let zips = reader.read_zips(&manifest)?;
    if zips.len() != manifest.zip_count {
        return Err(LoadError::ZipCountMismatch {
            state: state.abbr.clone(),
            expected: manifest.zip_count,
            found: zips.len(),
        });
    }

    debug!(
        state = %state.abbr,
        counties = county_sets.len(),
        zips = zips.len(),
        "state loaded"
    );
    Ok(StateLookup::from_parts(state.clone(), county_sets, zips))
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Lookup operations over one immutable [`Snapshot`].
#[derive(Debug, Clone)]
pub struct LookupService {
    snapshot: Snapshot,
}

impl LookupService {
    pub fn new(snapshot: Snapshot) -> Self {
        Self { snapshot }
    }

    /// Load the current snapshot of `config`. Fails if any part of it is
    /// missing or does not verify.
    pub fn load(config: &StoreConfig) -> Result<Self, LoadError> {
        let reader = SnapshotReader::open(config)?;
        Ok(Self::new(Snapshot::load(&reader)?))
    }

    /// The state with lookup key `key` (lowercase abbreviation; any case
    /// is accepted).
    pub fn state(&self, key: &str) -> Result<&StateLookup, LookupError> {
        self.snapshot
            .states
            .get(&key.to_ascii_lowercase())
            .ok_or_else(|| LookupError::UnknownState {
                state: key.to_owned(),
            })
    }

    /// Loaded states in key order.
    pub fn states(&self) -> impl Iterator<Item = &StateLookup> {
        self.snapshot.states.values()
    }

    pub fn get_plans_by_zip(
        &self,
        state: &str,
        zip: &str,
        include_details: bool,
    ) -> Result<ZipPlans<'_>, LookupError> {
        self.state(state)?.get_plans_by_zip(zip, include_details)
    }

    pub fn get_plan_detail(&self, state: &str, plan_id: &str) -> Result<PlanDetail<'_>, LookupError> {
        self.state(state)?.get_plan_detail(plan_id)
    }

    pub fn list_counties(&self, state: &str) -> Result<CountyDirectory<'_>, LookupError> {
        Ok(self.state(state)?.list_counties())
    }

    pub fn get_county(&self, state: &str, county: &str) -> Result<&CountyPlanSet, LookupError> {
        self.state(state)?.get_county(county)
    }

    pub fn list_states(&self) -> StateDirectory<'_> {
        let mut states: Vec<StateListing<'_>> = self
            .states()
            .map(|s| StateListing {
                key: s.info.key(),
                name: &s.info.name,
                abbr: &s.info.abbr,
                zip_codes: s.zip_count(),
                counties: s.county_count(),
            })
            .collect();
        states.sort_by(|a, b| a.name.cmp(b.name));
        StateDirectory {
            total_states: states.len(),
            states,
        }
    }

    pub fn health(&self) -> Health {
        Health {
            status: "healthy",
            states_loaded: self.snapshot.states.len(),
            zip_codes_loaded: self.states().map(StateLookup::zip_count).sum(),
            counties_loaded: self.states().map(StateLookup::county_count).sum(),
            loaded_at: self.snapshot.loaded_at,
        }
    }
}
