//! Postal code resolution.
//!
//! Raw mapping entries are normalized into [`ZipEntry`]s at build time
//! (primary county chosen, per-county plan counts filled in). At lookup
//! time a [`ZipResolver`] pairs each covered county with its plan set.
//! Plan sets are never unioned: a subscriber's plans depend on which county
//! of the postal code they live in.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::warn;

use zipplan_store::models::{CountyCoverage, CountyPlanSet, PlanId, PlanRecord, StateInfo, ZipEntry};
use zipplan_store::zip_mapping::{RawCounty, RawZipEntry};

use crate::error::LookupError;

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// The county with the strictly greatest coverage weight. When weights are
/// missing or the top weight is shared, the declared primary is kept.
pub fn select_primary_county(declared: &str, counties: &[RawCounty]) -> String {
    let mut best: Option<(&RawCounty, f64)> = None;
    let mut tied = false;
    for county in counties {
        let Some(weight) = county.percentage else {
            continue;
        };
        match best {
            Some((_, top)) if weight < top => {}
            Some((_, top)) if weight == top => tied = true,
            _ => {
                best = Some((county, weight));
                tied = false;
            }
        }
    }
    match best {
        Some((county, _)) if !tied => county.name.clone(),
        _ => declared.to_owned(),
    }
}

/// Whether a coverage entry refers to a county of `state`. Entries without
/// a state tag belong to the state whose mapping file listed them.
pub fn covers_state(coverage: &CountyCoverage, state: &StateInfo) -> bool {
    coverage
        .state
        .as_deref()
        .is_none_or(|abbr| abbr.eq_ignore_ascii_case(&state.abbr))
}

/// Normalize one raw entry against the county sets of the same build.
pub fn normalize_zip_entry(
    raw: &RawZipEntry,
    state: &StateInfo,
    county_sets: &BTreeMap<String, CountyPlanSet>,
) -> ZipEntry {
    let raw_counties = raw.county_list();
    let primary_county = select_primary_county(&raw.primary_county.name, &raw_counties);

    let counties: Vec<CountyCoverage> = raw_counties
        .into_iter()
        .map(|county| {
            let mut coverage = CountyCoverage {
                name: county.name,
                fips: county.fips,
                weight: county.percentage,
                state: county.state,
                plan_count: 0,
            };
            if covers_state(&coverage, state) {
                coverage.plan_count = county_sets
                    .get(&coverage.name)
                    .map_or(0, |set| set.plan_count);
            }
            coverage
        })
        .collect();

    ZipEntry {
        zip: raw.zip.trim().to_owned(),
        multi_county: raw.multi_county || counties.len() > 1,
        primary_county,
        counties,
    }
}

/// Normalize a state's whole mapping, sorted by postal code. A code listed
/// more than once keeps its first entry.
pub fn normalize_zip_mapping(
    raw: &[RawZipEntry],
    state: &StateInfo,
    county_sets: &BTreeMap<String, CountyPlanSet>,
) -> Vec<ZipEntry> {
    let mut entries: BTreeMap<String, ZipEntry> = BTreeMap::new();
    for raw_entry in raw {
        let entry = normalize_zip_entry(raw_entry, state, county_sets);
        if entries.contains_key(&entry.zip) {
            warn!(state = %state.abbr, zip = %entry.zip, "duplicate ZIP code in mapping, keeping first");
            continue;
        }
        entries.insert(entry.zip.clone(), entry);
    }
    entries.into_values().collect()
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// A county of a resolved postal code together with its plan set.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedCounty<'a> {
    pub coverage: &'a CountyCoverage,
    pub plans: &'a CountyPlanSet,
}

/// A postal code and the plan set of every covered county that has one.
#[derive(Debug, Clone)]
pub struct ResolvedZip<'a> {
    pub entry: &'a ZipEntry,
    /// Covered counties with a plan set, in mapping order.
    pub counties: Vec<ResolvedCounty<'a>>,
}

impl<'a> ResolvedZip<'a> {
    /// Set of the county named `name`, if it was resolved.
    pub fn county(&self, name: &str) -> Option<&ResolvedCounty<'a>> {
        self.counties.iter().find(|c| c.coverage.name == name)
    }

    /// Plan set resolved for `coverage`, one of this entry's counties.
    pub fn plans_for(&self, coverage: &CountyCoverage) -> Option<&'a CountyPlanSet> {
        self.counties
            .iter()
            .find(|c| std::ptr::eq(c.coverage, coverage))
            .map(|c| c.plans)
    }

    /// Covered counties left out because no plan set exists for them.
    pub fn omitted(&self) -> impl Iterator<Item = &'a CountyCoverage> + '_ {
        self.entry
            .counties
            .iter()
            .filter(move |c| self.plans_for(c).is_none())
    }
}

/// Resolves postal codes of one state against its county plan sets.
#[derive(Debug, Clone, Copy)]
pub struct ZipResolver<'a> {
    state: &'a StateInfo,
    zips: &'a BTreeMap<String, ZipEntry>,
    county_sets: &'a BTreeMap<String, CountyPlanSet>,
}

impl<'a> ZipResolver<'a> {
    pub fn new(
        state: &'a StateInfo,
        zips: &'a BTreeMap<String, ZipEntry>,
        county_sets: &'a BTreeMap<String, CountyPlanSet>,
    ) -> Self {
        Self {
            state,
            zips,
            county_sets,
        }
    }

    /// Look up `zip`. Counties without a plan set, or belonging to another
    /// state, are left out of the result rather than failing it.
    pub fn resolve(&self, zip: &str) -> Result<ResolvedZip<'a>, LookupError> {
        let entry = self
            .zips
            .get(zip.trim())
            .ok_or_else(|| LookupError::UnknownZip {
                zip: zip.to_owned(),
            })?;

        let counties = entry
            .counties
            .iter()
            .filter(|coverage| covers_state(coverage, self.state))
            .filter_map(|coverage| {
                self.county_sets
                    .get(&coverage.name)
                    .map(|plans| ResolvedCounty { coverage, plans })
            })
            .collect();

        Ok(ResolvedZip { entry, counties })
    }
}

// ---------------------------------------------------------------------------
// Summary projection
// ---------------------------------------------------------------------------

/// Narrow, lossy view of a plan used when details are not requested.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlanSummaryView<'a> {
    pub contract_plan_segment_id: &'a PlanId,
    pub plan_name: &'a str,
    pub plan_type: &'a str,
    pub organization: &'a str,
    pub has_details: bool,
}

impl<'a> From<&'a PlanRecord> for PlanSummaryView<'a> {
    fn from(record: &'a PlanRecord) -> Self {
        Self {
            contract_plan_segment_id: &record.summary.contract_plan_segment_id,
            plan_name: &record.summary.plan_name,
            plan_type: &record.summary.plan_type,
            organization: &record.summary.organization,
            has_details: record.has_details,
        }
    }
}
