//! Resolved postal-code documents and their compact wire form.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use zipplan_store::models::{PlanRecord, StateInfo};

use crate::resolve::ResolvedZip;

/// A resolved postal code with its plans, as handed to the codec.
///
/// Each distinct plan record appears once in `plans`; every county lists
/// positions into `plans` for its own plan set, in the set's order, so
/// per-county sets stay separate. Two entries sharing an id but differing in
/// scope are distinct records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZipDocument {
    pub zip_code: String,
    pub multi_county: bool,
    pub multi_state: bool,
    pub states: Vec<String>,
    pub primary_state: Option<String>,
    pub counties: Vec<DocumentCounty>,
    pub plans: Vec<PlanRecord>,
    pub plan_count: usize,
}

/// One county of a [`ZipDocument`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentCounty {
    pub fips: String,
    pub name: String,
    pub state: Option<String>,
    /// Share of the postal code in this county, 0.0 to 1.0.
    pub ratio: Option<f64>,
    pub plans_available: bool,
    pub plan_count: usize,
    /// Positions into [`ZipDocument::plans`].
    pub plan_indices: Vec<usize>,
}

impl ZipDocument {
    /// Build the document for a resolved postal code of `state`.
    ///
    /// Every covered county is listed; those without a plan set have
    /// `plans_available == false` and no entries. Records equal in every
    /// field are stored once and shared by position.
    pub fn from_resolved(resolved: &ResolvedZip<'_>, state: &StateInfo) -> Self {
        let mut plans: Vec<PlanRecord> = Vec::new();
        let mut states: BTreeSet<String> = BTreeSet::new();
        let mut counties = Vec::with_capacity(resolved.entry.counties.len());

        for coverage in &resolved.entry.counties {
            let county_state = coverage
                .state
                .clone()
                .unwrap_or_else(|| state.abbr.clone());
            states.insert(county_state.clone());

            let set = resolved.plans_for(coverage);
            let mut plan_indices = Vec::new();
            if let Some(set) = set {
                for record in &set.plans {
                    let index = match plans.iter().position(|p| p == record) {
                        Some(index) => index,
                        None => {
                            plans.push(record.clone());
                            plans.len() - 1
                        }
                    };
                    plan_indices.push(index);
                }
            }

            counties.push(DocumentCounty {
                fips: coverage.fips.clone(),
                name: coverage.name.clone(),
                state: Some(county_state),
                ratio: coverage.weight.map(|w| w / 100.0),
                plans_available: set.is_some(),
                plan_count: set.map_or(0, |s| s.plan_count),
                plan_indices,
            });
        }

        Self {
            zip_code: resolved.entry.zip.clone(),
            multi_county: resolved.entry.multi_county,
            multi_state: states.len() > 1,
            states: states.into_iter().collect(),
            primary_state: Some(state.abbr.clone()),
            counties,
            plan_count: plans.len(),
            plans,
        }
    }

    /// The plans of one county, in the county's own order.
    pub fn county_plans(&self, county: &str) -> Vec<&PlanRecord> {
        let Some(entry) = self.counties.iter().find(|c| c.name == county) else {
            return Vec::new();
        };
        entry
            .plan_indices
            .iter()
            .filter_map(|&index| self.plans.get(index))
            .collect()
    }
}

/// Short-keyed wire form of a [`ZipDocument`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompactDocument {
    #[serde(rename = "z")]
    pub zip_code: String,
    #[serde(rename = "mc")]
    pub multi_county: bool,
    #[serde(rename = "ms")]
    pub multi_state: bool,
    #[serde(rename = "s")]
    pub states: Vec<String>,
    #[serde(rename = "ps")]
    pub primary_state: Option<String>,
    #[serde(rename = "c")]
    pub counties: Vec<CompactCounty>,
    /// Minified plan objects, each possibly carrying a derived `pt` key.
    #[serde(rename = "p")]
    pub plans: Vec<serde_json::Value>,
    #[serde(rename = "pc")]
    pub plan_count: usize,
}

/// Short-keyed wire form of a [`DocumentCounty`].
///
/// County names and state codes are written as-is; the content tables apply
/// to plan objects only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompactCounty {
    #[serde(rename = "f")]
    pub fips: String,
    #[serde(rename = "n")]
    pub name: String,
    #[serde(rename = "s")]
    pub state: Option<String>,
    #[serde(rename = "r")]
    pub ratio: Option<f64>,
    #[serde(rename = "pa")]
    pub plans_available: bool,
    #[serde(rename = "pc")]
    pub plan_count: usize,
    #[serde(rename = "i")]
    pub plan_indices: Vec<usize>,
}

impl From<&DocumentCounty> for CompactCounty {
    fn from(county: &DocumentCounty) -> Self {
        Self {
            fips: county.fips.clone(),
            name: county.name.clone(),
            state: county.state.clone(),
            ratio: county.ratio,
            plans_available: county.plans_available,
            plan_count: county.plan_count,
            plan_indices: county.plan_indices.clone(),
        }
    }
}

impl From<&CompactCounty> for DocumentCounty {
    fn from(county: &CompactCounty) -> Self {
        Self {
            fips: county.fips.clone(),
            name: county.name.clone(),
            state: county.state.clone(),
            ratio: county.ratio,
            plans_available: county.plans_available,
            plan_count: county.plan_count,
            plan_indices: county.plan_indices.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use zipplan_store::models::{CountyCoverage, CountyPlanSet, PlanScope, PlanSummary, ZipEntry};

    use super::*;
    use crate::resolve::ZipResolver;

    fn nh() -> StateInfo {
        StateInfo::new("NH", "New Hampshire")
    }

    fn record(id: &str, scope: PlanScope) -> PlanRecord {
        PlanRecord::new(
            PlanSummary {
                contract_plan_segment_id: id.parse().unwrap(),
                plan_name: "Monadnock Choice (HMO)".into(),
                plan_type: "Local HMO".into(),
                organization: "Monadnock Health".into(),
                parent_organization: "Monadnock Holdings".into(),
                part_c_premium: Some(0.0),
                part_d_total_premium: None,
                overall_star_rating: Some(4.0),
                snp_type: None,
                scope,
            },
            None,
        )
    }

    fn county(name: &str) -> PlanScope {
        PlanScope::County(name.into())
    }

    fn plan_set(name: &str, plans: Vec<PlanRecord>) -> CountyPlanSet {
        let statewide = plans.iter().filter(|p| p.summary.scope.is_statewide()).count();
        CountyPlanSet {
            state: "New Hampshire".into(),
            state_abbr: "NH".into(),
            county: name.into(),
            plan_count: plans.len(),
            all_counties_plan_count: statewide,
            county_specific_plan_count: plans.len() - statewide,
            details_available_count: 0,
            plans,
        }
    }

    fn coverage(name: &str, weight: f64) -> CountyCoverage {
        CountyCoverage {
            name: name.into(),
            fips: String::new(),
            weight: Some(weight),
            state: None,
            plan_count: 0,
        }
    }

    fn document(sets: Vec<CountyPlanSet>) -> (ZipDocument, BTreeMap<String, CountyPlanSet>) {
        let county_sets: BTreeMap<String, CountyPlanSet> =
            sets.into_iter().map(|s| (s.county.clone(), s)).collect();
        let entry = ZipEntry {
            zip: "03602".into(),
            multi_county: county_sets.len() > 1,
            primary_county: "Cheshire".into(),
            counties: county_sets
                .keys()
                .map(|name| coverage(name, 100.0 / county_sets.len() as f64))
                .collect(),
        };
        let zips = BTreeMap::from([(entry.zip.clone(), entry)]);
        let state = nh();
        let resolver = ZipResolver::new(&state, &zips, &county_sets);
        let resolved = resolver.resolve("03602").unwrap();
        let doc = ZipDocument::from_resolved(&resolved, &state);
        (doc, county_sets)
    }

    #[test]
    fn same_id_in_two_counties_keeps_each_record() {
        let (doc, sets) = document(vec![
            plan_set("Cheshire", vec![record("H2222_001_0", county("Cheshire"))]),
            plan_set("Sullivan", vec![record("H2222_001_0", county("Sullivan"))]),
        ]);
        assert_eq!(doc.plan_count, 2);
        for name in ["Cheshire", "Sullivan"] {
            let expected: Vec<&PlanRecord> = sets[name].plans.iter().collect();
            assert_eq!(doc.county_plans(name), expected, "records of {name}");
        }
    }

    #[test]
    fn statewide_and_county_entries_of_one_id_both_survive() {
        let (doc, sets) = document(vec![plan_set(
            "Sullivan",
            vec![
                record("H6666_001_0", PlanScope::Statewide),
                record("H6666_001_0", county("Sullivan")),
            ],
        )]);
        assert_eq!(doc.plan_count, 2);
        assert_eq!(doc.counties[0].plan_indices, vec![0, 1]);
        let expected: Vec<&PlanRecord> = sets["Sullivan"].plans.iter().collect();
        assert_eq!(doc.county_plans("Sullivan"), expected);
    }

    #[test]
    fn identical_records_are_stored_once() {
        let shared = record("H1111_001_0", PlanScope::Statewide);
        let (doc, _) = document(vec![
            plan_set("Cheshire", vec![shared.clone()]),
            plan_set("Sullivan", vec![shared]),
        ]);
        assert_eq!(doc.plan_count, 1);
        assert_eq!(doc.counties[0].plan_indices, vec![0]);
        assert_eq!(doc.counties[1].plan_indices, vec![0]);
    }

    #[test]
    fn unknown_county_has_no_plans() {
        let (doc, _) = document(vec![plan_set(
            "Cheshire",
            vec![record("H2222_001_0", county("Cheshire"))],
        )]);
        assert!(doc.county_plans("Grafton").is_empty());
    }
}
