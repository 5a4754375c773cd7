//! Per-state statistics over a raw landscape table.
//!
//! Works on the raw column values, before any id validation, so the
//! numbers describe the source file as delivered.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use zipplan_store::landscape::LandscapeTable;
use zipplan_store::models::ALL_COUNTIES;

/// Landscape statistics of one state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StateAnalysis {
    pub total_rows: usize,
    pub total_unique_plans: usize,
    /// Distinct county column values, the statewide sentinel included.
    pub total_counties_in_data: usize,
    pub actual_county_count: usize,
    pub plans_marked_all_counties: usize,
    pub plans_in_specific_counties: usize,
    pub counties: BTreeSet<String>,
    /// Contract-plan ids offered in more than one segment, with their
    /// segment ids.
    pub multi_segment_plans: BTreeMap<String, BTreeSet<String>>,
}

#[derive(Default)]
struct Accumulator {
    rows: usize,
    plan_ids: BTreeSet<String>,
    counties: BTreeSet<String>,
    statewide: BTreeSet<String>,
    specific: BTreeSet<String>,
    segments: BTreeMap<String, BTreeSet<String>>,
}

/// Analyze every state present in `table`, keyed by state name.
pub fn analyze_landscape(table: &LandscapeTable) -> BTreeMap<String, StateAnalysis> {
    let mut by_state: BTreeMap<String, Accumulator> = BTreeMap::new();

    for record in &table.records {
        let row = &record.row;
        let acc = by_state.entry(row.state_name.clone()).or_default();
        acc.rows += 1;
        acc.counties.insert(row.county.clone());

        if !row.plan_id.is_empty() {
            acc.plan_ids.insert(row.plan_id.clone());
            if row.county == ALL_COUNTIES {
                acc.statewide.insert(row.plan_id.clone());
            } else {
                acc.specific.insert(row.plan_id.clone());
            }
        }
        if !row.contract_plan_id.is_empty() {
            acc.segments
                .entry(row.contract_plan_id.clone())
                .or_default()
                .insert(row.segment_id.clone());
        }
    }

    by_state
        .into_iter()
        .map(|(state, acc)| {
            let actual_county_count = acc.counties.len() - usize::from(acc.counties.contains(ALL_COUNTIES));
            let analysis = StateAnalysis {
                total_rows: acc.rows,
                total_unique_plans: acc.plan_ids.len(),
                total_counties_in_data: acc.counties.len(),
                actual_county_count,
                plans_marked_all_counties: acc.statewide.len(),
                plans_in_specific_counties: acc.specific.len(),
                counties: acc.counties,
                multi_segment_plans: acc
                    .segments
                    .into_iter()
                    .filter(|(_, segments)| segments.len() > 1)
                    .collect(),
            };
            (state, analysis)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use zipplan_store::landscape::read_landscape_from;

    use super::*;

    #[test]
    fn counts_per_state() {
        let csv = "State Territory Name,County Name,ContractPlanSegmentID,ContractPlanID,Segment ID\n\
                   Vermont,All Counties,H5555_001_0,H5555_001,0\n\
                   Vermont,Chittenden,H5555_002_0,H5555_002,0\n\
                   Vermont,Chittenden,H5555_002_1,H5555_002,1\n\
                   Vermont,Windsor,H5555_002_0,H5555_002,0\n\
                   Wyoming,Laramie,H7777_001_0,H7777_001,0\n";
        let table = read_landscape_from(csv.as_bytes(), Path::new("t.csv")).unwrap();
        let analysis = analyze_landscape(&table);

        let vt = &analysis["Vermont"];
        assert_eq!(vt.total_rows, 4);
        assert_eq!(vt.total_unique_plans, 3);
        assert_eq!(vt.total_counties_in_data, 3);
        assert_eq!(vt.actual_county_count, 2);
        assert_eq!(vt.plans_marked_all_counties, 1);
        assert_eq!(vt.plans_in_specific_counties, 2);
        assert_eq!(
            vt.multi_segment_plans["H5555_002"].iter().collect::<Vec<_>>(),
            vec!["0", "1"]
        );
        assert_eq!(vt.multi_segment_plans.len(), 1);

        let wy = &analysis["Wyoming"];
        assert_eq!(wy.actual_county_count, 1);
        assert_eq!(wy.plans_marked_all_counties, 0);
        assert!(wy.multi_segment_plans.is_empty());
    }
}
