//! Per-county plan sets derived from a [`StateCatalog`].

use std::collections::BTreeMap;

use zipplan_store::models::{CountyPlanSet, PlanRecord};

use crate::catalog::StateCatalog;

/// Build the plan set of every county that has at least one county-specific
/// plan: the statewide list followed by the county's own list.
///
/// Entries are taken as-is. An id that appears both statewide and in a
/// county's own list shows up twice in that county's set.
pub fn aggregate_counties(catalog: &StateCatalog) -> BTreeMap<String, CountyPlanSet> {
    catalog
        .by_county
        .iter()
        .filter(|(_, specific)| !specific.is_empty())
        .map(|(county, specific)| {
            let set = county_plan_set(catalog, county, specific);
            (county.clone(), set)
        })
        .collect()
}

fn county_plan_set(catalog: &StateCatalog, county: &str, specific: &[PlanRecord]) -> CountyPlanSet {
    let plans: Vec<PlanRecord> = catalog
        .statewide
        .iter()
        .chain(specific.iter())
        .cloned()
        .collect();
    let details_available_count = plans.iter().filter(|p| p.has_details).count();

    CountyPlanSet {
        state: catalog.state.name.clone(),
        state_abbr: catalog.state.abbr.clone(),
        county: county.to_owned(),
        plan_count: plans.len(),
        all_counties_plan_count: catalog.statewide.len(),
        county_specific_plan_count: specific.len(),
        details_available_count,
        plans,
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use zipplan_store::details::DetailIndex;
    use zipplan_store::landscape::read_landscape_from;
    use zipplan_store::models::StateInfo;

    use super::*;
    use crate::catalog::PlanCatalog;

    const HEADER: &str = "State Territory Name,County Name,ContractPlanSegmentID,Plan Name";

    fn catalog(rows: &str) -> StateCatalog {
        let table =
            read_landscape_from(format!("{HEADER}\n{rows}").as_bytes(), Path::new("t.csv")).unwrap();
        PlanCatalog::new(&table).build(&StateInfo::new("ZZ", "Testland"), &DetailIndex::empty())
    }

    #[test]
    fn two_statewide_plus_three_specific() {
        let catalog = catalog(
            "Testland,All Counties,H0001_001_0,State One\n\
             Testland,All Counties,H0001_002_0,State Two\n\
             Testland,Alpha,H0002_001_0,Alpha One\n\
             Testland,Alpha,H0002_002_0,Alpha Two\n\
             Testland,Alpha,H0002_003_0,Alpha Three\n",
        );
        let sets = aggregate_counties(&catalog);
        let alpha = &sets["Alpha"];
        assert_eq!(alpha.plan_count, 5);
        assert_eq!(alpha.all_counties_plan_count, 2);
        assert_eq!(alpha.county_specific_plan_count, 3);
        assert_eq!(alpha.details_available_count, 0);
        assert_eq!(alpha.state, "Testland");
        assert_eq!(alpha.state_abbr, "ZZ");
        assert!(alpha.counts_consistent());
    }

    #[test]
    fn statewide_plans_come_first() {
        let catalog = catalog(
            "Testland,Alpha,H0002_001_0,Alpha One\n\
             Testland,All Counties,H0001_001_0,State One\n",
        );
        let sets = aggregate_counties(&catalog);
        let order: Vec<String> = sets["Alpha"]
            .plans
            .iter()
            .map(|p| p.id().to_string())
            .collect();
        assert_eq!(order, vec!["H0001_001_0", "H0002_001_0"]);
    }

    #[test]
    fn counties_without_specific_plans_get_no_set() {
        let catalog = catalog("Testland,All Counties,H0001_001_0,State One\n");
        assert!(aggregate_counties(&catalog).is_empty());
    }

    #[test]
    fn overlapping_statewide_and_specific_entries_are_kept() {
        let catalog = catalog(
            "Testland,All Counties,H0001_001_0,State One\n\
             Testland,Alpha,H0001_001_0,State One\n",
        );
        let alpha = &aggregate_counties(&catalog)["Alpha"];
        assert_eq!(alpha.plan_count, 2);
        assert_eq!(alpha.plans[0].id(), alpha.plans[1].id());
        assert!(alpha.counts_consistent());
    }
}
