//! `zipplan analyze` and `zipplan plans`: inspect the landscape source
//! without building a snapshot.

use std::path::Path;

use anyhow::{Context, Result};

use zipplan_core::analysis::analyze_landscape;
use zipplan_core::catalog::PlanCatalog;
use zipplan_store::details::{DetailIndex, load_detail_documents};
use zipplan_store::landscape::read_landscape;
use zipplan_store::models::StateInfo;

use crate::config::ZipplanConfig;

/// Print per-state statistics of the landscape file, as a table or JSON.
pub fn run_analyze(landscape_csv: &Path, json: bool) -> Result<()> {
    let table = read_landscape(landscape_csv)
        .with_context(|| format!("cannot analyze {}", landscape_csv.display()))?;
    let analysis = analyze_landscape(&table);

    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
        return Ok(());
    }

    println!(
        "{:<28} {:>7} {:>7} {:>9} {:>10} {:>10} {:>9}",
        "STATE", "ROWS", "PLANS", "COUNTIES", "STATEWIDE", "SPECIFIC", "SEGMENTS"
    );
    println!("{}", "-".repeat(86));
    for (state, stats) in &analysis {
        let name = if state.len() > 26 {
            format!("{}...", state.chars().take(23).collect::<String>())
        } else {
            state.clone()
        };
        println!(
            "{:<28} {:>7} {:>7} {:>9} {:>10} {:>10} {:>9}",
            name,
            stats.total_rows,
            stats.total_unique_plans,
            stats.actual_county_count,
            stats.plans_marked_all_counties,
            stats.plans_in_specific_counties,
            stats.multi_segment_plans.len(),
        );
    }
    println!();
    println!("{} state(s) in {}", analysis.len(), landscape_csv.display());
    if !table.issues.is_empty() {
        println!("{} row(s) could not be decoded", table.issues.len());
    }
    Ok(())
}

/// List the canonical plans of one state with their plan-compare links.
pub fn run_plans(config: &ZipplanConfig, state: &StateInfo) -> Result<()> {
    let table = read_landscape(&config.source.landscape_csv).with_context(|| {
        format!("cannot read {}", config.source.landscape_csv.display())
    })?;
    let details = match &config.source.details_dir {
        Some(dir) => load_detail_documents(dir, state)?,
        None => DetailIndex::empty(),
    };
    let catalog = PlanCatalog::new(&table).build(state, &details);
    let plans = catalog.canonical_plans();

    println!("{} ({}): {} plans", state.name, state.abbr, plans.len());
    println!();
    for plan in plans {
        let reach = if plan.all_counties {
            "all counties".to_string()
        } else {
            plan.counties.iter().cloned().collect::<Vec<_>>().join(", ")
        };
        let details = if plan.has_details { "details" } else { "no details" };
        println!("{}  {}", plan.id(), plan.summary.plan_name);
        println!("    {} | {reach} | {details}", plan.summary.organization);
        println!("    {}", plan.plan_url(config.source.plan_year));
    }

    if !catalog.warnings.is_empty() {
        println!();
        println!("Warnings ({}):", catalog.warnings.len());
        for warning in &catalog.warnings {
            println!("  {warning}");
        }
    }
    Ok(())
}
