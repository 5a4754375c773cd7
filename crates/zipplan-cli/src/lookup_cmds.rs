//! Lookup commands over the current snapshot: `zip`, `plan`, `counties`,
//! `states` and `health`.

use anyhow::Result;

use zipplan_core::lookup::{LookupService, PlanListing};

/// Show the plans of every covered county of a postal code.
pub fn run_zip(service: &LookupService, state: &str, zip: &str, details: bool, json: bool) -> Result<()> {
    let plans = service.get_plans_by_zip(state, zip, details)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&plans)?);
        return Ok(());
    }

    println!("ZIP {} ({}, {})", plans.zip_code, plans.state, plans.state_abbr);
    println!("Primary county: {}", plans.primary_county);
    if plans.counties.is_empty() {
        println!("No plan data for the counties of this ZIP code.");
        return Ok(());
    }

    for county in &plans.counties {
        println!();
        let share = county
            .percentage
            .map(|p| format!(" {p:.1}%"))
            .unwrap_or_default();
        println!(
            "{} County (FIPS {}){share}: {} plans, {} with details",
            county.name, county.fips, county.plan_count, county.details_available_count
        );
        for plan in &county.plans {
            let (id, name, organization, has_details) = match plan {
                PlanListing::Full(record) => (
                    record.id(),
                    record.summary.plan_name.as_str(),
                    record.summary.organization.as_str(),
                    record.has_details,
                ),
                PlanListing::Summary(view) => (
                    view.contract_plan_segment_id,
                    view.plan_name,
                    view.organization,
                    view.has_details,
                ),
            };
            let marker = if has_details { "*" } else { " " };
            println!("  {marker} {:<14} {name} ({organization})", id.to_string());
        }
    }
    Ok(())
}

/// Show one plan with its detail document as JSON.
pub fn run_plan(service: &LookupService, state: &str, plan_id: &str, year: u16) -> Result<()> {
    let detail = service.get_plan_detail(state, plan_id)?;
    println!("{}", serde_json::to_string_pretty(&detail)?);
    println!();
    println!("{}", detail.plan_id.plan_url(year));
    Ok(())
}

pub fn run_counties(service: &LookupService, state: &str) -> Result<()> {
    let directory = service.list_counties(state)?;
    println!(
        "{} ({}): {} counties",
        directory.state, directory.state_abbr, directory.county_count
    );
    println!();
    println!("{:<30} {:>8} {:>10}", "COUNTY", "PLANS", "DETAILS");
    println!("{}", "-".repeat(50));
    for county in &directory.counties {
        println!(
            "{:<30} {:>8} {:>10}",
            county.name, county.plan_count, county.details_available_count
        );
    }
    Ok(())
}

pub fn run_states(service: &LookupService) -> Result<()> {
    let directory = service.list_states();
    println!("{:<6} {:<28} {:>8} {:>9}", "KEY", "STATE", "ZIPS", "COUNTIES");
    println!("{}", "-".repeat(54));
    for state in &directory.states {
        println!(
            "{:<6} {:<28} {:>8} {:>9}",
            state.key, state.name, state.zip_codes, state.counties
        );
    }
    println!();
    println!("{} state(s) loaded", directory.total_states);
    Ok(())
}

pub fn run_health(service: &LookupService) -> Result<()> {
    let health = service.health();
    println!("Status: {}", health.status);
    println!("States loaded: {}", health.states_loaded);
    println!("ZIP codes loaded: {}", health.zip_codes_loaded);
    println!("Counties loaded: {}", health.counties_loaded);
    println!(
        "Loaded at: {}",
        health.loaded_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    Ok(())
}
