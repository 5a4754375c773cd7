//! `zipplan build` command: rebuild the snapshot from the source data.

use anyhow::Result;

use zipplan_core::build::{BuildPipeline, BuildSummary};

use crate::config::ZipplanConfig;

/// Run the build command.
pub fn run_build(config: &ZipplanConfig) -> Result<()> {
    let pipeline = BuildPipeline::new(config.build_inputs(), config.store.clone());
    println!(
        "Building {} state(s) from {}",
        config.states.len(),
        config.source.landscape_csv.display()
    );
    if config.source.details_dir.is_none() {
        println!("No details_dir configured; plans are built without detail documents.");
    }
    println!();

    let summary = pipeline.run()?;
    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &BuildSummary) {
    println!(
        "{:<6} {:>9} {:>7} {:>7} {:>9} {:>9} {:>10} {:>9} {:>9}",
        "STATE", "COUNTIES", "ZIPS", "PLANS", "ENTRIES", "DETAILS", "NO DETAIL", "COVERAGE", "SKIPPED"
    );
    println!("{}", "-".repeat(84));

    for state in &summary.states {
        println!(
            "{:<6} {:>9} {:>7} {:>7} {:>9} {:>9} {:>10} {:>8.1}% {:>9}",
            state.state.abbr,
            state.counties,
            state.zip_codes,
            state.unique_plans,
            state.plan_entries,
            state.with_details,
            state.without_details(),
            state.coverage_percent(),
            state.skipped_rows,
        );
    }

    println!("{}", "-".repeat(84));
    println!(
        "{:<6} {:>9} {:>7} {:>7} {:>9} {:>9} {:>10} {:>8.1}% {:>9}",
        "TOTAL",
        summary.counties(),
        summary.states.iter().map(|s| s.zip_codes).sum::<usize>(),
        summary.states.iter().map(|s| s.unique_plans).sum::<usize>(),
        summary.plan_entries(),
        summary.with_details(),
        summary.without_details(),
        summary.coverage_percent(),
        summary.skipped_rows(),
    );
    println!();

    let warnings = summary.warning_count();
    if warnings > 0 {
        println!("Warnings ({warnings}):");
        for warning in &summary.file_warnings {
            println!("  {warning}");
        }
        for state in &summary.states {
            for warning in &state.warnings {
                println!("  [{}] {warning}", state.state.abbr);
            }
        }
        println!();
    }

    println!("Snapshot written to {}", summary.snapshot_dir.display());
}
