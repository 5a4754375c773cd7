//! `zipplan compact` command: write one compact document per postal code.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use zipplan_core::codec::{self, CodecTables, ZipDocument};
use zipplan_core::lookup::{LookupService, StateLookup};
use zipplan_store::tables::{KEY_TABLE_FILE, VALUE_TABLE_FILE};

use crate::config::ZipplanConfig;

/// Byte totals of one compaction run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CompactReport {
    pub documents: usize,
    pub original_bytes: usize,
    pub compact_bytes: usize,
}

impl CompactReport {
    pub fn reduction_percent(&self) -> f64 {
        if self.original_bytes == 0 {
            0.0
        } else {
            (1.0 - self.compact_bytes as f64 / self.original_bytes as f64) * 100.0
        }
    }
}

/// Run the compact command.
pub fn run_compact(config: &ZipplanConfig, out: Option<PathBuf>) -> Result<()> {
    let out = out.unwrap_or_else(|| config.store.compact_dir());
    let tables = CodecTables::load(&config.codec.key_table, &config.codec.value_table)
        .context("failed to load codec tables")?;
    let service = LookupService::load(&config.store).context("failed to load snapshot")?;

    let mut total = CompactReport::default();
    println!(
        "{:<6} {:>8} {:>14} {:>14} {:>10}",
        "STATE", "ZIPS", "ORIGINAL", "COMPACT", "REDUCTION"
    );
    println!("{}", "-".repeat(56));
    for state in service.states() {
        let report = compact_state(state, &tables, &out)?;
        println!(
            "{:<6} {:>8} {:>14} {:>14} {:>9.1}%",
            state.info().abbr,
            report.documents,
            report.original_bytes,
            report.compact_bytes,
            report.reduction_percent()
        );
        total.documents += report.documents;
        total.original_bytes += report.original_bytes;
        total.compact_bytes += report.compact_bytes;
    }
    println!("{}", "-".repeat(56));
    println!(
        "{:<6} {:>8} {:>14} {:>14} {:>9.1}%",
        "TOTAL",
        total.documents,
        total.original_bytes,
        total.compact_bytes,
        total.reduction_percent()
    );

    copy_tables(config, &out)?;
    println!();
    println!("Compact documents written to {}", out.display());
    Ok(())
}

/// Encode every postal code of `state` into `<out>/<ABBR>/<zip>.json`.
pub fn compact_state(state: &StateLookup, tables: &CodecTables, out: &Path) -> Result<CompactReport> {
    let dir = out.join(&state.info().abbr);
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create output directory {}", dir.display()))?;

    let resolver = state.resolver();
    let mut report = CompactReport::default();
    for zip in state.zip_codes() {
        let resolved = resolver.resolve(zip)?;
        let doc = ZipDocument::from_resolved(&resolved, state.info());
        let original = serde_json::to_vec(&doc)?;
        let compact = codec::encode(&doc, tables).with_context(|| format!("failed to encode {zip}"))?;
        let bytes = codec::to_compact_json(&compact)?;

        let path = dir.join(format!("{zip}.json"));
        fs::write(&path, &bytes).with_context(|| format!("failed to write {}", path.display()))?;

        report.documents += 1;
        report.original_bytes += original.len();
        report.compact_bytes += bytes.len();
    }
    tracing::debug!(
        state = %state.info().abbr,
        documents = report.documents,
        "compact documents written"
    );
    Ok(report)
}

/// Copy the table files next to the documents so consumers can decode them.
fn copy_tables(config: &ZipplanConfig, out: &Path) -> Result<()> {
    let dir = out.join("mappings");
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    for (source, name) in [
        (&config.codec.key_table, KEY_TABLE_FILE),
        (&config.codec.value_table, VALUE_TABLE_FILE),
    ] {
        fs::copy(source, dir.join(name))
            .with_context(|| format!("failed to copy {}", source.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use zipplan_core::build::{BuildInputs, BuildPipeline};
    use zipplan_core::codec::CompactDocument;
    use zipplan_test_utils::Fixture;

    use super::*;

    fn built_service(fixture: &Fixture) -> LookupService {
        let inputs = BuildInputs {
            landscape_csv: fixture.landscape_csv(),
            details_dir: Some(fixture.details_dir()),
            zip_mappings_dir: fixture.zip_mappings_dir(),
            states: fixture.states(),
        };
        BuildPipeline::new(inputs, fixture.store_config()).run().unwrap();
        LookupService::load(&fixture.store_config()).unwrap()
    }

    #[test]
    fn reduction_of_empty_report_is_zero() {
        assert_eq!(CompactReport::default().reduction_percent(), 0.0);
        let report = CompactReport {
            documents: 1,
            original_bytes: 200,
            compact_bytes: 50,
        };
        assert_eq!(report.reduction_percent(), 75.0);
    }

    #[test]
    fn writes_one_decodable_document_per_zip() {
        let fixture = Fixture::new();
        let service = built_service(&fixture);
        let tables = CodecTables::load(&fixture.key_table(), &fixture.value_table()).unwrap();
        let out = fixture.root().join("compact");

        let state = service.state("nh").unwrap();
        let report = compact_state(state, &tables, &out).unwrap();
        assert_eq!(report.documents, 6);
        assert!(report.compact_bytes < report.original_bytes);

        let bytes = fs::read(out.join("NH/03602.json")).unwrap();
        let compact: CompactDocument = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(compact.zip_code, "03602");
        let doc = codec::decode(&compact, &tables).unwrap();
        assert_eq!(doc.counties.len(), 2);
        assert_eq!(doc.county_plans("Cheshire").len(), 5);
    }
}
