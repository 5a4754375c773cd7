//! Reader for the plan landscape CSV (one row per plan/county eligibility).
//!
//! Rows that cannot be decoded are reported as [`RowIssue`]s and skipped;
//! only an unreadable file or a missing key column fails the read.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{Result, StoreError};

/// Columns without which no row can be placed.
pub const REQUIRED_COLUMNS: [&str; 3] = [
    "State Territory Name",
    "County Name",
    "ContractPlanSegmentID",
];

/// One landscape row, restricted to the columns the build consumes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LandscapeRow {
    #[serde(rename = "State Territory Name")]
    pub state_name: String,
    #[serde(rename = "County Name", default)]
    pub county: String,
    #[serde(rename = "ContractPlanSegmentID", default)]
    pub plan_id: String,
    #[serde(rename = "ContractPlanID", default)]
    pub contract_plan_id: String,
    #[serde(rename = "Segment ID", default)]
    pub segment_id: String,
    #[serde(rename = "Plan Name", default)]
    pub plan_name: String,
    #[serde(rename = "Plan Type", default)]
    pub plan_type: String,
    #[serde(rename = "Organization Marketing Name", default)]
    pub organization: String,
    #[serde(rename = "Parent Organization Name", default)]
    pub parent_organization: String,
    #[serde(rename = "Part C Premium", default)]
    pub part_c_premium: String,
    #[serde(rename = "Part D Total Premium", default)]
    pub part_d_total_premium: String,
    #[serde(rename = "Overall Star Rating", default)]
    pub overall_star_rating: String,
    #[serde(rename = "SNP Type", default)]
    pub snp_type: String,
}

/// A decoded row and the 1-based line it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LandscapeRecord {
    pub line: u64,
    pub row: LandscapeRow,
}

/// A row that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowIssue {
    pub line: u64,
    pub message: String,
}

/// The decoded landscape file.
#[derive(Debug, Clone, Default)]
pub struct LandscapeTable {
    pub records: Vec<LandscapeRecord>,
    pub issues: Vec<RowIssue>,
}

impl LandscapeTable {
    /// Rows whose state column equals `state_name`, in file order.
    pub fn for_state<'a>(
        &'a self,
        state_name: &'a str,
    ) -> impl Iterator<Item = &'a LandscapeRecord> + 'a {
        self.records
            .iter()
            .filter(move |r| r.row.state_name == state_name)
    }
}

/// Open and decode the landscape CSV at `path`.
pub fn read_landscape(path: &Path) -> Result<LandscapeTable> {
    let file = File::open(path).map_err(|e| StoreError::read(path, e))?;
    read_landscape_from(file, path)
}

/// Decode landscape CSV from any reader. `path` is used for error messages.
pub fn read_landscape_from<R: Read>(source: R, path: &Path) -> Result<LandscapeTable> {
    let csv_err = |source: csv::Error| StoreError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = reader.headers().map_err(csv_err)?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(StoreError::MissingColumn {
                path: path.to_path_buf(),
                column,
            });
        }
    }

    let mut table = LandscapeTable::default();
    let mut record = csv::StringRecord::new();
    loop {
        match reader.read_record(&mut record) {
            Ok(false) => break,
            Ok(true) => {
                let line = record.position().map(|p| p.line()).unwrap_or_default();
                match record.deserialize::<LandscapeRow>(Some(&headers)) {
                    Ok(row) => table.records.push(LandscapeRecord { line, row }),
                    Err(e) => table.issues.push(RowIssue {
                        line,
                        message: e.to_string(),
                    }),
                }
            }
            Err(e) if e.is_io_error() => return Err(csv_err(e)),
            Err(e) => {
                let line = e.position().map(|p| p.line()).unwrap_or_default();
                table.issues.push(RowIssue {
                    line,
                    message: e.to_string(),
                });
            }
        }
    }

    debug!(
        path = %path.display(),
        rows = table.records.len(),
        issues = table.issues.len(),
        "landscape file decoded"
    );
    Ok(table)
}
