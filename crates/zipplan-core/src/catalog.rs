//! Canonical plan records built from the landscape table.
//!
//! A [`PlanCatalog`] wraps one decoded landscape file and builds a
//! [`StateCatalog`] per state: the statewide plan list, the county-specific
//! lists, and one [`CanonicalPlan`] per composite id. Bad rows never abort
//! the build; they are recorded as [`DataIntegrityWarning`]s.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;

use tracing::debug;

use zipplan_store::details::DetailIndex;
use zipplan_store::landscape::{LandscapeRow, LandscapeTable};
use zipplan_store::models::{PlanId, PlanRecord, PlanScope, PlanSummary, StateInfo};

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Why a source record was skipped or degraded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarningReason {
    /// The composite id column is empty.
    MissingPlanId,
    /// The composite id column does not parse.
    MalformedPlanId(String),
    /// The row could not be decoded at all.
    MalformedRow(String),
    /// A detail document exists but could not be used.
    MalformedDetailDocument(PathBuf),
}

/// A non-fatal problem found in the source data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataIntegrityWarning {
    /// 1-based landscape line, when the problem is tied to a row.
    pub line: Option<u64>,
    pub reason: WarningReason,
}

impl DataIntegrityWarning {
    /// Whether the warning caused a landscape row to be dropped.
    pub fn skips_row(&self) -> bool {
        !matches!(self.reason, WarningReason::MalformedDetailDocument(_))
    }
}

impl fmt::Display for DataIntegrityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(line) = self.line {
            write!(f, "line {line}: ")?;
        }
        match &self.reason {
            WarningReason::MissingPlanId => f.write_str("row has no plan id"),
            WarningReason::MalformedPlanId(value) => write!(f, "malformed plan id {value:?}"),
            WarningReason::MalformedRow(message) => write!(f, "malformed row: {message}"),
            WarningReason::MalformedDetailDocument(path) => {
                write!(f, "unusable detail document {}", path.display())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Canonical plans
// ---------------------------------------------------------------------------

/// One composite id as seen across every row of a state.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalPlan {
    /// Summary taken from the first row seen for this id.
    pub summary: PlanSummary,
    /// True when any row for this id is statewide, whatever the row order.
    pub all_counties: bool,
    /// Counties with a county-specific row for this id.
    pub counties: BTreeSet<String>,
    pub has_details: bool,
}

impl CanonicalPlan {
    pub fn id(&self) -> &PlanId {
        &self.summary.contract_plan_segment_id
    }

    pub fn plan_url(&self, year: u16) -> String {
        self.id().plan_url(year)
    }
}

// ---------------------------------------------------------------------------
// State catalog
// ---------------------------------------------------------------------------

/// Plans of one state, split into the statewide list and per-county lists.
#[derive(Debug, Clone)]
pub struct StateCatalog {
    pub state: StateInfo,
    /// Plans from statewide rows, in first-seen order, one entry per id.
    pub statewide: Vec<PlanRecord>,
    /// Plans from county-specific rows, keyed by county name.
    pub by_county: BTreeMap<String, Vec<PlanRecord>>,
    pub warnings: Vec<DataIntegrityWarning>,
    /// Landscape rows belonging to this state, including skipped ones.
    pub rows_read: usize,
    canonical: Vec<CanonicalPlan>,
    canonical_index: HashMap<PlanId, usize>,
}

impl StateCatalog {
    /// One entry per composite id, in first-seen order.
    pub fn canonical_plans(&self) -> &[CanonicalPlan] {
        &self.canonical
    }

    pub fn canonical(&self, id: &PlanId) -> Option<&CanonicalPlan> {
        self.canonical_index.get(id).map(|&idx| &self.canonical[idx])
    }

    /// Number of landscape rows dropped for this state.
    pub fn skipped_rows(&self) -> usize {
        self.warnings.iter().filter(|w| w.skips_row()).count()
    }
}

// ---------------------------------------------------------------------------
// Catalog builder
// ---------------------------------------------------------------------------

/// Builds per-state catalogs from a decoded landscape file.
#[derive(Debug, Clone, Copy)]
pub struct PlanCatalog<'a> {
    table: &'a LandscapeTable,
}

impl<'a> PlanCatalog<'a> {
    pub fn new(table: &'a LandscapeTable) -> Self {
        Self { table }
    }

    /// Warnings for rows that could not be decoded. Such rows cannot be
    /// attributed to a state.
    pub fn file_warnings(&self) -> Vec<DataIntegrityWarning> {
        self.table
            .issues
            .iter()
            .map(|issue| DataIntegrityWarning {
                line: Some(issue.line),
                reason: WarningReason::MalformedRow(issue.message.clone()),
            })
            .collect()
    }

    /// Build the catalog for `state`, attaching documents from `details`.
    pub fn build(&self, state: &StateInfo, details: &DetailIndex) -> StateCatalog {
        let mut catalog = StateCatalog {
            state: state.clone(),
            statewide: Vec::new(),
            by_county: BTreeMap::new(),
            warnings: Vec::new(),
            rows_read: 0,
            canonical: Vec::new(),
            canonical_index: HashMap::new(),
        };
        let mut statewide_seen: HashSet<PlanId> = HashSet::new();
        let mut county_seen: HashSet<(String, PlanId)> = HashSet::new();

        for record in self.table.for_state(&state.name) {
            catalog.rows_read += 1;
            let row = &record.row;

            let id = match parse_row_id(row) {
                Ok(id) => id,
                Err(reason) => {
                    catalog.warnings.push(DataIntegrityWarning {
                        line: Some(record.line),
                        reason,
                    });
                    continue;
                }
            };

            let scope = PlanScope::from(row.county.clone());
            let summary = summary_from_row(row, id.clone(), scope.clone());
            let document = details.get(&id).cloned();

            // Canonical record: first summary wins, flags accumulate.
            let idx = *catalog.canonical_index.entry(id.clone()).or_insert_with(|| {
                catalog.canonical.push(CanonicalPlan {
                    summary: summary.clone(),
                    all_counties: false,
                    counties: BTreeSet::new(),
                    has_details: document.is_some(),
                });
                catalog.canonical.len() - 1
            });
            let canonical = &mut catalog.canonical[idx];

            match scope {
                PlanScope::Statewide => {
                    canonical.all_counties = true;
                    if statewide_seen.insert(id) {
                        catalog.statewide.push(PlanRecord::new(summary, document));
                    }
                }
                PlanScope::County(county) => {
                    canonical.counties.insert(county.clone());
                    if county_seen.insert((county.clone(), id)) {
                        catalog
                            .by_county
                            .entry(county)
                            .or_default()
                            .push(PlanRecord::new(summary, document));
                    }
                }
            }
        }

        catalog
            .warnings
            .extend(details.rejected.iter().map(|path| DataIntegrityWarning {
                line: None,
                reason: WarningReason::MalformedDetailDocument(path.clone()),
            }));

        debug!(
            state = %state.abbr,
            rows = catalog.rows_read,
            statewide = catalog.statewide.len(),
            counties = catalog.by_county.len(),
            plans = catalog.canonical.len(),
            warnings = catalog.warnings.len(),
            "plan catalog built"
        );
        catalog
    }
}

fn parse_row_id(row: &LandscapeRow) -> Result<PlanId, WarningReason> {
    if row.plan_id.is_empty() {
        return Err(WarningReason::MissingPlanId);
    }
    row.plan_id
        .parse()
        .map_err(|_| WarningReason::MalformedPlanId(row.plan_id.clone()))
}

fn summary_from_row(row: &LandscapeRow, id: PlanId, scope: PlanScope) -> PlanSummary {
    PlanSummary {
        contract_plan_segment_id: id,
        plan_name: row.plan_name.clone(),
        plan_type: row.plan_type.clone(),
        organization: row.organization.clone(),
        parent_organization: row.parent_organization.clone(),
        part_c_premium: parse_amount(&row.part_c_premium),
        part_d_total_premium: parse_amount(&row.part_d_total_premium),
        overall_star_rating: parse_amount(&row.overall_star_rating),
        snp_type: non_empty(&row.snp_type),
        scope,
    }
}

/// Parse a figure such as `$1,035.00` or `4.5`. Anything that is not a
/// number (blank, `Not enough data available`) is `None`.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != '$' && *c != ',')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}
