use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// County name the landscape file uses for rows that apply to every county
/// in a state.
pub const ALL_COUNTIES: &str = "All Counties";

// ---------------------------------------------------------------------------
// Composite plan identifier
// ---------------------------------------------------------------------------

/// Composite plan identifier: contract id + plan number + segment id.
///
/// Rendered as `H1234_001_0`. Serialized as that string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlanId {
    contract: String,
    plan: String,
    segment: String,
}

impl PlanId {
    /// Build an identifier from its three components.
    pub fn new(
        contract: impl Into<String>,
        plan: impl Into<String>,
        segment: impl Into<String>,
    ) -> Self {
        Self {
            contract: contract.into(),
            plan: plan.into(),
            segment: segment.into(),
        }
    }

    pub fn contract_id(&self) -> &str {
        &self.contract
    }

    pub fn plan_number(&self) -> &str {
        &self.plan
    }

    pub fn segment_id(&self) -> &str {
        &self.segment
    }

    /// Contract + plan number without the segment, e.g. `H1234_001`.
    pub fn contract_plan_id(&self) -> String {
        format!("{}_{}", self.contract, self.plan)
    }

    /// Public plan-compare URL for this offering in the given plan year.
    pub fn plan_url(&self, year: u16) -> String {
        format!(
            "https://www.medicare.gov/plan-compare/#/plan-details/{year}-{}-{}-{}?year={year}&lang=en",
            self.contract, self.plan, self.segment
        )
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.contract, self.plan, self.segment)
    }
}

impl FromStr for PlanId {
    type Err = PlanIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut parts = trimmed.split('_');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(contract), Some(plan), Some(segment), None)
                if [contract, plan, segment]
                    .iter()
                    .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_alphanumeric())) =>
            {
                Ok(Self::new(contract, plan, segment))
            }
            _ => Err(PlanIdParseError(s.to_owned())),
        }
    }
}

impl TryFrom<String> for PlanId {
    type Error = PlanIdParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PlanId> for String {
    fn from(id: PlanId) -> Self {
        id.to_string()
    }
}

/// Error returned when parsing an invalid [`PlanId`] string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanIdParseError(pub String);

impl fmt::Display for PlanIdParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid composite plan id: {:?}", self.0)
    }
}

impl std::error::Error for PlanIdParseError {}

// ---------------------------------------------------------------------------
// Scope
// ---------------------------------------------------------------------------

/// Where a landscape row applies: every county of the state, or one county.
///
/// Serialized as the county name, with [`ALL_COUNTIES`] for statewide rows.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PlanScope {
    Statewide,
    County(String),
}

impl PlanScope {
    pub fn is_statewide(&self) -> bool {
        matches!(self, Self::Statewide)
    }

    pub fn county(&self) -> Option<&str> {
        match self {
            Self::Statewide => None,
            Self::County(name) => Some(name),
        }
    }
}

impl fmt::Display for PlanScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Statewide => f.write_str(ALL_COUNTIES),
            Self::County(name) => f.write_str(name),
        }
    }
}

impl From<String> for PlanScope {
    fn from(value: String) -> Self {
        if value == ALL_COUNTIES {
            Self::Statewide
        } else {
            Self::County(value)
        }
    }
}

impl From<PlanScope> for String {
    fn from(scope: PlanScope) -> Self {
        scope.to_string()
    }
}

// ---------------------------------------------------------------------------
// Plan records
// ---------------------------------------------------------------------------

/// Tabular facts about one plan offering, as seen on a single landscape row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub contract_plan_segment_id: PlanId,
    pub plan_name: String,
    pub plan_type: String,
    pub organization: String,
    pub parent_organization: String,
    pub part_c_premium: Option<f64>,
    pub part_d_total_premium: Option<f64>,
    pub overall_star_rating: Option<f64>,
    pub snp_type: Option<String>,
    #[serde(rename = "county")]
    pub scope: PlanScope,
}

/// Label-to-value mapping within a detail document section.
pub type DetailSection = BTreeMap<String, serde_json::Value>;

/// Harvested detail document for one plan. Every section is optional;
/// unrecognized top-level entries are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailDocument {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub plan_info: DetailSection,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub premiums: DetailSection,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub deductibles: DetailSection,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub maximum_out_of_pocket: DetailSection,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub contact_info: DetailSection,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub benefits: DetailSection,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub drug_coverage: DetailSection,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_benefits: DetailSection,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A plan offering as stored in a county plan set:
/// `{summary, details, has_details}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRecord {
    pub summary: PlanSummary,
    pub details: Option<DetailDocument>,
    pub has_details: bool,
}

impl PlanRecord {
    /// Wrap a summary, setting `has_details` from the presence of `details`.
    pub fn new(summary: PlanSummary, details: Option<DetailDocument>) -> Self {
        let has_details = details.is_some();
        Self {
            summary,
            details,
            has_details,
        }
    }

    pub fn id(&self) -> &PlanId {
        &self.summary.contract_plan_segment_id
    }
}

// ---------------------------------------------------------------------------
// County plan sets
// ---------------------------------------------------------------------------

/// Plans visible in one county: statewide plans first, then the county's own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountyPlanSet {
    pub state: String,
    pub state_abbr: String,
    pub county: String,
    pub plan_count: usize,
    pub all_counties_plan_count: usize,
    pub county_specific_plan_count: usize,
    pub details_available_count: usize,
    pub plans: Vec<PlanRecord>,
}

impl CountyPlanSet {
    /// Check the count breakdown against itself and the plan list.
    pub fn counts_consistent(&self) -> bool {
        self.plan_count == self.all_counties_plan_count + self.county_specific_plan_count
            && self.plan_count == self.plans.len()
            && self.details_available_count == self.plans.iter().filter(|p| p.has_details).count()
    }
}

// ---------------------------------------------------------------------------
// Postal codes
// ---------------------------------------------------------------------------

/// One county touched by a postal code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountyCoverage {
    pub name: String,
    pub fips: String,
    /// Share of the postal code inside this county, in percent.
    #[serde(rename = "percentage", default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Size of the county's plan set at build time (0 if it has none).
    #[serde(default)]
    pub plan_count: usize,
}

/// A postal code and the counties it straddles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZipEntry {
    pub zip: String,
    pub multi_county: bool,
    pub primary_county: String,
    pub counties: Vec<CountyCoverage>,
}

// ---------------------------------------------------------------------------
// States
// ---------------------------------------------------------------------------

/// A state or territory handled by the build.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StateInfo {
    /// Postal abbreviation, e.g. `NH`.
    pub abbr: String,
    /// Name as written in the landscape file, e.g. `New Hampshire`.
    pub name: String,
}

impl StateInfo {
    pub fn new(abbr: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            abbr: abbr.into().to_ascii_uppercase(),
            name: name.into(),
        }
    }

    /// Lookup key: the lowercase abbreviation.
    pub fn key(&self) -> String {
        self.abbr.to_ascii_lowercase()
    }

    /// Prefix used in detail document file names (`New_Hampshire`).
    pub fn file_prefix(&self) -> String {
        self.name.replace(' ', "_")
    }

    /// States built when the configuration does not name any.
    pub fn default_states() -> Vec<StateInfo> {
        vec![
            Self::new("AK", "Alaska"),
            Self::new("NH", "New Hampshire"),
            Self::new("VT", "Vermont"),
            Self::new("WY", "Wyoming"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_id_parses_components() {
        let id: PlanId = "S4802_075_0".parse().unwrap();
        assert_eq!(id.contract_id(), "S4802");
        assert_eq!(id.plan_number(), "075");
        assert_eq!(id.segment_id(), "0");
        assert_eq!(id.contract_plan_id(), "S4802_075");
        assert_eq!(id.to_string(), "S4802_075_0");
    }

    #[test]
    fn plan_id_rejects_malformed() {
        for bad in ["", "H1234", "H1234_001", "H1234_001_0_1", "H1234__0", "H12 4_001_0"] {
            assert!(
                bad.parse::<PlanId>().is_err(),
                "expected {bad:?} to be rejected"
            );
        }
    }

    #[test]
    fn plan_id_serializes_as_string() {
        let id = PlanId::new("H1234", "001", "0");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"H1234_001_0\"");
        let back: PlanId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn plan_url_uses_dashes() {
        let id = PlanId::new("H5521", "296", "0");
        assert_eq!(
            id.plan_url(2026),
            "https://www.medicare.gov/plan-compare/#/plan-details/2026-H5521-296-0?year=2026&lang=en"
        );
    }

    #[test]
    fn scope_round_trips_through_sentinel() {
        assert_eq!(PlanScope::from(ALL_COUNTIES.to_string()), PlanScope::Statewide);
        assert_eq!(
            PlanScope::from("Coos".to_string()),
            PlanScope::County("Coos".into())
        );
        assert_eq!(String::from(PlanScope::Statewide), ALL_COUNTIES);
        assert_eq!(PlanScope::County("Coos".into()).county(), Some("Coos"));
    }

    #[test]
    fn state_info_keys() {
        let nh = StateInfo::new("nh", "New Hampshire");
        assert_eq!(nh.abbr, "NH");
        assert_eq!(nh.key(), "nh");
        assert_eq!(nh.file_prefix(), "New_Hampshire");
    }

    #[test]
    fn detail_document_keeps_unknown_sections() {
        let json = serde_json::json!({
            "plan_info": {"name": "Granite Advantage (HMO)"},
            "plan_id": "H1234_001_0"
        });
        let doc: DetailDocument = serde_json::from_value(json).unwrap();
        assert_eq!(doc.plan_info["name"], "Granite Advantage (HMO)");
        assert_eq!(doc.extra["plan_id"], "H1234_001_0");
        assert!(doc.benefits.is_empty());
    }

    #[test]
    fn counts_consistent_detects_mismatch() {
        let set = CountyPlanSet {
            state: "New Hampshire".into(),
            state_abbr: "NH".into(),
            county: "Coos".into(),
            plan_count: 1,
            all_counties_plan_count: 1,
            county_specific_plan_count: 1,
            details_available_count: 0,
            plans: vec![],
        };
        assert!(!set.counts_consistent());
    }
}
