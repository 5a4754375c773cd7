//! Reader for the raw postal-code-to-county mapping of one state.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::models::StateInfo;

/// File name of a state's mapping inside its `<ABBR>/` directory.
pub const ZIP_MAPPING_FILE: &str = "zip_to_county_multi.json";

/// County reference inside a raw mapping entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCounty {
    pub name: String,
    #[serde(default)]
    pub fips: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// The declared primary county of a raw entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPrimaryCounty {
    pub name: String,
    #[serde(default)]
    pub fips: String,
}

/// One postal code as delivered by the mapping source.
///
/// Single-county entries may omit `counties` and carry `county`/`fips`
/// directly; [`RawZipEntry::county_list`] covers both shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawZipEntry {
    pub zip: String,
    #[serde(default)]
    pub multi_county: bool,
    pub primary_county: RawPrimaryCounty,
    #[serde(default)]
    pub counties: Vec<RawCounty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub county: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fips: Option<String>,
}

impl RawZipEntry {
    /// The entry's counties, expanding the single-county shorthand.
    pub fn county_list(&self) -> Vec<RawCounty> {
        if !self.counties.is_empty() {
            return self.counties.clone();
        }
        let name = self
            .county
            .clone()
            .unwrap_or_else(|| self.primary_county.name.clone());
        let fips = self
            .fips
            .clone()
            .unwrap_or_else(|| self.primary_county.fips.clone());
        vec![RawCounty {
            name,
            fips,
            percentage: None,
            state: None,
        }]
    }
}

/// Path of `state`'s mapping file under `mappings_dir`.
pub fn zip_mapping_path(mappings_dir: &Path, state: &StateInfo) -> std::path::PathBuf {
    mappings_dir.join(&state.abbr).join(ZIP_MAPPING_FILE)
}

/// Read and decode a raw mapping file.
pub fn read_zip_mapping(path: &Path) -> Result<Vec<RawZipEntry>> {
    let contents = fs::read(path).map_err(|e| StoreError::read(path, e))?;
    serde_json::from_slice(&contents).map_err(|e| StoreError::json(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_county_entry_decodes() {
        let json = r#"[{
            "zip": "03602",
            "multi_county": true,
            "county_count": 2,
            "primary_county": {"name": "Cheshire", "fips": "33005"},
            "counties": [
                {"name": "Cheshire", "fips": "33005", "percentage": 60.0},
                {"name": "Sullivan", "fips": "33019", "percentage": 40.0}
            ]
        }]"#;
        let entries: Vec<RawZipEntry> = serde_json::from_str(json).unwrap();
        assert_eq!(entries[0].county_list().len(), 2);
        assert_eq!(entries[0].county_list()[1].percentage, Some(40.0));
    }

    #[test]
    fn single_county_shorthand_expands() {
        let json = r#"{
            "zip": "03462",
            "multi_county": false,
            "primary_county": {"name": "Cheshire", "fips": "33005"},
            "county": "Cheshire",
            "fips": "33005"
        }"#;
        let entry: RawZipEntry = serde_json::from_str(json).unwrap();
        let counties = entry.county_list();
        assert_eq!(counties.len(), 1);
        assert_eq!(counties[0].name, "Cheshire");
        assert_eq!(counties[0].fips, "33005");
        assert_eq!(counties[0].percentage, None);
    }

    #[test]
    fn unreadable_file_reports_path() {
        let err = read_zip_mapping(Path::new("/nonexistent/zips.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/zips.json"));
    }
}
