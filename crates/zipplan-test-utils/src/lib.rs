//! Shared test utilities for zipplan integration tests.
//!
//! [`Fixture`] lays out a small but complete source dataset inside a
//! temporary directory: a landscape CSV covering New Hampshire and Vermont,
//! a sparse set of detail documents (one of them malformed), postal-code
//! mappings with single-county, multi-county, tied and cross-state codes,
//! and a pair of codec table files. Each test gets its own directory, so
//! tests are fully isolated.
//!
//! Expected shape of the New Hampshire build:
//!
//! ```text
//! statewide   H1111_001_0 H1111_002_0 H6666_001_0
//! Cheshire    + H2222_001_0 H2222_001_1          (5 plans, 2 with details)
//! Sullivan    + H3333_001_0 H6666_001_0          (5 plans, 1 with details)
//! Coos        + S4802_075_0 H2222_001_0          (5 plans, 3 with details)
//! Grafton     no valid rows, so no plan set
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use zipplan_store::config::StoreConfig;
use zipplan_store::models::StateInfo;
use zipplan_store::tables::{KEY_TABLE_FILE, VALUE_TABLE_FILE};
use zipplan_store::zip_mapping::ZIP_MAPPING_FILE;

/// Plan year used when rendering plan URLs in tests.
pub const PLAN_YEAR: u16 = 2026;

/// A plan offered only in Coos county, New Hampshire.
pub const COOS_ONLY_PLAN: &str = "S4802_075_0";

/// Header line of the landscape CSV.
pub const LANDSCAPE_HEADER: &str = "State Territory Name,County Name,ContractPlanSegmentID,ContractPlanID,Segment ID,Plan Name,Plan Type,Organization Marketing Name,Parent Organization Name,Part C Premium,Part D Total Premium,Overall Star Rating,SNP Type";

// Line numbers are 1-based with the header on line 1.
const LANDSCAPE_ROWS: &str = "\
New Hampshire,All Counties,H1111_001_0,H1111_001,0,Granite Basic (HMO),Local HMO,Granite Health,Granite Holdings,$0.00,$12.40,4.5,
New Hampshire,All Counties,H1111_002_0,H1111_002,0,Granite Plus (PPO),Local PPO,Granite Health,Granite Holdings,\"$1,035.00\",$0.00,4,
New Hampshire,Cheshire,H2222_001_0,H2222_001,0,Monadnock Choice (HMO),Local HMO,Monadnock Health,Monadnock Group,$0.00,$0.00,3.5,
New Hampshire,Cheshire,H2222_001_1,H2222_001,1,Monadnock Choice Plus (HMO),Local HMO,Monadnock Health,Monadnock Group,$20.00,$0.00,3.5,
New Hampshire,Sullivan,H3333_001_0,H3333_001,0,Sugar River Care (HMO-POS),HMO-POS,River Health,River Health Inc,$15.00,$5.00,4,
New Hampshire,Sullivan,H6666_001_0,H6666_001,0,Seacoast Saver (PPO),Local PPO,Seacoast Health,Seacoast Inc,$0.00,$0.00,Not enough data available,
New Hampshire,Coos,S4802_075_0,S4802_075,0,North Country Rx (PDP),Medicare Prescription Drug Plan,Rx Co,Rx Parent,,$30.10,3.5,
New Hampshire,Coos,H2222_001_0,H2222_001,0,Monadnock Choice (HMO),Local HMO,Monadnock Health,Monadnock Group,$0.00,$0.00,3.5,
New Hampshire,Grafton,,,,Orphan Plan (HMO),Local HMO,Orphan Health,Orphan Inc,$0.00,$0.00,3,
New Hampshire,Grafton,BADID,,,Broken Plan (HMO),Local HMO,Broken Health,Broken Inc,$0.00,$0.00,3,
New Hampshire,All Counties,H6666_001_0,H6666_001,0,Seacoast Saver (PPO),Local PPO,Seacoast Health,Seacoast Inc,$0.00,$0.00,Not enough data available,
Vermont,All Counties,H5555_001_0,H5555_001,0,Green Mountain Basic (PPO),Local PPO,Green Mountain Care,GMC Inc,$0.00,$0.00,4,
Vermont,Chittenden,H5555_002_0,H5555_002,0,Lake Champlain Care (HMO),Local HMO,Green Mountain Care,GMC Inc,$10.00,$0.00,4.5,D-SNP
New Hampshire,Coos
";

const NH_ZIPS: &str = r#"[
  {
    "zip": "03602",
    "multi_county": true,
    "county_count": 2,
    "primary_county": {"name": "Sullivan", "fips": "33019"},
    "counties": [
      {"name": "Cheshire", "fips": "33005", "percentage": 60.0},
      {"name": "Sullivan", "fips": "33019", "percentage": 40.0}
    ]
  },
  {
    "zip": "03462",
    "multi_county": false,
    "primary_county": {"name": "Cheshire", "fips": "33005"},
    "county": "Cheshire",
    "fips": "33005"
  },
  {
    "zip": "03570",
    "multi_county": false,
    "primary_county": {"name": "Coos", "fips": "33007"},
    "counties": [{"name": "Coos", "fips": "33007", "percentage": 100.0}]
  },
  {
    "zip": "03574",
    "multi_county": true,
    "primary_county": {"name": "Grafton", "fips": "33009"},
    "counties": [
      {"name": "Grafton", "fips": "33009", "percentage": 70.0},
      {"name": "Coos", "fips": "33007", "percentage": 30.0}
    ]
  },
  {
    "zip": "03750",
    "multi_county": true,
    "primary_county": {"name": "Sullivan", "fips": "33019"},
    "counties": [
      {"name": "Grafton", "fips": "33009", "percentage": 50.0},
      {"name": "Sullivan", "fips": "33019", "percentage": 50.0}
    ]
  },
  {
    "zip": "03579",
    "multi_county": true,
    "primary_county": {"name": "Coos", "fips": "33007"},
    "counties": [
      {"name": "Coos", "fips": "33007", "percentage": 80.0, "state": "NH"},
      {"name": "Oxford", "fips": "23017", "percentage": 20.0, "state": "ME"}
    ]
  }
]"#;

const VT_ZIPS: &str = r#"[
  {
    "zip": "05401",
    "multi_county": false,
    "primary_county": {"name": "Chittenden", "fips": "50007"},
    "county": "Chittenden",
    "fips": "50007"
  },
  {
    "zip": "05001",
    "multi_county": false,
    "primary_county": {"name": "Windsor", "fips": "50027"},
    "county": "Windsor",
    "fips": "50027"
  }
]"#;

const KEY_TABLE: &str = r#"{
  "mapping": {
    "summary": "sm",
    "details": "d",
    "has_details": "hd",
    "contract_plan_segment_id": "id",
    "plan_name": "nm",
    "plan_type": "ty",
    "organization": "o",
    "parent_organization": "po",
    "part_c_premium": "cp",
    "part_d_total_premium": "dp",
    "overall_star_rating": "sr",
    "snp_type": "sn",
    "county": "cn",
    "plan_info": "pi",
    "premiums": "pr",
    "contact_info": "ci",
    "benefits": "b",
    "name": "n"
  }
}"#;

const VALUE_TABLE: &str = r#"{
  "values": {"v1": "All Counties", "v2": "Not covered", "v3": "$0.00"},
  "organizations": {"o1": "Granite Health", "o2": "Monadnock Health", "o3": "Rx Co"},
  "plan_types": {"t1": "Local HMO", "t2": "Local PPO", "t3": "Medicare Prescription Drug Plan"},
  "addresses": {"a1": "PO Box 100, Concord, NH 03301"},
  "network_types": {"n1": "HMO", "n2": "PPO", "n3": "PDP", "n4": "HMO-POS"}
}"#;

/// A complete source dataset in a temporary directory.
pub struct Fixture {
    dir: TempDir,
}

impl Fixture {
    /// Create the directory and write every source file.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create fixture directory");
        let fixture = Self { dir };

        fixture.write_file(
            "source/landscape.csv",
            &format!("{LANDSCAPE_HEADER}\n{LANDSCAPE_ROWS}"),
        );

        fixture.write_file(
            "source/details/New_Hampshire-H1111_001_0.json",
            r#"{
  "plan_info": {"name": "Granite Basic (HMO)", "organization": "Granite Health"},
  "premiums": {"Monthly premium": "$0.00"},
  "contact_info": {"address": "PO Box 100, Concord, NH 03301"},
  "benefits": {"Dental": "Not covered", "Vision": "$0 copay"}
}"#,
        );
        fixture.write_file(
            "source/details/New_Hampshire-H2222_001_0.json",
            r#"{"plan_info": {"name": "Monadnock Choice (HMO)"}, "premiums": {"Monthly premium": "$0.00"}}"#,
        );
        fixture.write_file(
            "source/details/New_Hampshire-S4802_075_0.json",
            r#"{"plan_info": {"name": "North Country Rx (PDP)"}, "drug_coverage": {"Deductible": "$590.00"}}"#,
        );
        fixture.write_file(
            "source/details/New_Hampshire-H3333_001_0.json",
            "{ not json",
        );
        fixture.write_file(
            "source/details/Vermont-H5555_002_0.json",
            r#"{"plan_info": {"name": "Lake Champlain Care (HMO)"}}"#,
        );

        fixture.write_file(&format!("source/zips/NH/{ZIP_MAPPING_FILE}"), NH_ZIPS);
        fixture.write_file(&format!("source/zips/VT/{ZIP_MAPPING_FILE}"), VT_ZIPS);

        fixture.write_file(&format!("source/mappings/{KEY_TABLE_FILE}"), KEY_TABLE);
        fixture.write_file(&format!("source/mappings/{VALUE_TABLE_FILE}"), VALUE_TABLE);

        fixture
    }

    /// Root of the fixture directory.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write `contents` to `relative` under the root, creating parents.
    pub fn write_file(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .unwrap_or_else(|e| panic!("failed to create {}: {e}", parent.display()));
        }
        fs::write(&path, contents)
            .unwrap_or_else(|e| panic!("failed to write {}: {e}", path.display()));
        path
    }

    pub fn landscape_csv(&self) -> PathBuf {
        self.root().join("source/landscape.csv")
    }

    pub fn details_dir(&self) -> PathBuf {
        self.root().join("source/details")
    }

    pub fn zip_mappings_dir(&self) -> PathBuf {
        self.root().join("source/zips")
    }

    pub fn key_table(&self) -> PathBuf {
        self.root().join("source/mappings").join(KEY_TABLE_FILE)
    }

    pub fn value_table(&self) -> PathBuf {
        self.root().join("source/mappings").join(VALUE_TABLE_FILE)
    }

    /// Data directory for snapshots (not created until a build runs).
    pub fn data_dir(&self) -> PathBuf {
        self.root().join("data")
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::new(self.data_dir())
    }

    /// The states covered by the dataset.
    pub fn states(&self) -> Vec<StateInfo> {
        vec![nh(), vt()]
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

pub fn nh() -> StateInfo {
    StateInfo::new("NH", "New Hampshire")
}

pub fn vt() -> StateInfo {
    StateInfo::new("VT", "Vermont")
}
