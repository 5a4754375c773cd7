//! On-disk form of the compaction lookup tables.
//!
//! `key_mapping.json` holds `{"mapping": {long_key: short_key}}`.
//! `value_mapping.json` holds one `{code: value}` object per content table.
//! Validation (uniqueness, reserved keys) is done by the codec when the
//! tables are built, not here.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

pub const KEY_TABLE_FILE: &str = "key_mapping.json";
pub const VALUE_TABLE_FILE: &str = "value_mapping.json";

/// Field-name table as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawKeyTable {
    pub mapping: BTreeMap<String, String>,
}

/// Content tables as stored on disk, each mapping short code to full value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawValueTables {
    #[serde(default)]
    pub values: BTreeMap<String, String>,
    #[serde(default)]
    pub organizations: BTreeMap<String, String>,
    #[serde(default)]
    pub plan_types: BTreeMap<String, String>,
    #[serde(default)]
    pub addresses: BTreeMap<String, String>,
    #[serde(default)]
    pub network_types: BTreeMap<String, String>,
}

pub fn read_key_table(path: &Path) -> Result<RawKeyTable> {
    read_json(path)
}

pub fn read_value_tables(path: &Path) -> Result<RawValueTables> {
    read_json(path)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = fs::read(path).map_err(|e| StoreError::read(path, e))?;
    serde_json::from_slice(&contents).map_err(|e| StoreError::json(path, e))
}
