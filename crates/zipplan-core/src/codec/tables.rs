//! Validated lookup tables for the compaction codec.
//!
//! Content tables are checked when they are built: a value may appear only
//! once per table, and a code may belong to only one table. Substitution
//! itself never has to deal with collisions.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;

use thiserror::Error;

use zipplan_store::StoreError;
use zipplan_store::tables::{RawKeyTable, RawValueTables, read_key_table, read_value_tables};

/// Short key reserved for the derived network type of a plan.
pub const NETWORK_TYPE_KEY: &str = "pt";

/// The content tables, by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Values,
    Organizations,
    PlanTypes,
    Addresses,
    NetworkTypes,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Values => "values",
            Self::Organizations => "organizations",
            Self::PlanTypes => "plan_types",
            Self::Addresses => "addresses",
            Self::NetworkTypes => "network_types",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order in which string leaves are matched against the content tables.
/// The first table containing the value supplies its code.
pub const SUBSTITUTION_ORDER: [ContentKind; 4] = [
    ContentKind::Values,
    ContentKind::Organizations,
    ContentKind::PlanTypes,
    ContentKind::Addresses,
];

/// Errors found while building the tables.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("table {table}: value {value:?} is mapped by both {first:?} and {second:?}")]
    DuplicateValue {
        table: ContentKind,
        value: String,
        first: String,
        second: String,
    },

    #[error("code {code:?} is used by both the {first} and {second} tables")]
    SharedCode {
        code: String,
        first: ContentKind,
        second: ContentKind,
    },

    #[error("short key {short:?} is used for both {first:?} and {second:?}")]
    DuplicateShortKey {
        short: String,
        first: String,
        second: String,
    },

    #[error("field {field:?} maps to the reserved short key \"pt\"")]
    ReservedShortKey { field: String },

    #[error("failed to read codec table: {0}")]
    Read(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

/// A bijective code/value table.
#[derive(Debug, Clone)]
pub struct ValueTable {
    kind: ContentKind,
    by_code: BTreeMap<String, String>,
    by_value: HashMap<String, String>,
}

impl ValueTable {
    fn build(kind: ContentKind, by_code: BTreeMap<String, String>) -> Result<Self, TableError> {
        let mut by_value: HashMap<String, String> = HashMap::with_capacity(by_code.len());
        for (code, value) in &by_code {
            if let Some(first) = by_value.insert(value.clone(), code.clone()) {
                return Err(TableError::DuplicateValue {
                    table: kind,
                    value: value.clone(),
                    first,
                    second: code.clone(),
                });
            }
        }
        Ok(Self {
            kind,
            by_code,
            by_value,
        })
    }

    pub fn kind(&self) -> ContentKind {
        self.kind
    }

    pub fn code_for(&self, value: &str) -> Option<&str> {
        self.by_value.get(value).map(String::as_str)
    }

    pub fn value_for(&self, code: &str) -> Option<&str> {
        self.by_code.get(code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}

/// Field-name table, usable in both directions.
#[derive(Debug, Clone, Default)]
pub struct KeyTable {
    to_short: HashMap<String, String>,
    to_long: HashMap<String, String>,
}

impl KeyTable {
    fn build(mapping: BTreeMap<String, String>) -> Result<Self, TableError> {
        let mut table = Self::default();
        for (long, short) in mapping {
            if short == NETWORK_TYPE_KEY {
                return Err(TableError::ReservedShortKey { field: long });
            }
            if let Some(first) = table.to_long.insert(short.clone(), long.clone()) {
                return Err(TableError::DuplicateShortKey {
                    short,
                    first,
                    second: long,
                });
            }
            table.to_short.insert(long, short);
        }
        Ok(table)
    }

    /// Whether `key` is a long field name the table shortens.
    pub fn is_mapped(&self, key: &str) -> bool {
        self.to_short.contains_key(key)
    }

    /// Whether `key` is one of the table's short forms.
    pub fn is_short_key(&self, key: &str) -> bool {
        self.to_long.contains_key(key)
    }

    /// Short form of `key`, or `key` itself when the table does not know it.
    pub fn shorten<'k>(&'k self, key: &'k str) -> &'k str {
        self.to_short.get(key).map_or(key, String::as_str)
    }

    /// Long form of `short`, or `short` itself when the table does not know it.
    pub fn expand<'k>(&'k self, short: &'k str) -> &'k str {
        self.to_long.get(short).map_or(short, String::as_str)
    }

    pub fn len(&self) -> usize {
        self.to_short.len()
    }

    pub fn is_empty(&self) -> bool {
        self.to_short.is_empty()
    }
}

/// Every table the codec needs, validated.
#[derive(Debug, Clone)]
pub struct CodecTables {
    keys: KeyTable,
    /// Content tables in [`SUBSTITUTION_ORDER`].
    content: Vec<ValueTable>,
    network_types: ValueTable,
}

impl CodecTables {
    /// Validate raw tables.
    pub fn from_raw(keys: RawKeyTable, values: RawValueTables) -> Result<Self, TableError> {
        let keys = KeyTable::build(keys.mapping)?;

        let RawValueTables {
            values,
            organizations,
            plan_types,
            addresses,
            network_types,
        } = values;
        let content = vec![
            ValueTable::build(ContentKind::Values, values)?,
            ValueTable::build(ContentKind::Organizations, organizations)?,
            ValueTable::build(ContentKind::PlanTypes, plan_types)?,
            ValueTable::build(ContentKind::Addresses, addresses)?,
        ];
        let network_types = ValueTable::build(ContentKind::NetworkTypes, network_types)?;

        // A code must identify exactly one value across all tables.
        let mut owners: HashMap<&str, ContentKind> = HashMap::new();
        for table in content.iter().chain(std::iter::once(&network_types)) {
            for code in table.by_code.keys() {
                if let Some(first) = owners.insert(code.as_str(), table.kind) {
                    return Err(TableError::SharedCode {
                        code: code.clone(),
                        first,
                        second: table.kind,
                    });
                }
            }
        }

        Ok(Self {
            keys,
            content,
            network_types,
        })
    }

    /// Read and validate the two table files.
    pub fn load(key_table: &Path, value_table: &Path) -> Result<Self, TableError> {
        let keys = read_key_table(key_table)?;
        let values = read_value_tables(value_table)?;
        Self::from_raw(keys, values)
    }

    pub fn keys(&self) -> &KeyTable {
        &self.keys
    }

    pub fn network_types(&self) -> &ValueTable {
        &self.network_types
    }

    /// Content tables in substitution order.
    pub fn content(&self) -> &[ValueTable] {
        &self.content
    }

    /// Code for `value` from the first table that maps it.
    pub fn compress_value<'v>(&'v self, value: &'v str) -> &'v str {
        self.content
            .iter()
            .find_map(|table| table.code_for(value))
            .unwrap_or(value)
    }

    /// Value for `code` if any content table defines it.
    pub fn expand_value<'v>(&'v self, code: &'v str) -> &'v str {
        self.content
            .iter()
            .find_map(|table| table.value_for(code))
            .unwrap_or(code)
    }
}
