//! Table-driven compaction of resolved postal-code documents.
//!
//! Encoding renames the document's structural fields to fixed short codes,
//! rewrites every field name inside plan objects through the key table and
//! every string leaf through the content tables (in [`SUBSTITUTION_ORDER`]),
//! and adds the plan's network type under `pt` when its name ends in a
//! recognized parenthetical. Decoding reverses all of it and drops `pt`,
//! which is derived from the plan name.
//!
//! Round trips are exact for documents whose strings are either mapped by a
//! table or unknown to every table (neither a value nor a code). Field names
//! are stricter: encoding fails when an unmapped name is itself a short key
//! (or `pt`). Short keys are unique, so that is the only way two names of one
//! object could shorten to the same key.

pub mod document;
pub mod tables;

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

pub use document::{CompactCounty, CompactDocument, DocumentCounty, ZipDocument};
pub use tables::{CodecTables, ContentKind, NETWORK_TYPE_KEY, SUBSTITUTION_ORDER, TableError};

/// Trailing parenthetical of a plan name, e.g. `(HMO-POS)`.
static NETWORK_TYPE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(([^)]+)\)\s*$").expect("network type regex is valid")
});

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to serialize plan {index}: {source}")]
    Serialize {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("plan {index}: unmapped field {key:?} is also a short key")]
    AmbiguousKey { index: usize, key: String },

    #[error("compact plan {index} does not decode to a plan record: {source}")]
    MalformedPlan {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Network-type token at the end of `plan_name`, if any.
pub fn network_type_suffix(plan_name: &str) -> Option<&str> {
    NETWORK_TYPE_PATTERN
        .captures(plan_name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Rewrite `doc` into its compact form.
pub fn encode(doc: &ZipDocument, tables: &CodecTables) -> Result<CompactDocument, CodecError> {
    let mut plans = Vec::with_capacity(doc.plans.len());
    for (index, plan) in doc.plans.iter().enumerate() {
        let value =
            serde_json::to_value(plan).map_err(|source| CodecError::Serialize { index, source })?;
        let mut minified = compress(value, tables, index)?;

        let network_code = network_type_suffix(&plan.summary.plan_name)
            .and_then(|suffix| tables.network_types().code_for(suffix));
        if let (Some(code), Value::Object(object)) = (network_code, &mut minified) {
            object.insert(NETWORK_TYPE_KEY.to_owned(), Value::String(code.to_owned()));
        }
        plans.push(minified);
    }

    Ok(CompactDocument {
        zip_code: doc.zip_code.clone(),
        multi_county: doc.multi_county,
        multi_state: doc.multi_state,
        states: doc.states.clone(),
        primary_state: doc.primary_state.clone(),
        counties: doc.counties.iter().map(CompactCounty::from).collect(),
        plans,
        plan_count: doc.plan_count,
    })
}

/// Restore the document `compact` was encoded from.
pub fn decode(compact: &CompactDocument, tables: &CodecTables) -> Result<ZipDocument, CodecError> {
    let mut plans = Vec::with_capacity(compact.plans.len());
    for (index, plan) in compact.plans.iter().enumerate() {
        let mut plan = plan.clone();
        if let Value::Object(object) = &mut plan {
            object.remove(NETWORK_TYPE_KEY);
        }
        let expanded = expand(plan, tables);
        let record = serde_json::from_value(expanded)
            .map_err(|source| CodecError::MalformedPlan { index, source })?;
        plans.push(record);
    }

    Ok(ZipDocument {
        zip_code: compact.zip_code.clone(),
        multi_county: compact.multi_county,
        multi_state: compact.multi_state,
        states: compact.states.clone(),
        primary_state: compact.primary_state.clone(),
        counties: compact.counties.iter().map(DocumentCounty::from).collect(),
        plans,
        plan_count: compact.plan_count,
    })
}

/// Serialize a compact document without whitespace.
pub fn to_compact_json(compact: &CompactDocument) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(compact)
}

fn compress(value: Value, tables: &CodecTables, index: usize) -> Result<Value, CodecError> {
    match value {
        Value::Object(object) => {
            let keys = tables.keys();
            let mut minified = Map::with_capacity(object.len());
            for (key, value) in object {
                if !keys.is_mapped(&key) && (keys.is_short_key(&key) || key == NETWORK_TYPE_KEY) {
                    return Err(CodecError::AmbiguousKey { index, key });
                }
                minified.insert(keys.shorten(&key).to_owned(), compress(value, tables, index)?);
            }
            Ok(Value::Object(minified))
        }
        Value::Array(items) => items
            .into_iter()
            .map(|v| compress(v, tables, index))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::String(s) => Ok(Value::String(tables.compress_value(&s).to_owned())),
        other => Ok(other),
    }
}

fn expand(value: Value, tables: &CodecTables) -> Value {
    match value {
        Value::Object(object) => Value::Object(
            object
                .into_iter()
                .map(|(key, value)| (tables.keys().expand(&key).to_owned(), expand(value, tables)))
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(|v| expand(v, tables)).collect()),
        Value::String(s) => Value::String(tables.expand_value(&s).to_owned()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use zipplan_store::models::{DetailDocument, PlanRecord, PlanScope, PlanSummary};
    use zipplan_store::tables::{RawKeyTable, RawValueTables};

    use super::*;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn tables() -> CodecTables {
        CodecTables::from_raw(
            RawKeyTable {
                mapping: map(&[
                    ("summary", "sm"),
                    ("details", "d"),
                    ("has_details", "hd"),
                    ("plan_name", "nm"),
                    ("organization", "o"),
                    ("plan_type", "ty"),
                    ("county", "cn"),
                    ("plan_info", "pi"),
                ]),
            },
            RawValueTables {
                values: map(&[("v1", "All Counties")]),
                organizations: map(&[("o1", "Granite Health")]),
                plan_types: map(&[("t1", "Local HMO")]),
                addresses: map(&[("a1", "PO Box 100, Concord, NH 03301")]),
                network_types: map(&[("n1", "HMO"), ("n2", "PDP")]),
            },
        )
        .unwrap()
    }

    fn record(id: &str, name: &str, scope: PlanScope, details: Option<DetailDocument>) -> PlanRecord {
        PlanRecord::new(
            PlanSummary {
                contract_plan_segment_id: id.parse().unwrap(),
                plan_name: name.into(),
                plan_type: "Local HMO".into(),
                organization: "Granite Health".into(),
                parent_organization: "Granite Holdings".into(),
                part_c_premium: Some(0.0),
                part_d_total_premium: Some(12.4),
                overall_star_rating: Some(4.5),
                snp_type: None,
                scope,
            },
            details,
        )
    }

    fn document() -> ZipDocument {
        let mut details = DetailDocument::default();
        details
            .plan_info
            .insert("name".into(), Value::String("Granite Basic (HMO)".into()));
        details.contact_info.insert(
            "address".into(),
            Value::String("PO Box 100, Concord, NH 03301".into()),
        );
        details
            .benefits
            .insert("Dental".into(), Value::String("Not covered".into()));

        let statewide = record("H1111_001_0", "Granite Basic (HMO)", PlanScope::Statewide, Some(details));
        let coos = record(
            "S4802_075_0",
            "North Country Rx (PDP)",
            PlanScope::County("Coos".into()),
            None,
        );
        let unknown_suffix = record(
            "H7777_001_0",
            "Odd Plan (MSA)",
            PlanScope::County("Coos".into()),
            None,
        );
        ZipDocument {
            zip_code: "03579".into(),
            multi_county: true,
            multi_state: true,
            states: vec!["ME".into(), "NH".into()],
            primary_state: Some("NH".into()),
            counties: vec![
                DocumentCounty {
                    fips: "33007".into(),
                    name: "Coos".into(),
                    state: Some("NH".into()),
                    ratio: Some(0.8),
                    plans_available: true,
                    plan_count: 3,
                    plan_indices: vec![0, 1, 2],
                },
                DocumentCounty {
                    fips: "23017".into(),
                    name: "Oxford".into(),
                    state: Some("ME".into()),
                    ratio: Some(0.2),
                    plans_available: false,
                    plan_count: 0,
                    plan_indices: vec![],
                },
            ],
            plan_count: 3,
            plans: vec![statewide, coos, unknown_suffix],
        }
    }

    #[test]
    fn encode_then_decode_restores_document() {
        let tables = tables();
        let doc = document();
        let compact = encode(&doc, &tables).unwrap();
        assert_eq!(decode(&compact, &tables).unwrap(), doc);
    }

    #[test]
    fn round_trip_survives_serialization() {
        let tables = tables();
        let doc = document();
        let bytes = to_compact_json(&encode(&doc, &tables).unwrap()).unwrap();
        let compact: CompactDocument = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decode(&compact, &tables).unwrap(), doc);
    }

    #[test]
    fn keys_and_values_are_substituted() {
        let compact = encode(&document(), &tables()).unwrap();
        let plan = &compact.plans[0];
        assert_eq!(plan["sm"]["o"], "o1");
        assert_eq!(plan["sm"]["ty"], "t1");
        assert_eq!(plan["sm"]["cn"], "v1");
        assert_eq!(plan["sm"]["nm"], "Granite Basic (HMO)");
        assert_eq!(plan["hd"], true);
        assert_eq!(plan["d"]["contact_info"]["address"], "a1");
        // Unknown field names and values pass through.
        assert_eq!(plan["sm"]["parent_organization"], "Granite Holdings");
        assert_eq!(plan["d"]["benefits"]["Dental"], "Not covered");
    }

    #[test]
    fn structural_fields_use_short_codes() {
        let compact = encode(&document(), &tables()).unwrap();
        let json = serde_json::to_value(&compact).unwrap();
        for key in ["z", "mc", "ms", "s", "ps", "c", "p", "pc"] {
            assert!(json.get(key).is_some(), "missing top-level key {key}");
        }
        let county = &json["c"][0];
        for key in ["f", "n", "s", "r", "pa", "pc", "i"] {
            assert!(county.get(key).is_some(), "missing county key {key}");
        }
        assert_eq!(county["i"][1], 1);
        assert_eq!(county["n"], "Coos", "county names are not substituted");
    }

    #[test]
    fn field_named_like_a_short_key_is_refused() {
        let tables = tables();
        let mut doc = document();
        let details = doc.plans[0].details.as_mut().unwrap();
        details.benefits.insert("d".into(), Value::String("$0 copay".into()));
        let err = encode(&doc, &tables).unwrap_err();
        assert!(
            matches!(&err, CodecError::AmbiguousKey { index: 0, key } if key == "d"),
            "expected AmbiguousKey, got: {err}"
        );

        let mut doc = document();
        let details = doc.plans[0].details.as_mut().unwrap();
        details.plan_info.insert(NETWORK_TYPE_KEY.into(), Value::String("HMO".into()));
        let err = encode(&doc, &tables).unwrap_err();
        assert!(
            matches!(&err, CodecError::AmbiguousKey { key, .. } if key == NETWORK_TYPE_KEY),
            "expected AmbiguousKey, got: {err}"
        );
    }

    #[test]
    fn network_type_is_derived_when_recognized() {
        let compact = encode(&document(), &tables()).unwrap();
        assert_eq!(compact.plans[0][NETWORK_TYPE_KEY], "n1");
        assert_eq!(compact.plans[1][NETWORK_TYPE_KEY], "n2");
        assert!(compact.plans[2].get(NETWORK_TYPE_KEY).is_none(), "MSA is not in the table");
    }

    #[test]
    fn network_type_suffix_matches_trailing_parenthetical() {
        assert_eq!(network_type_suffix("Sugar River Care (HMO-POS)"), Some("HMO-POS"));
        assert_eq!(network_type_suffix("Granite (Basic) Plan (PPO)  "), Some("PPO"));
        assert_eq!(network_type_suffix("Granite (Basic) Plan"), None);
        assert_eq!(network_type_suffix(""), None);
    }

    #[test]
    fn encoding_is_deterministic() {
        let tables = tables();
        let doc = document();
        let first = to_compact_json(&encode(&doc, &tables).unwrap()).unwrap();
        let second = to_compact_json(&encode(&doc, &tables).unwrap()).unwrap();
        assert_eq!(first, second);
        let original = serde_json::to_vec(&doc).unwrap();
        assert!(first.len() < original.len());
    }
}
