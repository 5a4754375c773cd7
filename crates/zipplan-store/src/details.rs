//! Reader for harvested detail documents.
//!
//! The harvester writes one JSON file per plan named
//! `<State_Name>-<plan_id>.json`. The collection is sparse: most plans have
//! no document, and that is not an error.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Result, StoreError};
use crate::models::{DetailDocument, PlanId, StateInfo};

/// Detail documents for one state, keyed by composite plan id.
#[derive(Debug, Clone, Default)]
pub struct DetailIndex {
    documents: BTreeMap<PlanId, DetailDocument>,
    /// Files that matched the naming scheme but could not be used.
    pub rejected: Vec<PathBuf>,
}

impl DetailIndex {
    /// An index with no documents.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_documents(documents: BTreeMap<PlanId, DetailDocument>) -> Self {
        Self {
            documents,
            rejected: Vec::new(),
        }
    }

    pub fn get(&self, id: &PlanId) -> Option<&DetailDocument> {
        self.documents.get(id)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Load every detail document for `state` from `dir`.
///
/// An unreadable directory is an error. A file whose name carries a
/// malformed plan id, or whose contents are not a detail document, is
/// skipped and listed in [`DetailIndex::rejected`].
pub fn load_detail_documents(dir: &Path, state: &StateInfo) -> Result<DetailIndex> {
    let prefix = format!("{}-", state.file_prefix());
    let entries = fs::read_dir(dir).map_err(|e| StoreError::read(dir, e))?;

    let mut index = DetailIndex::empty();
    for entry in entries {
        let entry = entry.map_err(|e| StoreError::read(dir, e))?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let Some(raw_id) = stem.strip_prefix(&prefix) else {
            continue;
        };

        let Ok(id) = raw_id.parse::<PlanId>() else {
            warn!(path = %path.display(), "detail file name carries a malformed plan id");
            index.rejected.push(path);
            continue;
        };

        let contents = fs::read(&path).map_err(|e| StoreError::read(&path, e))?;
        match serde_json::from_slice::<DetailDocument>(&contents) {
            Ok(doc) => {
                index.documents.insert(id, doc);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping malformed detail document");
                index.rejected.push(path);
            }
        }
    }
    index.rejected.sort();

    debug!(
        state = %state.abbr,
        documents = index.len(),
        rejected = index.rejected.len(),
        "detail documents loaded"
    );
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nh() -> StateInfo {
        StateInfo::new("NH", "New Hampshire")
    }

    #[test]
    fn loads_matching_files_only() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = tmp.path();
        fs::write(
            dir.join("New_Hampshire-H1111_001_0.json"),
            r#"{"plan_info": {"name": "Granite Basic (HMO)"}}"#,
        )
        .unwrap();
        fs::write(dir.join("Vermont-H2222_002_0.json"), r#"{"plan_info": {}}"#).unwrap();
        fs::write(dir.join("New_Hampshire-notes.txt"), "ignored").unwrap();

        let index = load_detail_documents(dir, &nh()).unwrap();
        assert_eq!(index.len(), 1);
        let id: PlanId = "H1111_001_0".parse().unwrap();
        assert_eq!(
            index.get(&id).unwrap().plan_info["name"],
            "Granite Basic (HMO)"
        );
        assert!(index.rejected.is_empty());
    }

    #[test]
    fn malformed_documents_are_rejected_not_fatal() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = tmp.path();
        fs::write(dir.join("New_Hampshire-H1111_001_0.json"), "{ not json").unwrap();
        fs::write(dir.join("New_Hampshire-bogus.json"), "{}").unwrap();

        let index = load_detail_documents(dir, &nh()).unwrap();
        assert!(index.is_empty());
        assert_eq!(index.rejected.len(), 2);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let err = load_detail_documents(&tmp.path().join("absent"), &nh()).unwrap_err();
        assert!(matches!(err, StoreError::Read { .. }), "unexpected: {err}");
    }
}
