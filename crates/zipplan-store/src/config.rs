use std::env;
use std::path::{Path, PathBuf};

/// Snapshot storage configuration.
///
/// Reads from the `ZIPPLAN_DATA_DIR` environment variable, falling back to
/// `./zipplan-data` when unset.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Root directory holding the current snapshot, the staging area and
    /// compact output.
    pub data_dir: PathBuf,
}

impl StoreConfig {
    /// The default data directory used when no environment variable is set.
    pub const DEFAULT_DIR: &str = "zipplan-data";

    /// Environment variable consulted by [`StoreConfig::from_env`].
    pub const ENV_VAR: &str = "ZIPPLAN_DATA_DIR";

    /// Build a config from the environment.
    ///
    /// Priority: `ZIPPLAN_DATA_DIR` env var, then the compile-time default.
    pub fn from_env() -> Self {
        let data_dir = env::var(Self::ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(Self::DEFAULT_DIR));
        Self { data_dir }
    }

    /// Build a config from an explicit directory (useful for tests and CLI flags).
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Directory of the snapshot currently being served.
    pub fn current_dir(&self) -> PathBuf {
        self.data_dir.join("current")
    }

    /// Directory a build writes into before it replaces `current`.
    pub fn staging_dir(&self) -> PathBuf {
        self.data_dir.join("staging")
    }

    /// Where the previous snapshot is parked while `current` is swapped.
    pub fn retired_dir(&self) -> PathBuf {
        self.data_dir.join("retired")
    }

    /// Default output directory for compact documents.
    pub fn compact_dir(&self) -> PathBuf {
        self.data_dir.join("compact")
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
