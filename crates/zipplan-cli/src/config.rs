//! Configuration file management for zipplan.
//!
//! Provides a TOML-based config file at `~/.config/zipplan/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use zipplan_core::build::BuildInputs;
use zipplan_store::config::StoreConfig;
use zipplan_store::models::StateInfo;
use zipplan_store::tables::{KEY_TABLE_FILE, VALUE_TABLE_FILE};

pub const LANDSCAPE_ENV_VAR: &str = "ZIPPLAN_LANDSCAPE_CSV";

pub const DEFAULT_LANDSCAPE_CSV: &str = "CY2026_Landscape_202511/CY2026_Landscape_202511.csv";
pub const DEFAULT_DETAILS_DIR: &str = "scraped_json_all";
pub const DEFAULT_ZIP_MAPPINGS_DIR: &str = "zip_mappings";
pub const DEFAULT_MAPPINGS_DIR: &str = "mappings";
pub const DEFAULT_PLAN_YEAR: u16 = 2026;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5000;

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub data: DataSection,
    #[serde(default)]
    pub source: SourceSection,
    #[serde(default)]
    pub codec: CodecSection,
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub states: Vec<StateEntry>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DataSection {
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SourceSection {
    pub landscape_csv: Option<PathBuf>,
    /// Harvested detail documents. Omit to build without details.
    pub details_dir: Option<PathBuf>,
    pub zip_mappings_dir: Option<PathBuf>,
    pub plan_year: Option<u16>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CodecSection {
    pub key_table: Option<PathBuf>,
    pub value_table: Option<PathBuf>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ServerSection {
    pub bind: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateEntry {
    pub abbr: String,
    pub name: String,
}

impl ConfigFile {
    /// The file `zipplan init` writes: every default spelled out.
    pub fn with_defaults(data_dir: &Path) -> Self {
        let mappings = PathBuf::from(DEFAULT_MAPPINGS_DIR);
        Self {
            data: DataSection {
                dir: Some(data_dir.to_path_buf()),
            },
            source: SourceSection {
                landscape_csv: Some(DEFAULT_LANDSCAPE_CSV.into()),
                details_dir: Some(DEFAULT_DETAILS_DIR.into()),
                zip_mappings_dir: Some(DEFAULT_ZIP_MAPPINGS_DIR.into()),
                plan_year: Some(DEFAULT_PLAN_YEAR),
            },
            codec: CodecSection {
                key_table: Some(mappings.join(KEY_TABLE_FILE)),
                value_table: Some(mappings.join(VALUE_TABLE_FILE)),
            },
            server: ServerSection {
                bind: Some(DEFAULT_BIND.into()),
                port: Some(DEFAULT_PORT),
            },
            states: StateInfo::default_states()
                .into_iter()
                .map(|s| StateEntry {
                    abbr: s.abbr,
                    name: s.name,
                })
                .collect(),
        }
    }
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the zipplan config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/zipplan` or `~/.config/zipplan`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("zipplan");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("zipplan")
}

/// Return the path to the zipplan config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    load_config_from(&config_path())
}

fn load_config_from(path: &Path) -> Result<ConfigFile> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents).context("failed to parse config file")?;
    Ok(config)
}

/// Serialize and write the config file, creating parent dirs as needed.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;
    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Where the source data lives.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub landscape_csv: PathBuf,
    pub details_dir: Option<PathBuf>,
    pub zip_mappings_dir: PathBuf,
    pub plan_year: u16,
}

#[derive(Debug, Clone)]
pub struct CodecConfig {
    pub key_table: PathBuf,
    pub value_table: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

/// Fully resolved configuration, ready for use.
#[derive(Debug, Clone)]
pub struct ZipplanConfig {
    pub store: StoreConfig,
    pub source: SourceConfig,
    pub codec: CodecConfig,
    pub server: ServerConfig,
    pub states: Vec<StateInfo>,
}

impl ZipplanConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - Data dir: `cli_data_dir` > `ZIPPLAN_DATA_DIR` env > `data.dir` > `StoreConfig::DEFAULT_DIR`
    /// - Landscape CSV: `ZIPPLAN_LANDSCAPE_CSV` env > `source.landscape_csv` > default
    /// - States: `[[states]]` > AK, NH, VT, WY
    pub fn resolve(cli_data_dir: Option<&Path>) -> Result<Self> {
        let file_config = load_config().ok();
        Self::resolve_with(cli_data_dir, file_config.unwrap_or_default())
    }

    fn resolve_with(cli_data_dir: Option<&Path>, file: ConfigFile) -> Result<Self> {
        let data_dir = if let Some(dir) = cli_data_dir {
            dir.to_path_buf()
        } else if let Ok(dir) = std::env::var(StoreConfig::ENV_VAR) {
            PathBuf::from(dir)
        } else if let Some(dir) = file.data.dir {
            dir
        } else {
            PathBuf::from(StoreConfig::DEFAULT_DIR)
        };

        let landscape_csv = if let Ok(path) = std::env::var(LANDSCAPE_ENV_VAR) {
            PathBuf::from(path)
        } else {
            file.source
                .landscape_csv
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LANDSCAPE_CSV))
        };

        let mut states = Vec::with_capacity(file.states.len());
        for entry in file.states {
            if entry.abbr.trim().is_empty() || entry.name.trim().is_empty() {
                bail!("[[states]] entries need both abbr and name, got {entry:?}");
            }
            states.push(StateInfo::new(entry.abbr.trim(), entry.name.trim()));
        }
        if states.is_empty() {
            states = StateInfo::default_states();
        }

        let mappings = PathBuf::from(DEFAULT_MAPPINGS_DIR);
        Ok(Self {
            store: StoreConfig::new(data_dir),
            source: SourceConfig {
                landscape_csv,
                details_dir: file.source.details_dir,
                zip_mappings_dir: file
                    .source
                    .zip_mappings_dir
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_ZIP_MAPPINGS_DIR)),
                plan_year: file.source.plan_year.unwrap_or(DEFAULT_PLAN_YEAR),
            },
            codec: CodecConfig {
                key_table: file
                    .codec
                    .key_table
                    .unwrap_or_else(|| mappings.join(KEY_TABLE_FILE)),
                value_table: file
                    .codec
                    .value_table
                    .unwrap_or_else(|| mappings.join(VALUE_TABLE_FILE)),
            },
            server: ServerConfig {
                bind: file.server.bind.unwrap_or_else(|| DEFAULT_BIND.to_string()),
                port: file.server.port.unwrap_or(DEFAULT_PORT),
            },
            states,
        })
    }

    pub fn build_inputs(&self) -> BuildInputs {
        BuildInputs {
            landscape_csv: self.source.landscape_csv.clone(),
            details_dir: self.source.details_dir.clone(),
            zip_mappings_dir: self.source.zip_mappings_dir.clone(),
            states: self.states.clone(),
        }
    }

    /// The configured state with abbreviation `abbr` (any case).
    pub fn state(&self, abbr: &str) -> Result<&StateInfo> {
        self.states
            .iter()
            .find(|s| s.abbr.eq_ignore_ascii_case(abbr))
            .with_context(|| format!("state {abbr} is not configured"))
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
