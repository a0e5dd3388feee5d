use anyhow::{Context as AnyhowContext, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub(crate) const DEFAULT_CONFIG_FILE: &str = "supply-finder.toml";
pub(crate) const DATABASE_DIR_ENV: &str = "SUPPLY_FINDER_DATABASE_DIR";
pub(crate) const MAPPING_URL_ENV: &str = "SUPPLY_FINDER_MAPPING_URL";
pub(crate) const MAPPING_FILE_ENV: &str = "SUPPLY_FINDER_MAPPING_FILE";
pub(crate) const LEXICON_ENV: &str = "SUPPLY_FINDER_LEXICON";

const DEFAULT_DATABASE_DIR: &str = "database";
const DEFAULT_MAPPING_URL: &str = "http://localhost:5001/mapping";
const DEFAULT_MAPPING_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_SERVER_BIND: &str = "127.0.0.1:5000";
const DEFAULT_MAPPING_SERVER_BIND: &str = "127.0.0.1:5001";
const DEFAULT_MAPPING_SERVER_FILE: &str = "center_dept_database/mapping.json";

/// Where the mapping table comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MappingLocation {
    File(PathBuf),
    Url(String),
}

#[derive(Clone, Debug)]
pub struct FinderConfig {
    pub database_dir: PathBuf,
    pub mapping: MappingLocation,
    pub mapping_timeout: Duration,
    pub lexicon: Option<PathBuf>,
    pub server_bind: String,
    pub refresh_interval: Option<Duration>,
    pub mapping_server_bind: String,
    pub mapping_server_file: PathBuf,
}

/// Values given on the command line; they win over every other layer.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub config: Option<PathBuf>,
    pub database_dir: Option<PathBuf>,
    pub mapping_url: Option<String>,
    pub mapping_file: Option<PathBuf>,
    pub lexicon: Option<PathBuf>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    database_dir: Option<PathBuf>,
    mapping_url: Option<String>,
    mapping_file: Option<PathBuf>,
    mapping_timeout_ms: Option<u64>,
    lexicon: Option<PathBuf>,
    #[serde(default)]
    server: RawServerConfig,
    #[serde(default)]
    mapping_server: RawMappingServerConfig,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawServerConfig {
    bind: Option<String>,
    refresh_secs: Option<u64>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawMappingServerConfig {
    bind: Option<String>,
    file: Option<PathBuf>,
}

impl FinderConfig {
    /// Defaults < config file < environment < command line.
    pub fn load(overrides: &ConfigOverrides) -> Result<Self> {
        let raw = read_config_file(overrides.config.as_deref())?;
        Self::from_layers(raw, |key| std::env::var(key).ok(), overrides)
    }

    fn from_layers(
        raw: RawConfig,
        env: impl Fn(&str) -> Option<String>,
        overrides: &ConfigOverrides,
    ) -> Result<Self> {
        let env_path = |key: &str| env(key).filter(|v| !v.trim().is_empty()).map(PathBuf::from);

        let database_dir = overrides
            .database_dir
            .clone()
            .or_else(|| env_path(DATABASE_DIR_ENV))
            .or(raw.database_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_DIR));

        // An explicit URL on a stronger layer beats a file from a weaker one.
        let layers = [
            (overrides.mapping_file.clone(), overrides.mapping_url.clone()),
            (
                env_path(MAPPING_FILE_ENV),
                env(MAPPING_URL_ENV).filter(|v| !v.trim().is_empty()),
            ),
            (raw.mapping_file, raw.mapping_url),
        ];
        let mapping = layers
            .into_iter()
            .find_map(|(file, url)| match (file, url) {
                (Some(file), _) => Some(MappingLocation::File(file)),
                (None, Some(url)) => Some(MappingLocation::Url(url)),
                (None, None) => None,
            })
            .unwrap_or_else(|| MappingLocation::Url(DEFAULT_MAPPING_URL.to_string()));

        let lexicon = overrides
            .lexicon
            .clone()
            .or_else(|| env_path(LEXICON_ENV))
            .or(raw.lexicon);

        let timeout_ms = raw.mapping_timeout_ms.unwrap_or(DEFAULT_MAPPING_TIMEOUT_MS);
        if timeout_ms == 0 {
            anyhow::bail!("mapping_timeout_ms must be greater than zero");
        }
        let refresh_interval = match raw.server.refresh_secs {
            Some(0) => anyhow::bail!("server.refresh_secs must be greater than zero"),
            Some(secs) => Some(Duration::from_secs(secs)),
            None => None,
        };

        Ok(Self {
            database_dir,
            mapping,
            mapping_timeout: Duration::from_millis(timeout_ms),
            lexicon,
            server_bind: raw
                .server
                .bind
                .unwrap_or_else(|| DEFAULT_SERVER_BIND.to_string()),
            refresh_interval,
            mapping_server_bind: raw
                .mapping_server
                .bind
                .unwrap_or_else(|| DEFAULT_MAPPING_SERVER_BIND.to_string()),
            mapping_server_file: raw
                .mapping_server
                .file
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MAPPING_SERVER_FILE)),
        })
    }
}

fn read_config_file(explicit: Option<&Path>) -> Result<RawConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !default.is_file() {
                return Ok(RawConfig::default());
            }
            default
        }
    };

    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let parsed = toml::from_str(&raw)
        .with_context(|| format!("Invalid config file {}", path.display()))?;
    log::debug!("Loaded config from {}", path.display());
    Ok(parsed)
}
