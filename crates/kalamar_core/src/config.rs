//! Site configuration loading.
//!
//! # Responsibility
//! - Deserialize the TOML site descriptor.
//! - Wire each declared access point to its backend and codec.
//!
//! # Invariants
//! - Access point names are unique and match `^[a-z0-9_-]+$`.
//! - Relative SQLite paths resolve against the configuration file directory.
//! - A site is either fully built or not built at all.

use crate::access_point::AccessPoint;
use crate::codec::{codec_for_name, supported_codecs};
use crate::model::schema::{PropertySchema, SchemaError};
use crate::site::{CorruptContentPolicy, Site, SiteError};
use crate::store::{MemoryStore, SqliteStore, StorageBackend, StoreError};
use log::{error, info};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Storage kinds accepted in `storage = "..."`.
pub const STORAGE_MEMORY: &str = "memory";
pub const STORAGE_SQLITE: &str = "sqlite";
const SQLITE_IN_MEMORY_URL: &str = ":memory:";

static ACCESS_POINT_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9_-]+$").expect("valid access point name regex"));

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(toml::de::Error),
    InvalidAccessPointName(String),
    DuplicateAccessPoint(String),
    Schema {
        access_point: String,
        source: SchemaError,
    },
    UnknownStorage {
        access_point: String,
        storage: String,
    },
    MissingUrl(String),
    UnknownParser {
        access_point: String,
        parser: String,
    },
    Store {
        access_point: String,
        source: StoreError,
    },
    Site(SiteError),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "cannot read site configuration `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid site configuration: {err}"),
            Self::InvalidAccessPointName(name) => write!(
                f,
                "access point name `{name}` is invalid; expected lowercase letters, digits, `_` or `-`"
            ),
            Self::DuplicateAccessPoint(name) => {
                write!(f, "access point `{name}` is declared twice")
            }
            Self::Schema {
                access_point,
                source,
            } => write!(f, "access point `{access_point}`: {source}"),
            Self::UnknownStorage {
                access_point,
                storage,
            } => write!(
                f,
                "access point `{access_point}`: unknown storage `{storage}`; expected {STORAGE_MEMORY}|{STORAGE_SQLITE}"
            ),
            Self::MissingUrl(access_point) => {
                write!(f, "access point `{access_point}`: storage requires a `url`")
            }
            Self::UnknownParser {
                access_point,
                parser,
            } => write!(
                f,
                "access point `{access_point}`: unknown parser `{parser}`; expected {}",
                supported_codecs().join("|")
            ),
            Self::Store {
                access_point,
                source,
            } => write!(f, "access point `{access_point}`: {source}"),
            Self::Site(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Schema { source, .. } => Some(source),
            Self::Store { source, .. } => Some(source),
            Self::Site(err) => Some(err),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

impl From<SiteError> for ConfigError {
    fn from(value: SiteError) -> Self {
        match value {
            SiteError::DuplicateAccessPoint(name) => Self::DuplicateAccessPoint(name),
            other => Self::Site(other),
        }
    }
}

/// Whole-site descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default)]
    pub corrupt_content: CorruptContentPolicy,
    #[serde(default)]
    pub access_points: Vec<AccessPointConfig>,
}

/// One `[[access_points]]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPointConfig {
    pub name: String,
    /// `memory` or `sqlite`.
    pub storage: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Content codec name; raw payloads when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parser: Option<String>,
    /// `name[:type]` declarations in sugar order.
    pub properties: Vec<String>,
}

impl SiteConfig {
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

impl Site {
    /// Loads a configuration file and builds the site it describes.
    ///
    /// # Side effects
    /// - Opens (and migrates) every configured SQLite database.
    /// - Emits a `site_open` event with access point count and status.
    pub fn from_config_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let config = SiteConfig::load(path)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_config(&config, base_dir)
    }

    /// Builds a site; relative storage urls resolve against `base_dir`.
    pub fn from_config(config: &SiteConfig, base_dir: &Path) -> ConfigResult<Self> {
        let built = build_site(config, base_dir);
        match &built {
            Ok(site) => info!(
                "event=site_open module=config status=ok access_points={} corrupt_content={:?}",
                site.access_point_names().len(),
                config.corrupt_content
            ),
            Err(err) => error!("event=site_open module=config status=error error={err}"),
        }
        built
    }
}

fn build_site(config: &SiteConfig, base_dir: &Path) -> ConfigResult<Site> {
    let mut site = Site::new().with_corrupt_content_policy(config.corrupt_content);
    for ap_config in &config.access_points {
        let access_point = build_access_point(ap_config, base_dir)?;
        site.register(access_point)?;
    }
    Ok(site)
}

fn build_access_point(config: &AccessPointConfig, base_dir: &Path) -> ConfigResult<AccessPoint> {
    let name = config.name.trim();
    if !ACCESS_POINT_NAME_RE.is_match(name) {
        return Err(ConfigError::InvalidAccessPointName(config.name.clone()));
    }

    let schema =
        PropertySchema::from_specs(&config.properties).map_err(|source| ConfigError::Schema {
            access_point: name.to_string(),
            source,
        })?;
    let store = open_store(name, config, base_dir)?;
    let access_point = AccessPoint::new(name, schema, store);

    match config.parser.as_deref().map(str::trim) {
        None | Some("") => Ok(access_point),
        Some(parser) => {
            let codec = codec_for_name(parser).ok_or_else(|| ConfigError::UnknownParser {
                access_point: name.to_string(),
                parser: parser.to_string(),
            })?;
            Ok(access_point.with_codec(codec))
        }
    }
}

fn open_store(
    name: &str,
    config: &AccessPointConfig,
    base_dir: &Path,
) -> ConfigResult<Box<dyn StorageBackend>> {
    let store_error = |source| ConfigError::Store {
        access_point: name.to_string(),
        source,
    };

    match config.storage.trim() {
        STORAGE_MEMORY => Ok(Box::new(MemoryStore::new())),
        STORAGE_SQLITE => {
            let url = config
                .url
                .as_deref()
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .ok_or_else(|| ConfigError::MissingUrl(name.to_string()))?;
            let store = if url == SQLITE_IN_MEMORY_URL {
                SqliteStore::in_memory(name)
            } else {
                SqliteStore::open(base_dir.join(url), name)
            }
            .map_err(store_error)?;
            Ok(Box::new(store))
        }
        other => Err(ConfigError::UnknownStorage {
            access_point: name.to_string(),
            storage: other.to_string(),
        }),
    }
}
