use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::format::FallbackEncoding;

use super::resolve::{DEFAULT_MAX_ITEMS, UNRESOLVED_DESCRIPTION};

/// Settings for reading and resolving BC3 documents.
///
/// Stored as TOML. Fields missing from the file take their defaults, so an
/// empty configuration is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// Decimal places extended totals are rounded to.
    decimals: u32,

    /// How input that is not valid UTF-8 is decoded.
    pub fallback_encoding: FallbackEncoding,

    /// Description given to line items standing in for codes with no concept
    /// record.
    pub placeholder_description: String,

    /// Most line items one resolution may produce.
    pub max_items: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            decimals: default_decimals(),
            fallback_encoding: FallbackEncoding::default(),
            placeholder_description: default_placeholder_description(),
            max_items: default_max_items(),
        }
    }
}

/// Errors raised while loading or saving a [`Config`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        /// The file that was read.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },

    /// The file is not a valid configuration.
    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        /// The file that was parsed.
        path: PathBuf,
        /// The underlying error.
        source: toml::de::Error,
    },

    /// The configuration could not be serialized.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The file could not be written.
    #[error("failed to write config file {}: {source}", path.display())]
    Write {
        /// The file that was written.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Returns the number of decimal places extended totals are rounded to.
    #[must_use]
    pub const fn decimals(&self) -> u32 {
        self.decimals
    }

    /// Sets the number of decimal places, capped at the 28 places a decimal
    /// can hold.
    pub fn set_decimals(&mut self, decimals: u32) {
        self.decimals = decimals.min(MAX_DECIMALS);
    }
}

const MAX_DECIMALS: u32 = 28;

const fn default_decimals() -> u32 {
    2
}

fn default_placeholder_description() -> String {
    UNRESOLVED_DESCRIPTION.to_owned()
}

const fn default_max_items() -> usize {
    DEFAULT_MAX_ITEMS
}

/// The serialized versions of the configuration.
///
/// New layouts get a new variant; older files keep loading.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default = "default_decimals")]
        decimals: u32,

        #[serde(default)]
        fallback_encoding: FallbackEncoding,

        #[serde(default = "default_placeholder_description")]
        placeholder_description: String,

        #[serde(default = "default_max_items")]
        max_items: usize,
    },
}

impl From<Versions> for Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                decimals,
                fallback_encoding,
                placeholder_description,
                max_items,
            } => Self {
                decimals: decimals.min(MAX_DECIMALS),
                fallback_encoding,
                placeholder_description,
                max_items,
            },
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            decimals: config.decimals,
            fallback_encoding: config.fallback_encoding,
            placeholder_description: config.placeholder_description,
            max_items: config.max_items,
        }
    }
}
