//! TOML configuration for the `tax-assistant` binary.
//!
//! Every section and key is optional:
//!
//! ```toml
//! [database]
//! backend = "sqlite"
//! connection_string = "tax-assistant.db"
//!
//! [tax]
//! regime = "new-regime"
//!
//! [rebate]
//! threshold = 500000
//! cap = 12500
//! basis = "tax-liability"   # or "taxable-income"
//!
//! [parser]
//! duplicates = "replace"    # or "sum"
//!
//! [logging]
//! level = "info"
//! file = "tax-assistant.log"
//! ```

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tax_core::calculations::RebatePolicy;
use tax_core::db::DbConfig;
use tax_core::income::ParseOptions;
use thiserror::Error;

/// Environment variable naming a config file.
pub const CONFIG_ENV_VAR: &str = "TAX_ASSISTANT_CONFIG";

/// Picked up from the working directory when nothing else is given.
pub const DEFAULT_CONFIG_FILE: &str = "tax-assistant.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TaxConfig {
    /// Slab table to load from the repository.
    pub regime: String,
}

impl Default for TaxConfig {
    fn default() -> Self {
        Self {
            regime: "new-regime".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` wins when set.
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub database: DbConfig,
    pub tax: TaxConfig,
    pub rebate: RebatePolicy,
    pub parser: ParseOptions,
    pub logging: LoggingConfig,
}

/// Chooses the config file: `explicit`, then `env_value`, then
/// [`DEFAULT_CONFIG_FILE`] in `cwd` if it exists.
pub fn config_path(
    explicit: Option<&Path>,
    env_value: Option<OsString>,
    cwd: &Path,
) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(value) = env_value.filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(value));
    }
    let local = cwd.join(DEFAULT_CONFIG_FILE);
    local.is_file().then_some(local)
}

impl AppConfig {
    pub fn from_toml_str(
        text: &str,
        path: &Path,
    ) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, path)
    }

    /// Loads the config chosen by [`config_path`], or the defaults when no
    /// file applies. Returns the path that was read, if any.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        match config_path(explicit, std::env::var_os(CONFIG_ENV_VAR), &cwd) {
            Some(path) => Ok((Self::from_file(&path)?, Some(path))),
            None => Ok((Self::default(), None)),
        }
    }
}
