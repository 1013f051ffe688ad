//! Configuration loading and validation
//!
//! Two layers:
//! 1. **NamerConfig**: constructor-time allocator settings (base, seed, store layout)
//! 2. **TomlConfig**: bootstrap file (database path, namer settings, logging)
//!
//! Resolution priority for every bootstrap value:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default first suffix of every year scope
pub const DEFAULT_SEED_SUFFIX: &str = "aaaaa";

/// Default name of the designation column, used for both read and write
pub const DEFAULT_DESIGNATION_COLUMN: &str = "designation";

/// Default name of the candidate table
pub const DEFAULT_CANDIDATE_TABLE: &str = "candidates";

/// Environment variable overriding the designation base
pub const ENV_BASE: &str = "DESIG_BASE";

/// Environment variable overriding the seed suffix
pub const ENV_SEED: &str = "DESIG_SEED";

/// Environment variable overriding the database path
pub const ENV_DATABASE: &str = "DESIG_DATABASE";

/// Allocator configuration, fixed for the lifetime of a deployment
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NamerConfig {
    /// Project/survey prefix of every designation
    pub base: String,

    /// First suffix issued in an empty year scope
    #[serde(default = "default_seed_suffix")]
    pub seed_suffix: String,

    /// Column holding the designation
    #[serde(default = "default_designation_column")]
    pub designation_column: String,

    /// Table holding candidate records
    #[serde(default = "default_candidate_table")]
    pub candidate_table: String,
}

fn default_seed_suffix() -> String {
    DEFAULT_SEED_SUFFIX.to_string()
}

fn default_designation_column() -> String {
    DEFAULT_DESIGNATION_COLUMN.to_string()
}

fn default_candidate_table() -> String {
    DEFAULT_CANDIDATE_TABLE.to_string()
}

impl NamerConfig {
    /// Create a configuration with default seed and store layout
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            seed_suffix: default_seed_suffix(),
            designation_column: default_designation_column(),
            candidate_table: default_candidate_table(),
        }
    }

    /// Override the seed suffix
    pub fn with_seed_suffix(mut self, seed: impl Into<String>) -> Self {
        self.seed_suffix = seed.into();
        self
    }

    /// Override the designation column name
    pub fn with_designation_column(mut self, column: impl Into<String>) -> Self {
        self.designation_column = column.into();
        self
    }

    /// Override the candidate table name
    pub fn with_candidate_table(mut self, table: impl Into<String>) -> Self {
        self.candidate_table = table.into();
        self
    }

    /// Validate all fields
    ///
    /// - base: non-empty ASCII alphanumeric
    /// - seed: non-empty lowercase ASCII letters
    /// - table and column: plain SQL identifiers (they are spliced into SQL text)
    pub fn validate(&self) -> Result<()> {
        if self.base.is_empty() || !self.base.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::Config(format!(
                "Designation base must be non-empty ASCII alphanumeric, got '{}'",
                self.base
            )));
        }

        if self.seed_suffix.is_empty() || !self.seed_suffix.chars().all(|c| c.is_ascii_lowercase()) {
            return Err(Error::Config(format!(
                "Seed suffix must be non-empty lowercase letters, got '{}'",
                self.seed_suffix
            )));
        }

        validate_identifier("designation column", &self.designation_column)?;
        validate_identifier("candidate table", &self.candidate_table)?;

        Ok(())
    }

    /// Table/column names the store reads and writes
    pub fn layout(&self) -> StoreLayout {
        StoreLayout {
            table: self.candidate_table.clone(),
            column: self.designation_column.clone(),
        }
    }

    /// First designation of a year scope, e.g. `XY24aaaaa`
    pub fn seed_designation(&self, year: u8) -> String {
        format!("{}{:02}{}", self.base, year, self.seed_suffix)
    }
}

/// Where candidate records and their designations live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    pub table: String,
    pub column: String,
}

impl Default for StoreLayout {
    fn default() -> Self {
        Self {
            table: default_candidate_table(),
            column: default_designation_column(),
        }
    }
}

fn validate_identifier(what: &str, name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(Error::Config(format!("Invalid {} name: '{}'", what, name)))
    }
}

/// Bootstrap configuration loaded from TOML file
///
/// Every field is optional; missing values fall through to compiled defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    /// Path to SQLite database file
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Designation base
    #[serde(default)]
    pub base: Option<String>,

    /// Seed suffix
    #[serde(default)]
    pub seed_suffix: Option<String>,

    /// Designation column name
    #[serde(default)]
    pub designation_column: Option<String>,

    /// Candidate table name
    #[serde(default)]
    pub candidate_table: Option<String>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TomlConfig {
    /// Parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Invalid config file {}: {}", path.display(), e)))
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_file: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
    pub base: Option<String>,
    pub seed_suffix: Option<String>,
}

/// Fully resolved bootstrap configuration
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub database_path: PathBuf,
    pub namer: NamerConfig,
    pub logging: LoggingConfig,
}

/// Resolve configuration following the priority order in the module docs
///
/// A missing default config file is not an error; an explicitly requested
/// one that cannot be read is.
pub fn resolve_config(overrides: &ConfigOverrides) -> Result<ResolvedConfig> {
    let file = match &overrides.config_file {
        Some(path) => {
            info!("Loading config file: {}", path.display());
            TomlConfig::load(path)?
        }
        None => match default_config_file() {
            Some(path) => {
                info!("Loading config file: {}", path.display());
                TomlConfig::load(&path)?
            }
            None => {
                warn!("No config file found, using defaults");
                TomlConfig::default()
            }
        },
    };

    let base = overrides
        .base
        .clone()
        .or_else(|| std::env::var(ENV_BASE).ok())
        .or(file.base)
        .ok_or_else(|| {
            Error::Config(format!(
                "Designation base not configured (use --base, {} or the config file)",
                ENV_BASE
            ))
        })?;

    let seed_suffix = overrides
        .seed_suffix
        .clone()
        .or_else(|| std::env::var(ENV_SEED).ok())
        .or(file.seed_suffix)
        .unwrap_or_else(default_seed_suffix);

    let database_path = overrides
        .database_path
        .clone()
        .or_else(|| std::env::var(ENV_DATABASE).ok().map(PathBuf::from))
        .or(file.database_path)
        .unwrap_or_else(default_database_path);

    let namer = NamerConfig {
        base,
        seed_suffix,
        designation_column: file
            .designation_column
            .unwrap_or_else(default_designation_column),
        candidate_table: file.candidate_table.unwrap_or_else(default_candidate_table),
    };
    namer.validate()?;

    Ok(ResolvedConfig {
        database_path,
        namer,
        logging: file.logging,
    })
}

/// Locate the platform config file, if one exists
///
/// Linux: ~/.config/desig/config.toml, then /etc/desig/config.toml
fn default_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("desig").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/desig/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// OS-dependent default database path
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("desig"))
        .unwrap_or_else(|| PathBuf::from("./desig_data"))
        .join("desig.db")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NamerConfig::new("XY");
        assert_eq!(config.seed_suffix, "aaaaa");
        assert_eq!(config.designation_column, "designation");
        assert_eq!(config.candidate_table, "candidates");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_seed_designation_zero_pads_year() {
        let config = NamerConfig::new("XY");
        assert_eq!(config.seed_designation(24), "XY24aaaaa");
        assert_eq!(config.seed_designation(3), "XY03aaaaa");
    }

    #[test]
    fn test_rejects_bad_base() {
        assert!(NamerConfig::new("").validate().is_err());
        assert!(NamerConfig::new("X Y").validate().is_err());
        assert!(NamerConfig::new("X%").validate().is_err());
    }

    #[test]
    fn test_rejects_bad_seed() {
        assert!(NamerConfig::new("XY").with_seed_suffix("").validate().is_err());
        assert!(NamerConfig::new("XY").with_seed_suffix("aaAaa").validate().is_err());
        assert!(NamerConfig::new("XY").with_seed_suffix("aa1").validate().is_err());
    }

    #[test]
    fn test_rejects_sql_in_identifiers() {
        let config = NamerConfig::new("XY").with_designation_column("name; DROP TABLE x");
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = NamerConfig::new("XY").with_candidate_table("1table");
        assert!(config.validate().is_err());

        let config = NamerConfig::new("XY").with_candidate_table("_sources_v2");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_parsing_with_partial_fields() {
        let config: TomlConfig = toml::from_str(
            r#"
            base = "WNTR"

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.base.as_deref(), Some("WNTR"));
        assert!(config.seed_suffix.is_none());
        assert!(config.database_path.is_none());
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_toml_logging_defaults_to_info() {
        let config: TomlConfig = toml::from_str("base = \"XY\"").unwrap();
        assert_eq!(config.logging.level, "info");
    }
}
