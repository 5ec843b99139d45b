//! Configuration system for rolesim
//!
//! Supports multiple configuration sources with the following precedence (highest to lowest):
//! 1. CLI arguments
//! 2. Environment variables (ROLESIM_* prefix)
//! 3. Configuration file (TOML)
//! 4. Default values

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::{CatalogRegistry, TraitCatalog};
use crate::error::{Error, Result};
use crate::fusion::{Composer, DEFAULT_CULTURAL_CONTEXT};
use crate::identity::{IdentityManager, DEFAULT_DIGITS, DEFAULT_PREFIX};
use crate::rubric::RubricStore;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RolesimConfig {
    /// Trait catalog source
    pub catalog: CatalogSettings,

    /// Competency rubric source
    pub rubric: RubricSettings,

    /// Simulation id format
    pub identity: IdentitySettings,

    /// Persona fusion settings
    pub fusion: FusionSettings,

    /// Batch pre-generation settings
    pub pregen: PregenSettings,

    /// Logging configuration
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    /// Catalog TOML file (unset = bundled catalog)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RubricSettings {
    /// Rubric TOML file (unset = bundled rubric)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

/// Simulation id format settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentitySettings {
    /// Literal prefix of fresh ids
    pub prefix: String,

    /// Width of the zero-padded numeric part (8-18)
    pub digits: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionSettings {
    /// Cultural framing written into every fusion block
    pub cultural_context: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PregenSettings {
    /// Maximum jobs composed at once (0 = one per CPU)
    pub max_concurrent: usize,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    pub level: String,

    /// Log file path (empty = no file logging)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Number of rotated log files to keep
    pub max_files: u32,

    /// Enable JSON formatted logging
    pub json_format: bool,
}

// ─────────────────────────────────────────────────────────────────
// Default Implementations
// ─────────────────────────────────────────────────────────────────

impl Default for IdentitySettings {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            digits: DEFAULT_DIGITS,
        }
    }
}

impl Default for FusionSettings {
    fn default() -> Self {
        Self {
            cultural_context: DEFAULT_CULTURAL_CONTEXT.to_string(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            max_files: 5,
            json_format: false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Loading
// ─────────────────────────────────────────────────────────────────

impl RolesimConfig {
    /// Load configuration from file, environment, and defaults
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = match Self::find_config_file(config_path)? {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.expand_paths();
        config.validate()?;

        Ok(config)
    }

    /// Parse a configuration file without overrides or validation
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "Loading configuration file");
        let content = fs::read_to_string(path).map_err(|e| Error::IoRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config = toml::from_str(&content).map_err(|e| Error::ConfigParse {
            what: format!("configuration file {}", path.display()),
            message: e.message().to_string(),
            source: Some(e),
        })?;
        info!(path = %path.display(), "Configuration loaded from file");
        Ok(config)
    }

    /// Find the configuration file to use
    fn find_config_file(explicit_path: Option<&str>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit_path {
            let path = PathBuf::from(expand_path(path));
            if path.exists() {
                return Ok(Some(path));
            }
            return Err(Error::ConfigNotFound { path });
        }

        for path in Self::search_paths() {
            if path.exists() {
                debug!(path = %path.display(), "Found configuration file");
                return Ok(Some(path));
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(None)
    }

    /// Standard locations searched when no path is given
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("rolesim.toml")];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("rolesim").join("config.toml"));
        }
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".rolesim").join("config.toml"));
        }
        paths
    }

    /// Apply ROLESIM_* overrides read through `lookup`
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("ROLESIM_CATALOG_FILE") {
            self.catalog.file = Some(val);
        }
        if let Some(val) = lookup("ROLESIM_RUBRIC_FILE") {
            self.rubric.file = Some(val);
        }

        if let Some(val) = lookup("ROLESIM_ID_PREFIX") {
            self.identity.prefix = val;
        }
        if let Some(n) = lookup("ROLESIM_ID_DIGITS").and_then(|v| v.parse().ok()) {
            self.identity.digits = n;
        }

        if let Some(val) = lookup("ROLESIM_CULTURAL_CONTEXT") {
            self.fusion.cultural_context = val;
        }
        if let Some(n) = lookup("ROLESIM_PREGEN_MAX_CONCURRENT").and_then(|v| v.parse().ok()) {
            self.pregen.max_concurrent = n;
        }

        if let Some(val) = lookup("ROLESIM_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Some(val) = lookup("ROLESIM_LOG_FILE") {
            self.logging.file = Some(val);
        }
        if let Some(val) = lookup("ROLESIM_LOG_JSON") {
            self.logging.json_format = val.eq_ignore_ascii_case("true") || val == "1";
        }
    }

    fn expand_paths(&mut self) {
        for file in [
            &mut self.catalog.file,
            &mut self.rubric.file,
            &mut self.logging.file,
        ]
        .into_iter()
        .flatten()
        {
            *file = expand_path(file);
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::config_field_invalid(
                "logging.level",
                format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    valid_levels.join(", ")
                ),
            ));
        }

        if self.fusion.cultural_context.trim().is_empty() {
            return Err(Error::config_field_invalid(
                "fusion.cultural_context",
                "cultural_context cannot be empty",
            ));
        }

        self.identity_manager()?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────
    // Component Construction
    // ─────────────────────────────────────────────────────────────

    pub fn identity_manager(&self) -> Result<IdentityManager> {
        IdentityManager::new(self.identity.prefix.clone(), self.identity.digits)
    }

    pub fn composer(&self) -> Composer {
        Composer::new(self.fusion.cultural_context.clone())
    }

    /// Configured catalog file, or the bundled catalog
    pub fn load_catalog(&self) -> Result<TraitCatalog> {
        match &self.catalog.file {
            Some(file) => TraitCatalog::load(Path::new(file)),
            None => CatalogRegistry::new().bundled(),
        }
    }

    /// Configured rubric file, or the bundled rubric
    pub fn load_rubric(&self) -> Result<RubricStore> {
        match &self.rubric.file {
            Some(file) => RubricStore::load(Path::new(file)),
            None => RubricStore::bundled(),
        }
    }
}

fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .unwrap_or_else(|_| std::borrow::Cow::Borrowed(path))
        .into_owned()
}

/// Default location written by `config init`
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".rolesim")
        .join("config.toml")
}

/// Write a commented default configuration file, returning its path
pub fn init_config(path: Option<&str>, force: bool) -> Result<PathBuf> {
    let config_path = path
        .map(|p| PathBuf::from(expand_path(p)))
        .unwrap_or_else(default_config_path);

    if config_path.exists() && !force {
        return Err(Error::config_validation(format!(
            "Configuration file already exists: {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::IoWrite {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    fs::write(&config_path, generate_default_config()).map_err(|e| Error::IoWrite {
        path: config_path.clone(),
        source: e,
    })?;

    info!(path = %config_path.display(), "Configuration file created");
    Ok(config_path)
}

/// Generate default configuration file content
pub fn generate_default_config() -> String {
    format!(
        r#"# rolesim configuration

[catalog]
# Trait catalog file (comment out to use the bundled catalog)
# file = "~/.rolesim/catalog.toml"

[rubric]
# Competency rubric file (comment out to use the bundled rubric)
# file = "~/.rolesim/rubric.toml"

[identity]
# Literal prefix of fresh simulation ids
prefix = "{prefix}"

# Width of the zero-padded numeric part (8-18)
digits = {digits}

[fusion]
# Cultural framing written into every persona payload
cultural_context = "{context}"

[pregen]
# Maximum payloads composed at once (0 = one per CPU)
max_concurrent = 0

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log file path (comment out to disable file logging)
# file = "~/.rolesim/logs/rolesim.log"

# Number of rotated log files to keep
max_files = 5

# Enable JSON formatted logging
json_format = false
"#,
        prefix = DEFAULT_PREFIX,
        digits = DEFAULT_DIGITS,
        context = DEFAULT_CULTURAL_CONTEXT,
    )
}
