//! Access control configuration
//!
//! Providers are configured through a flat map of property names to string
//! values, the same shape the platform reads from its configuration files.
//! The manager itself can be pointed at a TOML file naming the provider:
//!
//! ```toml
//! name = "file"
//!
//! [properties]
//! "security.config-file" = "/etc/sqlguard/rules.json"
//! "security.refresh-period" = "30s"
//! ```

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AccessControlError, Result};

/// Path of the JSON rule file
pub const SECURITY_CONFIG_FILE: &str = "security.config-file";

/// How long loaded rules stay valid before the file is read again
pub const SECURITY_REFRESH_PERIOD: &str = "security.refresh-period";

/// Provider properties as handed to a factory
pub type Properties = BTreeMap<String, String>;

/// Validated configuration of the file-based provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileBasedAccessControlConfig {
    config_file: PathBuf,
    refresh_period: Option<Duration>,
}

impl FileBasedAccessControlConfig {
    pub fn new(config_file: impl Into<PathBuf>) -> Self {
        Self {
            config_file: config_file.into(),
            refresh_period: None,
        }
    }

    pub fn with_refresh_period(mut self, refresh_period: Duration) -> Self {
        self.refresh_period = Some(refresh_period);
        self
    }

    /// Validate a property map
    ///
    /// The rule file path is required. The refresh period is optional, but
    /// when present must parse (`1ms`, `30s`, `5m`, ...) and be non-zero.
    pub fn from_properties(properties: &Properties) -> Result<Self> {
        if let Some(unknown) = properties
            .keys()
            .find(|key| *key != SECURITY_CONFIG_FILE && *key != SECURITY_REFRESH_PERIOD)
        {
            return Err(AccessControlError::Configuration(format!(
                "unknown property '{}' for the file-based access control",
                unknown
            )));
        }

        let config_file = properties
            .get(SECURITY_CONFIG_FILE)
            .filter(|path| !path.trim().is_empty())
            .ok_or_else(|| {
                AccessControlError::Configuration(format!(
                    "security configuration must contain the '{}' property",
                    SECURITY_CONFIG_FILE
                ))
            })?;

        let refresh_period = properties
            .get(SECURITY_REFRESH_PERIOD)
            .map(|value| parse_refresh_period(value, config_file))
            .transpose()?;

        Ok(Self {
            config_file: PathBuf::from(config_file),
            refresh_period,
        })
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    pub fn refresh_period(&self) -> Option<Duration> {
        self.refresh_period
    }
}

fn parse_refresh_period(value: &str, config_file: &str) -> Result<Duration> {
    let invalid = || {
        AccessControlError::Configuration(format!(
            "invalid value '{}' for property '{}' (rules file '{}')",
            value, SECURITY_REFRESH_PERIOD, config_file
        ))
    };

    let period = humantime::parse_duration(value.trim()).map_err(|_| invalid())?;
    if period.is_zero() {
        return Err(invalid());
    }
    Ok(period)
}

/// Manager configuration file: which provider to activate and its properties
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccessControlConfigFile {
    /// Registered provider name, e.g. `file`
    pub name: String,

    #[serde(default)]
    pub properties: Properties,
}

impl AccessControlConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AccessControlError::Configuration(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&contents)
            .map_err(|e| AccessControlError::Configuration(format!("failed to parse {}: {}", path.display(), e)))
    }

    pub fn parse(contents: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }
}
