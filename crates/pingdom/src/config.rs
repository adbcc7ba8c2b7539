use std::time::Duration;

use tileboard_config::{build_env_key, VariantFields};
use tileboard_core::{ConfigError, Variant};

use crate::MONITORABLE_NAME;

pub const DEFAULT_URL: &str = "https://api.pingdom.com/api/3.1";
pub const DEFAULT_TIMEOUT: u64 = 2000;

/// Fields understood in `TILEBOARD_MONITORABLE_PINGDOM_[<VARIANT>_]<FIELD>`
pub const FIELDS: &[&str] = &["URL", "TOKEN", "TIMEOUT", "INITIAL_MAX_DELAY"];

/// Settings of one Pingdom variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingdomConfig {
    pub url: String,
    pub token: String,
    /// Upstream request timeout (ms)
    pub timeout: u64,
    pub initial_max_delay: u64,
}

impl PingdomConfig {
    /// Read a variant's fields, falling back to defaults for absent ones
    pub fn from_fields(
        variant: &Variant,
        fields: &VariantFields,
        default_initial_max_delay: u64,
    ) -> Result<Self, ConfigError> {
        let number = |field: &str, default: u64| -> Result<u64, ConfigError> {
            fields
                .parse::<u64>(field)
                .map(|value| value.unwrap_or(default))
                .map_err(|value| ConfigError::InvalidValue {
                    key: build_env_key(MONITORABLE_NAME, variant, field),
                    value,
                    reason: "expected a number of milliseconds".to_string(),
                })
        };

        Ok(Self {
            url: fields.get_or("URL", DEFAULT_URL).trim().to_string(),
            token: fields.get_or("TOKEN", "").trim().to_string(),
            timeout: number("TIMEOUT", DEFAULT_TIMEOUT)?,
            initial_max_delay: number("INITIAL_MAX_DELAY", default_initial_max_delay)?,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }

    /// Untouched defaults: the variant was never configured
    pub fn is_unset(&self) -> bool {
        self.url == DEFAULT_URL && self.token.is_empty()
    }
}
