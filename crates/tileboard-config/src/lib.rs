use anyhow::Context;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

mod monitorable;
pub use monitorable::{build_env_key, MonitorableSettings, VariantFields, MONITORABLE_ENV_PREFIX};

/// Prefix of every environment variable read by the daemon
pub const ENV_PREFIX: &str = "TILEBOARD";

pub const DEFAULT_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_INITIAL_MAX_DELAY: u64 = 1700;
pub const DEFAULT_HYDRATE_TIMEOUT: u64 = 5000;

/// Process-wide settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreSettings {
    pub address: String,
    pub port: u16,
    /// Default first-poll delay (ms) for tiles that do not set their own
    pub default_initial_max_delay: u64,
    /// Per-builder timeout (ms) applied during hydration
    pub hydrate_timeout: u64,
    /// Serve faker data instead of calling upstream services
    pub faker: bool,
}

impl Default for CoreSettings {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            default_initial_max_delay: DEFAULT_INITIAL_MAX_DELAY,
            hydrate_timeout: DEFAULT_HYDRATE_TIMEOUT,
            faker: false,
        }
    }
}

impl CoreSettings {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub core: CoreSettings,
    pub monitorables: MonitorableSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RootConfigToml {
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    port: Option<u16>,
    #[serde(default)]
    default_initial_max_delay: Option<u64>,
    #[serde(default)]
    hydrate_timeout: Option<u64>,
    #[serde(default)]
    faker: Option<bool>,
    /// `[monitorable.<name>.<variant>]` tables
    #[serde(default)]
    monitorable: BTreeMap<String, BTreeMap<String, toml::Table>>,
}

/// Read the config file: the explicit path when given (must exist),
/// otherwise the first of the common relative locations, if any.
pub fn read_config_toml_text(explicit: Option<&Path>) -> anyhow::Result<Option<String>> {
    if let Some(path) = explicit {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Could not read config file {}", path.display()))?;
        return Ok(Some(text));
    }

    let paths = ["configs/tileboard.toml", "../../configs/tileboard.toml"];
    for p in &paths {
        if let Ok(c) = fs::read_to_string(p) {
            log::debug!("Config: Using {}", p);
            return Ok(Some(c));
        }
    }
    log::debug!("Config: No config file found in {:?}, using defaults", paths);
    Ok(None)
}

/// Load settings from the config file and the process environment
pub fn load_settings(explicit: Option<PathBuf>) -> anyhow::Result<Settings> {
    let text = read_config_toml_text(explicit.as_deref())?;
    load_settings_from(text.as_deref(), std::env::vars())
}

/// Load settings from TOML text and environment pairs; the environment wins
pub fn load_settings_from(
    toml_text: Option<&str>,
    vars: impl IntoIterator<Item = (String, String)>,
) -> anyhow::Result<Settings> {
    let root: RootConfigToml = match toml_text {
        Some(text) => toml::from_str(text).context("Failed to parse config file")?,
        None => RootConfigToml::default(),
    };

    let mut core = CoreSettings::default();
    if let Some(address) = root.address {
        core.address = address;
    }
    if let Some(port) = root.port {
        core.port = port;
    }
    if let Some(delay) = root.default_initial_max_delay {
        core.default_initial_max_delay = delay;
    }
    if let Some(timeout) = root.hydrate_timeout {
        core.hydrate_timeout = timeout;
    }
    if let Some(faker) = root.faker {
        core.faker = faker;
    }

    let mut monitorables = MonitorableSettings::from_toml(root.monitorable);

    for (key, value) in vars {
        let Some(rest) = key
            .strip_prefix(ENV_PREFIX)
            .and_then(|k| k.strip_prefix('_'))
        else {
            continue;
        };
        match rest {
            "ADDRESS" => core.address = value,
            "PORT" => core.port = parse_env(&key, &value)?,
            "DEFAULT_INITIAL_MAX_DELAY" => core.default_initial_max_delay = parse_env(&key, &value)?,
            "HYDRATE_TIMEOUT" => core.hydrate_timeout = parse_env(&key, &value)?,
            "FAKER" => core.faker = parse_env(&key, &value)?,
            _ => {
                if let Some(field_key) = rest
                    .strip_prefix("MONITORABLE")
                    .and_then(|k| k.strip_prefix('_'))
                {
                    monitorables.insert_env(field_key, value);
                }
            }
        }
    }

    Ok(Settings { core, monitorables })
}

fn parse_env<T>(key: &str, value: &str) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("{key} contains invalid value \"{value}\": {e}"))
}
