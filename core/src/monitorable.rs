use crate::registry::{RegistryError, TileConfigRegistry};
use crate::router::{MonitorableRouter, RouteError};
use crate::tile::Variant;

/// Shared state handed to monitorables during startup
#[derive(Default)]
pub struct Store {
    pub registry: TileConfigRegistry,
    pub router: MonitorableRouter,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Operator-facing configuration problems of a monitorable variant
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} contains invalid URL: \"{value}\"")]
    InvalidUrl { key: String, value: String },

    #[error("{key} is required, no value found")]
    MissingValue { key: String },

    #[error("{key} contains invalid value \"{value}\": {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// Why a validated variant could not be enabled
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EnableError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// An external service exposing tiles.
///
/// Implementations register their tile types against the store's registry
/// when constructed, then publish tiles per variant through `enable`.
pub trait Monitorable: Send + Sync {
    /// Human-readable name (e.g. "Pingdom")
    fn display_name(&self) -> &str;

    /// Variants found in configuration (at least the default one)
    fn variants(&self) -> Vec<Variant>;

    /// Whether a variant can be enabled.
    ///
    /// - `Ok(true)`: configured and valid
    /// - `Ok(false)`: not configured, skip silently
    /// - `Err(e)`: configured but unusable
    fn validate(&self, variant: &Variant) -> Result<bool, ConfigError>;

    /// Mount routes and publish tiles for a validated variant.
    ///
    /// Implementations check the registry with `can_enable_tile` /
    /// `can_enable_dynamic_tile` before mounting, so a refused variant
    /// leaves no route behind.
    fn enable(&self, variant: &Variant, store: &mut Store) -> Result<(), EnableError>;
}

/// A variant that could not be enabled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorableFailure {
    pub monitorable: String,
    pub variant: Variant,
    pub reason: String,
}

/// Outcome of enabling every monitorable
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartupReport {
    pub enabled: Vec<(String, Variant)>,
    pub skipped: Vec<(String, Variant)>,
    pub errors: Vec<MonitorableFailure>,
}

impl StartupReport {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Drives every monitorable through validate → enable
#[derive(Default)]
pub struct MonitorableManager {
    monitorables: Vec<Box<dyn Monitorable>>,
}

impl MonitorableManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, monitorable: Box<dyn Monitorable>) {
        log::debug!("Monitorables: Registered '{}'", monitorable.display_name());
        self.monitorables.push(monitorable);
    }

    pub fn len(&self) -> usize {
        self.monitorables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitorables.is_empty()
    }

    /// Enable every usable variant; never fails, problems land in the report
    pub fn enable_all(&self, store: &mut Store) -> StartupReport {
        let mut report = StartupReport::default();

        for monitorable in &self.monitorables {
            let name = monitorable.display_name().to_string();
            for variant in monitorable.variants() {
                let failure = |reason: String| MonitorableFailure {
                    monitorable: name.clone(),
                    variant: variant.clone(),
                    reason,
                };

                match monitorable.validate(&variant) {
                    Ok(true) => match monitorable.enable(&variant, store) {
                        Ok(()) => {
                            log::info!("Monitorables: {} ({}) enabled", name, variant);
                            report.enabled.push((name.clone(), variant.clone()));
                        }
                        Err(e) => {
                            log::error!("Monitorables: {} ({}) failed: {}", name, variant, e);
                            report.errors.push(failure(e.to_string()));
                        }
                    },
                    Ok(false) => {
                        log::debug!("Monitorables: {} ({}) not configured", name, variant);
                        report.skipped.push((name.clone(), variant.clone()));
                    }
                    Err(e) => {
                        log::error!("Monitorables: {} ({}) misconfigured: {}", name, variant, e);
                        report.errors.push(failure(e.to_string()));
                    }
                }
            }
        }

        report
    }
}
