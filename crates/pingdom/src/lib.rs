//! Pingdom monitorable
//!
//! Publishes `PINGDOM-CHECK` (one uptime check) and `PINGDOM-CHECKS`
//! (every check of the account, expanded at hydration time).

use axum::extract::Query;
use axum::Json;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tileboard_config::{build_env_key, MonitorableSettings};
use tileboard_core::{
    ConfigError, EnableError, Monitorable, ParamsSchema, RegistryError, Store, TileParams, TileType,
    Variant, MINIMAL_VERSION,
};

pub mod config;
pub mod models;
pub mod repository;
pub mod usecase;

use config::{PingdomConfig, FIELDS};
use models::{CheckParams, ChecksParams};
use repository::{FakerRepository, PingdomRepository};
use usecase::{ChecksBuilder, PingdomUsecase};

/// Name used in env keys and config tables
pub const MONITORABLE_NAME: &str = "PINGDOM";

pub fn check_tile_type() -> TileType {
    TileType::new("PINGDOM-CHECK")
}

pub fn checks_tile_type() -> TileType {
    TileType::new("PINGDOM-CHECKS")
}

type RepositoryFactory = Arc<dyn Fn(&PingdomConfig) -> Arc<dyn PingdomRepository> + Send + Sync>;

fn faker_repository(config: &PingdomConfig) -> Arc<dyn PingdomRepository> {
    Arc::new(FakerRepository::from_config(config))
}

pub struct Pingdom {
    configs: BTreeMap<Variant, Result<PingdomConfig, ConfigError>>,
    repository: RepositoryFactory,
}

impl Pingdom {
    /// Read every configured variant and register both tile types
    pub fn new(
        settings: &MonitorableSettings,
        default_initial_max_delay: u64,
        store: &mut Store,
    ) -> Result<Self, RegistryError> {
        let mut fields = settings.variants(MONITORABLE_NAME, FIELDS);
        fields.entry(Variant::default()).or_default();

        let configs = fields
            .into_iter()
            .map(|(variant, fields)| {
                let config = PingdomConfig::from_fields(&variant, &fields, default_initial_max_delay);
                (variant, config)
            })
            .collect();

        let pingdom = Self {
            configs,
            repository: Arc::new(faker_repository),
        };

        let variants = pingdom.variants();
        store
            .registry
            .register_tile(check_tile_type(), &variants, MINIMAL_VERSION)?;
        store
            .registry
            .register_tile(checks_tile_type(), &variants, MINIMAL_VERSION)?;

        Ok(pingdom)
    }

    /// Replace the repository used by variants enabled from now on
    pub fn with_repository<F>(mut self, factory: F) -> Self
    where
        F: Fn(&PingdomConfig) -> Arc<dyn PingdomRepository> + Send + Sync + 'static,
    {
        self.repository = Arc::new(factory);
        self
    }

    fn config(&self, variant: &Variant) -> Result<&PingdomConfig, ConfigError> {
        match self.configs.get(variant) {
            Some(Ok(config)) => Ok(config),
            Some(Err(e)) => Err(e.clone()),
            None => Err(ConfigError::MissingValue {
                key: build_env_key(MONITORABLE_NAME, variant, "TOKEN"),
            }),
        }
    }
}

impl Monitorable for Pingdom {
    fn display_name(&self) -> &str {
        "Pingdom"
    }

    fn variants(&self) -> Vec<Variant> {
        self.configs.keys().cloned().collect()
    }

    fn validate(&self, variant: &Variant) -> Result<bool, ConfigError> {
        let config = self.config(variant)?;

        if config.is_unset() {
            return Ok(false);
        }

        if url::Url::parse(&config.url).is_err() {
            return Err(ConfigError::InvalidUrl {
                key: build_env_key(MONITORABLE_NAME, variant, "URL"),
                value: config.url.clone(),
            });
        }

        if config.token.is_empty() {
            return Err(ConfigError::MissingValue {
                key: build_env_key(MONITORABLE_NAME, variant, "TOKEN"),
            });
        }

        Ok(true)
    }

    fn enable(&self, variant: &Variant, store: &mut Store) -> Result<(), EnableError> {
        let config = self.config(variant)?;
        store.registry.can_enable_tile(&check_tile_type(), variant)?;
        store
            .registry
            .can_enable_dynamic_tile(&checks_tile_type(), variant)?;

        let repository = (self.repository)(config);
        let usecase = Arc::new(PingdomUsecase::new(repository, config.timeout()));

        let handler_usecase = usecase.clone();
        let route = store.router.group("/pingdom", variant)?.get(
            "/pingdom",
            move |Query(query): Query<HashMap<String, String>>| {
                let usecase = handler_usecase.clone();
                async move {
                    usecase
                        .check(&TileParams::from_query(query))
                        .await
                        .map(Json)
                }
            },
        )?;

        store.registry.enable_tile(
            check_tile_type(),
            variant.clone(),
            ParamsSchema::<CheckParams>::shared(),
            route.path.clone(),
            config.initial_max_delay,
        )?;
        store.registry.enable_dynamic_tile(
            checks_tile_type(),
            variant.clone(),
            ParamsSchema::<ChecksParams>::shared(),
            Arc::new(ChecksBuilder::new(
                usecase,
                route.path,
                config.initial_max_delay,
            )),
        )?;
        Ok(())
    }
}
