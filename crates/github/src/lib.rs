//! GitHub faker monitorable: generated `GITHUB-COUNT` and `GITHUB-CHECKS` tiles

use axum::extract::Query;
use axum::Json;
use std::collections::HashMap;

use tileboard_core::{
    ConfigError, EnableError, Monitorable, ParamsSchema, RegistryError, Store, TileParams, TileType,
    Variant, MINIMAL_VERSION,
};

pub mod models;
pub mod usecase;

use models::{ChecksParams, CountParams};
use usecase::GithubFakerUsecase;

pub fn count_tile_type() -> TileType {
    TileType::new("GITHUB-COUNT")
}

pub fn checks_tile_type() -> TileType {
    TileType::new("GITHUB-CHECKS")
}

pub struct GithubFaker {
    initial_max_delay: u64,
}

impl GithubFaker {
    pub fn new(initial_max_delay: u64, store: &mut Store) -> Result<Self, RegistryError> {
        let github = Self { initial_max_delay };

        let variants = github.variants();
        store
            .registry
            .register_tile(count_tile_type(), &variants, MINIMAL_VERSION)?;
        store
            .registry
            .register_tile(checks_tile_type(), &variants, MINIMAL_VERSION)?;

        Ok(github)
    }
}

impl Monitorable for GithubFaker {
    fn display_name(&self) -> &str {
        "GitHub (faker)"
    }

    fn variants(&self) -> Vec<Variant> {
        vec![Variant::default()]
    }

    fn validate(&self, _variant: &Variant) -> Result<bool, ConfigError> {
        Ok(true)
    }

    fn enable(&self, variant: &Variant, store: &mut Store) -> Result<(), EnableError> {
        store.registry.can_enable_tile(&count_tile_type(), variant)?;
        store.registry.can_enable_tile(&checks_tile_type(), variant)?;

        let usecase = GithubFakerUsecase;
        log::debug!("GitHub: ({}) serving generated tiles", variant);

        let mut group = store.router.group("/github", variant)?;
        let count_usecase = usecase.clone();
        let count = group.get(
            "/count",
            move |Query(query): Query<HashMap<String, String>>| {
                let usecase = count_usecase.clone();
                async move { usecase.count(&TileParams::from_query(query)).map(Json) }
            },
        )?;
        let checks = group.get(
            "/checks",
            move |Query(query): Query<HashMap<String, String>>| {
                let usecase = usecase.clone();
                async move { usecase.checks(&TileParams::from_query(query)).map(Json) }
            },
        )?;

        store.registry.enable_tile(
            count_tile_type(),
            variant.clone(),
            ParamsSchema::<CountParams>::shared(),
            count.path,
            self.initial_max_delay,
        )?;
        store.registry.enable_tile(
            checks_tile_type(),
            variant.clone(),
            ParamsSchema::<ChecksParams>::shared(),
            checks.path,
            self.initial_max_delay,
        )?;
        Ok(())
    }
}
