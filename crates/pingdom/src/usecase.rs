use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use tileboard_core::{
    ApiError, BuildContext, BuildError, DynamicTileBuilder, ParamsSchema, Tile, TileParams,
    TileRoute,
};

use crate::check_tile_type;
use crate::models::{CheckParams, ChecksParams};
use crate::repository::{PingdomRepository, RepositoryError};

impl From<RepositoryError> for ApiError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound(_) => ApiError::NotFound(e.to_string()),
            RepositoryError::Unavailable(_) => ApiError::Upstream(e.to_string()),
        }
    }
}

/// Turns Pingdom checks into tiles
pub struct PingdomUsecase {
    repository: Arc<dyn PingdomRepository>,
    timeout: Duration,
}

impl PingdomUsecase {
    pub fn new(repository: Arc<dyn PingdomRepository>, timeout: Duration) -> Self {
        Self {
            repository,
            timeout,
        }
    }

    /// `PINGDOM-CHECK` tile of one check
    pub async fn check(&self, params: &TileParams) -> Result<Tile, ApiError> {
        let params = ParamsSchema::<CheckParams>::new().parse(params)?;
        let check = tokio::time::timeout(self.timeout, self.repository.get_check(params.id))
            .await
            .map_err(|_| ApiError::Upstream(format!("timed out after {:?}", self.timeout)))??;

        Ok(Tile::new(check_tile_type(), check.tile_status()).with_label(&check.name))
    }
}

/// Expands `PINGDOM-CHECKS` into one `PINGDOM-CHECK` per matching check
pub struct ChecksBuilder {
    usecase: Arc<PingdomUsecase>,
    check_path: String,
    initial_max_delay: u64,
}

impl ChecksBuilder {
    pub fn new(usecase: Arc<PingdomUsecase>, check_path: String, initial_max_delay: u64) -> Self {
        Self {
            usecase,
            check_path,
            initial_max_delay,
        }
    }
}

#[async_trait]
impl DynamicTileBuilder for ChecksBuilder {
    async fn build(&self, ctx: &BuildContext) -> Result<Vec<TileRoute>, BuildError> {
        let params = ParamsSchema::<ChecksParams>::new().parse(&ctx.params)?;

        let timeout = self.usecase.timeout;
        let mut checks = tokio::time::timeout(timeout, self.usecase.repository.get_checks())
            .await
            .map_err(|_| BuildError::Upstream(format!("timed out after {:?}", timeout)))?
            .map_err(|e| BuildError::Upstream(e.to_string()))?;

        let tags = params.tag_list();
        if !tags.is_empty() {
            checks.retain(|check| check.has_any_tag(&tags));
        }
        if params.sort_by.as_deref() == Some("name") {
            checks.sort_by(|a, b| a.name.cmp(&b.name));
        }

        log::debug!(
            "Pingdom: {} ({}) expanded to {} checks",
            ctx.tile_type,
            ctx.variant,
            checks.len()
        );

        Ok(checks
            .into_iter()
            .map(|check| {
                TileRoute::new(self.check_path.clone(), self.initial_max_delay)
                    .with_params(TileParams::new().with("id", check.id))
            })
            .collect())
    }
}
