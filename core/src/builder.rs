use async_trait::async_trait;
use std::time::Duration;

use crate::params::{TileParams, ValidationError};
use crate::tile::{TileRoute, TileType, Variant};

/// Context passed to a builder when its members are enumerated
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub tile_type: TileType,
    pub variant: Variant,
    /// Params of the requesting tile (empty during discovery)
    pub params: TileParams,
}

impl BuildContext {
    pub fn new(tile_type: TileType, variant: Variant) -> Self {
        Self {
            tile_type,
            variant,
            params: TileParams::new(),
        }
    }

    pub fn with_params(mut self, params: TileParams) -> Self {
        self.params = params;
        self
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("upstream unavailable: {0}")]
    Upstream(String),

    #[error(transparent)]
    Params(#[from] ValidationError),

    #[error("builder timed out after {0:?}")]
    Timeout(Duration),

    #[error("builder task aborted: {0}")]
    Aborted(String),
}

/// Enumerates the concrete members of a dynamic tile type.
///
/// Called only at hydration (or expansion) time. Implementations usually
/// talk to the upstream service, so they may be slow or fail; callers wrap
/// every invocation in its own timeout.
#[async_trait]
pub trait DynamicTileBuilder: Send + Sync {
    async fn build(&self, ctx: &BuildContext) -> Result<Vec<TileRoute>, BuildError>;
}
