//! Hydration: the client-facing discovery payload
//!
//! Walks a sealed registry and resolves every enabled (type, variant):
//! static entries are copied as-is, dynamic entries are expanded by running
//! their builder. Each builder runs in its own tokio task under its own
//! timeout, so a slow, failing or panicking builder only degrades its own
//! entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::builder::{BuildContext, BuildError, DynamicTileBuilder};
use crate::registry::{TileConfigRegistry, TileMode, TileRequest, VerifyError};
use crate::tile::{TileRoute, TileType, Variant};

/// Default per-builder timeout
pub const DEFAULT_BUILDER_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct HydrateOptions {
    pub builder_timeout: Duration,
}

impl Default for HydrateOptions {
    fn default() -> Self {
        Self {
            builder_timeout: DEFAULT_BUILDER_TIMEOUT,
        }
    }
}

/// Resolution of one enabled variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum HydratedVariant {
    Static {
        path: String,
        #[serde(rename = "initialMaxDelay")]
        initial_max_delay: u64,
    },
    Dynamic {
        tiles: Vec<TileRoute>,
    },
    /// The builder failed; the client should retry later
    Degraded {
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HydratedTileType {
    #[serde(rename = "type")]
    pub tile_type: TileType,
    pub min_version: String,
    /// JSON Schema of the params accepted by this type
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub params_schema: serde_json::Value,
    pub variants: BTreeMap<Variant, HydratedVariant>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HydrationError {
    #[serde(rename = "type")]
    pub tile_type: TileType,
    pub variant: Variant,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HydrationPayload {
    pub generated_at: DateTime<Utc>,
    pub tiles: Vec<HydratedTileType>,
    #[serde(default)]
    pub errors: Vec<HydrationError>,
}

impl HydrationPayload {
    pub fn tile_type(&self, tile_type: &TileType) -> Option<&HydratedTileType> {
        self.tiles.iter().find(|t| &t.tile_type == tile_type)
    }

    pub fn variant(&self, tile_type: &TileType, variant: &Variant) -> Option<&HydratedVariant> {
        self.tile_type(tile_type)?.variants.get(variant)
    }

    /// Number of (type, variant) entries, degraded ones included
    pub fn entry_count(&self) -> usize {
        self.tiles.iter().map(|t| t.variants.len()).sum()
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ExpandError {
    #[error(transparent)]
    Verify(#[from] VerifyError),

    #[error("tile type '{0}' is not dynamic")]
    NotDynamic(TileType),

    #[error("failed to build '{tile_type}' ({variant}): {source}")]
    Build {
        tile_type: TileType,
        variant: Variant,
        #[source]
        source: BuildError,
    },
}

impl TileConfigRegistry {
    /// Produce the discovery payload.
    ///
    /// Types with no enabled variant are left out. Builder failures are
    /// reported in `errors` and as degraded entries.
    pub async fn hydrate(&self, options: &HydrateOptions) -> HydrationPayload {
        let mut tiles = Vec::new();
        let mut pending = Vec::new();

        for (tile_type, entry) in self.entries() {
            let mut variants = BTreeMap::new();
            let params_schema = entry
                .mode()
                .enabled_variants()
                .first()
                .and_then(|variant| entry.mode().validator(variant))
                .map(|validator| validator.schema())
                .unwrap_or_default();

            match entry.mode() {
                TileMode::Unset => continue,
                TileMode::Static(configs) => {
                    for (variant, config) in configs {
                        variants.insert(
                            variant.clone(),
                            HydratedVariant::Static {
                                path: config.path.clone(),
                                initial_max_delay: config.initial_max_delay,
                            },
                        );
                    }
                }
                TileMode::Dynamic(configs) => {
                    for (variant, config) in configs {
                        let ctx = BuildContext::new(tile_type.clone(), variant.clone());
                        let handle =
                            spawn_build(config.builder.clone(), ctx, options.builder_timeout);
                        pending.push((tiles.len(), variant.clone(), handle));
                    }
                }
            }

            tiles.push(HydratedTileType {
                tile_type: tile_type.clone(),
                min_version: entry.min_version().to_string(),
                params_schema,
                variants,
            });
        }

        let mut errors = Vec::new();
        for (index, variant, handle) in pending {
            let hydrated: &mut HydratedTileType = &mut tiles[index];
            let resolved = match join_build(handle).await {
                Ok(members) => {
                    log::debug!(
                        "Hydrate: '{}' ({}) expanded to {} tile(s)",
                        hydrated.tile_type,
                        variant,
                        members.len()
                    );
                    HydratedVariant::Dynamic { tiles: members }
                }
                Err(e) => {
                    log::warn!(
                        "Hydrate: '{}' ({}) degraded: {}",
                        hydrated.tile_type,
                        variant,
                        e
                    );
                    errors.push(HydrationError {
                        tile_type: hydrated.tile_type.clone(),
                        variant: variant.clone(),
                        message: e.to_string(),
                    });
                    HydratedVariant::Degraded {
                        error: e.to_string(),
                    }
                }
            };
            hydrated.variants.insert(variant, resolved);
        }

        HydrationPayload {
            generated_at: Utc::now(),
            tiles,
            errors,
        }
    }

    /// Expand one dynamic tile with client params
    pub async fn expand(
        &self,
        request: &TileRequest,
        options: &HydrateOptions,
    ) -> Result<Vec<TileRoute>, ExpandError> {
        self.verify(request)?;
        let config = self
            .dynamic_config(&request.tile_type, &request.variant)
            .ok_or_else(|| ExpandError::NotDynamic(request.tile_type.clone()))?;

        let ctx = BuildContext::new(request.tile_type.clone(), request.variant.clone())
            .with_params(request.params.clone());
        let handle = spawn_build(config.builder.clone(), ctx, options.builder_timeout);
        join_build(handle)
            .await
            .map_err(|source| ExpandError::Build {
                tile_type: request.tile_type.clone(),
                variant: request.variant.clone(),
                source,
            })
    }
}

type BuildHandle = tokio::task::JoinHandle<Result<Vec<TileRoute>, BuildError>>;

fn spawn_build(
    builder: Arc<dyn DynamicTileBuilder>,
    ctx: BuildContext,
    timeout: Duration,
) -> BuildHandle {
    tokio::spawn(async move {
        match tokio::time::timeout(timeout, builder.build(&ctx)).await {
            Ok(result) => result,
            Err(_) => Err(BuildError::Timeout(timeout)),
        }
    })
}

async fn join_build(handle: BuildHandle) -> Result<Vec<TileRoute>, BuildError> {
    match handle.await {
        Ok(result) => result,
        Err(e) => Err(BuildError::Aborted(e.to_string())),
    }
}
