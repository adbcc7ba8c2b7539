//! Tileboard core
//!
//! Holds the Tile Configuration Registry and the contracts monitorables use
//! to publish tiles: params validators, dynamic tile builders, route groups
//! and the startup manager.

pub mod tile;
pub use tile::{Tile, TileRoute, TileStatus, TileType, Variant, DEFAULT_VARIANT};

pub mod params;
pub use params::{ParamsSchema, ParamsValidator, TileParams, TypedParams, ValidationError};

pub mod builder;
pub use builder::{BuildContext, BuildError, DynamicTileBuilder};

pub mod registry;
pub use registry::{
    DynamicTileConfig, RegistryError, TileConfig, TileConfigRegistry, TileMode, TileRequest,
    TileTypeEntry, VerifyError,
};

pub mod hydrate;
pub use hydrate::{
    ExpandError, HydrateOptions, HydratedTileType, HydratedVariant, HydrationError,
    HydrationPayload,
};

pub mod router;
pub use router::{ApiError, MonitorableRouter, Route, RouteError, RouteGroup, API_PREFIX};

pub mod monitorable;
pub use monitorable::{
    ConfigError, EnableError, Monitorable, MonitorableFailure, MonitorableManager, StartupReport,
    Store,
};

/// Oldest client version able to consume the tiles published by this build
pub const MINIMAL_VERSION: &str = "4.0.0";
