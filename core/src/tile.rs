//! Tile identity and payload types
//!
//! A tile is the unit the dashboard client polls. Every tile belongs to a
//! [`TileType`] (what kind of data it shows) and a [`Variant`] (which
//! configured instance of the upstream service serves it).
//!
//! ## Routing
//! - **Static tiles**: one route per (type, variant), fixed at enablement.
//! - **Dynamic tiles**: routes enumerated at hydration time by a builder,
//!   each carrying the params the client must send back.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::params::TileParams;

/// Name of the variant used when a monitorable is configured without one.
pub const DEFAULT_VARIANT: &str = "default";

/// Identifier of a tile category (e.g. `PINGDOM-CHECK`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileType(String);

impl TileType {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TileType {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Name of one independently configured instance of a tile type
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Variant(String);

impl Variant {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_default(&self) -> bool {
        self.0 == DEFAULT_VARIANT
    }
}

impl Default for Variant {
    fn default() -> Self {
        Self(DEFAULT_VARIANT.to_string())
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Variant {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Where and when a client should fetch one concrete tile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileRoute {
    /// Route path as mounted by the HTTP layer, stored verbatim
    pub path: String,
    /// Upper bound (ms) of the random delay before the first poll
    pub initial_max_delay: u64,
    /// Query params the client must send (dynamic members only)
    #[serde(default, skip_serializing_if = "TileParams::is_empty")]
    pub params: TileParams,
}

impl TileRoute {
    pub fn new(path: impl Into<String>, initial_max_delay: u64) -> Self {
        Self {
            path: path.into(),
            initial_max_delay,
            params: TileParams::new(),
        }
    }

    pub fn with_params(mut self, params: TileParams) -> Self {
        self.params = params;
        self
    }
}

/// Health of the upstream resource a tile represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TileStatus {
    Success,
    Failure,
    Warning,
    Running,
    Queued,
    Disabled,
    ActionRequired,
    #[default]
    Unknown,
}

/// Data returned by a monitorable route for a single tile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    #[serde(rename = "type")]
    pub tile_type: TileType,
    pub status: TileStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Free-form values (counters, durations) rendered by the client
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

impl Tile {
    pub fn new(tile_type: TileType, status: TileStatus) -> Self {
        Self {
            tile_type,
            status,
            label: None,
            message: None,
            values: Vec::new(),
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn with_message(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }

    pub fn with_value(mut self, value: impl ToString) -> Self {
        self.values.push(value.to_string());
        self
    }
}
