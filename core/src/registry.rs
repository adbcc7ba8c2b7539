//! Tile Configuration Registry
//!
//! Tracks which tile types exist, which of their variants are enabled and
//! whether each type is served statically (fixed route) or dynamically
//! (members enumerated by a builder).
//!
//! ## Lifecycle
//! 1. Monitorables call [`TileConfigRegistry::register_tile`] at construction.
//! 2. For every usable variant they call `enable_tile` / `enable_dynamic_tile`.
//! 3. The daemon calls [`TileConfigRegistry::seal`]; from then on the registry
//!    is shared read-only and every write is rejected.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use crate::builder::DynamicTileBuilder;
use crate::params::{ParamsValidator, TileParams, ValidationError};
use crate::tile::{TileType, Variant};

/// Static-mode configuration of one (type, variant)
#[derive(Clone)]
pub struct TileConfig {
    pub validator: Arc<dyn ParamsValidator>,
    pub path: String,
    pub initial_max_delay: u64,
}

impl fmt::Debug for TileConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileConfig")
            .field("path", &self.path)
            .field("initial_max_delay", &self.initial_max_delay)
            .finish_non_exhaustive()
    }
}

/// Dynamic-mode configuration of one (type, variant)
#[derive(Clone)]
pub struct DynamicTileConfig {
    pub validator: Arc<dyn ParamsValidator>,
    pub builder: Arc<dyn DynamicTileBuilder>,
}

impl fmt::Debug for DynamicTileConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicTileConfig").finish_non_exhaustive()
    }
}

/// How the enabled variants of a tile type are served.
///
/// A type is either static or dynamic as a whole; switching it to dynamic
/// drops every static variant.
#[derive(Debug, Clone, Default)]
pub enum TileMode {
    #[default]
    Unset,
    Static(BTreeMap<Variant, TileConfig>),
    Dynamic(BTreeMap<Variant, DynamicTileConfig>),
}

impl TileMode {
    pub fn is_dynamic(&self) -> bool {
        matches!(self, TileMode::Dynamic(_))
    }

    pub fn enabled_variants(&self) -> Vec<&Variant> {
        match self {
            TileMode::Unset => Vec::new(),
            TileMode::Static(configs) => configs.keys().collect(),
            TileMode::Dynamic(configs) => configs.keys().collect(),
        }
    }

    pub fn validator(&self, variant: &Variant) -> Option<&Arc<dyn ParamsValidator>> {
        match self {
            TileMode::Unset => None,
            TileMode::Static(configs) => configs.get(variant).map(|c| &c.validator),
            TileMode::Dynamic(configs) => configs.get(variant).map(|c| &c.validator),
        }
    }
}

/// Registration data and enabled configs of one tile type
#[derive(Debug, Clone)]
pub struct TileTypeEntry {
    min_version: String,
    variants: BTreeSet<Variant>,
    mode: TileMode,
}

impl TileTypeEntry {
    /// Minimum client version able to render this type
    pub fn min_version(&self) -> &str {
        &self.min_version
    }

    /// Variants declared at registration (enabled or not)
    pub fn variants(&self) -> &BTreeSet<Variant> {
        &self.variants
    }

    pub fn mode(&self) -> &TileMode {
        &self.mode
    }

    pub fn is_enabled(&self, variant: &Variant) -> bool {
        self.mode.validator(variant).is_some()
    }

    fn check_declared(&self, tile_type: &TileType, variant: &Variant) -> Result<(), RegistryError> {
        if !self.variants.contains(variant) {
            return Err(RegistryError::UndeclaredVariant {
                tile_type: tile_type.clone(),
                variant: variant.clone(),
            });
        }
        Ok(())
    }
}

/// Usage errors rejected by the registry
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("tile type '{0}' is not registered")]
    UnregisteredTileType(TileType),

    #[error("variant '{variant}' was not declared for tile type '{tile_type}'")]
    UndeclaredVariant { tile_type: TileType, variant: Variant },

    #[error("tile type '{0}' is dynamic, static tiles cannot be enabled for it")]
    DynamicTileType(TileType),

    #[error("registry is sealed, {operation} of '{tile_type}' rejected")]
    Sealed {
        operation: &'static str,
        tile_type: TileType,
    },
}

/// A client tile request as found in a dashboard config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileRequest {
    #[serde(rename = "type")]
    pub tile_type: TileType,
    #[serde(default)]
    pub variant: Variant,
    #[serde(default)]
    pub params: TileParams,
}

impl TileRequest {
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
pub enum VerifyError {
    #[error("unknown tile type '{0}'")]
    UnknownTileType(TileType),

    #[error("unknown variant '{variant}' for tile type '{tile_type}'")]
    UnknownVariant { tile_type: TileType, variant: Variant },

    #[error("variant '{variant}' of tile type '{tile_type}' is not enabled")]
    DisabledVariant { tile_type: TileType, variant: Variant },

    #[error("invalid params for tile type '{tile_type}': {source}")]
    InvalidParams {
        tile_type: TileType,
        #[source]
        source: ValidationError,
    },
}

/// Central registry of tile types and their per-variant configs
#[derive(Debug, Default)]
pub struct TileConfigRegistry {
    entries: BTreeMap<TileType, TileTypeEntry>,
    sealed: bool,
    diagnostics: Vec<RegistryError>,
}

impl TileConfigRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a tile type, its supported variants and minimum client version.
    ///
    /// Calling it again merges the variant set; identical arguments leave the
    /// registry unchanged.
    pub fn register_tile(
        &mut self,
        tile_type: TileType,
        variants: &[Variant],
        min_version: &str,
    ) -> Result<(), RegistryError> {
        if self.sealed {
            return self.reject(RegistryError::Sealed {
                operation: "registration",
                tile_type,
            });
        }

        match self.entries.get_mut(&tile_type) {
            Some(entry) => {
                if entry.min_version != min_version {
                    log::warn!(
                        "Registry: '{}' re-registered with min version {} (was {})",
                        tile_type,
                        min_version,
                        entry.min_version
                    );
                    entry.min_version = min_version.to_string();
                }
                entry.variants.extend(variants.iter().cloned());
            }
            None => {
                log::debug!(
                    "Registry: Registered '{}' ({} variants, min version {})",
                    tile_type,
                    variants.len(),
                    min_version
                );
                self.entries.insert(
                    tile_type,
                    TileTypeEntry {
                        min_version: min_version.to_string(),
                        variants: variants.iter().cloned().collect(),
                        mode: TileMode::Unset,
                    },
                );
            }
        }
        Ok(())
    }

    /// Enable a static tile; overwrites any previous config for the key
    pub fn enable_tile(
        &mut self,
        tile_type: TileType,
        variant: Variant,
        validator: Arc<dyn ParamsValidator>,
        path: impl Into<String>,
        initial_max_delay: u64,
    ) -> Result<(), RegistryError> {
        let entry = match self.writable_entry("static enablement", &tile_type, &variant) {
            Ok(entry) => entry,
            Err(e) => return self.reject(e),
        };
        if entry.mode.is_dynamic() {
            return self.reject(RegistryError::DynamicTileType(tile_type));
        }

        let config = TileConfig {
            validator,
            path: path.into(),
            initial_max_delay,
        };
        match &mut entry.mode {
            TileMode::Static(configs) => {
                configs.insert(variant.clone(), config);
            }
            mode => {
                *mode = TileMode::Static(BTreeMap::from([(variant.clone(), config)]));
            }
        }

        log::info!("Registry: Enabled '{}' ({}) as static tile", tile_type, variant);
        Ok(())
    }

    /// Enable a dynamic tile; clears every static config of the type
    pub fn enable_dynamic_tile(
        &mut self,
        tile_type: TileType,
        variant: Variant,
        validator: Arc<dyn ParamsValidator>,
        builder: Arc<dyn DynamicTileBuilder>,
    ) -> Result<(), RegistryError> {
        let entry = match self.writable_entry("dynamic enablement", &tile_type, &variant) {
            Ok(entry) => entry,
            Err(e) => return self.reject(e),
        };

        let config = DynamicTileConfig { validator, builder };
        match &mut entry.mode {
            TileMode::Dynamic(configs) => {
                configs.insert(variant.clone(), config);
            }
            mode => {
                if let TileMode::Static(configs) = mode {
                    log::warn!(
                        "Registry: '{}' switched to dynamic, dropping {} static variant(s)",
                        tile_type,
                        configs.len()
                    );
                }
                *mode = TileMode::Dynamic(BTreeMap::from([(variant.clone(), config)]));
            }
        }

        log::info!("Registry: Enabled '{}' ({}) as dynamic tile", tile_type, variant);
        Ok(())
    }

    /// End the write phase
    pub fn seal(&mut self) {
        if !self.sealed {
            log::info!(
                "Registry: Sealed with {} tile type(s), {} rejected call(s)",
                self.entries.len(),
                self.diagnostics.len()
            );
        }
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Usage errors rejected so far
    pub fn diagnostics(&self) -> &[RegistryError] {
        &self.diagnostics
    }

    pub fn is_registered(&self, tile_type: &TileType) -> bool {
        self.entries.contains_key(tile_type)
    }

    pub fn entry(&self, tile_type: &TileType) -> Option<&TileTypeEntry> {
        self.entries.get(tile_type)
    }

    /// All registered types in lexical order
    pub fn entries(&self) -> impl Iterator<Item = (&TileType, &TileTypeEntry)> {
        self.entries.iter()
    }

    pub fn tile_types(&self) -> Vec<&TileType> {
        self.entries.keys().collect()
    }

    pub fn min_version(&self, tile_type: &TileType) -> Option<&str> {
        self.entries.get(tile_type).map(TileTypeEntry::min_version)
    }

    pub fn static_config(&self, tile_type: &TileType, variant: &Variant) -> Option<&TileConfig> {
        match &self.entries.get(tile_type)?.mode {
            TileMode::Static(configs) => configs.get(variant),
            _ => None,
        }
    }

    pub fn dynamic_config(
        &self,
        tile_type: &TileType,
        variant: &Variant,
    ) -> Option<&DynamicTileConfig> {
        match &self.entries.get(tile_type)?.mode {
            TileMode::Dynamic(configs) => configs.get(variant),
            _ => None,
        }
    }

    /// Check a client tile request against the registered types
    pub fn verify(&self, request: &TileRequest) -> Result<(), VerifyError> {
        let entry = self
            .entries
            .get(&request.tile_type)
            .ok_or_else(|| VerifyError::UnknownTileType(request.tile_type.clone()))?;

        if !entry.variants.contains(&request.variant) {
            return Err(VerifyError::UnknownVariant {
                tile_type: request.tile_type.clone(),
                variant: request.variant.clone(),
            });
        }

        let validator =
            entry
                .mode
                .validator(&request.variant)
                .ok_or_else(|| VerifyError::DisabledVariant {
                    tile_type: request.tile_type.clone(),
                    variant: request.variant.clone(),
                })?;

        validator
            .validate(&request.params)
            .map_err(|source| VerifyError::InvalidParams {
                tile_type: request.tile_type.clone(),
                source,
            })
    }

    /// Whether `enable_tile` would accept this key.
    ///
    /// Lets a monitorable find out before it mounts any route. Nothing is
    /// recorded in `diagnostics`.
    pub fn can_enable_tile(
        &self,
        tile_type: &TileType,
        variant: &Variant,
    ) -> Result<(), RegistryError> {
        let entry = self.declared_entry("static enablement", tile_type, variant)?;
        if entry.mode.is_dynamic() {
            return Err(RegistryError::DynamicTileType(tile_type.clone()));
        }
        Ok(())
    }

    /// Whether `enable_dynamic_tile` would accept this key
    pub fn can_enable_dynamic_tile(
        &self,
        tile_type: &TileType,
        variant: &Variant,
    ) -> Result<(), RegistryError> {
        self.declared_entry("dynamic enablement", tile_type, variant)
            .map(|_| ())
    }

    fn declared_entry(
        &self,
        operation: &'static str,
        tile_type: &TileType,
        variant: &Variant,
    ) -> Result<&TileTypeEntry, RegistryError> {
        if self.sealed {
            return Err(RegistryError::Sealed {
                operation,
                tile_type: tile_type.clone(),
            });
        }
        let entry = self
            .entries
            .get(tile_type)
            .ok_or_else(|| RegistryError::UnregisteredTileType(tile_type.clone()))?;
        entry.check_declared(tile_type, variant)?;
        Ok(entry)
    }

    fn writable_entry(
        &mut self,
        operation: &'static str,
        tile_type: &TileType,
        variant: &Variant,
    ) -> Result<&mut TileTypeEntry, RegistryError> {
        if self.sealed {
            return Err(RegistryError::Sealed {
                operation,
                tile_type: tile_type.clone(),
            });
        }
        let entry = self
            .entries
            .get_mut(tile_type)
            .ok_or_else(|| RegistryError::UnregisteredTileType(tile_type.clone()))?;
        entry.check_declared(tile_type, variant)?;
        Ok(entry)
    }

    fn reject(&mut self, error: RegistryError) -> Result<(), RegistryError> {
        if matches!(error, RegistryError::Sealed { .. }) {
            log::error!("Registry: {}", error);
        } else {
            log::warn!("Registry: {}", error);
        }
        self.diagnostics.push(error.clone());
        Err(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{BuildContext, BuildError};
    use crate::tile::TileRoute;
    use async_trait::async_trait;

    struct AcceptAll;

    impl ParamsValidator for AcceptAll {
        fn validate(&self, _params: &TileParams) -> Result<(), ValidationError> {
            Ok(())
        }
    }

    struct RequireId;

    impl ParamsValidator for RequireId {
        fn validate(&self, params: &TileParams) -> Result<(), ValidationError> {
            params
                .get("id")
                .map(|_| ())
                .ok_or_else(|| ValidationError::MissingParam("id".to_string()))
        }
    }

    struct NoMembers;

    #[async_trait]
    impl DynamicTileBuilder for NoMembers {
        async fn build(&self, _ctx: &BuildContext) -> Result<Vec<TileRoute>, BuildError> {
            Ok(Vec::new())
        }
    }

    fn build_status() -> TileType {
        TileType::new("build-status")
    }

    fn registered() -> TileConfigRegistry {
        let mut registry = TileConfigRegistry::new();
        registry
            .register_tile(
                build_status(),
                &[Variant::default(), Variant::new("secondary")],
                "4.0.0",
            )
            .unwrap();
        registry
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut registry = registered();
        registry
            .register_tile(
                build_status(),
                &[Variant::default(), Variant::new("secondary")],
                "4.0.0",
            )
            .unwrap();

        let entry = registry.entry(&build_status()).unwrap();
        assert_eq!(registry.tile_types().len(), 1);
        assert_eq!(entry.variants().len(), 2);
        assert_eq!(entry.min_version(), "4.0.0");
        assert!(matches!(entry.mode(), TileMode::Unset));
    }

    #[test]
    fn test_register_merges_variants() {
        let mut registry = registered();
        registry
            .register_tile(build_status(), &[Variant::new("third")], "4.1.0")
            .unwrap();

        let entry = registry.entry(&build_status()).unwrap();
        assert_eq!(entry.variants().len(), 3);
        assert_eq!(entry.min_version(), "4.1.0");
    }

    #[test]
    fn test_enable_static_overwrites() {
        let mut registry = registered();
        let validator: Arc<dyn ParamsValidator> = Arc::new(AcceptAll);

        registry
            .enable_tile(build_status(), Variant::default(), validator.clone(), "/p1", 100)
            .unwrap();
        registry
            .enable_tile(build_status(), Variant::default(), validator, "/p2", 200)
            .unwrap();

        let config = registry
            .static_config(&build_status(), &Variant::default())
            .unwrap();
        assert_eq!(config.path, "/p2");
        assert_eq!(config.initial_max_delay, 200);
    }

    #[test]
    fn test_enable_unregistered_type_is_rejected() {
        let mut registry = TileConfigRegistry::new();
        let result = registry.enable_tile(
            TileType::new("ghost"),
            Variant::default(),
            Arc::new(AcceptAll),
            "/ghost",
            0,
        );

        assert_eq!(
            result,
            Err(RegistryError::UnregisteredTileType(TileType::new("ghost")))
        );
        assert!(!registry.is_registered(&TileType::new("ghost")));
        assert_eq!(registry.diagnostics().len(), 1);
    }

    #[test]
    fn test_enable_undeclared_variant_is_rejected() {
        let mut registry = registered();
        let result = registry.enable_dynamic_tile(
            build_status(),
            Variant::new("unknown"),
            Arc::new(AcceptAll),
            Arc::new(NoMembers),
        );

        assert!(matches!(
            result,
            Err(RegistryError::UndeclaredVariant { .. })
        ));
        assert!(matches!(
            registry.entry(&build_status()).unwrap().mode(),
            TileMode::Unset
        ));
    }

    #[test]
    fn test_dynamic_clears_static_type_wide() {
        let mut registry = registered();
        registry
            .enable_tile(build_status(), Variant::default(), Arc::new(AcceptAll), "/a", 0)
            .unwrap();
        registry
            .enable_tile(build_status(), Variant::new("secondary"), Arc::new(AcceptAll), "/b", 0)
            .unwrap();

        registry
            .enable_dynamic_tile(
                build_status(),
                Variant::default(),
                Arc::new(AcceptAll),
                Arc::new(NoMembers),
            )
            .unwrap();

        assert!(registry
            .static_config(&build_status(), &Variant::new("secondary"))
            .is_none());
        assert!(registry
            .dynamic_config(&build_status(), &Variant::default())
            .is_some());
        assert!(registry.entry(&build_status()).unwrap().mode().is_dynamic());
    }

    #[test]
    fn test_static_after_dynamic_is_rejected() {
        let mut registry = registered();
        registry
            .enable_dynamic_tile(
                build_status(),
                Variant::default(),
                Arc::new(AcceptAll),
                Arc::new(NoMembers),
            )
            .unwrap();

        let result = registry.enable_tile(
            build_status(),
            Variant::new("secondary"),
            Arc::new(AcceptAll),
            "/b",
            0,
        );

        assert_eq!(result, Err(RegistryError::DynamicTileType(build_status())));
        let entry = registry.entry(&build_status()).unwrap();
        assert_eq!(entry.mode().enabled_variants(), vec![&Variant::default()]);
    }

    #[test]
    fn test_can_enable_matches_enable_outcome() {
        let mut registry = registered();
        registry
            .enable_dynamic_tile(
                build_status(),
                Variant::default(),
                Arc::new(AcceptAll),
                Arc::new(NoMembers),
            )
            .unwrap();

        assert_eq!(
            registry.can_enable_dynamic_tile(&build_status(), &Variant::new("secondary")),
            Ok(())
        );
        assert_eq!(
            registry.can_enable_tile(&build_status(), &Variant::new("secondary")),
            Err(RegistryError::DynamicTileType(build_status()))
        );
        assert!(matches!(
            registry.can_enable_tile(&build_status(), &Variant::new("third")),
            Err(RegistryError::UndeclaredVariant { .. })
        ));
        assert_eq!(
            registry.can_enable_dynamic_tile(&TileType::new("ghost"), &Variant::default()),
            Err(RegistryError::UnregisteredTileType(TileType::new("ghost")))
        );
        assert!(registry.diagnostics().is_empty());

        registry.seal();
        assert!(matches!(
            registry.can_enable_dynamic_tile(&build_status(), &Variant::default()),
            Err(RegistryError::Sealed { .. })
        ));
    }

    #[test]
    fn test_rejected_enable_is_recorded() {
        let mut registry = registered();
        let undeclared = registry.enable_tile(
            build_status(),
            Variant::new("third"),
            Arc::new(AcceptAll),
            "/c",
            0,
        );
        let unregistered = registry.enable_dynamic_tile(
            TileType::new("ghost"),
            Variant::default(),
            Arc::new(AcceptAll),
            Arc::new(NoMembers),
        );

        assert!(undeclared.is_err());
        assert!(unregistered.is_err());
        assert_eq!(
            registry.diagnostics(),
            [
                RegistryError::UndeclaredVariant {
                    tile_type: build_status(),
                    variant: Variant::new("third"),
                },
                RegistryError::UnregisteredTileType(TileType::new("ghost")),
            ]
        );
        assert!(matches!(
            registry.entry(&build_status()).unwrap().mode(),
            TileMode::Unset
        ));
    }

    #[test]
    fn test_writes_after_seal_fail() {
        let mut registry = registered();
        registry.seal();

        let result =
            registry.enable_tile(build_status(), Variant::default(), Arc::new(AcceptAll), "/a", 0);
        assert!(matches!(result, Err(RegistryError::Sealed { .. })));

        let result = registry.register_tile(TileType::new("late"), &[Variant::default()], "4.0.0");
        assert!(matches!(result, Err(RegistryError::Sealed { .. })));
        assert!(!registry.is_registered(&TileType::new("late")));
        assert_eq!(registry.diagnostics().len(), 2);
    }

    #[test]
    fn test_verify() {
        let mut registry = registered();
        registry
            .enable_tile(build_status(), Variant::default(), Arc::new(RequireId), "/a", 0)
            .unwrap();

        let ok = TileRequest::new(build_status(), Variant::default())
            .with_params(TileParams::new().with("id", 3));
        assert_eq!(registry.verify(&ok), Ok(()));

        let unknown = TileRequest::new(TileType::new("nope"), Variant::default());
        assert!(matches!(
            registry.verify(&unknown),
            Err(VerifyError::UnknownTileType(_))
        ));

        let undeclared = TileRequest::new(build_status(), Variant::new("third"));
        assert!(matches!(
            registry.verify(&undeclared),
            Err(VerifyError::UnknownVariant { .. })
        ));

        let disabled = TileRequest::new(build_status(), Variant::new("secondary"));
        assert!(matches!(
            registry.verify(&disabled),
            Err(VerifyError::DisabledVariant { .. })
        ));

        let invalid = TileRequest::new(build_status(), Variant::default());
        assert!(matches!(
            registry.verify(&invalid),
            Err(VerifyError::InvalidParams { .. })
        ));
    }

    #[test]
    fn test_tile_request_defaults_variant() {
        let request: TileRequest = serde_json::from_str(r#"{"type": "build-status"}"#).unwrap();
        assert_eq!(request.variant, Variant::default());
        assert!(request.params.is_empty());
    }
}
