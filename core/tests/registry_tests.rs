use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use tileboard_core::{
    BuildContext, BuildError, DynamicTileBuilder, HydrateOptions, HydratedVariant,
    ParamsValidator, TileConfigRegistry, TileParams, TileRoute, TileType, ValidationError,
    Variant,
};

struct AcceptAll;

impl ParamsValidator for AcceptAll {
    fn validate(&self, _params: &TileParams) -> Result<(), ValidationError> {
        Ok(())
    }
}

struct Fixed(Vec<TileRoute>);

#[async_trait]
impl DynamicTileBuilder for Fixed {
    async fn build(&self, _ctx: &BuildContext) -> Result<Vec<TileRoute>, BuildError> {
        Ok(self.0.clone())
    }
}

struct Unreachable;

#[async_trait]
impl DynamicTileBuilder for Unreachable {
    async fn build(&self, _ctx: &BuildContext) -> Result<Vec<TileRoute>, BuildError> {
        Err(BuildError::Upstream("connection refused".to_string()))
    }
}

/// Sleeps before answering
struct Delayed(Duration);

#[async_trait]
impl DynamicTileBuilder for Delayed {
    async fn build(&self, ctx: &BuildContext) -> Result<Vec<TileRoute>, BuildError> {
        tokio::time::sleep(self.0).await;
        Ok(vec![TileRoute::new(format!("/{}", ctx.tile_type), 0)])
    }
}

fn validator() -> Arc<dyn ParamsValidator> {
    Arc::new(AcceptAll)
}

fn register(registry: &mut TileConfigRegistry, tile_type: &str, variants: &[&str]) {
    let variants: Vec<Variant> = variants.iter().map(|v| Variant::new(*v)).collect();
    registry
        .register_tile(TileType::new(tile_type), &variants, "4.0.0")
        .unwrap();
}

#[tokio::test]
async fn test_build_status_scenario() {
    let mut registry = TileConfigRegistry::new();
    register(&mut registry, "build-status", &["default", "secondary"]);
    registry
        .enable_tile(
            TileType::new("build-status"),
            Variant::default(),
            validator(),
            "/tiles/build-status",
            1700,
        )
        .unwrap();
    registry.seal();

    let payload = registry.hydrate(&HydrateOptions::default()).await;

    assert_eq!(payload.entry_count(), 1);
    assert_eq!(
        payload.variant(&TileType::new("build-status"), &Variant::default()),
        Some(&HydratedVariant::Static {
            path: "/tiles/build-status".to_string(),
            initial_max_delay: 1700,
        })
    );
    assert!(payload
        .variant(&TileType::new("build-status"), &Variant::new("secondary"))
        .is_none());
}

#[tokio::test]
async fn test_enabled_variants_only() {
    let mut registry = TileConfigRegistry::new();
    register(&mut registry, "uptime", &["a", "b", "c"]);
    for variant in ["a", "c"] {
        registry
            .enable_tile(
                TileType::new("uptime"),
                Variant::new(variant),
                validator(),
                format!("/uptime/{variant}"),
                100,
            )
            .unwrap();
    }

    let payload = registry.hydrate(&HydrateOptions::default()).await;
    let entry = payload.tile_type(&TileType::new("uptime")).unwrap();
    let variants: Vec<&str> = entry.variants.keys().map(Variant::as_str).collect();

    assert_eq!(variants, vec!["a", "c"]);
    assert_eq!(entry.min_version, "4.0.0");
}

#[tokio::test]
async fn test_dynamic_wins_type_wide() {
    let mut registry = TileConfigRegistry::new();
    register(&mut registry, "checks", &["default", "other"]);
    registry
        .enable_dynamic_tile(
            TileType::new("checks"),
            Variant::default(),
            validator(),
            Arc::new(Fixed(vec![TileRoute::new("/checks/1", 0)])),
        )
        .unwrap();
    assert!(registry
        .enable_tile(
            TileType::new("checks"),
            Variant::new("other"),
            validator(),
            "/checks/static",
            0,
        )
        .is_err());

    let payload = registry.hydrate(&HydrateOptions::default()).await;
    let entry = payload.tile_type(&TileType::new("checks")).unwrap();

    assert_eq!(entry.variants.len(), 1);
    assert!(entry
        .variants
        .values()
        .all(|v| matches!(v, HydratedVariant::Dynamic { .. })));
}

#[tokio::test]
async fn test_register_twice_is_observably_identical() {
    let mut once = TileConfigRegistry::new();
    register(&mut once, "uptime", &["default"]);

    let mut twice = TileConfigRegistry::new();
    register(&mut twice, "uptime", &["default"]);
    register(&mut twice, "uptime", &["default"]);

    let uptime = TileType::new("uptime");
    assert_eq!(once.tile_types(), twice.tile_types());
    assert_eq!(
        once.entry(&uptime).unwrap().variants(),
        twice.entry(&uptime).unwrap().variants()
    );
    assert_eq!(once.min_version(&uptime), twice.min_version(&uptime));
    assert!(twice.diagnostics().is_empty());
}

#[tokio::test]
async fn test_last_enable_wins() {
    let mut registry = TileConfigRegistry::new();
    register(&mut registry, "uptime", &["default"]);
    for path in ["/p1", "/p2"] {
        registry
            .enable_tile(TileType::new("uptime"), Variant::default(), validator(), path, 0)
            .unwrap();
    }

    let payload = registry.hydrate(&HydrateOptions::default()).await;
    assert_eq!(
        payload.variant(&TileType::new("uptime"), &Variant::default()),
        Some(&HydratedVariant::Static {
            path: "/p2".to_string(),
            initial_max_delay: 0,
        })
    );
}

#[tokio::test]
async fn test_empty_builder_is_present() {
    let mut registry = TileConfigRegistry::new();
    register(&mut registry, "checks", &["default"]);
    registry
        .enable_dynamic_tile(
            TileType::new("checks"),
            Variant::default(),
            validator(),
            Arc::new(Fixed(Vec::new())),
        )
        .unwrap();

    let payload = registry.hydrate(&HydrateOptions::default()).await;

    assert_eq!(
        payload.variant(&TileType::new("checks"), &Variant::default()),
        Some(&HydratedVariant::Dynamic { tiles: Vec::new() })
    );
    assert!(payload.tile_type(&TileType::new("unregistered")).is_none());
}

#[tokio::test]
async fn test_builder_failure_is_isolated() {
    let mut registry = TileConfigRegistry::new();
    register(&mut registry, "a-checks", &["default"]);
    register(&mut registry, "b-status", &["default"]);
    registry
        .enable_dynamic_tile(
            TileType::new("a-checks"),
            Variant::default(),
            validator(),
            Arc::new(Unreachable),
        )
        .unwrap();
    registry
        .enable_tile(TileType::new("b-status"), Variant::default(), validator(), "/b", 10)
        .unwrap();

    let payload = registry.hydrate(&HydrateOptions::default()).await;

    assert!(matches!(
        payload.variant(&TileType::new("a-checks"), &Variant::default()),
        Some(HydratedVariant::Degraded { .. })
    ));
    assert_eq!(
        payload.variant(&TileType::new("b-status"), &Variant::default()),
        Some(&HydratedVariant::Static {
            path: "/b".to_string(),
            initial_max_delay: 10,
        })
    );
    assert_eq!(payload.errors.len(), 1);
    assert_eq!(payload.errors[0].tile_type, TileType::new("a-checks"));
    assert!(payload.errors[0].message.contains("connection refused"));
}

#[tokio::test(start_paused = true)]
async fn test_slow_builder_does_not_stall_other_types() {
    let mut registry = TileConfigRegistry::new();
    register(&mut registry, "a-slow", &["default"]);
    register(&mut registry, "b-fast", &["default"]);
    registry
        .enable_dynamic_tile(
            TileType::new("a-slow"),
            Variant::default(),
            validator(),
            Arc::new(Delayed(Duration::from_secs(60))),
        )
        .unwrap();
    registry
        .enable_dynamic_tile(
            TileType::new("b-fast"),
            Variant::default(),
            validator(),
            Arc::new(Delayed(Duration::from_millis(500))),
        )
        .unwrap();
    registry.seal();

    let options = HydrateOptions {
        builder_timeout: Duration::from_secs(1),
    };
    let started = tokio::time::Instant::now();
    let payload = registry.hydrate(&options).await;
    let elapsed = started.elapsed();

    assert_eq!(
        payload.variant(&TileType::new("b-fast"), &Variant::default()),
        Some(&HydratedVariant::Dynamic {
            tiles: vec![TileRoute::new("/b-fast", 0)],
        })
    );
    assert!(matches!(
        payload.variant(&TileType::new("a-slow"), &Variant::default()),
        Some(HydratedVariant::Degraded { .. })
    ));
    assert_eq!(payload.errors.len(), 1);
    // builders run side by side: one timeout, not timeout + fast delay
    assert!(elapsed >= Duration::from_secs(1), "{:?}", elapsed);
    assert!(elapsed < Duration::from_millis(1500), "{:?}", elapsed);
}

#[tokio::test]
async fn test_hydration_order_is_deterministic() {
    let mut registry = TileConfigRegistry::new();
    for tile_type in ["zeta", "alpha", "mid"] {
        register(&mut registry, tile_type, &["default"]);
        registry
            .enable_tile(TileType::new(tile_type), Variant::default(), validator(), "/", 0)
            .unwrap();
    }

    let payload = registry.hydrate(&HydrateOptions::default()).await;
    let order: Vec<&str> = payload.tiles.iter().map(|t| t.tile_type.as_str()).collect();

    assert_eq!(order, vec!["alpha", "mid", "zeta"]);
}
