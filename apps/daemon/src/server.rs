//! HTTP surface of the daemon: registry endpoints plus every monitorable route

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;

use tileboard_core::{
    ExpandError, HydrateOptions, HydrationPayload, Store, TileConfigRegistry, TileRequest,
    TileRoute, TileType, Variant, API_PREFIX, MINIMAL_VERSION,
};

#[derive(Clone)]
pub struct AppState {
    registry: Arc<TileConfigRegistry>,
    options: HydrateOptions,
}

/// Build the full router from a sealed store
pub fn app(store: Store, options: HydrateOptions) -> Router {
    let state = AppState {
        registry: Arc::new(store.registry),
        options,
    };

    Router::new()
        .route(&format!("{}/info", API_PREFIX), get(info))
        .route(&format!("{}/config", API_PREFIX), get(config))
        .route(&format!("{}/config/verify", API_PREFIX), post(verify))
        .route(&format!("{}/config/expand", API_PREFIX), post(expand))
        .with_state(state)
        .merge(store.router.into_router())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InfoResponse {
    version: &'static str,
    minimal_version: &'static str,
}

async fn info() -> Json<InfoResponse> {
    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION"),
        minimal_version: MINIMAL_VERSION,
    })
}

async fn config(State(state): State<AppState>) -> Json<HydrationPayload> {
    let payload = state.registry.hydrate(&state.options).await;
    if !payload.errors.is_empty() {
        log::warn!("Daemon: Hydration degraded {} entries", payload.errors.len());
    }
    Json(payload)
}

#[derive(Debug, Serialize)]
struct VerifyFailure {
    index: usize,
    #[serde(rename = "type")]
    tile_type: TileType,
    variant: Variant,
    message: String,
}

#[derive(Debug, Serialize)]
struct VerifyResponse {
    valid: bool,
    errors: Vec<VerifyFailure>,
}

async fn verify(
    State(state): State<AppState>,
    Json(requests): Json<Vec<TileRequest>>,
) -> Json<VerifyResponse> {
    let errors: Vec<_> = requests
        .into_iter()
        .enumerate()
        .filter_map(|(index, request)| {
            state
                .registry
                .verify(&request)
                .err()
                .map(|e| VerifyFailure {
                    index,
                    tile_type: request.tile_type,
                    variant: request.variant,
                    message: e.to_string(),
                })
        })
        .collect();

    Json(VerifyResponse {
        valid: errors.is_empty(),
        errors,
    })
}

struct ExpandFailure(ExpandError);

impl IntoResponse for ExpandFailure {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ExpandError::Verify(_) | ExpandError::NotDynamic(_) => StatusCode::BAD_REQUEST,
            ExpandError::Build { .. } => StatusCode::BAD_GATEWAY,
        };
        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

async fn expand(
    State(state): State<AppState>,
    Json(request): Json<TileRequest>,
) -> Result<Json<Vec<TileRoute>>, ExpandFailure> {
    state
        .registry
        .expand(&request, &state.options)
        .await
        .map(Json)
        .map_err(ExpandFailure)
}
