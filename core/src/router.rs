//! Route groups handed to monitorables when they mount their endpoints

use axum::handler::Handler;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use crate::params::ValidationError;
use crate::tile::Variant;

/// Prefix of every API route
pub const API_PREFIX: &str = "/api/v1";

/// Accumulates monitorable routes during the startup phase
pub struct MonitorableRouter {
    prefix: String,
    router: Router,
    paths: Vec<String>,
}

impl Default for MonitorableRouter {
    fn default() -> Self {
        Self::new(API_PREFIX)
    }
}

impl MonitorableRouter {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.trim_end_matches('/').to_string(),
            router: Router::new(),
            paths: Vec::new(),
        }
    }

    /// Open the route group of one monitorable variant.
    ///
    /// Fails on variant names that are not a single plain segment, such as
    /// `*all` or `:a`.
    pub fn group(
        &mut self,
        monitorable_path: &str,
        variant: &Variant,
    ) -> Result<RouteGroup<'_>, RouteError> {
        let monitorable_path = check_segments(monitorable_path)?;
        if !is_segment(variant.as_str()) {
            return Err(RouteError::InvalidSegment(variant.to_string()));
        }
        let base = format!("{}/{}/{}", self.prefix, monitorable_path, variant);
        Ok(RouteGroup { router: self, base })
    }

    /// Every path mounted so far
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn into_router(self) -> Router {
        self.router
    }
}

/// Routes of one monitorable variant, all sharing the same base path
pub struct RouteGroup<'a> {
    router: &'a mut MonitorableRouter,
    base: String,
}

impl RouteGroup<'_> {
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Mount a GET route and return its full path
    pub fn get<H, T>(&mut self, path: &str, handler: H) -> Result<Route, RouteError>
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        let full = format!("{}/{}", self.base, check_segments(path)?);
        if self.router.paths.contains(&full) {
            // axum panics on overlapping routes
            log::warn!("Router: '{}' already mounted, keeping the first handler", full);
        } else {
            let router = std::mem::take(&mut self.router.router);
            self.router.router = router.route(&full, get(handler));
            self.router.paths.push(full.clone());
            log::debug!("Router: Mounted GET {}", full);
        }
        Ok(Route { path: full })
    }
}

/// Trim surrounding slashes and check every segment is `[a-z0-9_-]+`
fn check_segments(path: &str) -> Result<&str, RouteError> {
    let trimmed = path.trim_matches('/');
    if trimmed.split('/').all(is_segment) {
        Ok(trimmed)
    } else {
        Err(RouteError::InvalidSegment(path.to_string()))
    }
}

fn is_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("'{0}' is not a valid route segment, expected lowercase letters, digits, '-' or '_'")]
    InvalidSegment(String),
}

/// A mounted route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub path: String,
}

/// Errors returned by monitorable routes
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    InvalidParams(#[from] ValidationError),

    #[error("{0}")]
    NotFound(String),

    #[error("upstream error: {0}")]
    Upstream(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::InvalidParams(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
        };
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
