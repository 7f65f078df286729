use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::http::{HeaderValue, Method};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{Router, routing::get};
use tower_http::cors::{AllowOrigin, CorsLayer};

use super::account::account_router;
use super::admin::admin_router;
use super::analytics::analytics_router;
use super::catalog::catalog_router;
use crate::content::ContentStorage;
use crate::store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub content: ContentStorage,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, data_dir: &Path) -> Self {
        Self {
            content: ContentStorage::new(data_dir),
            store,
        }
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_credentials(true)
        .allow_headers([axum::http::header::CONTENT_TYPE])
}

pub fn create_router(state: Arc<AppState>, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/auth", account_router())
        .nest("/api/admin", admin_router())
        .nest("/api/analytics", analytics_router())
        .nest("/api", catalog_router())
        .layer(cors_layer(allowed_origins))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
