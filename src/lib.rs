#![recursion_limit = "512"]

pub mod ai;
pub mod api;
pub mod config;
pub mod logic;
pub mod model;
pub mod seed;
pub mod store;

use axum::{extract::DefaultBodyLimit, http::HeaderValue, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
};

// Export API types
pub use api::handlers;
pub use api::routes;
pub use api::AppState;

// Export all model types
pub use model::*;

// Export store types
pub use store::{MemoryStore, PostgresStore, Store};

/// Slack on top of the upload limit for the JSON envelope around the file
const REQUEST_OVERHEAD_BYTES: usize = 64 * 1024;

/// Assemble the full application: API routes, body limit, CORS and the
/// optional static frontend
pub fn build_app<S: Store + 'static>(state: AppState<S>) -> Router {
    let config = state.config.clone();

    let mut app = routes::create_router::<S>();
    if let Some(dir) = &config.server.static_dir {
        log::info!("Serving frontend from {}", dir);
        let index = std::path::Path::new(dir).join("index.html");
        app = app.fallback_service(ServeDir::new(dir).fallback(ServeFile::new(index)));
    }

    // base64 inflates uploads by a third
    let body_limit = config.uploads.max_bytes / 3 * 4 + REQUEST_OVERHEAD_BYTES;

    app.layer(DefaultBodyLimit::max(body_limit))
        .layer(cors_layer(config.server.cors_origin.as_deref()))
        .with_state(state)
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    match origin.and_then(|origin| HeaderValue::from_str(origin).ok()) {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::permissive(),
    }
}
