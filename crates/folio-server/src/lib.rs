//! folio-server - content API for the portfolio site
//!
//! Routes:
//!
//! - `GET /content` returns the full snapshot with `lastUpdated`
//! - `POST /content` replaces one field: `{ "type": <key>, "content": <value> }`
//! - `POST /upload` stores a multipart `file` and returns its public URL
//! - `GET /uploads/*` serves stored uploads
//!
//! The content store lives in memory for the lifetime of the process.

pub mod content;
pub mod error;
pub mod upload;

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use folio_core::{Config, ContentStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ContentStore>,
    pub uploads_dir: PathBuf,
}

impl AppState {
    pub fn new(store: Arc<ContentStore>, uploads_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            uploads_dir: uploads_dir.into(),
        }
    }

    /// Fresh store with uploads under the configured data directory
    pub fn from_config(config: &Config) -> Self {
        Self::new(Arc::new(ContentStore::new()), config.uploads_dir())
    }
}

/// Build the router
///
/// `max_body` caps request bodies, uploads included.
pub fn app(state: AppState, max_body: usize) -> Router {
    let uploads = ServeDir::new(&state.uploads_dir);

    Router::new()
        .route(
            "/content",
            get(content::get_content).post(content::post_content),
        )
        .route("/upload", post(upload::upload))
        .nest_service("/uploads", uploads)
        .layer(DefaultBodyLimit::max(max_body))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
