//! Tidewater Server - a reference remote store for the Tidewater engine.
//!
//! Serves any number of record collections over a small REST surface: list,
//! create, bulk upsert, find, replace, patch and delete. Records are kept in
//! memory and identified by `_id`.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod routes;

use crate::db::RecordStore;
use axum::Router;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone, Default)]
pub struct AppState {
    pub store: Arc<RecordStore>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Build the application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::create_routes())
        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
        )
        .with_state(state)
}
