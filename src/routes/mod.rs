// HTTP routes

mod error;
mod http;

pub use error::ApiError;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::sync_service::SyncService;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) sync: Arc<SyncService>,
}

pub fn app(sync: Arc<SyncService>) -> Router {
    let state = AppState { sync };
    Router::new()
        .route("/", get(http::index_handler)) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/update", post(http::update_handler)) // POST /update
        .route("/data", get(http::data_handler)) // GET /data
        .route("/history", get(http::history_handler)) // GET /history?limit=N
        .route("/reset", post(http::reset_handler)) // POST /reset
        .route("/get_command", get(http::get_command_handler)) // GET /get_command
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
