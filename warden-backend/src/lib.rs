pub mod cache;
pub mod config;
mod error;
pub mod helpers;
pub mod roster;
mod routes;
pub mod search;
mod validation;

use axum::{
    Router,
    http::StatusCode,
    routing::{delete, get, post},
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub struct AppState {
    pub db: warden_db::Database,
    /// Player caches of the servers selected so far
    pub sessions: cache::Sessions,
}

/// Create the dashboard router with the given store and limits
pub fn create_app(
    db: warden_db::Database,
    request_body_limit: usize,
    request_timeout: Duration,
) -> Router {
    let state = Arc::new(AppState {
        db,
        sessions: cache::Sessions::new(),
    });

    let server_routes = Router::new()
        .route("/servers", get(routes::list_servers).post(routes::create_server))
        .route("/servers/{server_ip}/load", post(routes::load_server))
        .route(
            "/servers/{server_ip}/players",
            get(routes::search_players).post(routes::add_player),
        )
        .route(
            "/servers/{server_ip}/players/{player_ip}",
            delete(routes::delete_player),
        )
        .route(
            "/servers/{server_ip}/players/{player_ip}/accounts/{steam64}",
            delete(routes::delete_account),
        );

    Router::new()
        .route("/health", get(|| async { StatusCode::OK }))
        .merge(server_routes)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(RequestBodyLimitLayer::new(request_body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
