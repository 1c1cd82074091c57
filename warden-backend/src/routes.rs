use crate::AppState;
use crate::cache::SharedCache;
use crate::error::AppError;
use crate::roster;
use crate::search::search;
use crate::validation;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_macros::debug_handler;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warden_db::{Player, Server};

#[derive(Deserialize)]
pub(crate) struct CreateServerRequest {
    ip: String,
    name: String,
}

#[derive(Serialize)]
pub(crate) struct LoadResponse {
    server_ip: String,
    players: usize,
}

#[derive(Deserialize)]
pub(crate) struct SearchParams {
    #[serde(default)]
    q: String,
}

#[derive(Serialize)]
pub(crate) struct SearchResponse {
    players: Vec<Player>,
}

#[derive(Deserialize)]
pub(crate) struct AddPlayerRequest {
    ip: String,
    steam64: String,
    #[serde(default)]
    name: Option<String>,
}

/// The selected server's cache, or 404 if the server was never created.
async fn server_cache(state: &AppState, server_ip: &str) -> Result<SharedCache, AppError> {
    if !state.db.server_exists(server_ip).await? {
        return Err(AppError::ServerNotFound(server_ip.to_string()));
    }
    Ok(state.sessions.get_or_load(&state.db, server_ip).await?)
}

pub(crate) async fn list_servers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Server>>, AppError> {
    Ok(Json(state.db.list_servers().await?))
}

#[debug_handler]
pub(crate) async fn create_server(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateServerRequest>,
) -> Result<impl IntoResponse, AppError> {
    validation::validate_id("server ip", &payload.ip)?;
    validation::validate_server_name(&payload.name)?;

    let created = roster::ensure_server(&state.db, &payload.ip, &payload.name).await?;
    let server = state
        .db
        .get_server(&payload.ip)
        .await?
        .ok_or_else(|| AppError::ServerNotFound(payload.ip.clone()))?;

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(server)))
}

/// Select a server: rebuild its cache from the store.
#[debug_handler]
pub(crate) async fn load_server(
    State(state): State<Arc<AppState>>,
    Path(server_ip): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if !state.db.server_exists(&server_ip).await? {
        return Err(AppError::ServerNotFound(server_ip));
    }

    let cache = state.sessions.reload(&state.db, &server_ip).await?;
    let players = cache.lock().await.len();

    Ok(Json(LoadResponse { server_ip, players }))
}

#[debug_handler]
pub(crate) async fn search_players(
    State(state): State<Arc<AppState>>,
    Path(server_ip): Path<String>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, AppError> {
    let cache = server_cache(&state, &server_ip).await?;
    let cache = cache.lock().await;

    let players = search(&params.q, &cache).into_iter().cloned().collect();
    Ok(Json(SearchResponse { players }))
}

#[debug_handler]
pub(crate) async fn add_player(
    State(state): State<Arc<AppState>>,
    Path(server_ip): Path<String>,
    Json(payload): Json<AddPlayerRequest>,
) -> Result<impl IntoResponse, AppError> {
    validation::validate_id("player ip", &payload.ip)?;
    validation::validate_id("steam64", &payload.steam64)?;

    let cache = server_cache(&state, &server_ip).await?;
    let mut cache = cache.lock().await;

    roster::add_player(
        &state.db,
        &mut cache,
        &payload.ip,
        &payload.steam64,
        payload.name.as_deref(),
    )
    .await?;

    let player = cache.get(&payload.ip).cloned();
    Ok((StatusCode::CREATED, Json(player)))
}

#[debug_handler]
pub(crate) async fn delete_player(
    State(state): State<Arc<AppState>>,
    Path((server_ip, player_ip)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let cache = server_cache(&state, &server_ip).await?;
    let mut cache = cache.lock().await;

    roster::delete_player(&state.db, &mut cache, &player_ip).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[debug_handler]
pub(crate) async fn delete_account(
    State(state): State<Arc<AppState>>,
    Path((server_ip, player_ip, steam64)): Path<(String, String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let cache = server_cache(&state, &server_ip).await?;
    let mut cache = cache.lock().await;

    roster::delete_account(&state.db, &mut cache, &player_ip, &steam64).await?;

    Ok(StatusCode::NO_CONTENT)
}
