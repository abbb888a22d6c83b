pub mod types;
pub mod config;
pub mod topology;
pub mod bracket_engine;
pub mod roster;
pub mod storage;
pub mod server_query;
pub mod bracket_commands;

use types::*;
use config::*;
use bracket_engine::{MatchUpdate, Team};

use serde::Serialize;
use std::{
    fs,
    path::PathBuf,
    sync::{Arc, Mutex},
};
use axum::{
    extract::{Path, State as AxumState},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tracing::{info, error, warn};
use tracing_subscriber::EnvFilter;

// ── HTTP server state ──────────────────────────────────────────────────

#[derive(Clone)]
pub struct BracketServerState {
    pub store: SharedBracketStore,
}

// ── Response helpers ───────────────────────────────────────────────────

const NO_STORE_HEADERS: [(&str, &str); 3] = [
    ("Cache-Control", "no-store"),
    ("Pragma", "no-cache"),
    ("Expires", "0"),
];

fn json_response<T: Serialize>(status: StatusCode, payload: &T) -> Response {
    match serde_json::to_string(payload) {
        Ok(body) => (status, NO_STORE_HEADERS, [("Content-Type", "application/json")], body).into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, NO_STORE_HEADERS, message).into_response()
}

fn command_response<T: Serialize>(result: Result<T, String>) -> Response {
    match result {
        Ok(payload) => json_response(StatusCode::OK, &payload),
        Err(e) => error_response(StatusCode::BAD_REQUEST, e),
    }
}

fn not_found(match_id: &str) -> Response {
    error_response(StatusCode::NOT_FOUND, format!("Match {match_id} not found."))
}

// ── Handlers ───────────────────────────────────────────────────────────

async fn get_state_json(AxumState(state): AxumState<BracketServerState>) -> Response {
    command_response(bracket_commands::bracket_state(&state.store))
}

async fn post_match_update(
    AxumState(state): AxumState<BracketServerState>,
    Path(match_id): Path<String>,
    Json(update): Json<MatchUpdate>,
) -> Response {
    match bracket_commands::update_match(&state.store, &match_id, update) {
        Ok(Some(updated)) => json_response(StatusCode::OK, &updated),
        Ok(None) => not_found(&match_id),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

async fn post_match_lookup(
    AxumState(state): AxumState<BracketServerState>,
    Path(match_id): Path<String>,
) -> Response {
    let store = state.store.clone();
    let id = match_id.clone();
    let joined = tokio::task::spawn_blocking(move || {
        let config = load_config_inner()?;
        bracket_commands::lookup_match_server(&store, &config, &id)
    })
    .await;
    match joined {
        Ok(Ok(Some(update))) => json_response(StatusCode::OK, &update),
        Ok(Ok(None)) => not_found(&match_id),
        Ok(Err(e)) => {
            warn!("Server lookup for {match_id} failed: {e}");
            error_response(StatusCode::BAD_GATEWAY, e)
        }
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn put_teams(
    AxumState(state): AxumState<BracketServerState>,
    Json(teams): Json<Vec<Team>>,
) -> Response {
    command_response(bracket_commands::save_teams(&state.store, teams))
}

async fn post_reset(AxumState(state): AxumState<BracketServerState>) -> Response {
    command_response(bracket_commands::reset_bracket(&state.store))
}

async fn get_export(AxumState(state): AxumState<BracketServerState>) -> Response {
    match bracket_commands::export_bracket(&state.store) {
        Ok(body) => (
            StatusCode::OK,
            NO_STORE_HEADERS,
            [
                ("Content-Type", "application/json"),
                ("Content-Disposition", "attachment; filename=\"bracket.json\""),
            ],
            body,
        )
            .into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

async fn post_import(AxumState(state): AxumState<BracketServerState>, body: String) -> Response {
    command_response(bracket_commands::import_bracket(&state.store, &body))
}

// ── Bracket HTTP server ────────────────────────────────────────────────

pub fn bracket_router(state: BracketServerState, ui_dir: PathBuf) -> Router {
    Router::new()
        .route("/state.json", get(get_state_json))
        .route("/api/matches/:id", post(post_match_update))
        .route("/api/matches/:id/lookup", post(post_match_lookup))
        .route("/api/teams", put(put_teams))
        .route("/api/reset", post(post_reset))
        .route("/api/export", get(get_export))
        .route("/api/import", post(post_import))
        .fallback_service(ServeDir::new(ui_dir))
        .with_state(state)
}

async fn start_bracket_server(state: BracketServerState, ui_dir: PathBuf, addr: String) {
    let app = bracket_router(state, ui_dir);
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Bracket server failed to bind {addr}: {e}");
            return;
        }
    };
    info!("Bracket server listening at http://{addr}/");
    if let Err(e) = axum::serve(listener, app).await {
        error!("Bracket server error: {e}");
    }
}

fn bootstrap_store(config: &AppConfig) -> Result<BracketStore, String> {
    let state_path = state_path_from_config(config);
    let defaults = tournament_defaults(config);
    let state = storage::load_or_bootstrap(&state_path, &defaults)?;
    info!(
        "Loaded bracket from {} ({} matches)",
        state_path.display(),
        state.matches.len()
    );
    Ok(BracketStore {
        state,
        state_path,
        defaults,
    })
}

// ── Entry point ────────────────────────────────────────────────────────

pub fn run() {
    load_env_file();

    // Initialize tracing with file output
    let logs_dir = logs_dir();
    fs::create_dir_all(&logs_dir).ok();
    let file_appender = tracing_appender::rolling::daily(&logs_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(non_blocking)
        .with_ansi(false)
        .init();
    info!("Bracket Tracker starting");
    log_env_warnings();

    let config = match load_config_inner() {
        Ok(config) => config,
        Err(e) => {
            error!("{e}; using defaults");
            apply_env_defaults(AppConfig::default())
        }
    };
    let store = match bootstrap_store(&config) {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to load bracket: {e}");
            return;
        }
    };
    let state = BracketServerState {
        store: Arc::new(Mutex::new(store)),
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start async runtime: {e}");
            return;
        }
    };
    runtime.block_on(start_bracket_server(
        state,
        ui_dir_from_config(&config),
        http_addr_from_config(&config),
    ));
}
