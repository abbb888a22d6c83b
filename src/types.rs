use serde::{Deserialize, Serialize};
use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use crate::bracket_engine::{Match, Team};

// ── Constants ──────────────────────────────────────────────────────────

pub const STATE_FILE_NAME: &str = "bracket_state.json";
pub const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:17880";
pub const DEFAULT_UI_DIR: &str = "ui";
pub const SERVER_QUERY_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_TOURNAMENT_NAME: &str = "Counter-Strike 2 Tournament";
pub const DEFAULT_TOURNAMENT_DATES: &str = "2026";
pub const DEFAULT_ORGANIZER: &str = "Organizing committee";

// ── Shared state type aliases ──────────────────────────────────────────

pub type SharedBracketStore = Arc<Mutex<BracketStore>>;

// ── Bracket state ──────────────────────────────────────────────────────

/// Everything that is persisted and exchanged through import/export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BracketState {
    pub teams: Vec<Team>,
    pub matches: Vec<Match>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tournament_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tournament_dates: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizer: Option<String>,
}

impl BracketState {
    pub fn apply_defaults(mut self, defaults: &TournamentDefaults) -> Self {
        if self.tournament_name.as_deref().map_or(true, |s| s.trim().is_empty()) {
            self.tournament_name = Some(defaults.name.clone());
        }
        if self.tournament_dates.as_deref().map_or(true, |s| s.trim().is_empty()) {
            self.tournament_dates = Some(defaults.dates.clone());
        }
        if self.organizer.as_deref().map_or(true, |s| s.trim().is_empty()) {
            self.organizer = Some(defaults.organizer.clone());
        }
        self
    }
}

/// The in-memory bracket plus the file it is persisted to.
pub struct BracketStore {
    pub state: BracketState,
    pub state_path: PathBuf,
    pub defaults: TournamentDefaults,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TournamentDefaults {
    pub name: String,
    pub dates: String,
    pub organizer: String,
}

impl Default for TournamentDefaults {
    fn default() -> Self {
        Self {
            name: DEFAULT_TOURNAMENT_NAME.to_string(),
            dates: DEFAULT_TOURNAMENT_DATES.to_string(),
            organizer: DEFAULT_ORGANIZER.to_string(),
        }
    }
}

// ── App config ─────────────────────────────────────────────────────────

/// Blank fields fall back to the environment, then to built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub state_path: String,
    pub http_addr: String,
    pub ui_dir: String,
    pub server_query_url: String,
    pub tournament_name: String,
    pub tournament_dates: String,
    pub organizer: String,
}

// ── Live server lookup types ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub name: String,
    pub map: String,
    pub players: u32,
    pub max_players: u32,
}

/// Raw payload of the server status API.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerStatusPayload {
    pub name: Option<String>,
    pub map: Option<String>,
    pub players: Option<u32>,
    pub maxplayers: Option<u32>,
}
