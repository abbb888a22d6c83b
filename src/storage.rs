use crate::bracket_engine::{generate_bracket, migrate, missing_slots, propagate, Match, Team};
use crate::roster::{default_teams, validate_roster};
use crate::topology::Round;
use crate::types::*;
use chrono::Local;
use serde_json::Value;
use std::{
  fs,
  path::{Path, PathBuf},
};
use tracing::{error, info, warn};

// ── File persistence ───────────────────────────────────────────────────

pub fn load_bracket_state(path: &Path) -> Result<Option<BracketState>, String> {
  if !path.is_file() {
    return Ok(None);
  }
  let data = fs::read_to_string(path).map_err(|e| format!("read bracket {}: {e}", path.display()))?;
  let state = serde_json::from_str::<BracketState>(&data)
    .map_err(|e| format!("parse bracket {}: {e}", path.display()))?;
  Ok(Some(state))
}

pub fn save_bracket_state(path: &Path, state: &BracketState) -> Result<(), String> {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).map_err(|e| format!("create dir {}: {e}", parent.display()))?;
  }
  let payload = serde_json::to_string_pretty(state).map_err(|e| e.to_string())?;
  fs::write(path, payload).map_err(|e| format!("write bracket {}: {e}", path.display()))
}

pub fn clear_bracket_state(path: &Path) -> Result<(), String> {
  if !path.exists() {
    return Ok(());
  }
  fs::remove_file(path).map_err(|e| format!("remove bracket {}: {e}", path.display()))
}

pub fn backup_path(path: &Path, stamp: &str) -> PathBuf {
  let stem = path
    .file_stem()
    .map(|s| s.to_string_lossy().to_string())
    .unwrap_or_else(|| "bracket_state".to_string());
  path.with_file_name(format!("{stem}.{stamp}.bak.json"))
}

/// Copies the saved file aside before it gets rewritten in a new shape.
/// Returns the backup location, or `None` when there was nothing to copy.
pub fn backup_bracket_state(path: &Path) -> Result<Option<PathBuf>, String> {
  if !path.is_file() {
    return Ok(None);
  }
  let stamp = Local::now().format("%Y%m%d-%H%M%S").to_string();
  let target = backup_path(path, &stamp);
  fs::copy(path, &target).map_err(|e| format!("backup bracket {}: {e}", target.display()))?;
  Ok(Some(target))
}

// ── Structure checks ───────────────────────────────────────────────────

/// A set counts as having a lower bracket when any lower round or the
/// grand final is present.
fn lacks_core_rounds(matches: &[Match]) -> bool {
  let has_lower = matches
    .iter()
    .any(|m| m.round.is_lower() || m.round == Round::Gf);
  let has_upper_final = matches.iter().any(|m| m.round == Round::Uf);
  !has_lower || !has_upper_final
}

pub fn needs_structural_upgrade(state: &BracketState) -> bool {
  lacks_core_rounds(&state.matches) || !missing_slots(&state.matches).is_empty()
}

fn fresh_bracket(teams: Vec<Team>) -> Result<BracketState, String> {
  let teams = if validate_roster(&teams).is_ok() {
    teams
  } else {
    warn!("Saved roster is not a valid {} team roster; using placeholder teams", teams.len());
    default_teams()
  };
  let matches = generate_bracket(&teams)?;
  Ok(BracketState {
    teams,
    matches,
    tournament_name: None,
    tournament_dates: None,
    organizer: None,
  })
}

/// Brings a bracket read from disk up to the current structure and fills
/// tournament metadata from `defaults`.
pub fn restore_loaded_state(state: BracketState, defaults: &TournamentDefaults) -> Result<BracketState, String> {
  let restored = if lacks_core_rounds(&state.matches) {
    info!("Saved bracket has no lower bracket or upper final; regenerating");
    let fresh = fresh_bracket(state.teams)?;
    BracketState {
      tournament_name: state.tournament_name,
      tournament_dates: state.tournament_dates,
      organizer: state.organizer,
      ..fresh
    }
  } else if !missing_slots(&state.matches).is_empty() {
    let matches = migrate(&state.matches, &state.teams);
    BracketState { matches, ..state }
  } else {
    state
  };
  Ok(restored.apply_defaults(defaults))
}

/// Loads the saved bracket, upgrading and re-saving it when its shape is
/// out of date, or starts a fresh placeholder bracket when none exists.
pub fn load_or_bootstrap(path: &Path, defaults: &TournamentDefaults) -> Result<BracketState, String> {
  let loaded = match load_bracket_state(path) {
    Ok(loaded) => loaded,
    Err(err) => {
      error!("{err}; starting a fresh bracket");
      if let Some(backup) = backup_bracket_state(path)? {
        warn!("Unreadable bracket kept at {}", backup.display());
      }
      None
    }
  };

  let Some(saved) = loaded else {
    let state = fresh_bracket(default_teams())?.apply_defaults(defaults);
    save_bracket_state(path, &state)?;
    info!("Created new bracket at {}", path.display());
    return Ok(state);
  };

  if !needs_structural_upgrade(&saved) {
    return restore_loaded_state(saved, defaults);
  }
  if let Some(backup) = backup_bracket_state(path)? {
    info!("Backed up bracket to {} before upgrading it", backup.display());
  }
  let state = restore_loaded_state(saved, defaults)?;
  save_bracket_state(path, &state)?;
  Ok(state)
}

// ── Import / export ────────────────────────────────────────────────────

pub fn export_bracket_state(state: &BracketState) -> Result<String, String> {
  serde_json::to_string_pretty(state).map_err(|e| format!("export bracket: {e}"))
}

pub fn import_bracket_state(text: &str, defaults: &TournamentDefaults) -> Result<BracketState, String> {
  let value: Value = serde_json::from_str(text).map_err(|e| format!("Import is not valid JSON: {e}"))?;
  let has_array = |key: &str| value.get(key).map_or(false, Value::is_array);
  if !has_array("teams") || !has_array("matches") {
    return Err("Import must contain \"teams\" and \"matches\" arrays.".to_string());
  }
  let state: BracketState =
    serde_json::from_value(value).map_err(|e| format!("Import has an invalid bracket: {e}"))?;

  let matches = if missing_slots(&state.matches).is_empty() {
    propagate(&state.matches)
  } else {
    migrate(&state.matches, &state.teams)
  };
  Ok(BracketState { matches, ..state }.apply_defaults(defaults))
}
