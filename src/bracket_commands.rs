use crate::bracket_engine::{apply_edit, generate_bracket, reset, MatchUpdate, Team};
use crate::roster::validate_roster;
use crate::server_query::{apply_lookup, query_server_info};
use crate::storage::{export_bracket_state, import_bracket_state, save_bracket_state};
use crate::types::*;
use tracing::{error, info};

// ── Helpers ─────────────────────────────────────────────────────────────

/// Lock the store and call `f` with it. The lock is held for the whole call,
/// so edits never interleave.
fn with_store<F, R>(store: &SharedBracketStore, f: F) -> Result<R, String>
where
    F: FnOnce(&mut BracketStore) -> Result<R, String>,
{
    let mut guard = store.lock().map_err(|e| e.to_string())?;
    f(&mut guard)
}

/// Write the current state to disk. A failed write is logged; the in-memory
/// state stays authoritative.
fn persist(store: &BracketStore) {
    if let Err(e) = save_bracket_state(&store.state_path, &store.state) {
        error!("Failed to persist bracket: {e}");
    }
}

// ── Commands ────────────────────────────────────────────────────────────

pub fn bracket_state(store: &SharedBracketStore) -> Result<BracketState, String> {
    with_store(store, |guard| Ok(guard.state.clone()))
}

/// Applies one edit and propagates it. `Ok(None)` means no match has `match_id`.
pub fn update_match(
    store: &SharedBracketStore,
    match_id: &str,
    update: MatchUpdate,
) -> Result<Option<BracketState>, String> {
    with_store(store, |guard| {
        if !guard.state.matches.iter().any(|m| m.id == match_id) {
            return Ok(None);
        }
        guard.state.matches = apply_edit(&guard.state.matches, match_id, update);
        persist(guard);
        Ok(Some(guard.state.clone()))
    })
}

pub fn save_teams(store: &SharedBracketStore, teams: Vec<Team>) -> Result<BracketState, String> {
    validate_roster(&teams)?;
    let matches = generate_bracket(&teams)?;
    with_store(store, |guard| {
        guard.state.teams = teams;
        guard.state.matches = matches;
        info!("Roster saved; bracket regenerated");
        persist(guard);
        Ok(guard.state.clone())
    })
}

pub fn reset_bracket(store: &SharedBracketStore) -> Result<BracketState, String> {
    with_store(store, |guard| {
        guard.state.matches = reset(&guard.state.matches);
        info!("Bracket reset");
        persist(guard);
        Ok(guard.state.clone())
    })
}

pub fn export_bracket(store: &SharedBracketStore) -> Result<String, String> {
    with_store(store, |guard| export_bracket_state(&guard.state))
}

pub fn import_bracket(store: &SharedBracketStore, text: &str) -> Result<BracketState, String> {
    with_store(store, |guard| {
        guard.state = import_bracket_state(text, &guard.defaults)?;
        info!(
            "Imported bracket with {} teams and {} matches",
            guard.state.teams.len(),
            guard.state.matches.len()
        );
        persist(guard);
        Ok(guard.state.clone())
    })
}

/// Looks up the live server of a match and returns the edit it suggests.
/// The store is only locked to read the server link, never during the
/// request. `Ok(None)` means no match has `match_id`.
pub fn lookup_match_server(
    store: &SharedBracketStore,
    config: &AppConfig,
    match_id: &str,
) -> Result<Option<MatchUpdate>, String> {
    let link = with_store(store, |guard| {
        Ok(guard
            .state
            .matches
            .iter()
            .find(|m| m.id == match_id)
            .map(|m| m.server_link.clone().unwrap_or_default()))
    })?;
    let Some(link) = link else {
        return Ok(None);
    };
    if link.trim().is_empty() {
        return Err(format!("Match {match_id} has no server link."));
    }
    let info = query_server_info(config, &link)?;
    Ok(Some(apply_lookup(MatchUpdate::default(), &info)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket_engine::MatchStatus;
    use crate::roster::default_teams;
    use crate::storage::load_bracket_state;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    fn make_store(name: &str) -> SharedBracketStore {
        let state_path: PathBuf = std::env::temp_dir()
            .join(format!("bracket-commands-{}-{name}", std::process::id()))
            .join(STATE_FILE_NAME);
        let teams = default_teams();
        let matches = generate_bracket(&teams).unwrap();
        let state = BracketState {
            teams,
            matches,
            tournament_name: None,
            tournament_dates: None,
            organizer: None,
        }
        .apply_defaults(&TournamentDefaults::default());
        Arc::new(Mutex::new(BracketStore {
            state,
            state_path,
            defaults: TournamentDefaults::default(),
        }))
    }

    fn state_path(store: &SharedBracketStore) -> PathBuf {
        store.lock().unwrap().state_path.clone()
    }

    #[test]
    fn test_update_match_propagates_and_persists() {
        let store = make_store("update");
        let update = MatchUpdate::scores(0, 1).with_status(MatchStatus::Done);
        let state = update_match(&store, "r16-1", update).unwrap().unwrap();

        let qf = state.matches.iter().find(|m| m.id == "qf-1").unwrap();
        assert_eq!(qf.team_a_id.as_deref(), Some("team-2"));
        let lb = state.matches.iter().find(|m| m.id == "lb1-1").unwrap();
        assert_eq!(lb.team_a_id.as_deref(), Some("team-1"));

        let saved = load_bracket_state(&state_path(&store)).unwrap().unwrap();
        assert_eq!(saved, state);
        let _ = std::fs::remove_dir_all(state_path(&store).parent().unwrap());
    }

    #[test]
    fn test_update_unknown_match_returns_none() {
        let store = make_store("unknown");
        let before = bracket_state(&store).unwrap();
        assert_eq!(update_match(&store, "lb3a-1", MatchUpdate::scores(1, 0)).unwrap(), None);
        assert_eq!(bracket_state(&store).unwrap(), before);
    }

    #[test]
    fn test_save_teams_validates_and_regenerates() {
        let store = make_store("teams");
        let mut teams = default_teams();
        teams.truncate(10);
        assert!(save_teams(&store, teams).is_err());

        let mut teams = default_teams();
        teams.reverse();
        let state = save_teams(&store, teams).unwrap();
        let first = state.matches.iter().find(|m| m.id == "r16-1").unwrap();
        assert_eq!(first.team_a_id.as_deref(), Some("team-16"));
        assert_eq!(state.tournament_name.as_deref(), Some(DEFAULT_TOURNAMENT_NAME));
        let _ = std::fs::remove_dir_all(state_path(&store).parent().unwrap());
    }

    #[test]
    fn test_reset_clears_results() {
        let store = make_store("reset");
        update_match(&store, "r16-2", MatchUpdate::scores(1, 0).with_status(MatchStatus::Done)).unwrap();
        let state = reset_bracket(&store).unwrap();
        assert!(state.matches.iter().all(|m| m.status == MatchStatus::Scheduled));
        assert!(state.matches.iter().all(|m| m.winner_id.is_none()));
        let _ = std::fs::remove_dir_all(state_path(&store).parent().unwrap());
    }

    #[test]
    fn test_export_then_import_keeps_state() {
        let store = make_store("import");
        update_match(&store, "r16-3", MatchUpdate::scores(1, 0).with_status(MatchStatus::Done)).unwrap();
        let text = export_bracket(&store).unwrap();
        reset_bracket(&store).unwrap();

        let imported = import_bracket(&store, &text).unwrap();
        let r16 = imported.matches.iter().find(|m| m.id == "r16-3").unwrap();
        assert_eq!(r16.winner_id.as_deref(), Some("team-5"));
        assert!(import_bracket(&store, "{\"teams\": []}").is_err());
        assert_eq!(bracket_state(&store).unwrap(), imported);
        let _ = std::fs::remove_dir_all(state_path(&store).parent().unwrap());
    }

    #[test]
    fn test_lookup_requires_server_link() {
        let store = make_store("lookup");
        let config = AppConfig::default();
        assert_eq!(lookup_match_server(&store, &config, "nope").unwrap(), None);
        let err = lookup_match_server(&store, &config, "gf-1").unwrap_err();
        assert!(err.contains("no server link"), "{err}");
    }
}
