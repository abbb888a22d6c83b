use crate::bracket_engine::Team;
use crate::topology::TEAM_COUNT;
use std::collections::HashSet;

/// Placeholder roster used for a fresh bracket.
pub fn default_teams() -> Vec<Team> {
  (1..=TEAM_COUNT)
    .map(|n| Team {
      id: format!("team-{n}"),
      name: format!("Team {n}"),
      logo_url: None,
    })
    .collect()
}

pub fn validate_roster(teams: &[Team]) -> Result<(), String> {
  if teams.len() != TEAM_COUNT {
    return Err(format!(
      "Roster needs exactly {TEAM_COUNT} teams (got {}).",
      teams.len()
    ));
  }
  let mut seen = HashSet::new();
  for (position, team) in teams.iter().enumerate() {
    let id = team.id.trim();
    if id.is_empty() {
      return Err(format!("Team #{} has an empty id.", position + 1));
    }
    if team.name.trim().is_empty() {
      return Err(format!("Team {id} has an empty name."));
    }
    if !seen.insert(id) {
      return Err(format!("Duplicate team id: {id}"));
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_default_roster_is_valid() {
    let teams = default_teams();
    assert_eq!(teams.len(), 16);
    assert_eq!(teams[0].id, "team-1");
    assert_eq!(teams[15].name, "Team 16");
    assert!(validate_roster(&teams).is_ok());
  }

  #[test]
  fn test_roster_rejects_wrong_size() {
    let mut teams = default_teams();
    teams.pop();
    let err = validate_roster(&teams).unwrap_err();
    assert!(err.contains("got 15"), "{err}");
  }

  #[test]
  fn test_roster_rejects_duplicate_and_blank_entries() {
    let mut teams = default_teams();
    teams[3].id = "team-1".to_string();
    assert!(validate_roster(&teams).unwrap_err().contains("Duplicate"));

    let mut teams = default_teams();
    teams[5].name = "   ".to_string();
    assert!(validate_roster(&teams).unwrap_err().contains("empty name"));

    let mut teams = default_teams();
    teams[7].id = String::new();
    assert!(validate_roster(&teams).unwrap_err().contains("#8"));
  }
}
