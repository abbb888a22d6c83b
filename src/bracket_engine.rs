use crate::topology::{
  match_id, round_layout, slot_keys, BestOf, Feed, Round, CURRENT_LAYOUT, LEGACY_LAYOUT, ROUTES,
  TEAM_COUNT,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
  pub id: String,
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub logo_url: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
  #[default]
  Scheduled,
  Live,
  Done,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
  pub id: String,
  pub round: Round,
  pub index: u32,
  #[serde(default)]
  pub team_a_id: Option<String>,
  #[serde(default)]
  pub team_b_id: Option<String>,
  #[serde(default)]
  pub score_a: Option<i32>,
  #[serde(default)]
  pub score_b: Option<i32>,
  pub best_of: BestOf,
  #[serde(default)]
  pub status: MatchStatus,
  #[serde(default)]
  pub winner_id: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub map: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub start_time: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub server_link: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub streams: Option<Vec<String>>,
}

impl Match {
  pub fn empty(round: Round, index: u32, best_of: BestOf) -> Self {
    Match {
      id: match_id(round, index),
      round,
      index,
      team_a_id: None,
      team_b_id: None,
      score_a: None,
      score_b: None,
      best_of,
      status: MatchStatus::Scheduled,
      winner_id: None,
      map: None,
      start_time: None,
      notes: None,
      server_link: None,
      streams: None,
    }
  }

  pub fn key(&self) -> (Round, u32) {
    (self.round, self.index)
  }

  pub fn is_tied(&self) -> bool {
    matches!((self.score_a, self.score_b), (Some(a), Some(b)) if a == b)
  }
}

/// Partial edit of one match. Nullable fields are double options: the outer
/// `None` leaves the field alone, `Some(None)` clears it. Identity fields and
/// `winnerId` are not part of an update; serde drops them if a client sends them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchUpdate {
  #[serde(default, deserialize_with = "deserialize_some", skip_serializing_if = "Option::is_none")]
  pub team_a_id: Option<Option<String>>,
  #[serde(default, deserialize_with = "deserialize_some", skip_serializing_if = "Option::is_none")]
  pub team_b_id: Option<Option<String>>,
  #[serde(default, deserialize_with = "deserialize_some", skip_serializing_if = "Option::is_none")]
  pub score_a: Option<Option<i32>>,
  #[serde(default, deserialize_with = "deserialize_some", skip_serializing_if = "Option::is_none")]
  pub score_b: Option<Option<i32>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub best_of: Option<BestOf>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub status: Option<MatchStatus>,
  #[serde(default, deserialize_with = "deserialize_some", skip_serializing_if = "Option::is_none")]
  pub map: Option<Option<String>>,
  #[serde(default, deserialize_with = "deserialize_some", skip_serializing_if = "Option::is_none")]
  pub start_time: Option<Option<String>>,
  #[serde(default, deserialize_with = "deserialize_some", skip_serializing_if = "Option::is_none")]
  pub notes: Option<Option<String>>,
  #[serde(default, deserialize_with = "deserialize_some", skip_serializing_if = "Option::is_none")]
  pub server_link: Option<Option<String>>,
  #[serde(default, deserialize_with = "deserialize_some", skip_serializing_if = "Option::is_none")]
  pub streams: Option<Option<Vec<String>>>,
}

impl MatchUpdate {
  pub fn scores(score_a: i32, score_b: i32) -> Self {
    MatchUpdate {
      score_a: Some(Some(score_a)),
      score_b: Some(Some(score_b)),
      ..MatchUpdate::default()
    }
  }

  pub fn with_status(mut self, status: MatchStatus) -> Self {
    self.status = Some(status);
    self
  }

  fn merge_into(self, target: &mut Match) {
    merge_field(&mut target.team_a_id, self.team_a_id);
    merge_field(&mut target.team_b_id, self.team_b_id);
    merge_field(&mut target.score_a, self.score_a);
    merge_field(&mut target.score_b, self.score_b);
    merge_field(&mut target.best_of, self.best_of);
    merge_field(&mut target.status, self.status);
    merge_field(&mut target.map, self.map);
    merge_field(&mut target.start_time, self.start_time);
    merge_field(&mut target.notes, self.notes);
    merge_field(&mut target.server_link, self.server_link);
    merge_field(&mut target.streams, self.streams);
  }
}

fn merge_field<T>(target: &mut T, value: Option<T>) {
  if let Some(value) = value {
    *target = value;
  }
}

fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
  T: Deserialize<'de>,
  D: Deserializer<'de>,
{
  T::deserialize(deserializer).map(Some)
}

// ── Outcome resolver ───────────────────────────────────────────────────

fn team_ref(id: &Option<String>) -> Option<&str> {
  id.as_deref().filter(|id| !id.is_empty())
}

/// `(winning side's team, losing side's team)` when the score is decisive.
fn decided_sides(m: &Match) -> Option<(Option<&str>, Option<&str>)> {
  let (score_a, score_b) = (m.score_a?, m.score_b?);
  match score_a.cmp(&score_b) {
    Ordering::Greater => Some((team_ref(&m.team_a_id), team_ref(&m.team_b_id))),
    Ordering::Less => Some((team_ref(&m.team_b_id), team_ref(&m.team_a_id))),
    Ordering::Equal => None,
  }
}

pub fn winner_of(m: &Match) -> Option<&str> {
  decided_sides(m).and_then(|(winner, _)| winner)
}

pub fn loser_of(m: &Match) -> Option<&str> {
  decided_sides(m).and_then(|(_, loser)| loser)
}

// ── Generator ──────────────────────────────────────────────────────────

pub fn generate_bracket(teams: &[Team]) -> Result<Vec<Match>, String> {
  if teams.len() != TEAM_COUNT {
    return Err(format!(
      "Bracket needs exactly {TEAM_COUNT} teams (got {}).",
      teams.len()
    ));
  }
  let matches = slot_keys(&CURRENT_LAYOUT)
    .into_iter()
    .map(|(round, index)| new_slot(round, index, teams))
    .collect();
  Ok(matches)
}

fn new_slot(round: Round, index: u32, teams: &[Team]) -> Match {
  let best_of = round_layout(&CURRENT_LAYOUT, round)
    .map(|entry| entry.best_of)
    .unwrap_or(BestOf::One);
  let mut slot = Match::empty(round, index, best_of);
  if round.is_opening() && teams.len() == TEAM_COUNT {
    let first = (index as usize - 1) * 2;
    slot.team_a_id = teams.get(first).map(|team| team.id.clone());
    slot.team_b_id = teams.get(first + 1).map(|team| team.id.clone());
  }
  slot
}

// ── Propagation ────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
enum FeedResolution {
  Ready(String),
  Pending,
  Missing,
}

impl FeedResolution {
  fn team(self) -> Option<Option<String>> {
    match self {
      FeedResolution::Ready(id) => Some(Some(id)),
      FeedResolution::Pending => Some(None),
      FeedResolution::Missing => None,
    }
  }
}

fn slot_positions(matches: &[Match]) -> HashMap<(Round, u32), usize> {
  let mut positions = HashMap::new();
  for (position, m) in matches.iter().enumerate() {
    positions.entry(m.key()).or_insert(position);
  }
  positions
}

fn resolve_feed(
  matches: &[Match],
  positions: &HashMap<(Round, u32), usize>,
  feed: Feed,
) -> FeedResolution {
  let Some(source) = positions.get(&feed.source()).and_then(|idx| matches.get(*idx)) else {
    return FeedResolution::Missing;
  };
  let has_winner = team_ref(&source.winner_id).is_some();
  let is_done = source.status == MatchStatus::Done;
  let team = match feed {
    Feed::Winner(..) => match team_ref(&source.winner_id) {
      Some(cached) => Some(cached),
      None if is_done => winner_of(source),
      None => None,
    },
    Feed::Loser(..) => {
      if has_winner || is_done {
        loser_of(source)
      } else {
        None
      }
    }
  };
  match team {
    Some(id) => FeedResolution::Ready(id.to_string()),
    None => FeedResolution::Pending,
  }
}

/// LB3[1] and LB3[2] keep a result already marked done when their
/// participants are recomputed. Every other slot drops its score on a
/// participant change.
fn keeps_done_result(slot: &Match) -> bool {
  slot.round == Round::Lb3 && matches!(slot.index, 1 | 2) && slot.status == MatchStatus::Done
}

/// Recompute every routed slot's participants from its feeders, in route
/// order. A slot whose participants change loses its recorded result.
pub fn propagate(matches: &[Match]) -> Vec<Match> {
  let mut result = matches.to_vec();
  let positions = slot_positions(&result);

  for route in ROUTES.iter() {
    let Some(&target) = positions.get(&(route.round, route.index)) else {
      continue;
    };
    let [feed_a, feed_b] = route.feeds;
    let team_a = resolve_feed(&result, &positions, feed_a).team();
    let team_b = resolve_feed(&result, &positions, feed_b).team();
    let (Some(team_a), Some(team_b)) = (team_a, team_b) else {
      continue;
    };

    let slot = &mut result[target];
    let changed = slot.team_a_id != team_a || slot.team_b_id != team_b;
    slot.team_a_id = team_a;
    slot.team_b_id = team_b;
    if !changed {
      continue;
    }
    if keeps_done_result(slot) {
      slot.winner_id = winner_of(slot).map(str::to_string);
      debug!("{} participants changed; keeping its recorded result", slot.id);
    } else {
      slot.score_a = None;
      slot.score_b = None;
      slot.winner_id = None;
    }
  }

  result
}

// ── Edits ──────────────────────────────────────────────────────────────

pub fn apply_edit(matches: &[Match], match_id: &str, update: MatchUpdate) -> Vec<Match> {
  let Some(position) = matches.iter().position(|m| m.id == match_id) else {
    warn!("Match with id {match_id} not found; edit ignored");
    return matches.to_vec();
  };

  let mut updated = matches.to_vec();
  let slot = &mut updated[position];
  update.merge_into(slot);
  slot.winner_id = winner_of(slot).map(str::to_string);
  if slot.is_tied() {
    debug!("{} recorded as a tie; nothing propagates from it", slot.id);
  }

  propagate(&updated)
}

// ── Structure migration ────────────────────────────────────────────────

/// Topology slots with no match in the set, in topology order.
pub fn missing_slots(matches: &[Match]) -> Vec<(Round, u32)> {
  let present: HashSet<(Round, u32)> = matches.iter().map(Match::key).collect();
  slot_keys(&CURRENT_LAYOUT)
    .into_iter()
    .filter(|key| !present.contains(key))
    .collect()
}

pub fn is_legacy_shape(matches: &[Match]) -> bool {
  let count = |round: Round| matches.iter().filter(|m| m.round == round).count() as u32;
  [Round::Lb3, Round::Lb4].into_iter().all(|round| {
    round_layout(&LEGACY_LAYOUT, round).map(|entry| entry.slots) == Some(count(round))
  })
}

#[derive(Clone, Debug)]
struct SlotSnapshot {
  team_a_id: Option<String>,
  team_b_id: Option<String>,
  status: MatchStatus,
  score_a: Option<i32>,
  score_b: Option<i32>,
  winner_id: Option<String>,
}

impl SlotSnapshot {
  fn of(m: &Match) -> Self {
    SlotSnapshot {
      team_a_id: m.team_a_id.clone(),
      team_b_id: m.team_b_id.clone(),
      status: m.status,
      score_a: m.score_a,
      score_b: m.score_b,
      winner_id: m.winner_id.clone(),
    }
  }
}

pub fn migrate(matches: &[Match], teams: &[Team]) -> Vec<Match> {
  let missing = missing_slots(matches);
  if missing.is_empty() {
    return matches.to_vec();
  }
  let legacy = is_legacy_shape(matches);

  let snapshots: Vec<SlotSnapshot> = matches.iter().map(SlotSnapshot::of).collect();
  let mut augmented = matches.to_vec();
  augmented.extend(
    missing
      .iter()
      .map(|&(round, index)| new_slot(round, index, teams)),
  );

  let mut migrated = propagate(&augmented);

  let mut restored = 0usize;
  for (slot, snapshot) in migrated.iter_mut().zip(snapshots.iter()) {
    if snapshot.status != MatchStatus::Done {
      continue;
    }
    if slot.team_a_id != snapshot.team_a_id || slot.team_b_id != snapshot.team_b_id {
      continue;
    }
    if slot.score_a != snapshot.score_a
      || slot.score_b != snapshot.score_b
      || slot.winner_id != snapshot.winner_id
    {
      restored += 1;
    }
    slot.score_a = snapshot.score_a;
    slot.score_b = snapshot.score_b;
    slot.winner_id = snapshot.winner_id.clone();
    slot.status = snapshot.status;
  }

  info!(
    "Migrated {} bracket structure: added {} slot(s), restored {} result(s)",
    if legacy { "legacy" } else { "incomplete" },
    missing.len(),
    restored
  );
  migrated
}

// ── Reset ──────────────────────────────────────────────────────────────

pub fn reset(matches: &[Match]) -> Vec<Match> {
  matches
    .iter()
    .cloned()
    .map(|mut m| {
      if !m.round.is_opening() {
        m.team_a_id = None;
        m.team_b_id = None;
      }
      m.score_a = None;
      m.score_b = None;
      m.winner_id = None;
      m.status = MatchStatus::Scheduled;
      m
    })
    .collect()
}
