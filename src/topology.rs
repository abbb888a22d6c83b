use serde::{Deserialize, Serialize};
use std::fmt;

pub const TEAM_COUNT: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Round {
  #[serde(rename = "R16")]
  R16,
  #[serde(rename = "QF")]
  Qf,
  #[serde(rename = "SF")]
  Sf,
  #[serde(rename = "UF")]
  Uf,
  #[serde(rename = "LB1")]
  Lb1,
  #[serde(rename = "LB2")]
  Lb2,
  #[serde(rename = "LB3")]
  Lb3,
  #[serde(rename = "LB4")]
  Lb4,
  #[serde(rename = "LF")]
  Lf,
  #[serde(rename = "GF")]
  Gf,
}

impl Round {
  pub fn as_str(self) -> &'static str {
    match self {
      Round::R16 => "R16",
      Round::Qf => "QF",
      Round::Sf => "SF",
      Round::Uf => "UF",
      Round::Lb1 => "LB1",
      Round::Lb2 => "LB2",
      Round::Lb3 => "LB3",
      Round::Lb4 => "LB4",
      Round::Lf => "LF",
      Round::Gf => "GF",
    }
  }

  /// Lowercase prefix used in match ids (`qf-2`, `lb3-1`).
  pub fn id_prefix(self) -> &'static str {
    match self {
      Round::R16 => "r16",
      Round::Qf => "qf",
      Round::Sf => "sf",
      Round::Uf => "uf",
      Round::Lb1 => "lb1",
      Round::Lb2 => "lb2",
      Round::Lb3 => "lb3",
      Round::Lb4 => "lb4",
      Round::Lf => "lf",
      Round::Gf => "gf",
    }
  }

  pub fn is_opening(self) -> bool {
    self == Round::R16
  }

  pub fn is_lower(self) -> bool {
    matches!(self, Round::Lb1 | Round::Lb2 | Round::Lb3 | Round::Lb4 | Round::Lf)
  }
}

impl fmt::Display for Round {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum BestOf {
  One,
  Three,
  Five,
}

impl BestOf {
  pub fn games(self) -> u8 {
    match self {
      BestOf::One => 1,
      BestOf::Three => 3,
      BestOf::Five => 5,
    }
  }
}

impl TryFrom<u8> for BestOf {
  type Error = String;

  fn try_from(value: u8) -> Result<Self, Self::Error> {
    match value {
      1 => Ok(BestOf::One),
      3 => Ok(BestOf::Three),
      5 => Ok(BestOf::Five),
      other => Err(format!("bestOf must be 1, 3 or 5 (got {other})")),
    }
  }
}

impl From<BestOf> for u8 {
  fn from(value: BestOf) -> Self {
    value.games()
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoundLayout {
  pub round: Round,
  pub slots: u32,
  pub best_of: BestOf,
}

const fn layout(round: Round, slots: u32, best_of: BestOf) -> RoundLayout {
  RoundLayout { round, slots, best_of }
}

/// Slot layout generated for new brackets, in dependency order.
pub const CURRENT_LAYOUT: [RoundLayout; 10] = [
  layout(Round::R16, 8, BestOf::One),
  layout(Round::Qf, 4, BestOf::Three),
  layout(Round::Sf, 2, BestOf::Three),
  layout(Round::Uf, 1, BestOf::Three),
  layout(Round::Lb1, 4, BestOf::One),
  layout(Round::Lb2, 4, BestOf::One),
  layout(Round::Lb3, 3, BestOf::One),
  layout(Round::Lb4, 2, BestOf::One),
  layout(Round::Lf, 1, BestOf::Three),
  layout(Round::Gf, 1, BestOf::Five),
];

/// Earlier layout with a two-slot LB3 and a single LB4. Only ever read back
/// from saved brackets; the migrator upgrades it to `CURRENT_LAYOUT`.
pub const LEGACY_LAYOUT: [RoundLayout; 10] = [
  layout(Round::R16, 8, BestOf::One),
  layout(Round::Qf, 4, BestOf::Three),
  layout(Round::Sf, 2, BestOf::Three),
  layout(Round::Uf, 1, BestOf::Three),
  layout(Round::Lb1, 4, BestOf::One),
  layout(Round::Lb2, 4, BestOf::One),
  layout(Round::Lb3, 2, BestOf::One),
  layout(Round::Lb4, 1, BestOf::One),
  layout(Round::Lf, 1, BestOf::Three),
  layout(Round::Gf, 1, BestOf::Five),
];

pub fn round_layout(layouts: &[RoundLayout], round: Round) -> Option<RoundLayout> {
  layouts.iter().copied().find(|entry| entry.round == round)
}

pub fn slot_keys(layouts: &[RoundLayout]) -> Vec<(Round, u32)> {
  layouts
    .iter()
    .flat_map(|entry| (1..=entry.slots).map(move |index| (entry.round, index)))
    .collect()
}

pub fn slot_count(layouts: &[RoundLayout]) -> usize {
  layouts.iter().map(|entry| entry.slots as usize).sum()
}

pub fn match_id(round: Round, index: u32) -> String {
  format!("{}-{}", round.id_prefix(), index)
}

/// Where one participant of a slot comes from. Indices are 1-based, like
/// `Match::index`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Feed {
  Winner(Round, u32),
  Loser(Round, u32),
}

impl Feed {
  pub fn source(self) -> (Round, u32) {
    match self {
      Feed::Winner(round, index) | Feed::Loser(round, index) => (round, index),
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Route {
  pub round: Round,
  pub index: u32,
  pub feeds: [Feed; 2],
}

const fn route(round: Round, index: u32, side_a: Feed, side_b: Feed) -> Route {
  Route {
    round,
    index,
    feeds: [side_a, side_b],
  }
}

const fn w(round: Round, index: u32) -> Feed {
  Feed::Winner(round, index)
}

const fn l(round: Round, index: u32) -> Feed {
  Feed::Loser(round, index)
}

/// Every non-opening slot and its two feeders. Order matters: a slot is
/// listed only after all of its feeders, so a single pass settles the
/// whole bracket.
pub const ROUTES: [Route; 22] = [
  // upper bracket
  route(Round::Qf, 1, w(Round::R16, 1), w(Round::R16, 2)),
  route(Round::Qf, 2, w(Round::R16, 3), w(Round::R16, 4)),
  route(Round::Qf, 3, w(Round::R16, 5), w(Round::R16, 6)),
  route(Round::Qf, 4, w(Round::R16, 7), w(Round::R16, 8)),
  route(Round::Sf, 1, w(Round::Qf, 1), w(Round::Qf, 2)),
  route(Round::Sf, 2, w(Round::Qf, 3), w(Round::Qf, 4)),
  route(Round::Uf, 1, w(Round::Sf, 1), w(Round::Sf, 2)),
  // lower bracket
  route(Round::Lb1, 1, l(Round::R16, 1), l(Round::R16, 2)),
  route(Round::Lb1, 2, l(Round::R16, 3), l(Round::R16, 4)),
  route(Round::Lb1, 3, l(Round::R16, 5), l(Round::R16, 6)),
  route(Round::Lb1, 4, l(Round::R16, 7), l(Round::R16, 8)),
  route(Round::Lb2, 1, l(Round::Qf, 1), w(Round::Lb1, 1)),
  route(Round::Lb2, 2, l(Round::Qf, 2), w(Round::Lb1, 2)),
  route(Round::Lb2, 3, l(Round::Qf, 3), w(Round::Lb1, 3)),
  route(Round::Lb2, 4, l(Round::Qf, 4), w(Round::Lb1, 4)),
  route(Round::Lb3, 1, l(Round::Sf, 1), w(Round::Lb2, 1)),
  route(Round::Lb3, 2, l(Round::Sf, 2), w(Round::Lb2, 2)),
  route(Round::Lb3, 3, w(Round::Lb2, 3), w(Round::Lb2, 4)),
  route(Round::Lb4, 1, w(Round::Lb3, 1), w(Round::Lb3, 2)),
  route(Round::Lb4, 2, w(Round::Lb3, 3), w(Round::Lb4, 1)),
  // deciders
  route(Round::Lf, 1, l(Round::Uf, 1), w(Round::Lb4, 2)),
  route(Round::Gf, 1, w(Round::Uf, 1), w(Round::Lf, 1)),
];
