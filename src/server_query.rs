use crate::bracket_engine::MatchUpdate;
use crate::types::*;
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, warn};

const USER_AGENT: &str = "bracket-tracker";

static CONNECT_PREFIX_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?i)^connect\s+").expect("valid regex"));

static SERVER_ADDRESS_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^([0-9.]+):([0-9]+)$").expect("valid regex"));

static SCORE_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"([0-9]+)\s*[-:]\s*([0-9]+)").expect("valid regex"));

/// Accepts `203.0.113.7:27015`, optionally prefixed with `connect`.
pub fn parse_server_address(link: &str) -> Option<ServerAddress> {
  let cleaned = CONNECT_PREFIX_RE.replace(link.trim(), "");
  let caps = SERVER_ADDRESS_RE.captures(cleaned.trim())?;
  let port = caps[2].parse::<u16>().ok()?;
  Some(ServerAddress {
    host: caps[1].to_string(),
    port,
  })
}

fn server_query_base(config: &AppConfig) -> Result<String, String> {
  let base = config.server_query_url.trim().trim_end_matches('/');
  if base.is_empty() {
    return Err("Server lookup is not configured; set SERVER_QUERY_URL.".to_string());
  }
  Ok(base.to_string())
}

pub fn query_server_info(config: &AppConfig, link: &str) -> Result<ServerInfo, String> {
  let base = server_query_base(config)?;
  let address =
    parse_server_address(link).ok_or_else(|| format!("Invalid server address: {}", link.trim()))?;
  let url = format!("{base}/{}:{}", address.host, address.port);
  debug!("Querying server status at {url}");

  let client = reqwest::blocking::Client::builder()
    .timeout(Duration::from_millis(SERVER_QUERY_TIMEOUT_MS))
    .build()
    .map_err(|e| format!("Server lookup client failed: {e}"))?;
  let resp = client
    .get(&url)
    .header("User-Agent", USER_AGENT)
    .send()
    .map_err(|e| format!("Server lookup request failed: {e}"))?;
  let status = resp.status();
  let body = resp.text().map_err(|e| format!("Server lookup read failed: {e}"))?;
  if !status.is_success() {
    warn!("Server lookup for {link} returned {status}");
    return Err(format!("Server lookup error {status}: {body}"));
  }
  let payload: ServerStatusPayload =
    serde_json::from_str(&body).map_err(|e| format!("Server lookup parse failed: {e}"))?;
  Ok(server_info_from_payload(payload))
}

pub fn server_info_from_payload(payload: ServerStatusPayload) -> ServerInfo {
  let non_blank = |value: Option<String>| value.filter(|s| !s.trim().is_empty());
  ServerInfo {
    name: non_blank(payload.name).unwrap_or_else(|| "CS2 Server".to_string()),
    map: non_blank(payload.map).unwrap_or_else(|| "Unknown".to_string()),
    players: payload.players.unwrap_or(0),
    max_players: payload.maxplayers.unwrap_or(0),
  }
}

// ── Score extraction ───────────────────────────────────────────────────

/// First `<digits> [-:] <digits>` pair in `text`, whitespace allowed around
/// the separator.
pub fn score_in_text(text: &str) -> Option<(i32, i32)> {
  let caps = SCORE_RE.captures(text)?;
  let score_a = caps[1].parse::<i32>().ok()?;
  let score_b = caps[2].parse::<i32>().ok()?;
  Some((score_a, score_b))
}

pub fn extract_score(info: &ServerInfo) -> Option<(i32, i32)> {
  score_in_text(&info.name).or_else(|| score_in_text(&info.map))
}

/// Folds a lookup result into a pending edit. The caller decides whether to
/// apply it.
pub fn apply_lookup(mut update: MatchUpdate, info: &ServerInfo) -> MatchUpdate {
  if !info.map.trim().is_empty() && info.map != "Unknown" {
    update.map = Some(Some(info.map.clone()));
  }
  if let Some((score_a, score_b)) = extract_score(info) {
    update.score_a = Some(Some(score_a));
    update.score_b = Some(Some(score_b));
  }
  update
}

#[cfg(test)]
mod tests {
  use super::*;

  fn info(name: &str, map: &str) -> ServerInfo {
    ServerInfo {
      name: name.to_string(),
      map: map.to_string(),
      players: 10,
      max_players: 10,
    }
  }

  #[test]
  fn test_parse_server_address_variants() {
    let expected = Some(ServerAddress {
      host: "203.0.113.7".to_string(),
      port: 27015,
    });
    assert_eq!(parse_server_address("203.0.113.7:27015"), expected);
    assert_eq!(parse_server_address("  CONNECT 203.0.113.7:27015 "), expected);
    assert_eq!(parse_server_address("connect   203.0.113.7:27015"), expected);
    assert_eq!(parse_server_address("connect\t203.0.113.7:27015"), expected);
    assert_eq!(parse_server_address("connect203.0.113.7:27015"), None);
    assert_eq!(parse_server_address("play.example.org:27015"), None);
    assert_eq!(parse_server_address("203.0.113.7"), None);
    assert_eq!(parse_server_address("203.0.113.7:"), None);
    assert_eq!(parse_server_address("203.0.113.7:99999"), None);
    assert_eq!(parse_server_address("203.0.113.7:27015 extra"), None);
  }

  #[test]
  fn test_score_found_in_name_then_map() {
    assert_eq!(extract_score(&info("Final | 13-7 | live", "de_mirage")), Some((13, 7)));
    assert_eq!(extract_score(&info("Final 1 : 0", "de_inferno 9-9")), Some((1, 0)));
    assert_eq!(extract_score(&info("CS2 Server", "de_nuke 2:1")), Some((2, 1)));
    assert_eq!(extract_score(&info("CS2 Server", "de_nuke")), None);
  }

  #[test]
  fn test_score_skips_runs_without_separator() {
    assert_eq!(score_in_text("server 42 round 3 - 5"), Some((3, 5)));
    assert_eq!(score_in_text("12-"), None);
    assert_eq!(score_in_text("-4"), None);
  }

  #[test]
  fn test_apply_lookup_merges_map_and_scores() {
    let pending = MatchUpdate {
      notes: Some(Some("server swap".to_string())),
      ..MatchUpdate::default()
    };
    let merged = apply_lookup(pending, &info("Match 8:6", "de_ancient"));
    assert_eq!(merged.map, Some(Some("de_ancient".to_string())));
    assert_eq!(merged.score_a, Some(Some(8)));
    assert_eq!(merged.score_b, Some(Some(6)));
    assert_eq!(merged.notes, Some(Some("server swap".to_string())));
  }

  #[test]
  fn test_apply_lookup_ignores_unknown_map() {
    let merged = apply_lookup(MatchUpdate::default(), &info("CS2 Server", "Unknown"));
    assert_eq!(merged, MatchUpdate::default());
  }

  #[test]
  fn test_payload_defaults_fill_blank_fields() {
    let payload: ServerStatusPayload =
      serde_json::from_str(r#"{"name":"","players":4,"maxplayers":10}"#).unwrap();
    let info = server_info_from_payload(payload);
    assert_eq!(info.name, "CS2 Server");
    assert_eq!(info.map, "Unknown");
    assert_eq!((info.players, info.max_players), (4, 10));
  }

  #[test]
  fn test_unconfigured_lookup_is_an_error() {
    let err = query_server_info(&AppConfig::default(), "203.0.113.7:27015").unwrap_err();
    assert!(err.contains("SERVER_QUERY_URL"), "{err}");
  }
}
