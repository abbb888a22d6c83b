use crate::types::*;
use std::{
  env, fs,
  path::{Path, PathBuf},
};

pub fn repo_root() -> PathBuf {
  PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

pub fn resolve_repo_path(raw: &str) -> PathBuf {
  let path = PathBuf::from(raw);
  if path.is_absolute() {
    path
  } else {
    repo_root().join(path)
  }
}

pub fn config_path() -> PathBuf {
  repo_root().join("config.json")
}

pub fn logs_dir() -> PathBuf {
  repo_root().join("logs")
}

pub fn env_default(key: &str) -> Option<String> {
  env::var(key)
    .ok()
    .map(|value| value.trim().to_string())
    .filter(|value| !value.is_empty())
}

fn fill_from_env(field: &mut String, key: &str) {
  if field.trim().is_empty() {
    if let Some(value) = env_default(key) {
      *field = value;
    }
  }
}

pub fn apply_env_defaults(mut config: AppConfig) -> AppConfig {
  fill_from_env(&mut config.state_path, "BRACKET_STATE_PATH");
  fill_from_env(&mut config.http_addr, "BRACKET_HTTP_ADDR");
  fill_from_env(&mut config.ui_dir, "BRACKET_UI_DIR");
  fill_from_env(&mut config.server_query_url, "SERVER_QUERY_URL");
  fill_from_env(&mut config.tournament_name, "TOURNAMENT_NAME");
  fill_from_env(&mut config.tournament_dates, "TOURNAMENT_DATES");
  fill_from_env(&mut config.organizer, "TOURNAMENT_ORGANIZER");
  config
}

pub fn load_config_inner() -> Result<AppConfig, String> {
  let path = config_path();
  if !path.is_file() {
    return Ok(apply_env_defaults(AppConfig::default()));
  }
  let data = fs::read_to_string(&path).map_err(|e| format!("read config {}: {e}", path.display()))?;
  let config =
    serde_json::from_str::<AppConfig>(&data).map_err(|e| format!("parse config {}: {e}", path.display()))?;
  Ok(apply_env_defaults(config))
}

pub fn env_file_path() -> PathBuf {
  repo_root().join(".env")
}

pub fn load_env_file() {
  let path = env_file_path();
  match load_env_file_from(&path) {
    Ok(0) => {}
    Ok(count) => tracing::debug!("Loaded {count} setting(s) from {}", path.display()),
    Err(e) => tracing::warn!("{e}"),
  }
}

/// Exports every `KEY=value` line of `path` that is not already set in the
/// environment. Returns how many variables were set.
pub fn load_env_file_from(path: &Path) -> Result<usize, String> {
  if !path.is_file() {
    return Ok(0);
  }
  let contents = fs::read_to_string(path).map_err(|e| format!("read env file {}: {e}", path.display()))?;
  let mut count = 0;
  for (key, value) in contents.lines().filter_map(parse_env_line) {
    if env::var_os(&key).is_none() {
      env::set_var(key, value);
      count += 1;
    }
  }
  Ok(count)
}

fn strip_matching_quotes(value: &str) -> Option<&str> {
  ['"', '\'']
    .into_iter()
    .find_map(|quote| value.strip_prefix(quote)?.strip_suffix(quote))
}

fn strip_inline_comment(value: &str) -> &str {
  value.split_once('#').map_or(value, |(before, _)| before.trim_end())
}

pub fn parse_env_line(line: &str) -> Option<(String, String)> {
  let line = line.trim();
  if line.is_empty() || line.starts_with('#') {
    return None;
  }
  let line = line.strip_prefix("export ").unwrap_or(line);
  let (key, raw_value) = line.split_once('=')?;
  let key = key.trim();
  if key.is_empty() {
    return None;
  }
  let raw_value = raw_value.trim();
  let value = strip_matching_quotes(raw_value).unwrap_or_else(|| strip_inline_comment(raw_value));
  Some((key.to_string(), value.to_string()))
}

pub fn state_path_from_config(config: &AppConfig) -> PathBuf {
  let trimmed = config.state_path.trim();
  if trimmed.is_empty() {
    return repo_root().join("data").join(STATE_FILE_NAME);
  }
  resolve_repo_path(trimmed)
}

pub fn ui_dir_from_config(config: &AppConfig) -> PathBuf {
  let trimmed = config.ui_dir.trim();
  if trimmed.is_empty() {
    return resolve_repo_path(DEFAULT_UI_DIR);
  }
  resolve_repo_path(trimmed)
}

pub fn http_addr_from_config(config: &AppConfig) -> String {
  let trimmed = config.http_addr.trim();
  if trimmed.is_empty() {
    DEFAULT_HTTP_ADDR.to_string()
  } else {
    trimmed.to_string()
  }
}

pub fn tournament_defaults(config: &AppConfig) -> TournamentDefaults {
  let fallback = TournamentDefaults::default();
  let pick = |raw: &str, default: String| {
    let trimmed = raw.trim();
    if trimmed.is_empty() { default } else { trimmed.to_string() }
  };
  TournamentDefaults {
    name: pick(&config.tournament_name, fallback.name),
    dates: pick(&config.tournament_dates, fallback.dates),
    organizer: pick(&config.organizer, fallback.organizer),
  }
}

pub fn log_env_warnings() {
  let config = load_config_inner().unwrap_or_else(|_| AppConfig::default());
  let mut warnings = Vec::new();

  if config.server_query_url.trim().is_empty() {
    warnings.push("SERVER_QUERY_URL not set and no server query url in config; live server lookup is disabled");
  }
  if !ui_dir_from_config(&config).is_dir() {
    warnings.push("UI directory not found; only the JSON API will be served");
  }

  for msg in warnings {
    tracing::warn!("{}", msg);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_env_line_handles_quotes_and_comments() {
    assert_eq!(
      parse_env_line("export SERVER_QUERY_URL=\"https://example.test/api\""),
      Some(("SERVER_QUERY_URL".to_string(), "https://example.test/api".to_string()))
    );
    assert_eq!(
      parse_env_line("TOURNAMENT_DATES=2026 # spring"),
      Some(("TOURNAMENT_DATES".to_string(), "2026".to_string()))
    );
    assert_eq!(
      parse_env_line("TOURNAMENT_NAME='Cup #3'"),
      Some(("TOURNAMENT_NAME".to_string(), "Cup #3".to_string()))
    );
    assert_eq!(parse_env_line("# comment"), None);
    assert_eq!(parse_env_line("=value"), None);
    assert_eq!(parse_env_line("no equals sign"), None);
  }

  #[test]
  fn test_env_file_does_not_override_existing_variables() {
    let dir = std::env::temp_dir().join(format!("bracket-env-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join(".env");
    fs::write(
      &path,
      "# local overrides\nBRACKET_ENV_TEST_FRESH=from-file\nBRACKET_ENV_TEST_SET=from-file\n",
    )
    .unwrap();
    env::set_var("BRACKET_ENV_TEST_SET", "from-shell");

    assert_eq!(load_env_file_from(&path), Ok(1));
    assert_eq!(env::var("BRACKET_ENV_TEST_FRESH").as_deref(), Ok("from-file"));
    assert_eq!(env::var("BRACKET_ENV_TEST_SET").as_deref(), Ok("from-shell"));
    assert_eq!(load_env_file_from(&dir.join("missing.env")), Ok(0));
    let _ = fs::remove_dir_all(&dir);
  }

  #[test]
  fn test_relative_paths_resolve_against_repo_root() {
    assert_eq!(resolve_repo_path("data/x.json"), repo_root().join("data/x.json"));
    let absolute = std::env::temp_dir().join("bracket.json");
    assert_eq!(resolve_repo_path(absolute.to_str().unwrap()), absolute);
  }

  #[test]
  fn test_blank_config_falls_back_to_builtin_values() {
    let config = AppConfig::default();
    assert_eq!(state_path_from_config(&config), repo_root().join("data").join(STATE_FILE_NAME));
    assert_eq!(http_addr_from_config(&config), DEFAULT_HTTP_ADDR);
    assert_eq!(tournament_defaults(&config), TournamentDefaults::default());
  }

  #[test]
  fn test_tournament_defaults_prefer_config_values() {
    let config = AppConfig {
      tournament_name: "  Autumn Cup ".to_string(),
      organizer: "Esports club".to_string(),
      ..AppConfig::default()
    };
    let defaults = tournament_defaults(&config);
    assert_eq!(defaults.name, "Autumn Cup");
    assert_eq!(defaults.dates, DEFAULT_TOURNAMENT_DATES);
    assert_eq!(defaults.organizer, "Esports club");
  }
}
