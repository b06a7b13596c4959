//! Engine-wide configuration, loaded once at startup from the environment.
//!
//! Follows the `GameMonitorConfig::from_env()` pattern used across the
//! sibling services: every field is read with
//! `env::var(...).ok().and_then(|s| s.parse().ok()).unwrap_or(DEFAULT)`,
//! clamped where the default has a sane range.

use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::time::Duration;

pub const DEFAULT_EDGE_THRESHOLD_PCT: f64 = 3.0;
pub const DEFAULT_SCORE_DROP_CONFIRM_SEC: u64 = 15;
pub const DEFAULT_PREGAME_CACHE_TTL_SECS: u64 = 30 * 60;
pub const DEFAULT_PREGAME_RETRY_COOL_SECS: u64 = 30;
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 60 * 60;
pub const DEFAULT_INIT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_INIT_RETRY_BASE_SECS: u64 = 10;
pub const DEFAULT_REFRESH_BACKOFF_BASE_SECS: u64 = 10;
pub const DEFAULT_REFRESH_BACKOFF_MAX_SECS: u64 = 5 * 60;
pub const DEFAULT_RATE_DIVISOR: u32 = 1;
pub const DEFAULT_TICKER_EXPIRY_WINDOW_HOURS: i64 = 48;
pub const DEFAULT_INBOX_CAPACITY: usize = 256;

/// Per-league risk limit, nested under a sport.
#[derive(Debug, Clone, Deserialize)]
pub struct LeagueRiskLimit {
    pub max_game_cents: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SportRiskLimit {
    pub max_sport_cents: i64,
    #[serde(default)]
    pub leagues: HashMap<String, LeagueRiskLimit>,
}

/// Parses `SPORT_RISK_LIMITS_JSON`, a JSON object of
/// `{sport: {max_sport_cents, leagues: {league: {max_game_cents}}}}`. These
/// limits are recognised configuration consumed by the (out-of-scope)
/// execution/risk lane, not enforced inside this crate; a missing or
/// malformed value just yields an empty map.
fn load_sport_risk_limits() -> HashMap<String, SportRiskLimit> {
    env::var("SPORT_RISK_LIMITS_JSON")
        .ok()
        .and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or_default()
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub edge_threshold_pct: f64,
    pub score_drop_confirm_sec: u64,
    pub pregame_cache_ttl: Duration,
    pub pregame_retry_cool: Duration,
    pub refresh_interval: Duration,
    pub init_max_attempts: u32,
    pub init_retry_base: Duration,
    pub refresh_backoff_base: Duration,
    pub refresh_backoff_max: Duration,
    pub rate_divisor: u32,
    pub ticker_expiry_window: Duration,
    pub inbox_capacity: usize,
    pub sport_risk_limits: HashMap<String, SportRiskLimit>,
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let edge_threshold_pct = env::var("EDGE_THRESHOLD_PCT")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(DEFAULT_EDGE_THRESHOLD_PCT)
            .clamp(0.0, 50.0);

        let score_drop_confirm_sec = env::var("SCORE_DROP_CONFIRM_SEC")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_SCORE_DROP_CONFIRM_SEC);

        let pregame_cache_ttl = Duration::from_secs(
            env::var("PREGAME_CACHE_TTL_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(DEFAULT_PREGAME_CACHE_TTL_SECS),
        );

        let pregame_retry_cool = Duration::from_secs(
            env::var("PREGAME_RETRY_COOL_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(DEFAULT_PREGAME_RETRY_COOL_SECS),
        );

        let refresh_interval = Duration::from_secs(
            env::var("REFRESH_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(DEFAULT_REFRESH_INTERVAL_SECS),
        );

        let init_max_attempts = env::var("INIT_MAX_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(DEFAULT_INIT_MAX_ATTEMPTS);

        let init_retry_base = Duration::from_secs(
            env::var("INIT_RETRY_BASE_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(DEFAULT_INIT_RETRY_BASE_SECS),
        );

        let refresh_backoff_base = Duration::from_secs(
            env::var("REFRESH_BACKOFF_BASE_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(DEFAULT_REFRESH_BACKOFF_BASE_SECS),
        );

        let refresh_backoff_max = Duration::from_secs(
            env::var("REFRESH_BACKOFF_MAX_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(DEFAULT_REFRESH_BACKOFF_MAX_SECS),
        );

        let rate_divisor = env::var("RATE_DIVISOR")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(DEFAULT_RATE_DIVISOR)
            .max(1);

        let ticker_expiry_window = Duration::from_secs(
            env::var("TICKER_EXPIRY_WINDOW_HOURS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(DEFAULT_TICKER_EXPIRY_WINDOW_HOURS)
                .max(1) as u64
                * 3600,
        );

        let inbox_capacity = env::var("GAME_INBOX_CAPACITY")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(DEFAULT_INBOX_CAPACITY);

        Self {
            edge_threshold_pct,
            score_drop_confirm_sec,
            pregame_cache_ttl,
            pregame_retry_cool,
            refresh_interval,
            init_max_attempts,
            init_retry_base,
            refresh_backoff_base,
            refresh_backoff_max,
            rate_divisor,
            ticker_expiry_window,
            inbox_capacity,
            sport_risk_limits: load_sport_risk_limits(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        env::remove_var("EDGE_THRESHOLD_PCT");
        let cfg = EngineConfig::from_env();
        assert_eq!(cfg.edge_threshold_pct, DEFAULT_EDGE_THRESHOLD_PCT);
        assert_eq!(cfg.score_drop_confirm_sec, 15);
        assert_eq!(cfg.rate_divisor, 1);
    }

    #[test]
    fn sport_risk_limits_parsed_from_json_env_var() {
        env::set_var(
            "SPORT_RISK_LIMITS_JSON",
            r#"{"hockey":{"max_sport_cents":500000,"leagues":{"nhl":{"max_game_cents":50000}}}}"#,
        );
        let cfg = EngineConfig::from_env();
        env::remove_var("SPORT_RISK_LIMITS_JSON");

        let hockey = cfg.sport_risk_limits.get("hockey").expect("hockey limit present");
        assert_eq!(hockey.max_sport_cents, 500000);
        assert_eq!(hockey.leagues.get("nhl").unwrap().max_game_cents, 50000);
    }

    #[test]
    fn sport_risk_limits_defaults_to_empty_when_unset() {
        env::remove_var("SPORT_RISK_LIMITS_JSON");
        let cfg = EngineConfig::from_env();
        assert!(cfg.sport_risk_limits.is_empty());
    }
}
