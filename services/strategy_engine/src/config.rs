//! Process-level configuration: which sport this binary runs and where its
//! HTTP collaborators live. Tunables shared by every sport process (edge
//! threshold, score-drop window, backoff schedules, risk limits) live in
//! `engine_core::config::EngineConfig` instead.

use engine_core::types::Sport;
use std::env;

#[derive(Debug, Clone)]
pub struct ProcessConfig {
    pub sport: Sport,
    pub league: String,
    pub venue_base_url: String,
    pub pregame_endpoint: String,
    pub inbox_label_prefix: String,
}

fn parse_sport(raw: &str) -> Sport {
    match raw.to_ascii_lowercase().as_str() {
        "soccer" => Sport::Soccer,
        "football" => Sport::Football,
        _ => Sport::Hockey,
    }
}

fn default_league(sport: Sport) -> &'static str {
    match sport {
        Sport::Hockey => "nhl",
        Sport::Football => "nfl",
        Sport::Soccer => "epl",
    }
}

impl ProcessConfig {
    pub fn from_env() -> Self {
        let sport = env::var("ENGINE_SPORT")
            .ok()
            .map(|v| parse_sport(&v))
            .unwrap_or(Sport::Hockey);

        let league = env::var("ENGINE_LEAGUE").unwrap_or_else(|_| default_league(sport).to_string());

        let venue_base_url =
            env::var("VENUE_BASE_URL").unwrap_or_else(|_| "https://trading-api.kalshi.com/trade-api/v2".to_string());

        let pregame_endpoint = env::var("PREGAME_ENDPOINT").unwrap_or_else(|_| "http://localhost:9000/pregame".to_string());

        let inbox_label_prefix = env::var("ENGINE_LABEL_PREFIX").unwrap_or_else(|_| sport.to_string());

        Self {
            sport,
            league,
            venue_base_url,
            pregame_endpoint,
            inbox_label_prefix,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_hockey_when_unset() {
        env::remove_var("ENGINE_SPORT");
        let cfg = ProcessConfig::from_env();
        assert_eq!(cfg.sport, Sport::Hockey);
    }

    #[test]
    fn parses_known_sport_names_case_insensitively() {
        assert_eq!(parse_sport("SOCCER"), Sport::Soccer);
        assert_eq!(parse_sport("Football"), Sport::Football);
        assert_eq!(parse_sport("hockey"), Sport::Hockey);
    }
}
