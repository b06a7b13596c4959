//! Per-league venue series configuration, consulted only by the Ticker
//! Resolver's `refresh_markets` (C4). Plain static data, not mutable engine
//! state.

use crate::types::Sport;

#[derive(Debug, Clone, Copy)]
pub struct LeagueConfig {
    pub league_code: &'static str,
    pub sport: Sport,
    /// Venue series ticker prefix for the game/match market, e.g. `KXNHLGAME`.
    pub series_game: &'static str,
    /// Venue series ticker prefix for the draw market, soccer only.
    pub series_draw: Option<&'static str>,
}

pub static LEAGUE_CONFIGS: &[LeagueConfig] = &[
    LeagueConfig {
        league_code: "nhl",
        sport: Sport::Hockey,
        series_game: "KXNHLGAME",
        series_draw: None,
    },
    LeagueConfig {
        league_code: "nfl",
        sport: Sport::Football,
        series_game: "KXNFLGAME",
        series_draw: None,
    },
    LeagueConfig {
        league_code: "ncaaf",
        sport: Sport::Football,
        series_game: "KXNCAAFGAME",
        series_draw: None,
    },
    LeagueConfig {
        league_code: "epl",
        sport: Sport::Soccer,
        series_game: "KXEPLGAME",
        series_draw: Some("KXEPLTIE"),
    },
    LeagueConfig {
        league_code: "laliga",
        sport: Sport::Soccer,
        series_game: "KXLALIGAGAME",
        series_draw: Some("KXLALIGATIE"),
    },
    LeagueConfig {
        league_code: "bundesliga",
        sport: Sport::Soccer,
        series_game: "KXBUNDESLIGAGAME",
        series_draw: Some("KXBUNDESLIGATIE"),
    },
    LeagueConfig {
        league_code: "seriea",
        sport: Sport::Soccer,
        series_game: "KXSERIEAGAME",
        series_draw: Some("KXSERIEATIE"),
    },
    LeagueConfig {
        league_code: "ligue1",
        sport: Sport::Soccer,
        series_game: "KXLIGUE1GAME",
        series_draw: Some("KXLIGUE1TIE"),
    },
    LeagueConfig {
        league_code: "mls",
        sport: Sport::Soccer,
        series_game: "KXMLSGAME",
        series_draw: Some("KXMLSTIE"),
    },
];

pub fn find(league_code: &str) -> Option<&'static LeagueConfig> {
    LEAGUE_CONFIGS
        .iter()
        .find(|cfg| cfg.league_code.eq_ignore_ascii_case(league_code))
}

pub fn for_sport(sport: Sport) -> Vec<&'static LeagueConfig> {
    LEAGUE_CONFIGS.iter().filter(|cfg| cfg.sport == sport).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_known_league_case_insensitively() {
        let cfg = find("NHL").expect("nhl config");
        assert_eq!(cfg.series_game, "KXNHLGAME");
        assert_eq!(cfg.sport, Sport::Hockey);
    }

    #[test]
    fn soccer_leagues_carry_a_draw_series() {
        for cfg in for_sport(Sport::Soccer) {
            assert!(cfg.series_draw.is_some());
        }
    }

    #[test]
    fn football_and_hockey_leagues_have_no_draw_series() {
        for cfg in for_sport(Sport::Football).into_iter().chain(for_sport(Sport::Hockey)) {
            assert!(cfg.series_draw.is_none());
        }
    }
}
