//! Shared wire types: the inbound bus payloads, the outbound order intent,
//! and the per-ticker price snapshot the engine carries in each game's state.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sport {
    Hockey,
    Soccer,
    Football,
}

impl fmt::Display for Sport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sport::Hockey => write!(f, "hockey"),
            Sport::Soccer => write!(f, "soccer"),
            Sport::Football => write!(f, "football"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    GameStart,
    Live,
    ScoreChange,
    HalfTime,
    FullTime,
    Overtime,
    PowerPlay,
    PowerPlayEnd,
    RedCard,
    OverturnPending,
    OverturnConfirmed,
    OverturnRejected,
    GameFinish,
    PriceUpdate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Yes,
    No,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Home,
    Away,
    Draw,
}

/// Vig-free pregame 1X2 (and, for soccer, expected total goals) for one fixture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PregameOdds {
    pub home_team: String,
    pub away_team: String,
    pub home_strength: f64,
    pub draw_pct: f64,
    pub away_strength: f64,
    /// Expected total goals, soccer only.
    pub g0: Option<f64>,
}

/// Live per-ticker price snapshot. NO prices are always the binary complement
/// of YES prices; see `apply_update`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TickerData {
    pub yes_bid: i32,
    pub yes_ask: i32,
    pub no_bid: i32,
    pub no_ask: i32,
    pub volume: i64,
}

impl Default for TickerData {
    /// All prices default to 100 (worst case) until a real quote arrives.
    fn default() -> Self {
        Self {
            yes_bid: 100,
            yes_ask: 100,
            no_bid: 100,
            no_ask: 100,
            volume: 0,
        }
    }
}

impl TickerData {
    /// Apply a partial update where `-1` means "absent, keep existing" and
    /// any value `>= 0` is applied along with its binary complement.
    /// `volume`, if `> 0`, overwrites the cumulative count.
    pub fn apply_update(&mut self, yes_bid: i32, yes_ask: i32, volume: i64) {
        if yes_bid >= 0 {
            self.yes_bid = yes_bid;
            self.no_ask = 100 - yes_bid;
        }
        if yes_ask >= 0 {
            self.yes_ask = yes_ask;
            self.no_bid = 100 - yes_ask;
        }
        if volume > 0 {
            self.volume = volume;
        }
    }

    /// WS-disconnect fail-safe: reset all four prices to the worst-case default.
    pub fn reset_to_default(&mut self) {
        let volume = self.volume;
        *self = Self::default();
        self.volume = volume;
    }
}

/// Inbound live-telemetry event routed to exactly one game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameUpdateEvent {
    pub sport: Sport,
    pub league: String,
    pub eid: String,
    pub home_team: String,
    pub away_team: String,
    pub home_score: i32,
    pub away_score: i32,
    pub period: String,
    pub time_left_min: f64,
    pub match_status: MatchStatus,
    #[serde(default)]
    pub power_play: Option<bool>,
    #[serde(default)]
    pub home_penalty_count: Option<i32>,
    #[serde(default)]
    pub away_penalty_count: Option<i32>,
    #[serde(default)]
    pub home_strength: Option<f64>,
    #[serde(default)]
    pub away_strength: Option<f64>,
    #[serde(default)]
    pub draw_strength: Option<f64>,
    #[serde(default)]
    pub home_live: Option<f64>,
    #[serde(default)]
    pub draw_live: Option<f64>,
    #[serde(default)]
    pub away_live: Option<f64>,
    #[serde(default)]
    pub home_red_cards: Option<i32>,
    #[serde(default)]
    pub away_red_cards: Option<i32>,
}

impl GameUpdateEvent {
    /// Swap home/away-oriented fields in place; used when the event's home
    /// team matches the context's canonical away team.
    pub fn swap_orientation(&mut self) {
        std::mem::swap(&mut self.home_team, &mut self.away_team);
        std::mem::swap(&mut self.home_score, &mut self.away_score);
        std::mem::swap(&mut self.home_penalty_count, &mut self.away_penalty_count);
        std::mem::swap(&mut self.home_strength, &mut self.away_strength);
        std::mem::swap(&mut self.home_live, &mut self.away_live);
        std::mem::swap(&mut self.home_red_cards, &mut self.away_red_cards);
    }
}

/// Partial price update for one market ticker. `-1` on `yes_bid`/`yes_ask`
/// means absent; `volume == 0` means absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketUpdateEvent {
    pub ticker: String,
    pub yes_bid: i32,
    pub yes_ask: i32,
    pub volume: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WsStatusEvent {
    pub connected: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderIntent {
    pub sport: Sport,
    pub league: String,
    pub game_id: String,
    pub eid: String,
    pub ticker: String,
    pub side: Side,
    pub outcome: Outcome,
    pub limit_pct: f64,
    pub reason: String,
    pub home_score: i32,
    pub away_score: i32,
    pub overturn: bool,
    pub slam: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticker_default_is_worst_case() {
        let t = TickerData::default();
        assert_eq!(t.no_ask + t.yes_bid, 100);
        assert_eq!(t.no_bid + t.yes_ask, 100);
    }

    #[test]
    fn partial_update_preserves_absent_fields() {
        let mut t = TickerData::default();
        t.apply_update(40, -1, 0);
        assert_eq!(t.yes_bid, 40);
        assert_eq!(t.no_ask, 60);
        assert_eq!(t.yes_ask, 100);
        assert_eq!(t.no_bid, 0);
    }

    #[test]
    fn zero_is_a_valid_applied_value() {
        let mut t = TickerData::default();
        t.apply_update(0, 0, 0);
        assert_eq!(t.yes_bid, 0);
        assert_eq!(t.yes_ask, 0);
        assert_eq!(t.no_ask, 100);
        assert_eq!(t.no_bid, 100);
    }

    #[test]
    fn invariant_holds_after_sequence_of_updates() {
        let mut t = TickerData::default();
        let seq = [(10, 20, 5), (-1, 30, 0), (50, -1, 100), (0, 0, 1)];
        for (yb, ya, v) in seq {
            t.apply_update(yb, ya, v);
            assert_eq!(t.no_ask + t.yes_bid, 100);
            assert_eq!(t.no_bid + t.yes_ask, 100);
        }
    }

    #[test]
    fn reset_to_default_preserves_volume_and_fails_safe() {
        let mut t = TickerData::default();
        t.apply_update(60, 65, 500);
        t.reset_to_default();
        assert_eq!(t.yes_bid, 100);
        assert_eq!(t.yes_ask, 100);
        assert_eq!(t.volume, 500);
    }
}
