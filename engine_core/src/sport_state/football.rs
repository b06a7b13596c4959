use super::{CommonState, SportStateOps};
use crate::types::MatchStatus;

/// Football-specific extras: quarter labels and a 60-minute regulation clock.
/// No projection model is wired up yet (see `crate::models::football`); the
/// state still runs the overturn protocol and publishes status transitions.
#[derive(Debug, Clone)]
pub struct FootballState {
    pub common: CommonState,
    pub quarter_label: String,
}

impl FootballState {
    pub fn new(eid: impl Into<String>, league: impl Into<String>, home: impl Into<String>, away: impl Into<String>) -> Self {
        Self {
            common: CommonState::new(eid, league, home, away),
            quarter_label: String::new(),
        }
    }

    pub fn set_pregame(&mut self, home_strength: f64, away_strength: f64) {
        self.common.home_strength = home_strength;
        self.common.away_strength = away_strength;
        self.common.pregame_applied = true;
    }
}

impl SportStateOps for FootballState {
    fn common(&self) -> &CommonState {
        &self.common
    }

    fn common_mut(&mut self) -> &mut CommonState {
        &mut self.common
    }

    fn update_game_state(&mut self, home: i32, away: i32, period: &str, time_left: f64) -> bool {
        self.quarter_label = period.to_string();
        self.common.update_game_state(home, away, period, time_left)
    }

    fn set_tickers(&mut self, home: Option<String>, away: Option<String>, _draw: Option<String>) {
        self.common.set_tickers(home, away);
    }

    fn deduplicate_status(&mut self, status: MatchStatus) -> MatchStatus {
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_game_state_tracks_quarter_label_and_score() {
        let mut s = FootballState::new("1", "nfl", "jets", "bills");
        s.update_game_state(7, 3, "2nd quarter", 9.5);
        assert_eq!(s.quarter_label, "2nd quarter");
        assert_eq!((s.common.home_score, s.common.away_score), (7, 3));
        assert!(s.common.has_live_data);
    }

    #[test]
    fn set_pregame_marks_pregame_applied() {
        let mut s = FootballState::new("1", "nfl", "jets", "bills");
        assert!(!s.has_pregame());
        s.set_pregame(0.58, 0.42);
        assert!(s.has_pregame());
        assert_eq!(s.common.home_strength, 0.58);
    }
}
