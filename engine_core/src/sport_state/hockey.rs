use super::{CommonState, SportStateOps};
use crate::types::MatchStatus;

#[derive(Debug, Clone)]
pub struct HockeyState {
    pub common: CommonState,
    pub is_home_pp: bool,
    pub is_away_pp: bool,
    pub home_penalty_count: i32,
    pub away_penalty_count: i32,
    pub pregame_g0: Option<f64>,
    pub overtime_notified: bool,
}

impl HockeyState {
    pub fn new(eid: impl Into<String>, league: impl Into<String>, home: impl Into<String>, away: impl Into<String>) -> Self {
        Self {
            common: CommonState::new(eid, league, home, away),
            is_home_pp: false,
            is_away_pp: false,
            home_penalty_count: 0,
            away_penalty_count: 0,
            pregame_g0: None,
            overtime_notified: false,
        }
    }

    pub fn is_overtime(&self) -> bool {
        self.common.period_label.to_ascii_lowercase().contains("overtime")
            || self.common.period_label.to_ascii_lowercase() == "ot"
    }

    pub fn set_pregame(&mut self, home_strength: f64, away_strength: f64) {
        self.common.home_strength = home_strength;
        self.common.away_strength = away_strength;
        self.common.pregame_applied = true;
    }

    /// Determine power-play side from the delta in penalty counts: the side
    /// whose count rose more is the one just penalized and sits in the box,
    /// so the *other* side is on the power play.
    pub fn update_power_play(&mut self, power_play: bool, new_home_count: i32, new_away_count: i32) {
        let home_delta = (new_home_count - self.home_penalty_count).max(0);
        let away_delta = (new_away_count - self.away_penalty_count).max(0);
        self.home_penalty_count = new_home_count;
        self.away_penalty_count = new_away_count;

        if !power_play {
            self.is_home_pp = false;
            self.is_away_pp = false;
            return;
        }

        if home_delta == away_delta {
            if !self.is_home_pp && !self.is_away_pp {
                self.is_home_pp = true;
                self.is_away_pp = false;
            }
            return;
        }

        if home_delta > away_delta {
            self.is_home_pp = false;
            self.is_away_pp = true;
        } else {
            self.is_home_pp = true;
            self.is_away_pp = false;
        }
    }
}

impl SportStateOps for HockeyState {
    fn common(&self) -> &CommonState {
        &self.common
    }

    fn common_mut(&mut self) -> &mut CommonState {
        &mut self.common
    }

    fn update_game_state(&mut self, home: i32, away: i32, period: &str, time_left: f64) -> bool {
        self.common.update_game_state(home, away, period, time_left)
    }

    fn set_tickers(&mut self, home: Option<String>, away: Option<String>, _draw: Option<String>) {
        self.common.set_tickers(home, away);
    }

    fn deduplicate_status(&mut self, status: MatchStatus) -> MatchStatus {
        if status == MatchStatus::Overtime {
            if self.overtime_notified {
                return MatchStatus::Live;
            }
            self.overtime_notified = true;
        }
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_play_side_is_the_non_penalized_team() {
        let mut s = HockeyState::new("1", "nhl", "a", "b");
        // home penalty count rises more -> home goes to the box, away is on the PP
        s.update_power_play(true, 1, 0);
        assert!(!s.is_home_pp);
        assert!(s.is_away_pp);
    }

    #[test]
    fn equal_deltas_keep_previous_flags() {
        let mut s = HockeyState::new("1", "nhl", "a", "b");
        s.is_home_pp = true;
        s.update_power_play(true, 1, 1);
        assert!(s.is_home_pp);
        assert!(!s.is_away_pp);
    }

    #[test]
    fn neither_side_on_defaults_to_home() {
        let mut s = HockeyState::new("1", "nhl", "a", "b");
        s.update_power_play(true, 1, 1);
        assert!(s.is_home_pp);
        assert!(!s.is_away_pp);
    }

    #[test]
    fn first_overtime_passes_subsequent_demoted() {
        let mut s = HockeyState::new("1", "nhl", "a", "b");
        assert_eq!(s.deduplicate_status(MatchStatus::Overtime), MatchStatus::Overtime);
        assert_eq!(s.deduplicate_status(MatchStatus::Overtime), MatchStatus::Live);
    }
}
