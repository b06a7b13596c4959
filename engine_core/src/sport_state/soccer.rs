use super::{CommonState, SportStateOps};
use crate::types::MatchStatus;

#[derive(Debug, Clone)]
pub struct SoccerState {
    pub common: CommonState,
    pub draw_ticker: Option<String>,
    pub home_red_cards: i32,
    pub away_red_cards: i32,
    pub g0: Option<f64>,
    pub lambda_home: f64,
    pub lambda_away: f64,
    pub model_draw_pct: f64,
    pub regulation_score_frozen: bool,
    pub reg_home_frozen: i32,
    pub reg_away_frozen: i32,
    /// Vendor-reported live 1X2, cached verbatim on score change (§4.7.3).
    /// Separate from `model_home_pct`/`model_away_pct`/`model_draw_pct`,
    /// which are this engine's own Poisson-derived estimate.
    pub live_home_pct: Option<f64>,
    pub live_draw_pct: Option<f64>,
    pub live_away_pct: Option<f64>,
}

fn is_post_regulation(period: &str) -> bool {
    let lower = period.to_ascii_lowercase();
    lower.contains("extra time")
        || lower.contains("penalt")
        || lower.contains("aet")
        || super::period_marks_finished(&lower)
}

impl SoccerState {
    pub fn new(eid: impl Into<String>, league: impl Into<String>, home: impl Into<String>, away: impl Into<String>) -> Self {
        Self {
            common: CommonState::new(eid, league, home, away),
            draw_ticker: None,
            home_red_cards: 0,
            away_red_cards: 0,
            g0: None,
            lambda_home: 1.3,
            lambda_away: 1.1,
            model_draw_pct: 25.0,
            regulation_score_frozen: false,
            reg_home_frozen: 0,
            reg_away_frozen: 0,
            live_home_pct: None,
            live_draw_pct: None,
            live_away_pct: None,
        }
    }

    pub fn set_pregame(&mut self, home_strength: f64, away_strength: f64, g0: f64) {
        self.common.home_strength = home_strength;
        self.common.away_strength = away_strength;
        self.g0 = Some(g0);
        self.common.pregame_applied = true;
    }

    pub fn update_red_cards(&mut self, home: i32, away: i32) {
        self.home_red_cards = home;
        self.away_red_cards = away;
    }

    /// Caches the vendor-reported live 1X2 verbatim; any field left absent
    /// on the event keeps its previous cached value.
    pub fn cache_live_probs(&mut self, home: Option<f64>, draw: Option<f64>, away: Option<f64>) {
        if home.is_some() {
            self.live_home_pct = home;
        }
        if draw.is_some() {
            self.live_draw_pct = draw;
        }
        if away.is_some() {
            self.live_away_pct = away;
        }
    }
}

impl SportStateOps for SoccerState {
    fn common(&self) -> &CommonState {
        &self.common
    }

    fn common_mut(&mut self) -> &mut CommonState {
        &mut self.common
    }

    fn update_game_state(&mut self, home: i32, away: i32, period: &str, time_left: f64) -> bool {
        let changed = self.common.update_game_state(home, away, period, time_left);
        if is_post_regulation(period) && !self.regulation_score_frozen {
            self.reg_home_frozen = self.common.home_score;
            self.reg_away_frozen = self.common.away_score;
            self.regulation_score_frozen = true;
        }
        changed
    }

    fn set_tickers(&mut self, home: Option<String>, away: Option<String>, draw: Option<String>) {
        self.common.set_tickers(home, away);
        if draw.is_some() {
            self.draw_ticker = draw;
        }
    }

    fn deduplicate_status(&mut self, status: MatchStatus) -> MatchStatus {
        status
    }

    fn recalc_edge(&mut self, tickers: &std::collections::HashMap<String, crate::types::TickerData>) {
        self.common.recalc_edge(tickers);
        let draw_edge = match self.draw_ticker.as_ref().and_then(|t| tickers.get(t)) {
            Some(t) if t.yes_ask > 0 => (
                self.model_draw_pct - t.yes_ask as f64,
                (100.0 - self.model_draw_pct) - t.no_ask as f64,
            ),
            _ => (f64::NEG_INFINITY, f64::NEG_INFINITY),
        };
        self.common.edges.draw_edge_yes = draw_edge.0;
        self.common.edges.draw_edge_no = draw_edge.1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regulation_score_freezes_once_on_extra_time() {
        let mut s = SoccerState::new("1", "epl", "a", "b");
        s.update_game_state(1, 1, "2nd half", 5.0);
        s.update_game_state(2, 1, "extra time", 15.0);
        assert!(s.regulation_score_frozen);
        assert_eq!((s.reg_home_frozen, s.reg_away_frozen), (2, 1));

        // a later goal in extra time must not re-freeze
        s.update_game_state(3, 1, "extra time", 10.0);
        assert_eq!((s.reg_home_frozen, s.reg_away_frozen), (2, 1));
    }

    #[test]
    fn draw_edge_is_computed_alongside_home_and_away() {
        use crate::types::TickerData;
        use std::collections::HashMap;

        let mut s = SoccerState::new("1", "epl", "a", "b");
        s.draw_ticker = Some("DRAW".into());
        s.model_draw_pct = 30.0;
        let mut tickers = HashMap::new();
        let mut td = TickerData::default();
        td.apply_update(20, 25, 10);
        tickers.insert("DRAW".into(), td);

        s.recalc_edge(&tickers);
        assert_eq!(s.common.edges.draw_edge_yes, 30.0 - 25.0);
    }

    #[test]
    fn cache_live_probs_keeps_prior_value_for_absent_fields() {
        let mut s = SoccerState::new("1", "epl", "a", "b");
        s.cache_live_probs(Some(0.5), Some(0.2), Some(0.3));
        s.cache_live_probs(Some(0.6), None, None);
        assert_eq!(s.live_home_pct, Some(0.6));
        assert_eq!(s.live_draw_pct, Some(0.2));
        assert_eq!(s.live_away_pct, Some(0.3));
    }
}
