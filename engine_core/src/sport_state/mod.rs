//! Sport State & Score-Drop Tracker (C5): the sport-specific `GameState`
//! polymorphism, expressed as a tagged variant rather than an inheritance
//! hierarchy. All three sports share only the score-drop embed and the
//! update/edge/status capability set in `SportStateOps`.

pub mod football;
pub mod hockey;
pub mod score_drop;
pub mod soccer;

use crate::types::TickerData;
use std::collections::HashMap;
use std::time::Instant;

pub use football::FootballState;
pub use hockey::HockeyState;
pub use score_drop::{DropOutcome, ScoreDropTracker};
pub use soccer::SoccerState;

use crate::types::MatchStatus;

/// Per-outcome edge in percentage points: `model_pct - ask`. Non-positive
/// when the corresponding ask is missing (`ask <= 0`, i.e. never quoted).
#[derive(Debug, Clone, Copy, Default)]
pub struct Edges {
    pub home_edge_yes: f64,
    pub home_edge_no: f64,
    pub away_edge_yes: f64,
    pub away_edge_no: f64,
    pub draw_edge_yes: f64,
    pub draw_edge_no: f64,
}

impl Edges {
    pub fn max(&self) -> f64 {
        [
            self.home_edge_yes,
            self.home_edge_no,
            self.away_edge_yes,
            self.away_edge_no,
            self.draw_edge_yes,
            self.draw_edge_no,
        ]
        .into_iter()
        .fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Fields common to all three sports' game state.
#[derive(Debug, Clone)]
pub struct CommonState {
    pub eid: String,
    pub league: String,
    pub home_team: String,
    pub away_team: String,
    pub home_score: i32,
    pub away_score: i32,
    pub period_label: String,
    pub time_left_minutes: f64,
    pub home_strength: f64,
    pub away_strength: f64,
    pub home_ticker: Option<String>,
    pub away_ticker: Option<String>,
    pub model_home_pct: f64,
    pub model_away_pct: f64,
    pub edges: Edges,
    pub pregame_applied: bool,
    pub has_live_data: bool,
    pub drop_tracker: ScoreDropTracker,
    pub finaled: bool,
}

impl CommonState {
    pub fn new(eid: impl Into<String>, league: impl Into<String>, home: impl Into<String>, away: impl Into<String>) -> Self {
        Self {
            eid: eid.into(),
            league: league.into(),
            home_team: home.into(),
            away_team: away.into(),
            home_score: 0,
            away_score: 0,
            period_label: String::new(),
            time_left_minutes: 0.0,
            home_strength: 0.5,
            away_strength: 0.5,
            home_ticker: None,
            away_ticker: None,
            model_home_pct: 50.0,
            model_away_pct: 50.0,
            edges: Edges::default(),
            pregame_applied: false,
            has_live_data: false,
            drop_tracker: ScoreDropTracker::new(),
            finaled: false,
        }
    }

    /// Clamps time monotonically within the same period label (the clock
    /// never rewinds) and updates the score. Returns true if anything changed.
    pub fn update_game_state(&mut self, home: i32, away: i32, period: &str, time_left: f64) -> bool {
        let mut changed = false;

        if home != self.home_score || away != self.away_score {
            self.home_score = home;
            self.away_score = away;
            changed = true;
        }

        if period != self.period_label {
            self.period_label = period.to_string();
            self.time_left_minutes = time_left;
            changed = true;
        } else if time_left < self.time_left_minutes {
            self.time_left_minutes = time_left;
            changed = true;
        }

        if !self.has_live_data {
            self.has_live_data = true;
            changed = true;
        }

        changed
    }

    pub fn lead(&self) -> i32 {
        self.home_score - self.away_score
    }

    pub fn set_tickers(&mut self, home: Option<String>, away: Option<String>) {
        if home.is_some() {
            self.home_ticker = home;
        }
        if away.is_some() {
            self.away_ticker = away;
        }
    }

    fn edge_pair(model_pct: f64, ticker: Option<&TickerData>) -> (f64, f64) {
        match ticker {
            Some(t) if t.yes_ask > 0 => {
                let edge_yes = model_pct - t.yes_ask as f64;
                let edge_no = (100.0 - model_pct) - t.no_ask as f64;
                (edge_yes, edge_no)
            }
            _ => (f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    pub fn recalc_edge(&mut self, tickers: &HashMap<String, TickerData>) {
        let home_ticker = self.home_ticker.as_ref().and_then(|t| tickers.get(t));
        let away_ticker = self.away_ticker.as_ref().and_then(|t| tickers.get(t));

        let (home_edge_yes, home_edge_no) = Self::edge_pair(self.model_home_pct, home_ticker);
        let (away_edge_yes, away_edge_no) = Self::edge_pair(self.model_away_pct, away_ticker);

        self.edges = Edges {
            home_edge_yes,
            home_edge_no,
            away_edge_yes,
            away_edge_no,
            draw_edge_yes: f64::NEG_INFINITY,
            draw_edge_no: f64::NEG_INFINITY,
        };
    }

    pub fn has_significant_edge(&self, threshold_pp: f64) -> bool {
        self.edges.max() >= threshold_pp
    }
}

/// Capability set shared by all sport-specific game states (§4.5).
pub trait SportStateOps {
    fn common(&self) -> &CommonState;
    fn common_mut(&mut self) -> &mut CommonState;

    fn eid(&self) -> &str {
        &self.common().eid
    }
    fn home_team(&self) -> &str {
        &self.common().home_team
    }
    fn away_team(&self) -> &str {
        &self.common().away_team
    }
    fn home_score(&self) -> i32 {
        self.common().home_score
    }
    fn away_score(&self) -> i32 {
        self.common().away_score
    }
    fn period_label(&self) -> &str {
        &self.common().period_label
    }
    fn time_left_minutes(&self) -> f64 {
        self.common().time_left_minutes
    }
    fn is_live(&self) -> bool {
        self.common().has_live_data && !self.is_finished()
    }
    fn has_live_data(&self) -> bool {
        self.common().has_live_data
    }
    fn has_pregame(&self) -> bool {
        self.common().pregame_applied
    }
    fn is_finished(&self) -> bool {
        self.common().finaled
    }

    fn update_game_state(&mut self, home: i32, away: i32, period: &str, time_left: f64) -> bool;

    fn check_score_drop(&mut self, new_home: i32, new_away: i32, confirm_sec: u64, now: Instant) -> DropOutcome {
        let common = self.common_mut();
        let (cur_home, cur_away) = (common.home_score, common.away_score);
        common
            .drop_tracker
            .check_drop(cur_home, cur_away, new_home, new_away, confirm_sec, now)
    }

    fn set_tickers(&mut self, home: Option<String>, away: Option<String>, draw: Option<String>);

    fn recalc_edge(&mut self, tickers: &HashMap<String, TickerData>) {
        self.common_mut().recalc_edge(tickers);
    }

    fn has_significant_edge(&self, threshold_pp: f64) -> bool {
        self.common().has_significant_edge(threshold_pp)
    }

    /// Collapses repeated one-shot statuses; sport-specific state may
    /// override (hockey demotes repeat `Overtime` to `Live`).
    fn deduplicate_status(&mut self, status: MatchStatus) -> MatchStatus {
        status
    }
}

/// Tagged variant over the three supported sports' game state.
pub enum SportState {
    Hockey(HockeyState),
    Soccer(SoccerState),
    Football(FootballState),
}

impl SportStateOps for SportState {
    fn common(&self) -> &CommonState {
        match self {
            SportState::Hockey(s) => s.common(),
            SportState::Soccer(s) => s.common(),
            SportState::Football(s) => s.common(),
        }
    }

    fn common_mut(&mut self) -> &mut CommonState {
        match self {
            SportState::Hockey(s) => s.common_mut(),
            SportState::Soccer(s) => s.common_mut(),
            SportState::Football(s) => s.common_mut(),
        }
    }

    fn update_game_state(&mut self, home: i32, away: i32, period: &str, time_left: f64) -> bool {
        match self {
            SportState::Hockey(s) => s.update_game_state(home, away, period, time_left),
            SportState::Soccer(s) => s.update_game_state(home, away, period, time_left),
            SportState::Football(s) => s.update_game_state(home, away, period, time_left),
        }
    }

    fn set_tickers(&mut self, home: Option<String>, away: Option<String>, draw: Option<String>) {
        match self {
            SportState::Hockey(s) => s.set_tickers(home, away, draw),
            SportState::Soccer(s) => s.set_tickers(home, away, draw),
            SportState::Football(s) => s.set_tickers(home, away, draw),
        }
    }

    fn deduplicate_status(&mut self, status: MatchStatus) -> MatchStatus {
        match self {
            SportState::Hockey(s) => s.deduplicate_status(status),
            SportState::Soccer(s) => s.deduplicate_status(status),
            SportState::Football(s) => s.deduplicate_status(status),
        }
    }
}

/// Status of any "finished" period label, matched case-insensitively.
pub fn period_marks_finished(period: &str) -> bool {
    const FINISHED_LABELS: &[&str] = &[
        "finished",
        "final",
        "ended",
        "ft",
        "after overtime",
        "after ot",
        "after extra time",
        "aet",
        "after penalties",
        "after pen",
    ];
    let lower = period.to_ascii_lowercase();
    FINISHED_LABELS.iter().any(|l| lower == *l)
}
