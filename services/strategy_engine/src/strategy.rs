//! `strategy.evaluate` and friends (C7 §4.7.3-§4.7.4): the sport-specific
//! decision logic run once inside a game's serial closure. Pure functions
//! over `&mut SportState` so the borrow on `ctx.state` never overlaps a
//! call back into `ctx`'s own methods (`notify`, `set_match_status`) —
//! those are applied by the caller once this returns.

use crate::game_context::{GameContext, OverturnRecord};
use engine_core::config::EngineConfig;
use engine_core::projection::{hockey_football, soccer as soccer_model};
use engine_core::sport_state::score_drop::DropOutcome;
use engine_core::sport_state::{FootballState, HockeyState, SoccerState, SportState, SportStateOps};
use engine_core::types::{GameUpdateEvent, MatchStatus, OrderIntent, Outcome, Side, TickerData};
use std::collections::HashMap;
use std::time::Instant;

pub struct EvaluateResult {
    pub intents: Vec<OrderIntent>,
    pub finished: bool,
}

/// Internal return shape for the per-sport pure functions: status
/// transitions to notify and an optional overturn record to stash, applied
/// by the caller after the `&mut SportState` borrow has ended.
struct SportOutcome {
    notifications: Vec<MatchStatus>,
    overturn: Option<OverturnRecord>,
    intents: Vec<OrderIntent>,
    finished: bool,
}

impl Default for SportOutcome {
    fn default() -> Self {
        Self {
            notifications: Vec::new(),
            overturn: None,
            intents: Vec::new(),
            finished: false,
        }
    }
}

fn drop_outcome_status(outcome: DropOutcome) -> Option<MatchStatus> {
    match outcome {
        DropOutcome::NewDrop | DropOutcome::Pending => Some(MatchStatus::OverturnPending),
        DropOutcome::Confirmed => Some(MatchStatus::OverturnConfirmed),
        DropOutcome::Rejected => Some(MatchStatus::OverturnRejected),
        DropOutcome::Accept => None,
    }
}

fn intent(
    sport: engine_core::types::Sport,
    league: &str,
    game_id: &str,
    eid: &str,
    ticker: &str,
    side: Side,
    outcome: Outcome,
    limit_pct: f64,
    reason: impl Into<String>,
    home_score: i32,
    away_score: i32,
    overturn: bool,
    slam: bool,
) -> OrderIntent {
    OrderIntent {
        sport,
        league: league.to_string(),
        game_id: game_id.to_string(),
        eid: eid.to_string(),
        ticker: ticker.to_string(),
        side,
        outcome,
        limit_pct,
        reason: reason.into(),
        home_score,
        away_score,
        overturn,
        slam,
    }
}

/// Four edge-threshold intents: YES/NO on both home and away tickers, each
/// at `model_pct` minus the configured edge threshold (scenario 6).
fn edge_intents(
    ctx_sport: engine_core::types::Sport,
    league: &str,
    game_id: &str,
    eid: &str,
    home_ticker: Option<&str>,
    away_ticker: Option<&str>,
    model_home_pct: f64,
    model_away_pct: f64,
    home_score: i32,
    away_score: i32,
    threshold: f64,
    overturn: bool,
) -> Vec<OrderIntent> {
    let mut out = Vec::new();
    if let Some(t) = home_ticker {
        out.push(intent(
            ctx_sport, league, game_id, eid, t, Side::Yes, Outcome::Home,
            model_home_pct - threshold, "model edge vs yes ask", home_score, away_score, overturn, false,
        ));
        out.push(intent(
            ctx_sport, league, game_id, eid, t, Side::No, Outcome::Home,
            (100.0 - model_home_pct) - threshold, "model edge vs no ask", home_score, away_score, overturn, false,
        ));
    }
    if let Some(t) = away_ticker {
        out.push(intent(
            ctx_sport, league, game_id, eid, t, Side::Yes, Outcome::Away,
            model_away_pct - threshold, "model edge vs yes ask", home_score, away_score, overturn, false,
        ));
        out.push(intent(
            ctx_sport, league, game_id, eid, t, Side::No, Outcome::Away,
            (100.0 - model_away_pct) - threshold, "model edge vs no ask", home_score, away_score, overturn, false,
        ));
    }
    out
}

fn evaluate_hockey(
    state: &mut HockeyState,
    tickers: &HashMap<String, TickerData>,
    event: &GameUpdateEvent,
    config: &EngineConfig,
    now: Instant,
) -> SportOutcome {
    let mut out = SportOutcome::default();

    if !state.common.pregame_applied {
        if let (Some(h), Some(a)) = (event.home_strength, event.away_strength) {
            state.set_pregame(h, a);
        }
    }

    if let Some(power_play) = event.power_play {
        let new_home = event.home_penalty_count.unwrap_or(state.home_penalty_count);
        let new_away = event.away_penalty_count.unwrap_or(state.away_penalty_count);
        state.update_power_play(power_play, new_home, new_away);
    }

    let had_live_data = state.common.has_live_data;
    if had_live_data {
        let (old_home, old_away) = (state.common.home_score, state.common.away_score);
        let drop_outcome = state.check_score_drop(
            event.home_score,
            event.away_score,
            config.score_drop_confirm_sec,
            now,
        );
        if let Some(status) = drop_outcome_status(drop_outcome) {
            out.notifications.push(status);
        }
        if matches!(drop_outcome, DropOutcome::Confirmed | DropOutcome::Rejected) {
            out.overturn = Some(OverturnRecord {
                old_home,
                old_away,
                new_home: event.home_score,
                new_away: event.away_score,
            });
        }
    }

    let score_changed_before = (state.common.home_score, state.common.away_score);
    state.update_game_state(event.home_score, event.away_score, &event.period, event.time_left_min);
    let score_changed = score_changed_before != (state.common.home_score, state.common.away_score);

    let lead = state.common.lead();
    if state.common.time_left_minutes < 0.01 && lead != 0 && !state.common.finaled {
        state.common.finaled = true;
        out.finished = true;
        out.intents = slam_intents_for(&state.common, &state.common.home_ticker.clone(), &state.common.away_ticker.clone());
        return out;
    }

    let is_overtime = state.is_overtime();
    state.common.model_home_pct =
        hockey_football::projected_odds_with_overtime(state.common.home_strength, state.common.time_left_minutes, lead as f64, is_overtime) * 100.0;
    state.common.model_away_pct =
        hockey_football::projected_odds_with_overtime(state.common.away_strength, state.common.time_left_minutes, -lead as f64, is_overtime) * 100.0;

    state.recalc_edge(tickers);

    let overturn_confirmed = out.notifications.contains(&MatchStatus::OverturnConfirmed);
    if (score_changed || overturn_confirmed) && state.has_significant_edge(config.edge_threshold_pct) {
        out.intents = edge_intents(
            engine_core::types::Sport::Hockey,
            &state.common.league,
            &state.common.eid,
            &state.common.eid,
            state.common.home_ticker.as_deref(),
            state.common.away_ticker.as_deref(),
            state.common.model_home_pct,
            state.common.model_away_pct,
            state.common.home_score,
            state.common.away_score,
            config.edge_threshold_pct,
            overturn_confirmed,
        );
    }

    out
}

fn evaluate_soccer(
    state: &mut SoccerState,
    tickers: &HashMap<String, TickerData>,
    event: &GameUpdateEvent,
    config: &EngineConfig,
    now: Instant,
) -> SportOutcome {
    let mut out = SportOutcome::default();

    if !state.common.pregame_applied {
        // `g0` (expected total goals) is seeded by the resolver at game
        // creation; once it's present, infer the lambda split from whatever
        // strength figures the event carries.
        if let Some(g0) = state.g0 {
            let h = event.home_strength.unwrap_or(state.common.home_strength);
            let a = event.away_strength.unwrap_or(state.common.away_strength);
            let d = event.draw_strength.unwrap_or(state.model_draw_pct / 100.0);
            let target = soccer_model::Probabilities { home: h, draw: d, away: a };
            let (lh, la) = soccer_model::infer_lambdas(target, g0);
            state.lambda_home = lh;
            state.lambda_away = la;
            state.model_draw_pct = d * 100.0;
            state.set_pregame(h, a, g0);
        }
    }

    if let (Some(h), Some(a)) = (event.home_red_cards, event.away_red_cards) {
        state.update_red_cards(h, a);
    }

    let had_live_data = state.common.has_live_data;
    if had_live_data {
        let (old_home, old_away) = (state.common.home_score, state.common.away_score);
        let drop_outcome = state.check_score_drop(
            event.home_score,
            event.away_score,
            config.score_drop_confirm_sec,
            now,
        );
        if let Some(status) = drop_outcome_status(drop_outcome) {
            out.notifications.push(status);
        }
        if matches!(drop_outcome, DropOutcome::Confirmed | DropOutcome::Rejected) {
            out.overturn = Some(OverturnRecord {
                old_home,
                old_away,
                new_home: event.home_score,
                new_away: event.away_score,
            });
        }
    }

    let before = (state.common.home_score, state.common.away_score);
    state.update_game_state(event.home_score, event.away_score, &event.period, event.time_left_min);
    let score_changed = before != (state.common.home_score, state.common.away_score);

    if score_changed {
        state.cache_live_probs(event.home_live, event.draw_live, event.away_live);
    }

    if score_changed && state.common.pregame_applied {
        let half = half_from_period(&event.period);
        let is_live = !engine_core::sport_state::period_marks_finished(&event.period);
        let probs = soccer_model::inplay_probabilities(
            state.lambda_home,
            state.lambda_away,
            state.common.time_left_minutes,
            state.common.lead(),
            half,
            state.home_red_cards,
            state.away_red_cards,
            is_live,
        );
        state.common.model_home_pct = probs.home * 100.0;
        state.common.model_away_pct = probs.away * 100.0;
        state.model_draw_pct = probs.draw * 100.0;
    }

    state.recalc_edge(tickers);
    // No orders emitted yet for soccer; the hook is present but intentionally inert.
    out
}

fn half_from_period(period: &str) -> u8 {
    let lower = period.to_ascii_lowercase();
    if lower.contains("2nd") || lower.contains("second") {
        2
    } else {
        1
    }
}

fn evaluate_football(
    state: &mut FootballState,
    _tickers: &HashMap<String, TickerData>,
    event: &GameUpdateEvent,
    config: &EngineConfig,
    now: Instant,
) -> SportOutcome {
    let mut out = SportOutcome::default();

    if !state.common.pregame_applied {
        if let (Some(h), Some(a)) = (event.home_strength, event.away_strength) {
            state.set_pregame(h, a);
        }
    }

    let had_live_data = state.common.has_live_data;
    if had_live_data {
        let drop_outcome = state.check_score_drop(
            event.home_score,
            event.away_score,
            config.score_drop_confirm_sec,
            now,
        );
        if let Some(status) = drop_outcome_status(drop_outcome) {
            out.notifications.push(status);
        }
    }

    state.update_game_state(event.home_score, event.away_score, &event.period, event.time_left_min);

    let lead = state.common.lead();
    state.common.model_home_pct = hockey_football::projected_odds(state.common.home_strength, state.common.time_left_minutes, lead as f64) * 100.0;
    state.common.model_away_pct = hockey_football::projected_odds(state.common.away_strength, state.common.time_left_minutes, -lead as f64) * 100.0;

    // No model-driven orders for football yet.
    out
}

/// `strategy.evaluate(ctx, event) -> {intents, finished?}` (§4.7.3).
pub fn evaluate(ctx: &mut GameContext, event: &GameUpdateEvent, config: &EngineConfig, now: Instant) -> EvaluateResult {
    let outcome = {
        let tickers = &ctx.tickers;
        match &mut ctx.state {
            SportState::Hockey(s) => evaluate_hockey(s, tickers, event, config, now),
            SportState::Soccer(s) => evaluate_soccer(s, tickers, event, config, now),
            SportState::Football(s) => evaluate_football(s, tickers, event, config, now),
        }
    };

    for status in outcome.notifications {
        ctx.set_match_status(status);
    }
    if let Some(record) = outcome.overturn {
        ctx.last_overturn = Some(record);
    }

    EvaluateResult {
        intents: outcome.intents,
        finished: outcome.finished,
    }
}

fn slam_intents_for(
    common: &engine_core::sport_state::CommonState,
    home_ticker: &Option<String>,
    away_ticker: &Option<String>,
) -> Vec<OrderIntent> {
    if common.home_score == common.away_score {
        return Vec::new();
    }
    let (winner_ticker, winner_outcome, loser_ticker, loser_outcome) = if common.home_score > common.away_score {
        (home_ticker, Outcome::Home, away_ticker, Outcome::Away)
    } else {
        (away_ticker, Outcome::Away, home_ticker, Outcome::Home)
    };

    let mut out = Vec::new();
    if let Some(t) = winner_ticker {
        out.push(intent(
            engine_core::types::Sport::Hockey, &common.league, &common.eid, &common.eid, t,
            Side::Yes, winner_outcome, 99.0, "slam at finish", common.home_score, common.away_score, false, true,
        ));
    }
    if let Some(t) = loser_ticker {
        out.push(intent(
            engine_core::types::Sport::Hockey, &common.league, &common.eid, &common.eid, t,
            Side::No, loser_outcome, 99.0, "slam at finish", common.home_score, common.away_score, false, true,
        ));
    }
    out
}

/// `on_finish` (§4.7.4): emits the winner-YES / loser-NO slam pair at the
/// settlement-buffer limit of 99.
pub fn on_finish(ctx: &mut GameContext) -> Vec<OrderIntent> {
    let common = ctx.state.common();
    let sport = ctx.sport;
    if common.home_score == common.away_score {
        return Vec::new();
    }
    let (winner_ticker, winner_outcome, loser_ticker, loser_outcome) = if common.home_score > common.away_score {
        (common.home_ticker.clone(), Outcome::Home, common.away_ticker.clone(), Outcome::Away)
    } else {
        (common.away_ticker.clone(), Outcome::Away, common.home_ticker.clone(), Outcome::Home)
    };

    let mut out = Vec::new();
    if let Some(t) = winner_ticker {
        out.push(intent(
            sport, &common.league, &common.eid, &common.eid, &t,
            Side::Yes, winner_outcome, 99.0, "slam at finish", common.home_score, common.away_score, false, true,
        ));
    }
    if let Some(t) = loser_ticker {
        out.push(intent(
            sport, &common.league, &common.eid, &common.eid, &t,
            Side::No, loser_outcome, 99.0, "slam at finish", common.home_score, common.away_score, false, true,
        ));
    }
    out
}

/// `strategy.on_price_update` (§4.7.5): currently a no-op for all sports,
/// the hook is kept so a future sport can react to a price tick alone.
pub fn on_price_update(_ctx: &mut GameContext) -> Vec<OrderIntent> {
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_context::GameContext;
    use engine_core::sport_state::{HockeyState, SoccerState};
    use engine_core::types::Sport;

    fn hockey_event(home: i32, away: i32, period: &str, time_left: f64) -> GameUpdateEvent {
        GameUpdateEvent {
            sport: Sport::Hockey,
            league: "nhl".into(),
            eid: "evt-1".into(),
            home_team: "Kings".into(),
            away_team: "Sharks".into(),
            home_score: home,
            away_score: away,
            period: period.into(),
            time_left_min: time_left,
            match_status: MatchStatus::Live,
            power_play: None,
            home_penalty_count: None,
            away_penalty_count: None,
            home_strength: Some(0.55),
            away_strength: Some(0.45),
            draw_strength: None,
            home_live: None,
            draw_live: None,
            away_live: None,
            home_red_cards: None,
            away_red_cards: None,
        }
    }

    fn ctx_with_hockey() -> GameContext {
        let state = SportState::Hockey(HockeyState::new("evt-1", "nhl", "kings", "sharks"));
        let mut ctx = GameContext::new(Sport::Hockey, "nhl", "kings", "sharks", state);
        ctx.state.set_tickers(Some("HOME".into()), Some("AWAY".into()), None);
        ctx
    }

    #[test]
    fn scenario_edge_threshold_emits_four_intents() {
        let mut ctx = ctx_with_hockey();
        let config = EngineConfig::from_env();
        let now = Instant::now();

        // First touch applies pregame and establishes live data.
        evaluate(&mut ctx, &hockey_event(0, 0, "1st", 20.0), &config, now);

        // Quote the home market far below any plausible model probability
        // so the edge check fires regardless of the formula's exact output.
        let mut home_td = TickerData::default();
        home_td.apply_update(1, 2, 10);
        ctx.tickers.insert("HOME".into(), home_td);
        let mut away_td = TickerData::default();
        away_td.apply_update(1, 2, 10);
        ctx.tickers.insert("AWAY".into(), away_td);

        let result = evaluate(&mut ctx, &hockey_event(1, 0, "1st", 19.0), &config, now);
        assert!(!result.intents.is_empty());
    }

    #[test]
    fn scenario_slam_at_finish_produces_winner_yes_loser_no() {
        let mut ctx = ctx_with_hockey();
        if let SportState::Hockey(s) = &mut ctx.state {
            s.common.home_score = 3;
            s.common.away_score = 2;
        }
        let intents = on_finish(&mut ctx);
        assert_eq!(intents.len(), 2);
        assert_eq!(intents[0].ticker, "HOME");
        assert_eq!(intents[0].side, Side::Yes);
        assert_eq!(intents[0].limit_pct, 99.0);
        assert!(intents[0].slam);
        assert_eq!(intents[1].ticker, "AWAY");
        assert_eq!(intents[1].side, Side::No);
    }

    #[test]
    fn tied_finish_emits_no_slam_intents() {
        let mut ctx = ctx_with_hockey();
        if let SportState::Hockey(s) = &mut ctx.state {
            s.common.home_score = 1;
            s.common.away_score = 1;
        }
        assert!(on_finish(&mut ctx).is_empty());
    }

    fn soccer_event(home: i32, away: i32, home_live: Option<f64>, draw_live: Option<f64>, away_live: Option<f64>) -> GameUpdateEvent {
        GameUpdateEvent {
            sport: Sport::Soccer,
            league: "epl".into(),
            eid: "evt-2".into(),
            home_team: "Arsenal".into(),
            away_team: "Chelsea".into(),
            home_score: home,
            away_score: away,
            period: "1st half".into(),
            time_left_min: 70.0,
            match_status: MatchStatus::Live,
            power_play: None,
            home_penalty_count: None,
            away_penalty_count: None,
            home_strength: Some(0.45),
            away_strength: Some(0.3),
            draw_strength: Some(0.25),
            home_live,
            draw_live,
            away_live,
            home_red_cards: None,
            away_red_cards: None,
        }
    }

    #[test]
    fn soccer_caches_vendor_live_1x2_on_score_change() {
        let mut state = SoccerState::new("evt-2", "epl", "arsenal", "chelsea");
        state.g0 = Some(2.6);
        let mut ctx = GameContext::new(Sport::Soccer, "epl", "arsenal", "chelsea", SportState::Soccer(state));
        ctx.state.set_tickers(Some("HOME".into()), Some("AWAY".into()), Some("DRAW".into()));
        let config = EngineConfig::from_env();
        let now = Instant::now();

        evaluate(&mut ctx, &soccer_event(0, 0, Some(0.4), Some(0.3), Some(0.3)), &config, now);
        evaluate(&mut ctx, &soccer_event(1, 0, Some(0.6), Some(0.2), Some(0.2)), &config, now);

        if let SportState::Soccer(s) = &ctx.state {
            assert_eq!(s.live_home_pct, Some(0.6));
            assert_eq!(s.live_draw_pct, Some(0.2));
            assert_eq!(s.live_away_pct, Some(0.2));
        } else {
            panic!("expected soccer state");
        }
    }
}
