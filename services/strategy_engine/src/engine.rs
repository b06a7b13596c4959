//! Strategy Engine (C7): routes inbound bus events to the right game's
//! actor and runs the per-sport decision logic inside its closure. One
//! `GameEngine` instance per sport process (§10.1).

use crate::game_context::{GameContext, GameContextHandle};
use crate::strategy;
use crate::tickers::TickerSubscriber;
use engine_core::config::EngineConfig;
use engine_core::error::EngineError;
use engine_core::name_match::{match_pair, normalize, AliasTable, Orientation};
use engine_core::pregame::{fetch_with_backoff, PregameCache, PregameProvider};
use engine_core::projection::{infer_lambdas, Probabilities};
use engine_core::resolver::{ResolvedTickers, TickerResolver};
use engine_core::sport_state::{FootballState, HockeyState, SoccerState, SportState, SportStateOps};
use engine_core::store::GameStore;
use engine_core::types::{GameUpdateEvent, MatchStatus, OrderIntent, PregameOdds, Sport, WsStatusEvent};
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock as StdRwLock};
use std::time::Instant;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Mutex as AsyncMutex;

/// Auxiliary index the router keeps alongside `GameStore` so the slow,
/// fuzzy-match fallback path has team names to compare against -- the store
/// itself is keyed by canonical pair and never enumerable (§C2).
type FuzzyIndex = StdRwLock<HashMap<Sport, Vec<(String, String, GameContextHandle)>>>;

pub struct GameEngine {
    sport: Sport,
    league: String,
    store: Arc<GameStore<GameContextHandle>>,
    fuzzy_index: FuzzyIndex,
    resolver: Arc<AsyncMutex<TickerResolver>>,
    pregame_cache: Arc<PregameCache>,
    pregame_provider: Arc<dyn PregameProvider>,
    ticker_subscriber: Arc<dyn TickerSubscriber>,
    config: Arc<EngineConfig>,
    aliases: AliasTable,
    intent_tx: UnboundedSender<OrderIntent>,
}

impl GameEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sport: Sport,
        league: impl Into<String>,
        store: Arc<GameStore<GameContextHandle>>,
        resolver: Arc<AsyncMutex<TickerResolver>>,
        pregame_cache: Arc<PregameCache>,
        pregame_provider: Arc<dyn PregameProvider>,
        ticker_subscriber: Arc<dyn TickerSubscriber>,
        config: Arc<EngineConfig>,
        aliases: AliasTable,
        intent_tx: UnboundedSender<OrderIntent>,
    ) -> Self {
        Self {
            sport,
            league: league.into(),
            store,
            fuzzy_index: StdRwLock::new(HashMap::new()),
            resolver,
            pregame_cache,
            pregame_provider,
            ticker_subscriber,
            config,
            aliases,
            intent_tx,
        }
    }

    fn new_sport_state(&self, eid: &str, home: &str, away: &str) -> SportState {
        match self.sport {
            Sport::Hockey => SportState::Hockey(HockeyState::new(eid, &self.league, home, away)),
            Sport::Soccer => SportState::Soccer(SoccerState::new(eid, &self.league, home, away)),
            Sport::Football => SportState::Football(FootballState::new(eid, &self.league, home, away)),
        }
    }

    fn apply_pregame(&self, state: &mut SportState, odds: &PregameOdds) {
        match state {
            SportState::Hockey(s) => s.set_pregame(odds.home_strength, odds.away_strength),
            SportState::Football(s) => s.set_pregame(odds.home_strength, odds.away_strength),
            SportState::Soccer(s) => {
                let g0 = odds.g0.unwrap_or(2.6);
                let target = Probabilities {
                    home: odds.home_strength,
                    draw: odds.draw_pct,
                    away: odds.away_strength,
                };
                let (lh, la) = infer_lambdas(target, g0);
                s.lambda_home = lh;
                s.lambda_away = la;
                s.model_draw_pct = odds.draw_pct * 100.0;
                s.set_pregame(odds.home_strength, odds.away_strength, g0);
            }
        }
    }

    /// Creates one game's actor from a resolved pregame/market pairing,
    /// registers it in the store and the fuzzy index, and kicks off its
    /// ticker subscription (§4.7.1).
    async fn spawn_game(&self, odds: &PregameOdds, resolved: &ResolvedTickers) {
        let home_norm = normalize(&odds.home_team, &self.aliases);
        let away_norm = normalize(&odds.away_team, &self.aliases);

        let mut state = self.new_sport_state(&resolved.event_ticker, &home_norm, &away_norm);
        self.apply_pregame(&mut state, odds);
        state.set_tickers(
            Some(resolved.home_ticker.clone()),
            Some(resolved.away_ticker.clone()),
            resolved.draw_ticker.clone(),
        );

        let mut ctx = GameContext::new(self.sport, &self.league, &home_norm, &away_norm, state);
        ctx.bound_id = Some(resolved.event_ticker.clone());
        for (ticker, snapshot) in &resolved.price_snapshots {
            ctx.tickers.insert(ticker.clone(), *snapshot);
        }

        let label = format!("{}:{}-{}", self.league, home_norm, away_norm);
        let handle = crate::game_context::spawn(ctx, self.config.inbox_capacity, label);

        self.store.put(self.sport, &home_norm, &away_norm, handle.clone());
        self.store.bind_id(self.sport, &resolved.event_ticker, handle.clone());
        for ticker in &resolved.all_tickers {
            self.store.register_ticker(ticker, handle.clone());
        }
        self.fuzzy_index
            .write()
            .unwrap()
            .entry(self.sport)
            .or_default()
            .push((home_norm, away_norm, handle));

        self.ticker_subscriber.subscribe_tickers(resolved.all_tickers.clone()).await;
    }

    /// Startup sweep (§4.7.1): refresh the venue's active markets, fetch
    /// pregame odds with backoff, resolve every fixture it can, and spawn an
    /// actor for each. Fixtures the venue lists but pregame never covers (or
    /// vice versa) are logged, not retried here.
    pub async fn initialize_games(&self) -> anyhow::Result<()> {
        self.resolver.lock().await.refresh_markets(self.sport).await?;

        let odds = fetch_with_backoff(
            self.pregame_provider.as_ref(),
            self.config.init_max_attempts,
            self.config.init_retry_base,
        )
        .await?;

        let now = chrono::Utc::now();
        let mut matched = HashSet::new();
        for entry in &odds {
            let resolver = self.resolver.lock().await;
            let Some(resolved) = resolver.resolve(self.sport, &entry.home_team, &entry.away_team, now, &self.aliases) else {
                continue;
            };
            drop(resolver);
            matched.insert(resolved.event_ticker.clone());
            self.spawn_game(entry, &resolved).await;
        }

        let unmatched = self.resolver.lock().await.unmatched_kalshi_events(self.sport, &matched);
        for event in unmatched {
            info!("venue event {} ({} vs {}) has no pregame match yet", event.event_ticker, event.home_team, event.away_team);
        }

        Ok(())
    }

    /// Long-running periodic refresh (§4.7.7): re-pulls the venue's active
    /// markets and the pregame cache on a fixed interval, with its own
    /// backoff for pregame fetch failures so a vendor outage doesn't spin.
    pub async fn run_refresh_loop(self: Arc<Self>) {
        let mut backoff = self.config.refresh_backoff_base;
        loop {
            tokio::time::sleep(self.config.refresh_interval).await;

            if let Err(e) = self.resolver.lock().await.refresh_markets(self.sport).await {
                warn!("periodic market refresh failed: {e}");
            }

            match self.pregame_cache.maybe_refresh(self.pregame_provider.as_ref()).await {
                Ok(_) => backoff = self.config.refresh_backoff_base,
                Err(e) => {
                    warn!("periodic pregame refresh failed: {e}, backing off {backoff:?}");
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(self.config.refresh_backoff_max);
                }
            }
        }
    }

    fn find_handle(&self, home: &str, away: &str) -> Option<(GameContextHandle, bool)> {
        let h_norm = normalize(home, &self.aliases);
        let a_norm = normalize(away, &self.aliases);

        if let Some(handle) = self.store.get_by_teams(self.sport, &h_norm, &a_norm) {
            return Some((handle, false));
        }

        let index = self.fuzzy_index.read().unwrap();
        let candidates = index.get(&self.sport)?;
        for (ch, ca, handle) in candidates {
            match match_pair((&h_norm, &a_norm), (ch, ca)) {
                Some(Orientation::SameOrder) => return Some((handle.clone(), false)),
                Some(Orientation::Swapped) => return Some((handle.clone(), true)),
                None => continue,
            }
        }
        None
    }

    /// Routes one inbound game-telemetry event to its game's actor (§4.7.2).
    /// Fast path: bound vendor id already known to the store. Slow path:
    /// exact canonical-pair lookup, falling back to fuzzy team matching with
    /// orientation detection.
    pub fn route_game_update(&self, mut event: GameUpdateEvent) {
        let handle = if let Some(handle) = self.store.get(self.sport, &event.eid) {
            handle
        } else {
            match self.find_handle(&event.home_team, &event.away_team) {
                Some((handle, swapped)) => {
                    if swapped {
                        event.swap_orientation();
                        debug!("orientation swapped for event {}", event.eid);
                    }
                    self.store.bind_id(self.sport, &event.eid, handle.clone());
                    handle
                }
                None => {
                    let err = EngineError::UnmatchedEvent {
                        sport: format!("{:?}", self.sport),
                        home: event.home_team.clone(),
                        away: event.away_team.clone(),
                    };
                    warn!("{err} (eid {})", event.eid);
                    return;
                }
            }
        };

        let config = self.config.clone();
        let intent_tx = self.intent_tx.clone();
        handle.send(move |ctx| apply_game_update(ctx, &event, &config, &intent_tx));
    }

    /// Routes one partial price update to every game context bound to that
    /// ticker (§4.7.5). A ticker can map to more than one context only in
    /// theory (draw tickers are never shared); in practice this is a
    /// single-element fan-out.
    pub fn route_market_update(&self, event: engine_core::types::MarketUpdateEvent) {
        for handle in self.store.by_ticker(&event.ticker) {
            let event = event.clone();
            let intent_tx = self.intent_tx.clone();
            handle.send(move |ctx| apply_market_update(ctx, &event, &intent_tx));
        }
    }

    /// Routes a venue websocket status flip to every known game in this
    /// sport. On disconnect, every known ticker's price resets to the
    /// worst-case default so a stale quote never drives a trade decision
    /// while the feed is down (§4.7.6).
    pub fn route_ws_status(&self, status: WsStatusEvent) {
        for handle in self.store.by_sport(self.sport) {
            handle.send(move |ctx| {
                ctx.venue_connected = status.connected;
                if !status.connected {
                    for ticker_data in ctx.tickers.values_mut() {
                        ticker_data.reset_to_default();
                    }
                    let tickers = &ctx.tickers;
                    match &mut ctx.state {
                        SportState::Hockey(s) => s.recalc_edge(tickers),
                        SportState::Soccer(s) => s.recalc_edge(tickers),
                        SportState::Football(s) => s.recalc_edge(tickers),
                    }
                }
                ctx.notify("WS_STATUS");
            });
        }
    }
}

/// Only reached for events whose period is not one of the finished labels
/// (those are intercepted in `apply_game_update` ahead of `strategy::evaluate`
/// and go straight to `GameFinish`). Derives the transition from the event's
/// own `match_status` (§4.7.2 step 9) rather than recomputing one from
/// scratch, so HALF_TIME/FULL_TIME/OVERTIME/POWER_PLAY/POWER_PLAY_END/
/// RED_CARD all pass through. `ctx.set_match_status` runs the state's
/// `deduplicate_status` once this returns; it is not applied here too, since
/// hockey's overtime dedup is stateful and would otherwise fire twice.
fn status_for_transition(event_status: MatchStatus, displayed_game_start: bool, score_changed: bool) -> MatchStatus {
    if score_changed {
        return MatchStatus::ScoreChange;
    }
    if event_status == MatchStatus::GameStart && displayed_game_start {
        return MatchStatus::Live;
    }
    event_status
}

/// Runs inside the game's closure: applies one telemetry tick end to end,
/// from the overturn/projection math through the status transition and
/// outbound intents (§4.7.2-§4.7.4).
fn apply_game_update(ctx: &mut GameContext, event: &GameUpdateEvent, config: &EngineConfig, intent_tx: &UnboundedSender<OrderIntent>) {
    if !ctx.state.has_pregame() {
        // Suppress display until the resolver/pregame path has bound a
        // model; still absorb the raw telemetry so nothing is lost once it
        // does bind.
        debug!("suppressing display for {}: no pregame applied yet", ctx.canonical_home);
    }

    // A finished-period label (soccer/football's "FT"/"Final"/...) ends the
    // game at the router level, ahead of -- not through -- the per-sport
    // evaluate path: once finaled, every later tick for this game is a no-op.
    if engine_core::sport_state::period_marks_finished(&event.period) {
        if ctx.state.is_finished() {
            return;
        }
        let tickers = &ctx.tickers;
        match &mut ctx.state {
            SportState::Hockey(s) => {
                s.common_mut().finaled = true;
                s.update_game_state(event.home_score, event.away_score, &event.period, event.time_left_min);
                s.recalc_edge(tickers);
            }
            SportState::Soccer(s) => {
                s.common_mut().finaled = true;
                s.update_game_state(event.home_score, event.away_score, &event.period, event.time_left_min);
                s.recalc_edge(tickers);
            }
            SportState::Football(s) => {
                s.common_mut().finaled = true;
                s.update_game_state(event.home_score, event.away_score, &event.period, event.time_left_min);
                s.recalc_edge(tickers);
            }
        }
        for intent in strategy::on_finish(ctx) {
            let _ = intent_tx.send(intent);
        }
        ctx.set_match_status(MatchStatus::GameFinish);
        return;
    }

    let before_score = (ctx.state.home_score(), ctx.state.away_score());
    let now = Instant::now();
    let result = strategy::evaluate(ctx, event, config, now);
    let score_changed = before_score != (ctx.state.home_score(), ctx.state.away_score());

    for intent in result.intents {
        let _ = intent_tx.send(intent);
    }

    if result.finished {
        for intent in strategy::on_finish(ctx) {
            let _ = intent_tx.send(intent);
        }
        ctx.set_match_status(MatchStatus::GameFinish);
        return;
    }

    let status = status_for_transition(event.match_status, ctx.displayed_game_start, score_changed);
    if status == MatchStatus::GameStart {
        ctx.displayed_game_start = true;
    }
    if status == MatchStatus::Live || status == MatchStatus::GameStart {
        ctx.displayed_live = true;
    }
    ctx.set_match_status(status);
}

/// Runs inside the game's closure: applies a partial price tick, recomputes
/// the edge, and fires the (currently inert) `on_price_update` hook
/// (§4.7.5). Steps (e) and (g): the closure stops short of recalculating
/// the edge at all while pregame hasn't been applied yet, and stops short of
/// `on_price_update`/`notify` while the game has never been shown live --
/// the price itself is still recorded either way so nothing is lost once
/// both gates open.
fn apply_market_update(ctx: &mut GameContext, event: &engine_core::types::MarketUpdateEvent, intent_tx: &UnboundedSender<OrderIntent>) {
    ctx.venue_connected = true;
    let ticker = ctx.get_or_default_ticker(&event.ticker);
    ticker.apply_update(event.yes_bid, event.yes_ask, event.volume);

    if !ctx.state.has_pregame() {
        return;
    }

    let tickers = &ctx.tickers;
    match &mut ctx.state {
        SportState::Hockey(s) => s.recalc_edge(tickers),
        SportState::Soccer(s) => s.recalc_edge(tickers),
        SportState::Football(s) => s.recalc_edge(tickers),
    }

    if !ctx.displayed_live {
        return;
    }

    for intent in strategy::on_price_update(ctx) {
        let _ = intent_tx.send(intent);
    }
    ctx.set_match_status(MatchStatus::PriceUpdate);
}
