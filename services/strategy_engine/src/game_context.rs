//! Game Context (C1): the single-writer mailbox owning one game's mutable
//! state. All correctness guarantees about score-drop state, pregame
//! binding idempotence, and edge-recomputation order follow from the fact
//! that a single game's fields are never concurrently mutated — every
//! write from another thread is modeled as a closure placed on the inbox.

use engine_core::error::EngineError;
use engine_core::sport_state::{SportState, SportStateOps};
use engine_core::types::{MatchStatus, Sport, TickerData};
use log::warn;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

pub type GameClosure = Box<dyn FnOnce(&mut GameContext) + Send>;

/// Most recent overturn transition, kept for observers that want to render
/// "was 2-1, corrected to 2-0" style messages.
#[derive(Debug, Clone, Copy)]
pub struct OverturnRecord {
    pub old_home: i32,
    pub old_away: i32,
    pub new_home: i32,
    pub new_away: i32,
}

/// Runs inline on the writer thread at the end of the closure that called
/// `notify`; must return quickly and never block on unbounded I/O. Allowed
/// to read any context field because it executes on the same thread that
/// owns them.
pub trait Observer: Send + Sync {
    fn on_event(&self, ctx: &GameContext, event_name: &str);
}

pub struct GameContext {
    pub sport: Sport,
    pub league: String,
    pub bound_id: Option<String>,
    pub canonical_home: String,
    pub canonical_away: String,
    pub state: SportState,
    pub tickers: HashMap<String, TickerData>,
    pub observers: Vec<Arc<dyn Observer>>,
    pub match_status: Option<MatchStatus>,
    pub venue_connected: bool,
    pub last_overturn: Option<OverturnRecord>,
    pub displayed_live: bool,
    pub displayed_game_start: bool,
}

impl GameContext {
    pub fn new(
        sport: Sport,
        league: impl Into<String>,
        canonical_home: impl Into<String>,
        canonical_away: impl Into<String>,
        state: SportState,
    ) -> Self {
        Self {
            sport,
            league: league.into(),
            bound_id: None,
            canonical_home: canonical_home.into(),
            canonical_away: canonical_away.into(),
            state,
            tickers: HashMap::new(),
            observers: Vec::new(),
            match_status: None,
            venue_connected: true,
            last_overturn: None,
            displayed_live: false,
            displayed_game_start: false,
        }
    }

    pub fn add_observer(&mut self, observer: Arc<dyn Observer>) {
        self.observers.push(observer);
    }

    pub fn notify(&self, event_name: &str) {
        for observer in &self.observers {
            observer.on_event(self, event_name);
        }
    }

    pub fn set_match_status(&mut self, status: MatchStatus) {
        let status = self.state.deduplicate_status(status);
        self.match_status = Some(status);
        self.notify(status_event_name(status));
    }

    /// Read helpers are contractually required to be invoked only from
    /// inside a closure, i.e. from the writer thread.
    pub fn yes_ask(&self, ticker: &str) -> i32 {
        self.tickers.get(ticker).map(|t| t.yes_ask).unwrap_or(100)
    }

    pub fn no_ask(&self, ticker: &str) -> i32 {
        self.tickers.get(ticker).map(|t| t.no_ask).unwrap_or(100)
    }

    pub fn total_volume(&self) -> i64 {
        self.tickers.values().map(|t| t.volume).sum()
    }

    /// Worst-case notional exposure in cents: every known ticker's yes/no
    /// contracts priced at their current asks.
    pub fn total_exposure(&self) -> i64 {
        self.tickers
            .values()
            .map(|t| (t.yes_ask as i64 + t.no_ask as i64) * t.volume)
            .sum()
    }

    pub fn get_or_default_ticker(&mut self, ticker: &str) -> &mut TickerData {
        self.tickers.entry(ticker.to_string()).or_default()
    }
}

fn status_event_name(status: MatchStatus) -> &'static str {
    match status {
        MatchStatus::GameStart => "GAME_START",
        MatchStatus::Live => "LIVE",
        MatchStatus::ScoreChange => "SCORE_CHANGE",
        MatchStatus::HalfTime => "HALF_TIME",
        MatchStatus::FullTime => "FULL_TIME",
        MatchStatus::Overtime => "OVERTIME",
        MatchStatus::PowerPlay => "POWER_PLAY",
        MatchStatus::PowerPlayEnd => "POWER_PLAY_END",
        MatchStatus::RedCard => "RED_CARD",
        MatchStatus::OverturnPending => "OVERTURN_PENDING",
        MatchStatus::OverturnConfirmed => "OVERTURN_CONFIRMED",
        MatchStatus::OverturnRejected => "OVERTURN_REJECTED",
        MatchStatus::GameFinish => "GAME_FINISH",
        MatchStatus::PriceUpdate => "PRICE_UPDATE",
    }
}

/// Clonable front for the actor: every write goes through `send`, which is
/// `try_send` and never awaits. A full mailbox drops the closure and
/// increments the overflow counter rather than blocking the caller.
#[derive(Clone)]
pub struct GameContextHandle {
    sender: mpsc::Sender<GameClosure>,
    closer: mpsc::Sender<()>,
    overflow: Arc<AtomicU64>,
    label: Arc<str>,
}

impl GameContextHandle {
    pub fn send(&self, f: impl FnOnce(&mut GameContext) + Send + 'static) {
        if self.sender.try_send(Box::new(f)).is_err() {
            self.overflow.fetch_add(1, Ordering::Relaxed);
            let err = EngineError::InboxOverflow {
                bound_id_or_pair: self.label.to_string(),
            };
            warn!("{err}");
        }
    }

    pub fn overflow_count(&self) -> u64 {
        self.overflow.load(Ordering::Relaxed)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Signals the consumer to drain whatever is already queued, then
    /// terminate. Idempotent: a second call is a harmless no-op send.
    pub fn close(&self) {
        let _ = self.closer.try_send(());
    }
}

/// Spawns the single consumer task that owns `ctx` for its whole lifetime,
/// draining closures off the bounded mailbox in arrival order.
pub fn spawn(ctx: GameContext, capacity: usize, label: impl Into<Arc<str>>) -> GameContextHandle {
    let (tx, mut rx) = mpsc::channel::<GameClosure>(capacity);
    let (close_tx, mut close_rx) = mpsc::channel::<()>(1);
    let overflow = Arc::new(AtomicU64::new(0));

    let handle = GameContextHandle {
        sender: tx,
        closer: close_tx,
        overflow: overflow.clone(),
        label: label.into(),
    };

    tokio::spawn(async move {
        let mut ctx = ctx;
        loop {
            tokio::select! {
                biased;
                _ = close_rx.recv() => {
                    while let Ok(closure) = rx.try_recv() {
                        closure(&mut ctx);
                    }
                    break;
                }
                maybe = rx.recv() => {
                    match maybe {
                        Some(closure) => closure(&mut ctx),
                        None => break,
                    }
                }
            }
        }
    });

    handle
}
