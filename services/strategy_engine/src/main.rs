//! Strategy Engine
//!
//! One process per sport (hockey, soccer, or football), selected by
//! `ENGINE_SPORT`. Each process:
//! - resolves live games against venue markets and pregame odds (C3/C4)
//! - runs one actor per game tracking score, clock, and model edge (C1/C5/C6)
//! - evaluates every inbound tick against the edge threshold and emits order
//!   intents (C7)
//! - moves events and intents over Redis pub/sub so the venue adapters and
//!   the execution layer can live in separate processes

mod bus;
mod config;
mod engine;
mod game_context;
mod strategy;
mod tickers;

use anyhow::Result;
use bus::Bus;
use config::ProcessConfig;
use dotenv::dotenv;
use engine::GameEngine;
use engine_core::config::EngineConfig;
use engine_core::name_match::{football_aliases, hockey_aliases, soccer_aliases};
use engine_core::pregame::{HttpPregameProvider, PregameCache};
use engine_core::resolver::{HttpVenueMarketSource, TickerResolver};
use engine_core::store::GameStore;
use engine_core::types::Sport;
use log::info;
use std::sync::Arc;
use tokio::sync::mpsc::unbounded_channel;
use tokio::sync::Mutex as AsyncMutex;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();

    let process_config = ProcessConfig::from_env();
    let engine_config = Arc::new(EngineConfig::from_env());

    info!(
        "starting strategy engine: sport={:?} league={} venue={}",
        process_config.sport, process_config.league, process_config.venue_base_url
    );

    let aliases = match process_config.sport {
        Sport::Hockey => hockey_aliases(),
        Sport::Football => football_aliases(),
        Sport::Soccer => soccer_aliases(),
    };

    let venue_source = HttpVenueMarketSource::new(process_config.venue_base_url.clone());
    let resolver = Arc::new(AsyncMutex::new(TickerResolver::new(
        Box::new(venue_source),
        engine_config.ticker_expiry_window,
    )));

    let pregame_provider = Arc::new(HttpPregameProvider::new(process_config.pregame_endpoint.clone()));
    let pregame_cache = Arc::new(PregameCache::new(engine_config.pregame_cache_ttl, engine_config.pregame_retry_cool));

    let store = Arc::new(GameStore::new());
    let ticker_subscriber = Arc::new(tickers::NoopTickerSubscriber);
    let (intent_tx, intent_rx) = unbounded_channel();

    let game_engine = Arc::new(GameEngine::new(
        process_config.sport,
        process_config.league.clone(),
        store,
        resolver,
        pregame_cache,
        pregame_provider,
        ticker_subscriber,
        engine_config,
        aliases,
        intent_tx,
    ));

    game_engine.initialize_games().await?;

    let bus = Arc::new(Bus::connect(process_config.sport).await?);

    let refresh_handle = tokio::spawn(game_engine.clone().run_refresh_loop());
    let publisher_handle = {
        let bus = bus.clone();
        tokio::spawn(async move { bus.run_intent_publisher(intent_rx).await })
    };
    let routing_handle = {
        let bus = bus.clone();
        let game_engine = game_engine.clone();
        tokio::spawn(async move { bus.run_inbound_routing(game_engine).await })
    };

    let _ = tokio::join!(refresh_handle, publisher_handle, routing_handle);

    Ok(())
}
