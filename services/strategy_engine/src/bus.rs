//! Redis pub/sub glue: deserializes inbound bus events into the wire types
//! and routes them into the engine; serializes outbound order intents back
//! out. Channel names are namespaced per sport so every process can share
//! one Redis instance.

use crate::engine::GameEngine;
use engine_core::redis::{ReconnectingPubSub, RedisBus};
use engine_core::types::{GameUpdateEvent, MarketUpdateEvent, OrderIntent, Sport, WsStatusEvent};
use futures_util::StreamExt;
use log::{error, warn};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

fn channel(sport: Sport, suffix: &str) -> String {
    format!("{sport}:{suffix}")
}

pub struct Bus {
    redis: RedisBus,
    sport: Sport,
}

impl Bus {
    pub async fn connect(sport: Sport) -> anyhow::Result<Self> {
        let redis = RedisBus::new().await?;
        Ok(Self { redis, sport })
    }

    /// Drains the engine's outbound intent channel and republishes every
    /// item onto this sport's `order_intents` channel. Runs until the
    /// sender side is dropped.
    pub async fn run_intent_publisher(&self, mut intent_rx: UnboundedReceiver<OrderIntent>) {
        let channel_name = channel(self.sport, "order_intents");
        while let Some(intent) = intent_rx.recv().await {
            if let Err(e) = self.redis.publish(&channel_name, &intent).await {
                error!("failed to publish order intent: {e}");
            }
        }
    }

    /// Subscribes to this sport's three inbound channels and routes every
    /// message into the engine. Each subscription reconnects on its own
    /// (`ReconnectingPubSub`); a parse failure drops that single message
    /// and logs a warning rather than tearing down the subscription.
    pub async fn run_inbound_routing(&self, engine: Arc<GameEngine>) {
        let client = self.redis.get_client();

        let game_updates = channel(self.sport, "game_updates");
        let market_updates = channel(self.sport, "market_updates");
        let ws_status = channel(self.sport, "ws_status");

        let game_engine = engine.clone();
        let game_client = client.clone();
        let game_task = tokio::spawn(async move {
            let mut stream = ReconnectingPubSub::subscribe(game_client, vec![game_updates]).into_message_stream();
            while let Some(msg) = stream.next().await {
                match msg.get_payload::<String>() {
                    Ok(payload) => match serde_json::from_str::<GameUpdateEvent>(&payload) {
                        Ok(event) => game_engine.route_game_update(event),
                        Err(e) => warn!("game_update parse failure: {e}"),
                    },
                    Err(e) => warn!("game_update payload read failure: {e}"),
                }
            }
        });

        let market_engine = engine.clone();
        let market_client = client.clone();
        let market_task = tokio::spawn(async move {
            let mut stream = ReconnectingPubSub::subscribe(market_client, vec![market_updates]).into_message_stream();
            while let Some(msg) = stream.next().await {
                match msg.get_payload::<String>() {
                    Ok(payload) => match serde_json::from_str::<MarketUpdateEvent>(&payload) {
                        Ok(event) => market_engine.route_market_update(event),
                        Err(e) => warn!("market_update parse failure: {e}"),
                    },
                    Err(e) => warn!("market_update payload read failure: {e}"),
                }
            }
        });

        let status_engine = engine.clone();
        let status_client = client.clone();
        let status_task = tokio::spawn(async move {
            let mut stream = ReconnectingPubSub::subscribe(status_client, vec![ws_status]).into_message_stream();
            while let Some(msg) = stream.next().await {
                match msg.get_payload::<String>() {
                    Ok(payload) => match serde_json::from_str::<WsStatusEvent>(&payload) {
                        Ok(event) => status_engine.route_ws_status(event),
                        Err(e) => warn!("ws_status parse failure: {e}"),
                    },
                    Err(e) => warn!("ws_status payload read failure: {e}"),
                }
            }
        });

        let _ = tokio::join!(game_task, market_task, status_task);
    }
}
