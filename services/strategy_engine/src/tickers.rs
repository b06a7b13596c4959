//! Outbound ticker-subscription hook (§10.5): once a game is bound to a set
//! of venue tickers, the engine asks its venue-feed collaborator to start
//! streaming price updates for them. Fire-and-forget by design -- a missed
//! subscribe surfaces later as a ticker that never prices, not as an error
//! here.

use async_trait::async_trait;

#[async_trait]
pub trait TickerSubscriber: Send + Sync {
    async fn subscribe_tickers(&self, tickers: Vec<String>);
}

/// Used where no live venue feed is wired up yet (tests, local runs without
/// a websocket bridge).
pub struct NoopTickerSubscriber;

#[async_trait]
impl TickerSubscriber for NoopTickerSubscriber {
    async fn subscribe_tickers(&self, _tickers: Vec<String>) {}
}
