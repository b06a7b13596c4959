//! Ticker Resolver (C4): pairs pregame odds entries with market event
//! tickers and price snapshots.

use crate::circuit_breaker::{ApiCircuitBreaker, ApiCircuitBreakerConfig};
use crate::name_match::{match_pair, normalize, AliasTable};
use crate::types::{Sport, TickerData};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use log::{debug, warn};
use reqwest::Client;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

/// One raw market row as the venue HTTP client returns it, grouped by
/// `event_ticker` into a tradeable fixture.
#[derive(Debug, Clone)]
pub struct RawMarketRow {
    pub event_ticker: String,
    pub ticker: String,
    pub title: String,
    pub yes_subtitle: String,
    pub expiration_time: String,
    pub yes_bid: i32,
    pub yes_ask: i32,
    pub volume: i64,
}

/// Out-of-scope collaborator: fetches the venue's active markets for a
/// sport's configured series prefixes. A real implementation wraps
/// `KalshiClient::get_markets`; tests supply an in-memory fake.
#[async_trait]
pub trait VenueMarketSource: Send + Sync {
    async fn fetch_active_markets(&self, series_prefixes: &[&str]) -> Result<Vec<RawMarketRow>>;
}

#[derive(Debug, Deserialize)]
struct VenueMarketsResponse {
    #[serde(default)]
    markets: Vec<VenueMarketRow>,
}

#[derive(Debug, Deserialize)]
struct VenueMarketRow {
    event_ticker: String,
    ticker: String,
    title: String,
    #[serde(default)]
    yes_subtitle: String,
    #[serde(rename = "close_time")]
    expiration_time: String,
    #[serde(default = "default_price")]
    yes_bid: i32,
    #[serde(default = "default_price")]
    yes_ask: i32,
    #[serde(default)]
    volume: i64,
}

fn default_price() -> i32 {
    -1
}

/// Out-of-scope-but-typed venue HTTP client, following the
/// `EspnClient`/`KalshiClient` shape: timeout, circuit breaker,
/// `is_available()`/`record_success()`/`record_failure()`. Request signing
/// itself (RSA-PSS, as `KalshiClient` does it) happens one layer up, outside
/// this crate; this type only talks to the unauthenticated markets endpoint.
pub struct HttpVenueMarketSource {
    client: Client,
    base_url: String,
    circuit_breaker: Arc<ApiCircuitBreaker>,
}

impl HttpVenueMarketSource {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(45))
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url,
            circuit_breaker: Arc::new(ApiCircuitBreaker::new(
                "venue-markets",
                ApiCircuitBreakerConfig {
                    failure_threshold: 5,
                    recovery_timeout: Duration::from_secs(60),
                    success_threshold: 2,
                },
            )),
        }
    }

    pub fn is_available(&self) -> bool {
        self.circuit_breaker.is_available()
    }

    async fn fetch_one(&self, series_prefix: &str) -> Result<Vec<RawMarketRow>> {
        let url = format!("{}/markets?series_ticker={}&status=open", self.base_url, series_prefix);
        let resp = self.client.get(&url).send().await?;
        let parsed: VenueMarketsResponse = resp.json().await?;
        Ok(parsed
            .markets
            .into_iter()
            .map(|m| RawMarketRow {
                event_ticker: m.event_ticker,
                ticker: m.ticker,
                title: m.title,
                yes_subtitle: m.yes_subtitle,
                expiration_time: m.expiration_time,
                yes_bid: m.yes_bid,
                yes_ask: m.yes_ask,
                volume: m.volume,
            })
            .collect())
    }
}

#[async_trait]
impl VenueMarketSource for HttpVenueMarketSource {
    async fn fetch_active_markets(&self, series_prefixes: &[&str]) -> Result<Vec<RawMarketRow>> {
        if !self.circuit_breaker.is_available() {
            return Err(anyhow!("venue markets circuit breaker is open"));
        }

        let mut rows = Vec::new();
        let mut any_ok = false;
        for prefix in series_prefixes {
            match self.fetch_one(prefix).await {
                Ok(mut r) => {
                    any_ok = true;
                    rows.append(&mut r);
                }
                Err(e) => warn!("fetch_active_markets: series {prefix} failed: {e}"),
            }
        }

        if any_ok {
            self.circuit_breaker.record_success();
            Ok(rows)
        } else {
            self.circuit_breaker.record_failure();
            Err(anyhow!("all series fetches failed"))
        }
    }
}

#[derive(Debug, Clone)]
pub struct CachedMarketEvent {
    pub event_ticker: String,
    pub home_team: String,
    pub away_team: String,
    pub expiry: DateTime<Utc>,
    pub home_ticker: String,
    pub away_ticker: String,
    pub draw_ticker: Option<String>,
    pub all_tickers: Vec<String>,
    pub price_snapshot: HashMap<String, TickerData>,
}

#[derive(Debug, Clone)]
pub struct ResolvedTickers {
    pub event_ticker: String,
    pub home_ticker: String,
    pub away_ticker: String,
    pub draw_ticker: Option<String>,
    pub all_tickers: Vec<String>,
    pub price_snapshots: HashMap<String, TickerData>,
}

fn parse_expiry(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    // Accept ISO-8601 without a timezone offset; assume UTC.
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(DateTime::from_naive_utc_and_offset(naive, Utc));
        }
    }
    None
}

fn extract_team_names(row: &RawMarketRow) -> Option<(String, String)> {
    for sep in [" at ", " vs. ", " vs "] {
        if let Some((a, b)) = row.title.split_once(sep) {
            return Some((a.trim().to_string(), b.trim().to_string()));
        }
    }
    None
}

fn strip_outcome_suffix(subtitle: &str) -> String {
    for suffix in [" to Win", " Winner", " Wins", " Win"] {
        if let Some(stripped) = subtitle.strip_suffix(suffix) {
            return stripped.trim().to_string();
        }
    }
    subtitle.trim().to_string()
}

/// Group raw rows into per-fixture `CachedMarketEvent`s. For soccer, the row
/// whose ticker ends in `-TIE` is the draw ticker; the remaining two are
/// home and away, in title-parse order when available.
fn build_events(sport: Sport, rows: Vec<RawMarketRow>) -> Vec<CachedMarketEvent> {
    let mut grouped: HashMap<String, Vec<RawMarketRow>> = HashMap::new();
    for row in rows {
        grouped.entry(row.event_ticker.clone()).or_default().push(row);
    }

    let mut events = Vec::new();
    for (event_ticker, rows) in grouped {
        let expiry = rows
            .iter()
            .find_map(|r| parse_expiry(&r.expiration_time));
        let Some(expiry) = expiry else {
            let err = crate::error::EngineError::ParseError {
                field: format!("{event_ticker}.expiration_time"),
                detail: "no row parsed as RFC3339 or bare ISO-8601".into(),
            };
            debug!("{err}, skipping event");
            continue;
        };

        let draw_row = if sport == Sport::Soccer {
            rows.iter().find(|r| r.ticker.ends_with("-TIE")).cloned()
        } else {
            None
        };
        let non_draw: Vec<&RawMarketRow> = rows
            .iter()
            .filter(|r| Some(r.ticker.clone()) != draw_row.as_ref().map(|d| d.ticker.clone()))
            .collect();

        let (home_ticker, away_ticker, home_team, away_team) = if non_draw.len() >= 2 {
            let first = non_draw[0];
            let second = non_draw[1];
            if let Some((h, a)) = extract_team_names(first) {
                (first.ticker.clone(), second.ticker.clone(), h, a)
            } else {
                let h = strip_outcome_suffix(&first.yes_subtitle);
                let a = strip_outcome_suffix(&second.yes_subtitle);
                (first.ticker.clone(), second.ticker.clone(), h, a)
            }
        } else {
            debug!("skipping event {event_ticker}: fewer than two non-draw markets");
            continue;
        };

        let mut all_tickers: Vec<String> = rows.iter().map(|r| r.ticker.clone()).collect();
        all_tickers.sort();

        let mut price_snapshot = HashMap::new();
        for row in &rows {
            let mut td = TickerData::default();
            td.apply_update(row.yes_bid, row.yes_ask, row.volume);
            price_snapshot.insert(row.ticker.clone(), td);
        }

        events.push(CachedMarketEvent {
            event_ticker,
            home_team,
            away_team,
            expiry,
            home_ticker,
            away_ticker,
            draw_ticker: draw_row.map(|r| r.ticker),
            all_tickers,
            price_snapshot,
        });
    }
    events
}

pub struct TickerResolver {
    source: Box<dyn VenueMarketSource>,
    cache: HashMap<Sport, Vec<CachedMarketEvent>>,
    expiry_window: Duration,
}

impl TickerResolver {
    pub fn new(source: Box<dyn VenueMarketSource>, expiry_window: Duration) -> Self {
        Self {
            source,
            cache: HashMap::new(),
            expiry_window,
        }
    }

    pub async fn refresh_markets(&mut self, sport: Sport) -> Result<()> {
        let series: Vec<&str> = crate::league_config::for_sport(sport)
            .into_iter()
            .flat_map(|cfg| {
                let mut s = vec![cfg.series_game];
                if let Some(draw) = cfg.series_draw {
                    s.push(draw);
                }
                s
            })
            .collect();

        let rows = self.source.fetch_active_markets(&series).await?;
        let events = build_events(sport, rows);
        self.cache.insert(sport, events);
        Ok(())
    }

    /// Look up the cached market event whose team titles fuzzy-match the
    /// provided pair and whose expiry lies in the configurable future window.
    pub fn resolve(
        &self,
        sport: Sport,
        home_team: &str,
        away_team: &str,
        now: DateTime<Utc>,
        aliases: &AliasTable,
    ) -> Option<ResolvedTickers> {
        let events = self.cache.get(&sport)?;
        let window_end = now + chrono::Duration::from_std(self.expiry_window).ok()?;
        let h_norm = normalize(home_team, aliases);
        let a_norm = normalize(away_team, aliases);

        for event in events {
            if event.expiry < now || event.expiry > window_end {
                continue;
            }
            let eh = normalize(&event.home_team, aliases);
            let ea = normalize(&event.away_team, aliases);
            if match_pair((&h_norm, &a_norm), (&eh, &ea)).is_some() {
                return Some(ResolvedTickers {
                    event_ticker: event.event_ticker.clone(),
                    home_ticker: event.home_ticker.clone(),
                    away_ticker: event.away_ticker.clone(),
                    draw_ticker: event.draw_ticker.clone(),
                    all_tickers: event.all_tickers.clone(),
                    price_snapshots: event.price_snapshot.clone(),
                });
            }
        }
        warn!("no market match for {home_team} vs {away_team} ({sport})");
        None
    }

    pub fn unmatched_kalshi_events(&self, sport: Sport, matched_set: &HashSet<String>) -> Vec<CachedMarketEvent> {
        self.cache
            .get(&sport)
            .map(|events| {
                events
                    .iter()
                    .filter(|e| !matched_set.contains(&e.event_ticker))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name_match::soccer_aliases;

    struct FakeSource {
        rows: Vec<RawMarketRow>,
    }

    #[async_trait]
    impl VenueMarketSource for FakeSource {
        async fn fetch_active_markets(&self, _series_prefixes: &[&str]) -> Result<Vec<RawMarketRow>> {
            Ok(self.rows.clone())
        }
    }

    fn soccer_rows() -> Vec<RawMarketRow> {
        vec![
            RawMarketRow {
                event_ticker: "KXEPLGAME-25JUL29ARSCHE".into(),
                ticker: "KXEPLGAME-25JUL29ARSCHE-ARS".into(),
                title: "Arsenal at Chelsea".into(),
                yes_subtitle: "Arsenal to Win".into(),
                expiration_time: "2026-07-30T18:00:00Z".into(),
                yes_bid: 40,
                yes_ask: 45,
                volume: 100,
            },
            RawMarketRow {
                event_ticker: "KXEPLGAME-25JUL29ARSCHE".into(),
                ticker: "KXEPLGAME-25JUL29ARSCHE-CHE".into(),
                title: "Arsenal at Chelsea".into(),
                yes_subtitle: "Chelsea to Win".into(),
                expiration_time: "2026-07-30T18:00:00Z".into(),
                yes_bid: 30,
                yes_ask: 35,
                volume: 80,
            },
            RawMarketRow {
                event_ticker: "KXEPLGAME-25JUL29ARSCHE".into(),
                ticker: "KXEPLGAME-25JUL29ARSCHE-TIE".into(),
                title: "Arsenal at Chelsea".into(),
                yes_subtitle: "Draw".into(),
                expiration_time: "2026-07-30T18:00:00Z".into(),
                yes_bid: 20,
                yes_ask: 25,
                volume: 50,
            },
        ]
    }

    #[tokio::test]
    async fn resolve_finds_soccer_event_with_draw_ticker() {
        let mut resolver = TickerResolver::new(Box::new(FakeSource { rows: soccer_rows() }), Duration::from_secs(48 * 3600));
        resolver.refresh_markets(Sport::Soccer).await.unwrap();

        let now = DateTime::parse_from_rfc3339("2026-07-29T00:00:00Z").unwrap().with_timezone(&Utc);
        let resolved = resolver
            .resolve(Sport::Soccer, "Arsenal", "Chelsea", now, &soccer_aliases())
            .expect("should resolve");
        assert_eq!(resolved.home_ticker, "KXEPLGAME-25JUL29ARSCHE-ARS");
        assert_eq!(resolved.away_ticker, "KXEPLGAME-25JUL29ARSCHE-CHE");
        assert_eq!(resolved.draw_ticker.as_deref(), Some("KXEPLGAME-25JUL29ARSCHE-TIE"));
        assert_eq!(resolved.price_snapshots.len(), 3);
    }

    #[tokio::test]
    async fn resolve_respects_expiry_window() {
        let mut resolver = TickerResolver::new(Box::new(FakeSource { rows: soccer_rows() }), Duration::from_secs(3600));
        resolver.refresh_markets(Sport::Soccer).await.unwrap();
        let now = DateTime::parse_from_rfc3339("2026-07-29T00:00:00Z").unwrap().with_timezone(&Utc);
        assert!(resolver
            .resolve(Sport::Soccer, "Arsenal", "Chelsea", now, &soccer_aliases())
            .is_none());
    }

    #[test]
    fn parse_expiry_accepts_with_and_without_timezone() {
        assert!(parse_expiry("2026-07-30T18:00:00Z").is_some());
        assert!(parse_expiry("2026-07-30T18:00:00").is_some());
    }

    #[test]
    fn extract_team_names_handles_all_separators() {
        let mut row = RawMarketRow {
            event_ticker: "e".into(),
            ticker: "t".into(),
            title: "Kings vs. Sharks".into(),
            yes_subtitle: String::new(),
            expiration_time: String::new(),
            yes_bid: -1,
            yes_ask: -1,
            volume: 0,
        };
        assert_eq!(extract_team_names(&row), Some(("Kings".into(), "Sharks".into())));
        row.title = "Jets vs Bills".into();
        assert_eq!(extract_team_names(&row), Some(("Jets".into(), "Bills".into())));
    }

    #[test]
    fn strip_outcome_suffix_handles_all_forms() {
        assert_eq!(strip_outcome_suffix("Chiefs to Win"), "Chiefs");
        assert_eq!(strip_outcome_suffix("Chiefs Winner"), "Chiefs");
        assert_eq!(strip_outcome_suffix("Chiefs Wins"), "Chiefs");
        assert_eq!(strip_outcome_suffix("Chiefs Win"), "Chiefs");
    }
}
