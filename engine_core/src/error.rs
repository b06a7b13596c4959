//! Typed error kinds for the strategy engine core.
//!
//! Every I/O boundary (HTTP fetch, config load) still returns `anyhow::Result`;
//! these variants are for the handful of conditions the engine itself
//! needs to recognize and route differently (retry vs. drop vs. fatal).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("transient fetch failure for {source}: {detail}")]
    TransientFetch { source: String, detail: String },

    #[error("unmatched live update for {sport} {home} vs {away}")]
    UnmatchedEvent {
        sport: String,
        home: String,
        away: String,
    },

    #[error("inbox overflow for game {bound_id_or_pair}, closure dropped")]
    InboxOverflow { bound_id_or_pair: String },

    #[error("config load failed: {0}")]
    ConfigLoad(String),

    #[error("parse error in {field}: {detail}")]
    ParseError { field: String, detail: String },

    #[error("orientation ambiguous for {home} vs {away}, defaulting to no-swap")]
    OrientationAmbiguous { home: String, away: String },
}
