//! Projection Models (C6): pregame-strength -> live win probability, per sport.

pub mod hockey_football;
pub mod soccer;

pub use hockey_football::projected_odds;
pub use soccer::{infer_lambdas, inplay_probabilities, over_under_probability, Probabilities};
