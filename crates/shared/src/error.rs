use thiserror::Error;

use crate::types::RaceState;

#[derive(Debug, Error)]
pub enum RaceError {
    #[error("track has no checkpoints")]
    EmptyTrack,
    #[error("a race needs at least one agent")]
    NoAgents,
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("illegal race transition {from:?} -> {to:?}")]
    IllegalTransition { from: RaceState, to: RaceState },
    #[error("expected {expected} control inputs, got {got}")]
    InputCount { expected: usize, got: usize },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
