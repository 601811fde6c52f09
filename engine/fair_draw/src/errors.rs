//! Error types for the draw engine and the reveal controller.

use thiserror::Error;

use crate::types::PrizeColor;

/// Reasons a draw is refused. None of these are retried by the engine:
/// drawing again from the same state fails the same way.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DrawError {
    #[error("Current cycle is already completed; start a new cycle first")]
    CycleCompleted,

    #[error("No available prizes{}", color_scope(.color))]
    NoAvailablePrizes { color: Option<PrizeColor> },

    #[error("Draw limit of {limit} reached but cycle is not marked completed")]
    DrawLimitReached { limit: u32 },

    #[error("All color quotas are exhausted but cycle is not marked completed")]
    NoAvailableColors,
}

impl DrawError {
    /// `true` for the refusals that can only come from broken accounting.
    /// Callers should log the cycle and force a new one.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::DrawLimitReached { .. } | Self::NoAvailableColors)
    }
}

fn color_scope(color: &Option<PrizeColor>) -> String {
    match color {
        Some(c) => format!(" for color {c}"),
        None => String::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Draw quotas must be non-zero")]
    ZeroQuota,

    #[error("drawsPerCycle ({draws_per_cycle}) must equal drawsPerColor ({draws_per_color}) x {colors} colors")]
    QuotaMismatch {
        draws_per_cycle: u32,
        draws_per_color: u32,
        colors: u32,
    },

    #[error("Spin duration range is inverted: min {min_ms}ms > max {max_ms}ms")]
    InvalidSpinRange { min_ms: u128, max_ms: u128 },

    #[error("Frame rate settings must be non-zero")]
    ZeroFrameRate,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnimationError {
    #[error("Reveal target {0} is not in the catalog")]
    UnknownTarget(String),

    #[error("Nothing to animate: catalog is empty")]
    EmptyCatalog,

    #[error("Invalid reveal timing: {0}")]
    Config(#[from] ConfigError),

    #[error("Frame callback failed: {0}")]
    Frame(String),

    #[error("Reveal task aborted: {0}")]
    Aborted(String),
}

/// Inconsistencies found by [`crate::validate_state`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateViolation {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Catalog is empty")]
    EmptyCatalog,

    #[error("Cycle {cycle_id}: {remaining} remaining + {drawn} drawn != {expected} per cycle")]
    DrawCountMismatch {
        cycle_id: String,
        remaining: u32,
        drawn: u32,
        expected: u32,
    },

    #[error("Cycle {cycle_id}: {color} quota broken ({remaining} remaining + {drawn} drawn != {expected})")]
    QuotaMismatch {
        cycle_id: String,
        color: PrizeColor,
        remaining: u32,
        drawn: u32,
        expected: u32,
    },

    #[error("Cycle {cycle_id}: result {position} has draw number {found}")]
    DrawNumberGap {
        cycle_id: String,
        position: usize,
        found: u32,
    },

    #[error("Cycle {cycle_id}: completed flag disagrees with remaining quotas")]
    CompletionMismatch { cycle_id: String },

    #[error("Cycle {cycle_id}: result references unknown prize {prize_id}")]
    UnknownPrize { cycle_id: String, prize_id: String },
}
