//! # Fair Draw
//!
//! Quota-balanced prize draws plus the timed reveal that shows them.
//!
//! Every cycle hands out the same number of draws to each prize color. Within
//! a cycle the color is chosen uniformly among colors with quota left, so when
//! the cycle completes the per-color counts are exact.
//!
//! | Concern          | Entry point(s)                                                    |
//! |------------------|-------------------------------------------------------------------|
//! | Drawing          | [`DrawEngine::draw`], [`initialize_new_cycle`]                    |
//! | Gating / views   | [`can_draw`], [`cycle_progress`]                                  |
//! | Fairness         | [`validate_cycle_fairness`], [`audit_cycle`], [`generate_stats`]  |
//! | Integrity        | [`validate_state`]                                                |
//! | Reveal           | [`AnimationController`], [`run_reveal`], [`RevealHandle`]         |
//! | Persistence      | [`LotteryStore`] (implemented by the embedding service)           |
//!
//! ## Architecture
//!
//! The draw is committed first and animated second: the reveal controller is
//! handed an already-chosen prize id and can never change the outcome. All
//! engine operations borrow a [`LotteryState`] and return a new one, so a
//! caller swaps its reference in one step and readers never see a half-applied
//! draw.

mod animation;
mod catalog;
mod engine;
mod errors;
mod fairness;
mod reveal;
mod store;
mod types;
mod validation;

#[cfg(test)]
mod invariants;
#[cfg(test)]
mod test_draw_cycle;

pub use animation::{AnimationConfig, AnimationController, AnimationFrame, ItemVisual, Phase};
pub use catalog::{default_catalog, position_of, prizes_of, ColorLookup};
pub use engine::{can_draw, cycle_progress, initialize_new_cycle, CycleProgress, DrawEngine, Drawn};
pub use errors::{AnimationError, ConfigError, DrawError, StateViolation};
pub use fairness::{audit_cycle, generate_stats, tally_cycle, validate_cycle_fairness, DrawStats, FairnessVerdict};
pub use reveal::{run_reveal, RevealHandle, RevealOutcome};
pub use store::LotteryStore;
pub use types::{ColorTally, DrawResult, LotteryConfig, LotteryCycle, LotteryState, Prize, PrizeColor};
pub use validation::validate_state;
