//! # Draw Engine
//!
//! One draw picks a color uniformly among the colors that still have quota in
//! the current cycle, then a prize uniformly among the catalog entries of that
//! color. Because a color leaves the candidate set once its quota hits zero, a
//! completed cycle always holds exactly `draws_per_color` results per color.
//!
//! The engine owns nothing but its random source. All operations borrow the
//! input state and hand back a new one.

use std::sync::Arc;

use chrono::Utc;
use rand::rngs::{OsRng, StdRng};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::catalog::prizes_of;
use crate::errors::DrawError;
use crate::types::{ColorTally, DrawResult, LotteryConfig, LotteryCycle, LotteryState, Prize, PrizeColor};

/// Output of a successful [`DrawEngine::draw`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drawn {
    /// Replacement for the state passed in.
    pub state: LotteryState,
    pub result: DrawResult,
}

/// Derived view of a cycle's progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleProgress {
    pub completed_draws: u32,
    pub total_draws: u32,
    /// Rounded to the nearest whole percent.
    pub percentage: u32,
    pub remaining_by_color: ColorTally,
}

pub struct DrawEngine<R = StdRng> {
    rng: R,
}

impl DrawEngine<StdRng> {
    /// Engine seeded from the operating system CSPRNG.
    pub fn new() -> Self {
        Self::with_rng(secure_rng())
    }
}

impl Default for DrawEngine<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> DrawEngine<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Perform one draw against `state`.
    ///
    /// When the draw exhausts the last quota, the finished cycle is appended
    /// to history and a fresh cycle becomes current in the returned state.
    pub fn draw(&mut self, state: &LotteryState) -> Result<Drawn, DrawError> {
        let cycle = &state.current_cycle;
        let limit = state.config.draws_per_cycle;

        if cycle.completed {
            return Err(DrawError::CycleCompleted);
        }
        if state.catalog.is_empty() {
            return Err(DrawError::NoAvailablePrizes { color: None });
        }
        if cycle.completed_draws() >= limit {
            return Err(DrawError::DrawLimitReached { limit });
        }

        let open_colors: Vec<PrizeColor> = cycle
            .remaining
            .iter()
            .filter(|(_, left)| *left > 0)
            .map(|(color, _)| color)
            .collect();

        // Every color that still owes draws must be drawable, otherwise the
        // cycle could never complete.
        if let Some(&color) = open_colors
            .iter()
            .find(|c| prizes_of(&state.catalog, **c).next().is_none())
        {
            return Err(DrawError::NoAvailablePrizes { color: Some(color) });
        }

        let color = *open_colors
            .choose(&mut self.rng)
            .ok_or(DrawError::NoAvailableColors)?;

        let candidates: Vec<&Prize> = prizes_of(&state.catalog, color).collect();
        let prize = *candidates
            .choose(&mut self.rng)
            .ok_or(DrawError::NoAvailablePrizes { color: Some(color) })?;

        let now = Utc::now().timestamp_millis();
        let result = DrawResult {
            prize_id: prize.id.clone(),
            timestamp: now,
            cycle_id: cycle.id.clone(),
            draw_number: cycle.completed_draws() + 1,
        };

        let mut next = cycle.clone();
        next.results.push(result.clone());
        *next.remaining.get_mut(color) -= 1;
        if next.remaining.total() == 0 {
            next.completed = true;
            next.end_time = Some(now);
        }

        debug!(
            "Drew {} ({color}) as #{} of cycle {}",
            prize.id, result.draw_number, next.id
        );

        let state = if next.completed {
            info!("Cycle {} completed after {} draws", next.id, next.results.len());
            let mut history = state.history.clone();
            history.push(Arc::new(next));
            LotteryState {
                current_cycle: LotteryCycle::fresh(&state.config, now),
                history,
                catalog: Arc::clone(&state.catalog),
                config: state.config.clone(),
            }
        } else {
            LotteryState {
                current_cycle: next,
                history: state.history.clone(),
                catalog: Arc::clone(&state.catalog),
                config: state.config.clone(),
            }
        };

        Ok(Drawn { state, result })
    }
}

/// Replace the current cycle with a fresh one, finished or not.
/// History is left untouched.
pub fn initialize_new_cycle(state: &LotteryState) -> LotteryState {
    let now = Utc::now().timestamp_millis();
    info!(
        "Starting new cycle early; abandoning {} with {} draws",
        state.current_cycle.id,
        state.current_cycle.results.len()
    );
    LotteryState {
        current_cycle: LotteryCycle::fresh(&state.config, now),
        history: state.history.clone(),
        catalog: Arc::clone(&state.catalog),
        config: state.config.clone(),
    }
}

/// Whether a draw may be attempted. The engine re-checks regardless.
pub fn can_draw(cycle: &LotteryCycle, config: &LotteryConfig) -> bool {
    !cycle.completed && cycle.completed_draws() < config.draws_per_cycle
}

pub fn cycle_progress(cycle: &LotteryCycle, config: &LotteryConfig) -> CycleProgress {
    let completed_draws = cycle.completed_draws();
    let total_draws = config.draws_per_cycle;
    let percentage = if total_draws == 0 {
        0
    } else {
        (f64::from(completed_draws) / f64::from(total_draws) * 100.0).round() as u32
    };

    CycleProgress {
        completed_draws,
        total_draws,
        percentage,
        remaining_by_color: cycle.remaining,
    }
}

/// `StdRng` seeded from `OsRng`, or from the clock when the OS has no entropy
/// source to offer. Draws are entertainment randomness, so the fallback is
/// acceptable.
pub(crate) fn secure_rng() -> StdRng {
    match StdRng::from_rng(OsRng) {
        Ok(rng) => rng,
        Err(e) => {
            warn!("OS entropy unavailable ({e}); seeding draws from the clock");
            let seed = Utc::now().timestamp_nanos_opt().unwrap_or_default() as u64;
            StdRng::seed_from_u64(seed)
        }
    }
}
