//! Integrity checks for a loaded or restored [`LotteryState`].

use crate::catalog::ColorLookup;
use crate::errors::StateViolation;
use crate::fairness::tally_cycle;
use crate::types::{LotteryCycle, LotteryState};

/// Check config, catalog, the current cycle and every history entry.
///
/// Returns the first violation found.
pub fn validate_state(state: &LotteryState) -> Result<(), StateViolation> {
    state.config.validate()?;
    if state.catalog.is_empty() {
        return Err(StateViolation::EmptyCatalog);
    }

    let lookup = ColorLookup::new(&state.catalog);
    validate_cycle(&state.current_cycle, state, &lookup)?;
    for cycle in &state.history {
        validate_cycle(cycle, state, &lookup)?;
        if !cycle.completed {
            return Err(StateViolation::CompletionMismatch {
                cycle_id: cycle.id.clone(),
            });
        }
    }
    Ok(())
}

fn validate_cycle(
    cycle: &LotteryCycle,
    state: &LotteryState,
    lookup: &ColorLookup<'_>,
) -> Result<(), StateViolation> {
    let expected = state.config.draws_per_cycle;
    let remaining = cycle.remaining.total();
    let drawn = cycle.completed_draws();

    if remaining.checked_add(drawn) != Some(expected) || cycle.remaining.checked_total().is_none() {
        return Err(StateViolation::DrawCountMismatch {
            cycle_id: cycle.id.clone(),
            remaining,
            drawn,
            expected,
        });
    }

    for (position, result) in cycle.results.iter().enumerate() {
        if result.draw_number as usize != position + 1 {
            return Err(StateViolation::DrawNumberGap {
                cycle_id: cycle.id.clone(),
                position,
                found: result.draw_number,
            });
        }
    }

    let (tally, unknown) = tally_cycle(cycle, lookup);
    if let Some(prize_id) = unknown.into_iter().next() {
        return Err(StateViolation::UnknownPrize {
            cycle_id: cycle.id.clone(),
            prize_id,
        });
    }
    for (color, drawn) in tally.iter() {
        let left = cycle.remaining.get(color);
        if left.checked_add(drawn) != Some(state.config.draws_per_color) {
            return Err(StateViolation::QuotaMismatch {
                cycle_id: cycle.id.clone(),
                color,
                remaining: left,
                drawn,
                expected: state.config.draws_per_color,
            });
        }
    }

    if cycle.completed != (remaining == 0) || cycle.completed != cycle.end_time.is_some() {
        return Err(StateViolation::CompletionMismatch {
            cycle_id: cycle.id.clone(),
        });
    }

    Ok(())
}
