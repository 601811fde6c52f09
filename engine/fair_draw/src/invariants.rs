//! Assertion helpers for the cycle invariants, shared by the test modules.

use std::sync::Arc;

use crate::catalog::ColorLookup;
use crate::fairness::tally_cycle;
use crate::types::{LotteryCycle, LotteryState, PrizeColor};

/// For every color, `remaining + drawn == draws_per_color`.
pub fn assert_quota_invariant(state: &LotteryState, cycle: &LotteryCycle) {
    let lookup = ColorLookup::new(&state.catalog);
    let (tally, unknown) = tally_cycle(cycle, &lookup);
    assert!(
        unknown.is_empty(),
        "quota broken: cycle {} has unknown prizes {:?}",
        cycle.id,
        unknown
    );
    for color in PrizeColor::ALL {
        assert_eq!(
            cycle.remaining.get(color) + tally.get(color),
            state.config.draws_per_color,
            "quota broken: cycle {} color {}",
            cycle.id,
            color
        );
    }
}

/// Draw numbers are exactly `1..=len`, in list order, all owned by
/// this cycle.
pub fn assert_sequential_draw_numbers(cycle: &LotteryCycle) {
    for (i, result) in cycle.results.iter().enumerate() {
        assert_eq!(
            result.draw_number,
            i as u32 + 1,
            "draw numbering broken: cycle {} position {} has draw number {}",
            cycle.id,
            i,
            result.draw_number
        );
        assert_eq!(
            result.cycle_id, cycle.id,
            "draw numbering broken: result {} filed under the wrong cycle",
            result.draw_number
        );
    }
}

/// Completed iff every quota is exhausted iff the cycle is full.
pub fn assert_completion_iff_exhausted(state: &LotteryState, cycle: &LotteryCycle) {
    let exhausted = cycle.remaining.total() == 0;
    let full = cycle.completed_draws() == state.config.draws_per_cycle;
    assert_eq!(
        cycle.completed, exhausted,
        "completion broken: cycle {} completed={} but remaining={}",
        cycle.id,
        cycle.completed,
        cycle.remaining.total()
    );
    assert_eq!(exhausted, full, "completion broken: cycle {} quota/length disagree", cycle.id);
    assert_eq!(
        cycle.completed,
        cycle.end_time.is_some(),
        "completion broken: cycle {} end_time out of step with completed",
        cycle.id
    );
}

/// `after.history` starts with the very same entries as `before.history`.
pub fn assert_history_prefix_unchanged(before: &LotteryState, after: &LotteryState) {
    assert!(
        after.history.len() >= before.history.len(),
        "history rewritten: history shrank from {} to {}",
        before.history.len(),
        after.history.len()
    );
    for (i, (old, new)) in before.history.iter().zip(&after.history).enumerate() {
        assert!(
            Arc::ptr_eq(old, new),
            "history rewritten: history entry {} was replaced",
            i
        );
    }
}

/// Run every per-state invariant on the current cycle and all of history.
pub fn assert_all_state_invariants(state: &LotteryState) {
    for cycle in std::iter::once(&state.current_cycle).chain(state.history.iter().map(|c| &**c)) {
        assert_quota_invariant(state, cycle);
        assert_sequential_draw_numbers(cycle);
        assert_completion_iff_exhausted(state, cycle);
    }
    for cycle in &state.history {
        assert!(cycle.completed, "history holds open cycle {}", cycle.id);
    }
}
