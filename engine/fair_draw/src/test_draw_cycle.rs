use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::catalog::{default_catalog, ColorLookup};
use crate::engine::{cycle_progress, DrawEngine};
use crate::errors::DrawError;
use crate::fairness::{generate_stats, tally_cycle, validate_cycle_fairness};
use crate::invariants::{
    assert_all_state_invariants, assert_history_prefix_unchanged, assert_quota_invariant,
};
use crate::types::{ColorTally, LotteryConfig, LotteryState, Prize, PrizeColor};

fn engine(seed: u64) -> DrawEngine<StdRng> {
    DrawEngine::with_rng(StdRng::seed_from_u64(seed))
}

#[test]
fn test_six_draws_roll_one_cycle_into_history() {
    let mut engine = engine(2024);
    let mut state = LotteryState::with_defaults(0);

    for _ in 0..6 {
        state = engine.draw(&state).unwrap().state;
    }

    assert_eq!(state.history.len(), 1);
    let finished = &state.history[0];
    assert!(finished.completed);
    assert!(finished.end_time.is_some());
    assert_eq!(finished.results.len(), 6);

    let lookup = ColorLookup::new(&state.catalog);
    let (tally, unknown) = tally_cycle(finished, &lookup);
    assert!(unknown.is_empty());
    assert_eq!(tally, ColorTally::full(2));

    assert_ne!(state.current_cycle.id, finished.id);
    assert!(state.current_cycle.results.is_empty());
    assert_eq!(state.current_cycle.remaining, ColorTally::full(2));
}

#[test]
fn test_every_completed_cycle_is_fair_across_seeds() {
    for seed in 0..64 {
        let mut engine = engine(seed);
        let mut state = LotteryState::new(default_catalog(), LotteryConfig::with_quota(3), 0);

        for _ in 0..(9 * 5) {
            state = engine.draw(&state).unwrap().state;
        }

        assert_eq!(state.history.len(), 5, "seed {seed}");
        for cycle in &state.history {
            assert!(
                validate_cycle_fairness(cycle, &state.catalog, 3),
                "seed {seed}: cycle {} unfair",
                cycle.id
            );
        }
        let stats = generate_stats(&state.history, &state.catalog, 3);
        assert_eq!(stats.total_cycles, 5);
        assert_eq!(stats.total_draws, 45);
        assert_eq!(stats.fairness_passed, 5);
        assert_eq!(stats.color_distribution, ColorTally::full(15));
    }
}

#[test]
fn test_invariants_hold_at_every_step() {
    let mut engine = engine(99);
    let mut state = LotteryState::with_defaults(0);
    assert_all_state_invariants(&state);

    for _ in 0..20 {
        let before = state.clone();
        let drawn = engine.draw(&state).unwrap();
        state = drawn.state;

        assert_all_state_invariants(&state);
        assert_history_prefix_unchanged(&before, &state);
        assert_quota_invariant(&state, &state.current_cycle);
    }
}

#[test]
fn test_draw_numbers_run_one_to_n() {
    let mut engine = engine(17);
    let mut state = LotteryState::with_defaults(0);
    let mut seen = Vec::new();

    for _ in 0..12 {
        let drawn = engine.draw(&state).unwrap();
        seen.push(drawn.result.draw_number);
        state = drawn.state;
    }

    assert_eq!(seen, vec![1, 2, 3, 4, 5, 6, 1, 2, 3, 4, 5, 6]);
}

#[test]
fn test_draw_leaves_input_untouched() {
    let mut engine = engine(8);
    let mut state = LotteryState::with_defaults(0);

    for _ in 0..7 {
        let snapshot = state.clone();
        let drawn = engine.draw(&state).unwrap();
        assert_eq!(state, snapshot);
        state = drawn.state;
    }
}

#[test]
fn test_history_grows_by_one_per_cycle() {
    let mut engine = engine(31);
    let mut state = LotteryState::with_defaults(0);

    for expected in 1..=3 {
        let before = state.clone();
        for _ in 0..6 {
            state = engine.draw(&state).unwrap().state;
        }
        assert_eq!(state.history.len(), expected);
        assert_history_prefix_unchanged(&before, &state);
        assert_eq!(
            state.history.last().map(|c| c.id.clone()),
            Some(before.current_cycle.id.clone())
        );
    }
}

#[test]
fn test_catalog_is_shared_not_copied() {
    let mut engine = engine(4);
    let state = LotteryState::with_defaults(0);
    let next = engine.draw(&state).unwrap().state;
    assert!(Arc::ptr_eq(&state.catalog, &next.catalog));
}

#[test]
fn test_red_only_catalog_cannot_draw() {
    let reds: Vec<Prize> = default_catalog()
        .into_iter()
        .filter(|p| p.color == PrizeColor::Red)
        .collect();
    let state = LotteryState::new(reds, LotteryConfig::default(), 0);
    let snapshot = state.clone();

    let err = engine(1).draw(&state).unwrap_err();
    assert!(matches!(err, DrawError::NoAvailablePrizes { .. }));
    assert_eq!(state, snapshot);
}

#[test]
fn test_completed_cycle_refuses_draw_without_change() {
    let mut state = LotteryState::with_defaults(0);
    state.current_cycle.completed = true;
    let snapshot = state.clone();

    assert_eq!(engine(1).draw(&state).unwrap_err(), DrawError::CycleCompleted);
    assert_eq!(state, snapshot);
}

#[test]
fn test_progress_reaches_zero_after_rollover() {
    let mut engine = engine(12);
    let mut state = LotteryState::with_defaults(0);
    for _ in 0..5 {
        state = engine.draw(&state).unwrap().state;
    }
    assert_eq!(cycle_progress(&state.current_cycle, &state.config).percentage, 83);

    state = engine.draw(&state).unwrap().state;
    let progress = cycle_progress(&state.current_cycle, &state.config);
    assert_eq!(progress.completed_draws, 0);
    assert_eq!(progress.percentage, 0);
}
