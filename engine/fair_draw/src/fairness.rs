//! Fairness checks and cross-cycle statistics.
//!
//! A completed cycle is fair when every color was drawn exactly
//! `draws_per_color` times. Results whose prize is missing from the catalog
//! count toward no color, so catalog/state drift shows up as unfairness.

use serde::Serialize;

use crate::catalog::ColorLookup;
use crate::types::{ColorTally, LotteryCycle, Prize};

/// Detailed outcome of [`audit_cycle`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum FairnessVerdict {
    Fair,
    /// The cycle has not finished yet.
    Incomplete,
    /// Results reference prizes the catalog does not know.
    UnknownPrizes { prize_ids: Vec<String> },
    /// Every prize resolved but the per-color counts are off.
    Imbalanced { tally: ColorTally },
}

/// Aggregate over many cycles. Only completed cycles are counted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawStats {
    pub total_cycles: u32,
    pub total_draws: u32,
    pub fairness_passed: u32,
    pub color_distribution: ColorTally,
}

/// Per-color counts of a cycle's results, plus the ids that did not resolve.
pub fn tally_cycle(cycle: &LotteryCycle, lookup: &ColorLookup<'_>) -> (ColorTally, Vec<String>) {
    let mut tally = ColorTally::default();
    let mut unknown = Vec::new();
    for result in &cycle.results {
        match lookup.color_of(&result.prize_id) {
            Some(color) => *tally.get_mut(color) += 1,
            None => unknown.push(result.prize_id.clone()),
        }
    }
    (tally, unknown)
}

pub fn audit_cycle(cycle: &LotteryCycle, catalog: &[Prize], draws_per_color: u32) -> FairnessVerdict {
    if !cycle.completed {
        return FairnessVerdict::Incomplete;
    }

    let lookup = ColorLookup::new(catalog);
    let (tally, unknown) = tally_cycle(cycle, &lookup);

    if !unknown.is_empty() {
        return FairnessVerdict::UnknownPrizes { prize_ids: unknown };
    }
    if tally.iter().all(|(_, n)| n == draws_per_color) {
        FairnessVerdict::Fair
    } else {
        FairnessVerdict::Imbalanced { tally }
    }
}

/// `true` iff the cycle is completed and hit every color quota exactly.
pub fn validate_cycle_fairness(cycle: &LotteryCycle, catalog: &[Prize], draws_per_color: u32) -> bool {
    audit_cycle(cycle, catalog, draws_per_color) == FairnessVerdict::Fair
}

pub fn generate_stats<I>(cycles: I, catalog: &[Prize], draws_per_color: u32) -> DrawStats
where
    I: IntoIterator,
    I::Item: AsRef<LotteryCycle>,
{
    let lookup = ColorLookup::new(catalog);
    let mut stats = DrawStats::default();

    for cycle in cycles {
        let cycle = cycle.as_ref();
        if !cycle.completed {
            continue;
        }
        stats.total_cycles += 1;
        stats.total_draws += cycle.completed_draws();
        if validate_cycle_fairness(cycle, catalog, draws_per_color) {
            stats.fairness_passed += 1;
        }
        let (tally, _) = tally_cycle(cycle, &lookup);
        stats.color_distribution.merge(&tally);
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::default_catalog;
    use crate::types::{DrawResult, LotteryConfig, PrizeColor};

    fn cycle_of(ids: &[&str], completed: bool) -> LotteryCycle {
        let mut cycle = LotteryCycle::fresh(&LotteryConfig::default(), 0);
        cycle.results = ids
            .iter()
            .enumerate()
            .map(|(i, id)| DrawResult {
                prize_id: id.to_string(),
                timestamp: 0,
                cycle_id: cycle.id.clone(),
                draw_number: i as u32 + 1,
            })
            .collect();
        cycle.completed = completed;
        if completed {
            cycle.remaining = ColorTally::default();
            cycle.end_time = Some(1);
        }
        cycle
    }

    const BALANCED: [&str; 6] = [
        "prize_red_1",
        "prize_yellow_2",
        "prize_green_1",
        "prize_red_2",
        "prize_green_1",
        "prize_yellow_1",
    ];

    #[test]
    fn balanced_cycle_is_fair() {
        let catalog = default_catalog();
        let cycle = cycle_of(&BALANCED, true);
        assert!(validate_cycle_fairness(&cycle, &catalog, 2));
    }

    #[test]
    fn incomplete_cycle_is_not_fair() {
        let catalog = default_catalog();
        let cycle = cycle_of(&BALANCED, false);
        assert_eq!(audit_cycle(&cycle, &catalog, 2), FairnessVerdict::Incomplete);
        assert!(!validate_cycle_fairness(&cycle, &catalog, 2));
    }

    #[test]
    fn skewed_cycle_is_imbalanced() {
        let catalog = default_catalog();
        let cycle = cycle_of(
            &[
                "prize_red_1",
                "prize_red_2",
                "prize_red_1",
                "prize_yellow_1",
                "prize_green_1",
                "prize_green_2",
            ],
            true,
        );
        match audit_cycle(&cycle, &catalog, 2) {
            FairnessVerdict::Imbalanced { tally } => {
                assert_eq!(tally.get(PrizeColor::Red), 3);
                assert_eq!(tally.get(PrizeColor::Yellow), 1);
            }
            other => panic!("expected Imbalanced, got {other:?}"),
        }
    }

    #[test]
    fn unknown_prize_reads_as_unfair() {
        let catalog = default_catalog();
        let mut ids = BALANCED;
        ids[0] = "prize_red_legacy";
        let cycle = cycle_of(&ids, true);

        assert_eq!(
            audit_cycle(&cycle, &catalog, 2),
            FairnessVerdict::UnknownPrizes {
                prize_ids: vec!["prize_red_legacy".to_string()]
            }
        );
        assert!(!validate_cycle_fairness(&cycle, &catalog, 2));
    }

    #[test]
    fn stats_skip_incomplete_cycles() {
        let catalog = default_catalog();
        let skewed = cycle_of(
            &[
                "prize_red_1",
                "prize_red_1",
                "prize_red_1",
                "prize_yellow_1",
                "prize_green_1",
                "prize_green_2",
            ],
            true,
        );
        let cycles = vec![
            cycle_of(&BALANCED, true),
            skewed,
            cycle_of(&BALANCED[..3], false),
        ];

        let stats = generate_stats(&cycles, &catalog, 2);
        assert_eq!(stats.total_cycles, 2);
        assert_eq!(stats.total_draws, 12);
        assert_eq!(stats.fairness_passed, 1);
        assert_eq!(
            stats.color_distribution,
            ColorTally {
                red: 5,
                yellow: 3,
                green: 4
            }
        );
    }

    #[test]
    fn stats_of_nothing_are_zero() {
        let catalog = default_catalog();
        let stats = generate_stats(Vec::<LotteryCycle>::new(), &catalog, 2);
        assert_eq!(stats, DrawStats::default());
    }
}
