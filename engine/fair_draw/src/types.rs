//! # Types
//!
//! Shared data structures used across all modules of the draw engine.
//!
//! ## Design decisions
//!
//! ### Closed color set
//!
//! [`PrizeColor`] is a closed enumeration. Anything keyed by color (remaining
//! quotas, tallies, distributions) is a [`ColorTally`] with one slot per
//! variant, so a lookup can never miss.
//!
//! ### Copy-on-write state
//!
//! Every engine operation borrows a [`LotteryState`] and returns a new one.
//! The prize catalog is an `Arc<[Prize]>` and history entries are
//! `Arc<LotteryCycle>`, so building the next state shares everything that did
//! not change and never writes through a shared reference.
//!
//! ### Cycle lifecycle
//!
//! ```text
//! fresh (full quotas, no results) ──► drawing ──► completed ──► history
//! ```
//!
//! A cycle flips to `completed` exactly once, on the draw that exhausts the
//! last quota, and is moved into history by that same draw.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::default_catalog;
use crate::errors::ConfigError;

/// Prize category. Every cycle hands out the same number of draws per color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrizeColor {
    Red,
    Yellow,
    /// Older snapshots call the third color `blue`.
    #[serde(alias = "blue")]
    Green,
}

impl PrizeColor {
    /// All colors in their canonical order.
    pub const ALL: [PrizeColor; 3] = [PrizeColor::Red, PrizeColor::Yellow, PrizeColor::Green];

    pub const COUNT: u32 = Self::ALL.len() as u32;

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Yellow => "yellow",
            Self::Green => "green",
        }
    }
}

impl fmt::Display for PrizeColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One counter per [`PrizeColor`].
///
/// Used both for a cycle's remaining quota and for color tallies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorTally {
    pub red: u32,
    pub yellow: u32,
    #[serde(alias = "blue")]
    pub green: u32,
}

impl ColorTally {
    /// A tally with every color set to `quota`.
    pub fn full(quota: u32) -> Self {
        Self {
            red: quota,
            yellow: quota,
            green: quota,
        }
    }

    pub fn get(&self, color: PrizeColor) -> u32 {
        match color {
            PrizeColor::Red => self.red,
            PrizeColor::Yellow => self.yellow,
            PrizeColor::Green => self.green,
        }
    }

    pub fn get_mut(&mut self, color: PrizeColor) -> &mut u32 {
        match color {
            PrizeColor::Red => &mut self.red,
            PrizeColor::Yellow => &mut self.yellow,
            PrizeColor::Green => &mut self.green,
        }
    }

    /// Sum over all colors, saturating at `u32::MAX`.
    pub fn total(&self) -> u32 {
        self.checked_total().unwrap_or(u32::MAX)
    }

    /// Sum over all colors, or `None` if it does not fit in a `u32`.
    pub fn checked_total(&self) -> Option<u32> {
        self.red.checked_add(self.yellow)?.checked_add(self.green)
    }

    /// `(color, count)` pairs in canonical color order.
    pub fn iter(&self) -> impl Iterator<Item = (PrizeColor, u32)> + '_ {
        PrizeColor::ALL.into_iter().map(move |c| (c, self.get(c)))
    }

    /// Element-wise sum.
    pub fn merge(&mut self, other: &ColorTally) {
        for color in PrizeColor::ALL {
            let slot = self.get_mut(color);
            *slot = slot.saturating_add(other.get(color));
        }
    }
}

/// Immutable catalog entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prize {
    /// Unique identifier within the catalog.
    pub id: String,
    pub color: PrizeColor,
    /// Display name.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// Record of one completed draw. Append-only member of a cycle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawResult {
    pub prize_id: String,
    /// Unix epoch milliseconds.
    pub timestamp: i64,
    pub cycle_id: String,
    /// 1-based position within the owning cycle.
    pub draw_number: u32,
}

/// The fairness unit: a fixed number of draws with equal per-color quotas.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LotteryCycle {
    pub id: String,
    /// Unix epoch milliseconds.
    pub start_time: i64,
    /// Set exactly when the cycle completes.
    pub end_time: Option<i64>,
    /// Chronological; `results[i].draw_number == i + 1`.
    pub results: Vec<DrawResult>,
    pub completed: bool,
    #[serde(rename = "remainingDraws")]
    pub remaining: ColorTally,
}

impl LotteryCycle {
    /// A new cycle with full quotas and no results.
    pub fn fresh(config: &LotteryConfig, now: i64) -> Self {
        Self {
            id: format!("cycle_{now}_{}", Uuid::new_v4().simple()),
            start_time: now,
            end_time: None,
            results: Vec::new(),
            completed: false,
            remaining: ColorTally::full(config.draws_per_color),
        }
    }

    pub fn completed_draws(&self) -> u32 {
        self.results.len() as u32
    }
}

impl AsRef<LotteryCycle> for LotteryCycle {
    fn as_ref(&self) -> &LotteryCycle {
        self
    }
}

/// Draw accounting knobs plus the reveal preferences carried with the state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LotteryConfig {
    pub draws_per_cycle: u32,
    pub draws_per_color: u32,
    pub enable_animations: bool,
    /// Nominal spin length in milliseconds.
    pub animation_duration: u32,
}

impl LotteryConfig {
    /// Config with `draws_per_cycle` derived from the per-color quota.
    pub fn with_quota(draws_per_color: u32) -> Self {
        Self {
            draws_per_cycle: draws_per_color.saturating_mul(PrizeColor::COUNT),
            draws_per_color,
            ..Self::default()
        }
    }

    /// `draws_per_cycle` must equal `draws_per_color × colors`, both non-zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.draws_per_color == 0 || self.draws_per_cycle == 0 {
            return Err(ConfigError::ZeroQuota);
        }
        if self.draws_per_color.checked_mul(PrizeColor::COUNT) != Some(self.draws_per_cycle) {
            return Err(ConfigError::QuotaMismatch {
                draws_per_cycle: self.draws_per_cycle,
                draws_per_color: self.draws_per_color,
                colors: PrizeColor::COUNT,
            });
        }
        Ok(())
    }
}

impl Default for LotteryConfig {
    fn default() -> Self {
        Self {
            draws_per_cycle: 6,
            draws_per_color: 2,
            enable_animations: true,
            animation_duration: 2000,
        }
    }
}

/// The aggregate owned by a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LotteryState {
    pub current_cycle: LotteryCycle,
    /// Completed cycles, oldest first. Grows only by append.
    pub history: Vec<Arc<LotteryCycle>>,
    #[serde(rename = "availablePrizes")]
    pub catalog: Arc<[Prize]>,
    pub config: LotteryConfig,
}

impl LotteryState {
    pub fn new(catalog: impl Into<Arc<[Prize]>>, config: LotteryConfig, now: i64) -> Self {
        Self {
            current_cycle: LotteryCycle::fresh(&config, now),
            history: Vec::new(),
            catalog: catalog.into(),
            config,
        }
    }

    /// Default config and the built-in six-prize catalog.
    pub fn with_defaults(now: i64) -> Self {
        Self::new(default_catalog(), LotteryConfig::default(), now)
    }

    pub fn prize(&self, id: &str) -> Option<&Prize> {
        self.catalog.iter().find(|p| p.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_requires_quota_per_color() {
        assert!(LotteryConfig::default().validate().is_ok());
        assert!(LotteryConfig::with_quota(4).validate().is_ok());

        let bad = LotteryConfig {
            draws_per_cycle: 7,
            ..LotteryConfig::default()
        };
        assert_eq!(
            bad.validate(),
            Err(ConfigError::QuotaMismatch {
                draws_per_cycle: 7,
                draws_per_color: 2,
                colors: 3
            })
        );

        let zero = LotteryConfig::with_quota(0);
        assert_eq!(zero.validate(), Err(ConfigError::ZeroQuota));
    }

    #[test]
    fn oversized_quota_is_a_mismatch_not_a_panic() {
        let huge = LotteryConfig::with_quota(2_000_000_000);
        assert_eq!(huge.draws_per_cycle, u32::MAX);
        assert!(matches!(
            huge.validate(),
            Err(ConfigError::QuotaMismatch {
                draws_per_color: 2_000_000_000,
                ..
            })
        ));
    }

    #[test]
    fn fresh_cycle_has_full_quotas() {
        let config = LotteryConfig::with_quota(3);
        let cycle = LotteryCycle::fresh(&config, 1_700_000_000_000);
        assert!(cycle.id.starts_with("cycle_1700000000000_"));
        assert_eq!(cycle.remaining, ColorTally::full(3));
        assert_eq!(cycle.remaining.total(), config.draws_per_cycle);
        assert!(cycle.results.is_empty());
        assert!(!cycle.completed);
        assert!(cycle.end_time.is_none());
    }

    #[test]
    fn fresh_cycle_ids_are_unique() {
        let config = LotteryConfig::default();
        let a = LotteryCycle::fresh(&config, 1);
        let b = LotteryCycle::fresh(&config, 1);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn state_uses_camel_case_wire_names() {
        let state = LotteryState::with_defaults(42);
        let json = serde_json::to_value(&state).unwrap();
        assert!(json.get("currentCycle").is_some());
        assert!(json.get("availablePrizes").is_some());
        assert_eq!(json["config"]["drawsPerCycle"], 6);
        assert_eq!(json["currentCycle"]["remainingDraws"]["green"], 2);
        assert_eq!(json["availablePrizes"][0]["color"], "red");

        let back: LotteryState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn blue_reads_as_green() {
        let color: PrizeColor = serde_json::from_str("\"blue\"").unwrap();
        assert_eq!(color, PrizeColor::Green);
        assert_eq!(serde_json::to_string(&color).unwrap(), "\"green\"");

        let tally: ColorTally =
            serde_json::from_str(r#"{"red":0,"yellow":1,"blue":2}"#).unwrap();
        assert_eq!(tally.get(PrizeColor::Green), 2);
    }

    #[test]
    fn tally_merge_and_total() {
        let mut a = ColorTally::full(1);
        let b = ColorTally {
            red: 2,
            yellow: 0,
            green: 5,
        };
        a.merge(&b);
        assert_eq!(a.get(PrizeColor::Red), 3);
        assert_eq!(a.get(PrizeColor::Yellow), 1);
        assert_eq!(a.get(PrizeColor::Green), 6);
        assert_eq!(a.total(), 10);

        let overfull = ColorTally {
            red: u32::MAX,
            yellow: 1,
            green: 0,
        };
        assert_eq!(overfull.checked_total(), None);
        assert_eq!(overfull.total(), u32::MAX);
    }
}
