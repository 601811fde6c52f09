//! # Reveal phase controller
//!
//! A state machine that animates a draw whose outcome is already committed.
//! It never picks the winner; it is handed the winning prize id and only
//! decides how every catalog item looks on each frame.
//!
//! ```text
//! Idle ──start──► Prepare ──► Spinning ──► Slowing ──► Result ──► Idle
//!   ▲                                                      │
//!   └───────────────────────── stop (any phase) ───────────┘
//! ```
//!
//! | Phase    | Window                  | Look                                               |
//! |----------|-------------------------|----------------------------------------------------|
//! | Prepare  | `prepare_duration`      | all items wobble in sync, none highlighted          |
//! | Spinning | random in `spin_duration_range` | one random item lit, switching ever slower  |
//! | Slowing  | `slowing_duration`      | target lit with probability `1 - (1-p)^3`           |
//! | Result   | `result_duration`       | target locked lit with a bounce, the rest dimmed    |
//!
//! Time is wall-clock: each [`AnimationController::tick`] measures the time
//! since the phase began, so the sequence takes the same time on any display.
//! A tick moves the machine forward by at most one phase, so every phase is
//! observed at least once even when frames arrive late.

use std::f64::consts::TAU;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, warn};

use crate::engine::secure_rng;
use crate::errors::{AnimationError, ConfigError};
use crate::types::{LotteryConfig, Prize};

/// Updates per second while throttled.
const THROTTLED_UPDATES_PER_SEC: u32 = 30;

/// Prepare-phase wobble frequency.
const WOBBLE_HZ: f64 = 5.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Prepare,
    Spinning,
    Slowing,
    Result,
}

/// Visual emphasis of one catalog item.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemVisual {
    pub prize_id: String,
    pub is_highlighted: bool,
    pub scale: f64,
    /// Degrees.
    pub rotation: f64,
    pub opacity: f64,
    /// 0.0 ..= 1.0
    pub glow: f64,
}

impl ItemVisual {
    fn resting(prize_id: &str) -> Self {
        Self {
            prize_id: prize_id.to_string(),
            is_highlighted: false,
            scale: 1.0,
            rotation: 0.0,
            opacity: 1.0,
            glow: 0.0,
        }
    }

    fn rest(&mut self) {
        self.is_highlighted = false;
        self.scale = 1.0;
        self.rotation = 0.0;
        self.opacity = 1.0;
        self.glow = 0.0;
    }
}

/// Timing knobs for the reveal.
#[derive(Clone, Debug, PartialEq)]
pub struct AnimationConfig {
    pub prepare_duration: Duration,
    /// Inclusive `(min, max)` for the randomly drawn spin window.
    pub spin_duration_range: (Duration, Duration),
    pub slowing_duration: Duration,
    pub result_duration: Duration,
    /// Highlight switch interval at the start of the spin.
    pub spin_base_interval: Duration,
    pub target_fps: u32,
    /// Below this estimate the spin is throttled.
    pub performance_threshold: u32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            prepare_duration: Duration::from_millis(200),
            spin_duration_range: (Duration::from_millis(2000), Duration::from_millis(3000)),
            slowing_duration: Duration::from_millis(1000),
            result_duration: Duration::from_millis(500),
            spin_base_interval: Duration::from_millis(100),
            target_fps: 60,
            performance_threshold: 30,
        }
    }
}

impl AnimationConfig {
    /// Defaults with the spin window stretched around the configured
    /// `animation_duration`: `[d, 1.5 d]`.
    pub fn for_lottery(config: &LotteryConfig) -> Self {
        let min = Duration::from_millis(u64::from(config.animation_duration));
        Self {
            spin_duration_range: (min, min + min / 2),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let (min, max) = self.spin_duration_range;
        if min > max {
            return Err(ConfigError::InvalidSpinRange {
                min_ms: min.as_millis(),
                max_ms: max.as_millis(),
            });
        }
        if self.target_fps == 0 || self.performance_threshold == 0 {
            return Err(ConfigError::ZeroFrameRate);
        }
        Ok(())
    }

    /// Longest possible reveal, Prepare through Result.
    pub fn max_total(&self) -> Duration {
        self.prepare_duration + self.spin_duration_range.1 + self.slowing_duration + self.result_duration
    }
}

/// Point-in-time copy of the controller's visible state.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationFrame {
    pub phase: Phase,
    pub target: Option<String>,
    pub is_animating: bool,
    pub fps: f64,
    pub items: Vec<ItemVisual>,
}

/// Rolling frames-per-second estimate, refreshed once per second.
#[derive(Debug, Clone)]
struct FpsMeter {
    window_start: Option<Instant>,
    frames: u32,
    estimate: f64,
}

impl FpsMeter {
    fn new(target_fps: u32) -> Self {
        Self {
            window_start: None,
            frames: 0,
            estimate: f64::from(target_fps),
        }
    }

    fn record(&mut self, now: Instant) {
        let Some(start) = self.window_start else {
            self.window_start = Some(now);
            self.frames = 0;
            return;
        };
        self.frames += 1;
        let elapsed = now.saturating_duration_since(start);
        if elapsed >= Duration::from_secs(1) {
            self.estimate = f64::from(self.frames) / elapsed.as_secs_f64();
            self.frames = 0;
            self.window_start = Some(now);
        }
    }

    fn reset(&mut self) {
        self.window_start = None;
        self.frames = 0;
    }
}

pub struct AnimationController<R = StdRng> {
    config: AnimationConfig,
    rng: R,
    items: Vec<ItemVisual>,
    phase: Phase,
    phase_started: Option<Instant>,
    target: Option<usize>,
    spin_window: Duration,
    spin_cursor: Option<usize>,
    last_switch: Option<Instant>,
    last_update: Option<Instant>,
    fps: FpsMeter,
    throttled: bool,
    generation: u64,
}

impl AnimationController<StdRng> {
    pub fn new(catalog: &[Prize], config: AnimationConfig) -> Self {
        Self::with_rng(catalog, config, secure_rng())
    }
}

impl<R: Rng> AnimationController<R> {
    pub fn with_rng(catalog: &[Prize], config: AnimationConfig, rng: R) -> Self {
        let fps = FpsMeter::new(config.target_fps);
        Self {
            items: catalog.iter().map(|p| ItemVisual::resting(&p.id)).collect(),
            spin_window: config.spin_duration_range.0,
            config,
            rng,
            phase: Phase::Idle,
            phase_started: None,
            target: None,
            spin_cursor: None,
            last_switch: None,
            last_update: None,
            fps,
            throttled: false,
            generation: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn items(&self) -> &[ItemVisual] {
        &self.items
    }

    pub fn target(&self) -> Option<&str> {
        self.target.map(|i| self.items[i].prize_id.as_str())
    }

    pub fn is_animating(&self) -> bool {
        self.phase != Phase::Idle
    }

    pub fn fps(&self) -> f64 {
        self.fps.estimate
    }

    /// Whether Spinning updates are currently capped.
    pub fn is_throttled(&self) -> bool {
        self.throttled
    }

    /// Bumped on every start and stop; work scheduled under an older
    /// generation is stale.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The spin window drawn for the current reveal.
    pub fn spin_window(&self) -> Duration {
        self.spin_window
    }

    pub fn config(&self) -> &AnimationConfig {
        &self.config
    }

    pub fn frame(&self) -> AnimationFrame {
        AnimationFrame {
            phase: self.phase,
            target: self.target().map(str::to_string),
            is_animating: self.is_animating(),
            fps: self.fps.estimate,
            items: self.items.clone(),
        }
    }

    /// Begin revealing `target_id`. Restarts from Prepare if a reveal is
    /// already running.
    pub fn start(&mut self, target_id: &str, now: Instant) -> Result<(), AnimationError> {
        self.config.validate()?;
        if self.items.is_empty() {
            return Err(AnimationError::EmptyCatalog);
        }
        let target = self
            .items
            .iter()
            .position(|item| item.prize_id == target_id)
            .ok_or_else(|| AnimationError::UnknownTarget(target_id.to_string()))?;

        self.reset_visuals();
        let (min, max) = self.config.spin_duration_range;
        self.spin_window = if max > min {
            self.rng.gen_range(min..=max)
        } else {
            min
        };
        self.target = Some(target);
        self.generation += 1;
        self.enter(Phase::Prepare, now);
        Ok(())
    }

    /// Reset to Idle and clear all visual state. Safe to call at any time,
    /// any number of times.
    pub fn stop(&mut self) {
        if self.phase != Phase::Idle {
            debug!("Reveal stopped during {:?}", self.phase);
        }
        self.reset_visuals();
        self.phase = Phase::Idle;
        self.phase_started = None;
        self.target = None;
        self.generation += 1;
    }

    /// Advance to `now`. No-op while Idle.
    ///
    /// On error the controller has already been reset to Idle.
    pub fn tick(&mut self, now: Instant) -> Result<(), AnimationError> {
        if self.phase == Phase::Idle {
            return Ok(());
        }
        self.fps.record(now);

        let Some(started) = self.phase_started else {
            self.stop();
            return Err(AnimationError::Aborted("phase clock missing".to_string()));
        };
        let window = self.window(self.phase);
        let elapsed = now.saturating_duration_since(started);
        if elapsed >= window {
            let next = match self.phase {
                Phase::Prepare => Phase::Spinning,
                Phase::Spinning => Phase::Slowing,
                Phase::Slowing => Phase::Result,
                Phase::Result | Phase::Idle => Phase::Idle,
            };
            if next == Phase::Idle {
                debug!("Reveal finished");
                self.stop();
                return Ok(());
            }
            // Keep the schedule anchored to wall-clock even if this tick was late.
            self.enter(next, started + window);
        }

        self.throttled = self.phase == Phase::Spinning
            && self.fps.estimate < f64::from(self.config.performance_threshold);
        if self.throttled {
            let min_gap = Duration::from_secs(1) / THROTTLED_UPDATES_PER_SEC;
            if let Some(last) = self.last_update {
                if now.saturating_duration_since(last) < min_gap {
                    return Ok(());
                }
            }
        }

        if let Err(e) = self.render(now) {
            warn!("Reveal frame failed, resetting to idle: {e}");
            self.stop();
            return Err(e);
        }
        self.last_update = Some(now);
        Ok(())
    }

    /// Probability that item `index` is lit at Slowing progress `progress`.
    ///
    /// The target's probability follows an ease-out curve to 1. Other items
    /// share the remainder, less the further they sit from the target.
    pub fn slowing_highlight_probability(&self, index: usize, progress: f64) -> f64 {
        let Some(target) = self.target else {
            return 0.0;
        };
        let eased = ease_out_cubic(progress);
        if index == target {
            return eased;
        }
        let distance = index.abs_diff(target) as f64;
        (1.0 - eased) / (1.0 + distance)
    }

    fn window(&self, phase: Phase) -> Duration {
        match phase {
            Phase::Idle => Duration::ZERO,
            Phase::Prepare => self.config.prepare_duration,
            Phase::Spinning => self.spin_window,
            Phase::Slowing => self.config.slowing_duration,
            Phase::Result => self.config.result_duration,
        }
    }

    fn enter(&mut self, phase: Phase, at: Instant) {
        debug!("Reveal phase {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
        self.phase_started = Some(at);
        self.spin_cursor = None;
        self.last_switch = None;
        self.last_update = None;
        self.throttled = false;
    }

    fn reset_visuals(&mut self) {
        for item in &mut self.items {
            item.rest();
        }
        self.spin_cursor = None;
        self.last_switch = None;
        self.last_update = None;
        self.throttled = false;
        self.fps.reset();
    }

    fn render(&mut self, now: Instant) -> Result<(), AnimationError> {
        let started = self.phase_started.unwrap_or(now);
        let elapsed = now.saturating_duration_since(started);
        let window = self.window(self.phase);
        let progress = if window.is_zero() {
            1.0
        } else {
            (elapsed.as_secs_f64() / window.as_secs_f64()).min(1.0)
        };

        match self.phase {
            Phase::Idle => Ok(()),
            Phase::Prepare => {
                self.render_prepare(elapsed);
                Ok(())
            }
            Phase::Spinning => {
                self.render_spinning(now, progress);
                Ok(())
            }
            Phase::Slowing => self.render_slowing(progress),
            Phase::Result => self.render_result(progress),
        }
    }

    fn render_prepare(&mut self, elapsed: Duration) {
        let wobble = (elapsed.as_secs_f64() * WOBBLE_HZ * TAU).sin();
        for item in &mut self.items {
            item.is_highlighted = false;
            item.rotation = wobble * 4.0;
            item.scale = 1.0 + 0.05 * wobble.abs();
            item.opacity = 1.0;
            item.glow = 0.0;
        }
    }

    fn render_spinning(&mut self, now: Instant, progress: f64) {
        let interval = self.config.spin_base_interval.mul_f64(1.0 + progress * 2.0);
        let due = match self.last_switch {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= interval,
        };
        if due {
            let n = self.items.len();
            // Uniform over the other items; the target gets no special weight.
            let next = match self.spin_cursor {
                Some(current) if n > 1 => (current + self.rng.gen_range(1..n)) % n,
                _ => self.rng.gen_range(0..n),
            };
            self.spin_cursor = Some(next);
            self.last_switch = Some(now);
        }

        let lit = self.spin_cursor;
        for (i, item) in self.items.iter_mut().enumerate() {
            let on = Some(i) == lit;
            item.is_highlighted = on;
            item.rotation = 0.0;
            item.scale = if on { 1.1 } else { 1.0 };
            item.opacity = if on { 1.0 } else { 0.7 };
            item.glow = if on { 0.8 } else { 0.0 };
        }
    }

    fn render_slowing(&mut self, progress: f64) -> Result<(), AnimationError> {
        self.require_target()?;
        for i in 0..self.items.len() {
            let p = self.slowing_highlight_probability(i, progress);
            let on = self.rng.gen_bool(p.clamp(0.0, 1.0));
            let item = &mut self.items[i];
            item.is_highlighted = on;
            item.rotation = 0.0;
            item.scale = 1.0 + 0.1 * p;
            item.opacity = 0.6 + 0.4 * p;
            item.glow = p;
        }
        Ok(())
    }

    fn render_result(&mut self, progress: f64) -> Result<(), AnimationError> {
        let target = self.require_target()?;
        let bounce = ease_out_back(progress);
        for (i, item) in self.items.iter_mut().enumerate() {
            item.rotation = 0.0;
            if i == target {
                item.is_highlighted = true;
                item.scale = 1.0 + 0.2 * bounce;
                item.opacity = 1.0;
                item.glow = 1.0;
            } else {
                item.is_highlighted = false;
                item.scale = 0.9;
                item.opacity = 0.3;
                item.glow = 0.0;
            }
        }
        Ok(())
    }

    fn require_target(&self) -> Result<usize, AnimationError> {
        match self.target {
            Some(i) if i < self.items.len() => Ok(i),
            _ => Err(AnimationError::Aborted(format!(
                "no reveal target during {:?}",
                self.phase
            ))),
        }
    }
}

fn ease_out_cubic(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

/// Overshoots past 1 before settling on 1.
fn ease_out_back(t: f64) -> f64 {
    const C1: f64 = 1.70158;
    const C3: f64 = C1 + 1.0;
    let t = t.clamp(0.0, 1.0) - 1.0;
    1.0 + C3 * t.powi(3) + C1 * t.powi(2)
}
