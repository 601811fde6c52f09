//! Async driver for [`AnimationController`].
//!
//! A tokio interval supplies the frames; a [`CancellationToken`] is the only
//! way to stop early. Once the token fires no further frame is rendered or
//! delivered, and the controller is back in Idle before the driver returns.

use std::time::{Duration, Instant};

use rand::Rng;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, warn};

use crate::animation::{AnimationController, AnimationFrame};
use crate::errors::AnimationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealOutcome {
    /// Result phase elapsed and the controller returned to Idle.
    Completed,
    /// Stopped before the reveal finished.
    Cancelled,
}

/// Maps the tokio clock onto `std::time::Instant`, so a paused test runtime
/// drives the controller too.
struct FrameClock {
    std_origin: Instant,
    tokio_origin: time::Instant,
}

impl FrameClock {
    fn start() -> Self {
        Self {
            std_origin: Instant::now(),
            tokio_origin: time::Instant::now(),
        }
    }

    fn now(&self) -> Instant {
        self.std_origin + self.tokio_origin.elapsed()
    }
}

/// Run one reveal of `target` to completion or cancellation, handing every
/// rendered frame to `on_frame`.
///
/// Any error (bad target, failed frame callback) leaves the controller Idle.
pub async fn run_reveal<R, F>(
    controller: &mut AnimationController<R>,
    target: &str,
    frame_interval: Duration,
    cancel: &CancellationToken,
    mut on_frame: F,
) -> Result<RevealOutcome, AnimationError>
where
    R: Rng,
    F: FnMut(&AnimationFrame) -> Result<(), AnimationError>,
{
    if cancel.is_cancelled() {
        controller.stop();
        return Ok(RevealOutcome::Cancelled);
    }

    let clock = FrameClock::start();
    controller.start(target, clock.now())?;

    let mut ticker = time::interval(frame_interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Reveal of {target} cancelled during {:?}", controller.phase());
                controller.stop();
                return Ok(RevealOutcome::Cancelled);
            }
            _ = ticker.tick() => {}
        }

        controller.tick(clock.now())?;

        if let Err(e) = on_frame(&controller.frame()) {
            warn!("Reveal frame callback failed: {e}");
            controller.stop();
            return Err(e);
        }

        if !controller.is_animating() {
            debug!("Reveal of {target} completed");
            return Ok(RevealOutcome::Completed);
        }
    }
}

/// A reveal running on its own task.
///
/// Dropping the handle cancels the reveal, so teardown paths need no
/// explicit call.
pub struct RevealHandle {
    task: JoinHandle<Result<RevealOutcome, AnimationError>>,
    cancel: CancellationToken,
    _guard: DropGuard,
}

impl RevealHandle {
    pub fn spawn<R, F>(
        mut controller: AnimationController<R>,
        target: String,
        frame_interval: Duration,
        on_frame: F,
    ) -> Self
    where
        R: Rng + Send + 'static,
        F: FnMut(&AnimationFrame) -> Result<(), AnimationError> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            run_reveal(&mut controller, &target, frame_interval, &token, on_frame).await
        });
        Self {
            task,
            _guard: cancel.clone().drop_guard(),
            cancel,
        }
    }

    /// Idempotent.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the reveal task to end.
    pub async fn finished(self) -> Result<RevealOutcome, AnimationError> {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => Err(AnimationError::Aborted(e.to_string())),
        }
    }
}
