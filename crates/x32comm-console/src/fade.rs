//! Timed fader ramps.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{ConsoleError, FadeError};

/// Discrete fader positions between 0.0 and 1.0 on the console.
pub const RESOLUTION: u32 = 1024;

/// Receives one level per ramp step.
pub trait LevelSink {
    fn send_level(&self, channel: u32, level: f32) -> Result<(), ConsoleError>;
}

/// Shared flag that stops a running fade at the next step.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// How a fade ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeOutcome {
    /// The ramp reached the convergence band around the target.
    Converged { steps: usize },
    /// The cancel token was set before the ramp finished.
    Cancelled { steps: usize },
}

impl FadeOutcome {
    pub fn steps(self) -> usize {
        match self {
            FadeOutcome::Converged { steps } | FadeOutcome::Cancelled { steps } => steps,
        }
    }
}

/// A quantized ramp from one level to another.
///
/// Levels are floored onto [`RESOLUTION`] positions. The ramp moves one
/// position per step and stops once it is within 1% of the distance from
/// the target, so the target position itself is usually not emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FadePlan {
    pub start: i64,
    pub stop: i64,
    /// `+1` when rising (or flat), `-1` when falling.
    pub direction: i64,
    pub step_delay: Duration,
    pub margin: u64,
}

impl FadePlan {
    pub fn new(start: f32, stop: f32, duration: Duration) -> Self {
        let start = quantize(start);
        let stop = quantize(stop);
        let distance = start.abs_diff(stop);
        let direction = if start <= stop { 1 } else { -1 };

        // Flat ramps never divide.
        if distance == 0 {
            return Self {
                start,
                stop,
                direction,
                step_delay: Duration::ZERO,
                margin: 0,
            };
        }

        let steps = u32::try_from(distance).unwrap_or(u32::MAX);
        Self {
            start,
            stop,
            direction,
            step_delay: duration / steps,
            margin: (0.01 * distance as f64).floor() as u64,
        }
    }

    pub fn distance(&self) -> u64 {
        self.start.abs_diff(self.stop)
    }

    /// Quantized positions in emission order.
    pub fn levels(&self) -> impl Iterator<Item = i64> + '_ {
        std::iter::successors(Some(self.start), move |i| i.checked_add(self.direction))
            .take_while(move |&i| self.stop.abs_diff(i) > self.margin)
    }

    pub fn step_count(&self) -> usize {
        self.levels().count()
    }
}

fn quantize(level: f32) -> i64 {
    (f64::from(level) * f64::from(RESOLUTION)).floor() as i64
}

/// Map a quantized position back to a `[0, 1]` level.
pub fn denormalize(position: i64) -> f32 {
    position as f32 / RESOLUTION as f32
}

type Sleeper = Box<dyn Fn(Duration) + Send + Sync>;

/// Runs fade plans against a [`LevelSink`], pacing steps with a sleep.
pub struct FadeScheduler {
    sleep: Sleeper,
}

impl Default for FadeScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl FadeScheduler {
    pub fn new() -> Self {
        Self {
            sleep: Box::new(std::thread::sleep),
        }
    }

    /// Replace the sleep between steps.
    pub fn with_sleeper(sleep: impl Fn(Duration) + Send + Sync + 'static) -> Self {
        Self {
            sleep: Box::new(sleep),
        }
    }

    /// Ramp `channel` from `start` to `stop` over roughly `duration`.
    pub fn make_fade(
        &self,
        sink: &impl LevelSink,
        channel: u32,
        start: f32,
        stop: f32,
        duration: Duration,
        cancel: &CancelToken,
    ) -> Result<FadeOutcome, FadeError> {
        let plan = FadePlan::new(start, stop, duration);
        self.run(sink, channel, &plan, cancel)
    }

    /// Emit every level of `plan`, sleeping `step_delay` after each.
    ///
    /// The cancel token is checked before each step. The first failed send
    /// ends the ramp.
    pub fn run(
        &self,
        sink: &impl LevelSink,
        channel: u32,
        plan: &FadePlan,
        cancel: &CancelToken,
    ) -> Result<FadeOutcome, FadeError> {
        info!(
            channel,
            start = plan.start,
            stop = plan.stop,
            step_delay = ?plan.step_delay,
            margin = plan.margin,
            "fade started"
        );

        let mut steps = 0;
        for position in plan.levels() {
            if cancel.is_cancelled() {
                info!(channel, steps, "fade cancelled");
                return Ok(FadeOutcome::Cancelled { steps });
            }

            let level = denormalize(position);
            sink.send_level(channel, level)
                .map_err(|source| FadeError::Send {
                    step: steps,
                    level,
                    source: Box::new(source),
                })?;
            steps += 1;
            debug!(channel, position, "fade step");
            (self.sleep)(plan.step_delay);
        }

        info!(channel, steps, "fade converged");
        Ok(FadeOutcome::Converged { steps })
    }
}

impl std::fmt::Debug for FadeScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FadeScheduler").finish_non_exhaustive()
    }
}
