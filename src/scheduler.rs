//! Frame pacing: when the next sampling cycle starts.
//!
//! Two modes. Phase-locked follows an external refresh reference and waits a
//! fixed fraction of its period after each boundary. Fixed-rate keeps an
//! absolute deadline that advances by one frame period per cycle, so a late
//! cycle is absorbed without shifting the long-run rate.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

pub const MIN_FRAMERATE: u16 = 10;
pub const MAX_FRAMERATE: u16 = 240;

/// Cycles per average-rate measurement.
pub const FRAMERATE_AVERAGE_WINDOW: u32 = 120;

/// Longest single wait the scheduler will arm.
const MAX_WAIT: Duration = Duration::from_secs(1);

/// Deadline lag beyond which fixed-rate mode resynchronises to now.
const MAX_LAG: Duration = Duration::from_millis(250);

/// Granularity at which a wait notices a shutdown request.
const WAIT_SLICE: Duration = Duration::from_millis(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    Elapsed,
    Interrupted,
}

/// Clock and blocking wait used by the scheduler.
pub trait Pacer {
    fn now(&self) -> Instant;
    fn sleep_until(&mut self, deadline: Instant) -> Wait;
}

/// Sub-millisecond sleeper that wakes early on shutdown.
pub struct SpinPacer {
    quit: &'static AtomicBool,
}

impl SpinPacer {
    pub fn new(quit: &'static AtomicBool) -> Self {
        Self { quit }
    }
}

impl Pacer for SpinPacer {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep_until(&mut self, deadline: Instant) -> Wait {
        loop {
            if self.quit.load(Ordering::Relaxed) {
                return Wait::Interrupted;
            }
            let now = Instant::now();
            if now >= deadline {
                return Wait::Elapsed;
            }
            spin_sleep::sleep((deadline - now).min(WAIT_SLICE));
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncSettings {
    pub use_vsync: bool,
    pub offset_fraction: f32,
    pub target_framerate: u16,
}

#[derive(Debug)]
pub struct FrameScheduler {
    settings: SyncSettings,
    next_deadline: Instant,
}

impl FrameScheduler {
    pub fn new(settings: SyncSettings, now: Instant) -> Self {
        let mut scheduler = Self {
            settings,
            next_deadline: now,
        };
        scheduler.settings.target_framerate = clamp_framerate(settings.target_framerate);
        scheduler
    }

    pub fn settings(&self) -> SyncSettings {
        self.settings
    }

    /// Adopt new settings wholesale, e.g. after a profile swap.
    pub fn reconfigure(&mut self, settings: SyncSettings, now: Instant) {
        *self = Self::new(settings, now);
    }

    pub fn set_use_vsync(&mut self, use_vsync: bool, now: Instant) {
        self.settings.use_vsync = use_vsync;
        self.reset(now);
    }

    /// Returns the rate actually applied.
    pub fn set_target_framerate(&mut self, hz: u16, now: Instant) -> u16 {
        self.settings.target_framerate = clamp_framerate(hz);
        self.reset(now);
        self.settings.target_framerate
    }

    pub fn reset(&mut self, now: Instant) {
        self.next_deadline = now;
    }

    pub fn frame_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.settings.target_framerate))
    }

    /// Decide when the next cycle may start. `None` means immediately.
    pub fn plan_wake(&mut self, now: Instant, reference_period: Option<Duration>) -> Option<Instant> {
        let wake = if self.settings.use_vsync {
            match reference_period {
                Some(period) if self.settings.offset_fraction > 0.0 && !period.is_zero() => {
                    Some(now + period.mul_f64(f64::from(self.settings.offset_fraction)))
                }
                _ => None,
            }
        } else {
            if now.saturating_duration_since(self.next_deadline) > MAX_LAG {
                log::debug!(
                    "Frame deadline lagged by {:?}, resynchronising",
                    now - self.next_deadline
                );
                self.next_deadline = now;
            }
            let deadline = self.next_deadline;
            self.next_deadline += self.frame_period();
            (now < deadline).then_some(deadline)
        };

        wake.map(|at| {
            if at - now > MAX_WAIT {
                log::warn!("Refusing {:?} wait, capping at {:?}", at - now, MAX_WAIT);
                now + MAX_WAIT
            } else {
                at
            }
        })
    }

    /// Block until the next cycle should start.
    pub fn pace(&mut self, pacer: &mut dyn Pacer, reference_period: Option<Duration>) -> Wait {
        match self.plan_wake(pacer.now(), reference_period) {
            Some(at) => pacer.sleep_until(at),
            None => Wait::Elapsed,
        }
    }
}

fn clamp_framerate(hz: u16) -> u16 {
    hz.clamp(MIN_FRAMERATE, MAX_FRAMERATE)
}

/// Average cycle rate over fixed windows of cycles.
#[derive(Debug)]
pub struct RateMeter {
    remaining: u32,
    window_start: Instant,
}

impl RateMeter {
    pub fn new(now: Instant) -> Self {
        Self {
            remaining: FRAMERATE_AVERAGE_WINDOW,
            window_start: now,
        }
    }

    /// Count one cycle; yields the average rate when a window closes.
    pub fn tick(&mut self, now: Instant) -> Option<f32> {
        self.remaining -= 1;
        if self.remaining > 0 {
            return None;
        }
        let elapsed = now.duration_since(self.window_start).as_secs_f32();
        self.remaining = FRAMERATE_AVERAGE_WINDOW;
        self.window_start = now;
        (elapsed > 0.0).then(|| FRAMERATE_AVERAGE_WINDOW as f32 / elapsed)
    }
}
