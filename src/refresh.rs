//! Periodic display reference used by phase-locked pacing.

use crate::scheduler::{Pacer, Wait};
use std::time::{Duration, Instant};

pub trait RefreshReference {
    /// Refresh interval, if known.
    fn period(&self) -> Option<Duration>;

    /// Block until the next refresh boundary, as a v-synced present would.
    fn present(&mut self, pacer: &mut dyn Pacer) -> Wait;
}

/// Refresh boundaries on a fixed grid at a configured rate. A rate whose
/// period is zero or not representable (including zero itself) means the
/// period is unknown and `present` returns at once.
#[derive(Debug)]
pub struct SoftwareVblank {
    period: Option<Duration>,
    epoch: Instant,
}

impl SoftwareVblank {
    pub fn new(refresh_hz: f64, epoch: Instant) -> Self {
        let period = (refresh_hz > 0.0)
            .then(|| Duration::try_from_secs_f64(1.0 / refresh_hz).ok())
            .flatten()
            .filter(|p| !p.is_zero());
        if period.is_none() {
            log::debug!("Refresh rate {} Hz has no usable period", refresh_hz);
        }
        Self { period, epoch }
    }

    /// First boundary strictly after `now`.
    pub fn next_boundary(&self, now: Instant) -> Option<Instant> {
        let period = self.period?;
        let since = now.saturating_duration_since(self.epoch).as_nanos();
        let step = period.as_nanos();
        let frames = since / step + 1;
        let offset = u64::try_from(frames * step).ok()?;
        Some(self.epoch + Duration::from_nanos(offset))
    }
}

impl RefreshReference for SoftwareVblank {
    fn period(&self) -> Option<Duration> {
        self.period
    }

    fn present(&mut self, pacer: &mut dyn Pacer) -> Wait {
        match self.next_boundary(pacer.now()) {
            Some(at) => pacer.sleep_until(at),
            None => Wait::Elapsed,
        }
    }
}
