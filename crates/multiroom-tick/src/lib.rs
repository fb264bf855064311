//! Drain tick scheduler for the Multiroom coordinator.
//!
//! The coordinator drains its creation and teardown queues either after
//! every event (event-driven) or on a fixed cadence. This crate provides
//! the fixed cadence: a [`TickScheduler`] whose [`wait_for_tick`]
//! future resolves once per tick.
//!
//! # Event-driven mode
//!
//! When `rate_hz` is 0, [`TickScheduler::wait_for_tick`] pends forever.
//! The coordinator then drains after each event instead.
//!
//! # Integration
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = commands.recv() => { /* handle, maybe drain */ }
//!         _ = ticks.wait_for_tick() => {
//!             coordinator.drain();
//!             ticks.record_tick_end();
//!         }
//!     }
//! }
//! ```
//!
//! [`wait_for_tick`]: TickScheduler::wait_for_tick

use std::time::{Duration, Instant};

use rand::Rng;
use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// A drain that takes longer than this fraction of the tick period is
/// logged.
const BUDGET_WARN_FRACTION: f64 = 0.8;

/// Configuration for the drain tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickConfig {
    /// Ticks per second. 0 = event-driven (tick never fires).
    pub rate_hz: u32,
    /// Random delay (0–max µs) added to the first tick so that several
    /// coordinators started together do not drain in lockstep.
    pub initial_jitter_us: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            rate_hz: 0,
            initial_jitter_us: 2_000,
        }
    }
}

impl TickConfig {
    /// Maximum supported tick rate.
    pub const MAX_RATE_HZ: u32 = 240;

    /// Config for a specific rate with defaults elsewhere.
    pub fn with_rate(rate_hz: u32) -> Self {
        Self {
            rate_hz,
            ..Default::default()
        }
    }

    /// Clamps out-of-range values. Called by [`TickScheduler::new`].
    pub fn validated(mut self) -> Self {
        if self.rate_hz > Self::MAX_RATE_HZ {
            warn!(
                rate = self.rate_hz,
                max = Self::MAX_RATE_HZ,
                "drain rate exceeds maximum, clamping"
            );
            self.rate_hz = Self::MAX_RATE_HZ;
        }
        self
    }

    /// Tick period, or `None` in event-driven mode.
    pub fn period(&self) -> Option<Duration> {
        if self.rate_hz == 0 {
            None
        } else {
            Some(Duration::from_secs_f64(1.0 / self.rate_hz as f64))
        }
    }
}

/// Returned by [`TickScheduler::wait_for_tick`].
#[derive(Debug, Clone)]
pub struct TickInfo {
    /// Tick number, starting at 1.
    pub tick: u64,
    /// `true` if the scheduler woke up more than 10% of a period late.
    pub late: bool,
    /// Ticks dropped because of the lateness.
    pub ticks_skipped: u64,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Fixed-cadence tick source. One per coordinator.
///
/// A late wakeup forgets the missed ticks and schedules the next one a
/// full period from now, so a slow drain never causes a burst of
/// catch-up drains.
pub struct TickScheduler {
    rate_hz: u32,
    period: Option<Duration>,
    tick_count: u64,
    next_tick: Option<TokioInstant>,
    tick_start: Option<Instant>,
}

impl TickScheduler {
    /// Creates a scheduler. The first tick is delayed by up to
    /// `initial_jitter_us`.
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();
        let period = config.period();

        let next_tick = period.map(|p| {
            let jitter = if config.initial_jitter_us > 0 {
                Duration::from_micros(rand::rng().random_range(0..config.initial_jitter_us))
            } else {
                Duration::ZERO
            };
            TokioInstant::now() + p + jitter
        });

        match period {
            None => debug!("drain tick in event-driven mode"),
            Some(p) => debug!(
                rate_hz = config.rate_hz,
                period_ms = p.as_secs_f64() * 1000.0,
                "drain tick created"
            ),
        }

        Self {
            rate_hz: config.rate_hz,
            period,
            tick_count: 0,
            next_tick,
            tick_start: None,
        }
    }

    /// Waits for the next tick.
    ///
    /// Pends forever in event-driven mode, so it can sit in a
    /// `tokio::select!` next to the command channel unconditionally.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        let (next, period) = match (self.next_tick, self.period) {
            (Some(next), Some(period)) => (next, period),
            _ => std::future::pending().await,
        };

        time::sleep_until(next).await;

        let now = TokioInstant::now();
        self.tick_count += 1;
        self.tick_start = Some(Instant::now());

        let late_by = now.saturating_duration_since(next);
        let late = late_by > period / 10;
        let mut ticks_skipped = 0;
        if late {
            ticks_skipped = (late_by.as_nanos() / period.as_nanos()) as u64;
            if ticks_skipped > 0 {
                warn!(
                    tick = self.tick_count,
                    skipped = ticks_skipped,
                    late_ms = late_by.as_secs_f64() * 1000.0,
                    "drain tick late, skipping ahead"
                );
            }
        }
        self.next_tick = Some(now + period);
        trace!(tick = self.tick_count, late, "drain tick fired");

        TickInfo {
            tick: self.tick_count,
            late,
            ticks_skipped,
        }
    }

    /// Marks the end of the drain started by the last tick and returns
    /// how long it took. Logs a warning if the drain used most of the
    /// tick period.
    pub fn record_tick_end(&mut self) -> Option<Duration> {
        let elapsed = self.tick_start.take()?.elapsed();
        if let Some(period) = self.period {
            if elapsed.as_secs_f64() >= period.as_secs_f64() * BUDGET_WARN_FRACTION {
                warn!(
                    tick = self.tick_count,
                    elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                    period_ms = period.as_secs_f64() * 1000.0,
                    "drain is using most of the tick budget"
                );
            }
        }
        Some(elapsed)
    }

    /// `true` when the rate is 0.
    pub fn is_event_driven(&self) -> bool {
        self.period.is_none()
    }

    pub fn rate_hz(&self) -> u32 {
        self.rate_hz
    }
}
