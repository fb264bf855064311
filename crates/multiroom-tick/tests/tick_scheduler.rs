//! Integration tests for the drain tick scheduler.
//!
//! Uses paused Tokio time so `sleep_until` resolves as soon as the
//! runtime has nothing else to do.

use std::time::Duration;

use multiroom_tick::{TickConfig, TickScheduler};

// =========================================================================
// Helpers
// =========================================================================

/// 20 Hz (50 ms period) with no first-tick jitter.
fn config_20hz() -> TickConfig {
    TickConfig {
        initial_jitter_us: 0,
        ..TickConfig::with_rate(20)
    }
}

// =========================================================================
// TickConfig
// =========================================================================

#[test]
fn test_default_config_is_event_driven() {
    let cfg = TickConfig::default();
    assert_eq!(cfg.rate_hz, 0);
    assert_eq!(cfg.period(), None);
}

#[test]
fn test_with_rate_sets_period() {
    assert_eq!(TickConfig::with_rate(20).period(), Some(Duration::from_millis(50)));
}

#[test]
fn test_validated_clamps_rate() {
    let cfg = TickConfig::with_rate(10_000).validated();
    assert_eq!(cfg.rate_hz, TickConfig::MAX_RATE_HZ);
}

// =========================================================================
// Scheduler accessors
// =========================================================================

#[test]
fn test_scheduler_initial_state() {
    let s = TickScheduler::new(config_20hz());
    assert_eq!(s.rate_hz(), 20);
    assert!(!s.is_event_driven());
}

#[test]
fn test_rate_zero_is_event_driven() {
    let s = TickScheduler::new(TickConfig::with_rate(0));
    assert!(s.is_event_driven());
}

// =========================================================================
// Tick firing
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_wait_for_tick_fires_and_increments() {
    let mut s = TickScheduler::new(config_20hz());

    let info = s.wait_for_tick().await;

    assert_eq!(info.tick, 1);
    assert!(!info.late);
    assert_eq!(info.ticks_skipped, 0);
}

#[tokio::test(start_paused = true)]
async fn test_ticks_are_monotonic() {
    let mut s = TickScheduler::new(config_20hz());
    for expected in 1..=4 {
        assert_eq!(s.wait_for_tick().await.tick, expected);
        assert!(s.record_tick_end().is_some());
    }
}

#[tokio::test(start_paused = true)]
async fn test_event_driven_never_fires() {
    let mut s = TickScheduler::new(TickConfig::with_rate(0));
    let result = tokio::time::timeout(Duration::from_secs(5), s.wait_for_tick()).await;
    assert!(result.is_err(), "event-driven scheduler should pend forever");
}

#[tokio::test(start_paused = true)]
async fn test_late_wakeup_skips_missed_ticks() {
    let mut s = TickScheduler::new(config_20hz());
    s.wait_for_tick().await;

    // Oversleep the next tick by two and a half periods.
    tokio::time::sleep(Duration::from_millis(175)).await;
    let info = s.wait_for_tick().await;
    assert!(info.late);
    assert_eq!(info.ticks_skipped, 2);

    // The next tick is a full period after the late one, not a burst.
    let before = tokio::time::Instant::now();
    let info = s.wait_for_tick().await;
    assert!(!info.late);
    assert_eq!(before.elapsed(), Duration::from_millis(50));
}

// =========================================================================
// Drain budget
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_record_tick_end_without_tick_is_noop() {
    let mut s = TickScheduler::new(config_20hz());
    assert_eq!(s.record_tick_end(), None);
}

#[tokio::test(start_paused = true)]
async fn test_record_tick_end_reports_drain_time() {
    let mut s = TickScheduler::new(config_20hz());
    s.wait_for_tick().await;
    // The drain timer is wall-clock, so burn a little real time.
    std::thread::sleep(Duration::from_micros(50));

    let elapsed = s.record_tick_end().expect("a tick was started");
    assert!(elapsed >= Duration::from_micros(50));
    assert_eq!(s.record_tick_end(), None, "only the first call counts");
}

// =========================================================================
// select! loop, as the coordinator uses it
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_select_loop_drains_until_stopped() {
    let mut s = TickScheduler::new(config_20hz());
    let (tx, mut rx) = tokio::sync::mpsc::channel::<&str>(4);

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(160)).await;
        tx.send("shutdown").await.ok();
    });

    let mut drains = 0u64;
    loop {
        tokio::select! {
            Some(cmd) = rx.recv() => {
                assert_eq!(cmd, "shutdown");
                break;
            }
            info = s.wait_for_tick() => {
                drains += 1;
                s.record_tick_end();
                assert_eq!(info.tick, drains);
            }
        }
    }

    assert!(drains >= 3, "expected at least 3 drains, got {drains}");
}
