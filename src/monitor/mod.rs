//! Scheduler monitor
//!
//! Once the scheduler reports [`Status::Started`], the monitor runs three
//! tasks side by side:
//! - error reporting: logs everything arriving on the scheduler's error channel
//! - summary recording: logs the scheduler summary whenever it changed
//! - idle checking: counts consecutive idle checks and, once the crawl looks
//!   finished, optionally stops the scheduler
//!
//! The first two end when the idle checker does.

use crate::config::MonitorConfig;
use crate::scheduler::{Scheduler, SchedulerSummary, Status};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const MIN_CHECK_INTERVAL: Duration = Duration::from_millis(100);
const MIN_SUMMARIZE_INTERVAL: Duration = Duration::from_secs(1);
const MIN_IDLE_COUNT: u32 = 10;

/// Poll interval while waiting for the scheduler to start
const START_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Monitor timing and stop policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSettings {
    pub check_interval: Duration,
    pub summarize_interval: Duration,
    pub max_idle_count: u32,
    pub auto_stop: bool,
}

impl MonitorSettings {
    /// Creates settings, raising values below the lower bounds
    ///
    /// # Arguments
    ///
    /// * `check_interval` - Pause between idle checks, at least 100ms
    /// * `summarize_interval` - Pause between summary records, at least 1s
    /// * `max_idle_count` - Consecutive idle checks that end the crawl, at least 10
    /// * `auto_stop` - Whether to stop the scheduler at the end of the crawl
    pub fn new(
        check_interval: Duration,
        summarize_interval: Duration,
        max_idle_count: u32,
        auto_stop: bool,
    ) -> Self {
        Self {
            check_interval: check_interval.max(MIN_CHECK_INTERVAL),
            summarize_interval: summarize_interval.max(MIN_SUMMARIZE_INTERVAL),
            max_idle_count: max_idle_count.max(MIN_IDLE_COUNT),
            auto_stop,
        }
    }

    /// Creates settings exactly as given
    ///
    /// Meant for tests that cannot afford the production lower bounds.
    pub fn unclamped(
        check_interval: Duration,
        summarize_interval: Duration,
        max_idle_count: u32,
        auto_stop: bool,
    ) -> Self {
        Self {
            check_interval,
            summarize_interval,
            max_idle_count: max_idle_count.max(1),
            auto_stop,
        }
    }
}

impl From<&MonitorConfig> for MonitorSettings {
    fn from(config: &MonitorConfig) -> Self {
        Self::new(
            Duration::from_millis(config.check_interval_ms),
            Duration::from_millis(config.summarize_interval_ms),
            config.max_idle_count,
            config.auto_stop,
        )
    }
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self::from(&MonitorConfig::default())
    }
}

/// Starts monitoring `scheduler` on the current runtime
///
/// The returned handle resolves to the number of idle checks performed once
/// the crawl is considered finished.
pub fn spawn_monitor(scheduler: Arc<Scheduler>, settings: MonitorSettings) -> JoinHandle<u64> {
    info!(
        "Monitor parameters: check interval: {:?}, summarize interval: {:?}, max idle count: {}, auto stop: {}",
        settings.check_interval,
        settings.summarize_interval,
        settings.max_idle_count,
        settings.auto_stop
    );
    let done = CancellationToken::new();
    tokio::spawn(report_errors(Arc::clone(&scheduler), done.clone()));
    tokio::spawn(record_summary(
        Arc::clone(&scheduler),
        settings.summarize_interval,
        done.clone(),
    ));
    tokio::spawn(async move {
        let check_count = check_status(&scheduler, &settings).await;
        done.cancel();
        check_count
    })
}

async fn wait_for_start(scheduler: &Scheduler) {
    while scheduler.status() != Status::Started {
        tokio::time::sleep(START_POLL_INTERVAL).await;
    }
}

async fn check_status(scheduler: &Scheduler, settings: &MonitorSettings) -> u64 {
    wait_for_start(scheduler).await;
    let mut check_count = 0u64;
    let mut idle_count = 0u32;
    let mut first_idle = Instant::now();
    loop {
        if scheduler.idle() {
            idle_count += 1;
            if idle_count == 1 {
                first_idle = Instant::now();
            }
            if idle_count >= settings.max_idle_count {
                info!(
                    "The scheduler has been idle for a period of time (about {:?}). Consider to stop it now.",
                    first_idle.elapsed()
                );
                // Work may have arrived since the last check
                if scheduler.idle() {
                    if settings.auto_stop {
                        match scheduler.stop() {
                            Ok(()) => info!("Stop scheduler...success."),
                            Err(e) => warn!("Stop scheduler...failing({}).", e),
                        }
                    }
                    break;
                }
                idle_count = 0;
            }
        } else {
            idle_count = 0;
        }
        check_count += 1;
        tokio::time::sleep(settings.check_interval).await;
    }
    check_count
}

async fn report_errors(scheduler: Arc<Scheduler>, done: CancellationToken) {
    tokio::select! {
        _ = done.cancelled() => return,
        _ = wait_for_start(&scheduler) => {}
    }
    let mut errors = scheduler.error_chan();
    loop {
        tokio::select! {
            biased;
            _ = done.cancelled() => break,
            received = errors.recv() => match received {
                Some(e) => error!("Received an error from error channel: {}", e),
                None => break,
            },
        }
    }
}

async fn record_summary(scheduler: Arc<Scheduler>, interval: Duration, done: CancellationToken) {
    tokio::select! {
        _ = done.cancelled() => return,
        _ = wait_for_start(&scheduler) => {}
    }
    let started = Instant::now();
    let mut previous: Option<SchedulerSummary> = None;
    let mut record_count = 1u64;
    loop {
        let current = scheduler.summary();
        if previous.as_ref() != Some(&current) {
            info!(
                "Monitor summary[{}] at {} (elapsed: {:?}):\n{}",
                record_count,
                chrono::Local::now().to_rfc3339(),
                started.elapsed(),
                current
            );
            previous = Some(current);
            record_count += 1;
        }
        tokio::select! {
            biased;
            _ = done.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_are_clamped() {
        let settings =
            MonitorSettings::new(Duration::from_millis(10), Duration::from_millis(100), 5, true);
        assert_eq!(settings.check_interval, Duration::from_millis(100));
        assert_eq!(settings.summarize_interval, Duration::from_secs(1));
        assert_eq!(settings.max_idle_count, 10);

        let settings =
            MonitorSettings::new(Duration::from_secs(2), Duration::from_secs(3), 20, false);
        assert_eq!(settings.check_interval, Duration::from_secs(2));
        assert_eq!(settings.summarize_interval, Duration::from_secs(3));
        assert_eq!(settings.max_idle_count, 20);
        assert!(!settings.auto_stop);
    }

    #[test]
    fn test_unclamped_settings() {
        let settings =
            MonitorSettings::unclamped(Duration::from_millis(5), Duration::from_millis(5), 0, true);
        assert_eq!(settings.check_interval, Duration::from_millis(5));
        assert_eq!(settings.max_idle_count, 1);
    }

    #[test]
    fn test_settings_from_config() {
        let settings = MonitorSettings::from(&MonitorConfig {
            check_interval_ms: 500,
            summarize_interval_ms: 2000,
            max_idle_count: 12,
            auto_stop: false,
        });
        assert_eq!(settings.check_interval, Duration::from_millis(500));
        assert_eq!(settings.summarize_interval, Duration::from_secs(2));
        assert_eq!(settings.max_idle_count, 12);
        assert_eq!(MonitorSettings::default().max_idle_count, 10);
    }

    #[tokio::test]
    async fn test_monitor_waits_for_start() {
        // Idle, but never started
        let scheduler = Arc::new(Scheduler::new());
        let handle = spawn_monitor(
            Arc::clone(&scheduler),
            MonitorSettings::unclamped(
                Duration::from_millis(1),
                Duration::from_millis(1),
                2,
                true,
            ),
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_finished());
        assert_eq!(scheduler.status(), Status::Uninitialized);
        handle.abort();
    }
}
