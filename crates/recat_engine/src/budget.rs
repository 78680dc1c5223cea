//! Windowed execution under a discovered request-rate budget.

use std::future::Future;
use std::time::Duration;

use futures_util::future::join_all;
use recat_logging::{engine_debug, engine_warn};

use crate::quota::Quota;

/// Fallback pacing used until a live quota is discovered. An explicit
/// value passed at construction, not a module-level default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateBudgetConfig {
    pub concurrency: usize,
    pub interval: Duration,
}

impl Default for RateBudgetConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            interval: Duration::from_millis(200),
        }
    }
}

/// Window width cap regardless of how generous the quota is.
const MAX_CONCURRENCY: usize = 10;

/// Suspension used by [`RateBudget::wait`] when no duration is given.
const DEFAULT_WAIT_MS: u64 = 2_000;

/// Derives a safe window width and inter-window pause from a quota and
/// runs work through consecutive, fully-awaited windows.
#[derive(Debug, Clone)]
pub struct RateBudget {
    concurrency: usize,
    interval: Duration,
    configured: bool,
}

impl RateBudget {
    pub fn new(config: RateBudgetConfig) -> Self {
        Self {
            concurrency: config.concurrency.max(1),
            interval: config.interval,
            configured: false,
        }
    }

    /// Derive width and pause from a live quota. An invalid quota is
    /// logged and leaves the current values untouched.
    pub fn configure(&mut self, quota: &Quota) -> &mut Self {
        if !quota.is_valid() {
            engine_warn!(
                "ignoring invalid quota {:?}; keeping {} wide / {:?} pause",
                quota,
                self.concurrency,
                self.interval
            );
            return self;
        }

        let per_window_second = (quota.allowance / quota.window_seconds) as usize;
        self.concurrency = per_window_second.clamp(1, MAX_CONCURRENCY);
        let interval_ms =
            (u64::from(quota.window_seconds) * 1_000).div_ceil(u64::from(quota.allowance));
        self.interval = Duration::from_millis(interval_ms);
        self.configured = true;
        engine_debug!(
            "rate budget configured: {} wide, {:?} between windows",
            self.concurrency,
            self.interval
        );
        self
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run every item through `task`, `min(desired_width, concurrency)` at
    /// a time once configured (`desired_width` verbatim otherwise). A
    /// window's tasks run concurrently and are awaited together before the
    /// next window starts; the configured interval separates windows.
    ///
    /// Cancellation is not handled here. A caller that wants cooperative
    /// stop checks its own flag inside `task`.
    pub async fn run<T, R, F, Fut>(&self, items: Vec<T>, desired_width: usize, task: F) -> Vec<R>
    where
        F: Fn(T) -> Fut,
        Fut: Future<Output = R>,
    {
        let width = if self.configured {
            desired_width.min(self.concurrency)
        } else {
            desired_width
        }
        .max(1);

        let mut results = Vec::with_capacity(items.len());
        let mut remaining = items.into_iter();
        loop {
            let window: Vec<T> = remaining.by_ref().take(width).collect();
            if window.is_empty() {
                break;
            }
            results.extend(join_all(window.into_iter().map(&task)).await);
            if self.configured && remaining.len() > 0 {
                self.wait_interval().await;
            }
        }
        results
    }

    /// Suspend for `ms` milliseconds, defaulting to 2000 when none is
    /// given. Zero returns immediately without suspending.
    pub async fn wait(&self, ms: Option<u64>) {
        let ms = ms.unwrap_or(DEFAULT_WAIT_MS);
        if ms == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    /// Suspend for the configured inter-window interval.
    pub async fn wait_interval(&self) {
        if self.interval.is_zero() {
            return;
        }
        tokio::time::sleep(self.interval).await;
    }
}

impl Default for RateBudget {
    fn default() -> Self {
        Self::new(RateBudgetConfig::default())
    }
}
