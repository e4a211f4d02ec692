// =============================================================================
// Provider Throttle — serialises upstream calls against a call budget
// =============================================================================
//
// Free-tier market data APIs cap callers at a handful of requests per minute
// and answer anything above that with an error payload instead of data.  The
// throttle keeps a sliding window of call start times and holds its lock for
// the full duration of each call, so:
//
//   - at most `max_calls` calls start within any `per` window, and
//   - exactly one call is in flight at a time, process-wide.
//
// All timing goes through `tokio::time`, which lets tests run against a paused
// virtual clock instead of real delays.
// =============================================================================

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

/// How many calls may start within one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallBudget {
    pub max_calls: u32,
    pub per: Duration,
}

impl CallBudget {
    pub fn new(max_calls: u32, per: Duration) -> Self {
        Self { max_calls, per }
    }

    /// One call per `delay`: the classic "sleep between requests" pacing.
    #[cfg(test)]
    pub fn fixed_delay(delay: Duration) -> Self {
        Self::new(1, delay)
    }
}

/// Serialisable view of the throttle counters for the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ThrottleSnapshot {
    pub max_calls: u32,
    pub window_ms: u64,
    pub total_calls: u64,
    pub throttled_waits: u64,
}

/// Shared gate in front of every provider call.
pub struct Throttle {
    budget: CallBudget,
    window: Mutex<VecDeque<Instant>>,
    total_calls: AtomicU64,
    throttled_waits: AtomicU64,
}

impl Throttle {
    /// Create a throttle.  A zero `max_calls` is treated as 1.
    pub fn new(budget: CallBudget) -> Self {
        let budget = CallBudget {
            max_calls: budget.max_calls.max(1),
            per: budget.per,
        };
        Self {
            window: Mutex::new(VecDeque::with_capacity(budget.max_calls as usize)),
            budget,
            total_calls: AtomicU64::new(0),
            throttled_waits: AtomicU64::new(0),
        }
    }

    pub fn budget(&self) -> CallBudget {
        self.budget
    }

    /// Wait for a free slot, then run `call` while holding the gate.
    pub async fn run<F, Fut, T>(&self, call: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let mut window = self.window.lock().await;
        self.wait_for_slot(&mut window).await;

        window.push_back(Instant::now());
        self.total_calls.fetch_add(1, Ordering::Relaxed);

        call().await
    }

    async fn wait_for_slot(&self, window: &mut VecDeque<Instant>) {
        loop {
            let now = Instant::now();
            while let Some(&oldest) = window.front() {
                if now.duration_since(oldest) >= self.budget.per {
                    window.pop_front();
                } else {
                    break;
                }
            }

            if window.len() < self.budget.max_calls as usize {
                return;
            }

            let Some(&oldest) = window.front() else {
                return;
            };
            let ready_at = oldest + self.budget.per;

            self.throttled_waits.fetch_add(1, Ordering::Relaxed);
            debug!(
                wait_ms = ready_at.saturating_duration_since(now).as_millis() as u64,
                max_calls = self.budget.max_calls,
                "call budget exhausted, waiting for next slot"
            );
            sleep_until(ready_at).await;
        }
    }

    pub fn snapshot(&self) -> ThrottleSnapshot {
        ThrottleSnapshot {
            max_calls: self.budget.max_calls,
            window_ms: self.budget.per.as_millis() as u64,
            total_calls: self.total_calls.load(Ordering::Relaxed),
            throttled_waits: self.throttled_waits.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for Throttle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Throttle")
            .field("budget", &self.budget)
            .field("total_calls", &self.total_calls.load(Ordering::Relaxed))
            .finish()
    }
}
