//! Sliding-window admission control for AI backend calls.
//!
//! Usage is summed over a trailing window (60 seconds by default). A call
//! that would exceed the token or request budget waits cooperatively until
//! enough old usage ages out, re-checking up to a bounded number of attempts
//! before admitting unconditionally.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

use crate::config::RateLimitConfig;
use crate::output::SharedSink;

/// One recorded backend call within the admission window.
#[derive(Debug, Clone)]
pub struct UsageRecord {
    pub tokens: u32,
    pub at: Instant,
    pub request_id: String,
}

/// How a call was admitted through the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Budget had room; no wait.
    Immediate,
    /// Admitted after waiting for old usage to age out.
    AfterWait { attempts: u32 },
    /// Admitted unconditionally after exhausting wait attempts. Liveness over
    /// strictness; the budget may be briefly exceeded.
    Forced { attempts: u32 },
}

impl Admission {
    pub fn was_forced(&self) -> bool {
        matches!(self, Self::Forced { .. })
    }
}

/// Point-in-time usage report. Observability only, never used for control.
#[derive(Debug, Clone, Copy)]
pub struct UsageSnapshot {
    pub tokens_used: u32,
    pub requests_used: u32,
    pub token_budget: u32,
    pub request_budget: u32,
    pub token_percent: u8,
    pub request_percent: u8,
    /// Time until the oldest record falls out of the window.
    pub resets_in: Duration,
}

enum AdmissionState {
    Checking,
    Waiting(Duration),
    Admitted(Admission),
}

pub struct RateLimiter {
    config: RateLimitConfig,
    records: Mutex<Vec<UsageRecord>>,
    sink: Option<SharedSink>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            records: Mutex::new(Vec::new()),
            sink: None,
        }
    }

    /// Mirror wait progress to an audit sink.
    pub fn with_sink(mut self, sink: SharedSink) -> Self {
        self.sink = Some(sink);
        self
    }

    fn window(&self) -> Duration {
        Duration::from_secs(self.config.window_secs)
    }

    /// Admission gate. Resolves once the call may proceed; the return value
    /// reports whether a wait happened or the bounded retries were exhausted.
    pub async fn check_rate_limit(&self, estimated_tokens: u32) -> Admission {
        let floor = Duration::from_millis(self.config.min_wait_floor_ms);
        // Counts completed waits, so `max_wait_attempts` bounds actual waits.
        let mut attempts = 0u32;
        let mut state = AdmissionState::Checking;

        loop {
            match state {
                AdmissionState::Checking => {
                    state = match self.evaluate(estimated_tokens) {
                        None => {
                            let admission = if attempts > 0 {
                                Admission::AfterWait { attempts }
                            } else {
                                Admission::Immediate
                            };
                            AdmissionState::Admitted(admission)
                        }
                        Some(wait) if wait <= floor => {
                            // Boundary condition: the freeing record expires
                            // almost immediately. Admit now to avoid livelock.
                            debug!(wait_ms = wait.as_millis() as u64, "Wait below floor, admitting");
                            AdmissionState::Admitted(if attempts > 0 {
                                Admission::AfterWait { attempts }
                            } else {
                                Admission::Immediate
                            })
                        }
                        Some(wait) if attempts >= self.config.max_wait_attempts => {
                            warn!(
                                attempts,
                                wait_ms = wait.as_millis() as u64,
                                "Rate limit wait attempts exhausted, admitting unconditionally"
                            );
                            self.audit(&format!(
                                "rate-limit: forced admission after {} attempts",
                                attempts
                            ));
                            AdmissionState::Admitted(Admission::Forced { attempts })
                        }
                        Some(wait) => AdmissionState::Waiting(wait),
                    };
                }
                AdmissionState::Waiting(wait) => {
                    debug!(
                        wait_ms = wait.as_millis() as u64,
                        attempt = attempts + 1,
                        "Rate limit reached, waiting for window to free"
                    );
                    self.audit(&format!(
                        "rate-limit: waiting {}ms (attempt {})",
                        wait.as_millis(),
                        attempts + 1
                    ));
                    self.wait_cooperatively(wait).await;
                    attempts += 1;
                    state = AdmissionState::Checking;
                }
                AdmissionState::Admitted(admission) => return admission,
            }
        }
    }

    /// Record actual usage after a successful backend call. Callers should
    /// pass the backend-reported token count, not the pre-call estimate.
    pub fn record_usage(&self, actual_tokens: u32) {
        let record = UsageRecord {
            tokens: actual_tokens,
            at: Instant::now(),
            request_id: uuid::Uuid::new_v4().to_string()[..8].to_string(),
        };
        debug!(tokens = actual_tokens, request_id = %record.request_id, "Recorded usage");
        self.records.lock().push(record);
    }

    pub fn current_usage(&self) -> UsageSnapshot {
        let now = Instant::now();
        let window = self.window();
        let mut records = self.records.lock();
        Self::purge(&mut records, now, window);

        let tokens_used: u32 = records.iter().map(|r| r.tokens).sum();
        let requests_used = records.len() as u32;
        let resets_in = records
            .first()
            .map(|r| window.saturating_sub(now.duration_since(r.at)))
            .unwrap_or(Duration::ZERO);

        UsageSnapshot {
            tokens_used,
            requests_used,
            token_budget: self.config.max_tokens_per_minute,
            request_budget: self.config.max_requests_per_minute,
            token_percent: percent(tokens_used, self.config.max_tokens_per_minute),
            request_percent: percent(requests_used, self.config.max_requests_per_minute),
            resets_in,
        }
    }

    /// Returns `None` when the call fits the budget, otherwise the wait
    /// needed for enough old usage to age out of the window.
    fn evaluate(&self, estimated_tokens: u32) -> Option<Duration> {
        let now = Instant::now();
        let window = self.window();
        let mut records = self.records.lock();
        Self::purge(&mut records, now, window);

        let tokens_used: u32 = records.iter().map(|r| r.tokens).sum();
        let requests_used = records.len() as u32;

        let token_fits = tokens_used + estimated_tokens <= self.config.max_tokens_per_minute;
        let request_fits = requests_used < self.config.max_requests_per_minute;
        if token_fits && request_fits {
            return None;
        }

        // Records are appended in order, so the vec is already chronological.
        let mut wait = Duration::ZERO;

        if !token_fits {
            let excess = tokens_used + estimated_tokens - self.config.max_tokens_per_minute;
            let mut freed = 0u32;
            for record in records.iter() {
                freed += record.tokens;
                if freed >= excess {
                    let age = now.duration_since(record.at);
                    wait = wait.max(window.saturating_sub(age));
                    break;
                }
            }
        }

        if !request_fits {
            // The n-th oldest record must expire before request n+1 fits.
            let expirations_needed = (requests_used + 1 - self.config.max_requests_per_minute) as usize;
            if let Some(record) = records.get(expirations_needed - 1) {
                let age = now.duration_since(record.at);
                wait = wait.max(window.saturating_sub(age));
            }
        }

        Some(wait)
    }

    async fn wait_cooperatively(&self, total: Duration) {
        let poll = Duration::from_millis(self.config.poll_interval_ms.max(1));
        let deadline = Instant::now() + total;
        loop {
            let now = Instant::now();
            if now >= deadline {
                return;
            }
            let remaining = deadline.duration_since(now);
            debug!(remaining_ms = remaining.as_millis() as u64, "Waiting on rate limit");
            sleep(remaining.min(poll)).await;
        }
    }

    fn purge(records: &mut Vec<UsageRecord>, now: Instant, window: Duration) {
        records.retain(|r| now.duration_since(r.at) < window);
    }

    fn audit(&self, line: &str) {
        if let Some(ref sink) = self.sink {
            sink.append(line);
        }
    }
}

fn percent(used: u32, budget: u32) -> u8 {
    if budget == 0 {
        return 100;
    }
    (((used as f64 / budget as f64) * 100.0).round() as u64).min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RateLimitConfig;

    fn limiter(tokens: u32, requests: u32) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            max_tokens_per_minute: tokens,
            max_requests_per_minute: requests,
            ..RateLimitConfig::default()
        })
    }

    #[tokio::test]
    async fn admits_immediately_under_budget() {
        let limiter = limiter(100, 10);
        limiter.record_usage(50);
        assert_eq!(limiter.check_rate_limit(40).await, Admission::Immediate);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_until_oldest_usage_ages_out() {
        let limiter = limiter(100, 10);
        limiter.record_usage(90);

        tokio::time::advance(Duration::from_secs(1)).await;

        // 90 + 20 > 100: the 90-token record must expire first, which takes
        // until 60s after it was written. Paused clock auto-advances sleeps.
        let before = Instant::now();
        let admission = limiter.check_rate_limit(20).await;
        let elapsed = Instant::now().duration_since(before);

        assert_eq!(admission, Admission::AfterWait { attempts: 1 });
        assert!(elapsed >= Duration::from_secs(58), "waited {:?}", elapsed);
        assert!(limiter.current_usage().tokens_used == 0);
    }

    #[tokio::test(start_paused = true)]
    async fn short_wait_admits_immediately() {
        let limiter = limiter(100, 10);
        limiter.record_usage(90);

        // The blocking record is 59.5s old: the remaining wait is under the
        // one-second floor, so the call is admitted without sleeping.
        tokio::time::advance(Duration::from_millis(59_500)).await;
        assert_eq!(limiter.check_rate_limit(20).await, Admission::Immediate);
    }

    #[tokio::test(start_paused = true)]
    async fn request_budget_is_enforced() {
        let limiter = limiter(1_000_000, 2);
        limiter.record_usage(1);
        limiter.record_usage(1);

        let before = Instant::now();
        let admission = limiter.check_rate_limit(1).await;
        let elapsed = Instant::now().duration_since(before);

        assert_eq!(admission, Admission::AfterWait { attempts: 1 });
        assert!(elapsed >= Duration::from_secs(58));
    }

    #[tokio::test(start_paused = true)]
    async fn sustained_pressure_forces_admission_after_bounded_waits() {
        let limiter = std::sync::Arc::new(limiter(100, 10));
        limiter.record_usage(90);

        // Keep the window saturated so every re-check computes another wait.
        let refiller = {
            let limiter = limiter.clone();
            tokio::spawn(async move {
                loop {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    limiter.record_usage(90);
                }
            })
        };

        let admission = limiter.check_rate_limit(20).await;
        refiller.abort();

        // Three full waits against max_wait_attempts = 3, then forced.
        assert_eq!(admission, Admission::Forced { attempts: 3 });
        assert!(admission.was_forced());
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_reports_window_state() {
        let limiter = limiter(200, 10);
        limiter.record_usage(50);

        let usage = limiter.current_usage();
        assert_eq!(usage.tokens_used, 50);
        assert_eq!(usage.requests_used, 1);
        assert_eq!(usage.token_percent, 25);
        assert!(usage.resets_in <= Duration::from_secs(60));

        tokio::time::advance(Duration::from_secs(61)).await;
        let usage = limiter.current_usage();
        assert_eq!(usage.tokens_used, 0);
        assert_eq!(usage.requests_used, 0);
    }

    #[test]
    fn percent_clamps_at_one_hundred() {
        assert_eq!(percent(300, 100), 100);
        assert_eq!(percent(0, 100), 0);
        assert_eq!(percent(25, 100), 25);
    }
}
