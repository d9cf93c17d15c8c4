//! Request-rate gate shared by all country runs.
//!
//! The upstream source enforces a global rate limit, so every physical
//! request must pass through one gate regardless of how countries are
//! scheduled. The gate blocks the calling thread until budget is
//! available; there is no other useful work to interleave during a
//! forced wait.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::{Clock, DefaultClock};
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Blocking rate gate over a sliding quota window.
#[derive(Clone)]
pub struct RequestGate {
    limiter: Arc<DirectRateLimiter>,
    clock: DefaultClock,
}

impl RequestGate {
    /// `quota_limit` requests per `quota_window`, spread evenly.
    pub fn new(quota_window: Duration, quota_limit: u32) -> Self {
        let clock = DefaultClock::default();
        let limiter = RateLimiter::direct_with_clock(
            quota_from_window(quota_window, quota_limit),
            &clock,
        );
        Self {
            limiter: Arc::new(limiter),
            clock,
        }
    }

    /// Default sized for the ENTSO-E public quota (400 requests/minute),
    /// with margin for other consumers of the same key.
    pub fn entsoe_default() -> Self {
        Self::new(Duration::from_secs(60), 200)
    }

    /// Block until a request may be sent.
    pub fn wait(&self) {
        loop {
            match self.limiter.check() {
                Ok(()) => return,
                Err(not_until) => {
                    let delay = not_until.wait_time_from(self.clock.now());
                    std::thread::sleep(delay.max(Duration::from_millis(10)));
                }
            }
        }
    }

    /// Non-blocking probe, used by tests.
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

impl std::fmt::Debug for RequestGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestGate").finish_non_exhaustive()
    }
}

fn quota_from_window(quota_window: Duration, quota_limit: u32) -> Quota {
    let safe_limit = quota_limit.max(1);
    let burst = NonZeroU32::new(safe_limit).expect("safe limit must be non-zero");

    let seconds_per_cell = (quota_window.as_secs_f64() / f64::from(safe_limit)).max(0.001);
    let period = Duration::from_secs_f64(seconds_per_cell);

    Quota::with_period(period)
        .expect("period is always greater than zero")
        .allow_burst(burst)
}
