//! Sliding-window rate limiter serializing outbound API calls.
//!
//! Grounded on `original_source/src/prism/ratelimiting.py`'s `RateLimiter`:
//! a bounded pool of `limit` slots and a FIFO of the last `limit` request
//! times, pre-seeded `window` in the past so the limiter starts unblocked.
//! `enter()` blocks until a slot is free AND the oldest recorded request has
//! aged out of the window; `exit()` (via the returned guard's `Drop`) records
//! completion and frees the slot for the next waiter.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

struct Inner {
    permits: usize,
    /// FIFO of request start times, oldest first. Always has `limit` entries:
    /// `enter()` pops the front, `exit()` (by way of `RateLimiterGuard::drop`)
    /// pushes a fresh one to the back.
    made_requests: VecDeque<Instant>,
}

pub struct RateLimiter {
    window: Duration,
    inner: Mutex<Inner>,
    slot_freed: Condvar,
}

impl RateLimiter {
    /// `limit` concurrent/recent requests allowed within any `window`-long
    /// sliding interval.
    pub fn new(limit: usize, window: Duration) -> Self {
        assert!(limit > 0, "rate limiter must allow at least one request");
        let now = Instant::now();
        let seed = now.checked_sub(window).unwrap_or(now);
        RateLimiter {
            window,
            inner: Mutex::new(Inner {
                permits: limit,
                made_requests: VecDeque::from(vec![seed; limit]),
            }),
            slot_freed: Condvar::new(),
        }
    }

    /// Block until a request slot is available and the sliding window allows
    /// it, then return a guard that releases the slot (and records the
    /// completion time) when dropped.
    pub fn enter(&self) -> RateLimiterGuard<'_> {
        let mut guard = self.inner.lock().unwrap();
        while guard.permits == 0 {
            guard = self.slot_freed.wait(guard).unwrap();
        }
        guard.permits -= 1;
        let oldest = guard
            .made_requests
            .pop_front()
            .expect("made_requests always holds `limit` entries");
        drop(guard);

        let wait = (oldest + self.window).saturating_duration_since(Instant::now());
        if !wait.is_zero() {
            std::thread::sleep(wait);
        }

        RateLimiterGuard { limiter: self }
    }

    fn exit(&self) {
        let mut guard = self.inner.lock().unwrap();
        guard.made_requests.push_back(Instant::now());
        guard.permits += 1;
        drop(guard);
        self.slot_freed.notify_one();
    }

    /// Would `enter()` block right now?
    pub fn is_blocked(&self) -> bool {
        let guard = self.inner.lock().unwrap();
        if guard.permits == 0 {
            return true;
        }
        match guard.made_requests.front() {
            Some(&oldest) => Instant::now() < oldest + self.window,
            None => false,
        }
    }

    /// How long `enter()` would currently block for, or `Duration::ZERO` if
    /// it wouldn't block at all.
    pub fn block_duration(&self) -> Duration {
        let guard = self.inner.lock().unwrap();
        guard
            .made_requests
            .front()
            .map(|&oldest| (oldest + self.window).saturating_duration_since(Instant::now()))
            .unwrap_or(Duration::ZERO)
    }
}

/// Held while a rate-limited call is in flight; releases the slot on drop.
pub struct RateLimiterGuard<'a> {
    limiter: &'a RateLimiter,
}

impl Drop for RateLimiterGuard<'_> {
    fn drop(&mut self) {
        self.limiter.exit();
    }
}
