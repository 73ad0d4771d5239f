// src/services/rate_limiter.rs
//! Per-caller fixed-window rate limiting.
//!
//! The in-memory limiter is process-local and forgets everything on restart.
//! It is a best-effort brake; the on-chain fee and signature check are the
//! real gate. Endpoints only see the [`RateLimiter`] trait so a shared store
//! can replace it.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// `/auth`: 20 requests per minute per caller.
pub const AUTH_MAX_REQUESTS: u32 = 20;
/// `/sign`: 10 requests per minute per caller.
pub const SIGN_MAX_REQUESTS: u32 = 10;
pub const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

/// Tracked keys before expired windows are swept.
const SWEEP_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Limited { retry_after: Duration },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed)
    }
}

pub trait RateLimiter: Send + Sync {
    /// Counts one request for `key` and says whether it may proceed.
    fn check(&self, key: &str) -> RateDecision;
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    reset_at: Instant,
}

#[derive(Debug)]
pub struct InMemoryRateLimiter {
    max_requests: u32,
    window: Duration,
    windows: Mutex<HashMap<String, Window>>,
}

impl InMemoryRateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn for_auth() -> Self {
        Self::new(AUTH_MAX_REQUESTS, RATE_LIMIT_WINDOW)
    }

    pub fn for_sign() -> Self {
        Self::new(SIGN_MAX_REQUESTS, RATE_LIMIT_WINDOW)
    }

    /// [`RateLimiter::check`] with an explicit clock.
    pub fn check_at(&self, key: &str, now: Instant) -> RateDecision {
        let mut windows = self.windows.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        if windows.len() >= SWEEP_THRESHOLD {
            windows.retain(|_, window| window.reset_at > now);
        }

        match windows.get_mut(key) {
            Some(window) if window.reset_at > now => {
                window.count = window.count.saturating_add(1);
                if window.count > self.max_requests {
                    RateDecision::Limited {
                        retry_after: self.window,
                    }
                } else {
                    RateDecision::Allowed
                }
            }
            _ => {
                windows.insert(
                    key.to_string(),
                    Window {
                        count: 1,
                        reset_at: now + self.window,
                    },
                );
                RateDecision::Allowed
            }
        }
    }

    pub fn tracked_keys(&self) -> usize {
        self.windows.lock().map(|windows| windows.len()).unwrap_or(0)
    }
}

impl RateLimiter for InMemoryRateLimiter {
    fn check(&self, key: &str) -> RateDecision {
        self.check_at(key, Instant::now())
    }
}
