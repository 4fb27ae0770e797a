//! Outbound-request rate limiting and the shared HTTP fetcher.
//!
//! The external recording database tolerates at most one call per
//! ~1.1 s per client; that limit is a ToS courtesy, not a performance
//! choice, and it is shared across every concurrent caller in the
//! process. [`RateLimiter`] hands out dispatch slots FIFO from a single
//! shared "next permitted dispatch" instant; [`RateLimitedFetcher`]
//! routes all metadata HTTP traffic through one limiter.

use std::io::Read;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use log::debug;
use serde_json::Value;

/// Minimum wall-clock gap between any two outbound dispatches.
pub const MIN_DISPATCH_INTERVAL: Duration = Duration::from_millis(1100);

const HTTP_USER_AGENT: &str = "resona/0.1.0 (music-player; metadata enrichment)";
const MAX_RESPONSE_BYTES: u64 = 10 * 1024 * 1024;

/// Serializes outbound dispatches so no two start closer together than
/// the configured interval, across all callers holding a clone.
pub struct RateLimiter {
    min_interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_interval(MIN_DISPATCH_INTERVAL)
    }

    /// Test seam: same policy, arbitrary interval.
    pub fn with_interval(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_slot: Mutex::new(None),
        }
    }

    /// Blocks until this caller's dispatch slot arrives.
    ///
    /// The slot is reserved under the lock, so waiters are ordered by
    /// arrival and every pair of slots is at least `min_interval` apart
    /// even while many callers sleep concurrently.
    pub fn acquire(&self) {
        let wait = {
            let mut next_slot = self
                .next_slot
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let now = Instant::now();
            let slot = match *next_slot {
                Some(at) if at > now => at,
                _ => now,
            };
            *next_slot = Some(slot + self.min_interval);
            slot.saturating_duration_since(now)
        };

        if !wait.is_zero() {
            std::thread::sleep(wait);
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

/// HTTP fetcher whose every call first takes a limiter slot.
///
/// Failures (network errors, non-2xx, malformed bodies) come back as
/// `None`; this layer never retries — retry is the caller's decision.
#[derive(Clone)]
pub struct RateLimitedFetcher {
    http_client: ureq::Agent,
    limiter: Arc<RateLimiter>,
}

impl RateLimitedFetcher {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        let http_client = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(5))
            .timeout_read(Duration::from_secs(10))
            .timeout_write(Duration::from_secs(10))
            .build();
        Self {
            http_client,
            limiter,
        }
    }

    /// Rate-limited GET returning the parsed JSON body.
    pub fn get_json(&self, url: &str) -> Option<Value> {
        self.limiter.acquire();
        let response = match self
            .http_client
            .get(url)
            .set("User-Agent", HTTP_USER_AGENT)
            .set("Accept", "application/json")
            .call()
        {
            Ok(response) => response,
            Err(err) => {
                debug!("Fetch failed for {url}: {err}");
                return None;
            }
        };

        let mut body = String::new();
        if let Err(err) = response
            .into_reader()
            .take(MAX_RESPONSE_BYTES)
            .read_to_string(&mut body)
        {
            debug!("Failed to read response body from {url}: {err}");
            return None;
        }
        match serde_json::from_str(&body) {
            Ok(value) => Some(value),
            Err(err) => {
                debug!("Invalid JSON response from {url}: {err}");
                None
            }
        }
    }

    /// Rate-limited GET returning the raw body, for image downloads.
    pub fn get_bytes(&self, url: &str) -> Option<Vec<u8>> {
        self.limiter.acquire();
        let response = match self
            .http_client
            .get(url)
            .set("User-Agent", HTTP_USER_AGENT)
            .call()
        {
            Ok(response) => response,
            Err(err) => {
                debug!("Fetch failed for {url}: {err}");
                return None;
            }
        };

        let mut bytes = Vec::new();
        if let Err(err) = response
            .into_reader()
            .take(MAX_RESPONSE_BYTES)
            .read_to_end(&mut bytes)
        {
            debug!("Failed to read response body from {url}: {err}");
            return None;
        }
        Some(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::RateLimiter;
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    #[test]
    fn test_concurrent_acquires_keep_minimum_gap() {
        let interval = Duration::from_millis(40);
        let limiter = Arc::new(RateLimiter::with_interval(interval));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let limiter = Arc::clone(&limiter);
            handles.push(thread::spawn(move || {
                limiter.acquire();
                Instant::now()
            }));
        }

        let mut dispatch_times: Vec<Instant> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();
        dispatch_times.sort();

        // Allow a little scheduling jitter on loaded CI machines.
        let tolerance = Duration::from_millis(15);
        for pair in dispatch_times.windows(2) {
            let gap = pair[1].duration_since(pair[0]);
            assert!(
                gap + tolerance >= interval,
                "dispatch gap {gap:?} shorter than {interval:?}"
            );
        }
    }

    #[test]
    fn test_first_acquire_is_immediate() {
        let limiter = RateLimiter::with_interval(Duration::from_millis(500));
        let started = Instant::now();
        limiter.acquire();
        assert!(started.elapsed() < Duration::from_millis(100));
    }
}
