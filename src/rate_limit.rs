use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::interval;
use tracing::debug;

use crate::metrics::TRACKED_CLIENTS;

// Rate limit entry - tracks requests per client key in the current window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    pub count: u32,
    pub window_start: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    Rejected,
}

/// Fixed-window request counter keyed by client.
///
/// A client's window opens on its first request and lasts `window`. Requests
/// past `max_requests` inside a window are rejected and still counted, so a
/// burst straddling two windows can get up to twice the limit through.
pub struct RateLimiter {
    entries: DashMap<String, RateLimitEntry>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            max_requests,
            window,
        }
    }

    pub fn check_and_record(&self, client_key: &str) -> Admission {
        self.check_and_record_at(client_key, Instant::now())
    }

    pub fn check_and_record_at(&self, client_key: &str, now: Instant) -> Admission {
        // entry() holds the shard lock for the whole read-increment-write
        let mut entry = self
            .entries
            .entry(client_key.to_string())
            .or_insert(RateLimitEntry {
                count: 0,
                window_start: now,
            });

        // first request, or window expired..? start a fresh one
        if entry.count == 0 || now.saturating_duration_since(entry.window_start) > self.window {
            entry.count = 1;
            entry.window_start = now;
            return Admission::Admitted;
        }

        entry.count = entry.count.saturating_add(1);
        if entry.count > self.max_requests {
            Admission::Rejected
        } else {
            Admission::Admitted
        }
    }

    pub fn entry(&self, client_key: &str) -> Option<RateLimitEntry> {
        self.entries.get(client_key).map(|e| *e)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops entries whose window ended more than `idle_grace` ago. Returns how many went.
    pub fn sweep_at(&self, now: Instant, idle_grace: Duration) -> usize {
        let horizon = self.window + idle_grace;
        let before = self.entries.len();
        self.entries
            .retain(|_, e| now.saturating_duration_since(e.window_start) <= horizon);
        before.saturating_sub(self.entries.len())
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

// Sweeper - runs every `every`, keeps the map bounded by recently active clients
pub async fn sweeper(limiter: Arc<RateLimiter>, every: Duration) {
    let mut interval = interval(every);
    let grace = limiter.window();

    debug!(interval = ?every, "rate limit sweeper started");

    loop {
        interval.tick().await;

        let removed = limiter.sweep_at(Instant::now(), grace);
        TRACKED_CLIENTS.set(limiter.len() as f64);

        if removed > 0 {
            debug!(removed, remaining = limiter.len(), "swept expired rate limit entries");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(60_000);

    #[test]
    fn admits_up_to_threshold_then_rejects() {
        let limiter = RateLimiter::new(60, WINDOW);
        let now = Instant::now();

        for i in 0..60 {
            assert_eq!(
                limiter.check_and_record_at("10.0.0.1", now),
                Admission::Admitted,
                "request {} should pass",
                i + 1
            );
        }
        assert_eq!(limiter.check_and_record_at("10.0.0.1", now), Admission::Rejected);
        assert_eq!(limiter.entry("10.0.0.1").unwrap().count, 61);
    }

    #[test]
    fn clients_are_counted_separately() {
        let limiter = RateLimiter::new(1, WINDOW);
        let now = Instant::now();

        assert_eq!(limiter.check_and_record_at("a", now), Admission::Admitted);
        assert_eq!(limiter.check_and_record_at("a", now), Admission::Rejected);
        assert_eq!(limiter.check_and_record_at("b", now), Admission::Admitted);
        assert_eq!(limiter.len(), 2);
    }

    #[test]
    fn expired_window_resets_count() {
        let limiter = RateLimiter::new(2, WINDOW);
        let start = Instant::now();

        for _ in 0..5 {
            limiter.check_and_record_at("c", start);
        }
        assert_eq!(limiter.check_and_record_at("c", start), Admission::Rejected);

        // exactly on the boundary is still the old window
        let edge = start + WINDOW;
        assert_eq!(limiter.check_and_record_at("c", edge), Admission::Rejected);

        let later = start + WINDOW + Duration::from_millis(1);
        assert_eq!(limiter.check_and_record_at("c", later), Admission::Admitted);
        let entry = limiter.entry("c").unwrap();
        assert_eq!(entry.count, 1);
        assert_eq!(entry.window_start, later);
    }

    #[test]
    fn boundary_burst_gets_twice_the_limit() {
        let limiter = RateLimiter::new(3, WINDOW);
        let start = Instant::now();

        limiter.check_and_record_at("d", start);
        let late = start + WINDOW - Duration::from_millis(1);
        let admitted_late = (0..2)
            .filter(|_| limiter.check_and_record_at("d", late) == Admission::Admitted)
            .count();
        let early = start + WINDOW + Duration::from_millis(1);
        let admitted_early = (0..3)
            .filter(|_| limiter.check_and_record_at("d", early) == Admission::Admitted)
            .count();

        assert_eq!(admitted_late + admitted_early, 5);
    }

    #[test]
    fn sweep_drops_only_idle_entries() {
        let limiter = RateLimiter::new(10, WINDOW);
        let start = Instant::now();

        limiter.check_and_record_at("old", start);
        limiter.check_and_record_at("fresh", start + WINDOW * 2);

        let removed = limiter.sweep_at(start + WINDOW * 2 + Duration::from_millis(1), WINDOW);
        assert_eq!(removed, 1);
        assert!(limiter.entry("old").is_none());
        assert!(limiter.entry("fresh").is_some());
    }

    #[test]
    fn parallel_requests_do_not_lose_updates() {
        let limiter = Arc::new(RateLimiter::new(u32::MAX, WINDOW));
        let now = Instant::now();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        limiter.check_and_record_at("shared", now);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(limiter.entry("shared").unwrap().count, 2000);
    }
}
