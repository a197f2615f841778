//! Sliding-window rate limiting.
//!
//! Every admitted request is recorded as a timestamp under its client key.
//! A request is admitted when fewer than `limit` timestamps of that key lie
//! strictly inside the trailing `window`. Stale timestamps are pruned on each
//! check of the key, including rejected checks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tokio::time;

use crate::config::RateLimitConfig;
use crate::observability::metrics;
use crate::security::client_ip::ClientKey;

/// Immutable limit/window pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub limit: usize,
    pub window: Duration,
}

impl RateLimitPolicy {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self { limit, window }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.limit, config.window())
    }
}

/// Shared per-client timestamp table.
///
/// All reads and writes happen under one lock, so each call is atomic with
/// respect to every other call regardless of key.
#[derive(Debug, Default)]
pub struct SlidingWindowLimiter {
    requests: Mutex<HashMap<ClientKey, Vec<Instant>>>,
}

impl SlidingWindowLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit or reject one request for `key` at the current time.
    pub fn allow(&self, key: &ClientKey, limit: usize, window: Duration) -> bool {
        self.allow_at(key, limit, window, Instant::now())
    }

    /// Admit or reject one request for `key` at `now`.
    pub fn allow_at(&self, key: &ClientKey, limit: usize, window: Duration, now: Instant) -> bool {
        let mut requests = self.lock();

        let mut valid: Vec<Instant> = requests
            .get(key)
            .map(|stamps| {
                stamps
                    .iter()
                    .copied()
                    .filter(|t| is_within(*t, now, window))
                    .collect()
            })
            .unwrap_or_default();

        if valid.len() >= limit {
            requests.insert(key.clone(), valid);
            return false;
        }

        valid.push(now);
        requests.insert(key.clone(), valid);
        true
    }

    /// Drop keys without activity in the trailing `window`.
    ///
    /// A dropped key behaves exactly like a key that was never seen, so this
    /// only bounds memory. Returns the number of keys removed.
    pub fn purge_idle(&self, window: Duration) -> usize {
        self.purge_idle_at(window, Instant::now())
    }

    pub fn purge_idle_at(&self, window: Duration, now: Instant) -> usize {
        let mut requests = self.lock();
        let before = requests.len();
        requests.retain(|_, stamps| stamps.iter().any(|t| is_within(*t, now, window)));
        before - requests.len()
    }

    /// Number of keys currently held.
    pub fn tracked_clients(&self) -> usize {
        self.lock().len()
    }

    /// Number of timestamps stored for `key`.
    pub fn recorded(&self, key: &ClientKey) -> usize {
        self.lock().get(key).map_or(0, Vec::len)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ClientKey, Vec<Instant>>> {
        // The table holds no invariant a panicking holder could break halfway.
        self.requests.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// `t` is strictly after `now - window`.
fn is_within(t: Instant, now: Instant, window: Duration) -> bool {
    now.saturating_duration_since(t) < window
}

/// Periodically drops idle keys until shutdown.
pub struct IdleSweeper {
    limiter: Arc<SlidingWindowLimiter>,
    window: Duration,
    interval: Duration,
}

impl IdleSweeper {
    pub fn new(limiter: Arc<SlidingWindowLimiter>, window: Duration, interval: Duration) -> Self {
        Self {
            limiter,
            window,
            interval,
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            window_secs = self.window.as_secs(),
            "Idle client sweeper starting"
        );

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        // First tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = self.limiter.purge_idle(self.window);
                    let remaining = self.limiter.tracked_clients();
                    metrics::record_tracked_clients(remaining);
                    tracing::debug!(removed, remaining, "Swept idle clients");
                }
                _ = shutdown.recv() => {
                    tracing::info!("Idle client sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> ClientKey {
        ClientKey::new(s)
    }

    #[test]
    fn test_sliding_window_scenario() {
        let limiter = SlidingWindowLimiter::new();
        let k = key("198.51.100.1");
        let window = Duration::from_secs(1);
        let t0 = Instant::now();

        assert!(limiter.allow_at(&k, 2, window, t0));
        assert!(limiter.allow_at(&k, 2, window, t0 + Duration::from_millis(300)));
        assert!(!limiter.allow_at(&k, 2, window, t0 + Duration::from_millis(500)));
        assert!(limiter.allow_at(&k, 2, window, t0 + Duration::from_millis(1100)));
    }

    #[test]
    fn test_boundary_is_exclusive() {
        let limiter = SlidingWindowLimiter::new();
        let k = key("a");
        let window = Duration::from_secs(1);
        let t0 = Instant::now();

        assert!(limiter.allow_at(&k, 1, window, t0));
        // Exactly `window` later the first stamp sits on the cutoff and is dropped.
        assert!(limiter.allow_at(&k, 1, window, t0 + window));
        assert!(!limiter.allow_at(&k, 1, window, t0 + window + Duration::from_millis(999)));
    }

    #[test]
    fn test_zero_limit_rejects_everything() {
        let limiter = SlidingWindowLimiter::new();
        let k = key("a");
        for _ in 0..5 {
            assert!(!limiter.allow(&k, 0, Duration::from_secs(60)));
        }
        assert_eq!(limiter.recorded(&k), 0);
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = SlidingWindowLimiter::new();
        let window = Duration::from_secs(60);
        assert!(limiter.allow(&key("a"), 1, window));
        assert!(!limiter.allow(&key("a"), 1, window));
        assert!(limiter.allow(&key("b"), 1, window));
    }

    #[test]
    fn test_rejection_commits_pruning() {
        let limiter = SlidingWindowLimiter::new();
        let k = key("a");
        let window = Duration::from_secs(1);
        let t0 = Instant::now();

        assert!(limiter.allow_at(&k, 3, window, t0));
        assert!(limiter.allow_at(&k, 3, window, t0 + Duration::from_millis(600)));
        assert!(limiter.allow_at(&k, 3, window, t0 + Duration::from_millis(700)));
        assert_eq!(limiter.recorded(&k), 3);

        // t0 expires, two remain; a limit of 2 rejects but the table shrinks.
        assert!(!limiter.allow_at(&k, 2, window, t0 + Duration::from_millis(1200)));
        assert_eq!(limiter.recorded(&k), 2);
    }

    #[test]
    fn test_never_exceeds_limit_in_any_window() {
        let limiter = SlidingWindowLimiter::new();
        let k = key("a");
        let limit = 3;
        let window = Duration::from_millis(100);
        let t0 = Instant::now();

        let mut admitted = Vec::new();
        for step in 0..200u64 {
            let now = t0 + Duration::from_millis(step * 7);
            if limiter.allow_at(&k, limit, window, now) {
                admitted.push(now);
            }
        }

        for (i, start) in admitted.iter().enumerate() {
            let in_window = admitted[i..]
                .iter()
                .take_while(|t| t.duration_since(*start) < window)
                .count();
            assert!(in_window <= limit, "{in_window} admissions inside one window");
        }
        assert!(admitted.len() > limit);
    }

    #[test]
    fn test_idle_key_matches_fresh_key() {
        let limiter = SlidingWindowLimiter::new();
        let window = Duration::from_secs(1);
        let t0 = Instant::now();
        let later = t0 + Duration::from_secs(5);

        for i in 0..2 {
            limiter.allow_at(&key("old"), 2, window, t0 + Duration::from_millis(i * 10));
        }

        let mut old = Vec::new();
        let mut fresh = Vec::new();
        for i in 0..4 {
            let now = later + Duration::from_millis(i * 10);
            old.push(limiter.allow_at(&key("old"), 2, window, now));
            fresh.push(limiter.allow_at(&key("new"), 2, window, now));
        }
        assert_eq!(old, fresh);
        assert_eq!(old, vec![true, true, false, false]);
    }

    #[test]
    fn test_purge_idle() {
        let limiter = SlidingWindowLimiter::new();
        let window = Duration::from_secs(1);
        let t0 = Instant::now();

        limiter.allow_at(&key("idle"), 5, window, t0);
        limiter.allow_at(&key("busy"), 5, window, t0 + Duration::from_millis(900));

        assert_eq!(limiter.purge_idle_at(window, t0 + Duration::from_millis(1500)), 1);
        assert_eq!(limiter.tracked_clients(), 1);
        assert_eq!(limiter.recorded(&key("busy")), 1);
        assert_eq!(limiter.recorded(&key("idle")), 0);
    }

    #[test]
    fn test_concurrent_callers_same_key() {
        let limiter = Arc::new(SlidingWindowLimiter::new());
        let k = key("shared");
        let limit = 10;
        let window = Duration::from_secs(60);

        let admitted: usize = std::thread::scope(|s| {
            let handles: Vec<_> = (0..32)
                .map(|_| {
                    let limiter = &limiter;
                    let k = &k;
                    s.spawn(move || (0..10).filter(|_| limiter.allow(k, limit, window)).count())
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });

        assert_eq!(admitted, limit);
        assert_eq!(limiter.recorded(&k), limit);
    }

    #[tokio::test]
    async fn test_concurrent_tasks_same_key() {
        let limiter = Arc::new(SlidingWindowLimiter::new());
        let mut tasks = Vec::new();
        for _ in 0..50 {
            let limiter = limiter.clone();
            tasks.push(tokio::spawn(async move {
                limiter.allow(&ClientKey::new("k"), 7, Duration::from_secs(60))
            }));
        }

        let mut admitted = 0;
        for task in tasks {
            if task.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 7);
    }

    #[tokio::test]
    async fn test_sweeper_purges_and_stops_on_shutdown() {
        let limiter = Arc::new(SlidingWindowLimiter::new());
        limiter.allow(&key("a"), 1, Duration::from_millis(10));

        let (tx, rx) = broadcast::channel(1);
        let sweeper = IdleSweeper::new(
            limiter.clone(),
            Duration::from_millis(10),
            Duration::from_millis(50),
        );
        let handle = tokio::spawn(sweeper.run(rx));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(limiter.tracked_clients(), 0);

        tx.send(()).unwrap();
        handle.await.unwrap();
    }
}
