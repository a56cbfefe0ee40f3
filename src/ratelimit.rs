// src/ratelimit.rs
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;

/// Sliding-window per-user rate limiter. Each user gets `budget` requests
/// per `window`; timestamps older than the window are pruned on every
/// check, so the map never grows beyond budget entries per active user.
#[derive(Debug)]
pub struct RateLimiter {
    budget: usize,
    window: Duration,
    hits: Mutex<HashMap<u64, Vec<Instant>>>,
}

impl RateLimiter {
    pub fn new(budget: usize, window_secs: u64) -> Self {
        Self {
            budget: budget.max(1),
            window: Duration::from_secs(window_secs.max(1)),
            hits: Mutex::new(HashMap::new()),
        }
    }

    /// Check and record one request for `user_id`. A denied request is not
    /// recorded, so hammering while throttled does not extend the cooldown.
    pub fn allow(&self, user_id: u64) -> bool {
        self.allow_at(user_id, Instant::now())
    }

    /// Same as [`allow`](Self::allow) with an explicit clock, for tests.
    pub fn allow_at(&self, user_id: u64, now: Instant) -> bool {
        let mut hits = match self.hits.lock() {
            Ok(g) => g,
            // A poisoned limiter fails open; throttling is a courtesy,
            // not a security boundary.
            Err(_) => return true,
        };
        let stamps = hits.entry(user_id).or_default();
        stamps.retain(|t| now.duration_since(*t) < self.window);
        if stamps.len() >= self.budget {
            return false;
        }
        stamps.push(now);
        true
    }

    /// Drop state for users whose whole window has lapsed.
    pub fn prune(&self, now: Instant) {
        if let Ok(mut hits) = self.hits.lock() {
            hits.retain(|_, stamps| {
                stamps.retain(|t| now.duration_since(*t) < self.window);
                !stamps.is_empty()
            });
        }
    }
}

/// Spawn a background task that evicts idle user buckets on a fixed
/// interval. Without it the map grows one entry per distinct user forever.
pub fn spawn_prune_task(limiter: Arc<RateLimiter>, every_secs: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(every_secs.max(1)));
        loop {
            ticker.tick().await;
            limiter.prune(Instant::now());
        }
    })
}
