//! Fixed-window request counters keyed by principal and category.
//!
//! Every `(principal, category)` pair owns at most one [`RateLimitEntry`].
//! A window opens on the first admitted request and closes `window_ms` later;
//! the first request after that replaces the entry with a fresh window.
//! Rejected requests never touch the counter.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

use crate::clock::{Clock, SystemClock};
use crate::metrics::RATE_LIMIT_ENTRIES;

/// Named quota class. Callers that don't pick one get `Default`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    #[default]
    Default,
    Ai,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Default => "default",
            Category::Ai => "ai",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quota for one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryLimit {
    pub max_requests: u32,
    pub window_ms: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub default: CategoryLimit,
    pub ai: CategoryLimit,
}

impl RateLimitConfig {
    pub fn limit_for(&self, category: Category) -> CategoryLimit {
        match category {
            Category::Default => self.default,
            Category::Ai => self.ai,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            default: CategoryLimit {
                max_requests: 100,
                window_ms: 60_000,
            },
            ai: CategoryLimit {
                max_requests: 20,
                window_ms: 60_000,
            },
        }
    }
}

// Rate limit entry - state of one key inside its current window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    pub count: u32,
    pub window_end: i64,
}

impl RateLimitEntry {
    fn open(now: i64, limit: CategoryLimit) -> Self {
        Self {
            count: 1,
            window_end: now.saturating_add(limit.window_ms),
        }
    }
}

/// Outcome of a single [`RateLimiter::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    /// Epoch milliseconds at which the current window ends.
    pub reset_at: i64,
}

/// Process-local limiter. One instance is built at startup and shared by
/// every handler; nothing is persisted or shared across processes.
pub struct RateLimiter {
    entries: DashMap<String, RateLimitEntry>,
    config: RateLimitConfig,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            config,
            clock,
        }
    }

    pub fn with_system_clock(config: RateLimitConfig) -> Self {
        Self::new(config, Arc::new(SystemClock))
    }

    /// Admit or reject one request for `principal` in `category`.
    ///
    /// The entry guard holds the shard write lock for the whole
    /// read-increment-write, so concurrent callers can never push a window
    /// past `max_requests`.
    pub fn check(&self, principal: &str, category: Category) -> RateLimitDecision {
        let limit = self.config.limit_for(category);
        let now = self.clock.now_ms();
        let key = format!("{}:{}", principal, category);

        match self.entries.entry(key) {
            Entry::Vacant(vacant) => {
                let entry = vacant.insert(RateLimitEntry::open(now, limit));
                fresh_window(&entry, limit)
            }
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();

                // window expired..? replace it
                if now > entry.window_end {
                    *entry = RateLimitEntry::open(now, limit);
                    return fresh_window(entry, limit);
                }

                if entry.count >= limit.max_requests {
                    return RateLimitDecision {
                        allowed: false,
                        remaining: 0,
                        reset_at: entry.window_end,
                    };
                }

                entry.count += 1;
                RateLimitDecision {
                    allowed: true,
                    remaining: limit.max_requests - entry.count,
                    reset_at: entry.window_end,
                }
            }
        }
    }

    /// Drop every entry whose window has already ended.
    pub fn sweep(&self) {
        let now = self.clock.now_ms();
        self.entries.retain(|_, entry| now <= entry.window_end);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn fresh_window(entry: &RateLimitEntry, limit: CategoryLimit) -> RateLimitDecision {
    RateLimitDecision {
        allowed: true,
        remaining: limit.max_requests.saturating_sub(entry.count),
        reset_at: entry.window_end,
    }
}

/// Owner of the background sweep task.
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signal the sweeper to stop and wait for it.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "rate limit sweeper ended abnormally");
        }
    }
}

pub fn spawn_sweeper(limiter: Arc<RateLimiter>, period: Duration) -> SweeperHandle {
    let (shutdown, rx) = watch::channel(false);
    let task = tokio::spawn(sweeper(limiter, period, rx));
    SweeperHandle { shutdown, task }
}

// Periodic sweep - bounds memory, correctness never depends on it
async fn sweeper(limiter: Arc<RateLimiter>, period: Duration, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // first tick fires immediately
    ticker.tick().await;

    tracing::info!(?period, "rate limit sweeper started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let before = limiter.len();
                limiter.sweep();
                let after = limiter.len();
                RATE_LIMIT_ENTRIES.set(after as f64);
                tracing::debug!(removed = before.saturating_sub(after), live = after, "rate limit sweep");
            }
            _ = shutdown.changed() => break,
        }
    }

    tracing::info!("rate limit sweeper stopped");
}
