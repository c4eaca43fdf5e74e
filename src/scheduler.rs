// src/scheduler.rs

//! Periodic index rebuilds.
//!
//! The scheduler owns rebuild timing. Each tick of its [`Ticker`] starts a
//! scrape unless one is already running, in which case the tick is dropped.
//! A successful scrape is published to the [`IndexStore`]; a failed one is
//! logged and leaves the served index untouched until the next tick.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::FutureExt;
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};

use crate::services::Scraper;
use crate::store::IndexStore;

/// Source of rebuild ticks.
#[async_trait]
pub trait Ticker: Send {
    /// Wait for the next tick. Returns `false` once no more ticks will come.
    async fn tick(&mut self) -> bool;
}

/// Wall-clock ticker with a fixed period.
///
/// The first tick completes immediately. Later ticks are spaced from the
/// start of the previous one, not from the end of the scrape it triggered.
pub struct IntervalTicker {
    interval: Interval,
}

impl IntervalTicker {
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval(period.max(Duration::from_millis(1)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval }
    }
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) -> bool {
        self.interval.tick().await;
        true
    }
}

/// What a single rebuild attempt did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A new index was published.
    Published { categories: usize, items: usize },
    /// The scrape failed; the previous index is still served.
    Failed(String),
    /// Another attempt was already running.
    Skipped,
}

/// Counters for rebuild activity since startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshStats {
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub skipped: u64,
}

#[derive(Debug, Default)]
struct Counters {
    attempts: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    skipped: AtomicU64,
}

/// Clears the in-flight flag when the attempt ends, including by cancellation.
struct FlightGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Drives scrape attempts and publishes their results.
pub struct RefreshScheduler {
    scraper: Arc<dyn Scraper>,
    store: Arc<IndexStore>,
    in_flight: Arc<AtomicBool>,
    counters: Counters,
}

impl RefreshScheduler {
    pub fn new(scraper: Arc<dyn Scraper>, store: Arc<IndexStore>) -> Self {
        Self {
            scraper,
            store,
            in_flight: Arc::new(AtomicBool::new(false)),
            counters: Counters::default(),
        }
    }

    /// Whether a scrape is currently running.
    pub fn is_refreshing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> RefreshStats {
        RefreshStats {
            attempts: self.counters.attempts.load(Ordering::Relaxed),
            successes: self.counters.successes.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
            skipped: self.counters.skipped.load(Ordering::Relaxed),
        }
    }

    /// Run one attempt on the current task.
    pub async fn refresh_now(&self) -> RefreshOutcome {
        let Some(_guard) = self.begin() else {
            return RefreshOutcome::Skipped;
        };
        self.attempt().await
    }

    /// Start an attempt in the background.
    ///
    /// The in-flight slot is claimed before this returns, so a second call
    /// made while the first attempt runs returns `None`.
    pub fn try_refresh(self: &Arc<Self>) -> Option<JoinHandle<RefreshOutcome>> {
        let guard = self.begin()?;
        let this = Arc::clone(self);
        Some(tokio::spawn(async move {
            let _guard = guard;
            this.attempt().await
        }))
    }

    /// Tick loop: start an attempt on every tick until `shutdown` resolves
    /// or the ticker runs out.
    pub async fn run<T, F>(self: Arc<Self>, mut ticker: T, shutdown: F)
    where
        T: Ticker,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    log::info!("Refresh scheduler stopping");
                    break;
                }
                more = ticker.tick() => {
                    if !more {
                        log::debug!("Refresh ticker exhausted");
                        break;
                    }
                    // Handle is dropped: the attempt reports through logs and the store.
                    let _ = self.try_refresh();
                }
            }
        }
    }

    fn begin(&self) -> Option<FlightGuard> {
        match self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => Some(FlightGuard {
                flag: Arc::clone(&self.in_flight),
            }),
            Err(_) => {
                self.counters.skipped.fetch_add(1, Ordering::Relaxed);
                log::debug!("Torrent index rebuild already running; skipping tick");
                None
            }
        }
    }

    async fn attempt(&self) -> RefreshOutcome {
        self.counters.attempts.fetch_add(1, Ordering::Relaxed);
        log::info!("Updating torrent index.");
        let started = Instant::now();

        let result = match AssertUnwindSafe(self.scraper.scrape()).catch_unwind().await {
            Ok(result) => result.map_err(|e| e.to_string()),
            Err(panic) => Err(format!("scraper panicked: {}", panic_message(&*panic))),
        };

        match result {
            Ok(index) => {
                let categories = index.len();
                let items = index.item_count();
                self.store.publish(index);
                self.counters.successes.fetch_add(1, Ordering::Relaxed);
                log::info!(
                    "Published torrent index: {} categories, {} torrents in {:.1?}",
                    categories,
                    items,
                    started.elapsed()
                );
                RefreshOutcome::Published { categories, items }
            }
            Err(message) => {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                log::error!(
                    "Torrent index rebuild failed after {:.1?}: {}",
                    started.elapsed(),
                    message
                );
                RefreshOutcome::Failed(message)
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic")
}
