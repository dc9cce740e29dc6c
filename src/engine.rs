//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module wraps the matching core behind the book mutex and runs the
// Good-For-Day pruner.
//
// | Component            | Description                                              |
// |----------------------|----------------------------------------------------------|
// | SharedMatchingEngine | Public concurrent API: every call serializes on one lock |
// | prune loop           | Background thread, wakes at the configured local hour,   |
// |                      | collects GFD ids under the lock, then bulk-cancels them  |
//
// The pruner never holds the book lock while sleeping; shutdown is a
// monotonic flag plus a condition variable, observed on wake and joined by
// the destructor.
//--------------------------------------------------------------------------------------------------

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{DateTime, Local, Timelike};
use parking_lot::{Condvar, Mutex};
use tracing::debug;

use crate::config::EngineConfig;
use crate::depth::DepthSnapshot;
use crate::matching_engine::{MatchingEngine, MatchingResult};
use crate::types::{Order, OrderChange, OrderId, Price, Trade};

/// State shared between the public handle and the pruner thread.
#[derive(Debug)]
struct EngineShared {
    /// The matching core, behind the single book mutex.
    engine: Mutex<MatchingEngine>,
    /// Engine configuration, fixed at construction.
    config: EngineConfig,
    /// Monotonic shutdown flag: set once, never cleared.
    shutdown: AtomicBool,
    /// Mutex/condvar pair the pruner sleeps on. Separate from the book
    /// mutex so that waiting never blocks matching.
    shutdown_lock: Mutex<()>,
    shutdown_signal: Condvar,
}

/// The concurrent order book engine.
///
/// All public operations acquire one mutex protecting the entire book state,
/// so they are linearizable and the trade list returned by a call reflects
/// exactly that call's matches. Construction starts the Good-For-Day pruner
/// thread; dropping the engine signals it and joins.
#[derive(Debug)]
pub struct SharedMatchingEngine {
    shared: Arc<EngineShared>,
    pruner: Option<JoinHandle<()>>,
}

impl SharedMatchingEngine {
    /// Creates an engine with the default configuration.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Creates an engine with the given configuration and starts the pruner.
    pub fn with_config(config: EngineConfig) -> Self {
        let shared = Arc::new(EngineShared {
            engine: Mutex::new(MatchingEngine::new()),
            config,
            shutdown: AtomicBool::new(false),
            shutdown_lock: Mutex::new(()),
            shutdown_signal: Condvar::new(),
        });
        let worker = Arc::clone(&shared);
        let pruner = thread::Builder::new()
            .name("gfd-pruner".into())
            .spawn(move || prune_loop(&worker))
            .expect("failed to spawn the gfd pruner thread");
        Self { shared, pruner: Some(pruner) }
    }

    /// Admits an order and returns the trades produced by this call.
    ///
    /// # Errors
    /// See [`MatchingEngine::add_order`].
    pub fn add_order(&self, order: Order) -> MatchingResult<Vec<Trade>> {
        let id = order.id();
        let trades = self.shared.engine.lock().add_order(order)?;
        debug!(id, trades = trades.len(), "order processed");
        Ok(trades)
    }

    /// Cancels a resting order. Unknown ids are a silent no-op.
    pub fn cancel_order(&self, id: OrderId) {
        self.shared.engine.lock().cancel_order(id);
    }

    /// Cancels a batch of orders under a single lock acquisition.
    pub fn cancel_orders(&self, ids: &[OrderId]) {
        self.shared.engine.lock().cancel_orders(ids);
    }

    /// Replaces a resting order, losing its queue priority. Unknown ids are
    /// a no-op returning no trades.
    ///
    /// # Errors
    /// See [`MatchingEngine::modify_order`].
    pub fn modify_order(&self, id: OrderId, change: OrderChange) -> MatchingResult<Vec<Trade>> {
        self.shared.engine.lock().modify_order(id, change)
    }

    /// Returns the number of resting orders.
    pub fn len(&self) -> usize {
        self.shared.engine.lock().len()
    }

    /// Returns true if no orders rest.
    pub fn is_empty(&self) -> bool {
        self.shared.engine.lock().is_empty()
    }

    /// Returns true if an order with this id is resting.
    pub fn contains(&self, id: OrderId) -> bool {
        self.shared.engine.lock().contains(id)
    }

    /// Returns the best bid price.
    pub fn best_bid(&self) -> Option<Price> {
        self.shared.engine.lock().best_bid()
    }

    /// Returns the best ask price.
    pub fn best_ask(&self) -> Option<Price> {
        self.shared.engine.lock().best_ask()
    }

    /// Returns the spread between the best ask and the best bid.
    pub fn spread(&self) -> Option<i64> {
        self.shared.engine.lock().spread()
    }

    /// Takes a best-first aggregated depth snapshot, at most `limit` rows
    /// per side.
    pub fn depth_snapshot(&self, limit: usize) -> DepthSnapshot {
        self.shared.engine.lock().depth_snapshot(limit)
    }
}

impl Default for SharedMatchingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SharedMatchingEngine {
    fn drop(&mut self) {
        {
            let _guard = self.shared.shutdown_lock.lock();
            self.shared.shutdown.store(true, Ordering::Release);
        }
        self.shared.shutdown_signal.notify_all();
        if let Some(handle) = self.pruner.take() {
            if handle.join().is_err() {
                debug!("gfd pruner thread panicked before shutdown");
            }
        }
    }
}

/// The pruner body: sleep until the next prune moment or shutdown, then
/// collect and bulk-cancel the Good-For-Day orders.
fn prune_loop(shared: &EngineShared) {
    loop {
        let wait = next_prune_wait(Local::now(), shared.config.prune_hour);
        let mut guard = shared.shutdown_lock.lock();
        if shared.shutdown.load(Ordering::Acquire) {
            return;
        }
        let timed_out = shared.shutdown_signal.wait_for(&mut guard, wait).timed_out();
        drop(guard);
        if shared.shutdown.load(Ordering::Acquire) {
            return;
        }
        if !timed_out {
            // Spurious wake: recompute the deadline and keep waiting.
            continue;
        }
        prune_good_for_day(shared);
    }
}

/// Collects the GFD ids under the book lock, releases it, then re-acquires
/// it once for the whole bulk cancel.
fn prune_good_for_day(shared: &EngineShared) {
    let ids = shared.engine.lock().good_for_day_ids();
    if ids.is_empty() {
        return;
    }
    debug!(count = ids.len(), "pruning good-for-day orders");
    shared.engine.lock().cancel_orders(&ids);
}

/// Time until the next occurrence of `prune_hour` o'clock local time. If the
/// hour has already passed today, the next occurrence is tomorrow. A small
/// slack keeps the wake on the far side of the hour boundary.
fn next_prune_wait(now: DateTime<Local>, prune_hour: u32) -> Duration {
    let mut date = now.date_naive();
    if now.hour() >= prune_hour {
        if let Some(next) = date.succ_opt() {
            date = next;
        }
    }
    let target = date
        .and_hms_opt(prune_hour, 0, 0)
        .and_then(|naive| naive.and_local_timezone(Local).earliest());
    match target {
        Some(target) => {
            (target - now).to_std().unwrap_or(Duration::ZERO) + Duration::from_millis(100)
        }
        None => Duration::from_secs(3600),
    }
}
