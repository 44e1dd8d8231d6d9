//! Concurrency gate bounding how many browser sessions run at once.
//!
//! Admission is first-come first-served: `tokio`'s semaphore queues waiters
//! in arrival order and wakes one per released permit. Waiting has no
//! timeout.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

use crate::{Result, SiphonError};

/// Default number of concurrent extractions
pub const MAX_CONCURRENT: usize = 10;

#[derive(Debug)]
struct GateState {
    semaphore: Arc<Semaphore>,
    limit: usize,
    active: AtomicUsize,
    waiting: AtomicUsize,
    peak: AtomicUsize,
}

/// Counted admission gate shared by all requests.
///
/// Cloning is cheap and every clone admits against the same permit pool.
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    state: Arc<GateState>,
}

impl Default for ConcurrencyGate {
    fn default() -> Self {
        Self::new(MAX_CONCURRENT)
    }
}

impl ConcurrencyGate {
    /// Creates a gate admitting at most `limit` holders (at least one).
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            state: Arc::new(GateState {
                semaphore: Arc::new(Semaphore::new(limit)),
                limit,
                active: AtomicUsize::new(0),
                waiting: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }),
        }
    }

    /// Waits until a slot is free and takes it.
    ///
    /// # Errors
    ///
    /// [`SiphonError::GateClosed`] if [`close`](Self::close) was called.
    pub async fn acquire(&self) -> Result<GatePermit> {
        let queued = Queued::enter(&self.state.waiting);
        let acquired = self.state.semaphore.clone().acquire_owned().await;
        drop(queued);

        let permit = acquired.map_err(|_| SiphonError::GateClosed)?;
        let active = self.state.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.peak.fetch_max(active, Ordering::SeqCst);
        debug!(active, limit = self.state.limit, "Admitted");

        Ok(GatePermit { permit: Some(permit), state: Arc::clone(&self.state) })
    }

    /// Stops admitting. Current and future waiters fail with `GateClosed`.
    pub fn close(&self) {
        self.state.semaphore.close();
    }

    /// Number of admitted holders.
    pub fn active(&self) -> usize {
        self.state.active.load(Ordering::SeqCst)
    }

    /// Number of callers queued in [`acquire`](Self::acquire).
    pub fn waiting(&self) -> usize {
        self.state.waiting.load(Ordering::SeqCst)
    }

    /// Maximum number of concurrent holders.
    pub fn limit(&self) -> usize {
        self.state.limit
    }

    /// Highest `active` count observed so far.
    pub fn peak(&self) -> usize {
        self.state.peak.load(Ordering::SeqCst)
    }
}

/// Counts a caller as waiting until dropped, including when the
/// `acquire` future is cancelled
struct Queued<'a>(&'a AtomicUsize);

impl<'a> Queued<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for Queued<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// One admitted slot. Released exactly once, explicitly or on drop.
#[derive(Debug)]
pub struct GatePermit {
    permit: Option<OwnedSemaphorePermit>,
    state: Arc<GateState>,
}

impl GatePermit {
    /// Gives the slot back and wakes the longest waiter, if any.
    pub fn release(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if let Some(permit) = self.permit.take() {
            let active = self.state.active.fetch_sub(1, Ordering::SeqCst) - 1;
            drop(permit);
            debug!(active, "Released");
        }
    }
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        self.release_once();
    }
}
