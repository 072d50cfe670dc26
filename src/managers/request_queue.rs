//! Request serialization queue.
//!
//! At most one request holds the queue at a time. Others wait in arrival
//! order on a single-permit semaphore, which tokio grants first come first
//! served, so a late arrival can never overtake a waiter.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use log::debug;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::types::errors::QueueError;

/// Proof of holding the queue. Dropping it releases the turn.
pub type Permit = OwnedSemaphorePermit;

/// Counts a caller as waiting until its turn comes or it gives up.
struct Waiting<'a>(&'a AtomicUsize);

impl<'a> Waiting<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for Waiting<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// FIFO mutex for async requests. Cheap to clone; clones share the queue.
#[derive(Clone)]
pub struct SerialQueue {
    turn: Arc<Semaphore>,
    waiting: Arc<AtomicUsize>,
}

impl Default for SerialQueue {
    fn default() -> Self {
        Self {
            turn: Arc::new(Semaphore::new(1)),
            waiting: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl SerialQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for this caller's turn.
    ///
    /// # Errors
    /// Returns `QueueError::Closed` if the queue was shut down while waiting.
    pub async fn acquire(&self) -> Result<Permit, QueueError> {
        if let Ok(permit) = Arc::clone(&self.turn).try_acquire_owned() {
            return Ok(permit);
        }

        let _waiting = Waiting::enter(&self.waiting);
        debug!(
            "request queued behind {} other(s)",
            self.waiting.load(Ordering::SeqCst) - 1
        );
        Arc::clone(&self.turn)
            .acquire_owned()
            .await
            .map_err(|_| QueueError::Closed)
    }

    /// Runs `request` once every earlier request has finished.
    ///
    /// The turn passes on whether `request` succeeds or fails.
    ///
    /// # Errors
    /// Returns `QueueError::Closed` if the turn never comes.
    pub async fn run<F, T>(&self, request: F) -> Result<T, QueueError>
    where
        F: Future<Output = T>,
    {
        let _permit = self.acquire().await?;
        Ok(request.await)
    }

    /// Stops the queue. Waiting and later callers get `QueueError::Closed`.
    pub fn close(&self) {
        self.turn.close();
    }

    /// Number of requests waiting behind the current holder.
    pub fn pending_len(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }

    pub fn is_busy(&self) -> bool {
        self.turn.available_permits() == 0
    }
}
