//! Request-scoped cancellation and deadlines for provider calls
//!
//! Every provider operation receives a [`Context`]. The server derives one per
//! request with the configured operation timeout and races the provider call
//! against it, so a hung provider surfaces as [`EngineError::Timeout`] instead
//! of blocking its worker forever.

use crate::error::{EngineError, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time;

/// Context carries the cancellation signal and deadline of one request
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    deadline: Option<Instant>,
    timeout: Option<Duration>,
    done: watch::Receiver<bool>,
    done_tx: watch::Sender<bool>,
}

impl Context {
    pub fn new() -> Self {
        let (done_tx, done_rx) = watch::channel(false);

        Self {
            inner: Arc::new(ContextInner {
                deadline: None,
                timeout: None,
                done: done_rx,
                done_tx,
            }),
        }
    }

    /// Derive a context that is cancelled once `timeout` elapses.
    /// Must be called from within a tokio runtime.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;

        let (done_tx, done_rx) = watch::channel(*self.inner.done.borrow());

        let timer_tx = done_tx.clone();
        let mut parent = self.inner.done.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = time::sleep_until(deadline.into()) => {}
                _ = wait_for_cancel(&mut parent) => {}
                // derived context dropped before its deadline
                _ = timer_tx.closed() => return,
            }
            let _ = timer_tx.send(true);
        });

        Self {
            inner: Arc::new(ContextInner {
                deadline: Some(deadline),
                timeout: Some(timeout),
                done: done_rx,
                done_tx,
            }),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.done.borrow()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Returns a channel that flips to `true` when work done on behalf of this
    /// context should stop
    pub fn done(&self) -> watch::Receiver<bool> {
        self.inner.done.clone()
    }

    pub fn cancel(&self) {
        let _ = self.inner.done_tx.send(true);
    }

    /// Run `operation` until it finishes or this context is cancelled.
    pub async fn guard<T, F>(&self, operation: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.is_cancelled() {
            return Err(self.expiry_error());
        }

        let mut done = self.done();
        tokio::select! {
            result = operation => result,
            _ = wait_for_cancel(&mut done) => Err(self.expiry_error()),
        }
    }

    fn expiry_error(&self) -> EngineError {
        match (self.inner.deadline, self.inner.timeout) {
            (Some(deadline), Some(timeout)) if Instant::now() >= deadline => {
                EngineError::Timeout(timeout)
            }
            _ => EngineError::Cancelled,
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

async fn wait_for_cancel(done: &mut watch::Receiver<bool>) {
    loop {
        if *done.borrow_and_update() {
            return;
        }
        if done.changed().await.is_err() {
            // sender gone: nobody can cancel any more
            std::future::pending::<()>().await;
        }
    }
}
