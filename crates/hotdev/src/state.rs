//! Compile state tracking.
//!
//! [`CompileState`] follows the compiler through
//! `Idle -> Building -> {Valid, Invalid}` and holds the callbacks of requests
//! that arrived while no valid build was available. Callbacks are released
//! by a deferred [`flush`](CompileState::flush) that only runs if no
//! invalidation slipped in between completion and the flush; a generation
//! counter, bumped on every start and invalidation, makes that check exact.

use crate::stats::CompileResult;
use parking_lot::Mutex;
use std::mem;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Callback queued until the next durable `Valid` state.
pub type ReadyCallback = Box<dyn FnOnce(Arc<CompileResult>) + Send>;

/// Compile status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileStatus {
    /// No compile has started yet
    Idle,
    /// A compile is in progress
    Building,
    /// The last compile finished and nothing changed since
    Valid,
    /// Sources changed (or a run was requested) after the last compile
    Invalid,
}

impl CompileStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, CompileStatus::Valid)
    }

    /// Whether a compile is pending or running.
    pub fn is_busy(&self) -> bool {
        matches!(self, CompileStatus::Building | CompileStatus::Invalid)
    }
}

/// Token returned by [`CompileState::on_compile_done`] for the deferred flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "queued callbacks only run once the flush is executed"]
pub struct PendingFlush {
    generation: u64,
}

/// What the caller has to do after a compile finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub flush: PendingFlush,
    /// A rebuild was requested while this compile was running
    pub rebuild: bool,
}

/// Answer to [`CompileState::request_rebuild`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rebuild {
    /// No compile in flight: the caller must start one now
    Run,
    /// A compile is already in flight; another one follows when it completes
    Coalesced,
}

/// State before a requested run, restored if the run never starts.
struct Rollback {
    status: CompileStatus,
    latest: Option<Arc<CompileResult>>,
    generation: u64,
}

struct Inner {
    status: CompileStatus,
    generation: u64,
    latest: Option<Arc<CompileResult>>,
    callbacks: Vec<ReadyCallback>,
    force_rebuild: bool,
    rollback: Option<Rollback>,
    closed: bool,
}

/// Compile state machine shared by the compiler hooks and the request path.
pub struct CompileState {
    inner: Mutex<Inner>,
}

impl Default for CompileState {
    fn default() -> Self {
        Self::new()
    }
}

impl CompileState {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                status: CompileStatus::Idle,
                generation: 0,
                latest: None,
                callbacks: Vec::new(),
                force_rebuild: false,
                rollback: None,
                closed: false,
            }),
        }
    }

    pub fn status(&self) -> CompileStatus {
        self.inner.lock().status
    }

    /// Latest result; only present while the status is `Valid`.
    pub fn latest(&self) -> Option<Arc<CompileResult>> {
        self.inner.lock().latest.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Number of callbacks waiting for a valid build.
    pub fn pending(&self) -> usize {
        self.inner.lock().callbacks.len()
    }

    /// Stop reacting to compiler events. Queued callbacks are kept.
    pub fn close(&self) {
        self.inner.lock().closed = true;
    }

    /// A compile started.
    pub fn on_compile_start(&self) {
        let mut inner = self.inner.lock();
        if inner.closed {
            return;
        }
        inner.status = CompileStatus::Building;
        inner.generation += 1;
        inner.latest = None;
        inner.rollback = None;
    }

    /// Sources changed, or a run is about to start.
    pub fn on_invalidated(&self) {
        let mut inner = self.inner.lock();
        if inner.closed {
            return;
        }
        inner.status = CompileStatus::Invalid;
        inner.generation += 1;
        inner.latest = None;
        inner.rollback = None;
    }

    /// A compile finished. Diagnostics in `result` do not matter here.
    ///
    /// Returns `None` once the state is closed.
    pub fn on_compile_done(&self, result: Arc<CompileResult>) -> Option<Completion> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return None;
        }
        inner.status = CompileStatus::Valid;
        inner.latest = Some(result);
        inner.rollback = None;
        Some(Completion {
            flush: PendingFlush {
                generation: inner.generation,
            },
            rebuild: mem::take(&mut inner.force_rebuild),
        })
    }

    /// Run the queued callbacks if the build is still the one that completed.
    ///
    /// Returns the number of callbacks invoked. When an invalidation or a new
    /// compile raced in, nothing runs and the queue waits for the next
    /// completion.
    pub fn flush(&self, pending: PendingFlush) -> usize {
        let (result, callbacks) = {
            let mut inner = self.inner.lock();
            if inner.status != CompileStatus::Valid || inner.generation != pending.generation {
                return 0;
            }
            let Some(result) = inner.latest.clone() else {
                return 0;
            };
            (result, mem::take(&mut inner.callbacks))
        };

        let count = callbacks.len();
        for callback in callbacks {
            callback(Arc::clone(&result));
        }
        count
    }

    /// Invoke `callback` now if the build is valid, otherwise queue it.
    pub fn wait_until_valid(&self, callback: ReadyCallback) {
        let mut inner = self.inner.lock();
        let result = match inner.latest.clone() {
            Some(result) if inner.status == CompileStatus::Valid => result,
            _ => {
                inner.callbacks.push(callback);
                return;
            }
        };
        drop(inner);
        callback(result);
    }

    /// Wait for the next durable valid build.
    ///
    /// Resolves immediately when the build is already valid.
    pub async fn ready(&self) -> Option<Arc<CompileResult>> {
        let (tx, rx) = oneshot::channel();
        self.wait_until_valid(Box::new(move |result| {
            let _ = tx.send(result);
        }));
        rx.await.ok()
    }

    /// Ask for a rebuild without ever having two compiles in flight.
    pub fn request_rebuild(&self) -> Rebuild {
        let mut inner = self.inner.lock();
        match inner.status {
            CompileStatus::Idle | CompileStatus::Valid => {
                let status = inner.status;
                let latest = inner.latest.take();
                inner.status = CompileStatus::Invalid;
                inner.generation += 1;
                inner.rollback = Some(Rollback {
                    status,
                    latest,
                    generation: inner.generation,
                });
                Rebuild::Run
            }
            CompileStatus::Building | CompileStatus::Invalid => {
                inner.force_rebuild = true;
                Rebuild::Coalesced
            }
        }
    }

    /// Undo a [`Rebuild::Run`] whose compile could not be started.
    ///
    /// Restores the status and result from before the request and drops any
    /// rebuild coalesced onto it, so the next request starts a fresh run.
    /// Nothing changes if a compiler hook fired in the meantime. Returns a
    /// flush token when the restored state is `Valid`, for callbacks that
    /// queued up while the run was pending.
    pub fn cancel_rebuild(&self) -> Option<PendingFlush> {
        let mut inner = self.inner.lock();
        let rollback = inner.rollback.take()?;
        if inner.closed || inner.generation != rollback.generation {
            return None;
        }
        inner.status = rollback.status;
        inner.latest = rollback.latest;
        inner.force_rebuild = false;
        inner.generation += 1;

        (inner.status == CompileStatus::Valid && inner.latest.is_some()).then_some(PendingFlush {
            generation: inner.generation,
        })
    }
}
