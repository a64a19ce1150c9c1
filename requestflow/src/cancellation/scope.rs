//! A scope owning the tasks started by one handler.

use parking_lot::{Mutex, RwLock};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Default)]
struct ScopeState {
    active: AtomicUsize,
    idle: Notify,
}

/// Decrements the active count when a task finishes, panics or is aborted.
struct ActiveGuard(Arc<ScopeState>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        if self.0.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

/// Owns background tasks and aborts them when closed or dropped.
///
/// Closing is idempotent; only the first reason is kept.
pub struct TaskScope {
    name: String,
    state: Arc<ScopeState>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    closed: AtomicBool,
    reason: RwLock<Option<String>>,
}

impl TaskScope {
    /// Creates an open scope.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(ScopeState::default()),
            handles: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            reason: RwLock::new(None),
        }
    }

    /// Spawns a task owned by the scope.
    ///
    /// Returns false without spawning when the scope is closed.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn spawn<F>(&self, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.is_closed() {
            debug!(scope = %self.name, "Scope closed, task not started");
            return false;
        }

        self.state.active.fetch_add(1, Ordering::SeqCst);
        let guard = ActiveGuard(self.state.clone());
        let handle = tokio::spawn(async move {
            let _guard = guard;
            task.await;
        });

        let mut handles = self.handles.lock();
        handles.retain(|handle| !handle.is_finished());
        handles.push(handle);
        true
    }

    /// Returns the number of tasks that have not finished yet.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.state.active.load(Ordering::SeqCst)
    }

    /// Waits until no task of the scope is running.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.state.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Aborts every running task. The scope stays open.
    pub fn cancel_all(&self) {
        let handles = std::mem::take(&mut *self.handles.lock());
        for handle in handles {
            handle.abort();
        }
    }

    /// Aborts every running task and refuses new ones.
    pub fn close(&self, reason: impl Into<String>) {
        if self
            .closed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            let reason = reason.into();
            debug!(scope = %self.name, %reason, "Closing scope");
            *self.reason.write() = Some(reason);
        }
        self.cancel_all();
    }

    /// Returns whether the scope is closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Returns the reason the scope was closed with.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.reason.read().clone()
    }
}

impl Drop for TaskScope {
    fn drop(&mut self) {
        for handle in self.handles.get_mut().drain(..) {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for TaskScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskScope")
            .field("name", &self.name)
            .field("in_flight", &self.in_flight())
            .field("closed", &self.is_closed())
            .finish()
    }
}
