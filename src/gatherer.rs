use std::{
    fmt, mem,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace, warn};

use crate::{
    config::Spawner, error, AccumulatedError, Cause, FailedSignal, GathererBuilder, TaskError,
};

type Hook = Box<dyn FnOnce() + Send + 'static>;

/// Runs work concurrently, and gathers every error which that work produces.
///
/// A `Gatherer` is a handle: cloning it gives another handle onto the same tasks, errors and
/// failure signal, which is how tasks and observers on other threads get hold of it.
///
/// # Launching and waiting
///
/// [`go`] runs a closure on its own thread. [`wait`] blocks until every launched closure has
/// returned, then reports everything which went wrong:
///
/// ```
/// # use error_gatherer::{Gatherer, Traced};
/// let g = Gatherer::new();
/// for i in 0..4 {
///     g.go(move || {
///         if i % 2 == 1 {
///             return Err(Traced::new(format!("task {i} failed")));
///         }
///         Ok(())
///     });
/// }
///
/// let err = g.wait().unwrap_err();
/// assert_eq!(err.causes().len(), 2);
/// ```
///
/// # Observing failure
///
/// Other components can find out about the first error without waiting for every task:
///
/// - poll or wait on the signal from [`failed`], or
/// - register a hook with [`on_fail`], which is called once, as soon as the first error is added.
///
/// Failure is purely informative. Tasks which are still running are not interrupted; they have to
/// check [`failed`] themselves if they should stop early.
///
/// [`go`]: Gatherer::go
/// [`wait`]: Gatherer::wait
/// [`failed`]: Gatherer::failed
/// [`on_fail`]: Gatherer::on_fail
#[derive(Clone)]
pub struct Gatherer {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<State>,
    /// Notified whenever the number of outstanding tasks drops to zero.
    idle: Condvar,
    signal: FailedSignal,
    spawner: Spawner,
}

struct State {
    tasks: usize,
    causes: Vec<Cause>,
    failed: bool,
    hooks: Vec<Hook>,
}

impl State {
    fn aggregate(&self) -> Option<AccumulatedError> {
        if self.causes.is_empty() {
            None
        } else {
            Some(AccumulatedError::new(self.causes.clone()))
        }
    }
}

impl Gatherer {
    /// Creates a `Gatherer` with no tasks, no errors, and no hooks, using the default
    /// [`GathererBuilder`] settings.
    pub fn new() -> Self {
        GathererBuilder::new().build()
    }

    pub(crate) fn with_spawner(spawner: Spawner) -> Self {
        Gatherer {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    tasks: 0,
                    causes: vec![],
                    failed: false,
                    hooks: vec![],
                }),
                idle: Condvar::new(),
                signal: FailedSignal::new(),
                spawner,
            }),
        }
    }

    /// Runs `f` on a new thread, without blocking the caller. If it returns an error, the error
    /// is [`add`](Gatherer::add)ed.
    ///
    /// The task counts as outstanding for [`wait`](Gatherer::wait) from the moment `go` is
    /// called, until its error (if any) has been recorded.
    ///
    /// If `f` panics, the panic is caught and recorded as a [`TaskError::Panicked`]. If no thread
    /// can be started, a [`TaskError::Spawn`] is recorded instead and `f` never runs.
    pub fn go<F, E>(&self, f: F)
    where
        F: FnOnce() -> Result<(), E> + Send + 'static,
        E: Into<Cause>,
    {
        // Keeps `wait` from returning before a spawn failure below has been recorded.
        let _launching = self.track();
        let task = self.track();
        trace!("launching task");

        let spawned = self.inner.spawner.spawn(move || {
            let task = task;
            match panic::catch_unwind(AssertUnwindSafe(f)) {
                Ok(result) => task.gatherer.add_result(result),
                Err(payload) => {
                    let err = TaskError::from_panic(payload);
                    warn!(%err, "task panicked");
                    task.gatherer.add(err);
                }
            }
        });

        if let Err(err) = spawned {
            warn!(%err, "could not spawn task thread");
            self.add(TaskError::Spawn(err));
        }
    }

    /// Records an error.
    ///
    /// The first error recorded makes the [`failed`](Gatherer::failed) signal ready, and then
    /// calls every hook registered with [`on_fail`](Gatherer::on_fail), in the order they were
    /// registered, before returning. Later errors are only recorded.
    ///
    /// ```
    /// # use error_gatherer::{Gatherer, Traced};
    /// let g = Gatherer::new();
    /// g.add(Traced::new("1"));
    /// g.add(Traced::new("2"));
    /// assert_eq!(g.err().unwrap().causes().len(), 2);
    /// ```
    pub fn add(&self, err: impl Into<Cause>) {
        let cause = err.into();

        let hooks = {
            let mut state = self.inner.state.lock();
            state.causes.push(cause.clone());

            if state.failed {
                trace!(%cause, total = state.causes.len(), "failure recorded");
                return;
            }

            state.failed = true;
            self.inner.signal.close();
            debug!(%cause, hooks = state.hooks.len(), "first failure recorded");
            mem::take(&mut state.hooks)
        };

        for hook in hooks {
            run_hook(hook);
        }
    }

    /// Records the error from `result`, if there is one. `Ok(())` is ignored entirely: it is not
    /// counted, and does not make the gatherer fail.
    ///
    /// ```
    /// # use error_gatherer::{Gatherer, Traced};
    /// let g = Gatherer::new();
    /// g.add_result(Ok::<_, Traced>(()));
    /// assert!(g.err().is_none());
    ///
    /// g.add_result(Err(Traced::new("nope")));
    /// assert!(g.err().is_some());
    /// ```
    pub fn add_result<E>(&self, result: Result<(), E>)
    where
        E: Into<Cause>,
    {
        if let Err(err) = result {
            self.add(err);
        }
    }

    /// Blocks until every task launched with [`go`](Gatherer::go) has finished, then returns all
    /// errors recorded so far, if any.
    ///
    /// This can be called any number of times, and returns straight away if no tasks are
    /// outstanding. It never calls [`on_fail`](Gatherer::on_fail) hooks itself.
    pub fn wait(&self) -> Result<(), AccumulatedError> {
        let mut state = self.inner.state.lock();
        while state.tasks > 0 {
            self.inner.idle.wait(&mut state);
        }

        match state.aggregate() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// All errors recorded so far, or `None` if there are none. Never blocks on tasks.
    pub fn err(&self) -> Option<AccumulatedError> {
        self.inner.state.lock().aggregate()
    }

    /// The signal which becomes ready once the first error is recorded.
    ///
    /// ```
    /// # use error_gatherer::{Gatherer, Traced};
    /// let g = Gatherer::new();
    /// assert!(!g.failed().is_ready());
    ///
    /// g.add(Traced::new("oh no"));
    /// assert!(g.failed().is_ready());
    /// ```
    pub fn failed(&self) -> FailedSignal {
        self.inner.signal.clone()
    }

    /// Registers a hook to call once the first error is recorded.
    ///
    /// Hooks registered before the first error are called by whichever thread adds that error,
    /// one after another in registration order, after [`failed`](Gatherer::failed) has become
    /// ready. A hook registered after the first error is called immediately, on the calling
    /// thread. Either way, each hook is called exactly once.
    ///
    /// Hooks are called without any internal lock held, so they may inspect the gatherer or add
    /// further errors to it. A hook must not call [`wait`](Gatherer::wait): the thread running it
    /// may itself be an outstanding task. A hook which panics is logged and skipped; the hooks
    /// after it still run.
    ///
    /// ```
    /// # use error_gatherer::{Gatherer, Traced};
    /// use std::sync::{atomic::{AtomicUsize, Ordering}, Arc};
    ///
    /// let g = Gatherer::new();
    /// let calls = Arc::new(AtomicUsize::new(0));
    ///
    /// let counter = calls.clone();
    /// g.on_fail(move || {
    ///     counter.fetch_add(1, Ordering::SeqCst);
    /// });
    ///
    /// g.add(Traced::new("1"));
    /// g.add(Traced::new("2"));
    /// assert_eq!(calls.load(Ordering::SeqCst), 1);
    /// ```
    pub fn on_fail(&self, hook: impl FnOnce() + Send + 'static) {
        {
            let mut state = self.inner.state.lock();
            if !state.failed {
                state.hooks.push(Box::new(hook));
                return;
            }
        }

        trace!("already failed, calling hook immediately");
        run_hook(Box::new(hook));
    }

    fn track(&self) -> TaskGuard {
        self.inner.state.lock().tasks += 1;
        TaskGuard {
            gatherer: self.clone(),
        }
    }
}

impl Default for Gatherer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Gatherer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Gatherer")
            .field("tasks", &state.tasks)
            .field("causes", &state.causes)
            .field("failed", &state.failed)
            .field("hooks", &state.hooks.len())
            .finish()
    }
}

/// Calls a hook, logging a panic instead of letting it skip the hooks after it.
fn run_hook(hook: Hook) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(hook)) {
        let message = error::panic_message(payload);
        warn!(%message, "on_fail hook panicked");
    }
}

/// One outstanding unit of work. Dropping it marks the work as finished, even when unwinding.
struct TaskGuard {
    gatherer: Gatherer,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        let inner = &self.gatherer.inner;
        let mut state = inner.state.lock();
        state.tasks -= 1;
        if state.tasks == 0 {
            inner.idle.notify_all();
        }
    }
}
