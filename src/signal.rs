use std::{convert::Infallible, sync::Arc, time::Duration};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::Mutex;

/// A read-only view of whether a [`Gatherer`] has recorded an error yet.
///
/// The signal starts out not ready, and becomes ready for good the moment the first error is
/// added. Observing it never consumes anything: any number of clones can poll or wait on it, as
/// many times as they like, and all of them see the same state.
///
/// ```
/// # use error_gatherer::{Gatherer, Traced};
/// # use std::time::Duration;
/// let g = Gatherer::new();
/// let failed = g.failed();
/// assert!(!failed.is_ready());
/// assert!(!failed.wait_timeout(Duration::from_millis(10)));
///
/// g.add(Traced::new("oh no"));
/// assert!(failed.is_ready());
/// assert!(failed.wait_timeout(Duration::from_millis(10)));
/// failed.wait(); // Returns immediately
/// ```
///
/// The underlying [`Receiver`] takes part in [`crossbeam_channel::select!`], so the signal can
/// be waited on together with other events. It never delivers a message; it becomes ready by
/// disconnecting.
///
/// ```
/// # use error_gatherer::{Gatherer, Traced};
/// use crossbeam_channel::{after, select};
/// use std::time::Duration;
///
/// let g = Gatherer::new();
/// g.add(Traced::new("oh no"));
///
/// let failed = g.failed();
/// select! {
///     recv(failed.receiver()) -> _ => println!("shutting down"),
///     recv(after(Duration::from_secs(1))) -> _ => panic!("failure was not signalled"),
/// }
/// ```
///
/// The signal stays not ready for as long as no error is recorded, even after every
/// [`Gatherer`] handle has been dropped.
///
/// [`Gatherer`]: crate::Gatherer
#[derive(Debug, Clone)]
pub struct FailedSignal {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    /// Holds the channel open. Every clone of the signal shares it, so the channel only
    /// disconnects through [`FailedSignal::close`].
    open: Mutex<Option<Sender<Infallible>>>,
    rx: Receiver<Infallible>,
}

impl FailedSignal {
    pub(crate) fn new() -> Self {
        let (tx, rx) = crossbeam_channel::bounded(0);
        FailedSignal {
            shared: Arc::new(Shared {
                open: Mutex::new(Some(tx)),
                rx,
            }),
        }
    }

    /// Makes the signal ready. Returns `true` only for the call which actually closed it.
    pub(crate) fn close(&self) -> bool {
        self.shared.open.lock().take().is_some()
    }

    /// Returns `true` if an error has been recorded. Never blocks.
    pub fn is_ready(&self) -> bool {
        matches!(self.shared.rx.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Blocks until an error has been recorded.
    pub fn wait(&self) {
        match self.shared.rx.recv() {
            Ok(never) => match never {},
            Err(_) => (),
        }
    }

    /// Blocks until an error has been recorded, or `timeout` elapses. Returns `true` if an error
    /// was recorded.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        matches!(self.shared.rx.recv_timeout(timeout), Err(RecvTimeoutError::Disconnected))
    }

    /// The channel behind this signal, for use with [`crossbeam_channel::select!`].
    pub fn receiver(&self) -> &Receiver<Infallible> {
        &self.shared.rx
    }
}
