use std::{
    io,
    sync::atomic::{AtomicUsize, Ordering},
    thread,
};

use crate::Gatherer;

const DEFAULT_THREAD_NAME: &str = "gatherer-task";

/// Configures how a [`Gatherer`] launches the tasks given to [`Gatherer::go`].
///
/// ```
/// # use error_gatherer::GathererBuilder;
/// let g = GathererBuilder::new()
///     .thread_name("sync-worker")
///     .stack_size(256 * 1024)
///     .build();
///
/// g.go(|| {
///     let name = std::thread::current().name().map(str::to_owned);
///     assert_eq!(name.as_deref(), Some("sync-worker-0"));
///     Ok::<_, std::io::Error>(())
/// });
/// assert!(g.wait().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct GathererBuilder {
    thread_name: String,
    stack_size: Option<usize>,
}

impl GathererBuilder {
    /// A builder with the default settings: threads named `gatherer-task-<n>`, with the platform's
    /// default stack size.
    pub fn new() -> Self {
        GathererBuilder {
            thread_name: DEFAULT_THREAD_NAME.to_owned(),
            stack_size: None,
        }
    }

    /// Sets the prefix of task thread names. Each task thread is named `<prefix>-<n>`, where `n`
    /// counts the tasks launched by this gatherer, starting at zero.
    #[must_use]
    pub fn thread_name(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name = prefix.into();
        self
    }

    /// Sets the stack size, in bytes, of task threads.
    #[must_use]
    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    /// Creates a [`Gatherer`] with this configuration.
    #[must_use]
    pub fn build(self) -> Gatherer {
        Gatherer::with_spawner(Spawner {
            config: self,
            launched: AtomicUsize::new(0),
        })
    }
}

impl Default for GathererBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Starts task threads according to a [`GathererBuilder`].
#[derive(Debug)]
pub(crate) struct Spawner {
    config: GathererBuilder,
    launched: AtomicUsize,
}

impl Spawner {
    pub(crate) fn spawn<F>(&self, f: F) -> io::Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let n = self.launched.fetch_add(1, Ordering::Relaxed);
        let mut builder = thread::Builder::new().name(format!("{}-{n}", self.config.thread_name));
        if let Some(bytes) = self.config.stack_size {
            builder = builder.stack_size(bytes);
        }

        // Task threads are detached; completion is tracked by the gatherer, not by joining.
        builder.spawn(f).map(drop)
    }
}
