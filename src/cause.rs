use std::{error::Error as StdError, fmt, ops::Deref, sync::Arc};

use crate::AccumulatedError;

/// A single error recorded by a [`Gatherer`], shared rather than copied.
///
/// Cloning a `Cause` clones the handle, not the error: every clone refers to the same underlying
/// value, which [`Cause::ptr_eq`] can verify. This is what lets [`causes`] hand back exactly the
/// errors that were added.
///
/// Any `Error + Send + Sync + 'static` converts into a `Cause`:
///
/// ```
/// # use error_gatherer::Cause;
/// use std::io;
///
/// let cause = Cause::from(io::Error::new(io::ErrorKind::Other, "disk on fire"));
/// assert_eq!(cause.to_string(), "disk on fire");
/// assert!(cause.is::<io::Error>());
/// ```
///
/// [`Gatherer`]: crate::Gatherer
#[derive(Clone)]
pub struct Cause(Arc<dyn StdError + Send + Sync + 'static>);

impl Cause {
    /// Converts an already boxed error into a `Cause` without wrapping it a second time.
    ///
    /// ```
    /// # use error_gatherer::Cause;
    /// let boxed: Box<dyn std::error::Error + Send + Sync> = "bad input".into();
    /// let cause = Cause::from_boxed(boxed);
    /// assert_eq!(cause.to_string(), "bad input");
    /// ```
    pub fn from_boxed(err: Box<dyn StdError + Send + Sync + 'static>) -> Self {
        Cause(Arc::from(err))
    }

    /// Returns `true` if both handles refer to the same error value.
    ///
    /// ```
    /// # use error_gatherer::Cause;
    /// # use std::fmt;
    /// # #[derive(Debug)] struct Oops;
    /// # impl fmt::Display for Oops {
    /// #     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str("oops") }
    /// # }
    /// # impl std::error::Error for Oops {}
    /// let a = Cause::from(Oops);
    /// let b = a.clone();
    /// let c = Cause::from(Oops);
    ///
    /// assert!(Cause::ptr_eq(&a, &b));
    /// assert!(!Cause::ptr_eq(&a, &c));
    /// ```
    pub fn ptr_eq(this: &Cause, other: &Cause) -> bool {
        Arc::ptr_eq(&this.0, &other.0)
    }

    /// Attempts to view the underlying error as a concrete type.
    pub fn downcast_ref<T: StdError + 'static>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// Whether the underlying error is of type `T`.
    pub fn is<T: StdError + 'static>(&self) -> bool {
        self.0.is::<T>()
    }
}

impl Deref for Cause {
    type Target = dyn StdError + Send + Sync + 'static;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

impl fmt::Debug for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

// `Cause` must not implement `Error`: this impl would then overlap with `From<T> for T`.
impl<E> From<E> for Cause
where
    E: StdError + Send + Sync + 'static,
{
    fn from(err: E) -> Self {
        Cause(Arc::new(err))
    }
}

/// Unpacks an error into the individual causes it stands for.
///
/// - `None` has no causes, and yields an empty `Vec`.
/// - An [`AccumulatedError`] yields its causes, in the order they were added. These are the same
///   values which were added, not copies.
/// - Any other error yields itself as the only cause.
///
/// ```
/// # use error_gatherer::{causes, Cause, Gatherer, Traced};
/// let g = Gatherer::new();
/// assert!(causes(None).is_empty());
///
/// g.add(Traced::new("1"));
/// g.add(Traced::new("2"));
///
/// let err = g.err().map(Cause::from);
/// let all = causes(err.as_ref());
/// assert_eq!(all.len(), 2);
/// assert_eq!(all[1].to_string(), "2");
///
/// let plain = Cause::from(Traced::new("normal"));
/// let only = causes(Some(&plain));
/// assert!(Cause::ptr_eq(&only[0], &plain));
/// ```
pub fn causes(err: Option<&Cause>) -> Vec<Cause> {
    let Some(err) = err else {
        return Vec::new();
    };

    match err.downcast_ref::<AccumulatedError>() {
        Some(accumulated) => accumulated.causes().to_vec(),
        None => vec![err.clone()],
    }
}
