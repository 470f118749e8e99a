use std::{backtrace::Backtrace, error::Error as StdError, fmt};

use crate::AccumulatedError;

/// An error which remembers where it was created.
///
/// A `Traced` always captures a [`Backtrace`] when it is constructed, regardless of the
/// `RUST_BACKTRACE` environment variable. Errors without such a trace are still perfectly valid
/// causes; they just don't contribute to [`AccumulatedError::stack_trace`].
///
/// ```
/// # use error_gatherer::Traced;
/// let err = Traced::new("connection reset");
/// assert_eq!(err.to_string(), "connection reset");
/// println!("created at:\n{}", err.backtrace());
/// ```
#[derive(Debug)]
pub struct Traced {
    repr: Repr,
    backtrace: Backtrace,
}

#[derive(Debug)]
enum Repr {
    Message(String),
    Wrapped(Box<dyn StdError + Send + Sync + 'static>),
}

impl Traced {
    /// Creates a new error with a message, capturing the current stack.
    pub fn new(message: impl Into<String>) -> Self {
        Traced {
            repr: Repr::Message(message.into()),
            backtrace: Backtrace::force_capture(),
        }
    }

    /// Annotates an existing error with the current stack.
    ///
    /// The wrapped error keeps its own message, and is reported as the
    /// [`source`](StdError::source) of the `Traced`.
    ///
    /// ```
    /// # use error_gatherer::Traced;
    /// # use std::error::Error;
    /// use std::io;
    ///
    /// let err = Traced::wrap(io::Error::new(io::ErrorKind::NotFound, "no such peer"));
    /// assert_eq!(err.to_string(), "no such peer");
    /// assert!(err.source().unwrap().is::<io::Error>());
    /// ```
    pub fn wrap<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Traced {
            repr: Repr::Wrapped(Box::new(err)),
            backtrace: Backtrace::force_capture(),
        }
    }

    /// The stack captured when this error was created.
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }
}

impl fmt::Display for Traced {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            Repr::Message(message) => f.write_str(message),
            Repr::Wrapped(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl StdError for Traced {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.repr {
            Repr::Message(_) => None,
            Repr::Wrapped(err) => Some(&**err),
        }
    }
}

/// Finds the first stack trace along `err`'s source chain, looking inside aggregates.
pub(crate) fn find_trace<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a Backtrace> {
    let mut next = Some(err);

    while let Some(err) = next {
        if let Some(traced) = err.downcast_ref::<Traced>() {
            return Some(traced.backtrace());
        }
        if let Some(accumulated) = err.downcast_ref::<AccumulatedError>() {
            return accumulated.stack_trace();
        }
        next = err.source();
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn untraced_errors_have_no_trace() {
        let err = io::Error::new(io::ErrorKind::Other, "plain");
        assert!(find_trace(&err).is_none());
    }

    #[test]
    fn trace_is_found_below_the_top_of_the_chain() {
        #[derive(Debug)]
        struct Outer(Traced);

        impl fmt::Display for Outer {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "outer: {}", self.0)
            }
        }

        impl StdError for Outer {
            fn source(&self) -> Option<&(dyn StdError + 'static)> {
                Some(&self.0)
            }
        }

        let err = Outer(Traced::new("inner"));
        let found = find_trace(&err).unwrap();
        assert!(std::ptr::eq(found, err.0.backtrace()));
    }
}
