use std::{backtrace::Backtrace, error::Error as StdError, fmt};

use crate::{traced, Cause, ErrorCollector};

/// Every error a [`Gatherer`] had recorded at the moment it was asked for them.
///
/// An `AccumulatedError` is a snapshot: causes added to the gatherer afterwards do not show up in
/// an `AccumulatedError` which was already handed out. It always holds at least one cause, since a
/// gatherer with nothing recorded reports no error at all instead.
///
/// # Formatting
///
/// The [`Display`] output starts with a count, followed by each cause's own message on a
/// numbered line:
///
/// ```
/// # use error_gatherer::{Gatherer, Traced};
/// let g = Gatherer::new();
/// g.add(Traced::new("1"));
/// assert_eq!(g.err().unwrap().to_string(), "(1 error)\n1): 1");
///
/// g.add(Traced::new("2"));
/// assert_eq!(g.err().unwrap().to_string(), "(2 errors)\n1): 1\n2): 2");
/// ```
///
/// # Stack traces
///
/// See [`stack_trace`](AccumulatedError::stack_trace).
///
/// [`Gatherer`]: crate::Gatherer
/// [`Display`]: fmt::Display
#[derive(Debug, Clone)]
pub struct AccumulatedError {
    causes: Vec<Cause>,
}

impl AccumulatedError {
    pub(crate) fn new(causes: Vec<Cause>) -> Self {
        debug_assert!(!causes.is_empty(), "an AccumulatedError needs at least one cause");
        AccumulatedError { causes }
    }

    /// The recorded causes, in the order they were added.
    pub fn causes(&self) -> &[Cause] {
        &self.causes
    }

    /// Consumes this error and returns its causes, in the order they were added.
    pub fn into_causes(self) -> Vec<Cause> {
        self.causes
    }

    /// The stack trace of the first cause, in insertion order, which carries one.
    ///
    /// A cause carries a stack trace if it is a [`Traced`] error, wraps one somewhere along its
    /// [`source`](StdError::source) chain, or is itself an `AccumulatedError` with such a cause.
    /// Returns `None` if no cause carries a trace.
    ///
    /// ```
    /// # use error_gatherer::{Gatherer, Traced};
    /// # use std::io;
    /// let g = Gatherer::new();
    ///
    /// g.add(io::Error::new(io::ErrorKind::Other, "1"));
    /// assert!(g.err().unwrap().stack_trace().is_none());
    ///
    /// g.add(Traced::new("2"));
    /// assert!(g.err().unwrap().stack_trace().is_some());
    /// ```
    ///
    /// [`Traced`]: crate::Traced
    pub fn stack_trace(&self) -> Option<&Backtrace> {
        self.causes.iter().find_map(|cause| traced::find_trace(&**cause))
    }

    /// Moves every cause into an [`ErrorCollector`], one by one.
    ///
    /// Unlike adding the `AccumulatedError` itself, this keeps the causes flat: the collector
    /// sees the original errors rather than a nested aggregate.
    ///
    /// ```
    /// # use error_gatherer::{Gatherer, Traced};
    /// let inner = Gatherer::new();
    /// inner.add(Traced::new("a"));
    /// inner.add(Traced::new("b"));
    ///
    /// let outer = Gatherer::new();
    /// outer.add(Traced::new("c"));
    /// inner.err().unwrap().propagate(&outer);
    ///
    /// let err = outer.err().unwrap();
    /// assert_eq!(err.causes().len(), 3);
    /// assert_eq!(err.to_string(), "(3 errors)\n1): c\n2): a\n3): b");
    /// ```
    pub fn propagate(self, other: &impl ErrorCollector) {
        for cause in self.causes {
            other.push_error(cause);
        }
    }
}

impl fmt::Display for AccumulatedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.causes.len();
        write!(f, "({count} error{})", if count == 1 { "" } else { "s" })?;

        for (i, cause) in self.causes.iter().enumerate() {
            write!(f, "\n{}): {cause}", i + 1)?;
        }

        Ok(())
    }
}

impl StdError for AccumulatedError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.causes
            .first()
            .map(|cause| &**cause as &(dyn StdError + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Traced;

    fn plain(msg: &str) -> Cause {
        Cause::from_boxed(msg.into())
    }

    #[test]
    fn three_causes_are_numbered_from_one() {
        let err = AccumulatedError::new(vec![plain("x"), plain("y"), plain("z")]);
        assert_eq!(err.to_string(), "(3 errors)\n1): x\n2): y\n3): z");
    }

    #[test]
    fn multi_line_messages_are_kept_verbatim() {
        let err = AccumulatedError::new(vec![plain("first\nsecond")]);
        assert_eq!(err.to_string(), "(1 error)\n1): first\nsecond");
    }

    #[test]
    fn source_is_the_first_cause() {
        let first = plain("first");
        let err = AccumulatedError::new(vec![first, plain("second")]);
        assert_eq!(err.source().map(|s| s.to_string()).as_deref(), Some("first"));
    }

    #[test]
    fn stack_trace_comes_from_first_traced_cause() {
        let a = Cause::from(Traced::new("a"));
        let b = Cause::from(Traced::new("b"));
        let err = AccumulatedError::new(vec![plain("untraced"), a.clone(), b]);

        let expected = a.downcast_ref::<Traced>().map(Traced::backtrace);
        let actual = err.stack_trace();
        assert!(std::ptr::eq(actual.unwrap(), expected.unwrap()));
    }

    #[test]
    fn stack_trace_is_found_through_wrapped_errors() {
        let wrapped = Traced::wrap(std::io::Error::new(std::io::ErrorKind::Other, "io"));
        let outer = crate::TaskError::Spawn(std::io::Error::new(std::io::ErrorKind::Other, "x"));
        let err = AccumulatedError::new(vec![Cause::from(outer), Cause::from(wrapped)]);
        assert!(err.stack_trace().is_some());
    }

    #[test]
    fn stack_trace_is_found_in_nested_aggregates() {
        let inner = AccumulatedError::new(vec![plain("plain"), Cause::from(Traced::new("t"))]);
        let outer = AccumulatedError::new(vec![plain("other"), Cause::from(inner)]);
        assert!(outer.stack_trace().is_some());
    }
}
