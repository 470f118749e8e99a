use crate::Cause;

/// Something which accepts causes one at a time.
///
/// This generalizes methods like [`AccumulatedError::propagate`] which hand recorded causes over
/// to a different owner, so that an aggregate from one gatherer can feed another without being
/// nested inside it.
///
/// [`AccumulatedError::propagate`]: crate::AccumulatedError::propagate
pub trait ErrorCollector {
    /// Add a new cause to the collection.
    fn push_error(&self, error: Cause);
}

impl ErrorCollector for crate::Gatherer {
    fn push_error(&self, error: Cause) {
        self.add(error);
    }
}

impl ErrorCollector for parking_lot::Mutex<Vec<Cause>> {
    fn push_error(&self, error: Cause) {
        self.lock().push(error);
    }
}
