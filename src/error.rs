use std::{any::Any, io};

use thiserror::Error;

/// Errors the gatherer itself records on behalf of a task launched with [`Gatherer::go`].
///
/// These are ordinary causes: they count towards the aggregate and trigger the failure signal
/// just like an error returned by the task would.
///
/// [`Gatherer::go`]: crate::Gatherer::go
#[derive(Debug, Error)]
pub enum TaskError {
    /// The task panicked instead of returning.
    #[error("task panicked: {0}")]
    Panicked(String),

    /// No thread could be started for the task, so it never ran.
    #[error("failed to spawn task thread")]
    Spawn(#[source] io::Error),
}

impl TaskError {
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        TaskError::Panicked(panic_message(payload))
    }
}

pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic;

    #[test]
    fn panic_messages_are_kept() {
        let payload = panic::catch_unwind(|| panic!("boom {}", 7)).unwrap_err();
        assert_eq!(TaskError::from_panic(payload).to_string(), "task panicked: boom 7");

        let payload = panic::catch_unwind(|| panic!("static")).unwrap_err();
        assert_eq!(TaskError::from_panic(payload).to_string(), "task panicked: static");

        let payload = panic::catch_unwind(|| panic::panic_any(42_u8)).unwrap_err();
        assert_eq!(
            TaskError::from_panic(payload).to_string(),
            "task panicked: <non-string panic payload>"
        );
    }
}
