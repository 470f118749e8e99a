#![allow(dead_code)]

use std::{thread, time::Duration};

use crossbeam_channel::RecvTimeoutError;
use thiserror::Error;

/// Runs `f` on another thread and asserts that it finishes within `timeout`, returning its
/// result.
#[track_caller]
pub fn assert_terminates<T, F>(timeout: Duration, f: F) -> T
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = crossbeam_channel::bounded(1);
    thread::spawn(move || {
        let _ = tx.send(f());
    });

    match rx.recv_timeout(timeout) {
        Ok(value) => value,
        Err(RecvTimeoutError::Timeout) => panic!("did not terminate within {timeout:?}"),
        Err(RecvTimeoutError::Disconnected) => panic!("panicked instead of terminating"),
    }
}

/// Runs `f` on another thread and asserts that it is still running after `timeout`. The thread
/// is left to finish on its own.
#[track_caller]
pub fn assert_not_terminates<F>(timeout: Duration, f: F)
where
    F: FnOnce() + Send + 'static,
{
    let (tx, rx) = crossbeam_channel::bounded(1);
    thread::spawn(move || {
        f();
        let _ = tx.send(());
    });

    match rx.recv_timeout(timeout) {
        Err(RecvTimeoutError::Timeout) => (),
        Ok(()) => panic!("terminated within {timeout:?}"),
        Err(RecvTimeoutError::Disconnected) => panic!("panicked within {timeout:?}"),
    }
}

/// A minimal error without a stack trace, like one a caller would define.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct Plain(pub String);

impl Plain {
    pub fn new(msg: impl Into<String>) -> Self {
        Plain(msg.into())
    }
}
