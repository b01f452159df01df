//! Single-use continuations
//!
//! A continuation is "what happens next" after a stage finishes. It is
//! taken by value when resumed, so the compiler rejects a stage that
//! tries to report twice.

use std::fmt;

type Resume<T, E> = Box<dyn FnOnce(Result<T, E>) + Send + 'static>;

/// Continuation handed to a stage.
///
/// `Ok(value)` hands `value` to whatever follows; `Err(error)` stops the
/// chain and reports `error` to the terminal continuation.
pub struct Continuation<T, E> {
    resume: Resume<T, E>,
}

impl<T, E> Continuation<T, E> {
    /// Wrap a callback as a continuation
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(Result<T, E>) + Send + 'static,
    {
        Self {
            resume: Box::new(f),
        }
    }

    /// Resume with an outcome
    pub fn resume(self, outcome: Result<T, E>) {
        (self.resume)(outcome)
    }

    /// Resume with a success value
    pub fn succeed(self, value: T) {
        self.resume(Ok(value))
    }

    /// Resume with an error
    pub fn fail(self, error: E) {
        self.resume(Err(error))
    }
}

impl<T, E> fmt::Debug for Continuation<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Continuation").finish_non_exhaustive()
    }
}
