//! Adapters from plain functions and futures to stages

use relay_types::{Continuation, Stage};
use std::future::Future;

/// Stage that computes its outcome synchronously and resumes at once
pub fn blocking<T, E, F>(f: F) -> impl Stage<T, E>
where
    F: Fn(T) -> Result<T, E> + Send + Sync + 'static,
    T: 'static,
    E: 'static,
{
    move |input: T, next: Continuation<T, E>| next.resume(f(input))
}

/// Stage backed by a future.
///
/// The future is spawned on the current tokio runtime and the continuation
/// is resumed with its output, so everything after this stage runs on that
/// task. A panic inside the future unwinds the task, not the chain: the
/// invocation never settles.
///
/// # Panics
///
/// The stage panics when run outside a tokio runtime.
pub fn deferred<T, E, F, Fut>(f: F) -> impl Stage<T, E>
where
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    move |input: T, next: Continuation<T, E>| {
        let pending = f(input);
        tokio::spawn(async move {
            next.resume(pending.await);
        });
    }
}
