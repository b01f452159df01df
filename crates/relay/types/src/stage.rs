//! Stages: the units a chain is built from

use crate::Continuation;

/// A continuation-accepting unit.
///
/// A stage receives the current value and the continuation for "what
/// happens next". It must resume that continuation exactly once, either
/// before returning or later from another thread or task. It may panic
/// instead; whether that panic is converted into a chain error depends on
/// the chain's [`FaultBoundary`](crate::FaultBoundary).
///
/// Any `Fn(T, Continuation<T, E>)` closure is a stage.
pub trait Stage<T, E>: Send + Sync + 'static {
    /// Run the stage on `input`
    fn run(&self, input: T, next: Continuation<T, E>);

    /// Optional label used in trace output
    fn name(&self) -> Option<&str> {
        None
    }
}

impl<T, E, F> Stage<T, E> for F
where
    F: Fn(T, Continuation<T, E>) + Send + Sync + 'static,
{
    fn run(&self, input: T, next: Continuation<T, E>) {
        self(input, next)
    }
}

/// A stage with a label
#[derive(Debug, Clone)]
pub struct Named<S> {
    name: String,
    inner: S,
}

impl<S> Named<S> {
    pub fn new(name: impl Into<String>, inner: S) -> Self {
        Self {
            name: name.into(),
            inner,
        }
    }
}

impl<T, E, S> Stage<T, E> for Named<S>
where
    S: Stage<T, E>,
{
    fn run(&self, input: T, next: Continuation<T, E>) {
        self.inner.run(input, next)
    }

    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }
}
