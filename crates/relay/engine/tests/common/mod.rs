//! Shared helpers for relay-engine integration tests

#![allow(dead_code)]

use relay_engine::{ChainResult, Continuation, SharedStage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use tracing_subscriber::EnvFilter;

pub type TextStage = SharedStage<String, String>;

/// Install a test subscriber once; respects RUST_LOG
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn stage<F>(f: F) -> TextStage
where
    F: Fn(String, Continuation<String, String>) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Appends `suffix` and succeeds
pub fn append(suffix: impl Into<String>) -> TextStage {
    let suffix = suffix.into();
    stage(move |input, next| next.succeed(input + &suffix))
}

/// Counts its runs, then appends `suffix`
pub fn counted_append(calls: &Arc<AtomicUsize>, suffix: impl Into<String>) -> TextStage {
    let calls = Arc::clone(calls);
    let suffix = suffix.into();
    stage(move |input, next| {
        calls.fetch_add(1, Ordering::SeqCst);
        next.succeed(input + &suffix);
    })
}

/// Counts its runs, then fails with `error`
pub fn counted_failure(calls: &Arc<AtomicUsize>, error: impl Into<String>) -> TextStage {
    let calls = Arc::clone(calls);
    let error = error.into();
    stage(move |_, next| {
        calls.fetch_add(1, Ordering::SeqCst);
        next.fail(error.clone());
    })
}

/// Counts its runs, then panics with `message`
pub fn counted_panic(calls: &Arc<AtomicUsize>, message: impl Into<String>) -> TextStage {
    let calls = Arc::clone(calls);
    let message = message.into();
    stage(move |_, _| {
        calls.fetch_add(1, Ordering::SeqCst);
        panic!("{}", message);
    })
}

/// Terminal continuation that forwards into a channel, plus its receiver
pub fn capture() -> (
    impl FnOnce(ChainResult<String, String>) + Send + 'static,
    mpsc::Receiver<ChainResult<String, String>>,
) {
    let (tx, rx) = mpsc::channel();
    let terminal = move |outcome: ChainResult<String, String>| {
        tx.send(outcome).unwrap();
    };
    (terminal, rx)
}
