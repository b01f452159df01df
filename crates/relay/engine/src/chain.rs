//! Chain: the composed operation
//!
//! A [`Chain`] owns an immutable, non-empty list of stages. Every call to
//! [`Chain::invoke`] links a fresh set of wrappers over that list, from the
//! last stage back to the first, and starts the first one with the input.
//!
//! Each wrapper:
//! - on `Err(e)` reports `ChainError::Stage(e)` to the terminal directly,
//!   skipping every remaining stage
//! - on `Ok(v)` runs its stage with `v` and the next wrapper (or, for the
//!   last stage, the terminal adapter)
//!
//! # Fault boundary
//!
//! The call that starts the chain runs under `catch_unwind`. A panic
//! raised anywhere on that call stack (the first stage, or any later stage
//! entered synchronously from it) becomes `ChainError::Fault`.
//!
//! A panic raised by a stage that was entered from a continuation resumed
//! on another thread or task happens outside that call stack and is not
//! caught under [`FaultBoundary::Initial`]. It unwinds that thread or task
//! and the invocation never settles. [`FaultBoundary::EveryStage`] also
//! wraps each stage entry, which catches those panics too; panics inside a
//! stage's own spawned work stay out of reach in either mode.
//!
//! A fault records the stage that was running on the thread that panicked.

use crate::terminal::TerminalSlot;
use relay_types::{
    BuildError, ChainConfig, ChainError, ChainResult, Continuation, FaultBoundary, InvocationId,
    Stage,
};
use std::cell::Cell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::oneshot;

thread_local! {
    // Innermost stage running on this thread. Left in place when a stage
    // unwinds, so the boundary that catches the panic can read it.
    static CURRENT_STAGE: Cell<Option<usize>> = const { Cell::new(None) };
}

/// Shared, type-erased stage
pub type SharedStage<T, E> = Arc<dyn Stage<T, E>>;

/// A reusable composition of stages
pub struct Chain<T, E> {
    stages: Arc<[SharedStage<T, E>]>,
    config: Arc<ChainConfig>,
}

impl<T, E> Clone for Chain<T, E> {
    fn clone(&self) -> Self {
        Self {
            stages: Arc::clone(&self.stages),
            config: Arc::clone(&self.config),
        }
    }
}

impl<T, E> fmt::Debug for Chain<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("name", &self.config.name)
            .field("stages", &self.stages.len())
            .field("fault_boundary", &self.config.fault_boundary)
            .finish()
    }
}

impl<T, E> Chain<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Compose `stages` in execution order with the default configuration
    pub fn from_stages(stages: Vec<SharedStage<T, E>>) -> Result<Self, BuildError> {
        Self::with_config(stages, ChainConfig::default())
    }

    /// Compose `stages` in execution order
    pub fn with_config(
        stages: Vec<SharedStage<T, E>>,
        config: ChainConfig,
    ) -> Result<Self, BuildError> {
        if stages.is_empty() {
            return Err(BuildError::NoStages);
        }

        tracing::debug!(
            chain = %config.name,
            stages = stages.len(),
            fault_boundary = ?config.fault_boundary,
            "chain built"
        );

        Ok(Self {
            stages: stages.into(),
            config: Arc::new(config),
        })
    }

    /// Number of stages
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Always false; a chain holds at least one stage
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Run the chain on `input`, reporting the outcome to `terminal`.
    ///
    /// `terminal` is invoked at most once. It is invoked exactly once
    /// unless some stage never resumes its continuation, or a stage
    /// entered outside the fault boundary panics.
    pub fn invoke<F>(&self, input: T, terminal: F)
    where
        F: FnOnce(ChainResult<T, E>) + Send + 'static,
    {
        let invocation = InvocationId::generate();
        let span = tracing::debug_span!("chain", chain = %self.config.name, invocation = %invocation);
        let _entered = span.enter();

        tracing::debug!(stages = self.stages.len(), "chain invoked");

        let slot = TerminalSlot::new(terminal, self.config.name.clone(), invocation);
        let head = self.link(&slot);

        let outer = CURRENT_STAGE.replace(None);
        let started = panic::catch_unwind(AssertUnwindSafe(move || head.resume(Ok(input))));
        let failed_at = CURRENT_STAGE.replace(outer);

        if let Err(payload) = started {
            slot.deliver_fault(payload, failed_at);
        }
    }

    /// Run the chain and await its outcome.
    ///
    /// Resolves to [`ChainError::Abandoned`] if every continuation of the
    /// invocation is dropped without the terminal firing, e.g. when a
    /// stage's spawned task panics.
    pub async fn invoke_async(&self, input: T) -> ChainResult<T, E> {
        let (tx, rx) = oneshot::channel();
        self.invoke(input, move |outcome| {
            // Receiver gone means the caller stopped waiting.
            let _ = tx.send(outcome);
        });
        rx.await.unwrap_or(Err(ChainError::Abandoned))
    }

    /// Build this invocation's wrappers, last stage first.
    ///
    /// Every wrapper owns the continuation that follows it; nothing is
    /// rebound after construction.
    fn link(&self, slot: &TerminalSlot<T, E>) -> Continuation<T, E> {
        let last = {
            let slot = slot.clone();
            Continuation::new(move |outcome: Result<T, E>| {
                if slot.fire(outcome.map_err(ChainError::Stage)).is_err() {
                    tracing::warn!(
                        chain = %slot.chain(),
                        invocation = %slot.invocation(),
                        "outcome arrived after the chain settled; dropped"
                    );
                }
            })
        };

        self.stages
            .iter()
            .enumerate()
            .rev()
            .fold(last, |next, (index, stage)| {
                wrap(
                    Arc::clone(stage),
                    index,
                    next,
                    slot.clone(),
                    Arc::clone(&self.config),
                )
            })
    }
}

/// Wrapper continuation for the stage at `index`
fn wrap<T, E>(
    stage: SharedStage<T, E>,
    index: usize,
    next: Continuation<T, E>,
    slot: TerminalSlot<T, E>,
    config: Arc<ChainConfig>,
) -> Continuation<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    Continuation::new(move |outcome: Result<T, E>| {
        let value = match outcome {
            Ok(value) => value,
            Err(error) => {
                tracing::debug!(
                    chain = %slot.chain(),
                    invocation = %slot.invocation(),
                    skipped_from = index,
                    "stage failed; short-circuiting"
                );
                if slot.fire(Err(ChainError::Stage(error))).is_err() {
                    tracing::warn!(
                        chain = %slot.chain(),
                        invocation = %slot.invocation(),
                        "error arrived after the chain settled; dropped"
                    );
                }
                return;
            }
        };

        // A caught fault settles the chain while a stage may still hold
        // its continuation; nothing runs after that.
        if slot.is_settled() {
            tracing::debug!(
                chain = %slot.chain(),
                invocation = %slot.invocation(),
                stage = index,
                "chain already settled; stage skipped"
            );
            return;
        }

        if config.trace_stages {
            tracing::trace!(
                chain = %slot.chain(),
                invocation = %slot.invocation(),
                stage = index,
                name = stage.name().unwrap_or("-"),
                "entering stage"
            );
        }

        let outer = CURRENT_STAGE.replace(Some(index));
        match config.fault_boundary {
            FaultBoundary::Initial => stage.run(value, next),
            FaultBoundary::EveryStage => {
                let ran = panic::catch_unwind(AssertUnwindSafe(|| stage.run(value, next)));
                if let Err(payload) = ran {
                    CURRENT_STAGE.set(outer);
                    slot.deliver_fault(payload, Some(index));
                    return;
                }
            }
        }
        CURRENT_STAGE.set(outer);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;

    fn stage<F>(f: F) -> SharedStage<String, String>
    where
        F: Fn(String, Continuation<String, String>) + Send + Sync + 'static,
    {
        Arc::new(f)
    }

    fn append(suffix: &'static str) -> SharedStage<String, String> {
        stage(move |input, next| next.succeed(input + suffix))
    }

    fn run_sync(
        chain: &Chain<String, String>,
        input: &str,
    ) -> ChainResult<String, String> {
        let (tx, rx) = mpsc::channel();
        chain.invoke(input.to_string(), move |outcome| tx.send(outcome).unwrap());
        rx.recv().unwrap()
    }

    #[test]
    fn test_empty_chain_rejected() {
        let result = Chain::<String, String>::from_stages(vec![]);
        assert_eq!(result.unwrap_err(), BuildError::NoStages);
    }

    #[test]
    fn test_single_stage() {
        let chain = Chain::from_stages(vec![append("test")]).unwrap();
        assert_eq!(run_sync(&chain, "test").unwrap(), "testtest");
        assert_eq!(chain.len(), 1);
        assert!(!chain.is_empty());
    }

    #[test]
    fn test_stages_run_in_declared_order() {
        let chain = Chain::from_stages(vec![
            append("test1"),
            append("test2"),
            append("test3"),
            append("test4"),
        ])
        .unwrap();

        assert_eq!(run_sync(&chain, "test").unwrap(), "testtest1test2test3test4");
    }

    #[test]
    fn test_error_short_circuits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = |calls: &Arc<AtomicUsize>, fail: bool| -> SharedStage<String, String> {
            let calls = Arc::clone(calls);
            stage(move |input, next| {
                calls.fetch_add(1, Ordering::SeqCst);
                if fail {
                    next.fail("test error".to_string());
                } else {
                    next.succeed(input + "!");
                }
            })
        };

        let chain = Chain::from_stages(vec![
            counted(&calls, false),
            counted(&calls, true),
            counted(&calls, false),
        ])
        .unwrap();

        let err = run_sync(&chain, "test").unwrap_err();
        assert_eq!(err.stage_error().map(String::as_str), Some("test error"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_synchronous_panic_caught() {
        let reached = Arc::new(AtomicUsize::new(0));
        let after = Arc::clone(&reached);

        let chain = Chain::from_stages(vec![
            append("test1"),
            stage(|_, _| panic!("test error")),
            stage(move |input, next| {
                after.fetch_add(1, Ordering::SeqCst);
                next.succeed(input);
            }),
        ])
        .unwrap();

        match run_sync(&chain, "test") {
            Err(ChainError::Fault(fault)) => {
                assert_eq!(fault.message(), "test error");
                assert_eq!(fault.stage(), Some(1));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(reached.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_panic_after_resume_is_not_reported_twice() {
        let chain = Chain::from_stages(vec![stage(|input, next| {
            next.succeed(input);
            panic!("too late");
        })])
        .unwrap();

        let (tx, rx) = mpsc::channel();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            chain.invoke("x".to_string(), move |outcome| tx.send(outcome).unwrap());
        }));

        assert!(result.is_err());
        assert_eq!(rx.recv().unwrap().unwrap(), "x");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_clones_share_stages() {
        let chain = Chain::from_stages(vec![append("a"), append("b")]).unwrap();
        let copy = chain.clone();
        assert!(Arc::ptr_eq(&chain.stages, &copy.stages));
        assert_eq!(run_sync(&copy, "").unwrap(), "ab");
    }

    #[test]
    fn test_config_is_kept() {
        let config = ChainConfig {
            name: "ingest".into(),
            fault_boundary: FaultBoundary::EveryStage,
            trace_stages: true,
        };
        let chain = Chain::with_config(vec![append("!")], config.clone()).unwrap();
        assert_eq!(chain.config(), &config);
        assert_eq!(chain.name(), "ingest");
        assert_eq!(run_sync(&chain, "hi").unwrap(), "hi!");
    }
}
