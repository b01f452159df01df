//! Terminal slot: holds the caller's terminal continuation for one invocation
//!
//! Every wrapper of an invocation shares the slot. The first outcome
//! delivered takes the terminal out; later deliveries are handed back to
//! the caller so it can decide what to do with them.

use relay_types::{ChainError, ChainResult, InvocationId, StageFault};
use std::any::Any;
use std::panic;
use std::sync::{Arc, Mutex, PoisonError};

type Terminal<T, E> = Box<dyn FnOnce(ChainResult<T, E>) + Send + 'static>;

pub(crate) struct TerminalSlot<T, E> {
    inner: Arc<SlotInner<T, E>>,
}

struct SlotInner<T, E> {
    terminal: Mutex<Option<Terminal<T, E>>>,
    chain: String,
    invocation: InvocationId,
}

impl<T, E> Clone for TerminalSlot<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, E> TerminalSlot<T, E> {
    pub(crate) fn new<F>(terminal: F, chain: String, invocation: InvocationId) -> Self
    where
        F: FnOnce(ChainResult<T, E>) + Send + 'static,
    {
        Self {
            inner: Arc::new(SlotInner {
                terminal: Mutex::new(Some(Box::new(terminal))),
                chain,
                invocation,
            }),
        }
    }

    /// Deliver an outcome to the terminal continuation.
    ///
    /// Returns the outcome back if the terminal already fired.
    pub(crate) fn fire(&self, outcome: ChainResult<T, E>) -> Result<(), ChainResult<T, E>> {
        let terminal = self
            .inner
            .terminal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match terminal {
            Some(terminal) => {
                tracing::debug!(
                    chain = %self.inner.chain,
                    invocation = %self.inner.invocation,
                    success = outcome.is_ok(),
                    "chain settled"
                );
                terminal(outcome);
                Ok(())
            }
            None => Err(outcome),
        }
    }

    /// Whether the terminal continuation has already fired
    pub(crate) fn is_settled(&self) -> bool {
        self.inner
            .terminal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Convert a panic caught while `stage` was running into a terminal
    /// error.
    ///
    /// If the terminal already fired, the panic is resumed instead so the
    /// terminal never sees a second outcome.
    pub(crate) fn deliver_fault(
        &self,
        payload: Box<dyn Any + Send + 'static>,
        stage: Option<usize>,
    ) {
        let fault = StageFault::from_panic(payload, stage);

        if let Err(Err(ChainError::Fault(fault))) = self.fire(Err(ChainError::Fault(fault))) {
            tracing::warn!(
                chain = %self.inner.chain,
                invocation = %self.inner.invocation,
                stage = ?fault.stage(),
                "fault raised after the chain settled; resuming panic"
            );
            panic::resume_unwind(fault.into_payload());
        }

        tracing::warn!(
            chain = %self.inner.chain,
            invocation = %self.inner.invocation,
            stage = ?stage,
            "stage fault converted to chain error"
        );
    }

    pub(crate) fn chain(&self) -> &str {
        &self.inner.chain
    }

    pub(crate) fn invocation(&self) -> InvocationId {
        self.inner.invocation
    }
}

impl<T, E> Drop for SlotInner<T, E> {
    fn drop(&mut self) {
        let pending = self
            .terminal
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some();

        if pending {
            tracing::warn!(
                chain = %self.chain,
                invocation = %self.invocation,
                "chain abandoned before reaching a terminal state"
            );
        }
    }
}
