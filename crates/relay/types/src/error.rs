//! Error types for relay chains

use std::any::Any;
use thiserror::Error;

/// Errors raised while building a chain
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("invalid argument: must supply at least one stage")]
    NoStages,
}

/// Outcome delivered to a terminal continuation
pub type ChainResult<T, E> = Result<T, ChainError<E>>;

/// Failure reported to a terminal continuation
#[derive(Debug, Error)]
pub enum ChainError<E> {
    /// A stage resumed its continuation with this error
    #[error("stage error: {0}")]
    Stage(E),

    /// A stage panicked inside the fault boundary
    #[error(transparent)]
    Fault(StageFault),

    /// The terminal continuation was dropped without being invoked.
    ///
    /// Only the async bridge reports this; callback terminals simply
    /// never fire.
    #[error("chain abandoned before reaching a terminal state")]
    Abandoned,
}

impl<E> ChainError<E> {
    /// The stage error, if this is one
    pub fn stage_error(&self) -> Option<&E> {
        match self {
            ChainError::Stage(e) => Some(e),
            _ => None,
        }
    }

    pub fn into_stage_error(self) -> Option<E> {
        match self {
            ChainError::Stage(e) => Some(e),
            _ => None,
        }
    }

    /// The caught fault, if this is one
    pub fn as_fault(&self) -> Option<&StageFault> {
        match self {
            ChainError::Fault(f) => Some(f),
            _ => None,
        }
    }

    pub fn is_abandoned(&self) -> bool {
        matches!(self, ChainError::Abandoned)
    }
}

/// A panic caught by the fault boundary.
///
/// Keeps the original panic payload so callers can downcast it back to
/// whatever the stage panicked with.
#[derive(Debug, Error)]
#[error("stage fault: {message}")]
pub struct StageFault {
    message: String,
    stage: Option<usize>,
    payload: Box<dyn Any + Send + 'static>,
}

impl StageFault {
    /// Build a fault from a payload returned by `catch_unwind`.
    ///
    /// `stage` is the zero-based index of the stage that was running on the
    /// panicking thread.
    pub fn from_panic(payload: Box<dyn Any + Send + 'static>, stage: Option<usize>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };

        Self {
            message,
            stage,
            payload,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn stage(&self) -> Option<usize> {
        self.stage
    }

    /// Downcast the original panic payload
    pub fn payload<P: Any>(&self) -> Option<&P> {
        self.payload.downcast_ref::<P>()
    }

    /// Recover the original panic payload, e.g. for `resume_unwind`
    pub fn into_payload(self) -> Box<dyn Any + Send + 'static> {
        self.payload
    }
}
