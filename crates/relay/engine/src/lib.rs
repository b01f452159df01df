//! Relay chain engine
//!
//! Composes an ordered list of stages into one reusable [`Chain`]. Each
//! invocation threads a value through the stages in order, stops at the
//! first error, and reports the final value or that error to a terminal
//! continuation exactly once.
//!
//! # Key Principle
//!
//! **The engine links stages, it never inspects what they carry.**
//!
//! Stages may finish synchronously or resume their continuation later from
//! another thread or task; the chain only guarantees ordering, the error
//! short-circuit, and conversion of panics raised inside its fault
//! boundary (see [`chain`] for where that boundary ends).
//!
//! # Example
//!
//! ```rust
//! use relay_engine::ChainBuilder;
//! use relay_types::Continuation;
//!
//! let chain = ChainBuilder::<String, String>::new()
//!     .then(|s: String, next: Continuation<String, String>| next.succeed(s + "t1"))
//!     .then(|s: String, next: Continuation<String, String>| next.succeed(s + "t2"))
//!     .then(|s: String, next: Continuation<String, String>| next.succeed(s + "t3"))
//!     .build()
//!     .unwrap();
//!
//! chain.invoke("x".to_string(), |outcome| {
//!     assert_eq!(outcome.unwrap(), "xt1t2t3");
//! });
//! ```

#![deny(unsafe_code)]

pub mod adapters;
pub mod builder;
pub mod chain;
mod terminal;

pub use adapters::{blocking, deferred};
pub use builder::{compose, ChainBuilder};
pub use chain::{Chain, SharedStage};

pub use relay_types::{
    BuildError, ChainConfig, ChainError, ChainResult, Continuation, FaultBoundary, Stage,
    StageFault,
};
