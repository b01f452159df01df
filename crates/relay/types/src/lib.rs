//! Relay domain types
//!
//! A relay chain threads one value through an ordered list of stages.
//! Every stage receives the current value and a single-use
//! [`Continuation`], and must eventually resume that continuation with
//! either the next value or an error. The engine crate links stages
//! together; this crate only defines the vocabulary they share.
//!
//! # Key Types
//!
//! - [`Stage`] — a continuation-accepting unit, implemented for any
//!   `Fn(T, Continuation<T, E>)` closure
//! - [`Continuation`] — consumed on resume, so it fires at most once
//! - [`ChainError`] — what a terminal continuation sees on failure
//! - [`ChainConfig`] — per-chain settings (name, fault boundary, tracing)

#![deny(unsafe_code)]

pub mod config;
pub mod continuation;
pub mod error;
pub mod ids;
pub mod stage;

pub use config::{ChainConfig, ConfigError, FaultBoundary};
pub use continuation::Continuation;
pub use error::{BuildError, ChainError, ChainResult, StageFault};
pub use ids::InvocationId;
pub use stage::{Named, Stage};
