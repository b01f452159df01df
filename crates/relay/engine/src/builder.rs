//! Chain builder

use crate::chain::{Chain, SharedStage};
use relay_types::{BuildError, ChainConfig, FaultBoundary, Named, Stage};
use std::sync::Arc;

/// Collects stages in execution order and produces a [`Chain`]
pub struct ChainBuilder<T, E> {
    stages: Vec<SharedStage<T, E>>,
    config: ChainConfig,
}

impl<T, E> ChainBuilder<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            config: ChainConfig::default(),
        }
    }

    /// Append a stage
    pub fn then<S>(mut self, stage: S) -> Self
    where
        S: Stage<T, E>,
    {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Append a stage with a label for trace output
    pub fn then_named<S>(self, name: impl Into<String>, stage: S) -> Self
    where
        S: Stage<T, E>,
    {
        self.then(Named::new(name, stage))
    }

    /// Append a stage that is already shared with other chains
    pub fn then_shared(mut self, stage: SharedStage<T, E>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn with_fault_boundary(mut self, boundary: FaultBoundary) -> Self {
        self.config.fault_boundary = boundary;
        self
    }

    pub fn trace_stages(mut self, enabled: bool) -> Self {
        self.config.trace_stages = enabled;
        self
    }

    /// Replace the whole configuration
    pub fn with_config(mut self, config: ChainConfig) -> Self {
        self.config = config;
        self
    }

    /// Number of stages collected so far
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Finish the chain; fails if no stage was added
    pub fn build(self) -> Result<Chain<T, E>, BuildError> {
        Chain::with_config(self.stages, self.config)
    }
}

impl<T, E> Default for ChainBuilder<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Compose `stages` in execution order with the default configuration
pub fn compose<T, E>(stages: Vec<SharedStage<T, E>>) -> Result<Chain<T, E>, BuildError>
where
    T: Send + 'static,
    E: Send + 'static,
{
    Chain::from_stages(stages)
}
