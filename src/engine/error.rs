use thiserror::Error;

use crate::dom::selector::SelectorError;
use crate::registry::error::ConfigError;

#[derive(Debug, Error)]
pub enum EngineError {
    /// An operation ran before `Engine::initialize`. This is a caller bug and
    /// the only error that crosses component boundaries.
    #[error("{operation} called before the engine was initialized")]
    Uninitialized { operation: &'static str },

    #[error(transparent)]
    Selector(#[from] SelectorError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl EngineError {
    pub fn is_uninitialized(&self) -> bool {
        matches!(self, EngineError::Uninitialized { .. })
    }
}
