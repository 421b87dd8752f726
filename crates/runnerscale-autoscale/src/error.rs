//! Autoscaler error types.

use thiserror::Error;

use runnerscale_provider::ProviderError;

/// Errors that abort one fleet's pass. History is never touched on error.
#[derive(Debug, Error)]
pub enum AutoscaleError {
    /// Configuration defect. The message is meant for the operator as-is.
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// A resolved constraint set that cannot be satisfied.
    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl AutoscaleError {
    /// Whether a later pass may succeed without operator action.
    pub fn is_retriable(&self) -> bool {
        match self {
            AutoscaleError::Provider(e) => e.is_retriable(),
            AutoscaleError::Validation(_) | AutoscaleError::Invariant(_) => false,
        }
    }
}

pub type AutoscaleResult<T> = Result<T, AutoscaleError>;
