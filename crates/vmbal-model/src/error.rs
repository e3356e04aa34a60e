//! Model pipeline error types.

use thiserror::Error;

use vmbal_core::{SolveStatus, ValidationError};

/// Errors that can occur while optimizing a rebalancing problem.
///
/// An infeasible or unsolved model is not an error; it comes back as a
/// plan with the corresponding status.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("projection error: {0}")]
    Projection(#[from] ProjectionError),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// The engine's answer does not fit the model it was given.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectionError {
    #[error("engine reported {0} without a solution")]
    MissingSolution(SolveStatus),

    #[error("engine returned {got} values for {expected} variables")]
    ValueCount { expected: usize, got: usize },

    #[error("no host selected for vm {0}")]
    UnassignedVm(String),
}

pub type ModelResult<T> = Result<T, ModelError>;
