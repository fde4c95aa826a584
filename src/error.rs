//! Error type shared by all model operations.
//!
//! Engine-level rejections (invalid bounds, a resize the engine cannot honor, ...) are not
//! errors; they are reported as a `false` return value by the operation itself. Solve
//! outcomes such as [SolveStatus::Infeasible](crate::SolveStatus::Infeasible) are not errors
//! either.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    /// Wrong number of arguments for a host call.
    #[error("{0}")]
    Arity(String),
    /// Argument of the wrong kind for a host call.
    #[error("{0}")]
    Type(String),
    /// Mismatched sparse sequence lengths, duplicate or out-of-range indices.
    #[error("shape error: {0}")]
    Shape(String),
    /// The solver engine could not be created or could not allocate.
    #[error("allocation failed: {0}")]
    Allocation(String),
    #[error("model has been disposed")]
    UseAfterDispose,
    #[error("model is busy: a solve is in progress")]
    ModelBusy,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
    /// The engine failed while solving, or the solve worker died.
    #[error("solve failed: {0}")]
    Solve(String),
}

impl ModelError {
    /// Name of the error kind as exposed to a host application.
    pub fn kind(&self) -> &'static str {
        match self {
            ModelError::Arity(_)        => "ArityError",
            ModelError::Type(_)         => "TypeError",
            ModelError::Shape(_)        => "ShapeError",
            ModelError::Allocation(_)   => "AllocationError",
            ModelError::UseAfterDispose => "UseAfterDisposeError",
            ModelError::ModelBusy       => "ModelBusyError",
            ModelError::Io(_)           => "IOError",
            ModelError::Parse { .. }    => "ParseError",
            ModelError::Solve(_)        => "SolveError",
        }
    }

    pub(crate) fn parse<S : Into<String>>(line : usize, message : S) -> ModelError {
        ModelError::Parse { line, message : message.into() }
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;
