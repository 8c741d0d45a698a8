//! Error types for the ATSP solver.

use thiserror::Error;

/// Errors produced while loading matrices, solving, or writing results.
#[derive(Error, Debug)]
pub enum AtspError {
    /// Underlying file system failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed matrix or tour file
    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Matrix violates the container invariants
    #[error("Invalid matrix: {0}")]
    InvalidMatrix(String),

    /// Tour is not a permutation of the cities starting at 0
    #[error("Invalid tour: {0}")]
    InvalidTour(String),

    /// No Hamiltonian cycle exists over the finite edges
    #[error("No feasible tour exists for this matrix")]
    NoFeasibleTour,

    /// Deadline expired before any complete tour was found
    #[error("Time limit reached before a complete tour was found")]
    TimeLimitReached,

    /// Instance exceeds what the algorithm can handle
    #[error("{algorithm} supports at most {max} cities, got {size}")]
    TooLarge {
        algorithm: String,
        size: usize,
        max: usize,
    },

    /// Command-line value out of range or missing
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type for solver operations.
pub type Result<T> = std::result::Result<T, AtspError>;
