//! Gate error types

/// Errors raised by the concurrency gate itself
///
/// Failures of the submitted work are returned to the submitter untouched;
/// these variants cover what the gate adds on top.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    /// Capacity must admit at least one unit of work
    #[error("gate capacity must be at least 1")]
    ZeroCapacity,

    /// Gate already went idle; it does not accept further work
    #[error("gate closed after going idle")]
    Closed,

    /// Work panicked while executing
    #[error("work {label:?} panicked: {message}")]
    Panicked {
        /// Submission label
        label: String,
        /// Panic payload, if it was a string
        message: String,
    },

    /// Work was dropped before settling (runtime shut down)
    #[error("work dropped before completion")]
    Dropped,
}
