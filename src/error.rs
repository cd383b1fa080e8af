//! Error types for the lane assignment coordinator
//!
//! This module defines all error types using anyhow for consistent error handling
//! throughout the application. Every variant maps to a short user-facing notice;
//! none of them should ever take the process down.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific match coordination scenarios
#[derive(Debug, thiserror::Error)]
pub enum MarshalError {
    #[error("there's already an active match in this scope")]
    AlreadyActive,

    #[error("no active match found")]
    NotFound,

    #[error("match is already paused")]
    AlreadyPaused,

    #[error("match is not paused")]
    NotPaused,

    #[error("participant {participant} is not in a voice room")]
    NotInRoom { participant: u64 },

    #[error("{lane} voice room not found")]
    UnknownDestination { lane: String },

    #[error("missing permission to move participants")]
    Forbidden,

    #[error("platform call failed: {message}")]
    Transient { message: String },

    #[error("internal error: {message}")]
    Internal { message: String },
}
