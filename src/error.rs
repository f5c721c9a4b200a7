//! Error types for clienthub.

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),
}

/// Failures of the client mutation protocol.
///
/// Each variant maps to a `{"success": false, "message": ...}` response; the
/// `Display` text is the message the dashboard shows.
#[derive(Debug, thiserror::Error)]
pub enum MutationError {
    #[error("Client not found.")]
    NotFound,

    #[error("Onboarding is already complete; there is no task to check off.")]
    AlreadyComplete,

    #[error("\"{0}\" is resolved automatically and cannot be completed by hand.")]
    AutomaticTask(&'static str),

    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),
}
