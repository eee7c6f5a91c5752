//! Error types for the portfwd-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for portfwd operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during discovery, profile persistence and forwarding.
#[derive(Error, Debug)]
pub enum Error {
    /// The service/context/namespace enumeration failed, including a missing
    /// or unresponsive kubectl.
    #[error("Failed to list services (context: {context:?}, namespace: {namespace:?}): {reason}")]
    List {
        context: String,
        namespace: String,
        reason: String,
    },

    /// No profile store exists yet.
    #[error("Profile store not found at {}", .0.display())]
    NotFound(PathBuf),

    /// The profile store exists but could not be read or parsed.
    #[error("Failed to read profiles from {}: {reason}", path.display())]
    Read { path: PathBuf, reason: String },

    /// The profile store could not be written.
    #[error("Failed to write profiles to {}: {reason}", path.display())]
    Write { path: PathBuf, reason: String },

    /// A forwarding child process could not be started.
    #[error("Failed to start forwarding for service {service}: {reason}")]
    Spawn { service: String, reason: String },

    /// A session for this service is already live.
    #[error("A forwarding session for {0} is already running")]
    SessionExists(String),

    /// No session is tracked under this key.
    #[error("No forwarding session for {0}")]
    SessionNotFound(String),

    /// The requested profile is not in the collection.
    #[error("Profile '{0}' not found")]
    ProfileNotFound(String),

    /// No profile was named and the collection has no default.
    #[error("No profile given and no default-profile configured")]
    NoDefaultProfile,

    /// Configuration error (home directory, paths).
    #[error("Configuration error: {0}")]
    Config(String),
}
