use std::io;
use thiserror::Error;

/// Custom error type for the hostwatch core
#[derive(Error, Debug)]
pub enum HostwatchError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported on this platform: {0}")]
    Unsupported(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Process enumeration failed: {0}")]
    ProcessEnumeration(String),

    #[error("Unknown plugin: {0}")]
    PluginNotFound(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("Invalid threshold: {0}")]
    InvalidThreshold(String),

    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for the hostwatch core
pub type Result<T> = std::result::Result<T, HostwatchError>;

impl HostwatchError {
    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        HostwatchError::Config(msg.into())
    }

    /// Create a platform-unsupported error
    pub fn unsupported<S: Into<String>>(msg: S) -> Self {
        HostwatchError::Unsupported(msg.into())
    }

    pub fn access_denied<S: Into<String>>(msg: S) -> Self {
        HostwatchError::AccessDenied(msg.into())
    }

    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        HostwatchError::NotFound(msg.into())
    }

    pub fn process_enumeration<S: Into<String>>(msg: S) -> Self {
        HostwatchError::ProcessEnumeration(msg.into())
    }

    pub fn plugin_not_found<S: Into<String>>(msg: S) -> Self {
        HostwatchError::PluginNotFound(msg.into())
    }

    pub fn invalid_pattern<S: Into<String>>(msg: S) -> Self {
        HostwatchError::InvalidPattern(msg.into())
    }

    pub fn invalid_threshold<S: Into<String>>(msg: S) -> Self {
        HostwatchError::InvalidThreshold(msg.into())
    }

    pub fn remote<S: Into<String>>(msg: S) -> Self {
        HostwatchError::Remote(msg.into())
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        HostwatchError::Other(msg.into())
    }

    /// The capability does not exist on this OS
    pub fn is_unsupported(&self) -> bool {
        matches!(self, HostwatchError::Unsupported(_))
    }

    /// A single entity could not be read this cycle (permissions, vanished mid-scan)
    pub fn is_transient(&self) -> bool {
        match self {
            HostwatchError::AccessDenied(_) | HostwatchError::NotFound(_) => true,
            HostwatchError::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::PermissionDenied | io::ErrorKind::NotFound
            ),
            _ => false,
        }
    }
}
