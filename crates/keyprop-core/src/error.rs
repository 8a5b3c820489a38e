//! Error types for the keyprop core library.

use std::path::PathBuf;

use thiserror::Error;

/// Core error type for signing configuration resolution.
///
/// A missing signing field is never an error; it is modeled as `None` on
/// [`SigningIdentity`](crate::models::SigningIdentity).
#[derive(Error, Debug)]
pub enum KeypropError {
    #[error("Cannot read {}: {source}", .path.display())]
    ConfigFileUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed properties in {} at line {line}: {message}", .path.display())]
    MalformedProperties {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Keystore not found: {}", .0.display())]
    KeystoreNotFound(PathBuf),

    #[error("Keytool error: {0}")]
    Keytool(String),

    #[error("Project error: {0}")]
    Project(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for keyprop operations.
pub type Result<T> = std::result::Result<T, KeypropError>;
