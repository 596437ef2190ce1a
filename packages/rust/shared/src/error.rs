//! Error types for shopline-cli.
//!
//! Library crates use [`ShoplineError`] via `thiserror`.
//! The app crate (cli) wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all shopline-cli operations.
#[derive(Debug, thiserror::Error)]
pub enum ShoplineError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Transport-level failure (connect, TLS, timeout, body read).
    #[error("network error: {0}")]
    Network(String),

    /// The API answered with a non-success status.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// A success response whose body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Invalid input (blank id, unknown flag value, etc.).
    #[error("{message}")]
    Validation { message: String },

    /// The operation was cancelled before it completed.
    #[error("operation cancelled")]
    Cancelled,

    /// A worker task panicked or was aborted.
    #[error("task failed: {0}")]
    Task(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An underlying error annotated with the operation that failed.
    #[error("{context}: {source}")]
    Context {
        context: String,
        source: Box<ShoplineError>,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ShoplineError>;

impl ShoplineError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Annotate an error with a static description of the failed operation.
    pub fn context(context: impl Into<String>, source: ShoplineError) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// The innermost error, skipping any [`ShoplineError::Context`] layers.
    pub fn root(&self) -> &ShoplineError {
        match self {
            Self::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether the upstream reported the resource as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), Self::Api { status: 404, .. })
    }

    /// Whether the upstream rejected the credentials.
    pub fn is_auth(&self) -> bool {
        matches!(self.root(), Self::Api { status: 401 | 403, .. })
    }
}

/// Extension for attaching operation context to a [`Result`].
pub trait ResultExt<T> {
    /// Wrap the error (if any) with a static operation message.
    fn context(self, context: &str) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: &str) -> Result<T> {
        self.map_err(|e| ShoplineError::context(context, e))
    }
}
