use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Failure class reported by a connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    /// The server actively refused the TCP connection (transient, retried).
    ConnectionRefused,
    /// Credentials were rejected by the server.
    AccessDenied,
    /// Anything else the client reported.
    Other,
}

impl fmt::Display for AuthErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuthErrorKind::ConnectionRefused => "ConnectionRefused",
            AuthErrorKind::AccessDenied => "AccessDenied",
            AuthErrorKind::Other => "Other",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct AuthError {
    pub kind: AuthErrorKind,
    pub message: String,
}

impl AuthError {
    pub fn new(kind: AuthErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn connection_refused(message: impl Into<String>) -> Self {
        Self::new(AuthErrorKind::ConnectionRefused, message)
    }

    pub fn is_connection_refused(&self) -> bool {
        self.kind == AuthErrorKind::ConnectionRefused
    }
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Configuration error: {detail}")]
    Config { detail: String },
    #[error("Duplicate delegate '{name}' across datasources")]
    DuplicateDelegate { name: String },
    #[error("Delegate slot '{name}' is already taken and not overridable")]
    SlotTaken { name: String },
    #[error("Load error at {}: {detail}", path.display())]
    Load { path: PathBuf, detail: String },
    #[error("Model error: {detail}")]
    Model { detail: String },
    #[error("Authentication failed for '{delegate}' after {retries} retries: {source}")]
    Authentication {
        delegate: String,
        retries: u32,
        #[source]
        source: AuthError,
    },
    #[error("Authentication task aborted: {detail}")]
    AuthTask { detail: String },
}

impl BootstrapError {
    pub fn config(detail: impl Into<String>) -> Self {
        Self::Config {
            detail: detail.into(),
        }
    }

    pub fn load(path: impl Into<PathBuf>, detail: impl fmt::Display) -> Self {
        Self::Load {
            path: path.into(),
            detail: detail.to_string(),
        }
    }

    pub fn model(detail: impl Into<String>) -> Self {
        Self::Model {
            detail: detail.into(),
        }
    }

    /// The login failure behind an `Authentication` error.
    pub fn auth_error(&self) -> Option<&AuthError> {
        match self {
            BootstrapError::Authentication { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for BootstrapError {
    fn from(e: serde_json::Error) -> Self {
        BootstrapError::config(format!("invalid datasource config: {e}"))
    }
}
