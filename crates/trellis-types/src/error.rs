//! Error types for trellis.

use std::io;

/// Errors produced by the trellis framework.
///
/// Handlers distinguish user mistakes ([`TrellisError::Usage`]) from
/// unexpected failures ([`TrellisError::Command`]); the dispatcher turns the
/// former into an inline diagnostic and the latter into a recorded fault.
#[derive(Debug, thiserror::Error)]
pub enum TrellisError {
    #[error("{0}")]
    Usage(String),

    #[error("command error: {0}")]
    Command(String),

    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl TrellisError {
    /// Whether this error is a recoverable mistake in user input rather than
    /// a failure of handler logic.
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::Usage(_) | Self::Syntax(_))
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, TrellisError>;
