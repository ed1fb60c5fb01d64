use thiserror::Error;

/// Failures that abort a run.
///
/// Benign no-ops (nothing to commit, PR already open, ...) are not errors;
/// they are reported through [`crate::outcome::Outcome`].
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Host API error ({status}): {message}")]
    Host { status: u16, message: String },

    #[error("git {operation} failed: {output}")]
    Git { operation: String, output: String },

    #[error("Template generator failed: {0}")]
    Tool(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    pub fn host(status: u16, message: impl Into<String>) -> Self {
        Error::Host {
            status,
            message: message.into(),
        }
    }

    pub fn git(operation: impl Into<String>, output: impl Into<String>) -> Self {
        Error::Git {
            operation: operation.into(),
            output: output.into(),
        }
    }
}
