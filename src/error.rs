//! Error types with a coarse taxonomy for callers.

/// Error type for warden operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // Input errors
    #[error("Invalid permission string {input:?}: {reason}")]
    Parse { input: String, reason: &'static str },

    #[error("Invalid scope: {0}")]
    InvalidScope(String),

    #[error("Unknown permission flag: {0}")]
    UnknownFlag(String),

    #[error("Permission flag registered twice: {0}")]
    DuplicateFlag(String),

    // Data errors
    #[error("Not found: {0}")]
    NotFound(String),

    // Resolution errors, tagged with the step that failed
    #[error("{step}: {source}")]
    Step {
        step: &'static str,
        #[source]
        source: Box<Error>,
    },

    // Collaborator errors
    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Database error: {0}")]
    Database(#[from] libsql::Error),

    // Config errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of an [`Error`], looking through step wrappers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Parse,
    NotFound,
    InvalidScope,
    Upstream,
    Config,
    Internal,
}

impl Error {
    pub(crate) fn parse(input: &str, reason: &'static str) -> Self {
        Error::Parse {
            input: input.to_string(),
            reason,
        }
    }

    /// Wrap `self` with the name of the step that produced it.
    pub fn at(self, step: &'static str) -> Self {
        Error::Step {
            step,
            source: Box::new(self),
        }
    }

    /// The innermost error beneath any step wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Error::Step { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), Error::NotFound(_))
    }

    pub fn kind(&self) -> ErrorKind {
        match self.root() {
            Error::Parse { .. } | Error::UnknownFlag(_) => ErrorKind::Parse,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::InvalidScope(_) => ErrorKind::InvalidScope,
            Error::Upstream(_) | Error::Database(_) | Error::Io(_) => ErrorKind::Upstream,
            Error::Config(_) | Error::DuplicateFlag(_) => ErrorKind::Config,
            Error::Internal(_) | Error::Step { .. } => ErrorKind::Internal,
        }
    }
}

/// Result type alias using warden's Error.
pub type Result<T> = std::result::Result<T, Error>;
