//! Launch payload verification errors.

use thiserror::Error;

/// Why a launch payload was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No payload was supplied.
    #[error("empty payload")]
    Empty,

    /// The supplied hash does not match the recomputed one.
    #[error("hash mismatch")]
    HashMismatch,

    /// The embedded `user` document is not valid identity JSON.
    #[error("malformed user document")]
    ParseError,
}

impl AuthError {
    /// Stable machine-readable reason, as reported to clients.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::HashMismatch => "hash_mismatch",
            Self::ParseError => "parse_error",
        }
    }
}
