//! Authentication error types.

use thiserror::Error;

/// Errors that can occur during admin authentication.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Wrong username, wrong password, or both.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// No token in the cookie or `Authorization` header.
    #[error("missing token")]
    MissingToken,

    /// Token signature, structure, or claims are invalid.
    #[error("invalid token")]
    InvalidToken,

    /// Token is past its expiry.
    #[error("token expired")]
    TokenExpired,

    /// Token could not be signed.
    #[error("token signing failed: {0}")]
    TokenIssue(String),

    /// Stored password hash could not be used.
    #[error("password hash error: {0}")]
    PasswordHash(String),
}

impl AuthError {
    /// Whether this error was caused by the caller rather than the server.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials | Self::MissingToken | Self::InvalidToken | Self::TokenExpired
        )
    }

    /// Message safe to show to the caller.
    #[must_use]
    pub const fn client_message(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "Invalid credentials",
            Self::MissingToken => "Authentication required. Access denied.",
            Self::InvalidToken | Self::TokenExpired => "Session expired. Please log in again.",
            Self::TokenIssue(_) | Self::PasswordHash(_) => "Auth System Error",
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => Self::TokenExpired,
            _ => Self::InvalidToken,
        }
    }
}
