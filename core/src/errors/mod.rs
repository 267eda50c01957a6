//! Domain error taxonomy for the token lifecycle.
//!
//! Every codec, cache and account-store failure is normalized into these
//! types before it leaves the core; library error text never reaches callers.

use sk_shared::errors::{error_codes, ErrorResponse};
use thiserror::Error;

#[cfg(test)]
mod tests;

/// Token-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Malformed, badly signed, expired or missing a required claim; also
    /// a revoked refresh token presented for exchange
    #[error("Token is invalid, please sign in again")]
    TokenInvalid,

    /// A structurally valid access token whose session or account was revoked
    #[error("Token has been revoked, please sign in again")]
    TokenRevoked,
}

/// Account-state errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Account is not active")]
    AccountInactive,
}

/// Failures of the shared cache, lock or account store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Cache operation failed: {0}")]
    Cache(String),

    #[error("Account store operation failed: {0}")]
    AccountStore(String),

    #[error("Malformed value stored under {key}")]
    Corrupt { key: String },
}

/// Transient session errors; callers should retry with backoff
#[derive(Error, Debug)]
pub enum SessionError {
    /// Another request holds the session's refresh lock
    #[error("Session is busy, please retry")]
    LockContention,

    /// Revocation state could not be read or written
    #[error("Session state is temporarily unavailable")]
    BackendUnavailable(#[source] BackendError),
}

/// Core domain errors
#[derive(Error, Debug)]
pub enum DomainError {
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<BackendError> for DomainError {
    fn from(err: BackendError) -> Self {
        DomainError::Session(SessionError::BackendUnavailable(err))
    }
}

impl DomainError {
    /// Transient failures the client should retry without re-authenticating
    pub fn is_retryable(&self) -> bool {
        matches!(self, DomainError::Session(_))
    }

    /// Failures that end the client session and force a fresh sign-in
    pub fn ends_session(&self) -> bool {
        matches!(self, DomainError::Token(_) | DomainError::Auth(_))
    }

    /// Stable code for clients
    pub fn error_code(&self) -> &'static str {
        match self {
            DomainError::Token(TokenError::TokenInvalid) => error_codes::TOKEN_INVALID,
            DomainError::Token(TokenError::TokenRevoked) => error_codes::TOKEN_REVOKED,
            DomainError::Auth(AuthError::AccountInactive) => error_codes::ACCOUNT_INACTIVE,
            DomainError::Session(SessionError::LockContention) => error_codes::SESSION_BUSY,
            DomainError::Session(SessionError::BackendUnavailable(_)) => {
                error_codes::SERVICE_UNAVAILABLE
            }
            DomainError::Internal { .. } => error_codes::INTERNAL_ERROR,
        }
    }
}

/// Convert DomainError to ErrorResponse
///
/// Internal details stay in logs; the response only carries the code and
/// the fixed message of the public variant.
impl From<&DomainError> for ErrorResponse {
    fn from(err: &DomainError) -> Self {
        let message = match err {
            DomainError::Internal { .. } => "Internal error".to_string(),
            other => other.to_string(),
        };
        let response = ErrorResponse::new(err.error_code(), message);
        if err.is_retryable() {
            response.retryable()
        } else {
            response
        }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
