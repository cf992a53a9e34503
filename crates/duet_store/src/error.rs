use duet_crypto::CryptoError;
use duet_proto::{IntegrityError, ProtoError};
use thiserror::Error;

/// Failure of the credential store collaborator itself.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Caller-facing error taxonomy for vault and session operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Password did not verify. Retryable.
    #[error("Authentication failed")]
    Authentication,

    /// Stored credentials could not be unwrapped despite a correct password.
    #[error("Credential data corrupted ({0}); re-register this identity")]
    Corruption(String),

    /// A single message was rejected; the session stays valid.
    #[error("Message rejected: {0}")]
    Integrity(IntegrityError),

    #[error("Not initialised: {0}")]
    NotInitialized(&'static str),

    #[error("Credential store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    #[error("{what} of {len} bytes exceeds the {max}-byte limit")]
    TooLarge {
        what: &'static str,
        len: usize,
        max: usize,
    },

    #[error("Invalid alias: {0}")]
    InvalidAlias(String),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Background worker failed: {0}")]
    Worker(String),
}

impl CoreError {
    /// "This message is untrustworthy."
    pub fn is_integrity(&self) -> bool {
        matches!(self, CoreError::Integrity(_))
    }

    /// "Your credentials are unusable."
    pub fn is_corruption(&self) -> bool {
        matches!(self, CoreError::Corruption(_))
    }
}

impl From<ProtoError> for CoreError {
    fn from(e: ProtoError) -> Self {
        match e {
            ProtoError::Integrity(kind) => CoreError::Integrity(kind),
            ProtoError::Crypto(inner) => CoreError::Crypto(inner),
            ProtoError::TooLarge { what, len, max } => CoreError::TooLarge { what, len, max },
            other => CoreError::Corruption(other.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for CoreError {
    fn from(e: tokio::task::JoinError) -> Self {
        CoreError::Worker(e.to_string())
    }
}
