use duet_crypto::CryptoError;
use thiserror::Error;

/// Why a single message was rejected. Never fatal to the session.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityError {
    #[error("signature does not verify over the ciphertext")]
    Signature,

    #[error("authentication tag mismatch")]
    Tag,
}

#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("Message integrity check failed: {0}")]
    Integrity(#[from] IntegrityError),

    #[error("Malformed {what}: {reason}")]
    Malformed { what: &'static str, reason: String },

    #[error("{what} of {len} bytes exceeds the {max}-byte limit")]
    TooLarge {
        what: &'static str,
        len: usize,
        max: usize,
    },

    #[error("Unsupported {what} version {version}")]
    UnsupportedVersion { what: &'static str, version: u8 },

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Serialisation error: {0}")]
    Serialisation(#[from] serde_json::Error),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

impl ProtoError {
    pub(crate) fn malformed(what: &'static str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            what,
            reason: reason.into(),
        }
    }
}
