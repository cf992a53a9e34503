use duet_crypto::{CryptoError, KdfParams};
use serde::{Deserialize, Serialize};

/// Cost parameters for the two password consumers.
///
/// `kdf` only affects new registrations and password changes: the
/// parameters in force at wrap time are stored in each identity's KDF record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Argon2id costs for the key-encryption key.
    pub kdf: KdfParams,
    /// Argon2id costs for the login password hash.
    pub password_hash: KdfParams,
}

impl CoreConfig {
    /// Low-cost parameters. Never use outside tests.
    pub fn testing() -> Self {
        Self {
            kdf: KdfParams::testing(),
            password_hash: KdfParams::testing(),
        }
    }

    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    pub fn validate(&self) -> Result<(), CryptoError> {
        self.kdf.validate()?;
        self.password_hash.validate()
    }
}
