//! Login password hashing.
//!
//! Argon2id PHC strings (`$argon2id$v=19$m=...`) with their own random salt.
//! The output is only ever compared, never used as key material, and its
//! salt is unrelated to the KEK salt in `kdf`.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;

use crate::{error::CryptoError, kdf::KdfParams};

/// Stored hash of a login password (PHC string).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHashRecord(String);

impl PasswordHashRecord {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.as_bytes().to_vec()
    }

    /// Parses the PHC string and refuses embedded costs above `MAX_PARAMS`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let s = std::str::from_utf8(bytes)
            .map_err(|e| CryptoError::PasswordHash(format!("record is not UTF-8: {e}")))?;
        let record = Self(s.to_string());
        record.check_limits()?;
        Ok(record)
    }

    /// Argon2 costs embedded in the PHC string.
    pub fn params(&self) -> Result<KdfParams, CryptoError> {
        let parsed =
            PasswordHash::new(&self.0).map_err(|e| CryptoError::PasswordHash(e.to_string()))?;
        let params =
            Params::try_from(&parsed).map_err(|e| CryptoError::PasswordHash(e.to_string()))?;
        Ok(KdfParams {
            m_cost: params.m_cost(),
            t_cost: params.t_cost(),
            p_cost: params.p_cost(),
        })
    }

    fn check_limits(&self) -> Result<(), CryptoError> {
        self.params()?
            .check_limits()
            .map_err(|e| CryptoError::PasswordHash(e.to_string()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct PasswordAuthenticator {
    params: KdfParams,
}

impl PasswordAuthenticator {
    pub fn new(params: KdfParams) -> Self {
        Self { params }
    }

    fn argon2(&self) -> Result<Argon2<'static>, CryptoError> {
        let params = self.params.to_argon2(None)?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    pub fn hash(&self, password: &[u8]) -> Result<PasswordHashRecord, CryptoError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()?
            .hash_password(password, &salt)
            .map_err(|e| CryptoError::PasswordHash(e.to_string()))?;
        Ok(PasswordHashRecord(hash.to_string()))
    }

    /// `Ok(false)` on mismatch. Verification uses the parameters embedded in
    /// the record, not the authenticator's current ones.
    pub fn verify(&self, password: &[u8], record: &PasswordHashRecord) -> Result<bool, CryptoError> {
        record.check_limits()?;
        let parsed =
            PasswordHash::new(&record.0).map_err(|e| CryptoError::PasswordHash(e.to_string()))?;
        match Argon2::default().verify_password(password, &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(CryptoError::PasswordHash(e.to_string())),
        }
    }
}
