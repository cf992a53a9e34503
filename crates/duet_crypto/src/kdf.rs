//! Key-encryption-key derivation
//!
//! `derive_kek` - Argon2id in raw mode, derives the 32-byte key that wraps an
//!   identity's private keys. Deterministic in (password, salt, params), so
//!   the KEK itself is never stored.
//!
//! The salt and cost parameters travel together in a `KdfRecord`; the record
//! is persisted next to the wrapped keys (it is not secret).

use argon2::{Algorithm, Argon2, Params, Version};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;

pub const SALT_LEN: usize = 16;
pub const KEK_LEN: usize = 32;

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub m_cost: u32,
    /// Number of passes.
    pub t_cost: u32,
    /// Degree of parallelism.
    pub p_cost: u32,
}

impl Default for KdfParams {
    /// Tuned for interactive (desktop) use.
    fn default() -> Self {
        Self {
            m_cost: 64 * 1024, // 64 MiB
            t_cost: 3,
            p_cost: 1,
        }
    }
}

/// Highest costs accepted from configuration or from a stored record.
/// Argon2 allocates `m_cost` KiB and runs `t_cost` passes before it can
/// reject a password, so a record above these is treated as tampered.
pub const MAX_PARAMS: KdfParams = KdfParams {
    m_cost: 1024 * 1024, // 1 GiB
    t_cost: 16,
    p_cost: 16,
};

impl KdfParams {
    /// Minimum parameters Argon2 accepts. Only for tests.
    pub fn testing() -> Self {
        Self {
            m_cost: 8,
            t_cost: 1,
            p_cost: 1,
        }
    }

    pub fn to_argon2(&self, output_len: Option<usize>) -> Result<Params, CryptoError> {
        Params::new(self.m_cost, self.t_cost, self.p_cost, output_len)
            .map_err(|e| CryptoError::KeyDerivation(e.to_string()))
    }

    pub fn check_limits(&self) -> Result<(), CryptoError> {
        if self.m_cost > MAX_PARAMS.m_cost
            || self.t_cost > MAX_PARAMS.t_cost
            || self.p_cost > MAX_PARAMS.p_cost
        {
            return Err(CryptoError::KeyDerivation(format!(
                "costs m={} t={} p={} exceed the limit m={} t={} p={}",
                self.m_cost,
                self.t_cost,
                self.p_cost,
                MAX_PARAMS.m_cost,
                MAX_PARAMS.t_cost,
                MAX_PARAMS.p_cost,
            )));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), CryptoError> {
        self.check_limits()?;
        self.to_argon2(Some(KEK_LEN)).map(|_| ())
    }
}

/// Salt plus the parameters it was used with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KdfRecord {
    pub params: KdfParams,
    pub salt: [u8; SALT_LEN],
}

impl KdfRecord {
    /// Fresh random salt, generated once per identity (and again on every
    /// password change).
    pub fn generate(params: KdfParams) -> Self {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        Self { params, salt }
    }
}

/// 32-byte key-encryption key. Zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Kek([u8; KEK_LEN]);

impl Kek {
    pub fn as_bytes(&self) -> &[u8; KEK_LEN] {
        &self.0
    }
}

/// Derive the KEK for `password` under `record`.
pub fn derive_kek(password: &[u8], record: &KdfRecord) -> Result<Kek, CryptoError> {
    let params = record.params.to_argon2(Some(KEK_LEN))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    let mut output = [0u8; KEK_LEN];
    argon2
        .hash_password_into(password, &record.salt, &mut output)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    let kek = Kek(output);
    output.zeroize();
    Ok(kek)
}
