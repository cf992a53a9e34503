//! Two-party shared secret establishment.
//!
//! Protocol:
//!   DH  = X25519(local_exchange_secret, remote_exchange_public)
//!   SK  = HKDF-SHA256(salt = "duet-channel-v1", ikm = DH,
//!                     info = min(pub_a, pub_b) || max(pub_a, pub_b))
//!
//! Both public keys are ordered before they enter `info`, so either side
//! computes the same SK. Non-contributory DH results (low-order remote keys)
//! are rejected before any key material is derived.

use std::fmt;

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{
    error::CryptoError,
    keys::{ExchangeKeyPair, PublicKeyBytes},
};

pub const SHARED_SECRET_LEN: usize = 32;
const CHANNEL_SALT: &[u8] = b"duet-channel-v1";

/// Symmetric key shared by exactly two parties. Zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret([u8; SHARED_SECRET_LEN]);

impl SharedSecret {
    pub fn as_bytes(&self) -> &[u8; SHARED_SECRET_LEN] {
        &self.0
    }

    /// Wrap raw key bytes, e.g. a secret agreed out of band.
    pub fn from_bytes(bytes: [u8; SHARED_SECRET_LEN]) -> Self {
        Self(bytes)
    }
}

impl PartialEq for SharedSecret {
    fn eq(&self, other: &Self) -> bool {
        let mut diff = 0u8;
        for (a, b) in self.0.iter().zip(other.0.iter()) {
            diff |= a ^ b;
        }
        diff == 0
    }
}

impl Eq for SharedSecret {}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret(..)")
    }
}

/// Derive the shared secret between `local` and the holder of `remote`.
pub fn establish(
    local: &ExchangeKeyPair,
    remote: &PublicKeyBytes,
) -> Result<SharedSecret, CryptoError> {
    let dh = local.diffie_hellman(remote)?;

    let (lo, hi) = if local.public().as_bytes() <= remote.as_bytes() {
        (local.public(), remote)
    } else {
        (remote, local.public())
    };
    let mut info = [0u8; 64];
    info[..32].copy_from_slice(lo.as_bytes());
    info[32..].copy_from_slice(hi.as_bytes());

    let mut key = [0u8; SHARED_SECRET_LEN];
    Hkdf::<Sha256>::new(Some(CHANNEL_SALT), dh.as_bytes())
        .expand(&info, &mut key)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    let secret = SharedSecret(key);
    key.zeroize();
    Ok(secret)
}
