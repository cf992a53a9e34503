//! Long-term identity key pairs
//!
//! Each identity owns exactly two key pairs:
//!   - `ExchangeKeyPair` (X25519) - Diffie-Hellman only.
//!   - `SigningKeyPair`  (Ed25519) - signatures only.
//!
//! Both are generated independently from the OS CSPRNG and persisted as
//! independently wrapped 32-byte seeds. There is no conversion
//! between the two curve forms.

use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use x25519_dalek::{PublicKey as X25519Public, StaticSecret};
use zeroize::ZeroizeOnDrop;

use crate::{error::CryptoError, hash};

pub const SEED_LEN: usize = 32;
pub const PUBLIC_KEY_LEN: usize = 32;
pub const SIGNATURE_LEN: usize = 64;

fn to_32(bytes: &[u8], what: &str) -> Result<[u8; 32], CryptoError> {
    bytes.try_into().map_err(|_| {
        CryptoError::InvalidKey(format!("{what} must be 32 bytes, got {}", bytes.len()))
    })
}

// ── Public key newtype ───────────────────────────────────────────────────────

/// 32-byte public key, base64url-encoded on the wire.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKeyBytes([u8; PUBLIC_KEY_LEN]);

impl PublicKeyBytes {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        Ok(Self(to_32(bytes, "Public key")?))
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.0
    }

    pub fn to_b64(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.0)
    }

    pub fn from_b64(s: &str) -> Result<Self, CryptoError> {
        let bytes = URL_SAFE_NO_PAD.decode(s)?;
        Self::from_bytes(&bytes)
    }

    /// Human-readable fingerprint for out-of-band comparison.
    ///
    /// Example: "a1b2 c3d4 e5f6 7890 abcd ef01 2345 6789 0abc def0"
    pub fn fingerprint(&self) -> String {
        hash::fingerprint(&self.0)
    }
}

impl fmt::Debug for PublicKeyBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKeyBytes({})", self.to_b64())
    }
}

impl Serialize for PublicKeyBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_b64())
    }
}

impl<'de> Deserialize<'de> for PublicKeyBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_b64(&s).map_err(de::Error::custom)
    }
}

// ── Exchange key pair ────────────────────────────────────────────────────────

/// X25519 key pair used only to derive shared secrets.
#[derive(ZeroizeOnDrop)]
pub struct ExchangeKeyPair {
    #[zeroize(skip)]
    public: PublicKeyBytes,
    secret_bytes: [u8; SEED_LEN],
}

impl ExchangeKeyPair {
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        Self::from_secret(secret)
    }

    pub fn from_seed(bytes: &[u8]) -> Result<Self, CryptoError> {
        let secret = StaticSecret::from(to_32(bytes, "Exchange key")?);
        Ok(Self::from_secret(secret))
    }

    fn from_secret(secret: StaticSecret) -> Self {
        let public = PublicKeyBytes(X25519Public::from(&secret).to_bytes());
        Self {
            public,
            secret_bytes: secret.to_bytes(),
        }
    }

    pub fn public(&self) -> &PublicKeyBytes {
        &self.public
    }

    pub fn secret_bytes(&self) -> &[u8; SEED_LEN] {
        &self.secret_bytes
    }

    /// Raw X25519 output against `remote`. Rejects low-order remote points.
    pub(crate) fn diffie_hellman(
        &self,
        remote: &PublicKeyBytes,
    ) -> Result<x25519_dalek::SharedSecret, CryptoError> {
        let secret = StaticSecret::from(self.secret_bytes);
        let shared = secret.diffie_hellman(&X25519Public::from(remote.0));
        if !shared.was_contributory() {
            return Err(CryptoError::NonContributory);
        }
        Ok(shared)
    }
}

// ── Signing key pair ─────────────────────────────────────────────────────────

/// Ed25519 key pair used only for signatures.
#[derive(ZeroizeOnDrop)]
pub struct SigningKeyPair {
    #[zeroize(skip)]
    public: PublicKeyBytes,
    secret_bytes: [u8; SEED_LEN],
}

impl SigningKeyPair {
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self {
            public: PublicKeyBytes(signing_key.verifying_key().to_bytes()),
            secret_bytes: signing_key.to_bytes(),
        }
    }

    pub fn from_seed(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr = to_32(bytes, "Signing key")?;
        let signing_key = SigningKey::from_bytes(&arr);
        Ok(Self {
            public: PublicKeyBytes(signing_key.verifying_key().to_bytes()),
            secret_bytes: arr,
        })
    }

    pub fn public(&self) -> &PublicKeyBytes {
        &self.public
    }

    pub fn secret_bytes(&self) -> &[u8; SEED_LEN] {
        &self.secret_bytes
    }

    /// Sign arbitrary bytes; returns a 64-byte raw Ed25519 signature.
    pub fn sign(&self, msg: &[u8]) -> [u8; SIGNATURE_LEN] {
        SigningKey::from_bytes(&self.secret_bytes).sign(msg).to_bytes()
    }

    /// Verify a signature made by the holder of `public`.
    pub fn verify(public: &PublicKeyBytes, msg: &[u8], sig_bytes: &[u8]) -> Result<(), CryptoError> {
        let vk = VerifyingKey::from_bytes(&public.0)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        let sig_arr: [u8; SIGNATURE_LEN] = sig_bytes
            .try_into()
            .map_err(|_| CryptoError::SignatureVerification)?;
        vk.verify_strict(msg, &Signature::from_bytes(&sig_arr))
            .map_err(|_| CryptoError::SignatureVerification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exchange_seed_roundtrip_keeps_public() {
        let kp = ExchangeKeyPair::generate();
        let restored = ExchangeKeyPair::from_seed(kp.secret_bytes()).unwrap();
        assert_eq!(kp.public(), restored.public());
    }

    #[test]
    fn signing_seed_roundtrip_keeps_public() {
        let kp = SigningKeyPair::generate();
        let restored = SigningKeyPair::from_seed(kp.secret_bytes()).unwrap();
        assert_eq!(kp.public(), restored.public());
    }

    #[test]
    fn sign_and_verify() {
        let kp = SigningKeyPair::generate();
        let sig = kp.sign(b"hello");
        assert!(SigningKeyPair::verify(kp.public(), b"hello", &sig).is_ok());
        assert!(SigningKeyPair::verify(kp.public(), b"hellp", &sig).is_err());

        let other = SigningKeyPair::generate();
        assert!(SigningKeyPair::verify(other.public(), b"hello", &sig).is_err());
    }

    #[test]
    fn truncated_signature_fails_as_verification() {
        let kp = SigningKeyPair::generate();
        let sig = kp.sign(b"msg");
        let err = SigningKeyPair::verify(kp.public(), b"msg", &sig[..63]);
        assert!(matches!(err, Err(CryptoError::SignatureVerification)));
    }

    #[test]
    fn wrong_seed_length_rejected() {
        assert!(ExchangeKeyPair::from_seed(&[0u8; 31]).is_err());
        assert!(SigningKeyPair::from_seed(&[0u8; 33]).is_err());
    }

    #[test]
    fn public_key_b64_and_serde() {
        let kp = SigningKeyPair::generate();
        let pk = *kp.public();
        assert_eq!(PublicKeyBytes::from_b64(&pk.to_b64()).unwrap(), pk);

        let json = serde_json::to_string(&pk).unwrap();
        assert_eq!(json, format!("\"{}\"", pk.to_b64()));
        let back: PublicKeyBytes = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pk);
        assert!(serde_json::from_str::<PublicKeyBytes>("\"AAAA\"").is_err());
    }

    #[test]
    fn fingerprint_format() {
        let pk = PublicKeyBytes([9u8; 32]);
        let fp = pk.fingerprint();
        assert_eq!(fp.split(' ').count(), 10);
        assert!(fp.split(' ').all(|g| g.len() == 4));
        assert_ne!(fp, PublicKeyBytes([8u8; 32]).fingerprint());
    }
}
