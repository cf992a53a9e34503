//! duet_crypto - Duet secure channel cryptographic primitives
//!
//! # Design principles
//! - NO custom crypto; all primitives come from audited Rust crates.
//! - Zeroize all secret material on drop.
//! - Exchange (X25519) and signing (Ed25519) keys are separate types and
//!   never converted into one another.
//!
//! # Module layout
//! - `password` - Argon2id PHC login hashes (verification only)
//! - `kdf`      - Argon2id key-encryption-key derivation + salt records
//! - `aead`     - XChaCha20-Poly1305 with detached nonce / tag
//! - `keys`     - exchange and signing key pairs, public key newtype
//! - `channel`  - X25519 + HKDF shared secret establishment
//! - `hash`     - BLAKE3 fingerprints
//! - `error`    - unified error type

pub mod aead;
pub mod channel;
pub mod error;
pub mod hash;
pub mod kdf;
pub mod keys;
pub mod password;

pub use channel::{establish, SharedSecret};
pub use error::CryptoError;
pub use kdf::{derive_kek, Kek, KdfParams, KdfRecord};
pub use keys::{ExchangeKeyPair, PublicKeyBytes, SigningKeyPair};
pub use password::{PasswordAuthenticator, PasswordHashRecord};
