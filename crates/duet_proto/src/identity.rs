//! Public identity bundle - the two public keys a party hands to its peer.

use duet_crypto::{hash, PublicKeyBytes};
use serde::{Deserialize, Serialize};

use crate::error::ProtoError;

pub const IDENTITY_VERSION: u8 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicIdentity {
    pub version: u8,
    pub alias: String,
    /// X25519 exchange public key (base64url).
    pub exchange_public: PublicKeyBytes,
    /// Ed25519 signing public key (base64url).
    pub signing_public: PublicKeyBytes,
}

impl PublicIdentity {
    pub fn new(alias: &str, exchange_public: PublicKeyBytes, signing_public: PublicKeyBytes) -> Self {
        Self {
            version: IDENTITY_VERSION,
            alias: alias.to_string(),
            exchange_public,
            signing_public,
        }
    }

    /// Fingerprint over both keys, for comparing identities out of band.
    pub fn fingerprint(&self) -> String {
        let mut data = Vec::with_capacity(64);
        data.extend_from_slice(self.exchange_public.as_bytes());
        data.extend_from_slice(self.signing_public.as_bytes());
        hash::fingerprint(&data)
    }

    pub fn to_json(&self) -> Result<String, ProtoError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(s: &str) -> Result<Self, ProtoError> {
        let identity: Self = serde_json::from_str(s)?;
        if identity.version != IDENTITY_VERSION {
            return Err(ProtoError::UnsupportedVersion {
                what: "public identity",
                version: identity.version,
            });
        }
        if identity.exchange_public == identity.signing_public {
            return Err(ProtoError::malformed(
                "public identity",
                "exchange and signing keys must differ",
            ));
        }
        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use duet_crypto::{ExchangeKeyPair, SigningKeyPair};

    use super::*;

    fn identity() -> PublicIdentity {
        let x = ExchangeKeyPair::generate();
        let s = SigningKeyPair::generate();
        PublicIdentity::new("alice", *x.public(), *s.public())
    }

    #[test]
    fn json_roundtrip() {
        let id = identity();
        let json = id.to_json().unwrap();
        assert_eq!(PublicIdentity::from_json(&json).unwrap(), id);
    }

    #[test]
    fn future_version_rejected() {
        let mut id = identity();
        id.version = 9;
        let json = serde_json::to_string(&id).unwrap();
        assert!(matches!(
            PublicIdentity::from_json(&json),
            Err(ProtoError::UnsupportedVersion { version: 9, .. })
        ));
    }

    #[test]
    fn reused_key_rejected() {
        let mut id = identity();
        id.signing_public = id.exchange_public;
        let json = serde_json::to_string(&id).unwrap();
        assert!(PublicIdentity::from_json(&json).is_err());
    }

    #[test]
    fn fingerprint_covers_both_keys() {
        let a = identity();
        let mut b = a.clone();
        b.signing_public = *SigningKeyPair::generate().public();
        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}
