//! Persisted credential records.
//!
//! - `WrappedKeyRecord` - one private key seed encrypted under the KEK.
//! - `KdfRecord` (from `duet_crypto`) - salt + Argon2id costs for that KEK.
//!
//! Wrapped records are bound to their owner and role through the AEAD
//! associated data (`"duet-key-wrap-v1" || role || 0x00 || alias`), so a
//! record moved to another alias or swapped between the exchange and signing
//! slots fails to decrypt.

use duet_crypto::{
    aead::{self, NONCE_LEN, TAG_LEN},
    kdf::{KdfParams, KdfRecord, SALT_LEN},
    keys::SEED_LEN,
    Kek,
};
use zeroize::Zeroizing;

use crate::{
    codec::{FrameReader, FrameWriter, WireRecord},
    error::ProtoError,
};

/// Which long-term key a wrapped record holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyRole {
    Exchange,
    Signing,
}

impl KeyRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyRole::Exchange => "exchange",
            KeyRole::Signing => "signing",
        }
    }

    fn aad(&self, alias: &str) -> Vec<u8> {
        let mut aad = b"duet-key-wrap-v1".to_vec();
        aad.extend_from_slice(self.as_str().as_bytes());
        aad.push(0);
        aad.extend_from_slice(alias.as_bytes());
        aad
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedKeyRecord {
    pub ciphertext: Vec<u8>,
    pub nonce: Vec<u8>,
    pub tag: Vec<u8>,
}

impl WrappedKeyRecord {
    pub fn wrap(
        kek: &Kek,
        seed: &[u8; SEED_LEN],
        alias: &str,
        role: KeyRole,
    ) -> Result<Self, ProtoError> {
        let sealed = aead::seal(kek.as_bytes(), seed, &role.aad(alias))?;
        Ok(Self {
            ciphertext: sealed.ciphertext,
            nonce: sealed.nonce.to_vec(),
            tag: sealed.tag.to_vec(),
        })
    }

    /// Fails closed: a wrong KEK, alias or role yields
    /// `ProtoError::Crypto(CryptoError::AeadDecrypt)`, never key bytes.
    pub fn unwrap(
        &self,
        kek: &Kek,
        alias: &str,
        role: KeyRole,
    ) -> Result<Zeroizing<[u8; SEED_LEN]>, ProtoError> {
        let plaintext = aead::open(
            kek.as_bytes(),
            &self.nonce,
            &self.tag,
            &self.ciphertext,
            &role.aad(alias),
        )?;
        let mut seed = Zeroizing::new([0u8; SEED_LEN]);
        if plaintext.len() != SEED_LEN {
            return Err(ProtoError::malformed(
                Self::NAME,
                format!("unwrapped seed is {} bytes", plaintext.len()),
            ));
        }
        seed.copy_from_slice(&plaintext);
        Ok(seed)
    }
}

impl WireRecord for WrappedKeyRecord {
    const NAME: &'static str = "wrapped key record";
    const MAGIC: [u8; 4] = *b"DWK1";
    const VERSION: u8 = 1;

    fn encode_fields(&self, w: &mut FrameWriter) -> Result<(), ProtoError> {
        w.bytes(&self.nonce)?.bytes(&self.tag)?.bytes(&self.ciphertext)?;
        Ok(())
    }

    fn decode_fields(_version: u8, r: &mut FrameReader<'_>) -> Result<Self, ProtoError> {
        let nonce = r.array::<NONCE_LEN>()?.to_vec();
        let tag = r.array::<TAG_LEN>()?.to_vec();
        let ciphertext = r.bytes()?.to_vec();
        Ok(Self {
            ciphertext,
            nonce,
            tag,
        })
    }
}

impl WireRecord for KdfRecord {
    const NAME: &'static str = "kdf record";
    const MAGIC: [u8; 4] = *b"DKD1";
    const VERSION: u8 = 1;

    fn encode_fields(&self, w: &mut FrameWriter) -> Result<(), ProtoError> {
        w.u32(self.params.m_cost)
            .u32(self.params.t_cost)
            .u32(self.params.p_cost)
            .bytes(&self.salt)?;
        Ok(())
    }

    fn decode_fields(_version: u8, r: &mut FrameReader<'_>) -> Result<Self, ProtoError> {
        let params = KdfParams {
            m_cost: r.u32()?,
            t_cost: r.u32()?,
            p_cost: r.u32()?,
        };
        params
            .check_limits()
            .map_err(|e| ProtoError::malformed(Self::NAME, e.to_string()))?;
        let salt = r.array::<SALT_LEN>()?;
        Ok(Self { params, salt })
    }
}

#[cfg(test)]
mod tests {
    use duet_crypto::{derive_kek, CryptoError, SigningKeyPair};
    use proptest::prelude::*;

    use super::*;

    fn kek(password: &[u8], record: &KdfRecord) -> Kek {
        derive_kek(password, record).unwrap()
    }

    #[test]
    fn wrap_unwrap_returns_seed() {
        let kdf = KdfRecord::generate(KdfParams::testing());
        let key = SigningKeyPair::generate();
        let wrapped =
            WrappedKeyRecord::wrap(&kek(b"pw", &kdf), key.secret_bytes(), "alice", KeyRole::Signing)
                .unwrap();

        let seed = wrapped
            .unwrap(&kek(b"pw", &kdf), "alice", KeyRole::Signing)
            .unwrap();
        assert_eq!(&*seed, key.secret_bytes());
    }

    #[test]
    fn wrong_password_fails_closed() {
        let kdf = KdfRecord::generate(KdfParams::testing());
        let seed = [42u8; 32];
        let wrapped =
            WrappedKeyRecord::wrap(&kek(b"pw1", &kdf), &seed, "alice", KeyRole::Exchange).unwrap();

        let err = wrapped.unwrap(&kek(b"pw2", &kdf), "alice", KeyRole::Exchange);
        assert!(matches!(err, Err(ProtoError::Crypto(CryptoError::AeadDecrypt))));
    }

    #[test]
    fn record_bound_to_alias_and_role() {
        let kdf = KdfRecord::generate(KdfParams::testing());
        let k = kek(b"pw", &kdf);
        let wrapped = WrappedKeyRecord::wrap(&k, &[1u8; 32], "alice", KeyRole::Exchange).unwrap();

        assert!(wrapped.unwrap(&k, "alice", KeyRole::Signing).is_err());
        assert!(wrapped.unwrap(&k, "bob", KeyRole::Exchange).is_err());
    }

    #[test]
    fn wrapped_record_wire_roundtrip() {
        let kdf = KdfRecord::generate(KdfParams::testing());
        let k = kek(b"pw", &kdf);
        let wrapped = WrappedKeyRecord::wrap(&k, &[5u8; 32], "alice", KeyRole::Signing).unwrap();

        let bytes = wrapped.to_bytes().unwrap();
        assert_eq!(&bytes[..4], b"DWK1");
        let decoded = WrappedKeyRecord::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, wrapped);
        assert_eq!(decoded.to_bytes().unwrap(), bytes);

        let text = WrappedKeyRecord::from_base64(&wrapped.to_base64().unwrap()).unwrap();
        assert_eq!(text, wrapped);
    }

    #[test]
    fn kdf_record_wire_roundtrip() {
        let kdf = KdfRecord::generate(KdfParams::default());
        let decoded = KdfRecord::from_bytes(&kdf.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, kdf);
    }

    #[test]
    fn kdf_record_rejects_costs_above_limits() {
        for params in [
            KdfParams { m_cost: u32::MAX, ..KdfParams::testing() },
            KdfParams { t_cost: u32::MAX, ..KdfParams::testing() },
            KdfParams { p_cost: u32::MAX, ..KdfParams::testing() },
        ] {
            let stored = KdfRecord { params, salt: [1u8; SALT_LEN] }.to_bytes().unwrap();
            assert!(matches!(
                KdfRecord::from_bytes(&stored),
                Err(ProtoError::Malformed { .. })
            ));
        }
    }

    #[test]
    fn kdf_record_rejects_short_salt() {
        let mut bytes = b"DKD1\x01".to_vec();
        for v in [8u32, 1, 1] {
            bytes.extend_from_slice(&v.to_be_bytes());
        }
        bytes.extend_from_slice(&4u32.to_be_bytes());
        bytes.extend_from_slice(&[0u8; 4]);
        assert!(matches!(
            KdfRecord::from_bytes(&bytes),
            Err(ProtoError::Malformed { .. })
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn only_the_right_password_recovers_the_seed(
            seed in any::<[u8; 32]>(),
            right in proptest::collection::vec(any::<u8>(), 1..32),
            wrong in proptest::collection::vec(any::<u8>(), 1..32),
        ) {
            prop_assume!(right != wrong);
            let kdf = KdfRecord::generate(KdfParams::testing());
            let wrapped =
                WrappedKeyRecord::wrap(&kek(&right, &kdf), &seed, "alice", KeyRole::Signing)
                    .unwrap();

            let recovered = wrapped.unwrap(&kek(&right, &kdf), "alice", KeyRole::Signing).unwrap();
            prop_assert_eq!(*recovered, seed);
            prop_assert!(wrapped.unwrap(&kek(&wrong, &kdf), "alice", KeyRole::Signing).is_err());
        }
    }
}
