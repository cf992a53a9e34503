//! Secure messenger - encrypt-then-sign / verify-then-decrypt.
//!
//! seal:
//!   (nonce, ct, tag) = XChaCha20-Poly1305(shared_secret, random nonce, plaintext)
//!   sig              = Ed25519(local_signing_key, ct)
//!
//! open:
//!   1. Ed25519 verify(remote_signing_public, ct, sig)   - else Integrity::Signature
//!   2. XChaCha20-Poly1305 decrypt                        - else Integrity::Tag
//!
//! Decryption is never attempted on an envelope whose signature fails.
//! Both functions are pure over their arguments and safe to call
//! concurrently under one shared secret.

use duet_crypto::{aead, PublicKeyBytes, SharedSecret, SigningKeyPair};
use tracing::warn;
use zeroize::Zeroizing;

use crate::{
    codec::MAX_FIELD_LEN,
    envelope::MessageEnvelope,
    error::{IntegrityError, ProtoError},
};

const MESSAGE_AAD: &[u8] = b"duet-message-v1";

/// Ciphertext is as long as the plaintext (tag is detached), so this keeps
/// every sealed envelope within the wire codec's field limit.
pub const MAX_PLAINTEXT_LEN: usize = MAX_FIELD_LEN;

pub fn seal(
    plaintext: &[u8],
    shared_secret: &SharedSecret,
    signing: &SigningKeyPair,
) -> Result<MessageEnvelope, ProtoError> {
    if plaintext.len() > MAX_PLAINTEXT_LEN {
        return Err(ProtoError::TooLarge {
            what: "message plaintext",
            len: plaintext.len(),
            max: MAX_PLAINTEXT_LEN,
        });
    }
    let sealed = aead::seal(shared_secret.as_bytes(), plaintext, MESSAGE_AAD)?;
    let signature = signing.sign(&sealed.ciphertext);
    Ok(MessageEnvelope {
        ciphertext: sealed.ciphertext,
        nonce: sealed.nonce.to_vec(),
        tag: sealed.tag.to_vec(),
        signature: signature.to_vec(),
    })
}

pub fn open(
    envelope: &MessageEnvelope,
    shared_secret: &SharedSecret,
    remote_signing_public: &PublicKeyBytes,
) -> Result<Zeroizing<Vec<u8>>, ProtoError> {
    if SigningKeyPair::verify(
        remote_signing_public,
        &envelope.ciphertext,
        &envelope.signature,
    )
    .is_err()
    {
        warn!("discarding message: signature verification failed");
        return Err(IntegrityError::Signature.into());
    }

    aead::open(
        shared_secret.as_bytes(),
        &envelope.nonce,
        &envelope.tag,
        &envelope.ciphertext,
        MESSAGE_AAD,
    )
    .map_err(|_| {
        warn!("discarding message: authentication tag mismatch");
        IntegrityError::Tag.into()
    })
}
