//! Encrypted message envelope - what the transport sees.
//!
//! The transport only ever sees opaque bytes: ciphertext, nonce, tag and the
//! sender's signature over the ciphertext. It carries no plaintext, no
//! sender/recipient identifiers and no ordering information.

use serde::{Deserialize, Serialize};

use crate::{
    codec::{serde_b64, FrameReader, FrameWriter, WireRecord},
    error::ProtoError,
};

/// On-wire envelope, produced by `messenger::seal` and consumed once by
/// `messenger::open`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEnvelope {
    /// XChaCha20-Poly1305 ciphertext (tag stored separately).
    #[serde(with = "serde_b64")]
    pub ciphertext: Vec<u8>,

    /// Random 24-byte nonce.
    #[serde(with = "serde_b64")]
    pub nonce: Vec<u8>,

    /// 16-byte Poly1305 tag.
    #[serde(with = "serde_b64")]
    pub tag: Vec<u8>,

    /// Ed25519 signature over `ciphertext`.
    #[serde(with = "serde_b64")]
    pub signature: Vec<u8>,
}

impl MessageEnvelope {
    pub fn to_json(&self) -> Result<String, ProtoError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(s: &str) -> Result<Self, ProtoError> {
        Ok(serde_json::from_str(s)?)
    }
}

impl WireRecord for MessageEnvelope {
    const NAME: &'static str = "message envelope";
    const MAGIC: [u8; 4] = *b"DME1";
    const VERSION: u8 = 1;

    fn encode_fields(&self, w: &mut FrameWriter) -> Result<(), ProtoError> {
        w.bytes(&self.nonce)?
            .bytes(&self.tag)?
            .bytes(&self.ciphertext)?
            .bytes(&self.signature)?;
        Ok(())
    }

    // Field lengths are not checked here: a wrong-length nonce, tag or
    // signature is an integrity failure in `messenger::open`.
    fn decode_fields(_version: u8, r: &mut FrameReader<'_>) -> Result<Self, ProtoError> {
        let nonce = r.bytes()?.to_vec();
        let tag = r.bytes()?.to_vec();
        let ciphertext = r.bytes()?.to_vec();
        let signature = r.bytes()?.to_vec();
        Ok(Self {
            ciphertext,
            nonce,
            tag,
            signature,
        })
    }
}
