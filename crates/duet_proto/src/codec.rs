//! Wire codec - versioned framing shared by every persisted / transmitted
//! record.
//!
//! # Frame layout
//!   [ magic (4 bytes) | version (1 byte) | field* ]
//!
//! Each byte field is `len: u32 BE | bytes`; integers are plain `u32 BE`.
//! Fields appear in a fixed order per record type. Trailing bytes after the
//! last field are rejected, so a record round-trips byte-exact.
//!
//! Text-oriented stores and transports use standard padded base64 of the
//! whole frame.

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::error::ProtoError;

/// Upper bound for any single field (16 MiB).
pub const MAX_FIELD_LEN: usize = 16 * 1024 * 1024;

/// A record type with a stable, versioned wire form.
pub trait WireRecord: Sized {
    /// Human-readable record name used in errors.
    const NAME: &'static str;
    const MAGIC: [u8; 4];
    const VERSION: u8;

    fn encode_fields(&self, w: &mut FrameWriter) -> Result<(), ProtoError>;

    /// Decode the fields of a frame whose header carried `version`.
    fn decode_fields(version: u8, r: &mut FrameReader<'_>) -> Result<Self, ProtoError>;

    /// Fails only if a field exceeds `MAX_FIELD_LEN`.
    fn to_bytes(&self) -> Result<Vec<u8>, ProtoError> {
        let mut w = FrameWriter::new(Self::NAME, Self::MAGIC, Self::VERSION);
        self.encode_fields(&mut w)?;
        Ok(w.finish())
    }

    fn from_bytes(data: &[u8]) -> Result<Self, ProtoError> {
        let (mut r, version) = FrameReader::open(data, Self::NAME, Self::MAGIC)?;
        if version != Self::VERSION {
            return Err(ProtoError::UnsupportedVersion {
                what: Self::NAME,
                version,
            });
        }
        let record = Self::decode_fields(version, &mut r)?;
        r.finish()?;
        Ok(record)
    }

    fn to_base64(&self) -> Result<String, ProtoError> {
        Ok(STANDARD.encode(self.to_bytes()?))
    }

    fn from_base64(s: &str) -> Result<Self, ProtoError> {
        Self::from_bytes(&STANDARD.decode(s.trim())?)
    }
}

pub struct FrameWriter {
    what: &'static str,
    buf: Vec<u8>,
}

impl FrameWriter {
    fn new(what: &'static str, magic: [u8; 4], version: u8) -> Self {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(&magic);
        buf.push(version);
        Self { what, buf }
    }

    /// Same bound as `FrameReader::bytes`, so every written frame decodes.
    pub fn bytes(&mut self, field: &[u8]) -> Result<&mut Self, ProtoError> {
        let len = u32::try_from(field.len())
            .ok()
            .filter(|&len| len as usize <= MAX_FIELD_LEN)
            .ok_or(ProtoError::TooLarge {
                what: self.what,
                len: field.len(),
                max: MAX_FIELD_LEN,
            })?;
        self.buf.extend_from_slice(&len.to_be_bytes());
        self.buf.extend_from_slice(field);
        Ok(self)
    }

    pub fn u32(&mut self, value: u32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    fn finish(self) -> Vec<u8> {
        self.buf
    }
}

pub struct FrameReader<'a> {
    what: &'static str,
    data: &'a [u8],
    pos: usize,
}

impl<'a> FrameReader<'a> {
    fn open(
        data: &'a [u8],
        what: &'static str,
        magic: [u8; 4],
    ) -> Result<(Self, u8), ProtoError> {
        if data.len() < 5 {
            return Err(ProtoError::malformed(what, "too short for header"));
        }
        if data[..4] != magic {
            return Err(ProtoError::malformed(what, "bad magic"));
        }
        let version = data[4];
        Ok((Self { what, data, pos: 5 }, version))
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ProtoError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| {
                ProtoError::malformed(self.what, format!("truncated at offset {}", self.pos))
            })?;
        let out = &self.data[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    pub fn u32(&mut self) -> Result<u32, ProtoError> {
        let raw = self.take(4)?;
        Ok(u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    pub fn bytes(&mut self) -> Result<&'a [u8], ProtoError> {
        let len = self.u32()? as usize;
        if len > MAX_FIELD_LEN {
            return Err(ProtoError::malformed(
                self.what,
                format!("field length {len} exceeds {MAX_FIELD_LEN}"),
            ));
        }
        self.take(len)
    }

    /// Fixed-size field; a length mismatch is malformed.
    pub fn array<const N: usize>(&mut self) -> Result<[u8; N], ProtoError> {
        let raw = self.bytes()?;
        raw.try_into().map_err(|_| {
            ProtoError::malformed(self.what, format!("expected {N}-byte field, got {}", raw.len()))
        })
    }

    fn finish(self) -> Result<(), ProtoError> {
        if self.pos != self.data.len() {
            return Err(ProtoError::malformed(
                self.what,
                format!("{} trailing bytes", self.data.len() - self.pos),
            ));
        }
        Ok(())
    }
}

/// Serde adapter: `Vec<u8>` as standard base64 text.
pub mod serde_b64 {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Sample {
        n: u32,
        blob: Vec<u8>,
    }

    impl WireRecord for Sample {
        const NAME: &'static str = "sample";
        const MAGIC: [u8; 4] = *b"TST1";
        const VERSION: u8 = 1;

        fn encode_fields(&self, w: &mut FrameWriter) -> Result<(), ProtoError> {
            w.u32(self.n).bytes(&self.blob)?;
            Ok(())
        }

        fn decode_fields(_version: u8, r: &mut FrameReader<'_>) -> Result<Self, ProtoError> {
            Ok(Self {
                n: r.u32()?,
                blob: r.bytes()?.to_vec(),
            })
        }
    }

    fn sample() -> Sample {
        Sample {
            n: 7,
            blob: b"hello".to_vec(),
        }
    }

    #[test]
    fn frame_layout_is_stable() {
        let bytes = sample().to_bytes().unwrap();
        assert_eq!(
            bytes,
            [
                b'T', b'S', b'T', b'1', 1, // header
                0, 0, 0, 7, // n
                0, 0, 0, 5, b'h', b'e', b'l', b'l', b'o', // blob
            ]
        );
        assert_eq!(Sample::from_bytes(&bytes).unwrap(), sample());
    }

    #[test]
    fn base64_form_roundtrips() {
        let text = sample().to_base64().unwrap();
        assert_eq!(Sample::from_base64(&text).unwrap(), sample());
    }

    #[test]
    fn truncated_frame_is_malformed() {
        let bytes = sample().to_bytes().unwrap();
        for cut in 0..bytes.len() {
            assert!(matches!(
                Sample::from_bytes(&bytes[..cut]),
                Err(ProtoError::Malformed { .. })
            ));
        }
    }

    #[test]
    fn trailing_bytes_rejected() {
        let mut bytes = sample().to_bytes().unwrap();
        bytes.push(0);
        assert!(matches!(
            Sample::from_bytes(&bytes),
            Err(ProtoError::Malformed { .. })
        ));
    }

    #[test]
    fn unknown_version_rejected() {
        let mut bytes = sample().to_bytes().unwrap();
        bytes[4] = 2;
        assert!(matches!(
            Sample::from_bytes(&bytes),
            Err(ProtoError::UnsupportedVersion { version: 2, .. })
        ));
    }

    #[test]
    fn huge_length_prefix_rejected() {
        let mut bytes = b"TST1\x01".to_vec();
        bytes.extend_from_slice(&0u32.to_be_bytes());
        bytes.extend_from_slice(&u32::MAX.to_be_bytes());
        assert!(matches!(
            Sample::from_bytes(&bytes),
            Err(ProtoError::Malformed { .. })
        ));
    }

    #[test]
    fn field_at_limit_roundtrips_and_above_is_refused() {
        let at_limit = Sample {
            n: 1,
            blob: vec![0xA5; MAX_FIELD_LEN],
        };
        let bytes = at_limit.to_bytes().unwrap();
        assert_eq!(Sample::from_bytes(&bytes).unwrap(), at_limit);

        let over = Sample {
            n: 1,
            blob: vec![0xA5; MAX_FIELD_LEN + 1],
        };
        assert!(matches!(
            over.to_bytes(),
            Err(ProtoError::TooLarge { len, max: MAX_FIELD_LEN, .. }) if len == MAX_FIELD_LEN + 1
        ));
    }
}
