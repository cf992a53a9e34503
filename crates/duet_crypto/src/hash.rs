//! BLAKE3 fingerprints for out-of-band key comparison.

/// BLAKE3 of `data` truncated to 20 bytes (160 bits), hex-encoded in groups
/// of 4 for display.
pub fn fingerprint(data: &[u8]) -> String {
    let digest = blake3::hash(data);
    let hex = hex::encode(&digest.as_bytes()[..20]);
    hex.as_bytes()
        .chunks(4)
        .map(|c| String::from_utf8_lossy(c).into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}
