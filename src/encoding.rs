//! Strict value-level encoding helpers shared by the consensus core.
//!
//! Hex decoding here is deliberately unforgiving: miners talk to the node in
//! fixed-width hex fields, and a silently truncated seed or account id would
//! produce a plot that never validates.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodingError {
    #[error("expected {expected} hex characters, got {got}")]
    BadHexLength { expected: usize, got: usize },
    #[error("invalid hex digit")]
    BadHexDigit,
}

/// Decode exactly 32 bytes of hex (64 characters). No `0x` prefix.
pub fn hex32(s: &str) -> Result<[u8; 32], EncodingError> {
    let mut out = [0u8; 32];
    decode_fixed(s, &mut out)?;
    Ok(out)
}

/// Decode exactly 20 bytes of hex (40 characters). No `0x` prefix.
pub fn hex20(s: &str) -> Result<[u8; 20], EncodingError> {
    let mut out = [0u8; 20];
    decode_fixed(s, &mut out)?;
    Ok(out)
}

fn decode_fixed(s: &str, out: &mut [u8]) -> Result<(), EncodingError> {
    if s.len() != out.len() * 2 {
        return Err(EncodingError::BadHexLength {
            expected: out.len() * 2,
            got: s.len(),
        });
    }
    hex::decode_to_slice(s, out).map_err(|_| EncodingError::BadHexDigit)
}

/// Pack bytes into little-endian u32 words. `bytes.len()` must be a
/// multiple of 4 and `out` must hold `bytes.len() / 4` words.
pub fn bytes_to_u32_le(bytes: &[u8], out: &mut [u32]) {
    debug_assert_eq!(bytes.len() % 4, 0);
    debug_assert!(out.len() >= bytes.len() / 4);
    for (i, chunk) in bytes.chunks_exact(4).enumerate() {
        out[i] = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
}

/// Split a u64 into two u32 words of its big-endian representation:
/// word 0 carries bytes 0..4, word 1 carries bytes 4..8.
pub fn u64_to_u32_be(value: u64) -> [u32; 2] {
    let be = value.to_be_bytes();
    [
        u32::from_le_bytes([be[0], be[1], be[2], be[3]]),
        u32::from_le_bytes([be[4], be[5], be[6], be[7]]),
    ]
}
