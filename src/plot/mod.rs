//! Deterministic plot data generation.
//!
//! A nonce is 256 KiB of chained Shabal-256 output laid out as 4096 scoops
//! of 64 bytes. Generation starts from a seed hash at the buffer tail,
//! repeatedly prepends hashes over the growing tail (capped at
//! [`HASH_CAP`] bytes once the chain is long enough), XORs a final
//! whole-buffer hash over everything, and scatters the result into the
//! scoop-major cache layout plotters and the validator share.

pub mod quality;

use thiserror::Error;

use crate::crypto::shabal256;
use crate::encoding::{bytes_to_u32_le, u64_to_u32_be};

pub const MESSAGE_SIZE: usize = 16;
pub const HASH_SIZE: usize = 32;
pub const HASH_CAP: usize = 4096;
pub const NUM_SCOOPS: usize = 4096;
pub const SCOOP_SIZE: usize = 64;
pub const NONCE_SIZE: usize = NUM_SCOOPS * SCOOP_SIZE;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlotError {
    #[error("cache too small: need {need} bytes, have {have}")]
    CacheTooSmall { need: usize, have: usize },
    #[error("cache length {0} is not a whole number of nonces")]
    CacheNotAligned(usize),
    #[error("cache offset {offset} out of range for {count} nonces")]
    OffsetOutOfRange { offset: usize, count: usize },
    #[error("scoop {0} out of range")]
    ScoopOutOfRange(u64),
}

/// Generate `num_nonces` consecutive nonces into the scoop-major `cache`.
///
/// The cache holds `cache.len() / NONCE_SIZE` nonces; scoop `s` of the
/// nonce at slot `k` occupies
/// `cache[s * SCOOP_SIZE * count + k * SCOOP_SIZE ..][..SCOOP_SIZE]`.
/// `cache_offset` is the slot of the first generated nonce.
pub fn generate_nonces(
    cache: &mut [u8],
    cache_offset: usize,
    address_payload: &[u8; 20],
    seed: &[u8; 32],
    start_nonce: u64,
    num_nonces: u64,
) -> Result<(), PlotError> {
    if cache.len() % NONCE_SIZE != 0 {
        return Err(PlotError::CacheNotAligned(cache.len()));
    }
    let cache_nonces = cache.len() / NONCE_SIZE;
    let need = (cache_offset + num_nonces as usize) * NONCE_SIZE;
    if cache.len() < need {
        return Err(PlotError::CacheTooSmall {
            need,
            have: cache.len(),
        });
    }
    if cache_offset >= cache_nonces {
        return Err(PlotError::OffsetOutOfRange {
            offset: cache_offset,
            count: cache_nonces,
        });
    }

    let mut payload_words = [0u32; 5];
    bytes_to_u32_le(address_payload, &mut payload_words);
    let mut seed_words = [0u32; 8];
    bytes_to_u32_le(seed, &mut seed_words);

    // Termination templates. t1 seeds and finalizes full-context hashes,
    // t2/pt2 carry the seed through the short-tail rounds, t3 terminates
    // the capped rounds.
    let mut t1 = [0u32; MESSAGE_SIZE];
    t1[0..8].copy_from_slice(&seed_words);
    t1[8..13].copy_from_slice(&payload_words);
    t1[15] = 0x80;

    let mut t2 = [0u32; MESSAGE_SIZE];
    t2[0..5].copy_from_slice(&payload_words);
    t2[7] = 0x80;

    let mut pt2 = [0u32; MESSAGE_SIZE];
    pt2[8..16].copy_from_slice(&seed_words);

    let mut t3 = [0u32; MESSAGE_SIZE];
    t3[0] = 0x80;

    // One scratch nonce, reused for every generated nonce.
    let mut buffer = vec![0u8; NONCE_SIZE];

    for n in 0..num_nonces {
        let nonce_words = u64_to_u32_be(start_nonce + n);
        t1[13] = nonce_words[1];
        t1[14] = nonce_words[0];
        t2[5] = nonce_words[1];
        t2[6] = nonce_words[0];

        let hash = shabal256(&[], None, &t1);
        buffer[NONCE_SIZE - HASH_SIZE..].copy_from_slice(&hash);
        bytes_to_u32_le(&hash, &mut pt2[0..8]);

        // Short tail: hash everything from i to the end until the tail
        // reaches HASH_CAP. Every other round the data length is a whole
        // number of 64-byte blocks and t1 terminates on its own; otherwise
        // the trailing half block travels via pt2/t2.
        for i in (NONCE_SIZE - HASH_CAP + HASH_SIZE..=NONCE_SIZE - HASH_SIZE)
            .rev()
            .step_by(HASH_SIZE)
        {
            let hash = if i % 64 == 0 {
                shabal256(&buffer[i..], None, &t1)
            } else {
                shabal256(&buffer[i..], Some(&pt2), &t2)
            };
            buffer[i - HASH_SIZE..i].copy_from_slice(&hash);
        }

        // Long tail: fixed HASH_CAP window.
        for i in (HASH_SIZE..=NONCE_SIZE - HASH_CAP).rev().step_by(HASH_SIZE) {
            let hash = shabal256(&buffer[i..i + HASH_CAP], None, &t3);
            buffer[i - HASH_SIZE..i].copy_from_slice(&hash);
        }

        let final_hash = shabal256(&buffer, None, &t1);
        for (i, byte) in buffer.iter_mut().enumerate() {
            *byte ^= final_hash[i % HASH_SIZE];
        }

        scatter_nonce(&buffer, cache, cache_nonces, cache_offset + n as usize);
    }

    Ok(())
}

/// Distribute one generated nonce into the scoop-major cache layout.
///
/// Source chunk `i` (of 8192 half-scoops) lands in scoop `i/2` for even
/// `i` (first half) and in the mirrored scoop `4095 - i/2` for odd `i`
/// (second half).
fn scatter_nonce(buffer: &[u8], cache: &mut [u8], cache_nonces: usize, slot: usize) {
    for i in 0..NUM_SCOOPS * 2 {
        let scoop = if i & 1 == 1 { 4095 - (i >> 1) } else { i >> 1 };
        let dst = scoop * SCOOP_SIZE * cache_nonces + slot * SCOOP_SIZE + (i & 1) * HASH_SIZE;
        let src = i * HASH_SIZE;
        cache[dst..dst + HASH_SIZE].copy_from_slice(&buffer[src..src + HASH_SIZE]);
    }
}
