//! Quality evaluation: scoop selection, compressed scoop generation, and
//! the Shabal-lite reduction to a 64-bit quality. Lower is better.

use crate::crypto::{shabal256, shabal256_lite};
use crate::encoding::bytes_to_u32_le;

use super::{generate_nonces, PlotError, MESSAGE_SIZE, NONCE_SIZE, NUM_SCOOPS, SCOOP_SIZE};

/// Select the scoop index read for a block: hash of
/// `gen_sig ‖ height_be ‖ 0x80`, low 12 bits of the output tail.
pub fn calculate_scoop(block_height: u64, gen_sig: &[u8; 32]) -> u32 {
    let mut data = [0u8; 64];
    data[..32].copy_from_slice(gen_sig);
    data[32..40].copy_from_slice(&block_height.to_be_bytes());
    data[40] = 0x80;

    let mut term = [0u32; MESSAGE_SIZE];
    bytes_to_u32_le(&data, &mut term);

    let hash = shabal256(&[], None, &term);
    (u32::from(hash[30] & 0x0F) << 8) | u32::from(hash[31])
}

/// Generate the scoop data for a nonce at a compression level.
///
/// Compression level `c` XORs the scoops of `2^c` underlying nonces; the
/// underlying nonce indices interleave the warp so that odd sub-nonces swap
/// the scoop and in-warp coordinates.
pub fn generate_scoop(
    address_payload: &[u8; 20],
    seed: &[u8; 32],
    scoop: u64,
    nonce: u64,
    compression: u32,
) -> Result<[u8; SCOOP_SIZE], PlotError> {
    if scoop >= NUM_SCOOPS as u64 {
        return Err(PlotError::ScoopOutOfRange(scoop));
    }

    let warp = nonce / NUM_SCOOPS as u64;
    let nonce_in_warp = nonce % NUM_SCOOPS as u64;
    let sub_nonces = 1u64 << compression;

    let mut result = [0u8; SCOOP_SIZE];
    // One scratch nonce shared by all sub-nonces of this evaluation.
    let mut nonce_buffer = vec![0u8; NONCE_SIZE];

    for i in 0..sub_nonces {
        let (scoop_x, in_warp_x) = if i % 2 == 0 {
            (scoop, nonce_in_warp)
        } else {
            (nonce_in_warp, scoop)
        };
        let warp_x = sub_nonces * warp + i;
        let nonce_x = warp_x * NUM_SCOOPS as u64 + in_warp_x;

        generate_nonces(&mut nonce_buffer, 0, address_payload, seed, nonce_x, 1)?;

        let start = scoop_x as usize * SCOOP_SIZE;
        for (out, byte) in result.iter_mut().zip(&nonce_buffer[start..start + SCOOP_SIZE]) {
            *out ^= byte;
        }
    }

    Ok(result)
}

/// Full quality evaluation for a submission or an incoming block proof.
pub fn calculate_quality(
    address_payload: &[u8; 20],
    seed: &[u8; 32],
    nonce: u64,
    compression: u32,
    block_height: u64,
    gen_sig: &[u8; 32],
) -> Result<u64, PlotError> {
    let scoop = calculate_scoop(block_height, gen_sig);
    let scoop_data = generate_scoop(address_payload, seed, scoop as u64, nonce, compression)?;
    Ok(shabal256_lite(&scoop_data, gen_sig))
}

/// Best quality a nonce achieves across a compression range. Useful for
/// miners probing which level to plot at; never used for validation.
pub fn best_quality_in_range(
    address_payload: &[u8; 20],
    seed: &[u8; 32],
    nonce: u64,
    min_compression: u32,
    max_compression: u32,
    block_height: u64,
    gen_sig: &[u8; 32],
) -> Result<u64, PlotError> {
    let scoop = calculate_scoop(block_height, gen_sig);
    let mut best = u64::MAX;
    for compression in min_compression..=max_compression {
        let data = generate_scoop(address_payload, seed, scoop as u64, nonce, compression)?;
        best = best.min(shabal256_lite(&data, gen_sig));
    }
    Ok(best)
}
