//! Nonce submissions and their acceptance rules.

use std::time::Instant;

use crate::address::AccountId;

/// A candidate nonce handed to the scheduler by a miner.
#[derive(Clone, Debug)]
pub struct NonceSubmission {
    pub account_id: AccountId,
    pub seed: [u8; 32],
    pub nonce: u64,
    pub quality: u64,
    pub compression: u32,
    /// Height the miner computed this submission for.
    pub expected_height: i32,
    /// Generation signature the miner computed this submission for.
    pub gen_sig: [u8; 32],
    pub submitted_at: Instant,
}

impl NonceSubmission {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        account_id: AccountId,
        seed: [u8; 32],
        nonce: u64,
        quality: u64,
        compression: u32,
        expected_height: i32,
        gen_sig: [u8; 32],
    ) -> Self {
        NonceSubmission {
            account_id,
            seed,
            nonce,
            quality,
            compression,
            expected_height,
            gen_sig,
            submitted_at: Instant::now(),
        }
    }

    /// A submission only counts for the exact context it was mined for.
    pub fn matches_context(&self, height: i32, gen_sig: &[u8; 32]) -> bool {
        self.expected_height == height && &self.gen_sig == gen_sig
    }
}

/// Lower quality wins; a submission must be strictly better to replace the
/// current candidate.
pub fn improves_on(new_quality: u64, current_best: Option<u64>) -> bool {
    match current_best {
        None => true,
        Some(best) => new_quality < best,
    }
}
