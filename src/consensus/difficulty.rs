//! Base-target adjustment and the generation-signature chain.
//!
//! The base target moves with a rolling-window average: the window's actual
//! timespan (clamped to [half, double] of the target timespan) scales the
//! average base target, the step is clamped to ±20% of the previous value,
//! and the result never exceeds the genesis base target — difficulty is
//! never easier than genesis.

use thiserror::Error;

use crate::consensus::params::ConsensusParams;
use crate::crypto::sha256d;
use crate::interfaces::{BlockIndex, ChainView};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContextError {
    #[error("block chain tip is empty")]
    NoTip,
    #[error("missing ancestor at height {0}")]
    MissingAncestor(i32),
}

/// Snapshot of everything a miner or validator needs for the next block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewBlockContext {
    pub height: i32,
    pub gen_sig: [u8; 32],
    pub base_target: u64,
    pub block_hash: [u8; 32],
}

/// Base target for the block following `tip`.
pub fn next_base_target(
    tip: &BlockIndex,
    chain: &(impl ChainView + ?Sized),
    params: &ConsensusParams,
) -> Result<u64, ContextError> {
    let genesis_base_target = params.genesis_base_target();

    if tip.height == 0 {
        return Ok(genesis_base_target);
    }

    let prev_base_target = tip.base_target;

    // Truncated window on young chains: the genesis block participates.
    let lookback = params.rolling_window.min(tip.height);
    let first_height = tip.height - lookback + 1;
    let first = chain
        .ancestor(first_height)
        .ok_or(ContextError::MissingAncestor(first_height))?;

    let target_timespan = (i64::from(lookback) * params.target_spacing as i64).max(1);
    let mut actual_timespan = i64::from(tip.time) - i64::from(first.time);
    let min_timespan = (target_timespan / 2).max(1);
    actual_timespan = actual_timespan.clamp(min_timespan, target_timespan * 2);

    let mut total_base_target: u128 = 0;
    for height in first_height..=tip.height {
        let index = chain
            .ancestor(height)
            .ok_or(ContextError::MissingAncestor(height))?;
        total_base_target += u128::from(index.base_target);
    }
    let avg_base_target = total_base_target / u128::from(lookback as u64);

    let mut new_base_target =
        (avg_base_target * actual_timespan as u128 / target_timespan as u128) as u64;

    let max_increase = prev_base_target + prev_base_target / 5;
    let max_decrease = prev_base_target - prev_base_target / 5;
    new_base_target = new_base_target.clamp(max_decrease, max_increase);

    new_base_target = new_base_target.min(genesis_base_target).max(1);

    Ok(new_base_target)
}

/// Generation signature for the block following `tip`:
/// SHA-256d over the tip's generation signature and forging account.
pub fn next_generation_signature(tip: &BlockIndex) -> [u8; 32] {
    let mut data = [0u8; 52];
    data[..32].copy_from_slice(&tip.gen_sig);
    data[32..].copy_from_slice(&tip.proof.account_id.0);
    sha256d(&data)
}

/// Mining/validation context for the next block on the active chain.
pub fn new_block_context(
    chain: &(impl ChainView + ?Sized),
    params: &ConsensusParams,
) -> Result<NewBlockContext, ContextError> {
    let tip = chain.active_tip().ok_or(ContextError::NoTip)?;
    Ok(NewBlockContext {
        height: tip.height + 1,
        gen_sig: next_generation_signature(&tip),
        base_target: next_base_target(&tip, chain, params)?,
        block_hash: tip.hash,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::AccountId;
    use crate::assignments::ForgingAssignment;
    use crate::interfaces::CoinView;
    use crate::primitives::block::PoCXProof;
    use crate::primitives::transaction::{OutPoint, TxOut};

    /// A straight chain with chosen per-block times and base targets.
    struct FakeChain {
        blocks: Vec<BlockIndex>,
    }

    impl FakeChain {
        fn with_spacing(params: &ConsensusParams, count: usize, spacing: u64) -> FakeChain {
            let genesis_bt = params.genesis_base_target();
            let mut blocks = Vec::new();
            for height in 0..count {
                let mut hash = [0u8; 32];
                hash[..8].copy_from_slice(&(height as u64).to_le_bytes());
                let prev_hash = blocks
                    .last()
                    .map(|b: &BlockIndex| b.hash)
                    .unwrap_or([0u8; 32]);
                blocks.push(BlockIndex {
                    height: height as i32,
                    hash,
                    prev_hash,
                    time: (height as u64 * spacing) as u32,
                    base_target: genesis_bt,
                    gen_sig: [height as u8; 32],
                    proof: PoCXProof {
                        account_id: AccountId([0xAAu8; 20]),
                        nonce: 1,
                        ..PoCXProof::default()
                    },
                });
            }
            FakeChain { blocks }
        }

        fn tip(&self) -> BlockIndex {
            self.blocks.last().unwrap().clone()
        }
    }

    impl CoinView for FakeChain {
        fn forging_assignment(&self, _: &AccountId, _: i32) -> Option<ForgingAssignment> {
            None
        }
        fn coin(&self, _: &OutPoint) -> Option<TxOut> {
            None
        }
    }

    impl ChainView for FakeChain {
        fn active_tip(&self) -> Option<BlockIndex> {
            self.blocks.last().cloned()
        }
        fn ancestor(&self, height: i32) -> Option<BlockIndex> {
            self.blocks.get(height as usize).cloned()
        }
    }

    #[test]
    fn genesis_tip_returns_genesis_base_target() {
        let params = ConsensusParams::default();
        let chain = FakeChain::with_spacing(&params, 1, params.target_spacing);
        assert_eq!(
            next_base_target(&chain.tip(), &chain, &params).unwrap(),
            params.genesis_base_target()
        );
    }

    #[test]
    fn steady_chain_keeps_base_target() {
        let params = ConsensusParams::default();
        let chain = FakeChain::with_spacing(&params, 50, params.target_spacing);
        // Blocks arriving exactly on schedule at the genesis target: the
        // cap keeps the target pinned there.
        assert_eq!(
            next_base_target(&chain.tip(), &chain, &params).unwrap(),
            params.genesis_base_target()
        );
    }

    #[test]
    fn slow_blocks_cannot_exceed_genesis() {
        let params = ConsensusParams::default();
        // Twice the target spacing: the raw adjustment wants to double the
        // base target; the genesis cap holds it.
        let chain = FakeChain::with_spacing(&params, 50, params.target_spacing * 2);
        assert_eq!(
            next_base_target(&chain.tip(), &chain, &params).unwrap(),
            params.genesis_base_target()
        );
    }

    #[test]
    fn fast_blocks_clamped_to_twenty_percent_step() {
        let params = ConsensusParams::default();
        // Blocks ten times too fast: the window wants an 80% cut but a
        // single step may only move 20%.
        let chain = FakeChain::with_spacing(&params, 50, params.target_spacing / 10);
        let tip = chain.tip();
        let next = next_base_target(&tip, &chain, &params).unwrap();
        assert_eq!(next, tip.base_target - tip.base_target / 5);
    }

    #[test]
    fn adjustment_stays_within_caps_with_mixed_targets() {
        let params = ConsensusParams::default();
        let mut chain = FakeChain::with_spacing(&params, 50, params.target_spacing);
        // Lower historical base targets so the average pulls downward.
        for block in chain.blocks.iter_mut() {
            block.base_target /= 3;
        }
        let tip = chain.tip();
        let next = next_base_target(&tip, &chain, &params).unwrap();
        assert!(next >= tip.base_target - tip.base_target / 5);
        assert!(next <= tip.base_target + tip.base_target / 5);
        assert!(next <= params.genesis_base_target());
        assert!(next >= 1);
    }

    #[test]
    fn generation_signature_chains_over_gen_sig_and_account() {
        let params = ConsensusParams::default();
        let chain = FakeChain::with_spacing(&params, 3, params.target_spacing);
        let tip = chain.tip();

        let mut data = [0u8; 52];
        data[..32].copy_from_slice(&tip.gen_sig);
        data[32..].copy_from_slice(&tip.proof.account_id.0);
        assert_eq!(next_generation_signature(&tip), sha256d(&data));

        // Different forging account, different next signature.
        let mut other = tip.clone();
        other.proof.account_id = AccountId([0xBBu8; 20]);
        assert_ne!(next_generation_signature(&other), next_generation_signature(&tip));
    }

    #[test]
    fn context_reflects_tip() {
        let params = ConsensusParams::default();
        let chain = FakeChain::with_spacing(&params, 10, params.target_spacing);
        let context = new_block_context(&chain, &params).unwrap();
        let tip = chain.tip();
        assert_eq!(context.height, tip.height + 1);
        assert_eq!(context.block_hash, tip.hash);
        assert_eq!(context.gen_sig, next_generation_signature(&tip));
    }
}
