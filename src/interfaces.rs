//! Trait seams to the surrounding node.
//!
//! The consensus core never owns the chain database, the mempool or wallet
//! keys. It sees the chain through [`ChainView`], asks [`BlockTemplateBuilder`]
//! for candidate blocks, signs through [`Signer`] and hands finished blocks
//! to [`BlockSubmitter`].

use crate::address::AccountId;
use crate::assignments::ForgingAssignment;
use crate::primitives::block::{Block, PoCXProof};
use crate::primitives::transaction::{OutPoint, Script, TxOut};

/// Everything the core needs to know about one block in the active chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockIndex {
    pub height: i32,
    pub hash: [u8; 32],
    pub prev_hash: [u8; 32],
    pub time: u32,
    pub base_target: u64,
    pub gen_sig: [u8; 32],
    pub proof: PoCXProof,
}

/// Read access to coin state and the assignment records derived from it.
pub trait CoinView: Send + Sync {
    /// The forging assignment stored for a plot, if any. `height` is the
    /// height the caller evaluates state at.
    fn forging_assignment(&self, plot: &AccountId, height: i32) -> Option<ForgingAssignment>;

    /// The unspent output a prevout refers to.
    fn coin(&self, outpoint: &OutPoint) -> Option<TxOut>;
}

/// Read access to the active chain.
pub trait ChainView: CoinView {
    fn active_tip(&self) -> Option<BlockIndex>;

    /// Block of the active chain at the given height.
    fn ancestor(&self, height: i32) -> Option<BlockIndex>;

    fn is_initial_block_download(&self) -> bool {
        false
    }
}

#[derive(Clone, Debug)]
pub struct BlockTemplateOptions {
    pub coinbase_script: Script,
    pub use_mempool: bool,
}

/// Assembles a candidate block on top of the active tip: header context
/// fields and transactions filled in, proof and signature still blank.
pub trait BlockTemplateBuilder: Send + Sync {
    fn create(&self, options: BlockTemplateOptions) -> anyhow::Result<Block>;
}

/// Wallet-side signing operations keyed by account id.
pub trait Signer: Send + Sync {
    fn have_key(&self, account: &AccountId) -> bool;

    /// Compressed public key whose HASH160 is `account`.
    fn pubkey(&self, account: &AccountId) -> Option<[u8; 33]>;

    /// Compact recoverable ECDSA signature over a 32-byte hash.
    fn sign_compact(&self, account: &AccountId, hash: &[u8; 32]) -> Option<[u8; 65]>;
}

/// Hands a completed block to the host's validation pipeline.
pub trait BlockSubmitter: Send + Sync {
    /// Returns whether the block was accepted.
    fn process_new_block(&self, block: &Block, force_processing: bool, min_pow_checked: bool)
        -> bool;
}
