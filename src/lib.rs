//! Proof-of-Capacity-neXt (PoCX) consensus core.
//!
//! Replaces proof-of-work with a capacity lottery: miners precompute plot
//! files, read the scoop selected by the current block, and compete with the
//! lowest Shabal-derived quality inside a difficulty-gated deadline.
//!
//! The crate covers the plot/quality engine, base-target adjustment and the
//! generation-signature chain, the time-bending deadline transform, the
//! forging scheduler, the on-chain forging-assignment state machine, and
//! bit-exact proof validation for incoming blocks. The surrounding node
//! (UTXO set, mempool, block storage, wallet keys, RPC transport) is reached
//! through the traits in [`interfaces`].

pub mod address;
pub mod assignments;
pub mod consensus;
pub mod crypto;
pub mod encoding;
pub mod interfaces;
pub mod plot;
pub mod primitives;
pub mod rpc;
pub mod scheduler;
pub mod wallet;

pub use address::AccountId;
pub use consensus::params::ConsensusParams;
pub use consensus::difficulty::NewBlockContext;
pub use interfaces::{BlockIndex, BlockSubmitter, BlockTemplateBuilder, ChainView, CoinView, Signer};
pub use primitives::block::{Block, BlockHeader, PoCXProof};
pub use scheduler::ForgingScheduler;
