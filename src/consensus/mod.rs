//! Consensus rules: network parameters, base-target adjustment, the
//! generation-signature chain, time-bending deadlines, block signatures and
//! full proof validation.

pub mod difficulty;
pub mod params;
pub mod proof;
pub mod signature;
pub mod time_bending;

pub use difficulty::{new_block_context, next_base_target, next_generation_signature, NewBlockContext};
pub use params::{CompressionBounds, ConsensusParams};
pub use proof::{validate_block, RejectReason, ValidOutcome};
pub use time_bending::time_bended_deadline;
