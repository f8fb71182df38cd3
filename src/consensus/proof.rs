//! Full validation of an incoming block's capacity proof.
//!
//! Everything here is recomputed from the parent and the chain view; the
//! header's claims (base target, generation signature, quality) are only
//! accepted when they match bit-exactly.

use thiserror::Error;
use tracing::debug;

use crate::address::AccountId;
use crate::assignments::effective_signer;
use crate::consensus::difficulty::{next_base_target, next_generation_signature, ContextError};
use crate::consensus::params::ConsensusParams;
use crate::consensus::signature::{recover_pubkey, SignatureError};
use crate::consensus::time_bending::time_bended_deadline;
use crate::interfaces::{BlockIndex, ChainView};
use crate::plot::quality::calculate_quality;
use crate::plot::PlotError;
use crate::primitives::block::{block_signature_hash, Block};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RejectReason {
    #[error("capacity proof is null")]
    NullProof,
    #[error("proof account id is all zeros")]
    NullAccount,
    #[error("block does not extend the given parent")]
    WrongParent,
    #[error("bad height: expected {expected}, got {got}")]
    BadHeight { expected: i32, got: i32 },
    #[error("compression {compression} outside [{min}, {max}] at this height")]
    CompressionOutOfRange {
        compression: u32,
        min: u32,
        max: u32,
    },
    #[error("base target mismatch: expected {expected}, got {got}")]
    BaseTargetMismatch { expected: u64, got: u64 },
    #[error("generation signature mismatch")]
    GenerationSignatureMismatch,
    #[error("quality mismatch: computed {computed}, claimed {claimed}")]
    QualityMismatch { computed: u64, claimed: u64 },
    #[error("quality computation failed: {0}")]
    QualityComputation(PlotError),
    #[error("block signature invalid: {0}")]
    BadSignature(SignatureError),
    #[error("recovered pubkey does not match the block header")]
    PubkeyMismatch,
    #[error("signer is not the effective signer for the plot")]
    SignerMismatch,
    #[error("block time {block_time} is ahead of its deadline ({parent_time} + {deadline})")]
    AheadOfDeadline {
        block_time: u32,
        parent_time: u32,
        deadline: u64,
    },
    #[error("chain context unavailable: {0}")]
    Context(ContextError),
}

/// What a successful validation established.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValidOutcome {
    pub quality: u64,
    pub deadline: u64,
    pub signer: AccountId,
}

/// Validate a block's capacity proof, signature and timing against its
/// parent on the active chain.
pub fn validate_block(
    block: &Block,
    parent: &BlockIndex,
    chain: &(impl ChainView + ?Sized),
    params: &ConsensusParams,
) -> Result<ValidOutcome, RejectReason> {
    let header = &block.header;
    let proof = &header.proof;

    if proof.is_null() {
        return Err(RejectReason::NullProof);
    }
    if proof.account_id.is_zero() {
        return Err(RejectReason::NullAccount);
    }
    if header.prev_hash != parent.hash {
        return Err(RejectReason::WrongParent);
    }
    if header.height != parent.height + 1 {
        return Err(RejectReason::BadHeight {
            expected: parent.height + 1,
            got: header.height,
        });
    }

    let bounds = params.compression_bounds(i64::from(header.height));
    if proof.compression < bounds.min_compression || proof.compression > bounds.target_compression {
        return Err(RejectReason::CompressionOutOfRange {
            compression: proof.compression,
            min: bounds.min_compression,
            max: bounds.target_compression,
        });
    }

    let expected_base_target =
        next_base_target(parent, chain, params).map_err(RejectReason::Context)?;
    if header.base_target != expected_base_target {
        return Err(RejectReason::BaseTargetMismatch {
            expected: expected_base_target,
            got: header.base_target,
        });
    }

    if header.gen_sig != next_generation_signature(parent) {
        return Err(RejectReason::GenerationSignatureMismatch);
    }

    let quality = calculate_quality(
        &proof.account_id.0,
        &proof.seed,
        proof.nonce,
        proof.compression,
        header.height as u64,
        &header.gen_sig,
    )
    .map_err(RejectReason::QualityComputation)?;
    if quality != proof.quality {
        return Err(RejectReason::QualityMismatch {
            computed: quality,
            claimed: proof.quality,
        });
    }

    verify_block_signature(block, chain)?;

    let deadline = time_bended_deadline(quality, header.base_target, params.target_spacing);
    let earliest = u64::from(parent.time) + deadline;
    if u64::from(header.time) < earliest {
        return Err(RejectReason::AheadOfDeadline {
            block_time: header.time,
            parent_time: parent.time,
            deadline,
        });
    }

    debug!(target: "pocx::validation", height = header.height, quality, deadline,
           "capacity proof valid");

    Ok(ValidOutcome {
        quality,
        deadline,
        signer: effective_signer(&proof.account_id, header.height, chain),
    })
}

/// Verify the compact block signature and that its key is the effective
/// signer for the plot at this height.
pub fn verify_block_signature(
    block: &Block,
    chain: &(impl ChainView + ?Sized),
) -> Result<(), RejectReason> {
    let header = &block.header;

    let signing_hash = block_signature_hash(&header.hash());
    let recovered =
        recover_pubkey(&signing_hash, &header.signature).map_err(RejectReason::BadSignature)?;
    if recovered != header.pubkey {
        return Err(RejectReason::PubkeyMismatch);
    }

    let signer_account = AccountId::from_pubkey(&recovered);
    let expected = effective_signer(&header.proof.account_id, header.height, chain);
    if signer_account != expected {
        debug!(target: "pocx::validation", plot = %header.proof.account_id,
               signer = %signer_account, expected = %expected,
               "block signer is not the effective signer");
        return Err(RejectReason::SignerMismatch);
    }

    Ok(())
}
