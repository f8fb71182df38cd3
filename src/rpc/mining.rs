//! `get_mining_info` and `submit_nonce`.

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::address::AccountId;
use crate::assignments::effective_signer;
use crate::consensus::difficulty::new_block_context;
use crate::consensus::time_bending::time_bended_deadline;
use crate::encoding::hex32;
use crate::plot::quality::calculate_quality;
use crate::scheduler::{NonceSubmission, SubmitError};

use super::{
    NodeState, RpcError, RPC_IN_INITIAL_DOWNLOAD, RPC_INTERNAL_ERROR, RPC_INVALID_ADDRESS_OR_KEY,
    RPC_QUEUE_FULL,
};

/// Current mining context for capacity miners.
pub fn get_mining_info(node: &NodeState) -> Result<Value, RpcError> {
    if node.chain.is_initial_block_download() {
        return Err(RpcError::new(
            RPC_IN_INITIAL_DOWNLOAD,
            "Is initial block downloading!",
        ));
    }

    let context = new_block_context(node.chain.as_ref(), &node.params)
        .map_err(|e| RpcError::new(RPC_INTERNAL_ERROR, e.to_string()))?;
    let bounds = node.params.compression_bounds(i64::from(context.height));

    Ok(json!({
        "generation_signature": hex::encode(context.gen_sig),
        "base_target": context.base_target,
        "height": context.height,
        "block_hash": hex::encode(context.block_hash),
        "target_quality": u64::MAX,
        "minimum_compression_level": bounds.min_compression,
        "target_compression_level": bounds.target_compression,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SubmitNonceParams {
    pub height: i32,
    pub generation_signature: String,
    pub account_id: String,
    pub seed: String,
    pub nonce: u64,
    pub compression: u32,
    /// Advisory only; the node recomputes quality itself.
    #[serde(default)]
    pub quality: Option<u64>,
}

/// Validate a miner's nonce and queue it for timed forging.
pub fn submit_nonce(node: &NodeState, params: SubmitNonceParams) -> Result<Value, RpcError> {
    if node.chain.is_initial_block_download() {
        return Err(RpcError::new(
            RPC_IN_INITIAL_DOWNLOAD,
            "Is initial block downloading!",
        ));
    }

    // Cheap format checks before touching the chain.
    let account_id = AccountId::from_hex(&params.account_id).map_err(|_| {
        RpcError::invalid_parameter("Invalid account_id format - must be 40 hex characters")
    })?;
    let seed = hex32(&params.seed).map_err(|_| {
        RpcError::invalid_parameter("Invalid seed format - must be 64 hex characters")
    })?;

    let context = new_block_context(node.chain.as_ref(), &node.params)
        .map_err(|e| RpcError::new(RPC_INTERNAL_ERROR, e.to_string()))?;

    if params.height != context.height {
        return Err(RpcError::invalid_parameter(format!(
            "Invalid height: expected {}, got {}",
            context.height, params.height
        )));
    }

    let submitted_gen_sig = hex32(&params.generation_signature)
        .map_err(|_| RpcError::verify_rejected("Generation signature mismatch"))?;
    if submitted_gen_sig != context.gen_sig {
        return Err(RpcError::verify_rejected("Generation signature mismatch"));
    }

    // Resolve the effective signer before doing proof work; a plot whose
    // signer we cannot sign for can never be forged here.
    let signer_account = effective_signer(&account_id, context.height, node.chain.as_ref());
    if !node.signer.have_key(&signer_account) {
        return Err(RpcError::new(
            RPC_INVALID_ADDRESS_OR_KEY,
            format!(
                "No private key available for effective signer {} (plot: {})",
                signer_account, account_id
            ),
        ));
    }

    let bounds = node.params.compression_bounds(i64::from(context.height));
    if params.compression < bounds.min_compression
        || params.compression > bounds.target_compression
    {
        return Err(RpcError::invalid_parameter(format!(
            "Invalid compression level {}: must be in range [{}, {}]",
            params.compression, bounds.min_compression, bounds.target_compression
        )));
    }

    // The expensive part: recompute quality at the claimed compression.
    let raw_quality = calculate_quality(
        &account_id.0,
        &seed,
        params.nonce,
        params.compression,
        context.height as u64,
        &context.gen_sig,
    )
    .map_err(|e| RpcError::verify_rejected(format!("PoCX validation failed: {e}")))?;

    let deadline_seconds = raw_quality / context.base_target.max(1);
    let forge_time = time_bended_deadline(
        raw_quality,
        context.base_target,
        node.params.target_spacing,
    );

    info!(target: "pocx::rpc", nonce = params.nonce, height = params.height,
          account = %account_id, raw_quality, deadline = deadline_seconds,
          forge_time, "nonce accepted");

    let submission = NonceSubmission::new(
        account_id,
        seed,
        params.nonce,
        raw_quality,
        params.compression,
        params.height,
        submitted_gen_sig,
    );
    node.scheduler.submit_nonce(submission).map_err(|e| match e {
        SubmitError::QueueFull => RpcError::new(
            RPC_QUEUE_FULL,
            "Submission queue is full, please try again later",
        ),
    })?;

    Ok(json!({
        "accepted": true,
        "quality": deadline_seconds,
        "poc_time": forge_time,
    }))
}
