//! End-to-end proof validation: a block assembled with a real quality and
//! a real compact signature must pass, and every tampered variant must be
//! rejected with the right reason.

mod common;

use common::{KeyStoreSigner, MockChain};
use pocx_core::address::AccountId;
use pocx_core::assignments::ForgingAssignment;
use pocx_core::consensus::difficulty::{next_base_target, next_generation_signature};
use pocx_core::consensus::params::ConsensusParams;
use pocx_core::consensus::proof::{validate_block, RejectReason};
use pocx_core::consensus::time_bending::time_bended_deadline;
use pocx_core::interfaces::Signer;
use pocx_core::plot::quality::calculate_quality;
use pocx_core::primitives::block::{block_signature_hash, Block, BlockHeader, PoCXProof};
use pocx_core::primitives::transaction::{OutPoint, Script, Transaction, TxIn, TxOut};

fn params() -> ConsensusParams {
    ConsensusParams {
        target_spacing: 4,
        rolling_window: 8,
        low_capacity_calibration: true,
        ..ConsensusParams::default()
    }
}

/// Build a fully valid block on the mock chain's tip, signed by `signer_account`.
fn forge_valid_block(
    chain: &MockChain,
    params: &ConsensusParams,
    signer: &KeyStoreSigner,
    plot_account: AccountId,
    signer_account: AccountId,
) -> (Block, u64) {
    let tip = chain.tip();
    let height = tip.height + 1;
    let gen_sig = next_generation_signature(&tip);
    let base_target = next_base_target(&tip, chain, params).unwrap();

    let seed = [0xA7u8; 32];
    let nonce = 1337u64;
    let compression = 1u32;
    let quality = calculate_quality(
        &plot_account.0,
        &seed,
        nonce,
        compression,
        height as u64,
        &gen_sig,
    )
    .unwrap();
    let deadline = time_bended_deadline(quality, base_target, params.target_spacing);

    let coinbase = Transaction {
        version: 2,
        inputs: vec![TxIn {
            prevout: OutPoint::null(),
            script_sig: Script(height.to_le_bytes().to_vec()),
            sequence: u32::MAX,
        }],
        outputs: vec![TxOut {
            value: 5_000_000_000,
            script_pubkey: Script::p2wpkh(&signer_account),
        }],
        lock_time: 0,
    };

    let mut block = Block {
        header: BlockHeader {
            version: 1,
            prev_hash: tip.hash,
            merkle_root: [0u8; 32],
            time: tip.time + deadline as u32,
            height,
            gen_sig,
            base_target,
            proof: PoCXProof {
                seed,
                account_id: plot_account,
                compression,
                nonce,
                quality,
            },
            pubkey: [0u8; 33],
            signature: [0u8; 65],
        },
        transactions: vec![coinbase],
    };
    block.header.merkle_root = block.merkle_root();
    block.header.pubkey = signer.pubkey(&signer_account).unwrap();
    let signing_hash = block_signature_hash(&block.hash());
    block.header.signature = signer.sign_compact(&signer_account, &signing_hash).unwrap();

    (block, deadline)
}

#[test]
fn valid_block_passes_and_tampered_blocks_fail() {
    let params = params();
    let chain = MockChain::new();
    chain.seed_linear(2, params.target_spacing as u32, params.genesis_base_target(), 1_700_000_000);

    let signer = KeyStoreSigner::new();
    let miner = signer.generate();

    let (block, deadline) = forge_valid_block(&chain, &params, &signer, miner, miner);
    let parent = chain.tip();

    let outcome = validate_block(&block, &parent, chain.as_ref(), &params).unwrap();
    assert_eq!(outcome.quality, block.header.proof.quality);
    assert_eq!(outcome.deadline, deadline);
    assert_eq!(outcome.signer, miner);

    // Claimed quality off by one.
    let mut tampered = block.clone();
    tampered.header.proof.quality ^= 1;
    assert!(matches!(
        validate_block(&tampered, &parent, chain.as_ref(), &params),
        Err(RejectReason::QualityMismatch { .. })
    ));

    // Wrong base target.
    let mut tampered = block.clone();
    tampered.header.base_target += 1;
    assert!(matches!(
        validate_block(&tampered, &parent, chain.as_ref(), &params),
        Err(RejectReason::BaseTargetMismatch { .. })
    ));

    // Wrong generation signature.
    let mut tampered = block.clone();
    tampered.header.gen_sig[0] ^= 1;
    assert!(matches!(
        validate_block(&tampered, &parent, chain.as_ref(), &params),
        Err(RejectReason::GenerationSignatureMismatch)
    ));

    // Compression outside the legal range at this height.
    let mut tampered = block.clone();
    tampered.header.proof.compression = 6;
    assert!(matches!(
        validate_block(&tampered, &parent, chain.as_ref(), &params),
        Err(RejectReason::CompressionOutOfRange { .. })
    ));

    // Signature bytes flipped: recovery fails or yields a foreign key.
    let mut tampered = block.clone();
    tampered.header.signature[10] ^= 0xFF;
    let reject = validate_block(&tampered, &parent, chain.as_ref(), &params).unwrap_err();
    assert!(matches!(
        reject,
        RejectReason::BadSignature(_) | RejectReason::PubkeyMismatch | RejectReason::SignerMismatch
    ));

    // Published ahead of the deadline.
    if deadline > 0 {
        let mut early = block.clone();
        early.header.time = parent.time + deadline as u32 - 1;
        // The signature still matches (time is under it) only if re-signed;
        // re-sign so the deadline check is what fails.
        let signing_hash = block_signature_hash(&early.hash());
        early.header.signature = signer.sign_compact(&miner, &signing_hash).unwrap();
        assert!(matches!(
            validate_block(&early, &parent, chain.as_ref(), &params),
            Err(RejectReason::AheadOfDeadline { .. })
        ));
    }
}

#[test]
fn signer_must_match_assignment_state() {
    let params = params();
    let chain = MockChain::new();
    chain.seed_linear(2, params.target_spacing as u32, params.genesis_base_target(), 1_700_000_000);

    let signer = KeyStoreSigner::new();
    let plot = signer.generate();
    let delegate = signer.generate();

    // Active assignment: the delegate signs, the plot owner may not.
    let height = chain.tip().height + 1;
    chain.set_assignment(ForgingAssignment {
        plot_address: plot,
        forging_address: delegate,
        assignment_txid: [1u8; 32],
        assignment_height: 0,
        assignment_effective_height: height,
        revoked: false,
        revocation_txid: [0u8; 32],
        revocation_height: 0,
        revocation_effective_height: 0,
    });

    let parent = chain.tip();
    let (delegated, _) = forge_valid_block(&chain, &params, &signer, plot, delegate);
    let outcome = validate_block(&delegated, &parent, chain.as_ref(), &params).unwrap();
    assert_eq!(outcome.signer, delegate);

    let (owner_signed, _) = forge_valid_block(&chain, &params, &signer, plot, plot);
    assert!(matches!(
        validate_block(&owner_signed, &parent, chain.as_ref(), &params),
        Err(RejectReason::SignerMismatch)
    ));
}
