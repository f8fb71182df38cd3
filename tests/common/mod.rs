//! Shared mock node for integration tests: an in-memory chain view, a
//! template builder that assembles real candidate blocks on the active
//! tip, a keystore-backed signer and a collecting block submitter.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::anyhow;
use parking_lot::Mutex;
use secp256k1::rand::thread_rng;
use secp256k1::{PublicKey, Secp256k1, SecretKey};

use pocx_core::address::AccountId;
use pocx_core::assignments::ForgingAssignment;
use pocx_core::consensus::difficulty::new_block_context;
use pocx_core::consensus::params::ConsensusParams;
use pocx_core::consensus::signature::sign_compact;
use pocx_core::interfaces::{
    BlockIndex, BlockSubmitter, BlockTemplateBuilder, BlockTemplateOptions, ChainView, CoinView,
    Signer,
};
use pocx_core::primitives::block::{Block, BlockHeader, PoCXProof};
use pocx_core::primitives::transaction::{OutPoint, Script, Transaction, TxIn, TxOut};

pub fn now_secs() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock after epoch")
        .as_secs() as u32
}

#[derive(Default)]
struct ChainInner {
    blocks: Vec<BlockIndex>,
    assignments: BTreeMap<AccountId, ForgingAssignment>,
    coins: BTreeMap<OutPoint, TxOut>,
}

/// Mutable in-memory chain the tests drive directly.
#[derive(Default)]
pub struct MockChain {
    inner: Mutex<ChainInner>,
}

impl MockChain {
    pub fn new() -> Arc<MockChain> {
        Arc::new(MockChain::default())
    }

    /// Append a straight chain of `count` blocks with fixed spacing and
    /// base target, the last block timestamped `tip_time`.
    pub fn seed_linear(&self, count: usize, spacing: u32, base_target: u64, tip_time: u32) {
        let mut inner = self.inner.lock();
        inner.blocks.clear();
        for height in 0..count {
            let mut hash = [0u8; 32];
            hash[0] = 0xC0;
            hash[1..9].copy_from_slice(&(height as u64).to_le_bytes());
            let prev_hash = inner.blocks.last().map(|b| b.hash).unwrap_or([0u8; 32]);
            inner.blocks.push(BlockIndex {
                height: height as i32,
                hash,
                prev_hash,
                time: tip_time - (count - 1 - height) as u32 * spacing,
                base_target,
                gen_sig: [height as u8 + 1; 32],
                proof: PoCXProof {
                    account_id: AccountId([0xEEu8; 20]),
                    nonce: 1,
                    ..PoCXProof::default()
                },
            });
        }
    }

    pub fn tip(&self) -> BlockIndex {
        self.inner.lock().blocks.last().expect("seeded chain").clone()
    }

    pub fn push_tip(&self, index: BlockIndex) {
        self.inner.lock().blocks.push(index);
    }

    pub fn set_assignment(&self, assignment: ForgingAssignment) {
        self.inner
            .lock()
            .assignments
            .insert(assignment.plot_address, assignment);
    }

    pub fn add_coin(&self, outpoint: OutPoint, output: TxOut) {
        self.inner.lock().coins.insert(outpoint, output);
    }
}

impl CoinView for MockChain {
    fn forging_assignment(&self, plot: &AccountId, _height: i32) -> Option<ForgingAssignment> {
        self.inner.lock().assignments.get(plot).cloned()
    }

    fn coin(&self, outpoint: &OutPoint) -> Option<TxOut> {
        self.inner.lock().coins.get(outpoint).cloned()
    }
}

impl ChainView for MockChain {
    fn active_tip(&self) -> Option<BlockIndex> {
        self.inner.lock().blocks.last().cloned()
    }

    fn ancestor(&self, height: i32) -> Option<BlockIndex> {
        self.inner.lock().blocks.get(height as usize).cloned()
    }
}

/// Builds candidate blocks on the active tip with a single coinbase.
pub struct MockTemplateBuilder {
    pub chain: Arc<MockChain>,
    pub params: ConsensusParams,
}

impl BlockTemplateBuilder for MockTemplateBuilder {
    fn create(&self, options: BlockTemplateOptions) -> anyhow::Result<Block> {
        let tip = self.chain.active_tip().ok_or_else(|| anyhow!("empty chain"))?;
        let context = new_block_context(self.chain.as_ref(), &self.params)?;

        let coinbase = Transaction {
            version: 2,
            inputs: vec![TxIn {
                prevout: OutPoint::null(),
                script_sig: Script(context.height.to_le_bytes().to_vec()),
                sequence: u32::MAX,
            }],
            outputs: vec![TxOut {
                value: 5_000_000_000,
                script_pubkey: options.coinbase_script,
            }],
            lock_time: 0,
        };

        let mut block = Block {
            header: BlockHeader {
                version: 1,
                prev_hash: tip.hash,
                merkle_root: [0u8; 32],
                time: now_secs().max(tip.time),
                height: context.height,
                gen_sig: context.gen_sig,
                base_target: context.base_target,
                proof: PoCXProof::default(),
                pubkey: [0u8; 33],
                signature: [0u8; 65],
            },
            transactions: vec![coinbase],
        };
        block.header.merkle_root = block.merkle_root();
        Ok(block)
    }
}

/// Signer over generated secp256k1 keys.
#[derive(Default)]
pub struct KeyStoreSigner {
    keys: Mutex<BTreeMap<AccountId, (SecretKey, PublicKey)>>,
}

impl KeyStoreSigner {
    pub fn new() -> Arc<KeyStoreSigner> {
        Arc::new(KeyStoreSigner::default())
    }

    /// Generate a key and return the account id of its pubkey hash.
    pub fn generate(&self) -> AccountId {
        let secp = Secp256k1::new();
        let (secret, public) = secp.generate_keypair(&mut thread_rng());
        let account = AccountId::from_pubkey(&public.serialize());
        self.keys.lock().insert(account, (secret, public));
        account
    }
}

impl Signer for KeyStoreSigner {
    fn have_key(&self, account: &AccountId) -> bool {
        self.keys.lock().contains_key(account)
    }

    fn pubkey(&self, account: &AccountId) -> Option<[u8; 33]> {
        self.keys
            .lock()
            .get(account)
            .map(|(_, public)| public.serialize())
    }

    fn sign_compact(&self, account: &AccountId, hash: &[u8; 32]) -> Option<[u8; 65]> {
        self.keys
            .lock()
            .get(account)
            .map(|(secret, _)| sign_compact(secret, hash))
    }
}

/// Records every submitted block and accepts it.
#[derive(Default)]
pub struct CollectingSubmitter {
    pub blocks: Mutex<Vec<Block>>,
}

impl CollectingSubmitter {
    pub fn new() -> Arc<CollectingSubmitter> {
        Arc::new(CollectingSubmitter::default())
    }

    pub fn submitted(&self) -> Vec<Block> {
        self.blocks.lock().clone()
    }
}

impl BlockSubmitter for CollectingSubmitter {
    fn process_new_block(&self, block: &Block, _force: bool, _min_pow_checked: bool) -> bool {
        self.blocks.lock().push(block.clone());
        true
    }
}
