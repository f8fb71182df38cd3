//! Block header with the capacity proof and the block signature scheme.
//!
//! The header extends the classic shape (version, prev, merkle, time) with
//! the context-free validation fields: height, generation signature, base
//! target, the capacity proof itself, and the signer's pubkey plus a
//! compact recoverable signature. The block hash always zeroes the
//! signature bytes first, so a signature never commits to itself.

use crate::address::AccountId;
use crate::crypto::sha256d;

use super::ser::{write_compact_size, DecodeError, Reader};
use super::transaction::Transaction;

/// Magic prefix mixed into the hash a block signature commits to.
pub const BLOCK_SIGNATURE_MAGIC: &str = "POCX Signed Block:\n";

/// Plot-specific proof carried in every block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoCXProof {
    pub seed: [u8; 32],
    pub account_id: AccountId,
    pub compression: u32,
    pub nonce: u64,
    pub quality: u64,
}

impl PoCXProof {
    pub fn is_null(&self) -> bool {
        self.nonce == 0 && self.account_id.is_zero()
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.seed);
        out.extend_from_slice(&self.account_id.0);
        out.extend_from_slice(&self.compression.to_le_bytes());
        out.extend_from_slice(&self.nonce.to_le_bytes());
        out.extend_from_slice(&self.quality.to_le_bytes());
    }

    pub fn decode(reader: &mut Reader) -> Result<PoCXProof, DecodeError> {
        Ok(PoCXProof {
            seed: reader.read_array()?,
            account_id: AccountId(reader.read_array()?),
            compression: reader.read_u32()?,
            nonce: reader.read_u64()?,
            quality: reader.read_u64()?,
        })
    }
}

impl Default for PoCXProof {
    fn default() -> Self {
        PoCXProof {
            seed: [0u8; 32],
            account_id: AccountId::ZERO,
            compression: 0,
            nonce: 0,
            quality: 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockHeader {
    pub version: i32,
    pub prev_hash: [u8; 32],
    pub merkle_root: [u8; 32],
    pub time: u32,
    pub height: i32,
    pub gen_sig: [u8; 32],
    pub base_target: u64,
    pub proof: PoCXProof,
    pub pubkey: [u8; 33],
    pub signature: [u8; 65],
}

impl Default for BlockHeader {
    fn default() -> Self {
        BlockHeader {
            version: 0,
            prev_hash: [0u8; 32],
            merkle_root: [0u8; 32],
            time: 0,
            height: 0,
            gen_sig: [0u8; 32],
            base_target: 0,
            proof: PoCXProof::default(),
            pubkey: [0u8; 33],
            signature: [0u8; 65],
        }
    }
}

impl BlockHeader {
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&self.prev_hash);
        out.extend_from_slice(&self.merkle_root);
        out.extend_from_slice(&self.time.to_le_bytes());
        out.extend_from_slice(&self.height.to_le_bytes());
        out.extend_from_slice(&self.gen_sig);
        out.extend_from_slice(&self.base_target.to_le_bytes());
        self.proof.encode(out);
        out.extend_from_slice(&self.pubkey);
        out.extend_from_slice(&self.signature);
    }

    pub fn decode(reader: &mut Reader) -> Result<BlockHeader, DecodeError> {
        Ok(BlockHeader {
            version: reader.read_i32()?,
            prev_hash: reader.read_array()?,
            merkle_root: reader.read_array()?,
            time: reader.read_u32()?,
            height: reader.read_i32()?,
            gen_sig: reader.read_array()?,
            base_target: reader.read_u64()?,
            proof: PoCXProof::decode(reader)?,
            pubkey: reader.read_array()?,
            signature: reader.read_array()?,
        })
    }

    /// Block hash: the serialization with the signature zeroed.
    pub fn hash(&self) -> [u8; 32] {
        let mut unsigned = self.clone();
        unsigned.signature = [0u8; 65];
        let mut bytes = Vec::with_capacity(256);
        unsigned.encode(&mut bytes);
        sha256d(&bytes)
    }
}

/// The hash a block signature is made over: the magic string and the
/// 64-char hex of the block hash, each length-prefixed.
pub fn block_signature_hash(block_hash: &[u8; 32]) -> [u8; 32] {
    let hex = hex::encode(block_hash);
    let mut data = Vec::with_capacity(1 + BLOCK_SIGNATURE_MAGIC.len() + 1 + hex.len());
    write_compact_size(&mut data, BLOCK_SIGNATURE_MAGIC.len() as u64);
    data.extend_from_slice(BLOCK_SIGNATURE_MAGIC.as_bytes());
    write_compact_size(&mut data, hex.len() as u64);
    data.extend_from_slice(hex.as_bytes());
    sha256d(&data)
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn hash(&self) -> [u8; 32] {
        self.header.hash()
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        self.header.encode(out);
        write_compact_size(out, self.transactions.len() as u64);
        for tx in &self.transactions {
            tx.encode(out);
        }
    }

    pub fn decode(reader: &mut Reader) -> Result<Block, DecodeError> {
        let header = BlockHeader::decode(reader)?;
        let count = reader.read_compact_size()?;
        let mut transactions = Vec::with_capacity(count.min(1024) as usize);
        for _ in 0..count {
            transactions.push(Transaction::decode(reader)?);
        }
        Ok(Block {
            header,
            transactions,
        })
    }

    /// Pairwise double-SHA-256 tree over txids, odd nodes duplicated.
    pub fn merkle_root(&self) -> [u8; 32] {
        let mut layer: Vec<[u8; 32]> = self.transactions.iter().map(|tx| tx.txid()).collect();
        if layer.is_empty() {
            return [0u8; 32];
        }
        while layer.len() > 1 {
            let mut next = Vec::with_capacity(layer.len().div_ceil(2));
            for pair in layer.chunks(2) {
                let mut data = [0u8; 64];
                data[..32].copy_from_slice(&pair[0]);
                data[32..].copy_from_slice(pair.get(1).unwrap_or(&pair[0]));
                next.push(sha256d(&data));
            }
            layer = next;
        }
        layer[0]
    }
}
