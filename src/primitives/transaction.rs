//! Minimal transaction model.
//!
//! The core only needs enough of a transaction to scan assignment markers,
//! prove plot ownership through spent P2WPKH outputs, and let the wallet
//! bridge assemble marker transactions. Script handling is limited to the
//! two patterns that matter here: version-0 key-hash programs and single
//! direct-push `OP_RETURN` payloads.

use crate::address::AccountId;
use crate::crypto::sha256d;

use super::ser::{write_compact_size, DecodeError, Reader};

pub const OP_RETURN: u8 = 0x6A;
const OP_0: u8 = 0x00;
/// Largest direct push opcode; everything this core emits fits below it.
const MAX_DIRECT_PUSH: u8 = 75;

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Script(pub Vec<u8>);

impl Script {
    /// `OP_0 <20-byte key hash>` — the pay-to-witness-key-hash pattern.
    pub fn p2wpkh(account: &AccountId) -> Script {
        let mut bytes = Vec::with_capacity(22);
        bytes.push(OP_0);
        bytes.push(20);
        bytes.extend_from_slice(&account.0);
        Script(bytes)
    }

    /// The key hash of a P2WPKH script, if this is one.
    pub fn wpkh_account(&self) -> Option<AccountId> {
        if self.0.len() == 22 && self.0[0] == OP_0 && self.0[1] == 20 {
            let mut id = [0u8; 20];
            id.copy_from_slice(&self.0[2..22]);
            Some(AccountId(id))
        } else {
            None
        }
    }

    /// `OP_RETURN <single direct push>`.
    pub fn op_return(payload: &[u8]) -> Script {
        debug_assert!(payload.len() <= MAX_DIRECT_PUSH as usize);
        let mut bytes = Vec::with_capacity(2 + payload.len());
        bytes.push(OP_RETURN);
        bytes.push(payload.len() as u8);
        bytes.extend_from_slice(payload);
        Script(bytes)
    }

    /// Payload of an `OP_RETURN` script holding exactly one direct push and
    /// nothing after it. Any other shape (no push, pushdata forms, trailing
    /// opcodes) yields `None`.
    pub fn op_return_payload(&self) -> Option<&[u8]> {
        let bytes = &self.0;
        if bytes.len() < 2 || bytes[0] != OP_RETURN {
            return None;
        }
        let len = bytes[1];
        if len == 0 || len > MAX_DIRECT_PUSH {
            return None;
        }
        let end = 2 + len as usize;
        if bytes.len() != end {
            return None;
        }
        Some(&bytes[2..end])
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        write_compact_size(out, self.0.len() as u64);
        out.extend_from_slice(&self.0);
    }

    pub fn decode(reader: &mut Reader) -> Result<Script, DecodeError> {
        let len = reader.read_compact_size()?;
        Ok(Script(reader.take(len as usize)?.to_vec()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OutPoint {
    pub txid: [u8; 32],
    pub vout: u32,
}

impl OutPoint {
    pub fn null() -> OutPoint {
        OutPoint {
            txid: [0u8; 32],
            vout: u32::MAX,
        }
    }

    pub fn is_null(&self) -> bool {
        self.txid == [0u8; 32] && self.vout == u32::MAX
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxIn {
    pub prevout: OutPoint,
    pub script_sig: Script,
    pub sequence: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxOut {
    pub value: u64,
    pub script_pubkey: Script,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub version: i32,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
    pub lock_time: u32,
}

impl Transaction {
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].prevout.is_null()
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.version.to_le_bytes());
        write_compact_size(out, self.inputs.len() as u64);
        for input in &self.inputs {
            out.extend_from_slice(&input.prevout.txid);
            out.extend_from_slice(&input.prevout.vout.to_le_bytes());
            input.script_sig.encode(out);
            out.extend_from_slice(&input.sequence.to_le_bytes());
        }
        write_compact_size(out, self.outputs.len() as u64);
        for output in &self.outputs {
            out.extend_from_slice(&output.value.to_le_bytes());
            output.script_pubkey.encode(out);
        }
        out.extend_from_slice(&self.lock_time.to_le_bytes());
    }

    pub fn decode(reader: &mut Reader) -> Result<Transaction, DecodeError> {
        let version = reader.read_i32()?;
        let input_count = reader.read_compact_size()?;
        let mut inputs = Vec::with_capacity(input_count.min(1024) as usize);
        for _ in 0..input_count {
            let txid = reader.read_array()?;
            let vout = reader.read_u32()?;
            let script_sig = Script::decode(reader)?;
            let sequence = reader.read_u32()?;
            inputs.push(TxIn {
                prevout: OutPoint { txid, vout },
                script_sig,
                sequence,
            });
        }
        let output_count = reader.read_compact_size()?;
        let mut outputs = Vec::with_capacity(output_count.min(1024) as usize);
        for _ in 0..output_count {
            let value = reader.read_u64()?;
            let script_pubkey = Script::decode(reader)?;
            outputs.push(TxOut {
                value,
                script_pubkey,
            });
        }
        let lock_time = reader.read_u32()?;
        Ok(Transaction {
            version,
            inputs,
            outputs,
            lock_time,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(128);
        self.encode(&mut out);
        out
    }

    pub fn txid(&self) -> [u8; 32] {
        sha256d(&self.to_bytes())
    }
}
