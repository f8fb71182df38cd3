//! Chain primitives: consensus serialization, transactions and the
//! capacity-proof block header.

pub mod block;
pub mod ser;
pub mod transaction;

pub use block::{Block, BlockHeader, PoCXProof};
pub use transaction::{OutPoint, Script, Transaction, TxIn, TxOut};
