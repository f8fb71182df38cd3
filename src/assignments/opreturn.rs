//! Assignment and revocation markers.
//!
//! Both travel as a single direct push after `OP_RETURN`:
//! assignment `"POCX" ‖ plot ‖ forge` (44 bytes), revocation
//! `"XCOP" ‖ plot` (24 bytes). Anything else — wrong length, wrong marker,
//! extra opcodes — is not a marker. The embedding transaction proves plot
//! ownership by spending at least one P2WPKH output of the plot address;
//! the surrounding script machinery has already validated those signatures.

use tracing::debug;

use crate::address::AccountId;
use crate::interfaces::CoinView;
use crate::primitives::transaction::{Script, Transaction};

pub const ASSIGNMENT_MARKER: [u8; 4] = *b"POCX";
pub const REVOCATION_MARKER: [u8; 4] = *b"XCOP";

const ASSIGNMENT_PAYLOAD_LEN: usize = 4 + 20 + 20;
const REVOCATION_PAYLOAD_LEN: usize = 4 + 20;

pub fn create_assignment_op_return(plot: &AccountId, forge: &AccountId) -> Script {
    let mut payload = Vec::with_capacity(ASSIGNMENT_PAYLOAD_LEN);
    payload.extend_from_slice(&ASSIGNMENT_MARKER);
    payload.extend_from_slice(&plot.0);
    payload.extend_from_slice(&forge.0);
    Script::op_return(&payload)
}

pub fn create_revocation_op_return(plot: &AccountId) -> Script {
    let mut payload = Vec::with_capacity(REVOCATION_PAYLOAD_LEN);
    payload.extend_from_slice(&REVOCATION_MARKER);
    payload.extend_from_slice(&plot.0);
    Script::op_return(&payload)
}

/// Parse an assignment marker into `(plot, forge)`.
pub fn parse_assignment_op_return(script: &Script) -> Option<(AccountId, AccountId)> {
    let payload = script.op_return_payload()?;
    if payload.len() != ASSIGNMENT_PAYLOAD_LEN || payload[..4] != ASSIGNMENT_MARKER {
        return None;
    }
    let mut plot = [0u8; 20];
    plot.copy_from_slice(&payload[4..24]);
    let mut forge = [0u8; 20];
    forge.copy_from_slice(&payload[24..44]);
    Some((AccountId(plot), AccountId(forge)))
}

/// Parse a revocation marker into the plot address.
pub fn parse_revocation_op_return(script: &Script) -> Option<AccountId> {
    let payload = script.op_return_payload()?;
    if payload.len() != REVOCATION_PAYLOAD_LEN || payload[..4] != REVOCATION_MARKER {
        return None;
    }
    let mut plot = [0u8; 20];
    plot.copy_from_slice(&payload[4..24]);
    Some(AccountId(plot))
}

/// Does this transaction spend an output controlled by the plot owner?
pub fn verify_plot_ownership(
    tx: &Transaction,
    plot: &AccountId,
    view: &(impl CoinView + ?Sized),
) -> bool {
    for input in &tx.inputs {
        let Some(coin) = view.coin(&input.prevout) else {
            debug!(target: "pocx::assignments", vout = input.prevout.vout,
                   "marker input prevout not found");
            continue;
        };
        if coin.script_pubkey.wpkh_account().as_ref() == Some(plot) {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignments::ForgingAssignment;
    use crate::primitives::transaction::{OutPoint, TxIn, TxOut};

    fn plot() -> AccountId {
        AccountId([0x11u8; 20])
    }

    fn forge() -> AccountId {
        AccountId([0x22u8; 20])
    }

    #[test]
    fn assignment_marker_roundtrip() {
        let script = create_assignment_op_return(&plot(), &forge());
        assert_eq!(script.0.len(), 2 + ASSIGNMENT_PAYLOAD_LEN);
        assert_eq!(script.0[1], ASSIGNMENT_PAYLOAD_LEN as u8);
        assert_eq!(parse_assignment_op_return(&script), Some((plot(), forge())));
        // An assignment marker never parses as a revocation.
        assert_eq!(parse_revocation_op_return(&script), None);
    }

    #[test]
    fn revocation_marker_roundtrip() {
        let script = create_revocation_op_return(&plot());
        assert_eq!(script.0.len(), 2 + REVOCATION_PAYLOAD_LEN);
        assert_eq!(parse_revocation_op_return(&script), Some(plot()));
        assert_eq!(parse_assignment_op_return(&script), None);
    }

    #[test]
    fn wrong_marker_rejected() {
        let mut payload = Vec::new();
        payload.extend_from_slice(b"XCOP");
        payload.extend_from_slice(&plot().0);
        payload.extend_from_slice(&forge().0);
        let script = Script::op_return(&payload);
        assert_eq!(parse_assignment_op_return(&script), None);
    }

    #[test]
    fn trailing_opcode_rejected() {
        let mut script = create_assignment_op_return(&plot(), &forge());
        script.0.push(0x51);
        assert_eq!(parse_assignment_op_return(&script), None);
    }

    struct OneCoin {
        outpoint: OutPoint,
        output: TxOut,
    }

    impl CoinView for OneCoin {
        fn forging_assignment(&self, _: &AccountId, _: i32) -> Option<ForgingAssignment> {
            None
        }
        fn coin(&self, outpoint: &OutPoint) -> Option<TxOut> {
            (*outpoint == self.outpoint).then(|| self.output.clone())
        }
    }

    #[test]
    fn ownership_requires_plot_input() {
        let outpoint = OutPoint {
            txid: [7u8; 32],
            vout: 0,
        };
        let view = OneCoin {
            outpoint,
            output: TxOut {
                value: 10_000,
                script_pubkey: Script::p2wpkh(&plot()),
            },
        };
        let tx = Transaction {
            version: 2,
            inputs: vec![TxIn {
                prevout: outpoint,
                script_sig: Script(vec![]),
                sequence: u32::MAX,
            }],
            outputs: vec![TxOut {
                value: 0,
                script_pubkey: create_assignment_op_return(&plot(), &forge()),
            }],
            lock_time: 0,
        };

        assert!(verify_plot_ownership(&tx, &plot(), &view));
        // A different plot is not proven by this input.
        assert!(!verify_plot_ownership(&tx, &forge(), &view));
    }
}
