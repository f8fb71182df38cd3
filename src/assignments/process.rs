//! Connect-time processing of assignment markers.
//!
//! Scans a block's transactions for markers, enforces the legal
//! transitions (assign only from UNASSIGNED or REVOKED, revoke only from
//! ASSIGNED), verifies plot ownership through the spent inputs, applies the
//! resulting state changes, and returns the undo list for the block.
//! A marker that fails its checks is simply ineffective — the transaction
//! itself stays valid.

use tracing::{debug, info};

use crate::consensus::params::ConsensusParams;
use crate::interfaces::CoinView;
use crate::primitives::block::Block;
use crate::primitives::transaction::Transaction;

use super::opreturn::{
    parse_assignment_op_return, parse_revocation_op_return, verify_plot_ownership,
};
use super::undo::{ForgingUndo, UndoKind};
use super::{AssignmentStore, ForgingAssignment, ForgingState};

/// Apply all assignment markers in a block, returning the undo list.
pub fn connect_block_assignments(
    block: &Block,
    height: i32,
    params: &ConsensusParams,
    view: &(impl CoinView + ?Sized),
    store: &mut dyn AssignmentStore,
) -> Vec<ForgingUndo> {
    let mut undos = Vec::new();
    for tx in &block.transactions {
        if tx.is_coinbase() {
            continue;
        }
        connect_transaction(tx, height, params, view, store, &mut undos);
    }
    undos
}

fn connect_transaction(
    tx: &Transaction,
    height: i32,
    params: &ConsensusParams,
    view: &(impl CoinView + ?Sized),
    store: &mut dyn AssignmentStore,
    undos: &mut Vec<ForgingUndo>,
) {
    for output in &tx.outputs {
        if let Some((plot, forge)) = parse_assignment_op_return(&output.script_pubkey) {
            if !verify_plot_ownership(tx, &plot, view) {
                debug!(target: "pocx::assignments", plot = %plot,
                       "assignment marker without plot-owner input, ignored");
                continue;
            }

            let prior = store.get(&plot);
            match prior.as_ref().map(|a| a.state_at_height(height)) {
                None | Some(ForgingState::Revoked) => {}
                Some(state) => {
                    debug!(target: "pocx::assignments", plot = %plot, state = state.as_str(),
                           "assignment marker in illegal state, ignored");
                    continue;
                }
            }

            let assignment = ForgingAssignment {
                plot_address: plot,
                forging_address: forge,
                assignment_txid: tx.txid(),
                assignment_height: height,
                assignment_effective_height: height + params.assignment_delay,
                revoked: false,
                revocation_txid: [0u8; 32],
                revocation_height: 0,
                revocation_effective_height: 0,
            };

            let undo = match prior {
                Some(prior) => ForgingUndo {
                    kind: UndoKind::Modified,
                    assignment: prior,
                },
                None => ForgingUndo {
                    kind: UndoKind::Added,
                    assignment: assignment.clone(),
                },
            };

            info!(target: "pocx::assignments", plot = %plot, forge = %forge,
                  effective = assignment.assignment_effective_height,
                  "forging assignment recorded");
            store.put(assignment);
            undos.push(undo);
        } else if let Some(plot) = parse_revocation_op_return(&output.script_pubkey) {
            if !verify_plot_ownership(tx, &plot, view) {
                debug!(target: "pocx::assignments", plot = %plot,
                       "revocation marker without plot-owner input, ignored");
                continue;
            }

            let Some(current) = store.get(&plot) else {
                debug!(target: "pocx::assignments", plot = %plot,
                       "revocation for unassigned plot, ignored");
                continue;
            };
            if current.state_at_height(height) != ForgingState::Assigned {
                debug!(target: "pocx::assignments", plot = %plot,
                       state = current.state_at_height(height).as_str(),
                       "revocation marker in illegal state, ignored");
                continue;
            }

            let mut revoked = current.clone();
            revoked.revoked = true;
            revoked.revocation_txid = tx.txid();
            revoked.revocation_height = height;
            revoked.revocation_effective_height = height + params.revocation_delay;

            info!(target: "pocx::assignments", plot = %plot,
                  effective = revoked.revocation_effective_height,
                  "forging assignment revocation recorded");
            store.put(revoked);
            undos.push(ForgingUndo {
                kind: UndoKind::Revoked,
                assignment: current,
            });
        }
    }
}
