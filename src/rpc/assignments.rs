//! Assignment RPCs: query state, create and revoke delegations.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::address::AccountId;
use crate::assignments::ForgingState;
use crate::wallet::{create_assignment_transaction, create_revocation_transaction};

use super::{NodeState, RpcError, RPC_INVALID_ADDRESS_OR_KEY, RPC_WALLET_ERROR};

fn parse_plot_address(node: &NodeState, address: &str) -> Result<AccountId, RpcError> {
    AccountId::from_address(address, &node.params.bech32_hrp).map_err(|e| {
        RpcError::new(
            RPC_INVALID_ADDRESS_OR_KEY,
            format!("Invalid plot address: {e}"),
        )
    })
}

#[derive(Debug, Deserialize)]
pub struct GetAssignmentParams {
    pub plot_address: String,
    #[serde(default)]
    pub height: Option<i32>,
}

/// Assignment record and lifecycle state for a plot.
pub fn get_assignment(node: &NodeState, params: GetAssignmentParams) -> Result<Value, RpcError> {
    let plot = parse_plot_address(node, &params.plot_address)?;

    let height = match params.height {
        Some(height) => height,
        None => node
            .chain
            .active_tip()
            .map(|tip| tip.height)
            .unwrap_or_default(),
    };

    let mut result = json!({
        "plot_address": params.plot_address,
        "height": height,
    });
    let obj = result.as_object_mut().expect("object literal");

    match node.chain.forging_assignment(&plot, height) {
        Some(assignment) => {
            obj.insert("has_assignment".into(), json!(true));
            obj.insert(
                "state".into(),
                json!(assignment.state_at_height(height).as_str()),
            );
            obj.insert(
                "forging_address".into(),
                json!(assignment.forging_address.to_address(&node.params.bech32_hrp)),
            );
            obj.insert(
                "assignment_txid".into(),
                json!(hex::encode(assignment.assignment_txid)),
            );
            obj.insert(
                "assignment_height".into(),
                json!(assignment.assignment_height),
            );
            obj.insert(
                "activation_height".into(),
                json!(assignment.assignment_effective_height),
            );
            obj.insert("revoked".into(), json!(assignment.revoked));
            if assignment.revoked {
                obj.insert(
                    "revocation_txid".into(),
                    json!(hex::encode(assignment.revocation_txid)),
                );
                obj.insert(
                    "revocation_height".into(),
                    json!(assignment.revocation_height),
                );
                obj.insert(
                    "revocation_effective_height".into(),
                    json!(assignment.revocation_effective_height),
                );
            }
        }
        None => {
            obj.insert("has_assignment".into(), json!(false));
            obj.insert("state".into(), json!(ForgingState::Unassigned.as_str()));
            obj.insert("forging_address".into(), json!(""));
        }
    }

    Ok(result)
}

#[derive(Debug, Deserialize)]
pub struct CreateAssignmentParams {
    pub plot_address: String,
    pub forging_address: String,
    #[serde(default)]
    pub fee_rate: Option<u64>,
}

/// Build, sign and broadcast an assignment marker transaction.
pub fn create_assignment(
    node: &NodeState,
    params: CreateAssignmentParams,
) -> Result<Value, RpcError> {
    let plot = parse_plot_address(node, &params.plot_address)?;
    let forge =
        AccountId::from_address(&params.forging_address, &node.params.bech32_hrp).map_err(|e| {
            RpcError::new(
                RPC_INVALID_ADDRESS_OR_KEY,
                format!("Invalid forging address: {e}"),
            )
        })?;

    let wallet = node
        .wallet
        .as_ref()
        .ok_or_else(|| RpcError::new(RPC_WALLET_ERROR, "No wallet available"))?;

    // Check the lifecycle before spending fees: the chain would ignore a
    // marker from an illegal state anyway.
    let height = node
        .chain
        .active_tip()
        .map(|tip| tip.height)
        .unwrap_or_default();
    if let Some(current) = node.chain.forging_assignment(&plot, height) {
        let state = current.state_at_height(height);
        if !matches!(state, ForgingState::Revoked) {
            return Err(RpcError::new(
                RPC_WALLET_ERROR,
                format!("Plot already has an assignment in state {}", state.as_str()),
            ));
        }
    }

    let tx = create_assignment_transaction(wallet.as_ref(), &plot, &forge, params.fee_rate)
        .map_err(|e| RpcError::new(RPC_WALLET_ERROR, e.to_string()))?;

    Ok(json!({
        "txid": hex::encode(tx.txid()),
        "hex": hex::encode(tx.to_bytes()),
        "plot_address": params.plot_address,
        "forging_address": params.forging_address,
    }))
}

#[derive(Debug, Deserialize)]
pub struct RevokeAssignmentParams {
    pub plot_address: String,
    #[serde(default)]
    pub fee_rate: Option<u64>,
}

/// Build, sign and broadcast a revocation marker transaction.
pub fn revoke_assignment(
    node: &NodeState,
    params: RevokeAssignmentParams,
) -> Result<Value, RpcError> {
    let plot = parse_plot_address(node, &params.plot_address)?;

    let wallet = node
        .wallet
        .as_ref()
        .ok_or_else(|| RpcError::new(RPC_WALLET_ERROR, "No wallet available"))?;

    let height = node
        .chain
        .active_tip()
        .map(|tip| tip.height)
        .unwrap_or_default();
    let state = node
        .chain
        .forging_assignment(&plot, height)
        .map(|a| a.state_at_height(height))
        .unwrap_or(ForgingState::Unassigned);
    if state != ForgingState::Assigned {
        return Err(RpcError::new(
            RPC_WALLET_ERROR,
            format!("Plot has no active assignment (state {})", state.as_str()),
        ));
    }

    let tx = create_revocation_transaction(wallet.as_ref(), &plot, params.fee_rate)
        .map_err(|e| RpcError::new(RPC_WALLET_ERROR, e.to_string()))?;

    Ok(json!({
        "txid": hex::encode(tx.txid()),
        "hex": hex::encode(tx.to_bytes()),
        "plot_address": params.plot_address,
    }))
}
