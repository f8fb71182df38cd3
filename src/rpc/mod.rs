//! RPC command handlers for mining and assignments.
//!
//! Handlers are plain functions over [`NodeState`] returning JSON values or
//! a coded [`RpcError`]; the `axum` router in [`router`] exposes them over
//! whatever transport the host mounts it on. Error codes follow the
//! classic conventions miners already speak.

pub mod assignments;
pub mod mining;

use std::fmt;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::consensus::params::ConsensusParams;
use crate::interfaces::{BlockSubmitter, BlockTemplateBuilder, ChainView, Signer};
use crate::scheduler::{ForgingScheduler, SchedulerServices};
use crate::wallet::WalletBridge;

pub const RPC_IN_INITIAL_DOWNLOAD: i32 = -3;
pub const RPC_INVALID_ADDRESS_OR_KEY: i32 = -5;
pub const RPC_INVALID_PARAMETER: i32 = -8;
pub const RPC_VERIFY_REJECTED: i32 = -26;
pub const RPC_WALLET_ERROR: i32 = -4;
pub const RPC_INTERNAL_ERROR: i32 = -32603;
/// Back-pressure from the forging scheduler; retry later.
pub const RPC_QUEUE_FULL: i32 = -1001;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

impl RpcError {
    pub fn new(code: i32, message: impl Into<String>) -> RpcError {
        RpcError {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_parameter(message: impl Into<String>) -> RpcError {
        RpcError::new(RPC_INVALID_PARAMETER, message)
    }

    pub fn verify_rejected(message: impl Into<String>) -> RpcError {
        RpcError::new(RPC_VERIFY_REJECTED, message)
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

impl std::error::Error for RpcError {}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": { "code": self.code, "message": self.message }
        }));
        (StatusCode::OK, body).into_response()
    }
}

/// Everything the RPC surface needs, owned for the node's lifetime.
pub struct NodeState {
    pub params: ConsensusParams,
    pub chain: Arc<dyn ChainView>,
    pub signer: Arc<dyn Signer>,
    pub wallet: Option<Arc<dyn WalletBridge>>,
    pub scheduler: ForgingScheduler,
}

impl NodeState {
    /// Wire the services together and start the forging worker.
    pub fn new(
        params: ConsensusParams,
        chain: Arc<dyn ChainView>,
        template_builder: Arc<dyn BlockTemplateBuilder>,
        signer: Arc<dyn Signer>,
        submitter: Arc<dyn BlockSubmitter>,
        wallet: Option<Arc<dyn WalletBridge>>,
    ) -> NodeState {
        let scheduler = ForgingScheduler::new(SchedulerServices {
            params: params.clone(),
            chain: Arc::clone(&chain),
            template_builder,
            signer: Arc::clone(&signer),
            submitter,
        });
        NodeState {
            params,
            chain,
            signer,
            wallet,
            scheduler,
        }
    }
}

async fn get_mining_info_route(
    State(node): State<Arc<NodeState>>,
) -> Result<Json<Value>, RpcError> {
    mining::get_mining_info(&node).map(Json)
}

async fn submit_nonce_route(
    State(node): State<Arc<NodeState>>,
    Json(params): Json<mining::SubmitNonceParams>,
) -> Result<Json<Value>, RpcError> {
    mining::submit_nonce(&node, params).map(Json)
}

async fn get_assignment_route(
    State(node): State<Arc<NodeState>>,
    Json(params): Json<assignments::GetAssignmentParams>,
) -> Result<Json<Value>, RpcError> {
    assignments::get_assignment(&node, params).map(Json)
}

async fn create_assignment_route(
    State(node): State<Arc<NodeState>>,
    Json(params): Json<assignments::CreateAssignmentParams>,
) -> Result<Json<Value>, RpcError> {
    assignments::create_assignment(&node, params).map(Json)
}

async fn revoke_assignment_route(
    State(node): State<Arc<NodeState>>,
    Json(params): Json<assignments::RevokeAssignmentParams>,
) -> Result<Json<Value>, RpcError> {
    assignments::revoke_assignment(&node, params).map(Json)
}

/// Assemble the RPC router; the host mounts it on its HTTP server.
pub fn router(node: Arc<NodeState>) -> Router {
    Router::new()
        .route("/get_mining_info", get(get_mining_info_route))
        .route("/submit_nonce", post(submit_nonce_route))
        .route("/get_assignment", post(get_assignment_route))
        .route("/create_assignment", post(create_assignment_route))
        .route("/revoke_assignment", post(revoke_assignment_route))
        .with_state(node)
}
