use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use postchain_consensus::eligible_validators;
use postchain_core::block::BlockDict;
use postchain_core::error::ValidationError;
use postchain_core::transaction::TransactionDict;
use postchain_core::validator_rand::ValidatorRandDict;
use postchain_core::{validation, Block, CoreError, Transaction, ValidatorRand};
use postchain_gossip::{amplify, BLOCK_VALIDATION_PATH, TRANSACTION_VALIDATION_PATH, VALIDATOR_RAND_PATH};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(serde_json::json!({ "error": self.1 }))).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError(StatusCode::BAD_REQUEST, err.to_string())
    }
}

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

#[derive(Serialize)]
pub(crate) struct StatusResponse {
    head_hash_hex: Option<String>,
    height: usize,
    peer_count: usize,
    mempool_size: usize,
}

pub async fn status(State(app): State<AppState>) -> Json<StatusResponse> {
    let state = app.0.state.lock().await;
    Json(StatusResponse {
        head_hash_hex: state.chain.head_hash_hex(),
        height: state.chain.len(),
        peer_count: state.peers.len(),
        mempool_size: state.mempool.len(),
    })
}

#[derive(Serialize)]
pub struct KnownNodesResponse {
    pub addresses: Vec<String>,
}

pub async fn known_nodes(State(app): State<AppState>) -> Json<KnownNodesResponse> {
    let state = app.0.state.lock().await;
    Json(KnownNodesResponse {
        addresses: state.peers.to_vec(),
    })
}

#[derive(Deserialize)]
pub struct NodeRequest {
    pub address: String,
}

pub async fn accept_node(State(app): State<AppState>, Json(req): Json<NodeRequest>) -> StatusCode {
    let mut state = app.0.state.lock().await;
    if state.peers.accept(req.address.clone()) {
        info!(peer = %req.address, "accepted new peer");
        if let Err(err) = state.peers.save_to_file(&app.0.config.known_nodes_path) {
            tracing::warn!(%err, "could not persist known peers");
        }
    }
    StatusCode::OK
}

pub async fn blockchain(State(app): State<AppState>) -> Json<Vec<BlockDict>> {
    let state = app.0.state.lock().await;
    Json(state.chain.to_vec_head_first().into_iter().map(Block::to_dict).collect())
}

#[derive(Deserialize)]
pub struct TransactionEnvelope {
    #[serde(flatten)]
    pub transaction: TransactionDict,
    #[serde(default)]
    pub origin: Option<String>,
}

pub async fn accept_transaction(
    State(app): State<AppState>,
    Json(req): Json<TransactionEnvelope>,
) -> Result<StatusCode, ApiError> {
    let tx = Transaction::from_dict(req.transaction)?;
    let tx_hash_hex = tx.tx_hash_hex();

    let (is_new, body, peers) = {
        let mut state = app.0.state.lock().await;
        if state.mempool.contains(&tx_hash_hex) {
            return Ok(StatusCode::OK);
        }
        let is_genesis = state.chain.is_empty();
        validation::validate_transaction(
            &tx,
            &state.accounts,
            &app.0.params,
            &app.0.ico_allowed_keys,
            &app.0.scheme,
            app.now(),
            is_genesis,
        )
        .map_err(|e| ApiError(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;

        state.mempool.insert(tx.clone());
        let body = serde_json::json!({ "transaction": tx.to_dict(), "origin": app.0.config.self_address });
        (true, body, state.peers.clone())
    };

    if is_new {
        let mut state = app.0.state.lock().await;
        amplify(
            &mut state.tx_broadcast,
            &peers,
            &app.0.config.self_address,
            req.origin.as_deref().unwrap_or(""),
            &tx_hash_hex,
            TRANSACTION_VALIDATION_PATH,
            body,
            app.0.rpc.as_ref(),
        )
        .await;
    }
    Ok(StatusCode::CREATED)
}

#[derive(Deserialize)]
pub struct BlockEnvelope {
    #[serde(flatten)]
    pub block: BlockDict,
    #[serde(default)]
    pub origin: Option<String>,
}

pub async fn accept_block(State(app): State<AppState>, Json(req): Json<BlockEnvelope>) -> Result<StatusCode, ApiError> {
    let block = Block::from_dict(req.block)?;
    let origin = req.origin.unwrap_or_default();

    let (body, peers, applied_tx_hashes) = {
        let mut state = app.0.state.lock().await;
        let head_hash_hex = state.chain.head_hash_hex();
        let parent_for_election = head_hash_hex.as_deref().unwrap_or("");
        let elected = if head_hash_hex.is_none() {
            // Genesis has no parent round to elect against.
            block.validator_public_key_hex.clone()
        } else {
            let eligible = eligible_validators(&state.accounts, &app.0.params);
            if state.round.has_full_quorum(parent_for_election, &eligible, app.0.params.min_validator_cnt) {
                state
                    .round
                    .elect_for_parent(parent_for_election, &state.accounts, &app.0.params)
                    .unwrap_or_else(|| block.validator_public_key_hex.clone())
            } else {
                let missing = state.round.missing_validators(parent_for_election, &eligible);
                warn!(parent = %parent_for_election, missing = ?missing, "rejecting block proposed without a full rand quorum");
                String::new()
            }
        };

        validation::validate_block(
            &block,
            head_hash_hex.as_deref(),
            &elected,
            &state.accounts,
            &app.0.params,
            &app.0.ico_allowed_keys,
            &app.0.scheme,
            app.now(),
        )
        .map_err(|e| match e {
            ValidationError::NotHead => ApiError(StatusCode::CONFLICT, e.to_string()),
            other => ApiError(StatusCode::UNPROCESSABLE_ENTITY, other.to_string()),
        })?;

        let applied_tx_hashes: Vec<String> = block.transactions.iter().map(|t| t.tx_hash_hex()).collect();
        postchain_core::reducer::apply_block(&mut state.accounts, &block, &app.0.params);
        state.mempool.remove_all(applied_tx_hashes.clone());
        let block_hash_hex = block.block_hash_hex();
        state.chain.append(block.clone()).map_err(|e| ApiError(StatusCode::CONFLICT, e.to_string()))?;
        state.round.retain_only(&block_hash_hex);

        let body = serde_json::json!({ "block": block.to_dict(), "origin": app.0.config.self_address });
        (body, state.peers.clone(), applied_tx_hashes)
    };

    info!(applied = applied_tx_hashes.len(), "accepted new block");

    let mut state = app.0.state.lock().await;
    let block_hash_hex = state.chain.head_hash_hex().unwrap_or_default();
    amplify(
        &mut state.block_broadcast,
        &peers,
        &app.0.config.self_address,
        &origin,
        &block_hash_hex,
        BLOCK_VALIDATION_PATH,
        body,
        app.0.rpc.as_ref(),
    )
    .await;
    Ok(StatusCode::CREATED)
}

#[derive(Deserialize)]
pub struct RandEnvelope {
    #[serde(flatten)]
    pub rand: ValidatorRandDict,
    #[serde(default)]
    pub origin: Option<String>,
}

pub async fn accept_rand(State(app): State<AppState>, Json(req): Json<RandEnvelope>) -> Result<StatusCode, ApiError> {
    let rand = ValidatorRand::from_dict(req.rand)?;
    let origin = req.origin.unwrap_or_default();

    let (body, peers, item_id) = {
        let mut state = app.0.state.lock().await;
        let head_hash_hex = state.chain.head_hash_hex().unwrap_or_default();
        validation::validate_rand(&rand, &head_hash_hex, &app.0.scheme, app.now())
            .map_err(|e| ApiError(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;

        let item_id = format!("{head_hash_hex}:{}", rand.validator_public_key_hex);
        if !state.round.accept_rand(rand.clone()) {
            return Ok(StatusCode::OK);
        }
        let body = serde_json::json!({ "rand": rand.to_dict(), "origin": app.0.config.self_address });
        (body, state.peers.clone(), item_id)
    };

    let mut state = app.0.state.lock().await;
    amplify(
        &mut state.rand_broadcast,
        &peers,
        &app.0.config.self_address,
        &origin,
        &item_id,
        VALIDATOR_RAND_PATH,
        body,
        app.0.rpc.as_ref(),
    )
    .await;
    Ok(StatusCode::CREATED)
}
