mod bootstrap;
mod round;
mod routes;
mod state;

use anyhow::Result;
use axum::routing::{get, post};
use axum::Router;
use postchain_config::NodeConfig;
use postchain_core::ports::{ClockSource, KeyPairProvider};
use postchain_crypto::{generate_ed25519, load_key_file, save_key_file, Ed25519KeyPair, Ed25519Scheme};
use postchain_gossip::{join_network, ReqwestRpcClient, BLOCKCHAIN_PATH, KNOWN_NODES_PATH, NODE_REQUEST_PATH};
use state::{AppInner, AppState, NodeState, SystemClock};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn, Level};

pub async fn run_node(config_path: PathBuf) -> Result<()> {
    let config = NodeConfig::load(&config_path)?;
    init_logging();
    info!(?config_path, self_address = %config.self_address, "starting node");

    let key_material = match load_key_file(&config.private_key_path) {
        Ok(key) => key,
        Err(_) => {
            let key = generate_ed25519();
            save_key_file(&config.private_key_path, &key)?;
            info!(path = %config.private_key_path.display(), "generated new validator key");
            key
        }
    };
    let keypair: Arc<dyn KeyPairProvider> = Arc::new(Ed25519KeyPair::from_key_material(&key_material)?);
    info!(public_key_hex = %keypair.public_key_hex(), "loaded validator identity");

    let params = config.consensus_params();
    let ico_allowed_keys = bootstrap::load_ico_allowed_keys(config.ico_public_keys_path.as_deref())?;
    let (chain, accounts) = bootstrap::load_initial_chain(config.init_blockchain_path.as_deref(), &params)?;

    let mut node_state = NodeState::new(params.max_tx_per_block * 50);
    node_state.chain = chain;
    node_state.accounts = accounts;
    node_state.peers = postchain_gossip::PeerSet::load_from_file(&config.known_nodes_path);

    let rpc = Arc::new(ReqwestRpcClient::new(config.rpc_timeout_ms));

    if !config.seed_peers.is_empty() {
        match join_network(&config.self_address, &config.seed_peers, rpc.as_ref()).await {
            Ok(mut peers) => {
                for known in node_state.peers.to_vec() {
                    peers.accept(known);
                }
                info!(count = peers.len(), "joined network");
                match bootstrap::sync_chain_from_peers(
                    &peers,
                    rpc.as_ref(),
                    &Ed25519Scheme,
                    &ico_allowed_keys,
                    &params,
                    SystemClock.now(),
                )
                .await
                {
                    Some((chain, accounts)) if chain.len() > node_state.chain.len() => {
                        info!(height = chain.len(), "adopted longer validating chain from a peer");
                        node_state.chain = chain;
                        node_state.accounts = accounts;
                    }
                    _ => {}
                }
                if let Err(err) = peers.save_to_file(&config.known_nodes_path) {
                    warn!(%err, "could not persist known peers");
                }
                node_state.peers = peers;
            }
            Err(err) => warn!(%err, "could not join network through any seed peer, starting isolated"),
        }
    }

    let app = AppState(Arc::new(AppInner {
        config: config.clone(),
        params,
        ico_allowed_keys,
        keypair,
        scheme: Ed25519Scheme,
        rpc,
        clock: SystemClock,
        state: Mutex::new(node_state),
    }));

    let ticker = tokio::spawn(round::run_round_ticker(app.clone()));

    let router = Router::new()
        .route("/health", get(routes::health))
        .route("/status", get(routes::status))
        .route(KNOWN_NODES_PATH, get(routes::known_nodes))
        .route(NODE_REQUEST_PATH, post(routes::accept_node))
        .route(BLOCKCHAIN_PATH, get(routes::blockchain))
        .route(postchain_gossip::TRANSACTION_VALIDATION_PATH, post(routes::accept_transaction))
        .route(postchain_gossip::BLOCK_VALIDATION_PATH, post(routes::accept_block))
        .route(postchain_gossip::VALIDATOR_RAND_PATH, post(routes::accept_rand))
        .with_state(app);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(addr = %config.listen_addr, "listening");
    let serve = axum::serve(listener, router);

    tokio::select! {
        result = serve => result.map_err(anyhow::Error::from),
        result = ticker => result.map_err(anyhow::Error::from),
    }
}

fn init_logging() {
    let subscriber = tracing_subscriber::fmt().with_max_level(Level::INFO).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
