use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use postchain_config::NodeConfig;
use postchain_core::{Transaction, TransactionSource, TransactionTarget, TransactionType};
use postchain_crypto::{generate_ed25519, load_key_file, save_key_file, Ed25519Scheme};
use postchain_node::run_node;
use tokio::runtime::Runtime;

#[derive(Parser)]
#[command(name = "postchain", version, about = "postchain node CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter config file.
    Init {
        #[arg(long, default_value = "config/postchain.toml")]
        config: PathBuf,
    },
    /// Generate a validator key file.
    Keygen {
        #[arg(long, default_value = "node.key")]
        out: PathBuf,
    },
    /// Build a genesis blockchain file funding a set of ICO keys.
    Genesis {
        /// Validator key files to credit with the configured ICO token grant.
        #[arg(long = "key", required = true)]
        keys: Vec<PathBuf>,
        #[arg(long, default_value = "genesis.json")]
        out: PathBuf,
    },
    /// Run a node.
    Node {
        #[command(subcommand)]
        cmd: NodeCmd,
    },
}

#[derive(Subcommand)]
enum NodeCmd {
    Start {
        #[arg(long, default_value = "config/postchain.toml")]
        config: PathBuf,
    },
    Status,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Init { config } => init_config(config)?,
        Commands::Keygen { out } => keygen(out)?,
        Commands::Genesis { keys, out } => genesis(keys, out)?,
        Commands::Node { cmd } => match cmd {
            NodeCmd::Start { config } => {
                let rt = Runtime::new()?;
                rt.block_on(async move { run_node(config).await })?;
            }
            NodeCmd::Status => {
                println!("status endpoint not queried from the CLI; hit GET /status on the node directly");
            }
        },
    }
    Ok(())
}

fn init_config(path: PathBuf) -> Result<()> {
    if path.exists() {
        println!("config already exists at {:?}", path);
        return Ok(());
    }
    let config = NodeConfig::example();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, toml::to_string_pretty(&config)?)?;
    println!("wrote config to {:?}", path);
    Ok(())
}

fn keygen(out: PathBuf) -> Result<()> {
    if out.exists() {
        anyhow::bail!("key file already exists at {:?}", out);
    }
    let key = generate_ed25519();
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)?;
    }
    save_key_file(&out, &key)?;
    println!("wrote validator key to {:?}", out);
    println!("public key: {}", key.public_key_hex);
    Ok(())
}

/// Builds a founder-signed genesis block: one ICO transaction per key file,
/// each granted the default consensus parameters' `ico_tokens`, written as
/// the single-block chain `NodeConfig::init_blockchain_path` expects. The
/// printed public keys are what `ico_public_keys_path` should list.
fn genesis(keys: Vec<PathBuf>, out: PathBuf) -> Result<()> {
    let params = postchain_core::ConsensusParams::default();
    let scheme = Ed25519Scheme;

    let mut transactions = Vec::with_capacity(keys.len());
    let mut allowed_keys = Vec::with_capacity(keys.len());
    for key_path in &keys {
        let key = load_key_file(key_path).with_context(|| format!("loading {:?}", key_path))?;
        let source = TransactionSource {
            source_pk_hex: key.public_key_hex.clone(),
            tx_type: TransactionType::Ico,
            content_type: None,
            content_hash_hex: None,
            tx_fee: None,
        };
        let target = TransactionTarget {
            tx_token: Some(params.ico_tokens),
            ..TransactionTarget::default()
        };
        let mut tx = Transaction::new(source, target, 0.0);
        tx.sign(&scheme, &key.secret_key_hex);
        transactions.push(tx);
        allowed_keys.push(key.public_key_hex);
    }

    let founder = load_key_file(&keys[0])?;
    let mut block = postchain_core::Block::new(None, transactions, founder.public_key_hex, 0.0);
    block.sign(&scheme, &founder.secret_key_hex);

    let dicts = vec![block.to_dict()];
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&out, serde_json::to_string_pretty(&dicts)?)?;
    println!("wrote genesis block with {} ICO grant(s) to {:?}", allowed_keys.len(), out);
    println!("ico_public_keys_path allow-list entries:");
    for pk in &allowed_keys {
        println!("  {pk}");
    }
    Ok(())
}
