use postchain_node::run_node;
use std::path::PathBuf;

#[tokio::main]
async fn main() {
    let path = std::env::var("POSTCHAIN_CONFIG").unwrap_or_else(|_| "config/postchain.toml".to_string());
    if let Err(err) = run_node(PathBuf::from(path)).await {
        eprintln!("node failed: {err:?}");
        std::process::exit(1);
    }
}
