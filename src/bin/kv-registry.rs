//! Registry server entry point.
//!
//! Configured entirely through `KV_REGISTRY_*` environment variables; log
//! verbosity follows `RUST_LOG`.

use kv_registry::{Server, ServerConfig};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("kv_registry=info")),
        )
        .init();

    if let Err(e) = run() {
        tracing::error!(error = %e, "Registry server failed");
        std::process::exit(1);
    }
}

fn run() -> kv_registry::Result<()> {
    let config = ServerConfig::from_env()?;
    let server = Server::bind(config)?;
    server.serve()
}
