use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use nfs_bridge::config::{DEFAULT_HANDLE_LIMIT, DEFAULT_LISTEN, DEFAULT_VERIFIER_LIMIT};
use nfs_bridge::{RpcServer, ServerConfig, SessionHandler};

/// Export a local directory over NFSv3
#[derive(Debug, Parser)]
#[command(name = "nfs-bridge", version, about)]
struct Args {
    /// Directory to export
    export_dir: PathBuf,

    /// Address to listen on
    #[arg(short, long, default_value = DEFAULT_LISTEN)]
    listen: SocketAddr,

    /// Number of file handles kept alive
    #[arg(long, default_value_t = DEFAULT_HANDLE_LIMIT)]
    handle_limit: NonZeroUsize,

    /// Number of directory listings cached for paged READDIR
    #[arg(long, default_value_t = DEFAULT_VERIFIER_LIMIT)]
    verifier_limit: NonZeroUsize,

    /// Refuse every modifying procedure
    #[arg(long)]
    read_only: bool,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = ServerConfig::new(args.export_dir)
        .with_listen(args.listen)
        .with_read_only(args.read_only);
    config.handle_limit = args.handle_limit;
    config.verifier_limit = args.verifier_limit;
    config.validate()?;

    info!(
        "Exporting {} on {}{}",
        config.export_root.display(),
        config.listen,
        if config.read_only { " (read-only)" } else { "" }
    );

    let filesystem = config.create_filesystem()?;
    let handler = Arc::new(SessionHandler::new(filesystem, &config));

    let server = RpcServer::new(config.listen, handler);
    server.run().await
}
