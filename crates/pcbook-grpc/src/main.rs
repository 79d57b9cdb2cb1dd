//! pcbook gRPC Server
//!
//! Serves the laptop catalog with token-based access control.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use pcbook_grpc::server::DEFAULT_MAX_IMAGE_SIZE;
use pcbook_grpc::{AccessRules, PcbookServer, ServerConfig};

/// pcbook gRPC Server - laptop catalog with role-based access
#[derive(Parser, Debug)]
#[command(name = "pcbook-server")]
#[command(about = "gRPC server for the pcbook laptop catalog")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "[::1]:8080")]
    addr: SocketAddr,

    /// Folder uploaded images are written to
    #[arg(long, default_value = "img")]
    image_dir: PathBuf,

    /// Token signing secret
    #[arg(long, env = "PCBOOK_SECRET", hide_env_values = true)]
    secret: String,

    /// Lifetime of issued access tokens, in seconds
    #[arg(long, default_value_t = 15 * 60)]
    token_duration_secs: u64,

    /// Largest accepted image, in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_IMAGE_SIZE)]
    max_image_size: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let args = Args::parse();

    let server = PcbookServer::new(ServerConfig {
        addr: args.addr,
        image_dir: args.image_dir,
        secret: args.secret,
        token_duration: Duration::from_secs(args.token_duration_secs),
        max_image_size: args.max_image_size,
        rules: AccessRules::default_policy(),
    });
    server.run().await?;

    Ok(())
}
