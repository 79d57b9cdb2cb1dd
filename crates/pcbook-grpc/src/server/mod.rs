//! gRPC server for the laptop catalog.

mod auth;
mod gate;
mod laptop;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tonic::Status;
use tonic::metadata::MetadataMap;
use tonic::transport::Server;
use tonic::transport::server::Router;

use pcbook::{
    DiskImageStore, InMemoryLaptopStore, InMemoryRatingStore, InMemoryUserStore, JwtManager,
    StoreError,
};

use crate::proto::{auth_service_server::AuthServiceServer, laptop_service_server::LaptopServiceServer};

pub use auth::{AuthServer, seed_users};
pub use gate::{AccessGate, AccessRules, Gated};
pub use laptop::LaptopServer;

/// Largest image accepted by `UploadImage` unless configured otherwise.
pub const DEFAULT_MAX_IMAGE_SIZE: usize = 1 << 20;

/// Everything the server needs at startup. Immutable once running.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Address to listen on
    pub addr: SocketAddr,
    /// Folder uploaded images are written to
    pub image_dir: PathBuf,
    /// Token signing secret
    pub secret: String,
    /// Lifetime of issued access tokens
    pub token_duration: Duration,
    /// Upper bound on a single uploaded image, in bytes
    pub max_image_size: usize,
    /// Which roles may call which methods
    pub rules: AccessRules,
}

/// Server configuration and runner.
#[derive(Debug)]
pub struct PcbookServer {
    config: ServerConfig,
}

impl PcbookServer {
    /// Create a new server from its configuration.
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Build the stores, seed the accounts and assemble the gated services.
    pub fn router(&self) -> anyhow::Result<Router> {
        let config = &self.config;
        let jwt = JwtManager::new(config.secret.as_bytes(), config.token_duration)?;

        let users = Arc::new(InMemoryUserStore::new());
        seed_users(users.as_ref())?;

        let laptops = LaptopServer::new(
            Arc::new(InMemoryLaptopStore::new()),
            Arc::new(DiskImageStore::new(&config.image_dir)?),
            Arc::new(InMemoryRatingStore::new()),
        )
        .with_max_image_size(config.max_image_size);
        let auth = AuthServer::new(users, jwt.clone())?;
        let gate = AccessGate::new(jwt, config.rules.clone());

        Ok(Server::builder()
            .add_service(gate.intercept(AuthServiceServer::new(auth)))
            .add_service(gate.intercept(LaptopServiceServer::new(laptops))))
    }

    /// Run the server until shutdown signal.
    pub async fn run(self) -> anyhow::Result<()> {
        let router = self.router()?;

        tracing::info!(
            addr = %self.config.addr,
            image_dir = %self.config.image_dir.display(),
            "Starting gRPC server"
        );

        router
            .serve_with_shutdown(self.config.addr, shutdown_signal())
            .await?;

        tracing::info!("gRPC server shut down");
        Ok(())
    }
}

/// Translate a store error into the call-level error taxonomy.
pub(crate) fn status_from_store(err: StoreError) -> Status {
    match err {
        StoreError::AlreadyExists(_) => Status::already_exists(err.to_string()),
        StoreError::InvalidId { .. } | StoreError::InvalidImageType(_) => {
            Status::invalid_argument(err.to_string())
        }
        StoreError::RatingLimit(_) => Status::resource_exhausted(err.to_string()),
        StoreError::Cancelled => Status::cancelled("request is canceled"),
        StoreError::DeadlineExceeded => Status::deadline_exceeded("deadline is exceeded"),
        StoreError::Io(e) => {
            tracing::error!(error = %e, "store IO failure");
            Status::internal("storage failure")
        }
    }
}

/// The caller's deadline, from the `grpc-timeout` request header.
pub(crate) fn request_deadline(metadata: &MetadataMap) -> Option<Instant> {
    let value = metadata.get("grpc-timeout")?.to_str().ok()?;
    parse_grpc_timeout(value).map(|timeout| Instant::now() + timeout)
}

/// Parse `<at most 8 digits><unit>` where unit is one of `HMSmun`.
fn parse_grpc_timeout(value: &str) -> Option<Duration> {
    if value.len() < 2 || value.len() > 9 {
        return None;
    }
    let (digits, unit) = value.split_at(value.len() - 1);
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let amount: u64 = digits.parse().ok()?;
    let timeout = match unit {
        "H" => Duration::from_secs(amount * 60 * 60),
        "M" => Duration::from_secs(amount * 60),
        "S" => Duration::from_secs(amount),
        "m" => Duration::from_millis(amount),
        "u" => Duration::from_micros(amount),
        "n" => Duration::from_nanos(amount),
        _ => return None,
    };
    Some(timeout)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
