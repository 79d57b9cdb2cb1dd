//! pcbook gRPC Client
//!
//! Logs in, then exercises the laptop catalog with generated sample data.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tonic::transport::Channel;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use pcbook::{Filter, Memory, MemoryUnit, sample};
use pcbook_grpc::client::auth_methods;
use pcbook_grpc::{AuthClient, AuthInterceptor, LaptopClient, RefreshPolicy};

/// pcbook gRPC Client - exercise a running catalog server
#[derive(Parser, Debug)]
#[command(name = "pcbook-client")]
#[command(about = "Client for the pcbook laptop catalog")]
struct Args {
    /// Server URI
    #[arg(long, default_value = "http://[::1]:8080")]
    addr: String,

    /// Account to log in as
    #[arg(long, default_value = "admin1")]
    username: String,

    /// Password for the account
    #[arg(long, default_value = "secret")]
    password: String,

    /// Seconds between token refreshes
    #[arg(long, default_value_t = 30)]
    refresh_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create random laptops
    Create {
        /// How many to create
        #[arg(long, default_value_t = 1)]
        count: usize,
    },
    /// Create random laptops, then search them
    Search {
        /// Laptops to create before searching
        #[arg(long, default_value_t = 10)]
        seed: usize,
        /// Price ceiling in USD
        #[arg(long, default_value_t = 3000.0)]
        max_price: f64,
        /// Minimum CPU cores
        #[arg(long, default_value_t = 4)]
        min_cores: u32,
        /// Minimum CPU base clock
        #[arg(long, default_value_t = 2.5)]
        min_ghz: f64,
        /// Minimum RAM in gigabytes
        #[arg(long, default_value_t = 8)]
        min_ram_gb: u64,
    },
    /// Create a random laptop and upload an image for it
    Upload {
        /// Image file to upload
        #[arg(long)]
        image: PathBuf,
    },
    /// Create random laptops and rate them
    Rate {
        /// Laptops to create
        #[arg(long, default_value_t = 3)]
        laptops: usize,
        /// Rating rounds over all laptops
        #[arg(long, default_value_t = 1)]
        rounds: usize,
    },
}

async fn create_random(client: &LaptopClient, count: usize) -> anyhow::Result<Vec<String>> {
    let mut ids = Vec::with_capacity(count);
    for _ in 0..count {
        let mut laptop = sample::new_laptop();
        laptop.id.clear();
        ids.push(client.create_laptop(laptop).await?);
    }
    Ok(ids)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let args = Args::parse();

    let channel = Channel::from_shared(args.addr.clone())
        .context("invalid server address")?
        .connect()
        .await
        .with_context(|| format!("cannot connect to {}", args.addr))?;

    let auth = AuthClient::new(channel.clone(), &args.username, &args.password);
    let policy = RefreshPolicy {
        interval: std::time::Duration::from_secs(args.refresh_secs),
        ..RefreshPolicy::default()
    };
    let interceptor = AuthInterceptor::new(auth, auth_methods(), policy)
        .await
        .context("login failed")?;
    let client = LaptopClient::new(channel, interceptor.clone());

    match args.command {
        Command::Create { count } => {
            for id in create_random(&client, count).await? {
                println!("{id}");
            }
        }
        Command::Search {
            seed,
            max_price,
            min_cores,
            min_ghz,
            min_ram_gb,
        } => {
            create_random(&client, seed).await?;
            let filter = Filter {
                max_price_usd: max_price,
                min_cpu_cores: min_cores,
                min_cpu_ghz: min_ghz,
                min_ram: Some(Memory::new(min_ram_gb, MemoryUnit::Gigabyte)),
            };
            for laptop in client.search_laptop(filter).await? {
                println!("{}", pcbook::serializer::to_json(&laptop)?);
            }
        }
        Command::Upload { image } => {
            let [laptop_id] = create_random(&client, 1)
                .await?
                .try_into()
                .map_err(|_| anyhow::anyhow!("expected one laptop id"))?;
            let response = client.upload_image_file(&laptop_id, &image).await?;
            println!("image {} uploaded, {} bytes", response.id, response.size);
        }
        Command::Rate { laptops, rounds } => {
            let ids = create_random(&client, laptops).await?;
            for round in 1..=rounds {
                let ratings = ids.iter().map(|id| (id.clone(), sample::new_score()));
                for response in client.rate_laptop(ratings).await? {
                    println!(
                        "round {round}: laptop {} rated {} times, average {:.2}",
                        response.laptop_id, response.rated_count, response.average_score
                    );
                }
            }
        }
    }

    interceptor.shutdown();
    Ok(())
}
