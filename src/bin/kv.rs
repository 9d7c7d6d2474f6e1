//! CLI for talking to a store cluster

use clap::{Parser, Subcommand};
use kvclient::{Client, Config, HostEntry};

#[derive(Parser)]
#[command(name = "kv")]
#[command(about = "kvclient command-line interface")]
#[command(version)]
struct Cli {
    /// Node address (repeatable), e.g. node-1:8098
    #[arg(long = "host", value_name = "ADDR")]
    hosts: Vec<String>,

    /// Balancer strategy
    #[arg(long, default_value = "round_robin")]
    balancer: String,

    /// Prefer the binary protocol over HTTP
    #[arg(long)]
    pbc: bool,

    /// Config file (TOML); command-line hosts take precedence
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Liveness check against one node
    Ping,

    /// List bucket names
    Buckets,

    /// List the keys of a bucket
    Keys {
        /// Bucket name
        bucket: String,
    },

    /// Fetch a value
    Get {
        /// Bucket name
        bucket: String,
        /// Key
        key: String,
    },

    /// Store a value
    Put {
        /// Bucket name
        bucket: String,
        /// Key
        key: String,
        /// File path to read the value from
        #[arg(long)]
        file: std::path::PathBuf,
    },

    /// Delete a value
    Delete {
        /// Bucket name
        bucket: String,
        /// Key
        key: String,
    },

    /// Store a blob
    PutFile {
        /// Key
        key: String,
        /// File path
        #[arg(long)]
        file: std::path::PathBuf,
    },

    /// Fetch a blob
    GetFile {
        /// Key
        key: String,
        /// Output file
        #[arg(long)]
        output: std::path::PathBuf,
    },

    /// Delete a blob
    DeleteFile {
        /// Key
        key: String,
    },

    /// Check whether a blob exists
    FileExists {
        /// Key
        key: String,
    },

    /// Print the resolved client identity
    ClientId,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if !cli.hosts.is_empty() {
        config.hosts = cli.hosts.iter().map(|h| HostEntry::from(h.clone())).collect();
        config.host = None;
    }
    config.balancer = cli.balancer.clone();
    if cli.pbc {
        config.protocol = kvclient::Protocol::Pbc;
    }

    let client = Client::new(config)?;

    match cli.command {
        Commands::Ping => {
            client.backend().ping().await?;
            println!("pong");
        }

        Commands::Buckets => {
            for name in client.buckets().await? {
                println!("{}", name);
            }
        }

        Commands::Keys { bucket } => {
            for key in client.backend().list_keys(&bucket).await? {
                println!("{}", key);
            }
        }

        Commands::Get { bucket, key } => match client.backend().get(&bucket, &key).await? {
            Some(value) => {
                use std::io::Write;
                std::io::stdout().write_all(&value)?;
            }
            None => {
                eprintln!("not found: {}/{}", bucket, key);
                std::process::exit(1);
            }
        },

        Commands::Put { bucket, key, file } => {
            let data = tokio::fs::read(&file).await?;
            client.backend().put(&bucket, &key, &data).await?;
            println!("stored {}/{} ({} bytes)", bucket, key, data.len());
        }

        Commands::Delete { bucket, key } => {
            client.backend().delete(&bucket, &key).await?;
            println!("deleted {}/{}", bucket, key);
        }

        Commands::PutFile { key, file } => {
            let data = tokio::fs::read(&file).await?;
            client.store_file(&key, &data).await?;
            println!("stored {} ({} bytes)", key, data.len());
        }

        Commands::GetFile { key, output } => {
            let data = client.get_file(&key).await?;
            tokio::fs::write(&output, &data).await?;
            println!("wrote {} bytes to {}", data.len(), output.display());
        }

        Commands::DeleteFile { key } => {
            client.delete_file(&key).await?;
            println!("deleted {}", key);
        }

        Commands::FileExists { key } => {
            let exists = client.file_exists(&key).await?;
            println!("{}", exists);
            if !exists {
                std::process::exit(1);
            }
        }

        Commands::ClientId => {
            println!("{}", client.client_id().await?);
        }
    }

    Ok(())
}
