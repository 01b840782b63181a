//! Mediastore CLI — command-line access to the media bucket.
//!
//! Reads S3_ENDPOINT, S3_ACCESS_KEY_ID, S3_SECRET_ACCESS_KEY and S3_USE_SSL
//! (or STORAGE_BACKEND=memory). A failed initialization ends the process.

use anyhow::Context;
use clap::{Parser, Subcommand};
use futures::StreamExt;
use mediastore_cli::{format_listing_line, init_tracing};
use mediastore_core::StorageConfig;
use mediastore_storage::MediaStore;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;

#[derive(Parser)]
#[command(name = "mediastore", about = "Media bucket CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect and create the media bucket if it is missing
    Init,
    /// List objects under a prefix (recursive)
    Ls {
        /// Key prefix, e.g. "videos/"
        #[arg(default_value = "")]
        prefix: String,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Download an object
    Get {
        /// Object key
        key: String,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Upload a file, replacing any existing object
    Put {
        /// Object key
        key: String,
        /// File to upload, or "-" for stdin
        file: PathBuf,
    },
    /// Delete an object
    Rm {
        /// Object key
        key: String,
    },
    /// Rename an object (copy then delete, not atomic)
    Mv {
        /// Current key
        from: String,
        /// New key
        to: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    let config = StorageConfig::from_env().context("Invalid storage configuration")?;

    let store = match MediaStore::connect(&config).await {
        Ok(store) => store,
        Err(e) => {
            tracing::error!(error = %e, "Storage initialization failed");
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::Init => {
            println!("bucket {} ready", store.bucket());
        }
        Commands::Ls { prefix, json } => {
            let media = store
                .list_objects(&prefix)
                .await
                .with_context(|| format!("Failed to list {:?}", prefix))?;

            if json {
                let out = serde_json::to_string_pretty(&media).context("Serialize listing")?;
                println!("{}", out);
            } else {
                for item in &media {
                    println!("{}", format_listing_line(item, 120));
                }
            }
        }
        Commands::Get { key, output } => {
            let mut stream = store
                .get_object(&key)
                .await
                .with_context(|| format!("Failed to get {}", key))?;

            let mut writer: Box<dyn tokio::io::AsyncWrite + Unpin> = match output {
                Some(ref path) => Box::new(
                    tokio::fs::File::create(path)
                        .await
                        .with_context(|| format!("Failed to create {}", path.display()))?,
                ),
                None => Box::new(tokio::io::stdout()),
            };

            while let Some(chunk) = stream.next().await {
                let chunk = chunk.with_context(|| format!("Failed to read {}", key))?;
                writer.write_all(&chunk).await.context("Write output")?;
            }
            writer.flush().await.context("Flush output")?;
        }
        Commands::Put { key, file } => {
            if file.as_os_str() == "-" {
                store
                    .upload(&key, tokio::io::stdin())
                    .await
                    .with_context(|| format!("Failed to upload {}", key))?;
            } else {
                let reader = tokio::fs::File::open(&file)
                    .await
                    .with_context(|| format!("Failed to open {}", file.display()))?;
                store
                    .upload(&key, reader)
                    .await
                    .with_context(|| format!("Failed to upload {}", key))?;
            }
            println!("uploaded {}", key);
        }
        Commands::Rm { key } => {
            store
                .remove(&key)
                .await
                .with_context(|| format!("Failed to remove {}", key))?;
            println!("removed {}", key);
        }
        Commands::Mv { from, to } => {
            store
                .rename(&from, &to)
                .await
                .with_context(|| format!("Failed to rename {} to {}", from, to))?;
            println!("renamed {} -> {}", from, to);
        }
    }

    Ok(())
}
