mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use config::{CliConfig, Overrides};
use std::path::PathBuf;
use std::time::Instant;
use tablecache::{TableCache, TableCacheError};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tablecache-cli")]
#[command(about = "Tablecache CLI - manage and query cache namespaces", long_about = None)]
struct Args {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Service endpoint
    #[arg(long)]
    endpoint: Option<String>,

    /// Instance name
    #[arg(long)]
    instance: Option<String>,

    /// Namespace (table) to operate on
    #[arg(short, long)]
    namespace: Option<String>,

    #[arg(long, env = "TABLECACHE_ACCESS_KEY_ID")]
    access_key_id: Option<String>,

    #[arg(long, env = "TABLECACHE_ACCESS_KEY_SECRET", hide_env_values = true)]
    access_key_secret: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the namespace unless it already exists
    Ensure,
    /// Check whether the namespace exists
    Exists,
    /// Create the namespace
    Create,
    /// Set the namespace TTL in seconds (-1 for unlimited)
    SetTtl {
        #[arg(allow_negative_numbers = true)]
        ttl: i32,
    },
    /// Read a value
    Get { key: String },
    /// Write a value
    Set { key: String, value: String },
    /// Delete a value
    Del { key: String },
}

impl Args {
    fn load_config(&self) -> Result<CliConfig> {
        let base = match &self.config {
            Some(path) => CliConfig::from_file(path)?,
            None => CliConfig::default(),
        };
        Ok(base.apply(Overrides {
            endpoint: self.endpoint.clone(),
            instance_name: self.instance.clone(),
            namespace: self.namespace.clone(),
            access_key_id: self.access_key_id.clone(),
            access_key_secret: self.access_key_secret.clone(),
            timeout_secs: self.timeout,
        }))
    }
}

async fn execute(cache: &TableCache, command: Command) -> Result<String> {
    let output = match command {
        Command::Ensure => {
            cache
                .ensure_namespace_exists()
                .await
                .context("failed to ensure namespace")?;
            "OK".green().to_string()
        }
        Command::Exists => {
            let exists = cache
                .namespace_exists()
                .await
                .context("failed to list namespaces")?;
            format!("(integer) {}", if exists { 1 } else { 0 })
        }
        Command::Create => {
            cache
                .create_namespace()
                .await
                .context("failed to create namespace")?;
            "OK".green().to_string()
        }
        Command::SetTtl { ttl } => {
            cache
                .set_ttl(ttl)
                .await
                .with_context(|| format!("failed to set TTL to {}", ttl))?;
            "OK".green().to_string()
        }
        Command::Get { key } => match cache.get(&key).await {
            Ok(value) => format!("\"{}\"", value),
            Err(TableCacheError::KeyNotFound) => "(nil)".dimmed().to_string(),
            Err(e) => return Err(e).with_context(|| format!("failed to get {}", key)),
        },
        Command::Set { key, value } => {
            cache
                .set(&key, &value)
                .await
                .with_context(|| format!("failed to set {}", key))?;
            "OK".green().to_string()
        }
        Command::Del { key } => {
            cache
                .delete(&key)
                .await
                .with_context(|| format!("failed to delete {}", key))?;
            "OK".green().to_string()
        }
    };
    Ok(output)
}

/// Log filter from `RUST_LOG` (default `info`). Command results are
/// logged by this crate at info, so it stays enabled whatever the user asks
/// for other targets.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    let base = directives
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or("info");
    let own = format!("{}=info", env!("CARGO_CRATE_NAME"));
    EnvFilter::try_new(format!("{},{}", base, own))
        .unwrap_or_else(|_| EnvFilter::new(format!("info,{}", own)))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stdout)
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .with_target(false)
        .init();

    let args = Args::parse();
    let config = args.load_config()?.to_table_cache_config()?;
    let cache = TableCache::from_config(&config).context("failed to create client")?;

    let start = Instant::now();
    match execute(&cache, args.command).await {
        Ok(output) => {
            info!("{}\n{}", output, format!("({:.2?})", start.elapsed()).dimmed());
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "{}", format!("Error: {:#}", e).red());
            std::process::exit(1);
        }
    }
}
