//! WolfDrive - Per-User File Storage over an Object Store
//!
//! Server binary: loads the configuration, connects to the object store
//! and serves the HTTP API.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wolfdrive::api::HttpServer;
use wolfdrive::config::{DriveConfig, StoreBackend};
use wolfdrive::drive::{format_size_si, Drive, UserId};
use wolfdrive::error::Result;
use wolfdrive::store;

/// WolfDrive - Per-User File Storage over an Object Store
#[derive(Parser)]
#[command(name = "wolfdrive")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "wolfdrive.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides [logging].level
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the WolfDrive server
    Start,

    /// Create the root folder for a user account
    Provision {
        /// Numeric account id
        #[arg(long)]
        user_id: UserId,
    },

    /// Initialize a new configuration file
    Init {
        /// Output path for configuration file
        #[arg(short, long, default_value = "wolfdrive.toml")]
        output: PathBuf,

        /// Bucket name
        #[arg(long, default_value = "user-files")]
        bucket: String,
    },

    /// Validate configuration file
    Validate,

    /// Show server information
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging settings come from the config file when it is readable
    let logging = DriveConfig::from_file(&cli.config)
        .map(|c| c.logging)
        .unwrap_or_default();
    let level = cli.log_level.as_deref().unwrap_or(&logging.level);
    init_logging(level, &logging.format);

    match cli.command {
        Commands::Start => run_start(cli.config).await,
        Commands::Provision { user_id } => run_provision(cli.config, user_id).await,
        Commands::Init { output, bucket } => run_init(output, bucket),
        Commands::Validate => run_validate(cli.config),
        Commands::Info => run_info(cli.config),
    }
}

/// Initialize logging
fn init_logging(level: &str, format: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.into());

    let registry = tracing_subscriber::registry().with(env_filter);
    match format {
        "compact" => registry
            .with(tracing_subscriber::fmt::layer().compact())
            .init(),
        _ => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Load the configuration and connect the drive to its store
async fn open_drive(config_path: &Path) -> Result<(DriveConfig, Drive)> {
    let config = match DriveConfig::from_file(config_path) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Failed to load configuration from {:?}: {}", config_path, e);
            tracing::error!("Please check that the config file exists and is valid TOML");
            return Err(e);
        }
    };

    let store = store::open(&config.store)?;
    let drive = Drive::new(store, config.drive.root_prefix.clone());

    if let Err(e) = drive.ensure_bucket().await {
        tracing::error!("Failed to prepare bucket {}: {}", config.store.bucket, e);
        return Err(e);
    }

    Ok((config, drive))
}

/// Start the WolfDrive server
async fn run_start(config_path: PathBuf) -> Result<()> {
    tracing::info!("Starting WolfDrive...");

    let (config, drive) = open_drive(&config_path).await?;
    tracing::info!(
        "Serving bucket {} with root template {}",
        config.store.bucket,
        config.drive.root_prefix
    );

    let http_server = HttpServer::new(config.api.clone(), drive, config.max_upload_bytes())?;

    if let Err(e) = http_server.start_with_shutdown(shutdown_signal()).await {
        tracing::error!("HTTP server error: {}", e);
        return Err(e);
    }

    tracing::info!("WolfDrive stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Received shutdown signal");
}

/// Create a user's root folder
async fn run_provision(config_path: PathBuf, user_id: UserId) -> Result<()> {
    let (_config, drive) = open_drive(&config_path).await?;
    let root = drive.user_root(user_id);

    drive.provision_user(user_id).await?;
    println!("✓ Root folder ready for user {}: {}", user_id, root);
    Ok(())
}

/// Initialize configuration file
fn run_init(output: PathBuf, bucket: String) -> Result<()> {
    let config_content = format!(r#"# WolfDrive Configuration
# Generated configuration file

[store]
backend = "s3"
endpoint = "http://127.0.0.1:9000"
region = "us-east-1"
bucket = "{bucket}"
access_key = "minioadmin"
secret_key = "minioadmin"
path_style = true

[drive]
root_prefix = "root/{{id}}/"
max_upload_mb = 512

[api]
enabled = true
bind_address = "0.0.0.0:8080"
cors_enabled = false
# Set by the authenticating proxy in front of WolfDrive
user_header = "x-user-id"

[logging]
level = "info"
format = "pretty"
"#);

    std::fs::write(&output, config_content)?;
    println!("Configuration file created: {}", output.display());
    println!("\nEdit the file to configure your object store credentials.");
    println!("Then start with: wolfdrive --config {} start", output.display());

    Ok(())
}

/// Validate configuration file
fn run_validate(config_path: PathBuf) -> Result<()> {
    match DriveConfig::from_file(&config_path) {
        Ok(config) => {
            println!("✓ Configuration is valid");
            println!("  Backend: {:?}", config.store.backend);
            println!("  Bucket: {}", config.store.bucket);
            println!("  Root Template: {}", config.drive.root_prefix);
            println!("  API: {}", config.api.bind_address);
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Configuration error: {}", e);
            Err(e)
        }
    }
}

/// Show server information
fn run_info(config_path: PathBuf) -> Result<()> {
    let config = DriveConfig::from_file(&config_path)?;

    println!("WolfDrive Server Information");
    println!("============================");
    println!();
    println!("Object Store:");
    println!("  Backend:        {:?}", config.store.backend);
    if config.store.backend == StoreBackend::S3 {
        println!("  Endpoint:       {}", config.store.endpoint.as_deref().unwrap_or("-"));
        println!("  Region:         {}", config.store.region);
        println!("  Path Style:     {}", config.store.path_style);
    }
    println!("  Bucket:         {}", config.store.bucket);
    println!();
    println!("Drive:");
    println!("  Root Template:  {}", config.drive.root_prefix);
    println!("  Max Upload:     {}", format_size_si(config.max_upload_bytes() as u64));
    println!();
    println!("API:");
    println!("  Enabled:        {}", config.api.enabled);
    println!("  Bind Address:   {}", config.api.bind_address);
    println!("  CORS:           {}", config.api.cors_enabled);
    println!("  User Header:    {}", config.api.user_header);

    Ok(())
}
