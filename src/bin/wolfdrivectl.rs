//! WolfDriveCtl - Command line client for a WolfDrive server
//!
//! Usage:
//!   wolfdrivectl --user 7 ls /            - List a directory
//!   wolfdrivectl --user 7 upload ./a.txt docs
//!   wolfdrivectl --user 7 download docs/  - Fetch a directory as download.zip
//!   wolfdrivectl check-config             - Validate the server config file

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use reqwest::{Client, RequestBuilder, Response, StatusCode};

use wolfdrive::api::ErrorResponse;
use wolfdrive::config::DriveConfig;
use wolfdrive::drive::{format_size_si, ListingEntry};

/// WolfDrive Control Tool
#[derive(Parser)]
#[command(name = "wolfdrivectl")]
#[command(about = "Browse and manage files on a WolfDrive server", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "/etc/wolfdrive/config.toml")]
    config: PathBuf,

    /// API endpoint to connect to (overrides config)
    #[arg(short, long)]
    endpoint: Option<String>,

    /// User id sent in the user header
    #[arg(short, long, default_value_t = 0)]
    user: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List a directory (`/` is the user root)
    Ls {
        #[arg(default_value = "/")]
        path: String,
    },
    /// Create a directory
    Mkdir { path: String },
    /// Show a file or directory
    Info { path: String },
    /// Upload a local file into a directory
    Upload {
        /// Local file
        file: PathBuf,
        /// Target directory
        #[arg(default_value = "")]
        directory: String,
        /// Name to store the file under (defaults to the local name)
        #[arg(long)]
        name: Option<String>,
        /// Content type sent with the upload
        #[arg(long, default_value = "application/octet-stream")]
        content_type: String,
    },
    /// Delete a file, or a directory recursively
    Rm { path: String },
    /// Download a file, or a directory (trailing `/`) as a zip archive
    Download {
        path: String,
        /// Output file (defaults to the remote name)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Move or rename a file or directory
    Mv { from: String, to: String },
    /// Search for entries whose path contains a string
    Search { query: String },
    /// Check configuration file for errors
    CheckConfig {
        /// Path to config file to check (defaults to --config path)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Thin HTTP client carrying endpoint and identity
struct DriveClient {
    endpoint: String,
    header: String,
    user: u64,
    client: Client,
}

impl DriveClient {
    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header(self.header.as_str(), self.user.to_string())
    }

    fn url(&self, route: &str) -> String {
        format!("{}{}", self.endpoint.trim_end_matches('/'), route)
    }

    fn get(&self, route: &str) -> RequestBuilder {
        self.request(self.client.get(self.url(route)))
    }

    fn post(&self, route: &str) -> RequestBuilder {
        self.request(self.client.post(self.url(route)))
    }

    fn delete(&self, route: &str) -> RequestBuilder {
        self.request(self.client.delete(self.url(route)))
    }
}

/// Turn a non-success response into an error carrying the server's message
async fn check(response: Response) -> anyhow::Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = match response.json::<ErrorResponse>().await {
        Ok(body) => body.message,
        Err(_) => status.canonical_reason().unwrap_or("unknown").to_string(),
    };
    bail!("{} ({})", message, status.as_u16())
}

// ============ Main ============

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = DriveConfig::from_file(&cli.config).ok();

    // Determine API endpoint
    let endpoint = match (&cli.endpoint, &config) {
        (Some(e), _) => e.clone(),
        (None, Some(config)) => {
            // Convert bind address to localhost if it's 0.0.0.0
            let addr = &config.api.bind_address;
            if addr.starts_with("0.0.0.0") {
                format!("http://127.0.0.1:{}", addr.split(':').nth(1).unwrap_or("8080"))
            } else {
                format!("http://{}", addr)
            }
        }
        (None, None) => "http://127.0.0.1:8080".to_string(),
    };

    let header = config
        .as_ref()
        .map(|c| c.api.user_header.clone())
        .unwrap_or_else(|| "x-user-id".to_string());

    let drive = DriveClient {
        endpoint,
        header,
        user: cli.user,
        client: Client::new(),
    };

    let result = match &cli.command {
        Commands::Ls { path } => list(&drive, path).await,
        Commands::Mkdir { path } => mkdir(&drive, path).await,
        Commands::Info { path } => info(&drive, path).await,
        Commands::Upload {
            file,
            directory,
            name,
            content_type,
        } => upload(&drive, file, directory, name.as_deref(), content_type).await,
        Commands::Rm { path } => remove(&drive, path).await,
        Commands::Download { path, output } => download(&drive, path, output.as_deref()).await,
        Commands::Mv { from, to } => move_entry(&drive, from, to).await,
        Commands::Search { query } => search(&drive, query).await,
        Commands::CheckConfig { file } => {
            let config_path = file.clone().unwrap_or_else(|| cli.config.clone());
            check_config(&config_path)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

// ============ Commands ============

fn print_entries(entries: &[ListingEntry]) {
    println!("{:<10} {:>10}  {}", "TYPE", "SIZE", "PATH");
    println!("{}", "-".repeat(65));

    for entry in entries {
        let (kind, size) = if entry.is_directory() {
            ("\x1b[1;34mdir\x1b[0m       ", "-".to_string())
        } else {
            ("file      ", format_size_si(entry.size.unwrap_or(0)))
        };
        println!("{} {:>10}  {}", kind, size, entry.path);
    }
    println!();
    println!("{} entries", entries.len());
}

fn print_entry(entry: &ListingEntry) {
    println!("Name:  {}", entry.name);
    println!("Path:  {}", entry.path);
    if entry.is_directory() {
        println!("Type:  directory");
    } else {
        println!("Type:  file");
        if let Some(size) = entry.size {
            println!("Size:  {} ({} bytes)", format_size_si(size), size);
        }
    }
}

async fn list(drive: &DriveClient, path: &str) -> anyhow::Result<()> {
    let response = drive.get("/api/directory").query(&[("path", path)]).send().await?;
    let entries: Vec<ListingEntry> = check(response).await?.json().await?;
    print_entries(&entries);
    Ok(())
}

async fn mkdir(drive: &DriveClient, path: &str) -> anyhow::Result<()> {
    let response = drive.post("/api/directory").query(&[("path", path)]).send().await?;
    let entry: ListingEntry = check(response).await?.json().await?;
    println!("✓ Created {}", entry.path);
    Ok(())
}

async fn info(drive: &DriveClient, path: &str) -> anyhow::Result<()> {
    let response = drive.get("/api/resource").query(&[("path", path)]).send().await?;
    let entry: ListingEntry = check(response).await?.json().await?;
    print_entry(&entry);
    Ok(())
}

async fn upload(
    drive: &DriveClient,
    file: &Path,
    directory: &str,
    name: Option<&str>,
    content_type: &str,
) -> anyhow::Result<()> {
    let name = match name {
        Some(n) => n.to_string(),
        None => file
            .file_name()
            .and_then(|n| n.to_str())
            .context("cannot derive a file name, pass --name")?
            .to_string(),
    };

    let data = tokio::fs::read(file)
        .await
        .with_context(|| format!("reading {}", file.display()))?;

    let response = drive
        .post("/api/resource")
        .query(&[("path", directory), ("name", name.as_str())])
        .header(reqwest::header::CONTENT_TYPE, content_type)
        .body(data)
        .send()
        .await?;
    let entry: ListingEntry = check(response).await?.json().await?;
    println!("✓ Uploaded {} ({})", entry.path, format_size_si(entry.size.unwrap_or(0)));
    Ok(())
}

async fn remove(drive: &DriveClient, path: &str) -> anyhow::Result<()> {
    let response = drive.delete("/api/resource").query(&[("path", path)]).send().await?;
    let response = check(response).await?;
    if response.status() == StatusCode::NO_CONTENT {
        println!("✓ Deleted {}", path);
    }
    Ok(())
}

async fn download(drive: &DriveClient, path: &str, output: Option<&Path>) -> anyhow::Result<()> {
    let response = drive
        .get("/api/resource/download")
        .query(&[("path", path)])
        .send()
        .await?;
    let data = check(response).await?.bytes().await?;

    let target = match output {
        Some(p) => p.to_path_buf(),
        None if path.ends_with('/') => PathBuf::from("download.zip"),
        None => PathBuf::from(path.rsplit('/').next().unwrap_or("download")),
    };

    tokio::fs::write(&target, &data)
        .await
        .with_context(|| format!("writing {}", target.display()))?;
    println!("✓ Saved {} ({})", target.display(), format_size_si(data.len() as u64));
    Ok(())
}

async fn move_entry(drive: &DriveClient, from: &str, to: &str) -> anyhow::Result<()> {
    let response = drive
        .get("/api/resource/move")
        .query(&[("from", from), ("to", to)])
        .send()
        .await?;
    let entry: ListingEntry = check(response).await?.json().await?;
    println!("✓ {} -> {}", from, entry.path);
    Ok(())
}

async fn search(drive: &DriveClient, query: &str) -> anyhow::Result<()> {
    let response = drive
        .get("/api/resource/search")
        .query(&[("query", query)])
        .send()
        .await?;
    let entries: Vec<ListingEntry> = check(response).await?.json().await?;
    print_entries(&entries);
    Ok(())
}

// ============ Config Check ============

fn check_config(path: &Path) -> anyhow::Result<()> {
    println!("Checking configuration: {}", path.display());
    println!();

    let config = DriveConfig::from_file(path).context("configuration is invalid")?;

    println!("✓ Configuration is valid");
    println!();
    println!("{:<20} {}", "Backend", format!("{:?}", config.store.backend).to_lowercase());
    println!("{:<20} {}", "Endpoint", config.store.endpoint.as_deref().unwrap_or("-"));
    println!("{:<20} {}", "Bucket", config.store.bucket);
    println!("{:<20} {}", "Root template", config.drive.root_prefix);
    println!("{:<20} {} MB", "Max upload", config.drive.max_upload_mb);
    println!("{:<20} {}", "API", config.api.bind_address);
    println!("{:<20} {}", "User header", config.api.user_header);

    if config.store.access_key.is_none() || config.store.secret_key.is_none() {
        println!();
        println!("\x1b[33m⚠ No credentials set, requests will be sent anonymously\x1b[0m");
    }

    Ok(())
}
