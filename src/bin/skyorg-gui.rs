// SPDX-License-Identifier: MIT

//! Skyorg GUI
//!
//! Standalone launcher for the dashboard: starts the local web server and
//! opens it in the default browser. This is the binary shipped to end users.

use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};

use skyorg::config::AppConfig;
use skyorg::Result;

#[derive(Parser, Debug)]
#[command(name = "skyorg-gui")]
#[command(version = "1.2.0")]
#[command(about = "3DSky File Organizer dashboard")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Host to bind to
    #[arg(short = 'H', long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Do not open the browser automatically
    #[arg(long)]
    no_open: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!("Skyorg GUI v1.2.0");

    let mut config = AppConfig::load(&args.config)?;

    if let Some(host) = args.host {
        config.web.host = host;
    }
    if let Some(port) = args.port {
        config.web.port = port;
    }

    let addr = format!("{}:{}", config.web.host, config.web.port);
    info!("Starting dashboard at http://{}", addr);

    if !args.no_open {
        let url = format!("http://{}", addr);
        if let Err(e) = open_browser(&url) {
            error!("Failed to open browser: {}", e);
        }
    }

    skyorg::web::start_server(config, PathBuf::from("skyorg_history.jsonl")).await
}

fn open_browser(url: &str) -> std::io::Result<()> {
    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/c", "start", url])
            .spawn()?;
    }
    Ok(())
}
