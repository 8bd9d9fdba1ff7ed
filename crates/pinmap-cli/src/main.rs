//! pinmap - an interactive terminal client for the pinmap map service.
//!
//! Restores the previous session from the refresh cookie when possible,
//! then reads commands from stdin until `quit`.

mod app;
mod commands;
mod navigator;

use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pinmap_core::{ApiClient, AuthService, Config};

use app::{read_line, App, Flow};
use commands::Line;
use navigator::TerminalNavigator;

/// Command-line options for the binary itself (REPL commands are parsed separately)
#[derive(Debug, Parser)]
#[command(name = "pinmap", version, about = "Interactive client for the pinmap map service")]
struct Args {
    /// API origin, overrides PINMAP_API_BASE_URL and the config file
    #[arg(long)]
    base_url: Option<String>,
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=pinmap_core=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    init_tracing();

    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: ignoring unreadable config: {:#}", e);
        Config::default()
    });
    let base_url = config.api_base_url(args.base_url.as_deref())?;
    info!(base_url = %base_url, "pinmap starting");

    let navigator = Arc::new(TerminalNavigator::new());
    let api = ApiClient::new(base_url.clone(), navigator.clone())
        .with_context(|| format!("Failed to create API client for {}", base_url))?;
    let auth = AuthService::new(api);

    let observer = navigator::spawn_session_observer(auth.session().subscribe());

    let mut app = App::new(auth, config, navigator);
    app.bootstrap().await;

    println!("Connected to {}. Type `help` for commands.", base_url);
    loop {
        let Some(input) = read_line(app.prompt()).await? else {
            break;
        };
        let words = match commands::split_words(&input) {
            Ok(words) if words.is_empty() => continue,
            Ok(words) => words,
            Err(e) => {
                eprintln!("{}", e);
                continue;
            }
        };
        let line = match Line::try_parse_from(words) {
            Ok(line) => line,
            Err(e) => {
                // clap renders help and usage errors itself
                let _ = e.print();
                continue;
            }
        };
        match app.run(line.command).await {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => break,
            Err(e) => eprintln!("Error: {:#}", e),
        }
    }

    observer.abort();
    info!("pinmap shutting down");
    Ok(())
}
