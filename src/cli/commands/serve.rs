use anyhow::{Context, Result};
use colored::Colorize;
use std::sync::{Arc, RwLock};

use crate::config::load_config;
use crate::server::handlers::AppState;
use crate::server::router::create_router;
use crate::usage::pricing::PricingData;

/// Run the dashboard server on localhost
pub async fn run(port: Option<u16>, open_browser: bool) -> Result<()> {
    let config = load_config()?;
    let port = port.unwrap_or(config.server.port);

    // Refresh the pricing cache once at startup; request handling stays
    // offline and falls back to the embedded snapshot if this fails.
    if let Err(e) = PricingData::refresh_cache().await {
        eprintln!("[ccdeck] pricing refresh failed: {}", e);
    }

    let state = Arc::new(AppState {
        config: RwLock::new(config),
    });
    let app = create_router(state);

    let addr = format!("127.0.0.1:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    let url = format!("http://{}", addr);
    println!(
        "\n  {} {}",
        "ccdeck dashboard running at".bold(),
        url.bright_yellow()
    );
    println!("  {}\n", "Press Ctrl+C to stop".dimmed());

    if open_browser {
        if let Err(e) = open::that(&url) {
            eprintln!("[ccdeck] could not open browser: {}", e);
        }
    }

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
