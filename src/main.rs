use anyhow::Result;
use clap::Parser;

use scrapegate::api::ApiClient;
use scrapegate::bridge::TaskBridge;
use scrapegate::catalog;
use scrapegate::cli::Cli;
use scrapegate::config::Config;
use scrapegate::registry::{ParserRegistry, RegistryConfig};
use scrapegate::server::GatewayServer;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    // Offline introspection, no server.
    if cli.list_parsers {
        print_static_catalog();
        return Ok(());
    }

    let config = Config::from_cli(&cli);
    config.validate_api_key();

    log::info!("Starting scrapegate MCP server");
    log::info!("API URL: {}", config.api_url);
    log::info!(
        "Dynamic loading: {}",
        if config.enable_dynamic { "enabled" } else { "disabled" }
    );

    let api = ApiClient::new(config.api_url.clone(), config.api_key.clone());
    let registry = ParserRegistry::new(
        api.clone(),
        RegistryConfig {
            cache_ttl: config.cache_ttl,
            enable_dynamic: config.enable_dynamic,
        },
    );
    let bridge = TaskBridge::new(api.clone(), registry.clone());
    let server = GatewayServer::new(api, registry, bridge);

    // Cross-platform signal handling: cancel the token, abandon in-flight
    // polls, close the transport.
    let shutdown_token = tokio_util::sync::CancellationToken::new();
    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        wait_for_interrupt().await;
        log::debug!("Received interrupt signal, cancelling");
        signal_token.cancel();
    });

    server.serve_stdio(shutdown_token).await?;

    Ok(())
}

fn print_static_catalog() {
    println!("Available parsers:");
    for category in catalog::all_categories() {
        println!("{category}:");
        for parser in catalog::get_parsers_by_category(&category) {
            println!("  - {} ({})", parser.id, parser.name);
        }
    }
}

/// Resolve on SIGTERM or SIGINT. With no registrable signal handler,
/// shutdown comes from the transport closing instead.
#[cfg(unix)]
async fn wait_for_interrupt() {
    use tokio::signal::unix::{SignalKind, signal};

    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {}
                _ = sigint.recv() => {}
            }
        }
        (Ok(mut sigterm), Err(_)) => {
            let _ = sigterm.recv().await;
        }
        (Err(_), Ok(mut sigint)) => {
            let _ = sigint.recv().await;
        }
        (Err(_), Err(_)) => std::future::pending().await,
    }
}

/// Resolve on Ctrl-C. With no registrable handler, shutdown comes from the
/// transport closing instead.
#[cfg(windows)]
async fn wait_for_interrupt() {
    match tokio::signal::windows::ctrl_c() {
        Ok(mut ctrl_c) => {
            let _ = ctrl_c.recv().await;
        }
        Err(_) => std::future::pending().await,
    }
}
