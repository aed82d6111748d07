//! Hashgate application entry point.
//!
//! Bootstraps the server:
//! 1. Load configuration from environment
//! 2. Load the credential source (missing file means zero users)
//! 3. Start the failure-window sweep task
//! 4. Build router with verify, health and reload routes
//! 5. Start Axum server
//!
//! Also supports the `digest` subcommand for computing a client's bearer value.

use hashgate::{
    auth::middleware::AppState, cleanup, config::Config, routes, service::AuthService,
    storage::credential_digest,
};
use std::net::SocketAddr;
use std::sync::Arc;

fn print_digest_usage() {
    eprintln!("Usage: hashgate digest <user> <token>");
    eprintln!();
    eprintln!("Print the bearer value for a credential: hex sha256 of 'user:token'.");
    eprintln!();
    eprintln!("Example:");
    eprintln!("  hashgate digest alice s3cr3t");
    eprintln!();
    eprintln!("Then send:");
    eprintln!("  Authorization: Bearer <output>");
}

#[tokio::main]
async fn main() {
    // Check for digest subcommand
    let args: Vec<String> = std::env::args().collect();
    if args.len() >= 2 && args[1] == "digest" {
        if args.len() != 4 {
            print_digest_usage();
            std::process::exit(1);
        }
        println!("{}", credential_digest(&args[2], &args[3]));
        return;
    }

    // Initialize tracing with env filter support (RUST_LOG)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config from environment
    let config = Config::from_env().expect("Failed to load config");
    tracing::info!(?config, "Starting hashgate on {}", config.bind_addr);
    if config.reload_secret.is_none() {
        tracing::warn!("RELOAD_SECRET not set; reload endpoint is unauthenticated");
    }

    // Initial credential load
    let service = Arc::new(AuthService::from_config(&config).await);
    tracing::info!(users = service.user_count(), "Hashgate ready");

    // Keep the failure-window table bounded
    tokio::spawn(cleanup::run_sweep_loop(
        service.clone(),
        config.sweep_interval(),
    ));

    let bind_addr = config.bind_addr;
    let app = routes::app(AppState { service });

    // Bind to configured address
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .expect("Failed to bind");
    tracing::info!("Listening on {}", bind_addr);

    // Start server (with_connect_info required for ConnectInfo<SocketAddr> extractors)
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server error");
}
