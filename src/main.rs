use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use jukebot::common::logger;
use jukebot::config::Config;
use jukebot::rtm::RtmGateway;
use jukebot::server::{AppState, http};
use jukebot::sources::SoundCloudSource;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            std::process::exit(1);
        }
    };

    logger::init(&config);

    let source = Arc::new(SoundCloudSource::new(&config.soundcloud));
    let state = Arc::new(AppState::new(config, source));

    let cancel_token = CancellationToken::new();
    let gateway = RtmGateway::new(Arc::clone(&state), cancel_token.clone());
    tokio::spawn(async move {
        if let Err(e) = gateway.run().await {
            error!("Chat gateway terminated: {}", e);
        }
    });

    let app = http::router(Arc::clone(&state))
        .layer(tower_http::trace::TraceLayer::new_for_http());

    let address: SocketAddr = format!(
        "{}:{}",
        state.config.server.host, state.config.server.port
    )
    .parse()?;
    info!("Jukebot listening on {}", address);

    let listener = tokio::net::TcpListener::bind(address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel_token))
        .await?;

    Ok(())
}

/// Resolves on Ctrl-C and stops the chat gateway alongside the server.
async fn shutdown_signal(cancel_token: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for the shutdown signal: {}", e);
    }
    info!("Shutting down");
    cancel_token.cancel();
}
