use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use talkinghead_core::{
    load_config, validate_config, AvatarProvider, ElevenLabsClient, GenerationPipeline,
    HeyGenClient, Relay, SessionManager, SessionUpdateCallback, SpeechProvider,
};
use talkinghead_server::api::{create_router, WsBroadcaster};
use talkinghead_server::state::AppState;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::var("TALKINGHEAD_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    validate_config(&config).context("Configuration validation failed")?;
    info!("Configuration loaded successfully");

    let avatar: Arc<dyn AvatarProvider> = Arc::new(
        HeyGenClient::new(config.avatar.clone()).context("Failed to create avatar client")?,
    );
    info!("Avatar provider at {}", config.avatar.base_url);

    let speech: Option<Arc<dyn SpeechProvider>> = match &config.speech {
        Some(speech_config) => {
            info!("Speech provider at {}", speech_config.base_url);
            Some(Arc::new(
                ElevenLabsClient::new(speech_config.clone())
                    .context("Failed to create speech client")?,
            ))
        }
        None => {
            info!("No speech provider configured, voice cloning and speech mode disabled");
            None
        }
    };

    let pipeline = Arc::new(GenerationPipeline::new(
        avatar,
        speech,
        config.ingest.clone(),
        config.pipeline.clone(),
    ));

    let ws_broadcaster = WsBroadcaster::default();
    let broadcaster_for_callback = ws_broadcaster.clone();
    let update_callback: SessionUpdateCallback = Arc::new(move |snapshot| {
        broadcaster_for_callback.session_updated(snapshot);
    });
    let sessions = Arc::new(SessionManager::new(pipeline).with_update_callback(update_callback));

    let relay = Arc::new(Relay::from_config(&config).context("Failed to create relay")?);
    info!(
        "Relay enabled for avatar ({}) and speech ({})",
        config.relay.upstreams.avatar, config.relay.upstreams.speech
    );

    let state = Arc::new(AppState::new(
        config.clone(),
        Arc::clone(&sessions),
        relay,
        ws_broadcaster,
    ));
    let app = create_router(state);

    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down, stopping sessions...");
    sessions.shutdown().await;
    info!("All sessions stopped");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
