use std::sync::Arc;

use anyhow::Context;
use tower_http::cors::CorsLayer;

use guided_intake::api::{self, AppState, SessionStore, intake_routes};
use guided_intake::config::{IntakeConfig, SinkConfig};
use guided_intake::intake::FlowCatalog;
use guided_intake::sink;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = IntakeConfig::from_env().context("invalid INTAKE_* configuration")?;

    // Refuse to start on an inconsistent flow definition.
    let catalog = Arc::new(FlowCatalog::standard().context("flow catalog failed validation")?);

    let sink = sink::from_config(&config.sink);
    let sink_target = match &config.sink {
        SinkConfig::Log => "log".to_string(),
        SinkConfig::File { path } => format!("file {}", path.display()),
        SinkConfig::Webhook { url, .. } => format!("webhook {url}"),
    };

    let addr = config.socket_addr();
    eprintln!("📝 Guided Intake v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Flows: {}", catalog.flows().map(|c| c.graph().flow()).collect::<Vec<_>>().join(", "));
    eprintln!("   Sink: {}", sink_target);
    eprintln!("   API: http://{}/api/flows", addr);

    let sessions = SessionStore::new(config.session_idle_timeout);
    let _expiry_handle = api::spawn_expiry_task(Arc::clone(&sessions), config.expiry_interval);

    let app = intake_routes(AppState {
        catalog,
        sessions,
        sink,
    })
    .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "Intake server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await?;

    Ok(())
}
