use std::sync::Arc;

use clienthub::clients::{ClientService, client_routes};
use clienthub::config::ServerConfig;
use clienthub::intake::intake_routes;
use clienthub::store::{Database, LibSqlBackend};
use tower_http::cors::{Any, CorsLayer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional; deployments usually set the environment directly.
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = ServerConfig::from_env()?;

    eprintln!("clienthub v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: http://{}:{}/api/clients", config.bind_addr, config.port);
    eprintln!("   Webhook: http://{}:{}/api/webhooks/signup-form", config.bind_addr, config.port);
    eprintln!("   Database: {}", config.db_path.display());

    // ── Database ─────────────────────────────────────────────────────────
    let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_local(&config.db_path).await?);

    let service = Arc::new(ClientService::new(db));

    // ── CORS (the dashboard is served from another origin) ───────────────
    let cors = match &config.cors_origin {
        Some(origin) => {
            eprintln!("   CORS: {origin}");
            CorsLayer::new()
                .allow_origin(origin.parse::<axum::http::HeaderValue>()?)
                .allow_methods(Any)
                .allow_headers(Any)
        }
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    };

    let app = client_routes(Arc::clone(&service))
        .merge(intake_routes(service))
        .layer(cors);

    let listener = tokio::net::TcpListener::bind((config.bind_addr, config.port)).await?;
    tracing::info!(addr = %listener.local_addr()?, "clienthub server started");
    axum::serve(listener, app).await?;

    Ok(())
}
