//! Consentry API server.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = consentry_api::ApiConfig::load()?;
    if config.uses_default_secret() {
        tracing::warn!("running with the built-in development JWT secret; set JWT_SECRET");
    }

    let bind_addr = config.bind_addr.clone();
    let base_domain = config.base_domain.clone();
    let state = consentry_api::build_state(config).await?;
    let app = consentry_api::build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("consentry api listening on {bind_addr}, base domain {base_domain}");
    axum::serve(listener, app).await?;

    Ok(())
}
