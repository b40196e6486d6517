use finance_coach::{
    api::{build_state, start_server},
    config::AppConfig,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;

    info!("Finance coach API server");
    info!(address = %config.bind_address(), model = %config.gemini_model, "Configuration loaded");

    let state = build_state(&config)?;

    start_server(state, &config).await?;

    Ok(())
}
