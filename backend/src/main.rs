use anyhow::Context;
use backend::{
    config::AppConfig,
    db,
    web_server::{run_server, AppState},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::filter::LevelFilter::INFO)
        .init();

    let app_config = AppConfig::from_env().context("failed to load configuration")?;
    tracing::info!("Configuration loaded: {:?}", app_config);

    let db_pool = db::connect(&app_config.database)
        .await
        .context("failed to open database")?;

    let app_state = AppState {
        db_pool,
        app_config,
    };

    tracing::info!("Initializing server...");
    run_server(app_state).await
}
