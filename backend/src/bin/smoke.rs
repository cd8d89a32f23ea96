// Runs the register/login/CRUD flow against a live server.
//
//   SMOKE_BASE_URL=http://127.0.0.1:8080/api cargo run --bin smoke
use anyhow::Context;
use backend::{
    client::ApiClient,
    smoke::{self, SmokeConfig},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::filter::LevelFilter::INFO)
        .init();

    let config = SmokeConfig::load().context("failed to read SMOKE_* settings")?;
    tracing::info!("--- Starting API smoke test against {} ---", config.base_url);

    let mut client = ApiClient::new(&config.base_url)?;
    client.health().await.with_context(|| {
        format!(
            "could not reach the server at {}; is it running?",
            config.base_url
        )
    })?;

    let report = smoke::run(&mut client, &config.credentials())
        .await
        .context("smoke test failed")?;

    tracing::info!(
        "--- API smoke test finished: item {} went through create/update/delete (new user: {}) ---",
        report.item_id,
        report.registered
    );
    Ok(())
}
