mod app;
mod config;
mod db;
mod error;
mod state;
mod telemetry;
mod users;

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v == "json");
    telemetry::init_subscriber(telemetry::DEFAULT_FILTER, json_logs)?;

    let state = AppState::init().await?;
    let config = state.config.clone();
    let app = app::build_app(state);

    app::serve(app, &config).await
}
