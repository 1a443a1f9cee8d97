/*
 * Responsibility
 * - tokio runtime + tracing-subscriber init
 * - app::run() call (no logic here)
 */
use anyhow::Result;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    users_api::app::run().await
}
