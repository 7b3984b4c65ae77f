use tracing_subscriber::{EnvFilter, fmt};
use tracing::info;

use unishorts::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).init();

    let config = Config::from_env()?;
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(
        target: "unishorts",
        "UniShorts starting: RUST_LOG='{}', addr={}, profile_retry_attempts={}",
        rust_log, config.addr(), config.profile_retry.max_attempts
    );

    unishorts::server::run(&config).await
}
