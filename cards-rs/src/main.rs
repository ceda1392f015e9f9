use cards_rs::api::ApiServer;
use cards_rs::config::Config;
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn load_config() -> anyhow::Result<Config> {
    let mut config = if let Some(config_path) = std::env::args().nth(1) {
        Config::from_file(&config_path)?
    } else if Path::new("config.toml").exists() {
        Config::from_file("config.toml")?
    } else {
        Config::default()
    };
    config.apply_env()?;
    Ok(config)
}

fn init_logging(config: &Config) {
    let level = &config.logging.level;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("cards_rs={},tower_http={}", level, level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().pretty()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logging depends on the config, so config errors go straight to stderr
    let config = load_config()?;
    init_logging(&config);

    info!("Starting cards-rs v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded");
    info!("  Environment: {}", config.server.environment.as_str());
    info!("  API listening on: {}", config.server.listen_addr);
    info!("  SMTP server: {}", config.smtp.endpoint());
    info!("  Storage: {:?}", config.storage.backend);

    let server = ApiServer::from_config(config).await?;

    match server.state().mailer.verify().await {
        Ok(()) => info!("SMTP server is ready to take messages"),
        Err(e) => warn!("SMTP self-test failed, sends will be attempted anyway: {}", e),
    }

    server.run().await?;

    Ok(())
}
