use celebration_site::client::cli::{self, Cli};
use celebration_site::client::config::ClientConfig;
use celebration_site::utils::logger::SiteLogger;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // load environment from .env (optional)
    let _ = dotenvy::dotenv();
    let config = ClientConfig::from_env();
    SiteLogger::init(&config.log_level);
    cli::run(Cli::parse(), config).await
}
