use anyhow::Result;
use clap::Parser;
use retailx_storefront::{
    cli::{Args, CliApp},
    utils::Config,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::from_env().map_err(|e| {
        eprintln!("Failed to load configuration: {:#}", e);
        e
    })?;

    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!(
        "RetailX client starting ({} environment, API {})",
        config.environment,
        config.api_url
    );

    let app = CliApp::new(config)?;
    app.run(args).await?;

    tracing::debug!("RetailX client stopped");
    Ok(())
}
