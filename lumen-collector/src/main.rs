use anyhow::Result;
use clap::Parser;

use lumen_collector::cli::CollectorCli;
use lumen_collector::{Application, check_config, logging};
use lumen_core::config::CollectorConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = CollectorCli::parse();

    let mut config = CollectorConfig::from_file(&cli.config)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
    config.apply_env_overrides();
    cli.apply_overrides(&mut config);

    if cli.validate {
        check_config(&config)?;
        println!("configuration is valid: {}", cli.config.display());
        return Ok(());
    }

    logging::init_tracing(&config.general)?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "lumen-collector starting"
    );

    let mut app = Application::build_from_config(config)?;
    app.run().await?;

    tracing::info!("lumen-collector shut down");
    Ok(())
}
