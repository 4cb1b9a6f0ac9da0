use clap::Parser;
use tickerwatch::cli::{Cli, Commands};
use tickerwatch::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::load_or_default(&cli.config);
    if cli.no_persist {
        config.cache.path = None;
    }

    // Initialize telemetry
    tickerwatch::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Watch(args) => {
            tracing::info!(feed = %config.feed.url, "Starting price board");
            args.execute(&config).await?;
        }
        Commands::Snapshot(args) => {
            args.execute(&config).await?;
        }
        Commands::Convert(args) => {
            args.execute(&config).await?;
        }
        Commands::History(args) => {
            args.execute(&config).await?;
        }
        Commands::Config => {
            println!("Current configuration:");
            println!(
                "  API: {} (per_page={}, sparkline={})",
                config.api.base_url, config.api.per_page, config.api.sparkline
            );
            println!(
                "  Cache: domain={} freshness={}ms store={}",
                config.cache.domain,
                config.cache.freshness_ms,
                config
                    .cache
                    .path
                    .as_ref()
                    .map_or("memory".to_string(), |p| p.display().to_string())
            );
            println!("  Feed: {}", config.feed.url);
            println!(
                "  Reconnect: {:?}",
                config.feed.reconnect_config()
            );
            println!("  Change basis: {:?}", config.board.change_basis);
            println!(
                "  Telemetry: level={} format={:?} metrics_port={:?}",
                config.telemetry.log_level, config.telemetry.log_format, config.telemetry.metrics_port
            );
        }
    }

    Ok(())
}
