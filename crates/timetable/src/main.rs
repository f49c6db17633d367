use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info};

use timetable::browser::webdriver::{WebDriverConfig, WebDriverLauncher};
use timetable::cache::{ScheduleCache, SqliteStore};
use timetable::config::Config;
use timetable::scrape::ScheduleScraper;
use timetable::server::create_router;
use timetable::service::ScheduleService;
use timetable::types::TimetableState;
use timetable::users::UserStore;

#[derive(Parser)]
#[command(name = "timetable", version, about = "University group timetable scraper")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API
    Serve,
    /// Scrape one group and print the result as JSON
    Scrape {
        /// Group name as shown on the timetable page
        group: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .init();

    let launcher = WebDriverLauncher::new(
        WebDriverConfig::new(&config.webdriver_url).context("Invalid WebDriver endpoint")?,
    )?;
    let scraper = Arc::new(ScheduleScraper::new(Arc::new(launcher), config.scrape.clone()));

    match cli.command {
        Command::Scrape { group } => {
            let result = scraper.scrape(&group).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
            if !result.success {
                anyhow::bail!("scrape failed: {}", result.error.unwrap_or_default());
            }
            Ok(())
        }
        Command::Serve => serve(config, scraper).await,
    }
}

async fn serve(config: Config, scraper: Arc<ScheduleScraper>) -> anyhow::Result<()> {
    let store = SqliteStore::open(&config.db_path)
        .with_context(|| format!("Failed to open cache database {}", config.db_path))?;
    let cache = Arc::new(ScheduleCache::new(Box::new(store), config.cache.clone()));

    if let Some(retention) = config.cache_retention {
        let cache = cache.clone();
        tokio::spawn(async move {
            let period = retention.clamp(Duration::from_secs(60), Duration::from_secs(3600));
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                if let Err(e) = cache.sweep(retention) {
                    error!("Cache sweep failed: {}", e);
                }
            }
        });
    }

    let users = UserStore::open(&config.db_path)
        .with_context(|| format!("Failed to open user database {}", config.db_path))?;

    let state = Arc::new(TimetableState::new(
        ScheduleService::new(cache, scraper),
        users,
    ));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address))?;
    info!("Listening on {}", config.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}
