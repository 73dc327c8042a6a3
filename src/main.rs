//! fightstats CLI
//!
//! Crawls the statistics site into a local SQLite database.

use clap::{Parser, Subcommand};
use fightstats::{Config, Result};

#[derive(Parser)]
#[command(name = "fightstats")]
#[command(about = "Crawl MMA event, fighter and fight statistics into SQLite", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file and create the data directory
    Init,
    /// Crawl from a seed event or fighter page
    Scrape {
        /// Seed URL (an event-details or fighter-details page)
        #[arg(long)]
        start_url: String,
        /// Cache directory for fetched HTML
        #[arg(long)]
        cache: Option<String>,
        /// Only use cached pages
        #[arg(long)]
        offline: bool,
        /// Override the pause after each request
        #[arg(long)]
        delay_ms: Option<u64>,
    },
    /// Show database statistics
    Status,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    let result = match cli.command {
        Commands::Init => commands::init(&cli.config),
        Commands::Scrape {
            start_url,
            cache,
            offline,
            delay_ms,
        } => commands::scrape(config, &start_url, cache, offline, delay_ms),
        Commands::Status => commands::status(&config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use fightstats::crawl::Crawler;
    use fightstats::data::scrapers::fetcher::HttpFetcher;
    use fightstats::data::Database;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        if let Some(parent) = std::path::Path::new(&config.data.database_path).parent() {
            std::fs::create_dir_all(parent)?;
            println!("Created {}/ directory", parent.display());
        }

        println!("\nNext steps:");
        println!("  1. Edit {} to customize settings", config_path);
        println!("  2. Run 'fightstats scrape --start-url <event page>' to crawl");
        println!("  3. Run 'fightstats status' to see what was stored");

        Ok(())
    }

    pub fn scrape(
        mut config: Config,
        start_url: &str,
        cache: Option<String>,
        offline: bool,
        delay_ms: Option<u64>,
    ) -> Result<()> {
        if let Some(cache_dir) = cache {
            config.scraper.cache_dir = Some(cache_dir);
        }
        if offline {
            config.scraper.offline = true;
        }
        if let Some(delay) = delay_ms {
            config.scraper.delay_ms = delay;
        }

        let db = Database::open(&config.data.database_path)?;
        let fetcher = HttpFetcher::new(&config.scraper)?;
        if let Some(cache_dir) = &config.scraper.cache_dir {
            println!("Using cache directory: {}", cache_dir);
        }
        if config.scraper.offline {
            println!("Offline mode: using cached files only");
        }

        let stop = Arc::new(AtomicBool::new(false));
        spawn_interrupt_handler(Arc::clone(&stop));

        println!("Crawling from {}...", start_url);
        let crawler = Crawler::new(fetcher, &db, config.percent).with_stop_flag(stop);
        let report = crawler.run(start_url)?;

        println!("Attempted {} pages", report.attempted);
        if report.interrupted {
            println!("Interrupted with {} pages still queued", report.pending);
        }
        Ok(())
    }

    /// First Ctrl-C asks the crawl to stop after the current page, a second one exits
    fn spawn_interrupt_handler(stop: Arc<AtomicBool>) {
        std::thread::spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    log::warn!("Ctrl-C handling unavailable: {}", e);
                    return;
                }
            };
            runtime.block_on(async move {
                loop {
                    if tokio::signal::ctrl_c().await.is_err() {
                        return;
                    }
                    if stop.swap(true, Ordering::SeqCst) {
                        eprintln!("Interrupted again, exiting");
                        std::process::exit(130);
                    }
                    eprintln!("Stopping after the current page (Ctrl-C again to quit)");
                }
            });
        });
    }

    pub fn status(config: &Config) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let stats = db.get_stats()?;

        println!("Database Status");
        println!("───────────────────────────────");
        println!("  Path:         {}", config.data.database_path);
        println!("  Events:       {}", stats.event_count);
        println!("  Fighters:     {}", stats.fighter_count);
        println!("  Fights:       {}", stats.fight_count);
        println!("  Round rows:   {}", stats.round_stats_count);
        if let (Some(earliest), Some(latest)) = (stats.earliest_event, stats.latest_event) {
            println!("  Range:        {} to {}", earliest, latest);
        }

        Ok(())
    }
}
