use std::process;

use clap::{Parser, ValueEnum};
use energy_cost_scraper::config::Config;
use energy_cost_scraper::mailer::SmtpNotifier;
use energy_cost_scraper::store::PgPriceStore;
use energy_cost_scraper::types::{PricePoint, SeriesKind};
use energy_cost_scraper::{engine, parser, SiteScraper};
use log::LevelFilter;

#[derive(Parser)]
#[command(name = "ecs")]
#[command(
    about = "Scrapes the PUN/PSV tariff tables and emails when the market price drops below yours",
    long_about = None
)]
struct Cli {
    #[arg(
        short = 'l',
        long = "log-level",
        value_enum,
        default_value = "info",
        help = "Set the logging level"
    )]
    log_level: LogLevel,

    #[arg(long, help = "Override the tariff page URL")]
    site_url: Option<String>,

    #[arg(
        short = 'o',
        long = "output",
        value_enum,
        default_value = "text",
        help = "Output format for the scraped entries"
    )]
    format: OutputFormat,

    #[arg(long, help = "Scrape and print only, no database writes and no emails")]
    dry_run: bool,
}

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn print_points(points: &[PricePoint], format: &OutputFormat) {
    match format {
        OutputFormat::Json => match serde_json::to_string_pretty(points) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error serializing to JSON: {}", e),
        },
        OutputFormat::Text => {
            for point in points {
                println!("{}", point);
            }
        }
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    // The legacy debug switch trumps the CLI when it asks for more.
    let mut level = LevelFilter::from(cli.log_level);
    if config.debug_enabled() {
        level = level.max(LevelFilter::Debug);
    }
    env_logger::Builder::new().filter_level(level).init();

    let scraper = match SiteScraper::new() {
        Ok(scraper) => scraper,
        Err(e) => {
            log::error!("Error creating scraper: {}", e);
            process::exit(1);
        }
    };

    // One fetch per run; both series come off the same document.
    let site_url = cli.site_url.as_deref().unwrap_or(&config.site_url);
    let html = match scraper.fetch_document(site_url).await {
        Ok(html) => html,
        Err(e) => {
            log::error!("Error fetching tariff page: {}", e);
            process::exit(1);
        }
    };

    if cli.dry_run {
        let mut failures = 0;
        for kind in SeriesKind::ALL {
            log::info!("{} - {}", kind, kind.commodity());
            match parser::extract_price_table(&html, &config.series(kind).selector) {
                Ok(points) => print_points(&points, &cli.format),
                Err(e) => {
                    log::error!("{}: {}", kind, e);
                    failures += 1;
                }
            }
        }
        if failures > 0 {
            process::exit(1);
        }
        return;
    }

    let Some(database_url) = config.database_url.as_deref() else {
        log::error!("DATABASE_URL is not set");
        process::exit(1);
    };

    let store = match PgPriceStore::connect(database_url).await {
        Ok(store) => store,
        Err(e) => {
            log::error!("Error connecting to the database: {}", e);
            process::exit(1);
        }
    };
    let notifier = SmtpNotifier::new(config.mail.clone());

    let mut failures = 0;
    for kind in SeriesKind::ALL {
        log::info!("{} - {}", kind, kind.commodity());

        let series = config.series(kind);
        let points = match parser::extract_price_table(&html, &series.selector) {
            Ok(points) => points,
            Err(e) => {
                log::error!("{}: {}", kind, e);
                failures += 1;
                continue;
            }
        };
        print_points(&points, &cli.format);

        let report =
            engine::evaluate_series(kind, points, series.reference_price, &store, &notifier)
                .await;
        log::debug!("{}", report);
    }

    store.close().await;

    if failures > 0 {
        process::exit(1);
    }
}
