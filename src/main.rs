//! pscout - CLI over the permit office scraping engine.

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use permitscout::{OfficeScrapeService, Settings};

#[derive(Parser)]
#[command(name = "pscout", about = "Scrape municipal permit office data", version)]
struct Cli {
    /// Verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scrape one office website into a merged record.
    Scrape {
        /// Absolute URL of the candidate office website.
        url: String,

        /// Force the headless-browser pass on, overriding configuration.
        #[arg(long, conflicts_with = "no_dynamic")]
        dynamic: bool,

        /// Force the headless-browser pass off.
        #[arg(long)]
        no_dynamic: bool,

        /// Pretty-print the JSON output.
        #[arg(long)]
        pretty: bool,
    },

    /// Crawl a site and print only the aggregated permit requirements.
    Requirements {
        url: String,

        #[arg(long)]
        pretty: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before reading settings)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "permitscout=info"
    } else {
        "permitscout=warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::load(None);
    let service = OfficeScrapeService::new(&settings);

    match cli.command {
        Command::Scrape {
            url,
            dynamic,
            no_dynamic,
            pretty,
        } => {
            let allow_dynamic = if dynamic {
                Some(true)
            } else if no_dynamic {
                Some(false)
            } else {
                None
            };

            let result = service.get_office_info(&url, allow_dynamic).await;
            print_json(&result, pretty)?;
        }
        Command::Requirements { url, pretty } => {
            let result = service.scraper().scrape_requirements(&url).await;
            print_json(&result, pretty)?;
        }
    }

    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> anyhow::Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", json);
    Ok(())
}
