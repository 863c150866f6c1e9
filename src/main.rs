//! # Job Atlas CLI (`atlas`)
//!
//! ## Usage
//!
//! ```bash
//! atlas --config ./config/atlas.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `atlas init` | Create the SQLite database and tables |
//! | `atlas scrape` | Collect offer links and store new offers |
//! | `atlas skills extract` | Build the skill vocabulary from stored offers |
//! | `atlas skills categorize` | Categorize uncategorized skills |
//! | `atlas skills sample` | Print the first skills |
//! | `atlas normalize` | Run the normalization trigger locally |
//! | `atlas stats` | Offer and skill counts |
//! | `atlas serve` | Start the HTTP trigger endpoint |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use job_atlas::ingest::ScrapeOptions;
use job_atlas::{categorize, config, ingest, logging, migrate, normalize, server, skills, stats};

/// Job Atlas: job-offer scraping and skill normalization.
#[derive(Parser)]
#[command(name = "atlas", version, about = "Job-offer scraping and skill normalization")]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/atlas.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Scrape the listing and store offers not seen before.
    Scrape {
        /// Listing page to start from (defaults to `[source] listing_url`).
        #[arg(long)]
        listing_url: Option<String>,

        /// Stop collecting once this many links are known.
        #[arg(long)]
        max_links: Option<usize>,

        /// Visit at most this many offers.
        #[arg(long)]
        max_offers: Option<usize>,

        /// Do not fire the downstream normalization trigger afterwards.
        #[arg(long)]
        no_trigger: bool,
    },

    /// Skill vocabulary commands.
    Skills {
        #[command(subcommand)]
        action: SkillsAction,
    },

    /// Run the normalization trigger locally.
    Normalize {
        /// `extract`, `categorize` or `all`.
        #[arg(long)]
        stage: Option<String>,

        /// Clear the skill vocabulary before extracting.
        #[arg(long)]
        clear: bool,
    },

    /// Show offer and skill counts.
    Stats,

    /// Start the HTTP trigger endpoint.
    Serve,
}

#[derive(Subcommand)]
enum SkillsAction {
    /// Tokenize stored tech stacks into the skill table.
    Extract {
        /// Delete every skill first (full rebuild).
        #[arg(long)]
        clear: bool,
    },

    /// Assign categories to uncategorized skills.
    Categorize {
        #[arg(long)]
        batch_size: Option<usize>,

        /// Categorize at most this many skills.
        #[arg(long)]
        max_skills: Option<usize>,
    },

    /// Print the first skills.
    Sample {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Scrape {
            listing_url,
            max_links,
            max_offers,
            no_trigger,
        } => {
            let opts = ScrapeOptions {
                listing_url,
                max_links,
                max_offers,
                fire_trigger: !no_trigger,
            };
            ingest::run_scrape(&cfg, &opts).await?;
        }
        Commands::Skills { action } => match action {
            SkillsAction::Extract { clear } => {
                skills::run_extract(&cfg, clear).await?;
            }
            SkillsAction::Categorize {
                batch_size,
                max_skills,
            } => {
                categorize::run_categorize(&cfg, batch_size, max_skills).await?;
            }
            SkillsAction::Sample { limit } => {
                skills::run_sample(&cfg, limit).await?;
            }
        },
        Commands::Normalize { stage, clear } => {
            normalize::run_normalize(&cfg, stage, clear).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
