mod db;
mod query;
mod run;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "rivalwatch")]
#[command(about = "Competitor changelog monitoring")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Scrape, summarize and store the latest changelog of each competitor
    Run {
        /// Only run this competitor (repeatable; name or slug)
        #[arg(long = "competitor")]
        competitors: Vec<String>,
        /// Only run competitors in this category
        #[arg(long)]
        category: Option<String>,
        /// Skip the digest and strategic alerts
        #[arg(long)]
        no_notify: bool,
        /// List the competitors that would run and exit
        #[arg(long)]
        dry_run: bool,
    },
    /// List configured competitors
    Competitors {
        /// Filter by category
        #[arg(long)]
        category: Option<String>,
    },
    /// Show stored summaries for one competitor, newest first
    History {
        #[arg(long)]
        competitor: String,
        /// Look-back window in days, counting today
        #[arg(long, default_value = "30")]
        days: u32,
    },
    /// Show the impact trend for one competitor
    Trend {
        #[arg(long)]
        competitor: String,
        /// Look-back window in days, counting today
        #[arg(long, default_value = "30")]
        days: u32,
    },
    /// Rank competitors by the impact of their latest summaries
    Leaderboard {
        /// Summaries per competitor to include
        #[arg(long, default_value = "1")]
        per_competitor: i64,
        /// Also post the leaderboard to the webhook
        #[arg(long)]
        notify: bool,
    },
    /// Database management
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check that the database answers
    Ping,
    /// Apply pending migrations
    Migrate,
    /// Upsert the competitor list into the competitors table
    Seed,
    /// Delete stored records and screenshots older than N days
    Prune {
        #[arg(long)]
        days: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = rivalwatch_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        Some(Commands::Run {
            competitors,
            category,
            no_notify,
            dry_run,
        }) => {
            let selection = run::Selection {
                names: competitors,
                category,
            };
            run::run_pipeline(&config, &selection, no_notify, dry_run).await?;
        }
        Some(Commands::Competitors { category }) => {
            query::run_competitors(&config, category.as_deref())?;
        }
        Some(Commands::History { competitor, days }) => {
            query::run_history(&config, &competitor, days).await?;
        }
        Some(Commands::Trend { competitor, days }) => {
            query::run_trend(&config, &competitor, days).await?;
        }
        Some(Commands::Leaderboard {
            per_competitor,
            notify,
        }) => {
            query::run_leaderboard(&config, per_competitor, notify).await?;
        }
        Some(Commands::Db { command }) => match command {
            DbCommands::Ping => db::run_db_ping(&config).await?,
            DbCommands::Migrate => db::run_db_migrate(&config).await?,
            DbCommands::Seed => db::run_db_seed(&config).await?,
            DbCommands::Prune { days } => db::run_db_prune(&config, days).await?,
        },
        None => println!("rivalwatch: no command given; try `rivalwatch --help`"),
    }

    Ok(())
}

/// Shorten `text` to `max` chars, marking the cut with `...`.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        format!("{}...", text.chars().take(max).collect::<String>())
    } else {
        text.to_string()
    }
}

fn print_unsaved_notice() {
    println!("note: no database is configured or reachable; results are not saved");
}

#[cfg(test)]
mod tests;
