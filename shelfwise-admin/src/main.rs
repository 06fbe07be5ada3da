use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use itertools::Itertools;
use shelfwise_common::reports::DEFAULT_DAYS;
use shelfwise_common::{Database, RecommendationRequest, Role};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod import;
mod report;

#[derive(Debug, Parser)]
#[command(name = "shelfwise-admin", about = "Operator tools for a Shelfwise database")]
struct Cli {
    /// Database URL (sqlite://path/to/db.sqlite)
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://shelfwise.db")]
    database_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create the database if needed and apply pending migrations
    Migrate,

    /// Create a user account
    CreateUser {
        username: String,

        #[arg(long)]
        display_name: Option<String>,

        /// Give the user the admin role
        #[arg(long)]
        admin: bool,
    },

    /// Mint a session token for a user, for local development and scripts
    IssueSession {
        username: String,

        /// Session lifetime in hours
        #[arg(long, default_value_t = 24 * 30)]
        hours: i64,
    },

    /// Import books from a JSON array of catalog entries
    ImportBooks { file: PathBuf },

    /// Print the admin activity report
    Report {
        #[arg(long, default_value_t = DEFAULT_DAYS)]
        days: i64,

        #[arg(long, value_enum, default_value = "text")]
        format: ReportFormat,
    },

    /// Print recommendations for a user
    Recommend {
        username: String,

        #[arg(long)]
        limit: Option<usize>,

        /// Ignore any cached list
        #[arg(long)]
        refresh: bool,

        /// How long a cached list stays fresh
        #[arg(long, default_value_t = 24)]
        ttl_hours: i64,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, Eq, PartialEq)]
enum ReportFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db = Database::new(&cli.database_url).await?;

    match cli.command {
        Commands::Migrate => info!("Database at {} is up to date", cli.database_url),
        Commands::CreateUser {
            username,
            display_name,
            admin,
        } => {
            let role = if admin { Role::Admin } else { Role::Reader };
            let user = db
                .create_user(&username, display_name.as_deref(), role)
                .await
                .with_context(|| format!("Failed to create user {username}"))?;
            println!("{}", user.id);
        }
        Commands::IssueSession { username, hours } => {
            let user = db
                .user_by_username(&username)
                .await
                .with_context(|| format!("Unknown user {username}"))?;
            let session = db
                .create_session(user.id, chrono::Duration::hours(hours))
                .await?;
            info!("Session for {username} expires at {}", session.expires_at);
            println!("{}", session.token);
        }
        Commands::ImportBooks { file } => {
            let books = import::read_catalog(&file)?;
            let summary = import::import_books(&db, &books).await?;
            info!(
                "Imported {} books, skipped {}",
                summary.imported, summary.skipped
            );
        }
        Commands::Report { days, format } => {
            let report = db.admin_report(days).await?;
            match format {
                ReportFormat::Text => print!("{}", report::render_text(&report)?),
                ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            }
        }
        Commands::Recommend {
            username,
            limit,
            refresh,
            ttl_hours,
        } => {
            let user = db
                .user_by_username(&username)
                .await
                .with_context(|| format!("Unknown user {username}"))?;
            let request = RecommendationRequest {
                user_id: user.id,
                limit,
                exclude: vec![],
                refresh,
            };
            let list = db.recommendations(&request, chrono::Duration::hours(ttl_hours)).await;

            let lines = list
                .iter()
                .map(|r| format!("{:>2}. {} ({:.2}, {:?})", r.rank, r.title, r.score, r.reason))
                .join("\n");
            println!("{lines}");
        }
    }

    Ok(())
}
