mod ai;
mod config;
mod db;
mod models;
mod server;
mod store;
mod tips;
mod tui;
mod view;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use ai::ChatCompletionProvider;
use config::Config;
use db::Database;
use models::{JobStatus, NewJob};
use store::{RecordStore, StoreError};
use tips::{TipsRequest, display_text, fetch_from_proxy};
use view::{SortKey, StatusFilter, ViewQuery, stats, view};

#[derive(Parser)]
#[command(name = "jobtrail")]
#[command(about = "Track job applications and get quick tips for each one")]
struct Cli {
    /// Path to the database file (defaults to the platform data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a new application
    Add {
        #[arg(short, long)]
        company: String,

        #[arg(short, long)]
        role: String,

        #[arg(short, long)]
        location: Option<String>,

        /// Salary range, free text
        #[arg(short, long)]
        salary: Option<String>,

        /// Link to the posting
        #[arg(short, long)]
        url: Option<String>,

        #[arg(short, long)]
        notes: Option<String>,
    },

    /// List applications
    List {
        /// Filter by status (all, applied, interview, offer, rejected)
        #[arg(long, default_value = "all")]
        status: StatusFilter,

        /// Case-insensitive match on company or role
        #[arg(long, default_value = "")]
        search: String,

        /// Sort order (date, company)
        #[arg(long, default_value = "date")]
        sort: SortKey,
    },

    /// Show one application
    Show { id: String },

    /// Move an application to a new status
    Status { id: String, status: JobStatus },

    /// Delete an application
    Delete { id: String },

    /// Show counts per status
    Stats,

    /// Ask the tips proxy for advice on an application
    Tips {
        id: String,

        /// Proxy endpoint (defaults to JOBTRAIL_TIPS_URL or the local server)
        #[arg(long)]
        server: Option<String>,
    },

    /// Run the tips proxy server
    Serve {
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Browse applications interactively
    Browse {
        #[arg(long)]
        server: Option<String>,
    },
}

fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), default_level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_store(config: &Config, db: Option<PathBuf>) -> Result<RecordStore<Database>> {
    let path = db.or_else(|| config.db_path.clone());
    let database = Database::open(path.as_deref()).context("Failed to open database")?;
    tracing::debug!(path = %database.path().display(), "using database");
    Ok(RecordStore::open(database))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env();

    init_logging(match cli.command {
        Commands::Serve { .. } => "info",
        _ => "warn",
    });

    match cli.command {
        Commands::Add {
            company,
            role,
            location,
            salary,
            url,
            notes,
        } => {
            let mut store = open_store(&config, cli.db)?;
            let record = store.create(NewJob {
                location,
                salary,
                url,
                notes,
                ..NewJob::new(company, role)
            })?;
            println!("Added {} at {} ({})", record.role, record.company, record.id);
        }

        Commands::List { status, search, sort } => {
            let store = open_store(&config, cli.db)?;
            let query = ViewQuery { status, search, sort };
            let jobs = view(store.records(), &query);
            if jobs.is_empty() {
                println!("No applications found.");
            } else {
                println!(
                    "{:<36} {:<10} {:<11} {:<24} {:<24}",
                    "ID", "STATUS", "APPLIED", "ROLE", "COMPANY"
                );
                println!("{}", "-".repeat(108));
                for job in jobs {
                    println!(
                        "{:<36} {:<10} {:<11} {:<24} {:<24}",
                        job.id,
                        job.status,
                        job.applied_date.to_string(),
                        truncate(&job.role, 22),
                        truncate(&job.company, 22)
                    );
                }
            }
            print_stats(store.records());
        }

        Commands::Show { id } => {
            let store = open_store(&config, cli.db)?;
            match store.get(&id) {
                Some(job) => {
                    println!("{} at {}", job.role, job.company);
                    println!("ID: {}", job.id);
                    println!("Status: {}", job.status);
                    println!("Applied: {}", job.applied_date);
                    if !job.location.is_empty() {
                        println!("Location: {}", job.location);
                    }
                    if !job.salary.is_empty() {
                        println!("Salary: {}", job.salary);
                    }
                    if !job.url.is_empty() {
                        println!("URL: {}", job.url);
                    }
                    if !job.notes.is_empty() {
                        println!("\n--- Notes ---\n{}", job.notes);
                    }
                }
                None => println!("Job {} not found.", id),
            }
        }

        Commands::Status { id, status } => {
            let mut store = open_store(&config, cli.db)?;
            match store.set_status(&id, status) {
                Ok(()) => println!("Marked {} as {}.", id, status),
                Err(StoreError::NotFound(_)) => println!("Job {} not found.", id),
                Err(e) => return Err(e.into()),
            }
        }

        Commands::Delete { id } => {
            let mut store = open_store(&config, cli.db)?;
            match store.delete(&id) {
                Ok(job) => println!("Deleted {} at {}.", job.role, job.company),
                Err(StoreError::NotFound(_)) => println!("Job {} not found.", id),
                Err(e) => return Err(e.into()),
            }
        }

        Commands::Stats => {
            let store = open_store(&config, cli.db)?;
            print_stats(store.records());
        }

        Commands::Tips { id, server } => {
            let store = open_store(&config, cli.db)?;
            let Some(job) = store.get(&id) else {
                println!("Job {} not found.", id);
                return Ok(());
            };
            let request = TipsRequest {
                role: job.role.clone(),
                company: job.company.clone(),
            };
            let url = match server {
                Some(url) => url,
                None => config.proxy_url()?,
            };
            let result = fetch_from_proxy(&url, &request, config.tips_timeout()?);
            println!("Tips for {} at {}:\n", job.role, job.company);
            println!("{}", display_text(result));
        }

        Commands::Serve { port } => {
            let provider = ChatCompletionProvider::new(config.provider()?)?;
            let state = server::AppState {
                provider: Arc::new(provider),
            };
            let runtime = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;
            let port = match port {
                Some(port) => port,
                None => config.port()?,
            };
            runtime.block_on(server::serve(state, port))?;
        }

        Commands::Browse { server } => {
            let store = open_store(&config, cli.db)?;
            let url = match server {
                Some(url) => url,
                None => config.proxy_url()?,
            };
            tui::run_browse(store, url, config.tips_timeout()?)?;
        }
    }

    Ok(())
}

fn print_stats(records: &[models::JobRecord]) {
    let s = stats(records);
    println!(
        "\nTotal: {}  Applied: {}  Interview: {}  Offers: {}  Rejected: {}",
        s.total, s.applied, s.interview, s.offer, s.rejected
    );
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long company name", 10), "a very ...");
        assert_eq!(truncate("Zürich Zürich", 8), "Züric...");
    }

    #[test]
    fn test_cli_parses_list_options() {
        let cli = Cli::try_parse_from(["jobtrail", "list", "--status", "offer", "--sort", "company"]).unwrap();
        match cli.command {
            Commands::List { status, sort, search } => {
                assert_eq!(status, StatusFilter::Only(JobStatus::Offer));
                assert_eq!(sort, SortKey::Company);
                assert!(search.is_empty());
            }
            _ => panic!("expected list"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_status() {
        assert!(Cli::try_parse_from(["jobtrail", "status", "abc", "ghosted"]).is_err());
    }
}
