use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hr_alerts::db::Database;
use hr_alerts::query::{self, AlertParams};
use hr_alerts::seed::SeedData;
use hr_alerts::server;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hr-alerts")]
#[command(about = "HR alerts for a manager's organization - list, filter, dismiss, serve")]
struct Cli {
    /// Path to the SQLite database (defaults to the user data directory)
    #[arg(long, global = true, env = "HR_ALERTS_DB")]
    db: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Replace all employees and alerts with a seed file
    Seed {
        /// Path to seed JSON
        file: PathBuf,
    },

    /// List alerts for a manager's reports
    Alerts {
        /// Manager employee ID
        manager_id: String,

        /// direct or subtree
        #[arg(long)]
        scope: Option<String>,

        /// Comma-separated severities (low, medium, high)
        #[arg(long)]
        severity: Option<String>,

        /// Comma-separated statuses (open, dismissed)
        #[arg(long)]
        status: Option<String>,

        /// Case-insensitive employee name search
        #[arg(short, long)]
        q: Option<String>,
    },

    /// Dismiss an alert
    Dismiss {
        /// Alert ID
        alert_id: String,
    },

    /// Show store status and row counts
    Health,

    /// Run the HTTP API
    Serve {
        /// Address to listen on
        #[arg(long, env = "HR_ALERTS_BIND", default_value = "127.0.0.1:8000")]
        bind: SocketAddr,
    },
}

fn init_logging(json: bool, default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = match cli.command {
        Commands::Serve { .. } => "info",
        _ => "warn",
    };
    init_logging(cli.log_json, default_level);

    let path = cli.db.unwrap_or_else(Database::default_path);
    let mut db = Database::open(&path)?;

    match cli.command {
        Commands::Init => {
            db.init()?;
            println!("Database initialized at {}", db.path().display());
        }

        Commands::Seed { file } => {
            db.init()?;
            let seed = SeedData::from_file(&file)?;
            let stats = db.load_seed(&seed)?;
            println!(
                "Loaded {} employees and {} alerts",
                stats.employees, stats.alerts
            );
        }

        Commands::Alerts {
            manager_id,
            scope,
            severity,
            status,
            q,
        } => {
            db.ensure_initialized()?;
            let params = AlertParams {
                manager_id: Some(manager_id),
                scope,
                severity,
                status,
                q,
            };
            let alerts = query::list_alerts(&db, &params)?;
            if alerts.is_empty() {
                println!("No alerts found.");
            } else {
                println!(
                    "{:<8} {:<22} {:<8} {:<14} {:<22} {:<10}",
                    "ID", "EMPLOYEE", "SEVERITY", "CATEGORY", "CREATED", "STATUS"
                );
                println!("{}", "-".repeat(89));
                for alert in alerts {
                    println!(
                        "{:<8} {:<22} {:<8} {:<14} {:<22} {:<10}",
                        alert.id,
                        truncate(&format!("{} ({})", alert.employee.name, alert.employee.id), 20),
                        alert.severity,
                        truncate(&alert.category, 12),
                        alert.created_at.format("%Y-%m-%d %H:%M").to_string(),
                        alert.status
                    );
                }
            }
        }

        Commands::Dismiss { alert_id } => {
            db.ensure_initialized()?;
            let alert = query::dismiss_alert(&db, &alert_id)?;
            println!("{}", serde_json::to_string_pretty(&alert)?);
        }

        Commands::Health => {
            db.ensure_initialized()?;
            println!("Database: {}", db.path().display());
            println!("Employees: {}", db.count_employees()?);
            println!("Alerts:    {}", db.count_alerts()?);
        }

        Commands::Serve { bind } => {
            db.ensure_initialized()?;
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("failed to start tokio runtime")?;
            runtime.block_on(server::serve(db, bind))?;
        }
    }

    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
